use crate::{
    grid::Topology,
    message::{PathReport, SpotRef},
    settings::Settings,
};
use log::trace;
use rand::Rng;
use typed_builder::TypedBuilder;

/// Everything an ant reads while it walks. Borrowed from the colony, which
/// only hands it out once all the pieces agree with each other.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub topology: &'a Topology,
    pub settings: &'a Settings,
    pub sources: &'a [SpotRef],
    pub targets: &'a [SpotRef],
    /// One trail layer per target.
    pub trails: &'a [Vec<f64>],
    /// One heuristic vector per target.
    pub heuristics: &'a [Vec<f64>],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AntState {
    Advancing,
    /// Reached the assigned target, the path is ready to be reported.
    Arrived,
    /// Got stuck or walked too far, and was dropped somewhere else with an
    /// empty path. It keeps advancing from there.
    Lost,
}

#[derive(TypedBuilder, Clone, Debug)]
pub struct Ant {
    cell: usize,
    target_cell: usize,
    source_index: usize,
    target_index: usize,
    #[builder(default)]
    path: Vec<usize>,
    // Scratch space for edge scores, kept to avoid allocating every step
    #[builder(default)]
    scores: Vec<f64>,
}

impl Ant {
    /// A fresh ant at a source picked by weight, heading for a target picked
    /// by weight.
    pub fn spawn<R: Rng>(env: &Environment, rng: &mut R) -> Self {
        let source_index = choose_spot(env.sources, rng);
        let target_index = choose_spot(env.targets, rng);

        Ant::builder()
            .cell(env.sources[source_index].cell)
            .target_cell(env.targets[target_index].cell)
            .source_index(source_index)
            .target_index(target_index)
            .build()
    }

    /// Re-rolls source and target in place, reusing this ant's buffers.
    pub fn respawn<R: Rng>(&mut self, env: &Environment, rng: &mut R) {
        self.source_index = choose_spot(env.sources, rng);
        self.target_index = choose_spot(env.targets, rng);
        self.cell = env.sources[self.source_index].cell;
        self.target_cell = env.targets[self.target_index].cell;
        self.path.clear();
    }

    pub fn step<R: Rng>(&mut self, env: &Environment, rng: &mut R) -> AntState {
        if self.path.len() > env.settings.iteration_limit {
            trace!("ant is lost after {} steps", self.path.len());
            self.wander(env, rng);
            return AntState::Lost;
        }

        let edges = &env.topology.cells[self.cell];
        let trails = &env.trails[self.target_index];
        let heuristics = &env.heuristics[self.target_index];
        let (a, b) = (env.settings.trail_power, env.settings.heuristic_power);

        self.scores.clear();
        self.scores.extend(
            edges
                .iter()
                .map(|edge| trails[*edge].powf(a) * heuristics[*edge].powf(b)),
        );
        let sum: f64 = self.scores.iter().sum();

        if !(sum > 0.0) {
            trace!("ant is deadlocked at cell {}", self.cell);
            self.wander(env, rng);
            return AntState::Lost;
        }

        let chosen = roulette(&self.scores, sum * rng.gen::<f64>());
        let edge = edges[chosen];
        self.path.push(edge);
        self.cell = env.topology.edges[edge];

        if self.cell == self.target_cell {
            trace!("ant arrived at cell {} after {} steps", self.cell, self.path.len());
            AntState::Arrived
        } else {
            AntState::Advancing
        }
    }

    /// Drops the ant on a uniformly random cell with an empty path.
    fn wander<R: Rng>(&mut self, env: &Environment, rng: &mut R) {
        self.cell = rng.gen_range(0..env.topology.cell_count());
        self.path.clear();
    }

    pub fn report(&self) -> PathReport {
        PathReport {
            source: self.source_index,
            target: self.target_index,
            edges: self.path.clone(),
        }
    }

    pub fn cell(&self) -> usize {
        self.cell
    }

    pub fn target_cell(&self) -> usize {
        self.target_cell
    }

    pub fn source_index(&self) -> usize {
        self.source_index
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }
}

/// Index of the score the point `p` falls on when all scores are laid end to
/// end. Rounding can push `p` past the end; the last positive score wins then.
fn roulette(scores: &[f64], mut p: f64) -> usize {
    for (i, score) in scores.iter().enumerate() {
        if p < *score {
            return i;
        }
        p -= score;
    }

    scores.iter().rposition(|score| *score > 0.0).unwrap_or(0)
}

/// Picks a spot position with probability equal to its normalized weight.
pub fn choose_spot<R: Rng>(spots: &[SpotRef], rng: &mut R) -> usize {
    let mut r = rng.gen::<f64>();
    for (i, spot) in spots.iter().enumerate() {
        if r < spot.w {
            return i;
        }
        r -= spot.w;
    }

    spots.len().saturating_sub(1)
}
