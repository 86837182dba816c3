//! Static per-edge desirability scores toward a target cell.
//!
//! Every strategy is a pure function of the grid and the target: evaluating
//! it twice yields the same vector, one score per edge.

use crate::{
    errors::AcoError,
    grid::{Edge, Grid},
    point2::Point2,
    util::map_range,
};
use std::{fmt, str::FromStr, sync::Arc};

/// Smallest score a normalized or remapped heuristic hands out. Never zero so
/// no edge is excluded for good.
pub const SCORE_FLOOR: f64 = f64::MIN_POSITIVE;

/// Scores every edge of `grid` toward `target` with `score_fn`.
///
/// With `normalize` the scores are min-max scaled into `(0, 1]`. When all
/// scores are equal every output collapses to [`SCORE_FLOOR`].
pub fn heuristic<F>(score_fn: F, grid: &Grid, target: usize, normalize: bool) -> Vec<f64>
where
    F: Fn(&Grid, &Edge, usize) -> f64,
{
    let mut scores: Vec<f64> = grid
        .edges()
        .iter()
        .map(|edge| score_fn(grid, edge, target))
        .collect();

    if normalize {
        let (min, max) = scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), score| {
                (min.min(*score), max.max(*score))
            });
        let span = max - min;

        if span > 0.0 && span.is_finite() {
            scores
                .iter_mut()
                .for_each(|score| *score = ((*score - min) / span).max(SCORE_FLOOR));
        } else {
            scores.iter_mut().for_each(|score| *score = SCORE_FLOOR);
        }
    }

    scores
}

pub trait Heuristic: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// One score per grid edge, in edge index order.
    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64>;
}

fn target_position(grid: &Grid, target: usize) -> Point2 {
    grid.cell(target)
        .map(|cell| cell.position)
        .unwrap_or_default()
}

fn endpoints(grid: &Grid, edge: &Edge) -> (Point2, Point2) {
    let cells = grid.cells();
    (cells[edge.u].position, cells[edge.v].position)
}

/// Every edge is equally good.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uniform;

impl Heuristic for Uniform {
    fn name(&self) -> &'static str {
        "none"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        heuristic(|_, _, _| 1.0, grid, target, false)
    }
}

/// Edges whose midpoint lies closer to the target score higher.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleDistance;

impl Heuristic for SimpleDistance {
    fn name(&self) -> &'static str {
        "simple_distance"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        let goal = target_position(grid, target);
        heuristic(
            |grid, edge, _| {
                let (u, v) = endpoints(grid, edge);
                -u.midpoint(&v).distance_to(&goal)
            },
            grid,
            target,
            true,
        )
    }
}

/// Edges pointing toward the target score higher: the cosine between the edge
/// direction and the direction to the target, remapped from `[-1, 1]` to
/// `(0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineDistance;

impl Heuristic for CosineDistance {
    fn name(&self) -> &'static str {
        "cosine_distance"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        let goal = target_position(grid, target);
        heuristic(
            |grid, edge, _| {
                let (u, v) = endpoints(grid, edge);
                let to_target = goal - u;
                if to_target.is_zero() {
                    return 1.0;
                }

                let cosine = to_target.cosine_to(&(v - u)).unwrap_or(0.0);
                map_range(cosine, -1.0, 1.0, 0.0f64, 1.0).max(SCORE_FLOOR)
            },
            grid,
            target,
            false,
        )
    }
}

/// Uses the destination cell's intrinsic value as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct MapIntrinsic;

impl Heuristic for MapIntrinsic {
    fn name(&self) -> &'static str {
        "map_intrinsic"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        heuristic(
            |grid, edge, _| grid.cells()[edge.v].value,
            grid,
            target,
            false,
        )
    }
}

/// The obstacle boundary closest to a point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundary {
    pub distance: f64,
    /// Direction the boundary runs in at its closest point.
    pub direction: Point2,
}

/// Obstacle lookup supplied by whoever owns the floor plan.
pub trait ObstacleMap: Send + Sync + fmt::Debug {
    fn nearest_boundary(&self, at: Point2) -> Option<Boundary>;
}

/// Obstacles described as a set of straight wall segments.
#[derive(Clone, Debug, Default)]
pub struct SegmentObstacles {
    walls: Vec<(Point2, Point2)>,
}

impl SegmentObstacles {
    pub fn new(walls: Vec<(Point2, Point2)>) -> Self {
        Self { walls }
    }
}

impl ObstacleMap for SegmentObstacles {
    fn nearest_boundary(&self, at: Point2) -> Option<Boundary> {
        self.walls
            .iter()
            .filter_map(|(a, b)| {
                let direction = *b - *a;
                let length = direction.dot(&direction);
                if length == 0.0 {
                    return None;
                }

                let t = ((at - *a).dot(&direction) / length).clamp(0.0, 1.0);
                let closest = *a + direction * t;
                Some(Boundary {
                    distance: closest.distance_to(&at),
                    direction,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Penalizes edges running alongside a nearby wall. The closer the wall and
/// the more parallel the edge, the lower the score.
#[derive(Clone, Debug)]
pub struct ObstructionAvoidance {
    obstacles: Arc<dyn ObstacleMap>,
    threshold: f64,
}

impl ObstructionAvoidance {
    pub const DEFAULT_THRESHOLD: f64 = 20.0;

    pub fn new(obstacles: Arc<dyn ObstacleMap>, threshold: f64) -> Self {
        Self {
            obstacles,
            threshold,
        }
    }
}

impl Heuristic for ObstructionAvoidance {
    fn name(&self) -> &'static str {
        "obstruction_avoidance"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        let threshold = self.threshold;
        heuristic(
            |grid, edge, _| {
                let (u, v) = endpoints(grid, edge);
                let boundary = match self.obstacles.nearest_boundary(u.midpoint(&v)) {
                    Some(boundary) if boundary.distance <= threshold => boundary,
                    _ => return 1.0,
                };

                let parallel = (v - u)
                    .cosine_to(&boundary.direction)
                    .map(f64::abs)
                    .unwrap_or(0.0);
                let proximity = 1.0 - boundary.distance / threshold;
                (1.0 - parallel * proximity).max(SCORE_FLOOR)
            },
            grid,
            target,
            false,
        )
    }
}

/// Product of several strategies.
#[derive(Debug)]
pub struct Mix {
    parts: Vec<Box<dyn Heuristic>>,
}

impl Mix {
    pub fn new(parts: Vec<Box<dyn Heuristic>>) -> Self {
        Self { parts }
    }
}

impl Default for Mix {
    fn default() -> Self {
        Self::new(vec![Box::new(CosineDistance), Box::new(MapIntrinsic)])
    }
}

impl Heuristic for Mix {
    fn name(&self) -> &'static str {
        "mix"
    }

    fn evaluate(&self, grid: &Grid, target: usize) -> Vec<f64> {
        let mut scores = vec![1.0; grid.edge_count()];
        for part in &self.parts {
            scores
                .iter_mut()
                .zip(part.evaluate(grid, target))
                .for_each(|(score, factor)| *score *= factor);
        }
        scores
    }
}

/// Selects a strategy by name at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicKind {
    None,
    SimpleDistance,
    CosineDistance,
    ObstructionAvoidance,
    MapIntrinsic,
    Mix,
}

impl HeuristicKind {
    pub fn build(
        self,
        obstacles: Option<Arc<dyn ObstacleMap>>,
    ) -> Result<Box<dyn Heuristic>, AcoError> {
        let heuristic: Box<dyn Heuristic> = match self {
            HeuristicKind::None => Box::new(Uniform),
            HeuristicKind::SimpleDistance => Box::new(SimpleDistance),
            HeuristicKind::CosineDistance => Box::new(CosineDistance),
            HeuristicKind::MapIntrinsic => Box::new(MapIntrinsic),
            HeuristicKind::ObstructionAvoidance => {
                let obstacles =
                    obstacles.ok_or(AcoError::MissingObstacleMap("obstruction_avoidance"))?;
                Box::new(ObstructionAvoidance::new(
                    obstacles,
                    ObstructionAvoidance::DEFAULT_THRESHOLD,
                ))
            }
            HeuristicKind::Mix => match obstacles {
                Some(obstacles) => Box::new(Mix::new(vec![
                    Box::new(CosineDistance),
                    Box::new(MapIntrinsic),
                    Box::new(ObstructionAvoidance::new(
                        obstacles,
                        ObstructionAvoidance::DEFAULT_THRESHOLD,
                    )),
                ])),
                None => Box::new(Mix::default()),
            },
        };

        Ok(heuristic)
    }
}

impl FromStr for HeuristicKind {
    type Err = AcoError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "none" => Ok(HeuristicKind::None),
            "simple_distance" => Ok(HeuristicKind::SimpleDistance),
            "cosine_distance" => Ok(HeuristicKind::CosineDistance),
            "obstruction_avoidance" => Ok(HeuristicKind::ObstructionAvoidance),
            "map_intrinsic" => Ok(HeuristicKind::MapIntrinsic),
            "mix" => Ok(HeuristicKind::Mix),
            other => Err(AcoError::UnknownHeuristic(other.to_owned())),
        }
    }
}
