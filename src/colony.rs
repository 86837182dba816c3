//! The worker side: a population of ants stepping over the latest
//! configuration the controller sent, reporting every arrival.

use crate::{
    ant::{Ant, AntState, Environment},
    errors::AcoError,
    grid::Topology,
    message::{Command, Epoch, Message, Report, SpotRef},
    scheduler::Clock,
    settings::Settings,
};
use log::{debug, trace};
use rand::{rngs::SmallRng, SeedableRng};
use std::{sync::mpsc::Sender, time::Duration};
use typed_builder::TypedBuilder;

/// One frame at 60Hz.
pub const TICK_PERIOD: Duration = Duration::from_micros(16_667);
pub const ANTS_PER_COLONY: usize = 100;
pub const INITIAL_BURST: usize = 1000;
pub const BURST_STEP: usize = 100;
pub const MIN_BURST: usize = 100;
pub const MAX_BURST: usize = 100_000;

/// Additive controller for the number of population sweeps per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TypedBuilder)]
pub struct BurstControl {
    #[builder(default = TICK_PERIOD)]
    pub budget: Duration,
    #[builder(default = BURST_STEP)]
    pub step: usize,
    #[builder(default = MIN_BURST)]
    pub min: usize,
    #[builder(default = MAX_BURST)]
    pub max: usize,
}

impl Default for BurstControl {
    fn default() -> Self {
        BurstControl::builder().build()
    }
}

impl BurstControl {
    /// A burst that took longer than the budget shrinks, otherwise it grows.
    pub fn next(&self, elapsed: Duration, current: usize) -> usize {
        let next = if elapsed > self.budget {
            current.saturating_sub(self.step)
        } else {
            current.saturating_add(self.step)
        };
        next.clamp(self.min, self.max)
    }
}

/// [`BurstControl::next`] with the default frame budget and bounds.
pub fn next_burst(elapsed: Duration, current: usize) -> usize {
    BurstControl::default().next(elapsed, current)
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct ColonyOptions {
    #[builder(default = ANTS_PER_COLONY)]
    pub population: usize,
    #[builder(default = INITIAL_BURST)]
    pub initial_burst: usize,
    #[builder(default)]
    pub burst_control: BurstControl,
    /// Seed for the colony's random numbers. Seeded from the OS when unset.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
}

impl Default for ColonyOptions {
    fn default() -> Self {
        ColonyOptions::builder().build()
    }
}

pub struct Colony {
    id: usize,
    epoch: Epoch,
    topology: Option<Topology>,
    settings: Option<Settings>,
    sources: Vec<SpotRef>,
    targets: Vec<SpotRef>,
    trails: Vec<Vec<f64>>,
    heuristics: Vec<Vec<f64>>,
    ants: Vec<Ant>,
    population: usize,
    burst: usize,
    burst_control: BurstControl,
    /// Advisory credit from the last budget, `None` until one arrives.
    credit: Option<usize>,
    running: bool,
    rng: SmallRng,
    outbox: Sender<Message<Report>>,
}

impl Colony {
    pub fn new(id: usize, options: &ColonyOptions, outbox: Sender<Message<Report>>) -> Self {
        let rng = match options.seed {
            // every colony of a pool walks differently
            Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => SmallRng::from_entropy(),
        };

        Self {
            id,
            epoch: Epoch::default(),
            topology: None,
            settings: None,
            sources: Vec::new(),
            targets: Vec::new(),
            trails: Vec::new(),
            heuristics: Vec::new(),
            ants: Vec::with_capacity(options.population),
            population: options.population,
            burst: options.initial_burst,
            burst_control: options.burst_control,
            credit: None,
            running: false,
            rng,
            outbox,
        }
    }

    /// Applies one message from the controller. Every message except a budget
    /// moves the colony to the message's epoch and resets all live ants, so no
    /// walk straddles two configurations.
    pub fn handle(&mut self, message: Message<Command>) {
        let Message { value, timestamp } = message;
        trace!(
            "colony {} received '{}' at {}",
            self.id,
            value.name(),
            timestamp
        );

        match value {
            Command::Grid(topology) => self.topology = Some(topology),
            Command::Settings(settings) => self.settings = Some(settings),
            Command::Sources(sources) => self.sources = sources,
            Command::Targets(targets) => self.targets = targets,
            Command::Trails(trails) => self.trails = trails,
            Command::Heuristics(heuristics) => self.heuristics = heuristics,
            Command::Start => self.start(),
            Command::Stop => self.stop(),
            Command::Budget(credit) => {
                self.credit = Some(credit);
                return;
            }
        }

        self.epoch = timestamp;
        self.reset_ants();
    }

    fn start(&mut self) {
        if self.running {
            return;
        }

        debug!("colony {} starting with {} ants", self.id, self.population);
        self.running = true;
        self.ants.clear();
        self.fill_population();
    }

    fn stop(&mut self) {
        if !self.running {
            return;
        }

        debug!("colony {} stopping", self.id);
        self.running = false;
        self.ants.clear();
    }

    /// Whether the pieces of configuration received so far fit together.
    pub fn is_ready(&self) -> bool {
        let (topology, _settings) = match (&self.topology, &self.settings) {
            (Some(topology), Some(settings)) => (topology, settings),
            _ => return false,
        };
        let cells = topology.cell_count();
        let edges = topology.edge_count();

        cells > 0
            && !self.sources.is_empty()
            && !self.targets.is_empty()
            && self.trails.len() == self.targets.len()
            && self.heuristics.len() == self.targets.len()
            && self.trails.iter().all(|layer| layer.len() == edges)
            && self.heuristics.iter().all(|layer| layer.len() == edges)
            && self
                .sources
                .iter()
                .chain(self.targets.iter())
                .all(|spot| spot.cell < cells)
    }

    fn reset_ants(&mut self) {
        if !self.is_ready() {
            self.ants.clear();
            return;
        }

        let Colony {
            ants,
            rng,
            topology: Some(topology),
            settings: Some(settings),
            sources,
            targets,
            trails,
            heuristics,
            ..
        } = self
        else {
            return;
        };
        let env = Environment {
            topology,
            settings,
            sources,
            targets,
            trails,
            heuristics,
        };
        ants.iter_mut().for_each(|ant| ant.respawn(&env, rng));
    }

    fn fill_population(&mut self) {
        if !self.running || !self.is_ready() {
            return;
        }

        let Colony {
            ants,
            rng,
            population,
            topology: Some(topology),
            settings: Some(settings),
            sources,
            targets,
            trails,
            heuristics,
            ..
        } = self
        else {
            return;
        };
        let env = Environment {
            topology,
            settings,
            sources,
            targets,
            trails,
            heuristics,
        };
        while ants.len() < *population {
            ants.push(Ant::spawn(&env, rng));
        }
    }

    /// Runs one burst if the colony is running and fully configured, then
    /// adapts the burst size to how long it took.
    pub fn tick(&mut self, clock: &dyn Clock) -> Result<(), AcoError> {
        if !self.running || !self.is_ready() {
            return Ok(());
        }

        self.fill_population();

        let sweeps = if self.credit == Some(0) {
            self.burst_control.min
        } else {
            self.burst
        };

        let started = clock.now();
        for _ in 0..sweeps {
            self.sweep()?;
        }
        let elapsed = clock.now().saturating_sub(started);

        self.burst = self.burst_control.next(elapsed, self.burst);
        trace!(
            "colony {} ran {} sweeps in {:?}, next burst is {}",
            self.id,
            sweeps,
            elapsed,
            self.burst
        );

        Ok(())
    }

    /// Steps every ant once, reporting and respawning the ones that arrive.
    fn sweep(&mut self) -> Result<(), AcoError> {
        let Colony {
            id,
            epoch,
            ants,
            rng,
            credit,
            outbox,
            topology: Some(topology),
            settings: Some(settings),
            sources,
            targets,
            trails,
            heuristics,
            ..
        } = self
        else {
            return Ok(());
        };
        let env = Environment {
            topology,
            settings,
            sources,
            targets,
            trails,
            heuristics,
        };

        for ant in ants.iter_mut() {
            if ant.step(&env, rng) == AntState::Arrived {
                outbox
                    .send(Message::new(Report::Path(ant.report()), *epoch))
                    .map_err(|_| AcoError::WorkerDisconnected(*id))?;
                if let Some(credit) = credit {
                    *credit = credit.saturating_sub(1);
                }
                ant.respawn(&env, rng);
            }
        }

        Ok(())
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn burst(&self) -> usize {
        self.burst
    }

    pub fn credit(&self) -> Option<usize> {
        self.credit
    }

    pub fn ants(&self) -> &[Ant] {
        &self.ants
    }
}
