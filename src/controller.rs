//! The coordinating side of the simulation.
//!
//! [`Aco`] owns the grid, the spots and the trail layers. Every change is
//! broadcast to the worker pool as a [`Message`]; changes that invalidate
//! in-flight walks move the controller to a new [`Epoch`] so reports computed
//! under an older configuration can be told apart and dropped.

use crate::{
    errors::AcoError,
    grid::Grid,
    heuristic::Heuristic,
    message::{Command, Epoch, Message, PathReport, Report},
    pool::WorkerPool,
    scheduler::{Clock, Deadline, Interval},
    settings::{Settings, SettingsUpdate},
    spot::{check_weight, Source, Spot, SpotUpdate, Spots, Target},
    util::ceil_div,
};
use circular_queue::CircularQueue;
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::{sync::Arc, time::Duration};

/// How often the per-worker credit is advertised while running.
pub const BUDGET_PERIOD: Duration = Duration::from_millis(250);
/// Time between halting for an interruption and resuming.
pub const SETTLE_DELAY: Duration = Duration::from_millis(40);
/// Seconds of arrival counts kept for [`Aco::arrivals_per_second`].
pub const THROUGHPUT_WINDOW: usize = 5;

const SECOND: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Running,
}

pub struct Aco {
    grid: Grid,
    settings: Settings,
    heuristic: Box<dyn Heuristic>,
    sources: Spots<Source>,
    targets: Spots<Target>,
    global_trails: Vec<f64>,
    pool: Box<dyn WorkerPool>,
    clock: Arc<dyn Clock>,
    state: State,
    timestamp: Epoch,
    /// Reports accepted since the last round.
    paths: Vec<PathReport>,
    best_path: Option<PathReport>,
    budget: usize,
    budget_timer: Interval,
    resume: Deadline,
    rounds: usize,
    arrivals: CircularQueue<usize>,
    arrivals_this_second: usize,
    second: Interval,
}

impl Aco {
    pub fn new(
        grid: Grid,
        settings: Settings,
        heuristic: Box<dyn Heuristic>,
        pool: Box<dyn WorkerPool>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AcoError> {
        settings.validate()?;
        if settings.ant_count < pool.size() {
            return Err(AcoError::AntCountBelowPoolSize {
                requested: settings.ant_count,
                workers: pool.size(),
            });
        }

        info!(
            "starting a controller for {} cells and {} edges over {} workers",
            grid.cell_count(),
            grid.edge_count(),
            pool.size()
        );

        let global_trails = vec![settings.trail_default; grid.edge_count()];
        let budget = ceil_div(settings.ant_count, pool.size());
        let mut second = Interval::new(SECOND);
        second.start(clock.now());

        let mut aco = Self {
            grid,
            settings,
            heuristic,
            sources: Spots::new(),
            targets: Spots::new(),
            global_trails,
            pool,
            clock,
            state: State::Idle,
            timestamp: Epoch::default(),
            paths: Vec::new(),
            best_path: None,
            budget,
            budget_timer: Interval::new(BUDGET_PERIOD),
            resume: Deadline::default(),
            rounds: 0,
            arrivals: CircularQueue::with_capacity(THROUGHPUT_WINDOW),
            arrivals_this_second: 0,
            second,
        };

        aco.publish(Command::Grid(aco.grid.topology()))?;
        aco.amend(Command::Settings(aco.settings.clone()))?;

        Ok(aco)
    }

    /// Broadcasts `command` under a fresh epoch.
    fn publish(&mut self, command: Command) -> Result<(), AcoError> {
        self.timestamp = self.timestamp.next();
        debug!("epoch {}: broadcasting '{}'", self.timestamp, command.name());
        self.pool.broadcast(Message::new(command, self.timestamp))
    }

    /// Broadcasts `command` under the current epoch.
    fn amend(&mut self, command: Command) -> Result<(), AcoError> {
        trace!("epoch {}: amending '{}'", self.timestamp, command.name());
        self.pool.broadcast(Message::new(command, self.timestamp))
    }

    fn sync_sources(&mut self) -> Result<(), AcoError> {
        self.publish(Command::Sources(self.sources.refs()))
    }

    fn sync_targets(&mut self) -> Result<(), AcoError> {
        self.publish(Command::Targets(self.targets.refs()))
    }

    fn heuristics_command(&self) -> Command {
        Command::Heuristics(self.targets.iter().map(|t| t.heuristic.clone()).collect())
    }

    fn trails_command(&self) -> Command {
        Command::Trails(self.targets.iter().map(|t| t.trails.clone()).collect())
    }

    fn check_cell(&self, cell: usize) -> Result<(), AcoError> {
        let cells = self.grid.cell_count();
        if cell < cells {
            Ok(())
        } else {
            Err(AcoError::InvalidCell { cell, cells })
        }
    }

    fn evaluate(&self, heuristic: &dyn Heuristic, cell: usize) -> Result<Vec<f64>, AcoError> {
        let scores = heuristic.evaluate(&self.grid, cell);
        let expected = self.grid.edge_count();
        if scores.len() != expected {
            return Err(AcoError::HeuristicLength {
                expected,
                actual: scores.len(),
            });
        }
        Ok(scores)
    }

    fn default_trails(&self) -> Vec<f64> {
        vec![self.settings.trail_default; self.grid.edge_count()]
    }

    fn discard_paths(&mut self) {
        self.paths.clear();
        self.best_path = None;
    }

    pub fn add_source(&mut self, cell: usize, weight: f64) -> Result<usize, AcoError> {
        self.check_cell(cell)?;
        let index = self.sources.add(Spot::new(cell, weight)?);
        self.sync_sources()?;
        Ok(index)
    }

    pub fn remove_source(&mut self, index: usize) -> Result<Source, AcoError> {
        let source = self.sources.remove(index)?;
        self.discard_paths();
        self.sync_sources()?;
        Ok(source)
    }

    pub fn update_source(&mut self, index: usize, update: SpotUpdate) -> Result<(), AcoError> {
        if index >= self.sources.len() {
            return Err(AcoError::UnknownSpot(index));
        }
        if let Some(cell) = update.cell {
            self.check_cell(cell)?;
        }
        if let Some(weight) = update.weight {
            check_weight(weight)?;
            self.sources.set_weight(index, weight)?;
        }
        if let (Some(cell), Some(source)) = (update.cell, self.sources.get_mut(index)) {
            source.cell = cell;
        }
        self.sync_sources()
    }

    pub fn add_target(&mut self, cell: usize, weight: f64) -> Result<usize, AcoError> {
        self.check_cell(cell)?;
        let spot = Spot::new(cell, weight)?;
        let heuristic = self.evaluate(self.heuristic.as_ref(), cell)?;
        let index = self
            .targets
            .add(Target::new(spot, heuristic, self.default_trails()));

        self.sync_targets()?;
        self.amend(self.heuristics_command())?;
        self.amend(self.trails_command())?;
        Ok(index)
    }

    pub fn remove_target(&mut self, index: usize) -> Result<Target, AcoError> {
        let target = self.targets.remove(index)?;
        self.discard_paths();

        self.sync_targets()?;
        self.amend(self.heuristics_command())?;
        self.amend(self.trails_command())?;
        Ok(target)
    }

    /// A new cell gets a fresh heuristic and default trails.
    pub fn update_target(&mut self, index: usize, update: SpotUpdate) -> Result<(), AcoError> {
        let current = self
            .targets
            .get(index)
            .ok_or(AcoError::UnknownSpot(index))?
            .cell();
        let moved_to = update.cell.filter(|cell| *cell != current);
        let heuristic = match moved_to {
            Some(cell) => {
                self.check_cell(cell)?;
                Some(self.evaluate(self.heuristic.as_ref(), cell)?)
            }
            None => None,
        };
        if let Some(weight) = update.weight {
            check_weight(weight)?;
            self.targets.set_weight(index, weight)?;
        }

        let trails = self.default_trails();
        if let (Some(cell), Some(heuristic), Some(target)) =
            (moved_to, heuristic, self.targets.get_mut(index))
        {
            target.spot.cell = cell;
            target.heuristic = heuristic;
            target.trails = trails;
        }

        self.sync_targets()?;
        if moved_to.is_some() {
            self.discard_paths();
            self.amend(self.heuristics_command())?;
            self.amend(self.trails_command())?;
        }
        Ok(())
    }

    /// Merges the fields set in `update`. Refused when it would leave fewer
    /// ants per round than there are workers.
    pub fn change_settings(&mut self, update: &SettingsUpdate) -> Result<(), AcoError> {
        let settings = self.settings.merged(update);
        if settings.ant_count < self.pool.size() {
            return Err(AcoError::AntCountBelowPoolSize {
                requested: settings.ant_count,
                workers: self.pool.size(),
            });
        }
        settings.validate()?;

        if self.settings.did_trail_settings_change(&settings) {
            debug!("trail settings changed, applied from the next round on");
        }
        self.settings = settings;
        self.budget = ceil_div(self.settings.ant_count, self.pool.size());
        debug!("per-worker budget is now {}", self.budget);

        self.publish(Command::Settings(self.settings.clone()))?;
        if self.state == State::Running {
            self.amend(Command::Budget(self.budget))?;
        }
        Ok(())
    }

    /// Swaps in `heuristic` if given, then re-evaluates every target.
    pub fn change_heuristic(
        &mut self,
        heuristic: Option<Box<dyn Heuristic>>,
    ) -> Result<(), AcoError> {
        let scores = {
            let active = heuristic.as_deref().unwrap_or(self.heuristic.as_ref());
            self.targets
                .iter()
                .map(|target| self.evaluate(active, target.cell()))
                .collect::<Result<Vec<_>, _>>()?
        };

        if let Some(heuristic) = heuristic {
            info!("switching to the '{}' heuristic", heuristic.name());
            self.heuristic = heuristic;
        }
        for (target, scores) in self.targets.iter_mut().zip(scores) {
            target.heuristic = scores;
        }

        self.publish(self.heuristics_command())
    }

    /// Replaces the grid. Halts first, and drops every spot.
    pub fn change_grid(&mut self, grid: Grid) -> Result<(), AcoError> {
        self.halt()?;

        info!(
            "changing to a grid of {} cells and {} edges",
            grid.cell_count(),
            grid.edge_count()
        );
        self.grid = grid;
        self.sources.clear();
        self.targets.clear();
        self.discard_paths();
        self.global_trails = self.default_trails();

        self.publish(Command::Grid(self.grid.topology()))?;
        self.amend(Command::Sources(self.sources.refs()))?;
        self.amend(Command::Targets(self.targets.refs()))?;
        self.amend(self.heuristics_command())?;
        self.amend(self.trails_command())
    }

    /// Starts the workers. Nothing changes and nothing is sent when this
    /// returns an error.
    pub fn go(&mut self) -> Result<(), AcoError> {
        if self.sources.is_empty() {
            return Err(AcoError::NoSources);
        }
        if self.targets.is_empty() {
            return Err(AcoError::NoTargets);
        }
        if self.budget == 0 {
            return Err(AcoError::NonPositiveBudget);
        }
        if self.state == State::Running {
            return Ok(());
        }

        self.resume.cancel();
        self.publish(Command::Start)?;
        self.state = State::Running;
        self.budget_timer.start(self.clock.now());
        self.amend(Command::Budget(self.budget))?;

        info!(
            "running with {} sources and {} targets at {}",
            self.sources.len(),
            self.targets.len(),
            self.timestamp
        );
        Ok(())
    }

    /// Stops the workers and forgets buffered reports. Does nothing when
    /// already idle, except calling off a pending resume.
    pub fn halt(&mut self) -> Result<(), AcoError> {
        self.resume.cancel();
        if self.state == State::Idle {
            return Ok(());
        }

        self.state = State::Idle;
        self.budget_timer.cancel();
        self.paths.clear();
        self.publish(Command::Stop)?;

        info!("halted at {}", self.timestamp);
        Ok(())
    }

    /// Runs `change` with the workers stopped. When running, the workers are
    /// halted first and resumed [`SETTLE_DELAY`] later from [`Aco::update`].
    pub fn interrupt<F>(&mut self, change: F) -> Result<(), AcoError>
    where
        F: FnOnce(&mut Self) -> Result<(), AcoError>,
    {
        if self.state == State::Idle {
            return change(self);
        }

        self.halt()?;
        let result = change(self);
        self.resume.schedule(self.clock.now(), SETTLE_DELAY);
        result
    }

    /// Puts every trail layer back to `trail_default`.
    pub fn reset(&mut self) -> Result<(), AcoError> {
        self.interrupt(|aco| {
            info!("resetting trails");
            let trails = aco.default_trails();
            for target in aco.targets.iter_mut() {
                target.trails = trails.clone();
            }
            aco.global_trails = trails;
            aco.discard_paths();
            aco.publish(aco.trails_command())
        })
    }

    /// Accepts a worker report. Reports that arrive while idle or that were
    /// computed under an older epoch are dropped.
    pub fn receive(&mut self, message: Message<Report>) -> Result<(), AcoError> {
        if self.state != State::Running {
            return Ok(());
        }
        if message.timestamp < self.timestamp {
            trace!(
                "dropping a report from {}, now at {}",
                message.timestamp,
                self.timestamp
            );
            return Ok(());
        }

        match message.value {
            Report::Path(path) => self.accept(path),
        }
    }

    fn accept(&mut self, path: PathReport) -> Result<(), AcoError> {
        if path.target >= self.targets.len() || path.source >= self.sources.len() {
            trace!("dropping a report for an unknown spot");
            return Ok(());
        }

        self.arrivals_this_second += 1;
        let shorter = self
            .best_path
            .as_ref()
            .map_or(true, |best| path.len() < best.len());
        if shorter {
            trace!("new best path of {} edges", path.len());
            self.best_path = Some(path.clone());
        }

        self.paths.push(path);
        if self.paths.len() >= self.settings.ant_count {
            self.progress()?;
        }
        Ok(())
    }

    /// One round of trail updates from the buffered reports: decay, reward,
    /// aggregate into the global layer, then feed the global layer back into
    /// every target's layer.
    pub fn progress(&mut self) -> Result<(), AcoError> {
        let settings = &self.settings;
        let paths = &self.paths;

        self.targets.as_mut_slice().par_iter_mut().for_each(|target| {
            for trail in target.trails.iter_mut() {
                *trail = (*trail * (1.0 - settings.trail_decay)).max(settings.trail_minimum);
            }

            let index = target.spot.index;
            for path in paths.iter().filter(|path| path.target == index) {
                let reward =
                    settings.trail_reward * (path.len() as f64 / settings.iteration_limit as f64);
                for edge in &path.edges {
                    if let Some(trail) = target.trails.get_mut(*edge) {
                        *trail = (*trail + reward).min(1.0);
                    }
                }
            }
        });

        let mut global_trails = vec![0.0; self.grid.edge_count()];
        for target in self.targets.iter() {
            let w = target.w();
            for (global, trail) in global_trails.iter_mut().zip(&target.trails) {
                *global += trail * w;
            }
        }
        self.global_trails = global_trails;

        let feedback = self.settings.trail_feedback;
        let global_trails = &self.global_trails;
        self.targets.as_mut_slice().par_iter_mut().for_each(|target| {
            for (trail, global) in target.trails.iter_mut().zip(global_trails) {
                *trail = trail.max(global * feedback);
            }
        });

        self.rounds += 1;
        debug!(
            "round {} done with {} paths",
            self.rounds,
            self.paths.len()
        );
        self.paths.clear();
        self.amend(self.trails_command())
    }

    /// Drives the controller: fires due timers and takes in every report the
    /// pool has. Call it regularly, about once per frame.
    pub fn update(&mut self) -> Result<(), AcoError> {
        let now = self.clock.now();

        if self.resume.poll(now) {
            if let Err(e) = self.go() {
                warn!("couldn't resume after an interruption: {}", e);
            }
        }

        if self.budget_timer.poll(now) {
            self.amend(Command::Budget(self.budget))?;
        }

        for message in self.pool.drain() {
            self.receive(message)?;
        }

        if self.second.poll(now) {
            self.arrivals.push(self.arrivals_this_second);
            self.arrivals_this_second = 0;
        }

        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn timestamp(&self) -> Epoch {
        self.timestamp
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn heuristic_name(&self) -> &'static str {
        self.heuristic.name()
    }

    pub fn sources(&self) -> &Spots<Source> {
        &self.sources
    }

    pub fn targets(&self) -> &Spots<Target> {
        &self.targets
    }

    pub fn source_at_cell(&self, cell: usize) -> Option<usize> {
        self.sources.position_of_cell(cell)
    }

    pub fn target_at_cell(&self, cell: usize) -> Option<usize> {
        self.targets.position_of_cell(cell)
    }

    /// Weighted sum of every target's trails, one value per edge in `[0, 1]`.
    pub fn global_trails(&self) -> &[f64] {
        &self.global_trails
    }

    /// Shortest path accepted since the last reset, grid change or spot
    /// removal.
    pub fn best_path(&self) -> Option<&PathReport> {
        self.best_path.as_ref()
    }

    /// Mean accepted reports per second over the last few seconds.
    pub fn arrivals_per_second(&self) -> f64 {
        if self.arrivals.is_empty() {
            return 0.0;
        }
        self.arrivals.iter().sum::<usize>() as f64 / self.arrivals.len() as f64
    }

    /// Credit advertised to each worker.
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn buffered_paths(&self) -> usize {
        self.paths.len()
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn is_resume_pending(&self) -> bool {
        self.resume.is_pending()
    }
}
