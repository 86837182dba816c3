//! Worker pools.
//!
//! The controller talks to its colonies through [`WorkerPool`] only. A
//! [`ParallelPool`] runs every colony on its own thread; a [`CooperativePool`]
//! interleaves them on the controller's thread whenever it is drained. Both
//! deliver messages to each colony in broadcast order and hand back whatever
//! the colonies reported, tagged with the epoch they were computed under.

use crate::{
    colony::{Colony, ColonyOptions, TICK_PERIOD},
    errors::AcoError,
    message::{Command, Message, Report},
    scheduler::{Clock, Interval},
};
use log::{debug, info, warn};
use std::{
    collections::VecDeque,
    sync::{
        mpsc::{channel, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
};

pub const DEFAULT_WORKER_COUNT: usize = 4;

pub trait WorkerPool {
    /// Number of colonies behind this pool.
    fn size(&self) -> usize;

    /// Sends a copy of `message` to every colony, after everything broadcast
    /// before it.
    fn broadcast(&mut self, message: Message<Command>) -> Result<(), AcoError>;

    /// Reports received since the last drain. A cooperative pool also runs
    /// its colonies here.
    fn drain(&mut self) -> Vec<Message<Report>>;

    fn is_parallel(&self) -> bool;
}

/// `available_parallelism`, or [`DEFAULT_WORKER_COUNT`] when unknown.
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKER_COUNT)
}

/// Spawns `workers` colony threads, or falls back to a single cooperative
/// colony when threads can't be created.
pub fn spawn_pool(
    workers: usize,
    options: &ColonyOptions,
    clock: Arc<dyn Clock>,
) -> Box<dyn WorkerPool> {
    match ParallelPool::spawn(workers, options, Arc::clone(&clock)) {
        Ok(pool) => Box::new(pool),
        Err(e) => {
            warn!(
                "couldn't spawn worker threads ({}), emulating a single colony instead",
                e
            );
            Box::new(CooperativePool::new(1, options, clock))
        }
    }
}

pub struct ParallelPool {
    inboxes: Vec<Sender<Message<Command>>>,
    reports: Receiver<Message<Report>>,
    handles: Vec<JoinHandle<()>>,
}

impl ParallelPool {
    pub fn spawn(
        workers: usize,
        options: &ColonyOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AcoError> {
        let (outbox, reports) = channel();
        let mut inboxes = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (inbox, commands) = channel();
            let colony = Colony::new(id, options, outbox.clone());
            let clock = Arc::clone(&clock);
            let handle = thread::Builder::new()
                .name(format!("colony-{}", id))
                .spawn(move || run_colony(colony, commands, clock.as_ref()))?;

            inboxes.push(inbox);
            handles.push(handle);
        }

        info!("spawned {} colony threads", workers);

        Ok(Self {
            inboxes,
            reports,
            handles,
        })
    }
}

/// A colony thread: applies messages as they come in and ticks once per
/// frame, until the pool goes away.
fn run_colony(mut colony: Colony, commands: Receiver<Message<Command>>, clock: &dyn Clock) {
    let mut ticks = Interval::new(TICK_PERIOD);
    ticks.start(clock.now());

    loop {
        let wait = ticks.remaining(clock.now()).unwrap_or(TICK_PERIOD);
        match commands.recv_timeout(wait) {
            Ok(message) => {
                colony.handle(message);
                for message in commands.try_iter() {
                    colony.handle(message);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("colony {} lost its controller, shutting down", colony.id());
                return;
            }
        }

        if ticks.poll(clock.now()) {
            if let Err(e) = colony.tick(clock) {
                debug!("colony {} shutting down: {}", colony.id(), e);
                return;
            }
        }
    }
}

impl WorkerPool for ParallelPool {
    fn size(&self) -> usize {
        self.inboxes.len()
    }

    fn broadcast(&mut self, message: Message<Command>) -> Result<(), AcoError> {
        for (id, inbox) in self.inboxes.iter().enumerate() {
            inbox
                .send(message.clone())
                .map_err(|_| AcoError::WorkerDisconnected(id))?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<Message<Report>> {
        self.reports.try_iter().collect()
    }

    fn is_parallel(&self) -> bool {
        true
    }
}

impl Drop for ParallelPool {
    fn drop(&mut self) {
        // closing the inboxes is what ends every colony loop
        self.inboxes.clear();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("a colony thread panicked");
            }
        }
    }
}

pub struct CooperativePool {
    colonies: Vec<Colony>,
    queue: VecDeque<Message<Command>>,
    reports: Receiver<Message<Report>>,
    ticks: Interval,
    clock: Arc<dyn Clock>,
}

impl CooperativePool {
    pub fn new(workers: usize, options: &ColonyOptions, clock: Arc<dyn Clock>) -> Self {
        let (outbox, reports) = channel();
        let colonies = (0..workers)
            .map(|id| Colony::new(id, options, outbox.clone()))
            .collect();
        let mut ticks = Interval::new(TICK_PERIOD);
        ticks.start(clock.now());

        info!("emulating {} colonies on the controller thread", workers);

        Self {
            colonies,
            queue: VecDeque::new(),
            reports,
            ticks,
            clock,
        }
    }

    pub fn colonies(&self) -> &[Colony] {
        &self.colonies
    }
}

impl WorkerPool for CooperativePool {
    fn size(&self) -> usize {
        self.colonies.len()
    }

    fn broadcast(&mut self, message: Message<Command>) -> Result<(), AcoError> {
        self.queue.push_back(message);
        Ok(())
    }

    fn drain(&mut self) -> Vec<Message<Report>> {
        while let Some(message) = self.queue.pop_front() {
            for colony in self.colonies.iter_mut() {
                colony.handle(message.clone());
            }
        }

        if self.ticks.poll(self.clock.now()) {
            for colony in self.colonies.iter_mut() {
                // the receiving end lives in this pool, so sending can't fail
                if let Err(e) = colony.tick(self.clock.as_ref()) {
                    warn!("colony {} failed to tick: {}", colony.id(), e);
                }
            }
        }

        self.reports.try_iter().collect()
    }

    fn is_parallel(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        colony::BurstControl,
        grid::Topology,
        message::{Epoch, PathReport, SpotRef},
        scheduler::{ManualClock, SystemClock},
        settings::Settings,
    };
    use std::time::{Duration, Instant};

    fn options() -> ColonyOptions {
        ColonyOptions::builder()
            .population(2)
            .initial_burst(1)
            .burst_control(BurstControl::builder().step(0).min(1).max(1).build())
            .seed(23)
            .build()
    }

    // A -> B, edge 0
    fn configure(pool: &mut dyn WorkerPool, timestamp: Epoch) {
        let commands = vec![
            Command::Grid(Topology {
                cells: vec![vec![0], vec![]],
                edges: vec![1],
            }),
            Command::Settings(Settings::default()),
            Command::Sources(vec![SpotRef { cell: 0, w: 1.0 }]),
            Command::Targets(vec![SpotRef { cell: 1, w: 1.0 }]),
            Command::Heuristics(vec![vec![1.0]]),
            Command::Trails(vec![vec![1.0]]),
        ];
        for command in commands {
            pool.broadcast(Message::new(command, timestamp)).unwrap();
        }
    }

    /// Drains until `done` holds for everything collected or five seconds pass.
    fn collect_until<F>(pool: &mut dyn WorkerPool, done: F) -> Vec<Message<Report>>
    where
        F: Fn(&[Message<Report>]) -> bool,
    {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut reports = Vec::new();
        while Instant::now() < deadline {
            reports.extend(pool.drain());
            if done(&reports) {
                break;
            }
            thread::sleep(Duration::from_millis(2));
        }
        reports
    }

    fn collect_for(pool: &mut dyn WorkerPool, duration: Duration) -> Vec<Message<Report>> {
        let deadline = Instant::now() + duration;
        let mut reports = Vec::new();
        while Instant::now() < deadline {
            reports.extend(pool.drain());
            thread::sleep(Duration::from_millis(2));
        }
        reports
    }

    macro_rules! pool_contract {
        ($module:ident, $make:expr) => {
            mod $module {
                use super::*;

                fn make(workers: usize) -> Box<dyn WorkerPool> {
                    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
                    $make(workers, &options(), clock)
                }

                #[test]
                fn reports_size() {
                    assert_eq!(3, make(3).size());
                }

                #[test]
                fn nothing_is_reported_before_start() {
                    let mut pool = make(2);
                    configure(pool.as_mut(), Epoch(1));

                    let reports = collect_for(pool.as_mut(), Duration::from_millis(100));

                    assert!(reports.is_empty());
                }

                #[test]
                fn arrivals_carry_the_latest_applied_epoch() {
                    let mut pool = make(2);
                    configure(pool.as_mut(), Epoch(1));
                    pool.broadcast(Message::new(Command::Start, Epoch(2))).unwrap();

                    let reports = collect_until(pool.as_mut(), |r| r.len() >= 4);

                    assert!(reports.len() >= 4);
                    for report in &reports {
                        assert_eq!(Epoch(2), report.timestamp);
                        assert_eq!(
                            Report::Path(PathReport {
                                source: 0,
                                target: 0,
                                edges: vec![0],
                            }),
                            report.value
                        );
                    }
                }

                #[test]
                fn epochs_never_go_backwards_for_one_colony() {
                    let mut pool = make(1);
                    configure(pool.as_mut(), Epoch(1));
                    pool.broadcast(Message::new(Command::Start, Epoch(2))).unwrap();
                    collect_until(pool.as_mut(), |r| !r.is_empty());

                    pool.broadcast(Message::new(Command::Trails(vec![vec![0.5]]), Epoch(3)))
                        .unwrap();
                    let reports = collect_until(pool.as_mut(), |r| {
                        r.iter().any(|report| report.timestamp == Epoch(3))
                    });

                    let epochs: Vec<_> = reports.iter().map(|r| r.timestamp).collect();
                    assert!(epochs.contains(&Epoch(3)));
                    assert!(epochs.windows(2).all(|pair| pair[0] <= pair[1]));
                }

                #[test]
                fn budget_does_not_move_the_epoch() {
                    let mut pool = make(1);
                    configure(pool.as_mut(), Epoch(1));
                    pool.broadcast(Message::new(Command::Start, Epoch(2))).unwrap();
                    pool.broadcast(Message::new(Command::Budget(5), Epoch(7))).unwrap();

                    let reports = collect_until(pool.as_mut(), |r| r.len() >= 2);

                    assert!(!reports.is_empty());
                    assert!(reports.iter().all(|r| r.timestamp == Epoch(2)));
                }

                #[test]
                fn stop_ends_reporting() {
                    let mut pool = make(2);
                    configure(pool.as_mut(), Epoch(1));
                    pool.broadcast(Message::new(Command::Start, Epoch(2))).unwrap();
                    collect_until(pool.as_mut(), |r| !r.is_empty());

                    pool.broadcast(Message::new(Command::Stop, Epoch(3))).unwrap();
                    let trailing = collect_for(pool.as_mut(), Duration::from_millis(100));
                    let after = collect_for(pool.as_mut(), Duration::from_millis(100));

                    assert!(trailing.iter().all(|r| r.timestamp < Epoch(3)));
                    assert!(after.is_empty());
                }
            }
        };
    }

    pool_contract!(parallel, |workers, options: &ColonyOptions, clock| {
        Box::new(ParallelPool::spawn(workers, options, clock).unwrap()) as Box<dyn WorkerPool>
    });

    pool_contract!(cooperative, |workers, options: &ColonyOptions, clock| {
        Box::new(CooperativePool::new(workers, options, clock)) as Box<dyn WorkerPool>
    });

    #[test]
    fn cooperative_pool_applies_messages_in_order_on_drain() {
        let clock = ManualClock::new();
        let mut pool = CooperativePool::new(2, &options(), Arc::new(clock.clone()));
        configure(&mut pool, Epoch(1));
        pool.broadcast(Message::new(Command::Start, Epoch(2))).unwrap();
        assert!(pool.colonies().iter().all(|c| !c.is_running()));

        assert!(pool.drain().is_empty());
        assert!(pool
            .colonies()
            .iter()
            .all(|c| c.is_running() && c.epoch() == Epoch(2)));

        clock.advance(TICK_PERIOD);
        let reports = pool.drain();

        // one sweep of two ants over a single edge, per colony
        assert_eq!(4, reports.len());
    }

    #[test]
    fn spawn_pool_prefers_threads() {
        let pool = spawn_pool(2, &options(), Arc::new(SystemClock::new()));

        assert!(pool.is_parallel());
        assert_eq!(2, pool.size());
    }
}
