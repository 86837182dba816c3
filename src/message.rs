//! Everything that crosses the controller/worker boundary.
//!
//! Payloads are owned copies; nothing is shared between the two sides.

use crate::{grid::Topology, settings::Settings};

/// Configuration version. Strictly increasing per controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message<T> {
    pub value: T,
    pub timestamp: Epoch,
}

impl<T> Message<T> {
    pub fn new(value: T, timestamp: Epoch) -> Self {
        Self { value, timestamp }
    }
}

/// A spot as a worker sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotRef {
    pub cell: usize,
    pub w: f64,
}

/// Controller to worker.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Grid(Topology),
    Settings(Settings),
    Sources(Vec<SpotRef>),
    Targets(Vec<SpotRef>),
    /// One trail layer per target.
    Trails(Vec<Vec<f64>>),
    /// One heuristic vector per target.
    Heuristics(Vec<Vec<f64>>),
    Start,
    Stop,
    /// Advisory per-worker credit. Applied without touching the epoch.
    Budget(usize),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Grid(_) => "grid",
            Command::Settings(_) => "settings",
            Command::Sources(_) => "sources",
            Command::Targets(_) => "targets",
            Command::Trails(_) => "trails",
            Command::Heuristics(_) => "heuristics",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Budget(_) => "budget",
        }
    }

    /// Whether applying this command moves a worker to the message's epoch.
    pub fn carries_epoch(&self) -> bool {
        !matches!(self, Command::Budget(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathReport {
    /// Position of the source the ant started from.
    pub source: usize,
    /// Position of the target the ant arrived at.
    pub target: usize,
    /// Traversed edge indices, in walking order.
    pub edges: Vec<usize>,
}

impl PathReport {
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Worker to controller.
#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Path(PathReport),
}
