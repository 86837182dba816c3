use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcoError {
    #[error("heuristic has {actual} entries but the grid has {expected} edges")]
    HeuristicLength { expected: usize, actual: usize },
    #[error("ant count {requested} is lower than the worker pool size {workers}")]
    AntCountBelowPoolSize { requested: usize, workers: usize },
    #[error("unable to run: at least one source is required")]
    NoSources,
    #[error("unable to run: at least one target is required")]
    NoTargets,
    #[error("unable to run: the per-worker budget must be positive")]
    NonPositiveBudget,
    #[error("cell {cell} is not part of a grid with {cells} cells")]
    InvalidCell { cell: usize, cells: usize },
    #[error("edge {edge} references cell {cell} but the grid has {cells} cells")]
    InvalidEdge { edge: usize, cell: usize, cells: usize },
    #[error("spot weight must be positive and finite, got {0}")]
    InvalidWeight(f64),
    #[error("setting '{name}' is out of range: {value}")]
    InvalidSetting { name: &'static str, value: f64 },
    #[error("there is no spot at position {0}")]
    UnknownSpot(usize),
    #[error("'{0}' is not a known heuristic")]
    UnknownHeuristic(String),
    #[error("the '{0}' heuristic needs an obstacle map")]
    MissingObstacleMap(&'static str),
    #[error("'{0}' is not a known preset")]
    UnknownPreset(String),
    #[error("worker {0} is no longer listening")]
    WorkerDisconnected(usize),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Config(#[from] config::ConfigError),
}
