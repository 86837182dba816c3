pub mod ant;
pub mod colony;
pub mod controller;
pub mod errors;
pub mod grid;
pub mod heuristic;
pub mod message;
pub mod point2;
pub mod pool;
pub mod presets;
pub mod scheduler;
pub mod settings;
pub mod spot;
pub mod util;

pub use controller::{Aco, State};
pub use errors::AcoError;
pub use grid::{Grid, Topology};
pub use heuristic::{Heuristic, HeuristicKind};
pub use point2::Point2;
pub use pool::{spawn_pool, WorkerPool};
pub use settings::{Settings, SettingsUpdate, DEFAULT_SETTINGS_FILE};
