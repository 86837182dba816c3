use antpath::{
    colony::ColonyOptions,
    heuristic::HeuristicKind,
    pool::{default_worker_count, spawn_pool},
    presets::init_preset_manager,
    scheduler::{Clock, Interval, SystemClock},
    Aco, AcoError, Grid, Settings, DEFAULT_SETTINGS_FILE,
};
use log::{error, info};
use std::{env, sync::Arc, thread, time::Duration};

pub const GRID_COLUMNS: usize = 40;
pub const GRID_ROWS: usize = 30;
pub const CELL_SPACING: f64 = 10.0;
pub const RUN_TIME: Duration = Duration::from_secs(10);
pub const FRAME_TIME: Duration = Duration::from_millis(16);
pub const STATUS_PERIOD: Duration = Duration::from_secs(1);

fn main() -> Result<(), AcoError> {
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = match env::var("ACO_PRESET") {
        Ok(name) => {
            let presets = init_preset_manager();
            match presets.settings_for(&name) {
                Ok(settings) => {
                    info!("using the '{}' preset", name);
                    settings
                }
                Err(e) => {
                    error!("{}, pick one of {}", e, presets.names().join(", "));
                    return Err(e);
                }
            }
        }
        Err(_) => Settings::load_from_file(DEFAULT_SETTINGS_FILE)?,
    };
    let heuristic = match env::var("ACO_HEURISTIC") {
        Ok(name) => name.parse::<HeuristicKind>()?,
        Err(_) => HeuristicKind::CosineDistance,
    }
    .build(None)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let workers = default_worker_count().min(settings.ant_count).max(1);
    let pool = spawn_pool(workers, &ColonyOptions::default(), Arc::clone(&clock));

    let grid = Grid::rectangular(GRID_COLUMNS, GRID_ROWS, CELL_SPACING);
    let mut aco = Aco::new(grid, settings, heuristic, pool, Arc::clone(&clock))?;
    aco.add_source(0, 1.0)?;
    aco.add_target(GRID_COLUMNS * GRID_ROWS - 1, 1.0)?;
    aco.go()?;

    let mut status = Interval::new(STATUS_PERIOD);
    status.start(clock.now());
    while clock.now() < RUN_TIME {
        aco.update()?;

        if status.poll(clock.now()) {
            info!(
                "round {}, {:.0} arrivals/s, best path {}",
                aco.rounds(),
                aco.arrivals_per_second(),
                aco.best_path()
                    .map(|path| format!("{} edges", path.len()))
                    .unwrap_or_else(|| "not found yet".to_owned())
            );
        }

        thread::sleep(FRAME_TIME);
    }

    aco.halt()?;
    info!("done after {} rounds", aco.rounds());

    Ok(())
}
