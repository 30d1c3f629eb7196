use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use ember_game::levels::LevelError;
use ember_game::ports::{NoopNarrative, NoopNotifier, Ports};
use ember_game::session::DEFAULT_SEED;
use ember_game::Game;
use engine::{FileSaveStore, SaveTransport, SlotStoreError, StartupError};
use thiserror::Error;
use tracing::{error, info};

use super::bootstrap::AppWiring;

#[derive(Debug, Error)]
pub(crate) enum RunError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Slot(#[from] SlotStoreError),
    #[error("failed to encode save payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub(crate) fn run(app: Result<AppWiring, StartupError>) -> ExitCode {
    if let Err(err) = app.map_err(RunError::from).and_then(|app| run_session(&app)) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

fn run_session(app: &AppWiring) -> Result<(), RunError> {
    let config = &app.config;
    let mut store = FileSaveStore::new(app.paths.saves_dir.clone());
    let mut narrative = NoopNarrative;
    let mut notifier = NoopNotifier;

    let mut game = Game::with_builtin_levels(DEFAULT_SEED)?;
    game.start(config.start_level, &mut narrative)?;

    if let Some(raw) = store.get(&config.user, &config.slot)? {
        let mut ports = Ports::new(&mut narrative, &mut notifier);
        if let Ok(outcome) = game.load_data_payload(&mut ports, &raw) {
            info!(outcome = ?outcome, "slot_loaded");
        }
    }

    let dt = config.dt();
    let mut stepped = 0u32;
    for _ in 0..config.ticks {
        if game.session.requested_level_switch.is_some() {
            let mut ports = Ports::new(&mut narrative, &mut notifier);
            if let Ok(outcome) = game.process_level_switch(&mut ports) {
                info!(outcome = ?outcome, level = game.session.current_level, "level_switched");
            }
        }
        if game.step(dt) {
            stepped += 1;
        }
    }

    let json = game.save_json(now_epoch_ms())?;
    store.put(&config.user, &config.slot, &json)?;
    info!(
        ticks = stepped,
        level = game.session.current_level,
        enemies = game.world.enemies.len(),
        bytes = json.len(),
        "session_saved"
    );
    Ok(())
}
