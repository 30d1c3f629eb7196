use engine::{resolve_app_paths, AppPaths, StartupError};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::GameConfig;

pub(crate) struct AppWiring {
    pub(crate) config: GameConfig,
    pub(crate) paths: AppPaths,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Ember Startup ===");

    let config = GameConfig::from_env();
    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        saves = %paths.saves_dir.display(),
        user = %config.user,
        slot = %config.slot,
        start_level = config.start_level,
        "startup_config"
    );
    Ok(AppWiring { config, paths })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
