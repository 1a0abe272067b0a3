use sprout_engine::{resolve_app_paths, AppPaths, ControlsManager, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::options::{load_options, GameOptions, OptionsError};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Options(#[from] OptionsError),
}

pub(crate) struct AppWiring {
    pub(crate) paths: AppPaths,
    pub(crate) options: GameOptions,
    pub(crate) controls: ControlsManager,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Sprout Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        game_data_dir = %paths.game_data_dir.display(),
        user_data_dir = %paths.user_data_dir.display(),
        "startup"
    );

    let options = load_options(&paths.user_data_dir)?;
    let controls = ControlsManager::new(options.control_binds()?, options.dead_zone());
    info!(binds = controls.binds().len(), "controls_ready");

    Ok(AppWiring {
        paths,
        options,
        controls,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
