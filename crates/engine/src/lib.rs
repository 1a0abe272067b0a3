use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod fsm;
pub mod geometry;
pub mod mob;
pub mod script;
pub mod sim;
pub mod world;

pub use app::{
    run_headless, AppError, ControlBind, ControlsManager, FrameDriver, IdleDriver, LoopConfig,
    LoopMetricsSnapshot, LoopSummary, MetricsHandle, PlayerAction, PlayerActionType, PlayerInput,
    PlayerInputKind, SimulationMetrics, StickDeadZone,
};
pub use content::{
    create_pack, ContentError, ContentErrorCode, ContentLoadError, ContentLoadLevel,
    ContentLoadReport, ContentManager, ContentManifest, ContentType, MissionData, MissionGoal,
    MissionMedal, PackInfo, PackMetadata, SourceLocation, BASE_PACK_NAME,
};
pub use geometry::Vec2;
pub use mob::{Mob, MobCategory, MobId, MobTeam, MobType};
pub use sim::{MissionResult, MissionStatus, Simulation, SimulationError, SoundCue};

pub const ROOT_ENV_VAR: &str = "SPROUT_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub game_data_dir: PathBuf,
    pub user_data_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            game_data_dir: root.join("game_data"),
            user_data_dir: root.join("user_data"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create user data directory at {path}: {source}")]
    CreateUserDataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "SPROUT_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or game_data/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or game_data/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/sprout\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let paths = AppPaths::from_root(&root);

    fs::create_dir_all(&paths.user_data_dir).map_err(|source| {
        StartupError::CreateUserDataDir {
            path: paths.user_data_dir.clone(),
            source,
        }
    })?;

    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_game_data = path.join("game_data").is_dir();

    cargo_toml && (has_crates || has_game_data)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }

    #[test]
    fn repo_marker_accepts_game_data_layout() {
        let temp = TempDir::new().expect("temp");
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("write");
        assert!(!is_repo_marker(temp.path()));
        fs::create_dir_all(temp.path().join("game_data")).expect("mkdir");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn paths_hang_off_root() {
        let paths = AppPaths::from_root(Path::new("/srv/sprout"));
        assert_eq!(paths.game_data_dir, Path::new("/srv/sprout/game_data"));
        assert_eq!(paths.user_data_dir, Path::new("/srv/sprout/user_data"));
    }
}
