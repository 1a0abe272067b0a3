use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sprout_engine::{ControlBind, LoopConfig, PlayerActionType, PlayerInputKind, StickDeadZone};
use thiserror::Error;
use tracing::info;

pub(crate) const OPTIONS_FILE: &str = "options.json";

#[derive(Debug, Error)]
pub(crate) enum OptionsError {
    #[error("failed to read options file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid options file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("control bind {index} names unknown action '{action}'")]
    UnknownAction { index: usize, action: String },
    #[error("control bind {index} has invalid input '{input}'")]
    InvalidBind { index: usize, input: String },
    #[error("option '{field}' {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BindEntry {
    pub(crate) action: String,
    pub(crate) input: String,
}

impl BindEntry {
    fn new(action: PlayerActionType, input: &str) -> Self {
        Self {
            action: action.name().to_string(),
            input: input.to_string(),
        }
    }
}

/// Player options stored as `user_data/options.json`. Every field is
/// optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameOptions {
    pub(crate) target_tps: u32,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) frames_to_run: u64,
    /// Fixed frame length in milliseconds. Absent means wall-clock frames.
    pub(crate) virtual_frame_ms: Option<u64>,
    pub(crate) area: String,
    pub(crate) rng_seed: u64,
    pub(crate) stick_min_deadzone: f32,
    pub(crate) stick_max_deadzone: f32,
    pub(crate) controls: Vec<BindEntry>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks_per_frame: 5,
            frames_to_run: 600,
            virtual_frame_ms: None,
            area: "test_field".to_string(),
            rng_seed: 0,
            stick_min_deadzone: 0.2,
            stick_max_deadzone: 0.9,
            controls: default_controls(),
        }
    }
}

fn default_controls() -> Vec<BindEntry> {
    vec![
        BindEntry::new(PlayerActionType::Throw, "mb_1"),
        BindEntry::new(PlayerActionType::Whistle, "mb_2"),
        BindEntry::new(PlayerActionType::MoveRight, "k_4"),
        BindEntry::new(PlayerActionType::MoveUp, "k_23"),
        BindEntry::new(PlayerActionType::MoveLeft, "k_1"),
        BindEntry::new(PlayerActionType::MoveDown, "k_19"),
        BindEntry::new(PlayerActionType::GroupMoveToCursor, "k_75"),
        BindEntry::new(PlayerActionType::SwitchLeaderRight, "k_64"),
        BindEntry::new(PlayerActionType::Dismiss, "k_215"),
        BindEntry::new(PlayerActionType::UseSpray1, "k_18"),
        BindEntry::new(PlayerActionType::UseSpray2, "k_6"),
        BindEntry::new(PlayerActionType::ZoomIn, "mwu"),
        BindEntry::new(PlayerActionType::ZoomOut, "mwd"),
        BindEntry::new(PlayerActionType::SwitchTypeRight, "mb_3"),
        BindEntry::new(PlayerActionType::LieDown, "k_26"),
        BindEntry::new(PlayerActionType::Pause, "k_59"),
        BindEntry::new(PlayerActionType::MoveRight, "jap_0_0_0"),
        BindEntry::new(PlayerActionType::MoveLeft, "jan_0_0_0"),
        BindEntry::new(PlayerActionType::MoveDown, "jap_0_0_1"),
        BindEntry::new(PlayerActionType::MoveUp, "jan_0_0_1"),
        BindEntry::new(PlayerActionType::Throw, "jb_0_0"),
        BindEntry::new(PlayerActionType::Whistle, "jb_0_1"),
    ]
}

impl GameOptions {
    pub(crate) fn validate(&self) -> Result<(), OptionsError> {
        if self.target_tps == 0 {
            return Err(OptionsError::Invalid {
                field: "target_tps",
                reason: "must be at least 1",
            });
        }
        if self.max_ticks_per_frame == 0 {
            return Err(OptionsError::Invalid {
                field: "max_ticks_per_frame",
                reason: "must be at least 1",
            });
        }
        if self.area.trim().is_empty() {
            return Err(OptionsError::Invalid {
                field: "area",
                reason: "must name an area",
            });
        }
        let dead_zone = self.dead_zone();
        if !(0.0..=1.0).contains(&dead_zone.min)
            || !(0.0..=1.0).contains(&dead_zone.max)
            || dead_zone.min >= dead_zone.max
        {
            return Err(OptionsError::Invalid {
                field: "stick_min_deadzone",
                reason: "must be below stick_max_deadzone, both within 0..=1",
            });
        }
        Ok(())
    }

    pub(crate) fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            target_tps: self.target_tps,
            max_ticks_per_frame: self.max_ticks_per_frame,
            frames_to_run: self.frames_to_run,
            frame_delta: self.virtual_frame_ms.map(Duration::from_millis),
            ..LoopConfig::default()
        }
    }

    pub(crate) fn dead_zone(&self) -> StickDeadZone {
        StickDeadZone {
            min: self.stick_min_deadzone,
            max: self.stick_max_deadzone,
        }
    }

    pub(crate) fn control_binds(&self) -> Result<Vec<ControlBind>, OptionsError> {
        self.controls
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let action = PlayerActionType::from_name(&entry.action).ok_or_else(|| {
                    OptionsError::UnknownAction {
                        index,
                        action: entry.action.clone(),
                    }
                })?;
                let input = PlayerInputKind::parse_bind(&entry.input).ok_or_else(|| {
                    OptionsError::InvalidBind {
                        index,
                        input: entry.input.clone(),
                    }
                })?;
                Ok(ControlBind { action, input })
            })
            .collect()
    }
}

/// Reads `options.json` from the user data dir. A missing file yields the
/// defaults.
pub(crate) fn load_options(user_data_dir: &Path) -> Result<GameOptions, OptionsError> {
    let path = user_data_dir.join(OPTIONS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "options_defaults");
            return Ok(GameOptions::default());
        }
        Err(source) => return Err(OptionsError::Read { path, source }),
    };

    let deserializer = &mut serde_json::Deserializer::from_str(&raw);
    let options: GameOptions = serde_path_to_error::deserialize(deserializer)
        .map_err(|source| OptionsError::Parse {
            path: path.clone(),
            source,
        })?;
    options.validate()?;
    info!(
        path = %path.display(),
        area = options.area.as_str(),
        binds = options.controls.len(),
        "options_loaded"
    );
    Ok(options)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_options(temp: &TempDir, json: &str) {
        fs::write(temp.path().join(OPTIONS_FILE), json).expect("write options");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let temp = TempDir::new().expect("temp");
        let options = load_options(temp.path()).expect("options");
        assert_eq!(options, GameOptions::default());
        assert!(options.control_binds().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().expect("temp");
        write_options(
            &temp,
            r#"{ "frames_to_run": 30, "virtual_frame_ms": 20, "controls": [
                { "action": "whistle", "input": "k_23" }
            ] }"#,
        );

        let options = load_options(temp.path()).expect("options");
        assert_eq!(options.frames_to_run, 30);
        assert_eq!(options.target_tps, 60);
        let config = options.loop_config();
        assert_eq!(config.frame_delta, Some(Duration::from_millis(20)));
        assert_eq!(
            options.control_binds().expect("binds"),
            vec![ControlBind {
                action: PlayerActionType::Whistle,
                input: PlayerInputKind::KeyboardKey { key: 23 },
            }]
        );
    }

    #[test]
    fn parse_errors_name_the_field_path() {
        let temp = TempDir::new().expect("temp");
        write_options(&temp, r#"{ "controls": [ { "action": "throw", "input": 5 } ] }"#);

        let error = load_options(temp.path()).expect_err("bad type");
        let OptionsError::Parse { source, .. } = &error else {
            panic!("expected parse error, got {error}");
        };
        assert_eq!(source.path().to_string(), "controls[0].input");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp = TempDir::new().expect("temp");
        write_options(&temp, r#"{ "tick_rate": 30 }"#);
        assert!(matches!(
            load_options(temp.path()),
            Err(OptionsError::Parse { .. })
        ));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let temp = TempDir::new().expect("temp");
        write_options(&temp, r#"{ "target_tps": 0 }"#);
        assert!(matches!(
            load_options(temp.path()),
            Err(OptionsError::Invalid {
                field: "target_tps",
                ..
            })
        ));

        write_options(&temp, r#"{ "stick_min_deadzone": 0.9, "stick_max_deadzone": 0.5 }"#);
        assert!(matches!(
            load_options(temp.path()),
            Err(OptionsError::Invalid { .. })
        ));
    }

    #[test]
    fn bad_binds_report_their_index() {
        let options = GameOptions {
            controls: vec![
                BindEntry::new(PlayerActionType::Pause, "k_59"),
                BindEntry::new(PlayerActionType::Pause, "joystick"),
            ],
            ..GameOptions::default()
        };
        assert!(matches!(
            options.control_binds(),
            Err(OptionsError::InvalidBind { index: 1, .. })
        ));

        let options = GameOptions {
            controls: vec![BindEntry {
                action: "sprint".to_string(),
                input: "k_1".to_string(),
            }],
            ..GameOptions::default()
        };
        assert!(matches!(
            options.control_binds(),
            Err(OptionsError::UnknownAction { index: 0, .. })
        ));
    }
}
