use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// In-game actions a player can bind hardware inputs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlayerActionType {
    Throw,
    Whistle,
    MoveRight,
    MoveUp,
    MoveLeft,
    MoveDown,
    CursorRight,
    CursorUp,
    CursorLeft,
    CursorDown,
    GroupMoveRight,
    GroupMoveUp,
    GroupMoveLeft,
    GroupMoveDown,
    GroupMoveToCursor,
    SwitchLeaderRight,
    SwitchLeaderLeft,
    Dismiss,
    UseSpray1,
    UseSpray2,
    UseSpray,
    SwitchSprayRight,
    SwitchSprayLeft,
    SwitchZoom,
    ZoomIn,
    ZoomOut,
    SwitchTypeRight,
    SwitchTypeLeft,
    SwitchMaturityUp,
    SwitchMaturityDown,
    LieDown,
    Pause,
}

impl PlayerActionType {
    pub const ALL: [PlayerActionType; 32] = [
        PlayerActionType::Throw,
        PlayerActionType::Whistle,
        PlayerActionType::MoveRight,
        PlayerActionType::MoveUp,
        PlayerActionType::MoveLeft,
        PlayerActionType::MoveDown,
        PlayerActionType::CursorRight,
        PlayerActionType::CursorUp,
        PlayerActionType::CursorLeft,
        PlayerActionType::CursorDown,
        PlayerActionType::GroupMoveRight,
        PlayerActionType::GroupMoveUp,
        PlayerActionType::GroupMoveLeft,
        PlayerActionType::GroupMoveDown,
        PlayerActionType::GroupMoveToCursor,
        PlayerActionType::SwitchLeaderRight,
        PlayerActionType::SwitchLeaderLeft,
        PlayerActionType::Dismiss,
        PlayerActionType::UseSpray1,
        PlayerActionType::UseSpray2,
        PlayerActionType::UseSpray,
        PlayerActionType::SwitchSprayRight,
        PlayerActionType::SwitchSprayLeft,
        PlayerActionType::SwitchZoom,
        PlayerActionType::ZoomIn,
        PlayerActionType::ZoomOut,
        PlayerActionType::SwitchTypeRight,
        PlayerActionType::SwitchTypeLeft,
        PlayerActionType::SwitchMaturityUp,
        PlayerActionType::SwitchMaturityDown,
        PlayerActionType::LieDown,
        PlayerActionType::Pause,
    ];

    /// Name used in the options file.
    pub const fn name(self) -> &'static str {
        match self {
            PlayerActionType::Throw => "throw",
            PlayerActionType::Whistle => "whistle",
            PlayerActionType::MoveRight => "move_right",
            PlayerActionType::MoveUp => "move_up",
            PlayerActionType::MoveLeft => "move_left",
            PlayerActionType::MoveDown => "move_down",
            PlayerActionType::CursorRight => "cursor_right",
            PlayerActionType::CursorUp => "cursor_up",
            PlayerActionType::CursorLeft => "cursor_left",
            PlayerActionType::CursorDown => "cursor_down",
            PlayerActionType::GroupMoveRight => "group_move_right",
            PlayerActionType::GroupMoveUp => "group_move_up",
            PlayerActionType::GroupMoveLeft => "group_move_left",
            PlayerActionType::GroupMoveDown => "group_move_down",
            PlayerActionType::GroupMoveToCursor => "group_move_to_cursor",
            PlayerActionType::SwitchLeaderRight => "switch_leader_right",
            PlayerActionType::SwitchLeaderLeft => "switch_leader_left",
            PlayerActionType::Dismiss => "dismiss",
            PlayerActionType::UseSpray1 => "use_spray_1",
            PlayerActionType::UseSpray2 => "use_spray_2",
            PlayerActionType::UseSpray => "use_spray",
            PlayerActionType::SwitchSprayRight => "switch_spray_right",
            PlayerActionType::SwitchSprayLeft => "switch_spray_left",
            PlayerActionType::SwitchZoom => "switch_zoom",
            PlayerActionType::ZoomIn => "zoom_in",
            PlayerActionType::ZoomOut => "zoom_out",
            PlayerActionType::SwitchTypeRight => "switch_type_right",
            PlayerActionType::SwitchTypeLeft => "switch_type_left",
            PlayerActionType::SwitchMaturityUp => "switch_maturity_up",
            PlayerActionType::SwitchMaturityDown => "switch_maturity_down",
            PlayerActionType::LieDown => "lie_down",
            PlayerActionType::Pause => "pause",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.name() == name)
    }
}

/// A physical input source. Controller axes come in a positive and a
/// negative half so each direction can be bound on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerInputKind {
    KeyboardKey { key: u32 },
    MouseButton { button: u32 },
    MouseWheelUp,
    MouseWheelDown,
    MouseWheelLeft,
    MouseWheelRight,
    ControllerButton { device: u32, button: u32 },
    ControllerAxisPos { device: u32, stick: u32, axis: u32 },
    ControllerAxisNeg { device: u32, stick: u32, axis: u32 },
}

impl PlayerInputKind {
    /// Parses bind strings: `k_<key>`, `mb_<button>`, `mwu`, `mwd`, `mwl`,
    /// `mwr`, `jb_<device>_<button>`, `jap_<device>_<stick>_<axis>` and
    /// `jan_<device>_<stick>_<axis>`.
    pub fn parse_bind(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('_');
        let prefix = parts.next()?;
        let numbers = parts
            .map(|part| part.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        let kind = match (prefix, numbers.as_slice()) {
            ("k", [key]) => PlayerInputKind::KeyboardKey { key: *key },
            ("mb", [button]) => PlayerInputKind::MouseButton { button: *button },
            ("mwu", []) => PlayerInputKind::MouseWheelUp,
            ("mwd", []) => PlayerInputKind::MouseWheelDown,
            ("mwl", []) => PlayerInputKind::MouseWheelLeft,
            ("mwr", []) => PlayerInputKind::MouseWheelRight,
            ("jb", [device, button]) => PlayerInputKind::ControllerButton {
                device: *device,
                button: *button,
            },
            ("jap", [device, stick, axis]) => PlayerInputKind::ControllerAxisPos {
                device: *device,
                stick: *stick,
                axis: *axis,
            },
            ("jan", [device, stick, axis]) => PlayerInputKind::ControllerAxisNeg {
                device: *device,
                stick: *stick,
                axis: *axis,
            },
            _ => return None,
        };
        Some(kind)
    }

    fn axis(self) -> Option<(u32, u32, u32)> {
        match self {
            PlayerInputKind::ControllerAxisPos {
                device,
                stick,
                axis,
            }
            | PlayerInputKind::ControllerAxisNeg {
                device,
                stick,
                axis,
            } => Some((device, stick, axis)),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerInputKind::KeyboardKey { key } => write!(f, "k_{key}"),
            PlayerInputKind::MouseButton { button } => write!(f, "mb_{button}"),
            PlayerInputKind::MouseWheelUp => f.write_str("mwu"),
            PlayerInputKind::MouseWheelDown => f.write_str("mwd"),
            PlayerInputKind::MouseWheelLeft => f.write_str("mwl"),
            PlayerInputKind::MouseWheelRight => f.write_str("mwr"),
            PlayerInputKind::ControllerButton { device, button } => {
                write!(f, "jb_{device}_{button}")
            }
            PlayerInputKind::ControllerAxisPos {
                device,
                stick,
                axis,
            } => write!(f, "jap_{device}_{stick}_{axis}"),
            PlayerInputKind::ControllerAxisNeg {
                device,
                stick,
                axis,
            } => write!(f, "jan_{device}_{stick}_{axis}"),
        }
    }
}

/// One hardware reading. Buttons and keys use 0 or 1; axis inputs carry the
/// signed stick position on that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub kind: PlayerInputKind,
    pub value: f32,
}

impl PlayerInput {
    pub fn new(kind: PlayerInputKind, value: f32) -> Self {
        Self { kind, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlBind {
    pub action: PlayerActionType,
    pub input: PlayerInputKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAction {
    pub action: PlayerActionType,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickDeadZone {
    pub min: f32,
    pub max: f32,
}

impl Default for StickDeadZone {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Turns hardware inputs into player actions. Inputs update per-action
/// values; `new_frame` queues one action for every value that changed since
/// the previous frame.
#[derive(Debug, Clone, Default)]
pub struct ControlsManager {
    binds: Vec<ControlBind>,
    dead_zone: StickDeadZone,
    raw_sticks: BTreeMap<(u32, u32), [f32; 2]>,
    clean_sticks: BTreeMap<(u32, u32), [f32; 2]>,
    action_values: BTreeMap<PlayerActionType, f32>,
    old_action_values: BTreeMap<PlayerActionType, f32>,
    action_queue: VecDeque<PlayerAction>,
}

impl ControlsManager {
    pub fn new(binds: Vec<ControlBind>, dead_zone: StickDeadZone) -> Self {
        Self {
            binds,
            dead_zone,
            ..Self::default()
        }
    }

    pub fn binds(&self) -> &[ControlBind] {
        &self.binds
    }

    /// Stick position after the dead zone is applied.
    pub fn clean_stick(&self, device: u32, stick: u32) -> [f32; 2] {
        self.clean_sticks
            .get(&(device, stick))
            .copied()
            .unwrap_or_default()
    }

    pub fn handle_input(&mut self, input: &PlayerInput) {
        let Some((device, stick, axis)) = input.kind.axis() else {
            for action in self.actions_bound_to(input.kind) {
                self.action_values.insert(action, input.value);
            }
            return;
        };
        if axis > 1 {
            return;
        }

        let raw = self.raw_sticks.entry((device, stick)).or_default();
        raw[axis as usize] = input.value;
        let clean = clean_stick(*raw, self.dead_zone);
        self.clean_sticks.insert((device, stick), clean);

        let position = clean[axis as usize];
        let halves = [
            (
                PlayerInputKind::ControllerAxisPos {
                    device,
                    stick,
                    axis,
                },
                position.max(0.0),
            ),
            (
                PlayerInputKind::ControllerAxisNeg {
                    device,
                    stick,
                    axis,
                },
                (-position).max(0.0),
            ),
        ];
        for (kind, value) in halves {
            for action in self.actions_bound_to(kind) {
                self.action_values.insert(action, value);
            }
        }
    }

    /// Starts a frame: drops unpolled actions and queues the changed ones.
    pub fn new_frame(&mut self) {
        self.action_queue.clear();
        for (&action, &value) in &self.action_values {
            let old = self.old_action_values.get(&action).copied().unwrap_or(0.0);
            if old != value {
                self.action_queue.push_back(PlayerAction { action, value });
            }
        }
        self.old_action_values = self.action_values.clone();
    }

    pub fn poll_action(&mut self) -> Option<PlayerAction> {
        self.action_queue.pop_front()
    }

    fn actions_bound_to(&self, kind: PlayerInputKind) -> Vec<PlayerActionType> {
        self.binds
            .iter()
            .filter(|bind| bind.input == kind)
            .map(|bind| bind.action)
            .collect()
    }
}

/// Clamps the stick magnitude into the dead zone range and rescales it to
/// 0..=1, keeping the direction.
fn clean_stick(raw: [f32; 2], dead_zone: StickDeadZone) -> [f32; 2] {
    let span = dead_zone.max - dead_zone.min;
    if span <= 0.0 {
        return raw;
    }
    let angle = raw[1].atan2(raw[0]);
    let magnitude = (raw[0] * raw[0] + raw[1] * raw[1])
        .sqrt()
        .clamp(dead_zone.min, dead_zone.max);
    let magnitude = (magnitude - dead_zone.min) / span;
    [angle.cos() * magnitude, angle.sin() * magnitude]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(action: PlayerActionType, input: &str) -> ControlBind {
        ControlBind {
            action,
            input: PlayerInputKind::parse_bind(input).expect("bind"),
        }
    }

    fn drain(controls: &mut ControlsManager) -> Vec<PlayerAction> {
        std::iter::from_fn(|| controls.poll_action()).collect()
    }

    #[test]
    fn bind_strings_parse_and_print() {
        for text in ["k_23", "mb_1", "mwu", "mwd", "mwl", "mwr", "jb_0_3", "jap_0_1_0", "jan_1_0_1"] {
            let kind = PlayerInputKind::parse_bind(text).expect(text);
            assert_eq!(kind.to_string(), text);
        }
        assert_eq!(PlayerInputKind::parse_bind("k_"), None);
        assert_eq!(PlayerInputKind::parse_bind("jb_0"), None);
        assert_eq!(PlayerInputKind::parse_bind("mwu_1"), None);
        assert_eq!(PlayerInputKind::parse_bind("x_1"), None);
    }

    #[test]
    fn only_changed_values_become_actions() {
        let mut controls = ControlsManager::new(
            vec![
                bind(PlayerActionType::Whistle, "k_23"),
                bind(PlayerActionType::Throw, "mb_1"),
            ],
            StickDeadZone::default(),
        );
        let key = PlayerInputKind::KeyboardKey { key: 23 };

        controls.handle_input(&PlayerInput::new(key, 1.0));
        controls.handle_input(&PlayerInput::new(PlayerInputKind::KeyboardKey { key: 5 }, 1.0));
        controls.new_frame();
        assert_eq!(
            drain(&mut controls),
            vec![PlayerAction {
                action: PlayerActionType::Whistle,
                value: 1.0
            }]
        );

        controls.handle_input(&PlayerInput::new(key, 1.0));
        controls.new_frame();
        assert!(drain(&mut controls).is_empty());

        controls.handle_input(&PlayerInput::new(key, 0.0));
        controls.new_frame();
        assert_eq!(drain(&mut controls)[0].value, 0.0);
    }

    #[test]
    fn unpolled_actions_are_dropped_next_frame() {
        let mut controls =
            ControlsManager::new(vec![bind(PlayerActionType::Pause, "k_59")], StickDeadZone::default());
        controls.handle_input(&PlayerInput::new(PlayerInputKind::KeyboardKey { key: 59 }, 1.0));
        controls.new_frame();
        controls.new_frame();
        assert_eq!(controls.poll_action(), None);
    }

    #[test]
    fn stick_halves_feed_opposite_actions_through_the_dead_zone() {
        let mut controls = ControlsManager::new(
            vec![
                bind(PlayerActionType::MoveRight, "jap_0_0_0"),
                bind(PlayerActionType::MoveLeft, "jan_0_0_0"),
            ],
            StickDeadZone { min: 0.2, max: 0.8 },
        );
        let axis = PlayerInputKind::ControllerAxisNeg {
            device: 0,
            stick: 0,
            axis: 0,
        };

        controls.handle_input(&PlayerInput::new(axis, 0.1));
        controls.new_frame();
        assert!(drain(&mut controls).is_empty());

        controls.handle_input(&PlayerInput::new(axis, -0.5));
        controls.new_frame();
        let actions = drain(&mut controls);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, PlayerActionType::MoveLeft);
        assert!((actions[0].value - 0.5).abs() < 1.0e-5);

        controls.handle_input(&PlayerInput::new(axis, 1.0));
        controls.new_frame();
        let actions = drain(&mut controls);
        let right = actions
            .iter()
            .find(|action| action.action == PlayerActionType::MoveRight)
            .expect("right");
        assert!((right.value - 1.0).abs() < 1.0e-5);
        assert!(actions
            .iter()
            .any(|action| action.action == PlayerActionType::MoveLeft && action.value == 0.0));
    }

    #[test]
    fn action_names_round_trip() {
        for action in PlayerActionType::ALL {
            assert_eq!(PlayerActionType::from_name(action.name()), Some(action));
        }
    }
}
