use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::mob::Mob;
use crate::sim::ScriptContext;

use super::events::{EventPayload, MobEventType};
use super::vars::{parse_bool, parse_f32, parse_i32};
use super::{loaders, runners};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
}

impl ParamKind {
    pub const fn label(self) -> &'static str {
        match self {
            ParamKind::Int => "integer",
            ParamKind::Float => "number",
            ParamKind::Bool => "boolean",
            ParamKind::Str => "text",
        }
    }
}

/// Whether a script author may pass a variable reference in a parameter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamBinding {
    Free,
    Const,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub binding: ParamBinding,
    /// Extras slots swallow every remaining token; only valid as the last slot.
    pub extras: bool,
}

const fn free(name: &'static str, kind: ParamKind) -> ActionParam {
    ActionParam {
        name,
        kind,
        binding: ParamBinding::Free,
        extras: false,
    }
}

const fn fixed(name: &'static str, kind: ParamKind) -> ActionParam {
    ActionParam {
        name,
        kind,
        binding: ParamBinding::Const,
        extras: false,
    }
}

const fn extras(name: &'static str, kind: ParamKind, binding: ParamBinding) -> ActionParam {
    ActionParam {
        name,
        kind,
        binding,
        extras: true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

impl ArgValue {
    pub(crate) fn parse_const(kind: ParamKind, token: &str) -> Option<ArgValue> {
        match kind {
            ParamKind::Int => token.parse::<i32>().ok().map(ArgValue::Int),
            ParamKind::Float => token
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .map(ArgValue::Float),
            ParamKind::Bool => match token {
                "true" => Some(ArgValue::Bool(true)),
                "false" => Some(ArgValue::Bool(false)),
                _ => None,
            },
            ParamKind::Str => Some(ArgValue::Str(token.to_string())),
        }
    }

    /// Interprets a variable's raw text as `kind`, falling back to zero values.
    pub(crate) fn from_var_text(kind: ParamKind, raw: &str) -> ArgValue {
        match kind {
            ParamKind::Int => ArgValue::Int(parse_i32(raw)),
            ParamKind::Float => ArgValue::Float(parse_f32(raw)),
            ParamKind::Bool => ArgValue::Bool(parse_bool(raw)),
            ParamKind::Str => ArgValue::Str(raw.to_string()),
        }
    }

    pub fn as_i32(&self) -> i32 {
        match self {
            ArgValue::Int(value) => *value,
            ArgValue::Float(value) => *value as i32,
            ArgValue::Bool(value) => i32::from(*value),
            ArgValue::Str(value) => parse_i32(value),
        }
    }

    pub fn as_f32(&self) -> f32 {
        match self {
            ArgValue::Int(value) => *value as f32,
            ArgValue::Float(value) => *value,
            ArgValue::Bool(value) => f32::from(u8::from(*value)),
            ArgValue::Str(value) => parse_f32(value),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            ArgValue::Int(value) => *value != 0,
            ArgValue::Float(value) => *value != 0.0,
            ArgValue::Bool(value) => *value,
            ArgValue::Str(value) => parse_bool(value),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            ArgValue::Int(value) => value.to_string(),
            ArgValue::Float(value) => value.to_string(),
            ArgValue::Bool(value) => value.to_string(),
            ArgValue::Str(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionArg {
    Const(ArgValue),
    Var { name: String, kind: ParamKind },
}

/// Argument values after variable references were read from the mob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedArgs(Vec<ArgValue>);

impl ResolvedArgs {
    pub fn new(values: Vec<ArgValue>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.0.get(index)
    }

    pub fn int(&self, index: usize) -> i32 {
        self.get(index).map(ArgValue::as_i32).unwrap_or(0)
    }

    pub fn float(&self, index: usize) -> f32 {
        self.get(index).map(ArgValue::as_f32).unwrap_or(0.0)
    }

    pub fn boolean(&self, index: usize) -> bool {
        self.get(index).map(ArgValue::as_bool).unwrap_or(false)
    }

    pub fn text(&self, index: usize) -> String {
        self.get(index).map(ArgValue::as_text).unwrap_or_default()
    }

    pub fn tail(&self, from: usize) -> &[ArgValue] {
        self.0.get(from..).unwrap_or_default()
    }
}

/// Everything an action sees while it runs.
pub struct ActionRunData<'r, 'w> {
    pub mob: &'r mut Mob,
    pub ctx: &'r mut ScriptContext<'w>,
    pub args: ResolvedArgs,
    pub payload: &'r EventPayload,
    pub event: MobEventType,
    /// Branch result, read only by control flow.
    pub return_value: bool,
}

pub type ActionRunner = fn(&mut ActionRunData<'_, '_>);

/// Validates and rewrites freshly bound arguments against the owning mob type.
pub type ActionLoader = fn(&mut Vec<ActionArg>, &ScriptLoadContext<'_>) -> Result<(), String>;

/// Names a mob type exposes to its own script at load time.
#[derive(Debug, Clone, Copy)]
pub struct ScriptLoadContext<'a> {
    pub animations: &'a [String],
    pub reaches: &'a [String],
    pub sounds: &'a [String],
    pub spawns: &'a [String],
    pub body_parts: &'a [String],
    pub status_types: &'a BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    AddHealth,
    Calculate,
    Delete,
    Else,
    EndIf,
    FinishDying,
    Focus,
    If,
    MoveToAbsolute,
    MoveToRelative,
    MoveToTarget,
    OrderRelease,
    PlaySound,
    RandomizeTimer,
    RandomizeVar,
    ReceiveStatus,
    Release,
    RemoveStatus,
    SendMessageToLinks,
    SendMessageToNearby,
    SetAnimation,
    SetFarReach,
    SetGravity,
    SetHealth,
    SetHiding,
    SetHoldable,
    SetLimbAnimation,
    SetNearReach,
    SetState,
    SetTangible,
    SetTeam,
    SetTimer,
    SetVar,
    ShowMessageFromVar,
    Spawn,
    StabilizeZ,
    StartChomping,
    StartDying,
    StartHeightEffect,
    StartParticles,
    Stop,
    StopChomping,
    StopHeightEffect,
    StopParticles,
    StopVertically,
    Swallow,
    SwallowAll,
    TeleportToAbsolute,
    TeleportToRelative,
    TurnToAbsolute,
    TurnToRelative,
    TurnToTarget,
}

pub struct ActionDef {
    pub action_type: ActionType,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub params: Vec<ActionParam>,
    pub run: ActionRunner,
    pub loader: Option<ActionLoader>,
}

impl fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDef")
            .field("action_type", &self.action_type)
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Registry of every action a script may call, looked up by name.
#[derive(Debug, Default)]
pub struct ActionLibrary {
    defs: Vec<ActionDef>,
    by_name: HashMap<&'static str, usize>,
}

impl ActionLibrary {
    pub fn register(&mut self, def: ActionDef) {
        let index = self.defs.len();
        self.by_name.insert(def.name, index);
        for alias in def.aliases {
            self.by_name.insert(alias, index);
        }
        self.defs.push(def);
    }

    fn add(
        &mut self,
        action_type: ActionType,
        name: &'static str,
        params: Vec<ActionParam>,
        run: ActionRunner,
        loader: Option<ActionLoader>,
    ) {
        self.register(ActionDef {
            action_type,
            name,
            aliases: &[],
            params,
            run,
            loader,
        });
    }

    pub fn find(&self, name: &str) -> Option<&ActionDef> {
        self.by_name.get(name).and_then(|index| self.defs.get(*index))
    }

    pub fn get(&self, action_type: ActionType) -> Option<&ActionDef> {
        self.defs.iter().find(|def| def.action_type == action_type)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn standard() -> Self {
        use ParamBinding::{Const, Free};
        use ParamKind::{Bool, Float, Int, Str};

        let mut library = Self::default();
        library.add(
            ActionType::AddHealth,
            "add_health",
            vec![free("amount", Float)],
            runners::add_health,
            None,
        );
        library.add(
            ActionType::Calculate,
            "calculate",
            vec![
                fixed("destination_var", Str),
                free("lhs", Float),
                fixed("operation", Str),
                free("rhs", Float),
            ],
            runners::calculate,
            Some(loaders::calculate),
        );
        library.add(ActionType::Delete, "delete", vec![], runners::delete, None);
        library.add(ActionType::Else, "else", vec![], runners::no_op, None);
        library.add(ActionType::EndIf, "end_if", vec![], runners::no_op, None);
        library.add(
            ActionType::FinishDying,
            "finish_dying",
            vec![],
            runners::finish_dying,
            None,
        );
        library.add(
            ActionType::Focus,
            "focus",
            vec![fixed("target", Str)],
            runners::focus,
            Some(loaders::focus),
        );
        library.add(
            ActionType::If,
            "if",
            vec![
                fixed("comparand", Str),
                fixed("operation", Str),
                free("value", Str),
            ],
            runners::if_condition,
            Some(loaders::if_condition),
        );
        library.add(
            ActionType::MoveToAbsolute,
            "move_to_absolute",
            vec![free("x", Float), free("y", Float)],
            runners::move_to_absolute,
            None,
        );
        library.add(
            ActionType::MoveToRelative,
            "move_to_relative",
            vec![free("x", Float), free("y", Float)],
            runners::move_to_relative,
            None,
        );
        library.add(
            ActionType::MoveToTarget,
            "move_to_target",
            vec![fixed("target", Str)],
            runners::move_to_target,
            Some(loaders::move_to_target),
        );
        library.add(
            ActionType::OrderRelease,
            "order_release",
            vec![],
            runners::order_release,
            None,
        );
        library.add(
            ActionType::PlaySound,
            "play_sound",
            vec![fixed("sound", Str)],
            runners::play_sound,
            Some(loaders::play_sound),
        );
        library.add(
            ActionType::RandomizeTimer,
            "randomize_timer",
            vec![free("min", Float), free("max", Float)],
            runners::randomize_timer,
            None,
        );
        library.add(
            ActionType::RandomizeVar,
            "randomize_var",
            vec![fixed("var", Str), free("min", Int), free("max", Int)],
            runners::randomize_var,
            None,
        );
        library.add(
            ActionType::ReceiveStatus,
            "receive_status",
            vec![fixed("status", Str)],
            runners::receive_status,
            Some(loaders::status_name),
        );
        library.add(ActionType::Release, "release", vec![], runners::release, None);
        library.add(
            ActionType::RemoveStatus,
            "remove_status",
            vec![fixed("status", Str)],
            runners::remove_status,
            Some(loaders::status_name),
        );
        library.add(
            ActionType::SendMessageToLinks,
            "send_message_to_links",
            vec![free("message", Str)],
            runners::send_message_to_links,
            None,
        );
        library.add(
            ActionType::SendMessageToNearby,
            "send_message_to_nearby",
            vec![free("distance", Float), free("message", Str)],
            runners::send_message_to_nearby,
            None,
        );
        library.add(
            ActionType::SetAnimation,
            "set_animation",
            vec![fixed("animation", Str), extras("options", Str, Const)],
            runners::set_animation,
            Some(loaders::set_animation),
        );
        library.add(
            ActionType::SetFarReach,
            "set_far_reach",
            vec![fixed("reach", Str)],
            runners::set_far_reach,
            Some(loaders::reach_name),
        );
        library.add(
            ActionType::SetGravity,
            "set_gravity",
            vec![free("multiplier", Float)],
            runners::set_gravity,
            None,
        );
        library.add(
            ActionType::SetHealth,
            "set_health",
            vec![free("amount", Float)],
            runners::set_health,
            None,
        );
        library.add(
            ActionType::SetHiding,
            "set_hiding",
            vec![free("hiding", Bool)],
            runners::set_hiding,
            None,
        );
        library.add(
            ActionType::SetHoldable,
            "set_holdable",
            vec![extras("options", Str, Const)],
            runners::set_holdable,
            Some(loaders::set_holdable),
        );
        library.add(
            ActionType::SetLimbAnimation,
            "set_limb_animation",
            vec![fixed("animation", Str)],
            runners::set_limb_animation,
            None,
        );
        library.add(
            ActionType::SetNearReach,
            "set_near_reach",
            vec![fixed("reach", Str)],
            runners::set_near_reach,
            Some(loaders::reach_name),
        );
        library.register(ActionDef {
            action_type: ActionType::SetState,
            name: "set_state",
            aliases: &["change_state"],
            params: vec![fixed("state", Str)],
            run: runners::set_state,
            loader: None,
        });
        library.add(
            ActionType::SetTangible,
            "set_tangible",
            vec![free("tangible", Bool)],
            runners::set_tangible,
            None,
        );
        library.add(
            ActionType::SetTeam,
            "set_team",
            vec![fixed("team", Str)],
            runners::set_team,
            Some(loaders::set_team),
        );
        library.add(
            ActionType::SetTimer,
            "set_timer",
            vec![free("time", Float)],
            runners::set_timer,
            None,
        );
        library.add(
            ActionType::SetVar,
            "set_var",
            vec![fixed("var", Str), free("value", Str)],
            runners::set_var,
            None,
        );
        library.add(
            ActionType::ShowMessageFromVar,
            "show_message_from_var",
            vec![fixed("var", Str)],
            runners::show_message_from_var,
            None,
        );
        library.add(
            ActionType::Spawn,
            "spawn",
            vec![fixed("spawn", Str)],
            runners::spawn,
            Some(loaders::spawn),
        );
        library.add(
            ActionType::StabilizeZ,
            "stabilize_z",
            vec![fixed("reference", Str), free("offset", Float)],
            runners::stabilize_z,
            Some(loaders::stabilize_z),
        );
        library.add(
            ActionType::StartChomping,
            "start_chomping",
            vec![free("victims_max", Int), extras("body_parts", Str, Const)],
            runners::start_chomping,
            Some(loaders::start_chomping),
        );
        library.add(
            ActionType::StartDying,
            "start_dying",
            vec![],
            runners::start_dying,
            None,
        );
        library.add(
            ActionType::StartHeightEffect,
            "start_height_effect",
            vec![],
            runners::start_height_effect,
            None,
        );
        library.add(
            ActionType::StartParticles,
            "start_particles",
            vec![fixed("generator", Str), extras("offsets", Float, Free)],
            runners::start_particles,
            Some(loaders::start_particles),
        );
        library.add(ActionType::Stop, "stop", vec![], runners::stop, None);
        library.add(
            ActionType::StopChomping,
            "stop_chomping",
            vec![],
            runners::stop_chomping,
            None,
        );
        library.add(
            ActionType::StopHeightEffect,
            "stop_height_effect",
            vec![],
            runners::stop_height_effect,
            None,
        );
        library.add(
            ActionType::StopParticles,
            "stop_particles",
            vec![],
            runners::stop_particles,
            None,
        );
        library.add(
            ActionType::StopVertically,
            "stop_vertically",
            vec![],
            runners::stop_vertically,
            None,
        );
        library.add(
            ActionType::Swallow,
            "swallow",
            vec![free("amount", Int)],
            runners::swallow,
            None,
        );
        library.add(
            ActionType::SwallowAll,
            "swallow_all",
            vec![],
            runners::swallow_all,
            None,
        );
        library.add(
            ActionType::TeleportToAbsolute,
            "teleport_to_absolute",
            vec![free("x", Float), free("y", Float), free("z", Float)],
            runners::teleport_to_absolute,
            None,
        );
        library.add(
            ActionType::TeleportToRelative,
            "teleport_to_relative",
            vec![free("x", Float), free("y", Float), free("z", Float)],
            runners::teleport_to_relative,
            None,
        );
        library.add(
            ActionType::TurnToAbsolute,
            "turn_to_absolute",
            vec![free("angle", Float)],
            runners::turn_to_absolute,
            None,
        );
        library.add(
            ActionType::TurnToRelative,
            "turn_to_relative",
            vec![free("angle", Float)],
            runners::turn_to_relative,
            None,
        );
        library.add(
            ActionType::TurnToTarget,
            "turn_to_target",
            vec![fixed("target", Str)],
            runners::turn_to_target,
            Some(loaders::turn_to_target),
        );

        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_library_registers_every_action_once() {
        let library = ActionLibrary::standard();
        assert_eq!(library.len(), 52);
        let mut seen = BTreeSet::new();
        for def in &library.defs {
            assert!(seen.insert(def.name), "duplicate action {}", def.name);
            let extras_slots = def.params.iter().filter(|param| param.extras).count();
            assert!(extras_slots <= 1, "{} has several extras slots", def.name);
            if extras_slots == 1 {
                assert!(def.params.last().is_some_and(|param| param.extras));
            }
        }
    }

    #[test]
    fn change_state_is_an_alias_of_set_state() {
        let library = ActionLibrary::standard();
        let by_alias = library.find("change_state").expect("alias");
        assert_eq!(by_alias.action_type, ActionType::SetState);
        assert!(library.find("warp_drive").is_none());
    }

    #[test]
    fn var_text_falls_back_to_zero_values() {
        assert_eq!(
            ArgValue::from_var_text(ParamKind::Int, "abc"),
            ArgValue::Int(0)
        );
        assert_eq!(
            ArgValue::from_var_text(ParamKind::Float, ""),
            ArgValue::Float(0.0)
        );
        assert_eq!(
            ArgValue::from_var_text(ParamKind::Bool, "true"),
            ArgValue::Bool(true)
        );
    }

    #[test]
    fn resolved_args_read_out_of_range_as_defaults() {
        let args = ResolvedArgs::new(vec![ArgValue::Str("7".to_string())]);
        assert_eq!(args.int(0), 7);
        assert_eq!(args.float(3), 0.0);
        assert_eq!(args.text(1), "");
        assert!(args.tail(4).is_empty());
    }
}
