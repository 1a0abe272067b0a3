//! Load-time argument checks. Each loader validates the tokens an action was
//! bound with and rewrites keyword arguments into integer codes so the
//! runners never re-parse text.

use crate::mob::MobTeam;

use super::action::{ActionArg, ArgValue, ScriptLoadContext};

/// Keyword enum whose position in `ALL` is its argument code.
pub(crate) trait ArgCode: Sized + Copy + PartialEq + 'static {
    const ALL: &'static [Self];

    fn keyword(self) -> &'static str;

    fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|value| value.keyword() == token)
    }

    fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    fn code(self) -> i32 {
        Self::ALL
            .iter()
            .position(|value| *value == self)
            .map_or(-1, |index| index as i32)
    }

    fn keyword_list() -> String {
        Self::ALL
            .iter()
            .map(|value| value.keyword())
            .filter(|keyword| !keyword.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IfOperator {
    Equal,
    NotEqual,
    Less,
    More,
    LessOrEqual,
    MoreOrEqual,
}

impl ArgCode for IfOperator {
    const ALL: &'static [Self] = &[
        IfOperator::Equal,
        IfOperator::NotEqual,
        IfOperator::Less,
        IfOperator::More,
        IfOperator::LessOrEqual,
        IfOperator::MoreOrEqual,
    ];

    fn keyword(self) -> &'static str {
        match self {
            IfOperator::Equal => "=",
            IfOperator::NotEqual => "!=",
            IfOperator::Less => "<",
            IfOperator::More => ">",
            IfOperator::LessOrEqual => "<=",
            IfOperator::MoreOrEqual => ">=",
        }
    }
}

/// Left-hand side of an `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IfComparand {
    Var,
    BodyPart,
    ChompedPikmin,
    DayMinutes,
    FieldPikmin,
    FrameSignal,
    Health,
    LatchedPikmin,
    LatchedPikminWeight,
    Message,
    MessageSender,
    MobCategory,
    MobType,
    OtherBodyPart,
}

impl ArgCode for IfComparand {
    const ALL: &'static [Self] = &[
        IfComparand::Var,
        IfComparand::BodyPart,
        IfComparand::ChompedPikmin,
        IfComparand::DayMinutes,
        IfComparand::FieldPikmin,
        IfComparand::FrameSignal,
        IfComparand::Health,
        IfComparand::LatchedPikmin,
        IfComparand::LatchedPikminWeight,
        IfComparand::Message,
        IfComparand::MessageSender,
        IfComparand::MobCategory,
        IfComparand::MobType,
        IfComparand::OtherBodyPart,
    ];

    fn keyword(self) -> &'static str {
        match self {
            IfComparand::Var => "",
            IfComparand::BodyPart => "body_part",
            IfComparand::ChompedPikmin => "chomped_pikmin",
            IfComparand::DayMinutes => "day_minutes",
            IfComparand::FieldPikmin => "field_pikmin",
            IfComparand::FrameSignal => "frame_signal",
            IfComparand::Health => "health",
            IfComparand::LatchedPikmin => "latched_pikmin",
            IfComparand::LatchedPikminWeight => "latched_pikmin_weight",
            IfComparand::Message => "message",
            IfComparand::MessageSender => "message_sender",
            IfComparand::MobCategory => "mob_category",
            IfComparand::MobType => "mob_type",
            IfComparand::OtherBodyPart => "other_body_part",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CalculateOp {
    Sum,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl ArgCode for CalculateOp {
    const ALL: &'static [Self] = &[
        CalculateOp::Sum,
        CalculateOp::Subtract,
        CalculateOp::Multiply,
        CalculateOp::Divide,
        CalculateOp::Modulo,
    ];

    fn keyword(self) -> &'static str {
        match self {
            CalculateOp::Sum => "+",
            CalculateOp::Subtract => "-",
            CalculateOp::Multiply => "*",
            CalculateOp::Divide => "/",
            CalculateOp::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveTarget {
    AwayFromFocusedMob,
    FocusedMob,
    FocusedMobPosition,
    Home,
    LinkedMobAverage,
    Randomly,
}

impl ArgCode for MoveTarget {
    const ALL: &'static [Self] = &[
        MoveTarget::AwayFromFocusedMob,
        MoveTarget::FocusedMob,
        MoveTarget::FocusedMobPosition,
        MoveTarget::Home,
        MoveTarget::LinkedMobAverage,
        MoveTarget::Randomly,
    ];

    fn keyword(self) -> &'static str {
        match self {
            MoveTarget::AwayFromFocusedMob => "away_from_focused_mob",
            MoveTarget::FocusedMob => "focused_mob",
            MoveTarget::FocusedMobPosition => "focused_mob_position",
            MoveTarget::Home => "home",
            MoveTarget::LinkedMobAverage => "linked_mob_average",
            MoveTarget::Randomly => "randomly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnTarget {
    FocusedMob,
    Home,
    Randomly,
}

impl ArgCode for TurnTarget {
    const ALL: &'static [Self] = &[TurnTarget::FocusedMob, TurnTarget::Home, TurnTarget::Randomly];

    fn keyword(self) -> &'static str {
        match self {
            TurnTarget::FocusedMob => "focused_mob",
            TurnTarget::Home => "home",
            TurnTarget::Randomly => "randomly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FocusTarget {
    Link,
    Parent,
    Trigger,
}

impl ArgCode for FocusTarget {
    const ALL: &'static [Self] = &[FocusTarget::Link, FocusTarget::Parent, FocusTarget::Trigger];

    fn keyword(self) -> &'static str {
        match self {
            FocusTarget::Link => "link",
            FocusTarget::Parent => "parent",
            FocusTarget::Trigger => "trigger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StabilizeReference {
    Highest,
    Lowest,
}

impl ArgCode for StabilizeReference {
    const ALL: &'static [Self] = &[StabilizeReference::Highest, StabilizeReference::Lowest];

    fn keyword(self) -> &'static str {
        match self {
            StabilizeReference::Highest => "highest",
            StabilizeReference::Lowest => "lowest",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnimationOption {
    NoRestart,
    RandomTime,
}

impl ArgCode for AnimationOption {
    const ALL: &'static [Self] = &[AnimationOption::NoRestart, AnimationOption::RandomTime];

    fn keyword(self) -> &'static str {
        match self {
            AnimationOption::NoRestart => "no_restart",
            AnimationOption::RandomTime => "random_time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HoldableOption {
    Pikmin,
    Enemies,
}

impl ArgCode for HoldableOption {
    const ALL: &'static [Self] = &[HoldableOption::Pikmin, HoldableOption::Enemies];

    fn keyword(self) -> &'static str {
        match self {
            HoldableOption::Pikmin => "pikmin",
            HoldableOption::Enemies => "enemies",
        }
    }
}

fn const_text(args: &[ActionArg], index: usize) -> Option<&str> {
    match args.get(index) {
        Some(ActionArg::Const(ArgValue::Str(text))) => Some(text.as_str()),
        _ => None,
    }
}

fn replace_keyword<T: ArgCode>(
    args: &mut [ActionArg],
    index: usize,
    what: &str,
) -> Result<(), String> {
    let token = const_text(args, index).unwrap_or_default();
    let parsed = T::parse(token).ok_or_else(|| {
        format!(
            "unknown {what} '{token}'; expected one of: {}",
            T::keyword_list()
        )
    })?;
    args[index] = ActionArg::Const(ArgValue::Int(parsed.code()));
    Ok(())
}

fn replace_with_index(
    args: &mut [ActionArg],
    index: usize,
    names: &[String],
    what: &str,
) -> Result<(), String> {
    let token = const_text(args, index).unwrap_or_default();
    let position = names
        .iter()
        .position(|name| name == token)
        .ok_or_else(|| format!("unknown {what} '{token}'"))?;
    args[index] = ActionArg::Const(ArgValue::Int(position as i32));
    Ok(())
}

/// Rewrites `if <comparand> <op> <value>` into `[comparand, var name, op, value]`.
pub(crate) fn if_condition(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    let token = const_text(args, 0).unwrap_or_default().to_string();
    let (comparand, var_name) = match token.strip_prefix('$') {
        Some(name) if !name.is_empty() => (IfComparand::Var, name.to_string()),
        Some(_) => return Err("empty variable name in if comparand".to_string()),
        None => match IfComparand::parse(&token) {
            Some(keyword) => (keyword, String::new()),
            None => (IfComparand::Var, token),
        },
    };
    args[0] = ActionArg::Const(ArgValue::Int(comparand.code()));
    args.insert(1, ActionArg::Const(ArgValue::Str(var_name)));
    replace_keyword::<IfOperator>(args, 2, "comparison operator")
}

pub(crate) fn calculate(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_keyword::<CalculateOp>(args, 2, "operation")
}

pub(crate) fn focus(args: &mut Vec<ActionArg>, _ctx: &ScriptLoadContext<'_>) -> Result<(), String> {
    replace_keyword::<FocusTarget>(args, 0, "focus target")
}

pub(crate) fn move_to_target(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_keyword::<MoveTarget>(args, 0, "movement target")
}

pub(crate) fn turn_to_target(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_keyword::<TurnTarget>(args, 0, "turn target")
}

pub(crate) fn stabilize_z(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_keyword::<StabilizeReference>(args, 0, "reference")
}

pub(crate) fn set_team(args: &mut Vec<ActionArg>, _ctx: &ScriptLoadContext<'_>) -> Result<(), String> {
    let token = const_text(args, 0).unwrap_or_default();
    let team = MobTeam::parse(token).ok_or_else(|| format!("unknown team '{token}'"))?;
    args[0] = ActionArg::Const(ArgValue::Int(team.code()));
    Ok(())
}

pub(crate) fn set_animation(
    args: &mut Vec<ActionArg>,
    ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_with_index(args, 0, ctx.animations, "animation")?;
    for index in 1..args.len() {
        replace_keyword::<AnimationOption>(args, index, "animation option")?;
    }
    Ok(())
}

pub(crate) fn set_holdable(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    for index in 0..args.len() {
        replace_keyword::<HoldableOption>(args, index, "holdable option")?;
    }
    Ok(())
}

pub(crate) fn reach_name(
    args: &mut Vec<ActionArg>,
    ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_with_index(args, 0, ctx.reaches, "reach")
}

pub(crate) fn play_sound(
    args: &mut Vec<ActionArg>,
    ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    replace_with_index(args, 0, ctx.sounds, "sound")
}

pub(crate) fn spawn(args: &mut Vec<ActionArg>, ctx: &ScriptLoadContext<'_>) -> Result<(), String> {
    replace_with_index(args, 0, ctx.spawns, "spawn")
}

pub(crate) fn status_name(
    args: &mut Vec<ActionArg>,
    ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    let token = const_text(args, 0).unwrap_or_default();
    if ctx.status_types.contains(token) {
        Ok(())
    } else {
        Err(format!("unknown status type '{token}'"))
    }
}

pub(crate) fn start_chomping(
    args: &mut Vec<ActionArg>,
    ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    for index in 1..args.len() {
        let part = const_text(args, index).unwrap_or_default();
        if !ctx.body_parts.iter().any(|known| known == part) {
            return Err(format!("unknown body part '{part}'"));
        }
    }
    Ok(())
}

pub(crate) fn start_particles(
    args: &mut Vec<ActionArg>,
    _ctx: &ScriptLoadContext<'_>,
) -> Result<(), String> {
    if args.len() > 4 {
        return Err(format!(
            "start_particles takes at most 3 offsets, got {}",
            args.len() - 1
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn text(value: &str) -> ActionArg {
        ActionArg::Const(ArgValue::Str(value.to_string()))
    }

    fn with_ctx<R>(f: impl FnOnce(&ScriptLoadContext<'_>) -> R) -> R {
        let animations = vec!["idling".to_string(), "walking".to_string()];
        let statuses = BTreeSet::from(["burning".to_string()]);
        let ctx = ScriptLoadContext {
            animations: &animations,
            reaches: &[],
            sounds: &[],
            spawns: &[],
            body_parts: &[],
            status_types: &statuses,
        };
        f(&ctx)
    }

    #[test]
    fn codes_follow_declaration_order() {
        assert_eq!(IfOperator::Less.code(), 2);
        assert_eq!(IfOperator::from_code(2), Some(IfOperator::Less));
        assert_eq!(IfOperator::from_code(99), None);
        assert_eq!(IfOperator::from_code(-1), None);
    }

    #[test]
    fn if_keyword_comparand_gets_empty_var_slot() {
        let mut args = vec![text("health"), text("<"), text("50")];
        with_ctx(|ctx| if_condition(&mut args, ctx)).expect("load");
        assert_eq!(
            args[0],
            ActionArg::Const(ArgValue::Int(IfComparand::Health.code()))
        );
        assert_eq!(args[1], text(""));
        assert_eq!(
            args[2],
            ActionArg::Const(ArgValue::Int(IfOperator::Less.code()))
        );
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn if_unknown_comparand_is_a_variable() {
        let mut args = vec![text("$health"), text("="), text("1")];
        with_ctx(|ctx| if_condition(&mut args, ctx)).expect("load");
        assert_eq!(args[0], ActionArg::Const(ArgValue::Int(0)));
        assert_eq!(args[1], text("health"));

        let mut args = vec![text("anger"), text(">="), text("1")];
        with_ctx(|ctx| if_condition(&mut args, ctx)).expect("load");
        assert_eq!(args[1], text("anger"));
    }

    #[test]
    fn if_rejects_unknown_operator() {
        let mut args = vec![text("health"), text("=="), text("1")];
        let err = with_ctx(|ctx| if_condition(&mut args, ctx)).expect_err("operator");
        assert!(err.contains("comparison operator"));
    }

    #[test]
    fn animation_names_become_indices() {
        let mut args = vec![text("walking"), text("no_restart")];
        with_ctx(|ctx| set_animation(&mut args, ctx)).expect("load");
        assert_eq!(args[0], ActionArg::Const(ArgValue::Int(1)));
        assert_eq!(
            args[1],
            ActionArg::Const(ArgValue::Int(AnimationOption::NoRestart.code()))
        );

        let mut args = vec![text("flying")];
        assert!(with_ctx(|ctx| set_animation(&mut args, ctx)).is_err());
    }

    #[test]
    fn status_names_must_be_known() {
        let mut known = vec![text("burning")];
        assert!(with_ctx(|ctx| status_name(&mut known, ctx)).is_ok());
        let mut unknown = vec![text("soggy")];
        assert!(with_ctx(|ctx| status_name(&mut unknown, ctx)).is_err());
    }
}
