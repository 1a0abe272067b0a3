//! Evaluation of `if` statements.

use crate::mob::{Mob, MobCategory};

use super::action::ActionRunData;
use super::loaders::{ArgCode, IfComparand, IfOperator};

/// Arguments, as rewritten by the loader: `[comparand, var name, operator, value]`.
pub(crate) fn evaluate(data: &ActionRunData<'_, '_>) -> bool {
    let Some(comparand) = IfComparand::from_code(data.args.int(0)) else {
        return false;
    };
    let Some(operator) = IfOperator::from_code(data.args.int(2)) else {
        return false;
    };
    let lhs = comparand_value(data, comparand, &data.args.text(1));
    compare(&lhs, operator, &data.args.text(3))
}

fn comparand_value(data: &ActionRunData<'_, '_>, comparand: IfComparand, var_name: &str) -> String {
    let mob = &*data.mob;
    let payload = data.payload;
    match comparand {
        IfComparand::Var => mob.vars.get_str(var_name).to_string(),
        IfComparand::BodyPart => payload.body_part.clone().unwrap_or_default(),
        IfComparand::OtherBodyPart => payload.other_body_part.clone().unwrap_or_default(),
        IfComparand::ChompedPikmin => mob
            .chomping
            .iter()
            .filter(|id| {
                data.ctx
                    .mobs
                    .get(**id)
                    .is_some_and(|victim| victim.mob_type.category == MobCategory::Pikmin)
            })
            .count()
            .to_string(),
        IfComparand::DayMinutes => (data.ctx.services.day_minutes.floor() as i64).to_string(),
        IfComparand::FieldPikmin => {
            let others = data
                .ctx
                .mobs
                .iter()
                .filter(|other| {
                    !other.to_delete && other.mob_type.category == MobCategory::Pikmin
                })
                .count();
            let own = usize::from(mob.mob_type.category == MobCategory::Pikmin);
            (others + own).to_string()
        }
        IfComparand::FrameSignal => payload
            .signal
            .map(|signal| signal.to_string())
            .unwrap_or_default(),
        IfComparand::Health => format_number(mob.health),
        IfComparand::LatchedPikmin => latched_pikmin(data, mob).count().to_string(),
        IfComparand::LatchedPikminWeight => {
            let weight: f32 = latched_pikmin(data, mob)
                .map(|pikmin| pikmin.mob_type.weight)
                .sum();
            format_number(weight)
        }
        IfComparand::Message => payload.message.clone().unwrap_or_default(),
        IfComparand::MessageSender => payload
            .other
            .map(|id| id.to_string())
            .unwrap_or_default(),
        IfComparand::MobCategory => payload
            .other
            .and_then(|id| data.ctx.mobs.get(id))
            .map(|other| other.mob_type.category.script_name().to_string())
            .unwrap_or_default(),
        IfComparand::MobType => payload
            .other
            .and_then(|id| data.ctx.mobs.get(id))
            .map(|other| type_folder(&other.mob_type.internal_name).to_string())
            .unwrap_or_default(),
    }
}

fn latched_pikmin<'a>(
    data: &'a ActionRunData<'_, '_>,
    mob: &'a Mob,
) -> impl Iterator<Item = &'a Mob> + 'a {
    data.ctx.mobs.iter().filter(move |other| {
        !other.to_delete
            && other.holder == Some(mob.id)
            && other.mob_type.category == MobCategory::Pikmin
    })
}

fn type_folder(internal_name: &str) -> &str {
    internal_name.rsplit('/').next().unwrap_or(internal_name)
}

/// Integral values print without a fraction so they compare equal to `"50"`.
pub(crate) fn format_number(value: f32) -> String {
    if value.fract() == 0.0 && value.abs() < 1.0e9 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Numeric when both sides parse, text otherwise. Ordering on text is false.
pub(crate) fn compare(lhs: &str, operator: IfOperator, rhs: &str) -> bool {
    let numbers = lhs
        .trim()
        .parse::<f64>()
        .ok()
        .zip(rhs.trim().parse::<f64>().ok());
    match (numbers, operator) {
        (Some((l, r)), IfOperator::Equal) => l == r,
        (Some((l, r)), IfOperator::NotEqual) => l != r,
        (Some((l, r)), IfOperator::Less) => l < r,
        (Some((l, r)), IfOperator::More) => l > r,
        (Some((l, r)), IfOperator::LessOrEqual) => l <= r,
        (Some((l, r)), IfOperator::MoreOrEqual) => l >= r,
        (None, IfOperator::Equal) => lhs == rhs,
        (None, IfOperator::NotEqual) => lhs != rhs,
        (None, _) => false,
    }
}
