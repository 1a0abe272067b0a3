//! Drops hand out a dose to each suitable mob that touches them until they
//! run dry.

use std::sync::Arc;

use tracing::debug;

use crate::sim::ScriptContext;

use super::category::{CategoryProperties, CategoryState};
use super::mob::{Mob, MobId};

pub(crate) fn feed_touchers(mob: &mut Mob, ctx: &mut ScriptContext<'_>, touchers: &[MobId]) {
    let mob_type = Arc::clone(&mob.mob_type);
    let CategoryProperties::Drop {
        consumer,
        health_change,
        status_to_give,
        ..
    } = &mob_type.properties
    else {
        return;
    };
    let status_type = status_to_give
        .as_deref()
        .and_then(|name| ctx.content.status_type(name))
        .cloned();
    let CategoryState::Drop { doses_left } = &mut mob.category_state else {
        return;
    };

    for toucher_id in touchers {
        if *doses_left == 0 {
            break;
        }
        let Some(toucher) = ctx.mobs.get_mut(*toucher_id) else {
            continue;
        };
        if !toucher.is_alive() || !consumer.accepts(toucher.mob_type.category) {
            continue;
        }
        toucher.add_health(*health_change);
        if let Some(status_type) = &status_type {
            toucher.apply_status(Arc::clone(status_type), false);
        }
        *doses_left -= 1;
        debug!(
            mob_id = mob.id.0,
            consumer_id = toucher_id.0,
            doses_left = *doses_left,
            "drop_consumed"
        );
    }
    if *doses_left == 0 {
        mob.to_delete = true;
    }
}
