//! Seeds an Onion holds and the timers that spew them out as new Pikmin.

use std::collections::BTreeMap;
use std::f32::consts::TAU;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::sim::{ScriptContext, SpawnRequest};

use super::category::CategoryState;
use super::mob::Mob;

/// Wait after the last deposit before the first seed comes out.
pub const ONION_FULL_SPEW_DELAY: f32 = 2.5;
/// Wait between two consecutive seeds.
pub const ONION_NEXT_SPEW_DELAY: f32 = 0.1;
/// Radians the launch direction turns after each seed.
pub const ONION_SPEW_ANGLE_SHIFT: f32 = 2.4;
/// Horizontal speed a spewed seed leaves with.
pub const ONION_SPEW_SPEED: f32 = 80.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnionState {
    /// Seeds waiting to be spewed, per Pikmin type reference.
    pub seeds: BTreeMap<String, u32>,
    pub full_spew_timer: f32,
    pub next_spew_timer: f32,
    pub next_spew_angle: f32,
}

impl OnionState {
    pub fn queue_seeds(&mut self, pikmin_type: String, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.seeds.entry(pikmin_type).or_insert(0) += amount;
        self.full_spew_timer = ONION_FULL_SPEW_DELAY;
        self.next_spew_timer = 0.0;
    }

    pub fn queued(&self) -> u32 {
        self.seeds.values().sum()
    }

    /// Advances the timers and returns the types whose seeds are due, with the
    /// launch angle of each.
    pub fn tick(&mut self, dt: f32) -> Vec<(String, f32)> {
        let mut due = Vec::new();
        if self.queued() == 0 {
            return due;
        }
        if self.full_spew_timer > 0.0 {
            self.full_spew_timer -= dt;
            if self.full_spew_timer > 0.0 {
                return due;
            }
            self.full_spew_timer = 0.0;
            self.next_spew_timer = 0.0;
        } else {
            self.next_spew_timer -= dt;
        }
        while self.next_spew_timer <= 0.0 {
            let Some(pikmin_type) = self.take_next() else {
                break;
            };
            due.push((pikmin_type, self.next_spew_angle));
            self.next_spew_angle = (self.next_spew_angle + ONION_SPEW_ANGLE_SHIFT).rem_euclid(TAU);
            self.next_spew_timer += ONION_NEXT_SPEW_DELAY;
        }
        due
    }

    fn take_next(&mut self) -> Option<String> {
        let (pikmin_type, count) = self.seeds.iter_mut().find(|(_, count)| **count > 0)?;
        *count -= 1;
        let pikmin_type = pikmin_type.clone();
        if self.seeds.get(&pikmin_type) == Some(&0) {
            self.seeds.remove(&pikmin_type);
        }
        Some(pikmin_type)
    }
}

/// Queues a new Pikmin for every seed the Onion spews this tick.
pub(crate) fn spew_seeds(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    let CategoryState::Onion(onion) = &mut mob.category_state else {
        return;
    };
    for (pikmin_type, angle) in onion.tick(dt) {
        let Some(mob_type) = ctx.content.mob_types().find(&pikmin_type) else {
            warn!(mob_id = mob.id.0, pikmin_type = %pikmin_type, "onion_seed_type_missing");
            continue;
        };
        let mut request = SpawnRequest::new(Arc::clone(mob_type), mob.pos, angle);
        request.z = mob.z + mob.height;
        request.momentum = ONION_SPEW_SPEED;
        request.launch_angle = Some(angle);
        ctx.services.spawn_requests.push(request);
        ctx.services.stats.pikmin_born += 1;
        debug!(mob_id = mob.id.0, pikmin_type = %pikmin_type, angle, "onion_seed_spewed");
    }
}
