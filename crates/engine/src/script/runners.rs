//! Run functions for every library action. Each reads its already-resolved
//! arguments and touches only its own mob and the script context.

use std::f32::consts::TAU;

use tracing::{debug, warn};

use crate::geometry::Vec2;
use crate::mob::{CategoryProperties, MobTeam, ParticleGenerator};
use crate::sim::{HudMessage, SoundCue, SpawnRequest};

use super::action::ActionRunData;
use super::condition::{self, format_number};
use super::events::{EventPayload, MobEventType};
use super::loaders::{
    AnimationOption, ArgCode, CalculateOp, FocusTarget, HoldableOption, MoveTarget,
    StabilizeReference, TurnTarget,
};
use super::vars::ScriptVars;

/// Distance `away_from_focused_mob` and `randomly` pick targets at.
const WANDER_DISTANCE: f32 = 100.0;

pub(crate) fn no_op(_data: &mut ActionRunData<'_, '_>) {}

pub(crate) fn add_health(data: &mut ActionRunData<'_, '_>) {
    let amount = data.args.float(0);
    data.mob.add_health(amount);
}

pub(crate) fn calculate(data: &mut ActionRunData<'_, '_>) {
    let lhs = data.args.float(1);
    let rhs = data.args.float(3);
    let result = match CalculateOp::from_code(data.args.int(2)) {
        Some(CalculateOp::Sum) => lhs + rhs,
        Some(CalculateOp::Subtract) => lhs - rhs,
        Some(CalculateOp::Multiply) => lhs * rhs,
        Some(CalculateOp::Divide) if rhs == 0.0 => 0.0,
        Some(CalculateOp::Divide) => lhs / rhs,
        Some(CalculateOp::Modulo) if rhs == 0.0 => 0.0,
        Some(CalculateOp::Modulo) => lhs % rhs,
        None => return,
    };
    let destination = data.args.text(0);
    data.mob.vars.set(&destination, format_number(result));
}

pub(crate) fn delete(data: &mut ActionRunData<'_, '_>) {
    data.mob.to_delete = true;
}

pub(crate) fn finish_dying(data: &mut ActionRunData<'_, '_>) {
    release_chomped(data);
    data.mob.stop_chasing();
    if let CategoryProperties::Enemy {
        drops_corpse: false,
        ..
    } = data.mob.mob_type.properties
    {
        data.mob.to_delete = true;
    }
}

pub(crate) fn focus(data: &mut ActionRunData<'_, '_>) {
    let target = match FocusTarget::from_code(data.args.int(0)) {
        Some(FocusTarget::Link) => data.mob.links.first().copied(),
        Some(FocusTarget::Parent) => data.mob.parent,
        Some(FocusTarget::Trigger) => data.payload.other,
        None => None,
    };
    if let Some(target) = target.filter(|id| data.ctx.mob_exists(*id)) {
        data.mob.focused_mob = Some(target);
    }
}

pub(crate) fn if_condition(data: &mut ActionRunData<'_, '_>) {
    data.return_value = condition::evaluate(data);
}

pub(crate) fn move_to_absolute(data: &mut ActionRunData<'_, '_>) {
    let target = Vec2::new(data.args.float(0), data.args.float(1));
    let speed = data.mob.move_speed();
    data.mob.chase_position(target, speed);
}

pub(crate) fn move_to_relative(data: &mut ActionRunData<'_, '_>) {
    let offset = Vec2::new(data.args.float(0), data.args.float(1)).rotated(data.mob.angle);
    let target = data.mob.pos + offset;
    let speed = data.mob.move_speed();
    data.mob.chase_position(target, speed);
}

pub(crate) fn move_to_target(data: &mut ActionRunData<'_, '_>) {
    let speed = data.mob.move_speed();
    let focus_pos = focused_mob_pos(data);
    match MoveTarget::from_code(data.args.int(0)) {
        Some(MoveTarget::AwayFromFocusedMob) => {
            if let Some(focus_pos) = focus_pos {
                let away = (data.mob.pos - focus_pos).normalized_or_zero() * WANDER_DISTANCE;
                let target = data.mob.pos + away;
                data.mob.chase_position(target, speed);
            }
        }
        Some(MoveTarget::FocusedMob) => {
            if let Some(focus) = data.mob.focused_mob.filter(|_| focus_pos.is_some()) {
                data.mob.chase_mob(focus, Vec2::ZERO, speed);
            }
        }
        Some(MoveTarget::FocusedMobPosition) => {
            if let Some(focus_pos) = focus_pos {
                data.mob.chase_position(focus_pos, speed);
            }
        }
        Some(MoveTarget::Home) => {
            let home = data.mob.home;
            data.mob.chase_position(home, speed);
        }
        Some(MoveTarget::LinkedMobAverage) => {
            let positions = data
                .mob
                .links
                .iter()
                .filter_map(|id| data.ctx.mobs.get(*id).map(|link| link.pos))
                .collect::<Vec<_>>();
            if !positions.is_empty() {
                let sum = positions.iter().fold(Vec2::ZERO, |acc, pos| acc + *pos);
                let average = sum * (1.0 / positions.len() as f32);
                data.mob.chase_position(average, speed);
            }
        }
        Some(MoveTarget::Randomly) => {
            let angle = data.ctx.services.rng.range_f32(0.0, TAU);
            let distance = data.ctx.services.rng.range_f32(0.0, WANDER_DISTANCE);
            let target = data.mob.pos + Vec2::from_angle(angle, distance);
            data.mob.chase_position(target, speed);
        }
        None => {}
    }
}

pub(crate) fn order_release(data: &mut ActionRunData<'_, '_>) {
    let Some(holder_id) = data.mob.holder.take() else {
        return;
    };
    let id = data.mob.id;
    if let Some(holder) = data.ctx.mobs.get_mut(holder_id) {
        holder.holding.retain(|held| *held != id);
        holder.chomping.retain(|held| *held != id);
    }
    data.mob.queue_event_with(MobEventType::Released, EventPayload::from_mob(holder_id));
}

pub(crate) fn play_sound(data: &mut ActionRunData<'_, '_>) {
    let Ok(index) = usize::try_from(data.args.int(0)) else {
        return;
    };
    let Some(sound) = data.mob.mob_type.sounds.get(index) else {
        return;
    };
    data.ctx.services.sound_cues.push(SoundCue {
        mob: data.mob.id,
        sound_index: index,
        sample: sound.sample.clone(),
    });
}

pub(crate) fn randomize_timer(data: &mut ActionRunData<'_, '_>) {
    let time = data
        .ctx
        .services
        .rng
        .range_f32(data.args.float(0), data.args.float(1));
    data.mob.script_timer.start(time);
}

pub(crate) fn randomize_var(data: &mut ActionRunData<'_, '_>) {
    let value = data
        .ctx
        .services
        .rng
        .range_i32(data.args.int(1), data.args.int(2));
    let name = data.args.text(0);
    data.mob.vars.set(&name, value.to_string());
}

pub(crate) fn receive_status(data: &mut ActionRunData<'_, '_>) {
    let name = data.args.text(0);
    match data.ctx.content.status_type(&name) {
        Some(status_type) => data.mob.apply_status(status_type.clone(), false),
        None => warn!(mob_id = data.mob.id.0, status = %name, "script_unknown_status"),
    }
}

pub(crate) fn release(data: &mut ActionRunData<'_, '_>) {
    let id = data.mob.id;
    for held_id in std::mem::take(&mut data.mob.holding) {
        if let Some(held) = data.ctx.mobs.get_mut(held_id) {
            held.holder = None;
        }
        data.ctx
            .send_event(held_id, MobEventType::Released, EventPayload::from_mob(id));
    }
    release_chomped(data);
}

pub(crate) fn remove_status(data: &mut ActionRunData<'_, '_>) {
    let name = data.args.text(0);
    data.mob.remove_status(&name);
}

pub(crate) fn send_message_to_links(data: &mut ActionRunData<'_, '_>) {
    let message = data.args.text(0);
    let sender = data.mob.id;
    for link in data.mob.links.clone() {
        if link == sender {
            continue;
        }
        data.ctx.send_event(
            link,
            MobEventType::ReceiveMessage,
            EventPayload::message(sender, &message),
        );
    }
}

pub(crate) fn send_message_to_nearby(data: &mut ActionRunData<'_, '_>) {
    let distance = data.args.float(0);
    let message = data.args.text(1);
    let sender = data.mob.id;
    let origin = data.mob.pos;
    let nearby = data
        .ctx
        .mobs
        .iter()
        .filter(|other| !other.to_delete && other.pos.distance(origin) <= distance)
        .map(|other| other.id)
        .collect::<Vec<_>>();
    for target in nearby {
        data.ctx.send_event(
            target,
            MobEventType::ReceiveMessage,
            EventPayload::message(sender, &message),
        );
    }
}

pub(crate) fn set_animation(data: &mut ActionRunData<'_, '_>) {
    let Ok(index) = usize::try_from(data.args.int(0)) else {
        return;
    };
    let Some(duration) = data
        .mob
        .mob_type
        .animations
        .get(index)
        .map(|anim| anim.duration)
    else {
        return;
    };
    let options = data
        .args
        .tail(1)
        .iter()
        .filter_map(|value| AnimationOption::from_code(value.as_i32()))
        .collect::<Vec<_>>();
    let restart = !options.contains(&AnimationOption::NoRestart);
    let start_time = if options.contains(&AnimationOption::RandomTime) {
        data.ctx.services.rng.range_f32(0.0, duration)
    } else {
        0.0
    };
    data.mob.set_animation(index, restart, start_time);
}

pub(crate) fn set_far_reach(data: &mut ActionRunData<'_, '_>) {
    data.mob.far_reach = reach_index(data);
}

pub(crate) fn set_near_reach(data: &mut ActionRunData<'_, '_>) {
    data.mob.near_reach = reach_index(data);
}

fn reach_index(data: &ActionRunData<'_, '_>) -> Option<usize> {
    usize::try_from(data.args.int(0))
        .ok()
        .filter(|index| *index < data.mob.mob_type.reaches.len())
}

pub(crate) fn set_gravity(data: &mut ActionRunData<'_, '_>) {
    data.mob.gravity_mult = data.args.float(0);
}

pub(crate) fn set_health(data: &mut ActionRunData<'_, '_>) {
    let amount = data.args.float(0);
    data.mob.set_health(amount);
}

pub(crate) fn set_hiding(data: &mut ActionRunData<'_, '_>) {
    data.mob.hiding = data.args.boolean(0);
}

pub(crate) fn set_holdable(data: &mut ActionRunData<'_, '_>) {
    let options = data
        .args
        .tail(0)
        .iter()
        .filter_map(|value| HoldableOption::from_code(value.as_i32()))
        .collect::<Vec<_>>();
    data.mob.holdable_by_pikmin = options.contains(&HoldableOption::Pikmin);
    data.mob.holdable_by_enemies = options.contains(&HoldableOption::Enemies);
}

pub(crate) fn set_limb_animation(data: &mut ActionRunData<'_, '_>) {
    data.mob.limb_animation = Some(data.args.text(0));
}

pub(crate) fn set_state(data: &mut ActionRunData<'_, '_>) {
    let state_count = data.mob.mob_type.fsm.states.len();
    match data.args.get(0).map(|value| value.as_i32()) {
        Some(index) if index >= 0 && (index as usize) < state_count => {
            data.mob.fsm.request_state(index as usize);
        }
        _ => warn!(
            mob_id = data.mob.id.0,
            mob_type = %data.mob.mob_type.internal_name,
            target = %data.args.text(0),
            "script_unresolved_state"
        ),
    }
}

pub(crate) fn set_tangible(data: &mut ActionRunData<'_, '_>) {
    data.mob.tangible = data.args.boolean(0);
}

pub(crate) fn set_team(data: &mut ActionRunData<'_, '_>) {
    if let Some(team) = MobTeam::from_code(data.args.int(0)) {
        data.mob.team = team;
    }
}

pub(crate) fn set_timer(data: &mut ActionRunData<'_, '_>) {
    let time = data.args.float(0);
    data.mob.script_timer.start(time);
}

pub(crate) fn set_var(data: &mut ActionRunData<'_, '_>) {
    let name = data.args.text(0);
    let value = data.args.text(1);
    data.mob.vars.set(&name, value);
}

pub(crate) fn show_message_from_var(data: &mut ActionRunData<'_, '_>) {
    let text = data.mob.vars.get_str(&data.args.text(0)).to_string();
    data.ctx.services.hud_messages.push(HudMessage {
        mob: data.mob.id,
        text,
    });
}

pub(crate) fn spawn(data: &mut ActionRunData<'_, '_>) {
    let Ok(index) = usize::try_from(data.args.int(0)) else {
        return;
    };
    let Some(def) = data.mob.mob_type.spawns.get(index) else {
        return;
    };
    let Some(mob_type) = data.ctx.content.mob_types().find(&def.mob_type) else {
        warn!(
            mob_id = data.mob.id.0,
            spawn = %def.name,
            mob_type = %def.mob_type,
            "script_spawn_type_missing"
        );
        return;
    };
    let (pos, angle) = if def.relative {
        (
            data.mob.pos + def.coords.rotated(data.mob.angle),
            data.mob.angle + def.angle,
        )
    } else {
        (def.coords, def.angle)
    };
    let request = SpawnRequest {
        mob_type: mob_type.clone(),
        pos,
        z: data.mob.z + def.z,
        angle,
        vars: ScriptVars::parse_assignments(&def.vars),
        parent: Some(data.mob.id),
        link_parent_to_child: def.link_object_to_spawn,
        link_child_to_parent: def.link_spawn_to_object,
        momentum: def.momentum,
        launch_angle: None,
    };
    debug!(mob_id = data.mob.id.0, spawn = %def.name, "script_spawn_requested");
    data.ctx.services.spawn_requests.push(request);
}

pub(crate) fn stabilize_z(data: &mut ActionRunData<'_, '_>) {
    let heights = data
        .mob
        .links
        .iter()
        .filter_map(|id| data.ctx.mobs.get(*id).map(|link| link.z));
    let reference = match StabilizeReference::from_code(data.args.int(0)) {
        Some(StabilizeReference::Highest) => heights.reduce(f32::max),
        Some(StabilizeReference::Lowest) => heights.reduce(f32::min),
        None => None,
    };
    if let Some(reference) = reference {
        data.mob.z = reference + data.args.float(1);
    }
}

pub(crate) fn start_chomping(data: &mut ActionRunData<'_, '_>) {
    data.mob.chomp_max = usize::try_from(data.args.int(0)).unwrap_or(0);
    data.mob.chomp_body_parts = data
        .args
        .tail(1)
        .iter()
        .map(|value| value.as_text())
        .collect();
}

pub(crate) fn stop_chomping(data: &mut ActionRunData<'_, '_>) {
    data.mob.chomp_max = 0;
    data.mob.chomp_body_parts.clear();
}

pub(crate) fn start_dying(data: &mut ActionRunData<'_, '_>) {
    data.mob.dead = true;
    data.mob.set_health(0.0);
    data.mob.stop_chasing();
    data.mob.statuses.clear();
    release_chomped(data);
}

pub(crate) fn start_height_effect(data: &mut ActionRunData<'_, '_>) {
    data.mob.height_effect = true;
}

pub(crate) fn stop_height_effect(data: &mut ActionRunData<'_, '_>) {
    data.mob.height_effect = false;
}

pub(crate) fn start_particles(data: &mut ActionRunData<'_, '_>) {
    let mut offset = [0.0; 3];
    for (slot, value) in offset.iter_mut().zip(data.args.tail(1)) {
        *slot = value.as_f32();
    }
    let name = data.args.text(0);
    data.mob.particle_generators.push(ParticleGenerator {
        name,
        offset,
        time_left: None,
    });
}

pub(crate) fn stop_particles(data: &mut ActionRunData<'_, '_>) {
    data.mob.particle_generators.clear();
}

pub(crate) fn stop(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
}

pub(crate) fn stop_vertically(data: &mut ActionRunData<'_, '_>) {
    data.mob.speed_z = 0.0;
}

pub(crate) fn swallow(data: &mut ActionRunData<'_, '_>) {
    let amount = usize::try_from(data.args.int(0)).unwrap_or(0);
    swallow_victims(data, amount);
}

pub(crate) fn swallow_all(data: &mut ActionRunData<'_, '_>) {
    let amount = data.mob.chomping.len();
    swallow_victims(data, amount);
}

fn swallow_victims(data: &mut ActionRunData<'_, '_>, amount: usize) {
    let amount = amount.min(data.mob.chomping.len());
    let id = data.mob.id;
    let victims = data.mob.chomping.drain(..amount).collect::<Vec<_>>();
    for victim in victims {
        data.mob.holding.retain(|held| *held != victim);
        data.ctx
            .send_event(victim, MobEventType::Swallowed, EventPayload::from_mob(id));
    }
}

/// Lets go of every chomped victim.
fn release_chomped(data: &mut ActionRunData<'_, '_>) {
    let id = data.mob.id;
    let victims = std::mem::take(&mut data.mob.chomping);
    for victim in victims {
        data.mob.holding.retain(|held| *held != victim);
        if let Some(mob) = data.ctx.mobs.get_mut(victim) {
            mob.holder = None;
        }
        data.ctx
            .send_event(victim, MobEventType::Released, EventPayload::from_mob(id));
    }
}

pub(crate) fn teleport_to_absolute(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
    data.mob.pos = Vec2::new(data.args.float(0), data.args.float(1));
    data.mob.z = data.args.float(2);
}

pub(crate) fn teleport_to_relative(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
    let offset = Vec2::new(data.args.float(0), data.args.float(1)).rotated(data.mob.angle);
    data.mob.pos += offset;
    data.mob.z += data.args.float(2);
}

/// Script angles are in degrees.
pub(crate) fn turn_to_absolute(data: &mut ActionRunData<'_, '_>) {
    let angle = data.args.float(0).to_radians();
    data.mob.face(angle);
}

pub(crate) fn turn_to_relative(data: &mut ActionRunData<'_, '_>) {
    let angle = data.mob.angle + data.args.float(0).to_radians();
    data.mob.face(angle);
}

pub(crate) fn turn_to_target(data: &mut ActionRunData<'_, '_>) {
    let target = match TurnTarget::from_code(data.args.int(0)) {
        Some(TurnTarget::FocusedMob) => focused_mob_pos(data).map(|pos| data.mob.pos.angle_to(pos)),
        Some(TurnTarget::Home) => Some(data.mob.pos.angle_to(data.mob.home)),
        Some(TurnTarget::Randomly) => Some(data.ctx.services.rng.range_f32(0.0, TAU)),
        None => None,
    };
    if let Some(angle) = target {
        data.mob.face(angle);
    }
}

fn focused_mob_pos(data: &ActionRunData<'_, '_>) -> Option<Vec2> {
    data.mob
        .focused_mob
        .and_then(|id| data.ctx.mobs.get(id))
        .map(|mob| mob.pos)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mob::{Mob, MobCategory, MobId, MobType, SoundDef};
    use crate::script::{compile_statement, ActionLibrary, ScriptLoadContext};
    use crate::sim::test_support::TestWorld;

    fn run_lines(mob: &mut Mob, world: &mut TestWorld, lines: &[&str], payload: &EventPayload) {
        let library = ActionLibrary::standard();
        let names = mob.mob_type.name_lists();
        let statuses = world.content.status_type_names();
        let ctx = ScriptLoadContext {
            animations: &names.animations,
            reaches: &names.reaches,
            sounds: &names.sounds,
            spawns: &names.spawns,
            body_parts: &names.body_parts,
            status_types: &statuses,
        };
        let calls = lines
            .iter()
            .map(|line| compile_statement(line, MobEventType::OnEnter, &library, &ctx).expect("compile"))
            .collect::<Vec<_>>();
        crate::fsm::runtime::run_actions(
            mob,
            &mut world.ctx(),
            &calls,
            MobEventType::OnEnter,
            payload,
        );
    }

    fn enemy(id: u64) -> Mob {
        let mut mob_type = MobType::blank("enemies/test", MobCategory::Enemies);
        mob_type.sounds.push(SoundDef {
            name: "roar".to_string(),
            sample: "roar_sample".to_string(),
        });
        Mob::new(MobId(id), Arc::new(mob_type), Vec2::ZERO, 0.0)
    }

    #[test]
    fn calculate_writes_integral_results_as_integers() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        run_lines(
            &mut mob,
            &mut world,
            &["set_var count 4", "calculate count $count * 3", "calculate half $count / 0"],
            &EventPayload::default(),
        );
        assert_eq!(mob.vars.get_str("count"), "12");
        assert_eq!(mob.vars.get_str("half"), "0");
    }

    #[test]
    fn messages_reach_links_and_nearby_mobs() {
        let mut mob = enemy(1);
        mob.links.push(MobId(2));
        let mut world = TestWorld::new();
        world.mobs.insert(enemy(2));
        let mut far = enemy(3);
        far.pos = Vec2::new(500.0, 0.0);
        world.mobs.insert(far);

        run_lines(
            &mut mob,
            &mut world,
            &["send_message_to_links hello", "send_message_to_nearby 50 nearby"],
            &EventPayload::default(),
        );
        let linked = world.mobs.get(MobId(2)).expect("linked");
        assert_eq!(linked.events.len(), 2);
        assert_eq!(linked.events[0].payload.message.as_deref(), Some("hello"));
        assert_eq!(linked.events[0].payload.other, Some(MobId(1)));
        assert!(world.mobs.get(MobId(3)).expect("far").events.is_empty());
    }

    #[test]
    fn play_sound_emits_a_cue() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        run_lines(&mut mob, &mut world, &["play_sound roar"], &EventPayload::default());
        assert_eq!(
            world.services.sound_cues,
            vec![SoundCue {
                mob: MobId(1),
                sound_index: 0,
                sample: "roar_sample".to_string(),
            }]
        );
    }

    #[test]
    fn focus_trigger_and_move_to_focus() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        let mut target = enemy(2);
        target.pos = Vec2::new(30.0, 40.0);
        world.mobs.insert(target);

        run_lines(
            &mut mob,
            &mut world,
            &["focus trigger", "move_to_target focused_mob_position", "turn_to_target focused_mob"],
            &EventPayload::from_mob(MobId(2)),
        );
        assert_eq!(mob.focused_mob, Some(MobId(2)));
        assert_eq!(
            mob.chase.map(|chase| chase.target),
            Some(crate::mob::ChaseTarget::Position(Vec2::new(30.0, 40.0)))
        );
        assert!((mob.intended_turn_angle - (40.0f32).atan2(30.0)).abs() < 1.0e-5);
    }

    #[test]
    fn focus_on_missing_mob_keeps_old_focus() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        run_lines(&mut mob, &mut world, &["focus trigger"], &EventPayload::from_mob(MobId(9)));
        assert_eq!(mob.focused_mob, None);
    }

    #[test]
    fn teleport_relative_uses_facing() {
        let mut mob = enemy(1);
        mob.angle = std::f32::consts::FRAC_PI_2;
        let mut world = TestWorld::new();
        run_lines(&mut mob, &mut world, &["teleport_to_relative 10 0 5"], &EventPayload::default());
        assert!(mob.pos.x.abs() < 1.0e-4);
        assert!((mob.pos.y - 10.0).abs() < 1.0e-4);
        assert_eq!(mob.z, 5.0);
    }

    #[test]
    fn swallow_sends_events_to_victims() {
        let mut mob = enemy(1);
        mob.chomping = vec![MobId(2), MobId(3)];
        let mut world = TestWorld::new();
        world.mobs.insert(enemy(2));
        world.mobs.insert(enemy(3));
        run_lines(&mut mob, &mut world, &["swallow 1"], &EventPayload::default());
        assert_eq!(mob.chomping, vec![MobId(3)]);
        let victim = world.mobs.get(MobId(2)).expect("victim");
        assert_eq!(victim.events[0].event, MobEventType::Swallowed);
    }

    #[test]
    fn randomize_var_stays_in_range() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        for _ in 0..20 {
            run_lines(&mut mob, &mut world, &["randomize_var roll 3 5"], &EventPayload::default());
            let roll = mob.vars.get_i32("roll");
            assert!((3..=5).contains(&roll));
        }
    }

    #[test]
    fn flagged_mobs_are_not_counted_or_messaged() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        let pikmin_type = Arc::new(MobType::blank("pikmin/red_pikmin", MobCategory::Pikmin));
        world
            .mobs
            .insert(Mob::new(MobId(2), Arc::clone(&pikmin_type), Vec2::ZERO, 0.0));
        let mut leaving = Mob::new(MobId(3), pikmin_type, Vec2::ZERO, 0.0);
        leaving.to_delete = true;
        world.mobs.insert(leaving);

        run_lines(
            &mut mob,
            &mut world,
            &[
                "if field_pikmin = 1",
                "set_var counted one",
                "end_if",
                "send_message_to_nearby 50 hello",
            ],
            &EventPayload::default(),
        );
        assert_eq!(mob.vars.get_str("counted"), "one");
        assert_eq!(world.mobs.get(MobId(2)).expect("live").events.len(), 1);
        assert!(world.mobs.get(MobId(3)).expect("flagged").events.is_empty());
    }

    #[test]
    fn randomize_timer_handles_spans_wider_than_f32() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        for _ in 0..20 {
            run_lines(
                &mut mob,
                &mut world,
                &["randomize_timer -3e38 3e38"],
                &EventPayload::default(),
            );
            let duration = mob.script_timer.duration;
            assert!(duration.is_finite());
            assert!((0.0..=3.0e38).contains(&duration));
        }

        run_lines(&mut mob, &mut world, &["randomize_timer 4 2"], &EventPayload::default());
        assert!((2.0..=4.0).contains(&mob.script_timer.duration));
    }

    #[test]
    fn status_actions_use_loaded_types() {
        let mut mob = enemy(1);
        let mut world = TestWorld::new();
        world.add_status_type("burning");
        run_lines(&mut mob, &mut world, &["receive_status burning"], &EventPayload::default());
        assert!(mob.has_status("burning"));
        run_lines(&mut mob, &mut world, &["remove_status burning"], &EventPayload::default());
        assert!(!mob.has_status("burning"));
    }
}
