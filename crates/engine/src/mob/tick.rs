//! Per-mob tick: queued events, `on_tick`, brain, physics, housekeeping and
//! animation, always in that order. Events raised by the later phases are
//! handled at the start of the mob's next tick.

use std::sync::Arc;

use tracing::warn;

use crate::fsm::runtime;
use crate::geometry::{rotate_toward, Vec2};
use crate::script::{EventPayload, MobEventType};
use crate::sim::ScriptContext;

use super::mob::{ChaseTarget, Mob};
use super::{drop, onion};
use super::MobId;

/// Events one mob may handle per tick; the rest wait for the next tick.
pub const MAX_EVENTS_PER_TICK: usize = 256;
/// Downward acceleration in units per second squared.
pub const GRAVITY: f32 = 1300.0;

pub(crate) fn tick_mob(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    process_events(mob, ctx);
    if mob.to_delete {
        return;
    }
    runtime::handle_event(mob, ctx, MobEventType::OnTick, &EventPayload::default());
    tick_brain(mob, ctx);
    tick_physics(mob, ctx, dt);
    tick_housekeeping(mob, ctx, dt);
    tick_animation(mob, dt);
}

fn process_events(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    let mut handled = 0;
    while let Some(queued) = mob.events.pop_front() {
        if handled == MAX_EVENTS_PER_TICK {
            mob.events.push_front(queued);
            warn!(
                mob_id = mob.id.0,
                mob_type = %mob.mob_type.internal_name,
                pending = mob.events.len(),
                "mob_event_budget_exhausted"
            );
            break;
        }
        handled += 1;
        runtime::handle_event(mob, ctx, queued.event, &queued.payload);
    }
}

fn tick_brain(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    if mob
        .focused_mob
        .is_some_and(|focus| !ctx.mobs.contains(focus))
    {
        mob.focused_mob = None;
    }

    if let (Some(focus), Some(reach)) = (mob.focused_mob, mob.near_reach) {
        let off_reach = match (ctx.mobs.get(focus), mob.mob_type.reaches.get(reach)) {
            (Some(target), Some(reach)) => {
                let distance = mob.pos.distance(target.pos) - target.radius;
                !reach.contains(mob.angle, distance, mob.pos.angle_to(target.pos))
            }
            _ => false,
        };
        if off_reach {
            mob.queue_event_with(MobEventType::FocusOffReach, EventPayload::from_mob(focus));
        }
    }

    if let Some(reach) = mob.far_reach.and_then(|index| mob.mob_type.reaches.get(index)) {
        let mut nearest_opponent: Option<(f32, MobId)> = None;
        let mut nearest_object: Option<(f32, MobId)> = None;
        for other in ctx.mobs.iter() {
            if other.to_delete || other.hiding || !other.tangible || mob.holding.contains(&other.id)
            {
                continue;
            }
            let distance = mob.pos.distance(other.pos) - other.radius;
            if !reach.contains(mob.angle, distance, mob.pos.angle_to(other.pos)) {
                continue;
            }
            if other.is_alive() && mob.team.is_opponent_of(other.team) {
                if nearest_opponent.map_or(true, |(best, _)| distance < best) {
                    nearest_opponent = Some((distance, other.id));
                }
            }
            if nearest_object.map_or(true, |(best, _)| distance < best) {
                nearest_object = Some((distance, other.id));
            }
        }
        if let Some((_, id)) = nearest_opponent {
            mob.queue_event_with(MobEventType::OpponentInReach, EventPayload::from_mob(id));
        }
        if let Some((_, id)) = nearest_object {
            mob.queue_event_with(MobEventType::ObjectInReach, EventPayload::from_mob(id));
        }
    }

    if let Some(leader_id) = mob.following_group {
        match ctx.mobs.get(leader_id) {
            Some(leader) => {
                let follow_distance = mob.radius + leader.radius + 30.0;
                let already_following = matches!(
                    mob.chase.map(|chase| chase.target),
                    Some(ChaseTarget::Mob { id, .. }) if id == leader_id
                );
                if !already_following && mob.pos.distance(leader.pos) > follow_distance {
                    let speed = mob.move_speed();
                    mob.chase_mob(leader_id, Vec2::ZERO, speed);
                    if let Some(chase) = mob.chase.as_mut() {
                        chase.arrival_distance = follow_distance;
                    }
                }
            }
            None => mob.following_group = None,
        }
    }
}

fn tick_physics(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    if let Some(holder_id) = mob.holder {
        match ctx.mobs.get(holder_id) {
            Some(holder) => {
                mob.pos = holder.pos;
                mob.z = holder.z;
                mob.speed = Vec2::ZERO;
                mob.speed_z = 0.0;
                return;
            }
            None => mob.holder = None,
        }
    }

    move_horizontally(mob, ctx, dt);
    move_vertically(mob, ctx, dt);

    let max_step = mob.mob_type.rotation_speed * dt;
    mob.angle = rotate_toward(mob.angle, mob.intended_turn_angle, max_step);

    detect_touches(mob, ctx);
}

fn move_horizontally(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    let Some(chase) = mob.chase else {
        return;
    };
    let target = match chase.target {
        ChaseTarget::Position(pos) => Some(pos),
        ChaseTarget::Mob { id, offset } => ctx.mobs.get(id).map(|other| other.pos + offset),
    };
    let Some(target) = target else {
        mob.stop_chasing();
        return;
    };

    let distance = mob.pos.distance(target);
    if chase.reached {
        // Mob targets can walk away again; position targets stay reached.
        if matches!(chase.target, ChaseTarget::Mob { .. }) && distance > chase.arrival_distance {
            if let Some(chase) = mob.chase.as_mut() {
                chase.reached = false;
            }
        }
        return;
    }
    if distance <= chase.arrival_distance {
        arrive(mob);
        return;
    }

    let direction = (target - mob.pos).normalized_or_zero();
    let step = (chase.speed * dt).min(distance);
    let resolution = ctx
        .geometry
        .resolve_horizontal(mob.pos, mob.pos + direction * step, mob.radius);
    mob.speed = direction * chase.speed;
    mob.pos = resolution.position;
    mob.face(mob.pos.angle_to(target));
    if resolution.touched_wall {
        mob.queue_event(MobEventType::TouchWall);
    }
    if mob.pos.distance(target) <= chase.arrival_distance {
        arrive(mob);
    }
}

/// Advances to the next waypoint, or finishes the chase.
fn arrive(mob: &mut Mob) {
    if let Some(path) = mob.path.as_mut() {
        if !path.is_last() {
            path.next += 1;
            if let (Some(next), Some(chase)) = (path.current(), mob.chase.as_mut()) {
                chase.target = ChaseTarget::Position(next);
            }
            return;
        }
    }
    mob.path = None;
    mob.speed = Vec2::ZERO;
    if let Some(chase) = mob.chase.as_mut() {
        chase.reached = true;
    }
    mob.queue_event(MobEventType::ReachedDestination);
}

fn move_vertically(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    let ground = ctx.geometry.ground_z_at(mob.pos);
    if mob.z <= ground && mob.speed_z <= 0.0 {
        mob.z = ground;
        mob.speed_z = 0.0;
        return;
    }
    mob.speed_z -= GRAVITY * mob.gravity_mult * dt;
    mob.z += mob.speed_z * dt;
    if mob.z <= ground {
        mob.z = ground;
        mob.speed_z = 0.0;
        mob.queue_event(MobEventType::Landed);
    }
}

fn detect_touches(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    if !mob.tangible {
        mob.touching.clear();
        return;
    }
    let touching = ctx
        .mobs
        .iter()
        .filter(|other| other.tangible && !other.to_delete && other.holder.is_none())
        .filter(|other| mob.pos.distance(other.pos) < mob.radius + other.radius)
        .map(|other| (other.id, mob.team.is_opponent_of(other.team) && other.is_alive()))
        .collect::<Vec<_>>();

    let mut new_touches = Vec::new();
    for (other_id, is_opponent) in &touching {
        if mob.touching.contains(other_id) {
            continue;
        }
        new_touches.push(*other_id);
        let event = if *is_opponent {
            MobEventType::TouchOpponent
        } else {
            MobEventType::TouchObject
        };
        mob.queue_event_with(event, EventPayload::from_mob(*other_id));

        if *is_opponent && mob.chomping.len() < mob.chomp_max {
            grab_victim(mob, ctx, *other_id);
        }
    }
    mob.touching = touching.into_iter().map(|(id, _)| id).collect();
    if !new_touches.is_empty() {
        drop::feed_touchers(mob, ctx, &new_touches);
    }
}

fn grab_victim(mob: &mut Mob, ctx: &mut ScriptContext<'_>, victim_id: MobId) {
    let Some(victim) = ctx.mobs.get_mut(victim_id) else {
        return;
    };
    victim.holder = Some(mob.id);
    victim.stop_chasing();
    mob.chomping.push(victim_id);
    mob.holding.push(victim_id);
}

fn tick_housekeeping(mob: &mut Mob, ctx: &mut ScriptContext<'_>, dt: f32) {
    if mob.script_timer.tick(dt) {
        mob.queue_event(MobEventType::Timer);
    }

    let mut health_delta = 0.0;
    for status in &mut mob.statuses {
        health_delta += status.status_type.health_change * dt;
        if let Some(time_left) = status.time_left.as_mut() {
            *time_left -= dt;
        }
    }
    mob.statuses
        .retain(|status| status.time_left.map_or(true, |time_left| time_left > 0.0));
    if health_delta != 0.0 && !mob.dead {
        mob.add_health(health_delta);
    }
    apply_hazard(mob, ctx);

    mob.invuln_time_left = (mob.invuln_time_left - dt).max(0.0);

    let itch_damage = mob.mob_type.itch_damage;
    let itch_time = mob.mob_type.itch_time;
    if itch_damage > 0.0 {
        mob.itch_time += dt;
        if mob.itch_damage >= itch_damage && mob.itch_time >= itch_time {
            mob.itch_damage = 0.0;
            mob.itch_time = 0.0;
            mob.queue_event(MobEventType::Itch);
        }
    }

    for generator in &mut mob.particle_generators {
        if let Some(time_left) = generator.time_left.as_mut() {
            *time_left -= dt;
        }
    }
    mob.particle_generators
        .retain(|generator| generator.time_left.map_or(true, |time_left| time_left > 0.0));

    if mob.is_alive() && mob.mob_type.health_regen > 0.0 {
        mob.add_health(mob.mob_type.health_regen * dt);
    }
    mob.time_alive += dt;
    onion::spew_seeds(mob, ctx, dt);

    if mob.max_health > 0.0 && mob.health <= 0.0 && !mob.dead {
        mob.dead = true;
        mob.queue_event(MobEventType::Death);
    }
}

/// Keeps the statuses of the hazard under the mob applied, and drops
/// hazard statuses once it steps off.
fn apply_hazard(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    let on_ground = mob.z <= ctx.geometry.ground_z_at(mob.pos) + 1.0;
    let hazard_key = ctx
        .geometry
        .hazard_at(mob.pos)
        .filter(|_| on_ground)
        .filter(|key| !mob.mob_type.resists(key))
        .map(str::to_string);
    let hazard = hazard_key.as_deref().and_then(|key| ctx.content.hazard(key));
    let effects = hazard.map(|hazard| hazard.effects.clone()).unwrap_or_default();

    mob.statuses.retain(|status| {
        !status.from_hazard || effects.iter().any(|effect| *effect == status.status_type.name)
    });
    for effect in &effects {
        if let Some(status_type) = ctx.content.status_type(effect) {
            mob.apply_status(Arc::clone(status_type), true);
        }
    }
}

fn tick_animation(mob: &mut Mob, dt: f32) {
    let mob_type = Arc::clone(&mob.mob_type);
    let Some(def) = mob
        .animation
        .index
        .and_then(|index| mob_type.animations.get(index))
    else {
        return;
    };
    if mob.animation.finished {
        return;
    }

    let before = mob.animation.elapsed;
    let after = before + dt;
    for signal in &def.signals {
        if signal.time >= before && signal.time < after {
            mob.queue_event_with(MobEventType::FrameSignal, EventPayload::signal(signal.signal));
        }
    }

    if after < def.duration {
        mob.animation.elapsed = after;
        return;
    }
    mob.queue_event(MobEventType::AnimationEnd);
    if def.loops && def.duration > 0.0 {
        mob.animation.elapsed = after % def.duration;
    } else {
        mob.animation.elapsed = def.duration;
        mob.animation.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StatusType;
    use crate::mob::{
        AnimationDef, CategoryProperties, CategoryState, DropConsumer, FrameSignal, MobCategory,
        MobReach, MobTeam, MobType,
    };
    use crate::sim::test_support::TestWorld;

    fn mob_of(mob_type: MobType, id: u64, pos: Vec2) -> Mob {
        Mob::new(MobId(id), Arc::new(mob_type), pos, 0.0)
    }

    fn plain(id: u64, pos: Vec2) -> Mob {
        mob_of(MobType::blank("enemies/test", MobCategory::Enemies), id, pos)
    }

    fn drain(mob: &mut Mob) -> Vec<MobEventType> {
        mob.events.drain(..).map(|queued| queued.event).collect()
    }

    #[test]
    fn chase_reaches_destination_once() {
        let mut mob = plain(1, Vec2::new(40.0, 40.0));
        let mut world = TestWorld::new();
        mob.chase_position(Vec2::new(60.0, 40.0), 100.0);
        for _ in 0..30 {
            tick_physics(&mut mob, &mut world.ctx(), 0.05);
        }
        assert!((mob.pos.x - 60.0).abs() <= 3.0);
        let events = drain(&mut mob);
        assert_eq!(
            events
                .iter()
                .filter(|event| **event == MobEventType::ReachedDestination)
                .count(),
            1
        );
    }

    #[test]
    fn path_waypoints_are_followed_in_order() {
        let mut mob = plain(1, Vec2::new(40.0, 40.0));
        let mut world = TestWorld::new();
        mob.follow_path(vec![Vec2::new(60.0, 40.0), Vec2::new(60.0, 80.0)], 200.0);
        for _ in 0..40 {
            tick_physics(&mut mob, &mut world.ctx(), 0.05);
        }
        assert!(mob.pos.distance(Vec2::new(60.0, 80.0)) <= 3.0);
        assert!(mob.path.is_none());
        assert!(drain(&mut mob).contains(&MobEventType::ReachedDestination));
    }

    #[test]
    fn falling_mob_lands_on_ground() {
        let mut mob = plain(1, Vec2::new(40.0, 40.0));
        mob.z = 50.0;
        let mut world = TestWorld::new();
        for _ in 0..60 {
            tick_physics(&mut mob, &mut world.ctx(), 0.05);
        }
        assert_eq!(mob.z, 0.0);
        assert_eq!(drain(&mut mob), vec![MobEventType::Landed]);
    }

    #[test]
    fn timer_and_death_are_raised_by_housekeeping() {
        let mut mob = plain(1, Vec2::new(40.0, 40.0));
        let mut world = TestWorld::new();
        mob.script_timer.start(0.1);
        mob.set_health(0.0);
        tick_housekeeping(&mut mob, &mut world.ctx(), 0.2);
        tick_housekeeping(&mut mob, &mut world.ctx(), 0.2);
        assert_eq!(
            drain(&mut mob),
            vec![MobEventType::Timer, MobEventType::Death]
        );
    }

    #[test]
    fn statuses_drain_health_and_expire() {
        let mut mob = plain(1, Vec2::new(40.0, 40.0));
        let mut world = TestWorld::new();
        let mut burning = StatusType::named("burning");
        burning.health_change = -10.0;
        burning.duration = 1.0;
        mob.apply_status(Arc::new(burning), false);
        for _ in 0..10 {
            tick_housekeeping(&mut mob, &mut world.ctx(), 0.25);
        }
        assert!(mob.statuses.is_empty());
        assert!((mob.health - 90.0).abs() < 0.01);
    }

    #[test]
    fn hazard_statuses_follow_the_tile() {
        let mut world = TestWorld::new();
        world.add_status_type("soaked");
        world.add_hazard("water", &["soaked"]);
        world.set_hazard_tile(1, 1, "water");
        let mut mob = plain(1, Vec2::new(48.0, 48.0));
        tick_housekeeping(&mut mob, &mut world.ctx(), 0.1);
        assert!(mob.has_status("soaked"));

        mob.pos = Vec2::new(16.0, 16.0);
        tick_housekeeping(&mut mob, &mut world.ctx(), 0.1);
        assert!(!mob.has_status("soaked"));

        let mut resistant_type = MobType::blank("enemies/fish", MobCategory::Enemies);
        resistant_type.resistances.push("water".to_string());
        let mut fish = mob_of(resistant_type, 2, Vec2::new(48.0, 48.0));
        tick_housekeeping(&mut fish, &mut world.ctx(), 0.1);
        assert!(!fish.has_status("soaked"));
    }

    #[test]
    fn animation_signals_and_end() {
        let mut mob_type = MobType::blank("enemies/test", MobCategory::Enemies);
        mob_type.animations.push(AnimationDef {
            name: "attack".to_string(),
            duration: 1.0,
            loops: false,
            signals: vec![FrameSignal {
                time: 0.5,
                signal: 7,
            }],
        });
        let mut mob = mob_of(mob_type, 1, Vec2::ZERO);
        mob.set_animation(0, true, 0.0);
        for _ in 0..6 {
            tick_animation(&mut mob, 0.25);
        }
        let queued = mob.events.drain(..).collect::<Vec<_>>();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0].event, MobEventType::FrameSignal);
        assert_eq!(queued[0].payload.signal, Some(7));
        assert_eq!(queued[1].event, MobEventType::AnimationEnd);
        assert!(mob.animation.finished);
    }

    #[test]
    fn far_reach_reports_nearest_opponent() {
        let mut mob_type = MobType::blank("enemies/test", MobCategory::Enemies);
        mob_type.team = MobTeam::Enemy1;
        mob_type.reaches.push(MobReach {
            name: "search".to_string(),
            radius_1: 200.0,
            angle_1: std::f32::consts::TAU,
            radius_2: 0.0,
            angle_2: 0.0,
        });
        let mut mob = mob_of(mob_type, 1, Vec2::new(40.0, 40.0));
        mob.far_reach = Some(0);

        let mut world = TestWorld::new();
        let mut prey_type = MobType::blank("pikmin/red", MobCategory::Pikmin);
        prey_type.team = MobTeam::Player1;
        world.mobs.insert(mob_of(prey_type.clone(), 2, Vec2::new(120.0, 40.0)));
        world.mobs.insert(mob_of(prey_type, 3, Vec2::new(80.0, 40.0)));

        tick_brain(&mut mob, &mut world.ctx());
        let queued = mob.events.drain(..).collect::<Vec<_>>();
        assert_eq!(queued[0].event, MobEventType::OpponentInReach);
        assert_eq!(queued[0].payload.other, Some(MobId(3)));
    }

    #[test]
    fn vanished_focus_is_dropped() {
        let mut mob = plain(1, Vec2::ZERO);
        mob.focused_mob = Some(MobId(42));
        let mut world = TestWorld::new();
        tick_brain(&mut mob, &mut world.ctx());
        assert_eq!(mob.focused_mob, None);
    }

    #[test]
    fn touching_an_opponent_fires_once_and_chomps() {
        let mut mob_type = MobType::blank("enemies/test", MobCategory::Enemies);
        mob_type.team = MobTeam::Enemy1;
        let mut mob = mob_of(mob_type, 1, Vec2::new(40.0, 40.0));
        mob.chomp_max = 1;
        let mut world = TestWorld::new();
        let mut prey_type = MobType::blank("pikmin/red", MobCategory::Pikmin);
        prey_type.team = MobTeam::Player1;
        world.mobs.insert(mob_of(prey_type, 2, Vec2::new(50.0, 40.0)));

        detect_touches(&mut mob, &mut world.ctx());
        detect_touches(&mut mob, &mut world.ctx());
        assert_eq!(drain(&mut mob), vec![MobEventType::TouchOpponent]);
        assert_eq!(mob.chomping, vec![MobId(2)]);
        assert_eq!(world.mobs.get(MobId(2)).and_then(|prey| prey.holder), Some(MobId(1)));
    }
    fn drop_type(total_doses: u32, consumer: DropConsumer) -> MobType {
        let mut drop_type = MobType::blank("drops/nectar", MobCategory::Drops);
        drop_type.properties = CategoryProperties::Drop {
            total_doses,
            consumer,
            health_change: 20.0,
            status_to_give: Some("sweet".to_string()),
        };
        drop_type
    }

    #[test]
    fn drop_gives_one_dose_per_new_consumer_and_runs_dry() {
        let mut world = TestWorld::new();
        world.add_status_type("sweet");
        let mut nectar = mob_of(drop_type(2, DropConsumer::Pikmin), 1, Vec2::new(40.0, 40.0));

        let pikmin_type = MobType::blank("pikmin/red", MobCategory::Pikmin);
        let mut thirsty = mob_of(pikmin_type.clone(), 2, Vec2::new(50.0, 40.0));
        thirsty.set_health(50.0);
        world.mobs.insert(thirsty);
        world.mobs.insert(mob_of(
            MobType::blank("leaders/olimar", MobCategory::Leaders),
            3,
            Vec2::new(40.0, 50.0),
        ));

        detect_touches(&mut nectar, &mut world.ctx());
        detect_touches(&mut nectar, &mut world.ctx());
        assert_eq!(nectar.category_state, CategoryState::Drop { doses_left: 1 });
        let thirsty = world.mobs.get(MobId(2)).expect("pikmin");
        assert_eq!(thirsty.health, 70.0);
        assert!(thirsty.has_status("sweet"));
        assert!(!world.mobs.get(MobId(3)).expect("leader").has_status("sweet"));
        assert!(!nectar.to_delete);

        world.mobs.insert(mob_of(pikmin_type, 4, Vec2::new(30.0, 40.0)));
        detect_touches(&mut nectar, &mut world.ctx());
        assert_eq!(nectar.category_state, CategoryState::Drop { doses_left: 0 });
        assert!(nectar.to_delete);
    }

    #[test]
    fn onion_spews_stored_seeds_as_spawn_requests() {
        let mut world = TestWorld::new();
        world.add_mob_type(MobType::blank("pikmin/red_pikmin", MobCategory::Pikmin));
        let mut onion = mob_of(
            MobType::blank("onions/red_onion", MobCategory::Onions),
            1,
            Vec2::new(100.0, 100.0),
        );
        let CategoryState::Onion(state) = &mut onion.category_state else {
            panic!("onion state");
        };
        state.queue_seeds("pikmin/red_pikmin".to_string(), 2);
        state.queue_seeds("pikmin/ghost_pikmin".to_string(), 1);

        tick_housekeeping(&mut onion, &mut world.ctx(), 1.0);
        assert!(world.services.spawn_requests.is_empty());
        for _ in 0..10 {
            tick_housekeeping(&mut onion, &mut world.ctx(), 0.5);
        }

        let requests = &world.services.spawn_requests;
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|request| request.mob_type.internal_name == "pikmin/red_pikmin"));
        assert!(requests.iter().all(|request| request.momentum > 0.0));
        assert_ne!(requests[0].launch_angle, requests[1].launch_angle);
        assert_eq!(world.services.stats.pikmin_born, 2);
        let CategoryState::Onion(state) = &onion.category_state else {
            panic!("onion state");
        };
        assert_eq!(state.queued(), 0);
    }
}
