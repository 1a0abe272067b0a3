//! Built-in states for objects Pikmin carry home, appended to every carriable
//! mob type's state machine, plus the resting state scriptless treasures and
//! pellets start in.

use tracing::debug;

use crate::fsm::{EasyFsmCreator, MobState};
use crate::script::{ActionRunData, EventPayload, MobEventType};
use crate::sim::Delivery;

use super::category::{CategoryProperties, CategoryState, MobCategory};
use super::MobId;

pub const CARRY_WAITING_STATE: &str = "carriable_waiting";
pub const CARRY_MOVING_STATE: &str = "carriable_moving";
pub const BEING_DELIVERED_STATE: &str = "being_delivered";
pub const IDLE_WAITING_STATE: &str = "idle_waiting";

/// Seconds the delivery animation takes before the object is consumed.
pub const DELIVERY_DURATION: f32 = 2.0;

pub fn carrying_states() -> Vec<MobState> {
    let mut creator = EasyFsmCreator::default();
    creator
        .new_state(CARRY_WAITING_STATE)
        .new_event(MobEventType::OnEnter)
        .run("carry_stop_moving", carry_stop_moving)
        .new_event(MobEventType::CarryKeepGoing)
        .run("check_carry_begin", check_carry_begin)
        .new_event(MobEventType::CarrierAdded)
        .run("handle_carrier_added", handle_carrier_added)
        .run("check_carry_begin", check_carry_begin)
        .new_event(MobEventType::CarrierRemoved)
        .run("handle_carrier_removed", handle_carrier_removed)
        .new_event(MobEventType::CarryBeginMove)
        .change_state(CARRY_MOVING_STATE);
    creator
        .new_state(CARRY_MOVING_STATE)
        .new_event(MobEventType::OnEnter)
        .run("start_moving_carried_object", start_moving_carried_object)
        .new_event(MobEventType::CarrierAdded)
        .run("handle_carrier_added", handle_carrier_added)
        .new_event(MobEventType::CarrierRemoved)
        .run("handle_carrier_removed", handle_carrier_removed)
        .run("check_carry_stop", check_carry_stop)
        .new_event(MobEventType::CarryWaitUp)
        .change_state(CARRY_WAITING_STATE)
        .new_event(MobEventType::CarryStopMove)
        .change_state(CARRY_WAITING_STATE)
        .new_event(MobEventType::CarryBeginMove)
        .run("start_moving_carried_object", start_moving_carried_object)
        .new_event(MobEventType::ReachedDestination)
        .run("set_next_target", set_next_target)
        .new_event(MobEventType::CarryDelivered)
        .change_state(BEING_DELIVERED_STATE);
    creator
        .new_state(BEING_DELIVERED_STATE)
        .new_event(MobEventType::OnEnter)
        .run("start_being_delivered", start_being_delivered)
        .new_event(MobEventType::Timer)
        .run("handle_delivery", handle_delivery);
    creator.finish()
}

/// Resting state for carriable types that ship without a script.
pub fn idle_waiting_state() -> Vec<MobState> {
    let mut creator = EasyFsmCreator::default();
    creator
        .new_state(IDLE_WAITING_STATE)
        .new_event(MobEventType::OnEnter)
        .run("stand_still", stand_still)
        .new_event(MobEventType::CarrierAdded)
        .run("handle_carrier_added", handle_carrier_added)
        .run("check_carry_begin", check_carry_begin)
        .new_event(MobEventType::CarrierRemoved)
        .run("handle_carrier_removed", handle_carrier_removed)
        .new_event(MobEventType::CarryBeginMove)
        .change_state(CARRY_MOVING_STATE);
    creator.finish()
}

fn stand_still(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
}

fn carry_stop_moving(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
    if let Some(carry) = data.mob.carry.as_mut() {
        carry.is_moving = false;
        carry.stuck = false;
    }
}

fn carrying_strength(data: &ActionRunData<'_, '_>) -> f32 {
    let Some(carry) = data.mob.carry.as_ref() else {
        return 0.0;
    };
    carry
        .carriers
        .iter()
        .filter_map(|id| data.ctx.mobs.get(*id))
        .map(|carrier| carrier.mob_type.properties.carry_strength())
        .sum()
}

/// Records the carrier named by the event, for events raised by scripts.
fn handle_carrier_added(data: &mut ActionRunData<'_, '_>) {
    let Some(carrier) = data.payload.other else {
        return;
    };
    if let Some(carry) = data.mob.carry.as_mut() {
        if !carry.carriers.contains(&carrier) {
            carry.carriers.push(carrier);
        }
    }
}

fn handle_carrier_removed(data: &mut ActionRunData<'_, '_>) {
    let Some(carrier) = data.payload.other else {
        return;
    };
    if let Some(carry) = data.mob.carry.as_mut() {
        carry.carriers.retain(|id| *id != carrier);
    }
}

fn check_carry_begin(data: &mut ActionRunData<'_, '_>) {
    if carrying_strength(data) >= data.mob.mob_type.weight {
        data.mob.queue_event(MobEventType::CarryBeginMove);
    }
}

fn check_carry_stop(data: &mut ActionRunData<'_, '_>) {
    if carrying_strength(data) < data.mob.mob_type.weight {
        data.mob.queue_event(MobEventType::CarryStopMove);
    }
}

/// Picks the nearest Onion that takes this object and paths to it.
fn start_moving_carried_object(data: &mut ActionRunData<'_, '_>) {
    let pos = data.mob.pos;
    let destination = data
        .ctx
        .mobs
        .iter()
        .filter(|other| other.mob_type.category == MobCategory::Onions && !other.to_delete)
        .min_by(|a, b| pos.distance(a.pos).total_cmp(&pos.distance(b.pos)))
        .map(|onion| (onion.id, onion.pos));

    let path = destination.and_then(|(_, target)| data.ctx.geometry.find_path(pos, target));
    let speed = data.mob.move_speed();
    let Some(carry) = data.mob.carry.as_mut() else {
        return;
    };
    carry.destination = destination.map(|(id, _)| id);
    carry.is_moving = true;

    match path {
        Some(waypoints) => {
            carry.stuck = false;
            data.mob.follow_path(waypoints, speed);
        }
        None => {
            carry.stuck = true;
            data.mob.stop_chasing();
            debug!(
                mob_id = data.mob.id.0,
                mob_type = %data.mob.mob_type.internal_name,
                "carry_destination_unreachable"
            );
        }
    }
}

fn set_next_target(data: &mut ActionRunData<'_, '_>) {
    let arrived = data
        .mob
        .carry
        .as_ref()
        .and_then(|carry| carry.destination)
        .is_some_and(|destination| data.ctx.mob_exists(destination));
    if arrived {
        data.mob.queue_event(MobEventType::CarryDelivered);
    }
}

fn start_being_delivered(data: &mut ActionRunData<'_, '_>) {
    data.mob.stop_chasing();
    data.mob.tangible = false;
    data.mob.script_timer.start(DELIVERY_DURATION);

    let carriers = data
        .mob
        .carry
        .as_mut()
        .map(|carry| {
            carry.is_moving = false;
            std::mem::take(&mut carry.carriers)
        })
        .unwrap_or_default();
    let object = data.mob.id;
    for carrier in carriers {
        data.ctx
            .send_event(carrier, MobEventType::CarryDelivered, EventPayload::from_mob(object));
    }
}

fn handle_delivery(data: &mut ActionRunData<'_, '_>) {
    let object = data.mob.id;
    let destination = data.mob.carry.as_ref().and_then(|carry| carry.destination);
    if let Some(onion_id) = destination {
        let properties = data.mob.mob_type.properties.clone();
        if let Some(onion) = data.ctx.mobs.get_mut(onion_id) {
            deposit_seeds(&properties, onion.mob_type.properties.clone(), &mut onion.category_state);
        }
        data.ctx.send_event(
            onion_id,
            MobEventType::FinishReceivingDelivery,
            EventPayload::from_mob(object),
        );
    }
    let points = match data.mob.mob_type.properties {
        CategoryProperties::Treasure { points } | CategoryProperties::Enemy { points, .. } => {
            points
        }
        _ => 0,
    };
    data.ctx.services.stats.deliveries.push(Delivery {
        object,
        category: data.mob.mob_type.category,
        points,
    });
    debug!(
        mob_id = object.0,
        destination = destination.map(|id: MobId| id.0),
        points,
        "carry_delivered"
    );
    data.mob.to_delete = true;
}

/// Pellets of the Onion's own type yield their matching seed count; enemies
/// yield their corpse seeds as the Onion's first type.
fn deposit_seeds(
    object: &CategoryProperties,
    onion: CategoryProperties,
    state: &mut CategoryState,
) {
    let CategoryProperties::Onion { pikmin_types } = onion else {
        return;
    };
    let CategoryState::Onion(onion_state) = state else {
        return;
    };
    let (pikmin_type, amount) = match object {
        CategoryProperties::Pellet {
            pikmin_type,
            number,
            match_seeds,
            non_match_seeds,
        } => {
            if pikmin_types.contains(pikmin_type) {
                (Some(pikmin_type.clone()), match_seeds * number)
            } else {
                (pikmin_types.first().cloned(), non_match_seeds * number)
            }
        }
        CategoryProperties::Enemy { pikmin_seeds, .. } => {
            (pikmin_types.first().cloned(), *pikmin_seeds)
        }
        _ => (None, 0),
    };
    if let Some(pikmin_type) = pikmin_type {
        onion_state.queue_seeds(pikmin_type, amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mob::OnionState;

    fn onion() -> CategoryProperties {
        CategoryProperties::Onion {
            pikmin_types: vec!["red_pikmin".to_string(), "yellow_pikmin".to_string()],
        }
    }

    fn pellet(pikmin_type: &str) -> CategoryProperties {
        CategoryProperties::Pellet {
            pikmin_type: pikmin_type.to_string(),
            number: 5,
            match_seeds: 5,
            non_match_seeds: 3,
        }
    }

    fn empty_onion_state() -> CategoryState {
        CategoryState::Onion(OnionState::default())
    }

    #[test]
    fn matching_pellet_yields_matching_seeds() {
        let mut state = empty_onion_state();
        deposit_seeds(&pellet("yellow_pikmin"), onion(), &mut state);
        let CategoryState::Onion(onion_state) = state else {
            panic!("onion state");
        };
        assert_eq!(onion_state.seeds.get("yellow_pikmin"), Some(&25));
    }

    #[test]
    fn foreign_pellet_goes_to_first_type() {
        let mut state = empty_onion_state();
        deposit_seeds(&pellet("blue_pikmin"), onion(), &mut state);
        let CategoryState::Onion(onion_state) = state else {
            panic!("onion state");
        };
        assert_eq!(onion_state.seeds.get("red_pikmin"), Some(&15));
        assert_eq!(onion_state.seeds.len(), 1);
    }

    #[test]
    fn treasures_yield_no_seeds() {
        let mut state = empty_onion_state();
        deposit_seeds(&CategoryProperties::Treasure { points: 50 }, onion(), &mut state);
        assert_eq!(state, empty_onion_state());
    }

    #[test]
    fn carrying_states_are_named_and_wired() {
        let states = carrying_states();
        let names = states
            .iter()
            .map(|state| state.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![CARRY_WAITING_STATE, CARRY_MOVING_STATE, BEING_DELIVERED_STATE]
        );
        assert!(states[1]
            .handler(MobEventType::CarryDelivered)
            .is_some_and(|calls| !calls.is_empty()));
        assert!(states[2].handler(MobEventType::Timer).is_some());
    }
}
