//! Mobs: the types loaded from content, the live instances and the per-tick
//! update that drives them.

mod carry;
mod category;
mod drop;
mod mob;
mod mob_type;
mod onion;
mod team;
pub(crate) mod tick;

pub use carry::{
    carrying_states, idle_waiting_state, BEING_DELIVERED_STATE, CARRY_MOVING_STATE,
    CARRY_WAITING_STATE, DELIVERY_DURATION, IDLE_WAITING_STATE,
};
pub use category::{
    CategoryProperties, CategoryState, DropConsumer, MobCategory, MobTypeRegistry,
};
pub use mob::{
    AnimationInstance, CarryInfo, ChaseInfo, ChaseTarget, Mob, MobId, MobIdAllocator, MobStatus,
    ParticleGenerator, PathInfo, ScriptTimer, CHASE_ARRIVAL_DISTANCE,
};
pub use onion::{
    OnionState, ONION_FULL_SPEW_DELAY, ONION_NEXT_SPEW_DELAY, ONION_SPEW_ANGLE_SHIFT,
    ONION_SPEW_SPEED,
};
pub use mob_type::{AnimationDef, FrameSignal, MobReach, MobType, SoundDef, SpawnDef};
pub use team::MobTeam;

pub(crate) use mob_type::MobTypeNames;
