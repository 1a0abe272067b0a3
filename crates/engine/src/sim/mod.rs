//! The running simulation: the mob registry with deferred spawns and
//! deletion, the services scripts may call, and the session driver.

mod context;
mod mission;
mod registry;
mod simulation;
#[cfg(test)]
pub(crate) mod test_support;

pub use context::{
    Delivery, HudMessage, MobStore, ScriptContext, SimRng, SimServices, SimStats, SoundCue,
    SpawnRequest,
};
pub use mission::{MissionCounts, MissionResult, MissionStatus, MissionTracker};
pub use registry::MobRegistry;
pub use simulation::{AreaSession, Simulation, SimulationError};
