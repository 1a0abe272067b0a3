//! Mob finite-state machines: the per-type state definitions, the script file
//! that authors them, and the per-mob runtime that dispatches events.

mod definition;
pub mod runtime;
mod script_file;

pub use definition::{EasyFsmCreator, FsmDefinition, FsmError, MobState};
pub use runtime::{current_state_name, MobFsm, STATE_HISTORY_SIZE};
pub use script_file::ParsedScript;

pub(crate) use script_file::load_script_file;
