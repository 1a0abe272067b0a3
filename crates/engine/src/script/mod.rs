//! Mob scripting: the action library, statement compiler and the per-mob
//! variable store actions read and write.

mod action;
mod call;
mod condition;
mod events;
pub(crate) mod loaders;
mod runners;
mod vars;

pub use action::{
    ActionArg, ActionDef, ActionLibrary, ActionLoader, ActionParam, ActionRunData, ActionRunner,
    ActionType, ArgValue, ParamBinding, ParamKind, ResolvedArgs, ScriptLoadContext,
};
pub use call::{compile_statement, validate_control_flow, ActionCall, ActionKind};
pub use events::{EventPayload, MobEventType, QueuedEvent};
pub use vars::ScriptVars;

pub(crate) use call::{skip_branch, ControlFlowTracker};
