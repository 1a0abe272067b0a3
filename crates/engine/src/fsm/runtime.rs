use std::sync::Arc;

use tracing::{debug, warn};

use crate::mob::Mob;
use crate::script::{
    skip_branch, ActionCall, ActionRunData, ActionType, EventPayload, MobEventType,
};
use crate::sim::ScriptContext;

/// Names of previous states kept for debugging, newest first.
pub const STATE_HISTORY_SIZE: usize = 3;
/// Transitions one dispatch may chain through on-enter handlers.
const MAX_CHAINED_TRANSITIONS: usize = 32;

/// Per-mob FSM position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MobFsm {
    cur_state: Option<usize>,
    pending_state: Option<usize>,
    history: Vec<String>,
}

impl MobFsm {
    pub fn current_state(&self) -> Option<usize> {
        self.cur_state
    }

    pub fn pending_state(&self) -> Option<usize> {
        self.pending_state
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Recorded by `set_state`; applied once the running sequence ends.
    pub(crate) fn request_state(&mut self, index: usize) {
        self.pending_state = Some(index);
    }

    fn push_history(&mut self, name: &str) {
        self.history.insert(0, name.to_string());
        self.history.truncate(STATE_HISTORY_SIZE);
    }
}

/// Name of the mob's current state, for logs and tests.
pub fn current_state_name(mob: &Mob) -> Option<&str> {
    let index = mob.fsm.current_state()?;
    mob.mob_type
        .fsm
        .state(index)
        .map(|state| state.name.as_str())
}

/// Puts a fresh mob into its type's first state and runs that state's on-enter.
pub fn start(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    let Some(first) = mob.mob_type.fsm.first_state else {
        debug!(
            mob_id = mob.id.0,
            mob_type = %mob.mob_type.internal_name,
            "script_no_first_state"
        );
        return;
    };
    enter_state(mob, ctx, first);
    apply_pending(mob, ctx);
}

/// Runs the current state's handler for `event`. Unbound events are ignored.
pub fn handle_event(
    mob: &mut Mob,
    ctx: &mut ScriptContext<'_>,
    event: MobEventType,
    payload: &EventPayload,
) {
    let mob_type = Arc::clone(&mob.mob_type);
    let Some(state) = mob
        .fsm
        .current_state()
        .and_then(|index| mob_type.fsm.state(index))
    else {
        return;
    };
    let Some(calls) = state.handler(event) else {
        return;
    };
    run_actions(mob, ctx, calls, event, payload);
    apply_pending(mob, ctx);
}

/// Switches state immediately, outside of any action sequence.
pub fn change_state(mob: &mut Mob, ctx: &mut ScriptContext<'_>, index: usize) {
    mob.fsm.request_state(index);
    apply_pending(mob, ctx);
}

/// Executes one sequence. `if` and `else` jump over skipped statements, so
/// those never run.
pub(crate) fn run_actions(
    mob: &mut Mob,
    ctx: &mut ScriptContext<'_>,
    calls: &[ActionCall],
    event: MobEventType,
    payload: &EventPayload,
) {
    let mut index = 0;
    while let Some(call) = calls.get(index) {
        match call.action_type() {
            Some(ActionType::Else) => {
                index = skip_branch(calls, index, false);
                continue;
            }
            Some(ActionType::EndIf) => {
                index += 1;
                continue;
            }
            _ => {}
        }

        let mut data = ActionRunData {
            args: call.resolve_args(&mob.vars),
            mob: &mut *mob,
            ctx: &mut *ctx,
            payload,
            event,
            return_value: false,
        };
        call.run(&mut data);
        let branch_taken = data.return_value;

        index = if call.is(ActionType::If) && !branch_taken {
            skip_branch(calls, index, true)
        } else {
            index + 1
        };
    }
}

fn apply_pending(mob: &mut Mob, ctx: &mut ScriptContext<'_>) {
    let mut chained = 0;
    while let Some(next) = mob.fsm.pending_state.take() {
        if chained == MAX_CHAINED_TRANSITIONS {
            warn!(
                mob_id = mob.id.0,
                mob_type = %mob.mob_type.internal_name,
                limit = MAX_CHAINED_TRANSITIONS,
                "script_transition_chain_limit"
            );
            break;
        }
        chained += 1;
        enter_state(mob, ctx, next);
    }
}

fn enter_state(mob: &mut Mob, ctx: &mut ScriptContext<'_>, next: usize) {
    let mob_type = Arc::clone(&mob.mob_type);
    let Some(new_state) = mob_type.fsm.state(next) else {
        warn!(
            mob_id = mob.id.0,
            mob_type = %mob_type.internal_name,
            state_index = next,
            "script_unknown_state_index"
        );
        return;
    };

    if let Some(old_state) = mob
        .fsm
        .current_state()
        .and_then(|index| mob_type.fsm.state(index))
    {
        if let Some(calls) = old_state.handler(MobEventType::OnLeave) {
            run_actions(mob, ctx, calls, MobEventType::OnLeave, &EventPayload::default());
        }
        // A transition requested while leaving is dropped.
        mob.fsm.pending_state = None;
        mob.fsm.push_history(&old_state.name);
    }

    mob.fsm.cur_state = Some(next);
    debug!(
        mob_id = mob.id.0,
        mob_type = %mob_type.internal_name,
        state = %new_state.name,
        "script_state_change"
    );

    if let Some(calls) = new_state.handler(MobEventType::OnEnter) {
        run_actions(mob, ctx, calls, MobEventType::OnEnter, &EventPayload::default());
    }
}
