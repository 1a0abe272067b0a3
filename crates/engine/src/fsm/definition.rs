use std::collections::BTreeMap;

use thiserror::Error;

use crate::script::{
    ActionArg, ActionCall, ActionRunner, ActionType, ArgValue, MobEventType,
};

/// One FSM state: a name, its index, and the action sequence bound per event.
#[derive(Debug, Clone, Default)]
pub struct MobState {
    pub name: String,
    pub id: usize,
    pub events: BTreeMap<MobEventType, Vec<ActionCall>>,
}

impl MobState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: 0,
            events: BTreeMap::new(),
        }
    }

    pub fn handler(&self, event: MobEventType) -> Option<&[ActionCall]> {
        self.events.get(&event).map(Vec::as_slice)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsmError {
    #[error("state '{0}' is defined more than once")]
    DuplicateState(String),
    #[error("state '{state}', event '{event}': set_state targets unknown state '{target}'")]
    UnknownTarget {
        state: String,
        event: &'static str,
        target: String,
    },
    #[error("first state '{0}' does not exist")]
    UnknownFirstState(String),
    #[error("no first state was given")]
    MissingFirstState,
}

/// States of one mob type, shared read-only by all its mobs.
#[derive(Debug, Clone, Default)]
pub struct FsmDefinition {
    pub states: Vec<MobState>,
    pub first_state: Option<usize>,
}

impl FsmDefinition {
    pub fn state(&self, index: usize) -> Option<&MobState> {
        self.states.get(index)
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|state| state.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Adds states after the authored ones. Indices are reassigned in order.
    pub fn append_states(&mut self, states: Vec<MobState>) -> Result<(), FsmError> {
        for mut state in states {
            if self.state_index(&state.name).is_some() {
                return Err(FsmError::DuplicateState(state.name));
            }
            state.id = self.states.len();
            self.states.push(state);
        }
        Ok(())
    }

    /// Second pass: binds every `set_state` name to an index, then the first
    /// state. Runs once every state, authored or generated, is present.
    pub fn finalize(&mut self, first_state: Option<&str>) -> Result<(), FsmError> {
        self.fix_states()?;
        let Some(first_state) = first_state else {
            return Err(FsmError::MissingFirstState);
        };
        self.first_state = Some(
            self.state_index(first_state)
                .ok_or_else(|| FsmError::UnknownFirstState(first_state.to_string()))?,
        );
        Ok(())
    }

    fn fix_states(&mut self) -> Result<(), FsmError> {
        let names = self
            .states
            .iter()
            .map(|state| state.name.clone())
            .collect::<Vec<_>>();
        for state in &mut self.states {
            for (event, calls) in &mut state.events {
                for call in calls.iter_mut().filter(|call| call.is(ActionType::SetState)) {
                    let Some(ActionArg::Const(ArgValue::Str(target))) = call.args.first() else {
                        continue;
                    };
                    let index = names.iter().position(|name| name == target).ok_or_else(|| {
                        FsmError::UnknownTarget {
                            state: state.name.clone(),
                            event: event.script_name(),
                            target: target.clone(),
                        }
                    })?;
                    call.args[0] = ActionArg::Const(ArgValue::Int(index as i32));
                }
            }
        }
        Ok(())
    }
}

/// Builder for engine-generated states, written the way a script would be.
#[derive(Debug, Default)]
pub struct EasyFsmCreator {
    states: Vec<MobState>,
    cur_event: Option<MobEventType>,
}

impl EasyFsmCreator {
    pub fn new_state(&mut self, name: &str) -> &mut Self {
        let mut state = MobState::new(name);
        state.id = self.states.len();
        self.states.push(state);
        self.cur_event = None;
        self
    }

    pub fn new_event(&mut self, event: MobEventType) -> &mut Self {
        if let Some(state) = self.states.last_mut() {
            state.events.entry(event).or_default();
            self.cur_event = Some(event);
        }
        self
    }

    pub fn run(&mut self, name: &'static str, runner: ActionRunner) -> &mut Self {
        if let Some(event) = self.cur_event {
            self.push(ActionCall::custom(name, runner, event));
        }
        self
    }

    pub fn change_state(&mut self, target: &str) -> &mut Self {
        if let Some(event) = self.cur_event {
            self.push(ActionCall::set_state(target, event));
        }
        self
    }

    fn push(&mut self, call: ActionCall) {
        let event = call.parent_event;
        if let Some(state) = self.states.last_mut() {
            state.events.entry(event).or_default().push(call);
        }
    }

    pub fn finish(self) -> Vec<MobState> {
        self.states
    }
}
