use std::fmt;

use super::action::{
    ActionArg, ActionLibrary, ActionRunData, ActionRunner, ActionType, ArgValue, ParamBinding,
    ParamKind, ResolvedArgs, ScriptLoadContext,
};
use super::events::MobEventType;
use super::runners;
use super::vars::ScriptVars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Library(ActionType),
    /// Built-in engine function, used by generated states.
    Custom(&'static str),
}

/// One bound statement inside an event's action sequence.
#[derive(Clone)]
pub struct ActionCall {
    pub kind: ActionKind,
    pub args: Vec<ActionArg>,
    pub parent_event: MobEventType,
    run: ActionRunner,
}

impl fmt::Debug for ActionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCall")
            .field("kind", &self.kind)
            .field("args", &self.args)
            .field("parent_event", &self.parent_event)
            .finish()
    }
}

impl ActionCall {
    pub fn library(
        action_type: ActionType,
        args: Vec<ActionArg>,
        parent_event: MobEventType,
        run: ActionRunner,
    ) -> Self {
        Self {
            kind: ActionKind::Library(action_type),
            args,
            parent_event,
            run,
        }
    }

    pub fn custom(name: &'static str, run: ActionRunner, parent_event: MobEventType) -> Self {
        Self {
            kind: ActionKind::Custom(name),
            args: Vec::new(),
            parent_event,
            run,
        }
    }

    /// Unresolved `set_state` call, bound to an index when the FSM is finalized.
    pub fn set_state(state: &str, parent_event: MobEventType) -> Self {
        Self::library(
            ActionType::SetState,
            vec![ActionArg::Const(ArgValue::Str(state.to_string()))],
            parent_event,
            runners::set_state,
        )
    }

    pub fn action_type(&self) -> Option<ActionType> {
        match self.kind {
            ActionKind::Library(action_type) => Some(action_type),
            ActionKind::Custom(_) => None,
        }
    }

    pub fn is(&self, action_type: ActionType) -> bool {
        self.action_type() == Some(action_type)
    }

    /// Reads variable references out of `vars`.
    pub fn resolve_args(&self, vars: &ScriptVars) -> ResolvedArgs {
        ResolvedArgs::new(
            self.args
                .iter()
                .map(|arg| match arg {
                    ActionArg::Const(value) => value.clone(),
                    ActionArg::Var { name, kind } => {
                        ArgValue::from_var_text(*kind, vars.get_str(name))
                    }
                })
                .collect(),
        )
    }

    pub(crate) fn run(&self, data: &mut ActionRunData<'_, '_>) {
        (self.run)(data);
    }
}

/// Binds one `action_name arg1 arg2 ...` statement against the library.
pub fn compile_statement(
    statement: &str,
    parent_event: MobEventType,
    library: &ActionLibrary,
    load_ctx: &ScriptLoadContext<'_>,
) -> Result<ActionCall, String> {
    let mut tokens = statement.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err("empty statement".to_string());
    };
    let Some(def) = library.find(name) else {
        return Err(format!("unknown action '{name}'"));
    };
    let tokens = tokens.collect::<Vec<_>>();

    let required = def.params.iter().filter(|param| !param.extras).count();
    let has_extras = def.params.iter().any(|param| param.extras);
    if tokens.len() < required {
        return Err(format!(
            "action '{}' needs {} argument(s), got {}",
            def.name,
            required,
            tokens.len()
        ));
    }
    if !has_extras && tokens.len() > required {
        return Err(format!(
            "action '{}' takes {} argument(s), got {}",
            def.name,
            required,
            tokens.len()
        ));
    }

    let mut args = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        let param = def.params.get(index.min(required)).copied();
        let Some(param) = param.or_else(|| def.params.last().copied()) else {
            return Err(format!("action '{}' takes no arguments", def.name));
        };
        args.push(bind_token(token, param.kind, param.binding).map_err(|reason| {
            format!("argument '{}' of '{}': {reason}", param.name, def.name)
        })?);
    }

    if let Some(loader) = def.loader {
        loader(&mut args, load_ctx).map_err(|reason| format!("{}: {reason}", def.name))?;
    }

    Ok(ActionCall::library(
        def.action_type,
        args,
        parent_event,
        def.run,
    ))
}

fn bind_token(token: &str, kind: ParamKind, binding: ParamBinding) -> Result<ActionArg, String> {
    match binding {
        ParamBinding::Const => ArgValue::parse_const(kind, token)
            .map(ActionArg::Const)
            .ok_or_else(|| format!("expected a constant {}, got '{token}'", kind.label())),
        ParamBinding::Free => {
            if let Some(name) = token.strip_prefix('$') {
                if name.is_empty() {
                    return Err("empty variable name".to_string());
                }
                return Ok(ActionArg::Var {
                    name: name.to_string(),
                    kind,
                });
            }
            Ok(match ArgValue::parse_const(kind, token) {
                Some(value) => ActionArg::Const(value),
                None => ActionArg::Var {
                    name: token.to_string(),
                    kind,
                },
            })
        }
    }
}

/// Checks `if`/`else`/`end_if` nesting over a whole sequence.
pub fn validate_control_flow(calls: &[ActionCall]) -> Result<(), String> {
    let mut tracker = ControlFlowTracker::default();
    for call in calls {
        tracker.push(call)?;
    }
    tracker.finish()
}

/// Incremental `if` pairing check used while a sequence is being built.
#[derive(Debug, Default)]
pub(crate) struct ControlFlowTracker {
    /// One entry per open `if`: whether its `else` was already seen.
    open: Vec<bool>,
}

impl ControlFlowTracker {
    pub(crate) fn push(&mut self, call: &ActionCall) -> Result<(), String> {
        match call.action_type() {
            Some(ActionType::If) => self.open.push(false),
            Some(ActionType::Else) => match self.open.last_mut() {
                Some(seen_else) if *seen_else => {
                    return Err("second 'else' for the same 'if'".to_string())
                }
                Some(seen_else) => *seen_else = true,
                None => return Err("'else' without a matching 'if'".to_string()),
            },
            Some(ActionType::EndIf) => {
                if self.open.pop().is_none() {
                    return Err("'end_if' without a matching 'if'".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn finish(&self) -> Result<(), String> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "{} 'if' statement(s) missing an 'end_if'",
                self.open.len()
            ))
        }
    }
}

/// Index just past the `else`/`end_if` that closes the `if` or `else` at `from`.
/// With `stop_at_else`, a same-depth `else` also ends the skip.
pub(crate) fn skip_branch(calls: &[ActionCall], from: usize, stop_at_else: bool) -> usize {
    let mut depth = 0usize;
    let mut index = from + 1;
    while let Some(call) = calls.get(index) {
        match call.action_type() {
            Some(ActionType::If) => depth += 1,
            Some(ActionType::Else) if depth == 0 && stop_at_else => return index + 1,
            Some(ActionType::EndIf) => {
                if depth == 0 {
                    return index + 1;
                }
                depth -= 1;
            }
            _ => {}
        }
        index += 1;
    }
    calls.len()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn compile_lines(lines: &[&str]) -> Result<Vec<ActionCall>, String> {
        let library = ActionLibrary::standard();
        let animations = vec!["idling".to_string()];
        let statuses = BTreeSet::new();
        let ctx = ScriptLoadContext {
            animations: &animations,
            reaches: &[],
            sounds: &[],
            spawns: &[],
            body_parts: &[],
            status_types: &statuses,
        };
        let mut tracker = ControlFlowTracker::default();
        let mut calls = Vec::new();
        for line in lines {
            let call = compile_statement(line, MobEventType::OnEnter, &library, &ctx)?;
            tracker.push(&call)?;
            calls.push(call);
        }
        tracker.finish()?;
        Ok(calls)
    }

    #[test]
    fn free_params_bind_constants_and_variables() {
        let calls = compile_lines(&["set_health 40", "set_health $hp", "set_health hp"])
            .expect("compile");
        assert_eq!(calls[0].args, vec![ActionArg::Const(ArgValue::Float(40.0))]);
        let as_var = ActionArg::Var {
            name: "hp".to_string(),
            kind: ParamKind::Float,
        };
        assert_eq!(calls[1].args, vec![as_var.clone()]);
        assert_eq!(calls[2].args, vec![as_var]);
    }

    #[test]
    fn const_params_must_parse_as_their_kind() {
        let err = bind_token("abc", ParamKind::Int, ParamBinding::Const).expect_err("int");
        assert!(err.contains("constant integer"));
        assert_eq!(
            bind_token("3", ParamKind::Int, ParamBinding::Const),
            Ok(ActionArg::Const(ArgValue::Int(3)))
        );
        let err = compile_lines(&["set_timer"]).expect_err("missing arg");
        assert!(err.contains("needs 1 argument"));
    }

    #[test]
    fn argument_count_is_checked() {
        let err = compile_lines(&["delete now"]).expect_err("too many");
        assert!(err.contains("takes 0 argument"));
        let err = compile_lines(&["move_to_absolute 1"]).expect_err("too few");
        assert!(err.contains("needs 2 argument"));
    }

    #[test]
    fn extras_consume_remaining_tokens() {
        let calls = compile_lines(&["start_particles smoke 1 2 $h"]).expect("compile");
        assert_eq!(calls[0].args.len(), 4);
        assert!(matches!(calls[0].args[3], ActionArg::Var { .. }));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = compile_lines(&["teleport_home"]).expect_err("unknown");
        assert!(err.contains("unknown action"));
    }

    #[test]
    fn unclosed_if_is_rejected() {
        let err = compile_lines(&["if health < 50", "set_health 1"]).expect_err("unclosed");
        assert!(err.contains("missing an 'end_if'"));
    }

    #[test]
    fn stray_else_and_end_if_are_rejected() {
        assert!(compile_lines(&["else"]).is_err());
        assert!(compile_lines(&["end_if"]).is_err());
        let err = compile_lines(&["if health < 1", "else", "else", "end_if"]).expect_err("else");
        assert!(err.contains("second 'else'"));
    }

    #[test]
    fn nested_ifs_pair_up() {
        let calls = compile_lines(&[
            "if health < 50",
            "if $angry = 1",
            "set_animation idling",
            "end_if",
            "else",
            "delete",
            "end_if",
        ])
        .expect("compile");
        assert!(validate_control_flow(&calls).is_ok());
        assert_eq!(skip_branch(&calls, 0, true), 5);
        assert_eq!(skip_branch(&calls, 4, false), 7);
        assert_eq!(skip_branch(&calls, 1, true), 4);
    }

    #[test]
    fn variables_resolve_with_defaults() {
        let calls = compile_lines(&["set_timer $delay"]).expect("compile");
        let mut vars = ScriptVars::default();
        assert_eq!(calls[0].resolve_args(&vars).float(0), 0.0);
        vars.set("delay", "2.5");
        assert_eq!(calls[0].resolve_args(&vars).float(0), 2.5);
    }
}
