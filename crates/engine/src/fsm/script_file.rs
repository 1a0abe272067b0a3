//! Reads `script.xml`: a first state name plus states, each binding events to
//! one statement per line.

use std::path::Path;

use roxmltree::Node;

use crate::content::document::{
    parse_xml, read_text, ContentErrorCode, ContentLoadError, SourceLocation, XmlSource,
};
use crate::script::{
    compile_statement, ActionLibrary, ControlFlowTracker, MobEventType, ScriptLoadContext,
};

use super::definition::MobState;

/// Authored states before generated states are appended and names resolved.
#[derive(Debug, Default)]
pub struct ParsedScript {
    pub first_state: Option<String>,
    pub states: Vec<MobState>,
}

pub(crate) fn load_script_file(
    pack: &str,
    path: &Path,
    library: &ActionLibrary,
    load_ctx: &ScriptLoadContext<'_>,
) -> Result<ParsedScript, ContentLoadError> {
    let raw = read_text(pack, path)?;
    let doc = parse_xml(pack, path, &raw)?;
    let source = XmlSource {
        pack,
        path,
        doc: &doc,
    };
    let root = source.expect_root("MobScript")?;

    let mut parsed = ParsedScript::default();
    for field in source.unique_fields(root)? {
        match field.tag_name().name() {
            "firstState" => parsed.first_state = Some(source.required_text(field)?),
            "script" => parsed.states = load_states(&source, field, library, load_ctx)?,
            _ => return Err(source.unknown_field(field)),
        }
    }
    Ok(parsed)
}

fn load_states(
    source: &XmlSource<'_, '_>,
    script: Node<'_, '_>,
    library: &ActionLibrary,
    load_ctx: &ScriptLoadContext<'_>,
) -> Result<Vec<MobState>, ContentLoadError> {
    let mut states: Vec<MobState> = Vec::new();
    for state_node in script.children().filter(|child| child.is_element()) {
        if state_node.tag_name().name() != "state" {
            return Err(source.unknown_field(state_node));
        }
        let name = source.required_attr(state_node, "name")?;
        if states.iter().any(|state| state.name == name) {
            return Err(source.error_at(
                ContentErrorCode::DuplicateField,
                format!("state '{name}' is defined more than once"),
                state_node,
            ));
        }

        let mut state = MobState::new(&name);
        state.id = states.len();
        for event_node in state_node.children().filter(|child| child.is_element()) {
            if event_node.tag_name().name() != "event" {
                return Err(source.unknown_field(event_node));
            }
            let event_name = source.required_attr(event_node, "name")?;
            let Some(event) = MobEventType::from_script_name(&event_name) else {
                return Err(source.error_at(
                    ContentErrorCode::Script,
                    format!("state '{name}': unknown event '{event_name}'"),
                    event_node,
                ));
            };
            if state.events.contains_key(&event) {
                return Err(source.error_at(
                    ContentErrorCode::DuplicateField,
                    format!("state '{name}': event '{event_name}' is bound more than once"),
                    event_node,
                ));
            }
            let calls = compile_event(source, &name, event, event_node, library, load_ctx)?;
            state.events.insert(event, calls);
        }
        states.push(state);
    }
    Ok(states)
}

fn compile_event(
    source: &XmlSource<'_, '_>,
    state_name: &str,
    event: MobEventType,
    event_node: Node<'_, '_>,
    library: &ActionLibrary,
    load_ctx: &ScriptLoadContext<'_>,
) -> Result<Vec<crate::script::ActionCall>, ContentLoadError> {
    let text_node = event_node.first_child().filter(|child| child.is_text());
    let base = text_node
        .map(|node| source.location_of(node))
        .unwrap_or_else(|| source.location_of(event_node));
    let text = text_node.and_then(|node| node.text()).unwrap_or_default();

    let script_error = |line_offset: usize, message: String| ContentLoadError {
        code: ContentErrorCode::Script,
        message: format!(
            "state '{state_name}', event '{}': {message}",
            event.script_name()
        ),
        pack: source.pack.to_string(),
        file_path: source.path.to_path_buf(),
        location: Some(SourceLocation {
            line: base.line + line_offset,
            column: 1,
        }),
    };

    let mut tracker = ControlFlowTracker::default();
    let mut calls = Vec::new();
    let mut last_line = 0;
    for (offset, line) in text.lines().enumerate() {
        let statement = line.trim();
        if statement.is_empty() || statement.starts_with('#') {
            continue;
        }
        last_line = offset;
        let call = compile_statement(statement, event, library, load_ctx)
            .map_err(|reason| script_error(offset, format!("{reason} in '{statement}'")))?;
        tracker
            .push(&call)
            .map_err(|reason| script_error(offset, reason))?;
        calls.push(call);
    }
    tracker
        .finish()
        .map_err(|reason| script_error(last_line, reason))?;
    Ok(calls)
}
