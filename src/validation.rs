//! Static checks for menu documents, used by the `menu_check` binary.
//!
//! Checks run on the raw document so that names the parser would silently
//! drop (unknown element types, action or predicate names) are still seen.

use crate::action::Action;
use crate::actions::ActionRegistry;
use crate::predicate::Condition;
use crate::resolve::{Vocabulary, FUNC_KEY};
use crate::value::{field, field_str, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ValidationEvent {
    pub severity: Severity,
    pub path: PathBuf,
    pub message: String,
}

const ELEMENT_TYPES: &[&str] = &["image", "sprite", "rect", "panel", "text", "label", "button", "event", "group"];
const ACTION_KEYS: &[&str] =
    &["action", "actions", "click", "on_click", "on_complete", "on_select", "on_deselect", "spawn_action", "exit_func", "exit", "event"];
const CONDITION_KEYS: &[&str] = &["guard", "condition", "conditions", "spawn_condition"];

pub struct MenuValidator {
    actions: ActionRegistry,
    vocabulary: Vocabulary,
}

impl Default for MenuValidator {
    fn default() -> Self {
        Self { actions: ActionRegistry::default(), vocabulary: Vocabulary::default() }
    }
}

/// Facts collected while walking one document.
#[derive(Default)]
struct Survey {
    ids: BTreeMap<String, usize>,
    selections: BTreeMap<(i64, i64), Vec<String>>,
    parents: BTreeSet<String>,
    layout_refs: BTreeSet<String>,
    unknown_types: BTreeSet<String>,
    elements: usize,
}

impl MenuValidator {
    pub fn new(actions: ActionRegistry, vocabulary: Vocabulary) -> Self {
        Self { actions, vocabulary }
    }

    pub fn validate_path(&self, path: &Path) -> Vec<ValidationEvent> {
        if !path.exists() {
            return vec![event(path, Severity::Warning, "File not found (it may have been removed).")];
        }
        match fs::read_to_string(path) {
            Ok(text) => self.validate_str(path, &text),
            Err(err) => vec![event(path, Severity::Error, format!("Failed to read menu: {err}"))],
        }
    }

    pub fn validate_str(&self, path: &Path, text: &str) -> Vec<ValidationEvent> {
        let document: Value = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(err) => return vec![event(path, Severity::Error, format!("Invalid JSON: {err}"))],
        };
        let Some(map) = document.as_object() else {
            return vec![event(path, Severity::Error, "Menu document must be a JSON object.")];
        };
        let mut events = Vec::new();
        let mut survey = Survey::default();
        if let Some(elements) = map.get("elements") {
            survey_elements(elements, &mut survey, false);
        } else {
            events.push(event(path, Severity::Warning, "Menu declares no elements."));
        }
        let layouts = layout_names(map);

        for kind in &survey.unknown_types {
            events.push(event(path, Severity::Warning, format!("Unknown element type '{kind}'.")));
        }
        for (id, count) in survey.ids.iter().filter(|(_, count)| **count > 1) {
            events.push(event(path, Severity::Warning, format!("Element id '{id}' is used {count} times.")));
        }
        for ((x, y), ids) in survey.selections.iter().filter(|(_, ids)| ids.len() > 1) {
            events.push(event(
                path,
                Severity::Warning,
                format!("Buttons {} share selection ({x}, {y}).", ids.join(", ")),
            ));
        }
        for parent in survey.parents.iter().filter(|parent| !survey.ids.contains_key(*parent)) {
            events.push(event(path, Severity::Warning, format!("Parent element '{parent}' is never declared.")));
        }
        for layout in survey.layout_refs.iter().filter(|layout| !layouts.contains(*layout)) {
            events.push(event(path, Severity::Warning, format!("Layout '{layout}' is never declared.")));
        }

        let mut names = Vocabularies::default();
        collect_names(&document, None, &mut names);
        for name in names.actions.iter().filter(|name| !self.actions.contains(name)) {
            events.push(event(path, Severity::Error, format!("Unknown action '{name}'.")));
        }
        for name in names.predicates.iter().filter(|name| !self.vocabulary.predicates.contains(name)) {
            events.push(event(path, Severity::Error, format!("Unknown predicate '{name}'.")));
        }
        for name in names.functions.iter().filter(|name| !self.vocabulary.functions.contains(name)) {
            events.push(event(path, Severity::Warning, format!("Unknown variable function '{name}'.")));
        }

        let id = field_str(map, &["id"]).unwrap_or("<unnamed>");
        events.push(event(
            path,
            Severity::Info,
            format!("Menu '{id}': {} elements, {} layouts", survey.elements, layouts.len()),
        ));
        events
    }
}

fn event(path: &Path, severity: Severity, message: impl Into<String>) -> ValidationEvent {
    ValidationEvent { severity, path: path.to_path_buf(), message: message.into() }
}

/// Names containing references or interpolation are only known at runtime.
fn literal(text: &str) -> Option<&str> {
    (!text.starts_with('$') && !text.contains("${")).then_some(text)
}

fn survey_elements(node: &Value, survey: &mut Survey, templated: bool) {
    let map = match node {
        Value::Array(items) => {
            for item in items {
                survey_elements(item, survey, templated);
            }
            return;
        }
        Value::Object(map) => map,
        _ => return,
    };
    if map.contains_key("for") {
        if let Some(body) = field(map, &["elements", "body", "children"]) {
            survey_elements(body, survey, true);
        }
        return;
    }
    if map.contains_key("prefab") {
        survey.elements += 1;
        return;
    }
    let Some(kind) = field_str(map, &["type", "kind"]).and_then(literal) else {
        return;
    };
    let kind = kind.to_ascii_lowercase();
    if !ELEMENT_TYPES.contains(&kind.as_str()) {
        survey.unknown_types.insert(kind);
        return;
    }
    if kind == "group" {
        if let Some(children) = field(map, &["elements", "children"]) {
            survey_elements(children, survey, templated);
        }
        return;
    }
    survey.elements += 1;
    let repeated = templated || map.contains_key("loop");
    let id = field_str(map, &["id"]).and_then(literal);
    if let Some(id) = id {
        *survey.ids.entry(id.to_string()).or_default() += 1;
    }
    if let Some(parent) = field_str(map, &["parent"]).and_then(literal) {
        survey.parents.insert(parent.to_string());
    }
    if let Some(layout) = field_str(map, &["parentLayout", "parent_layout", "layout"]).and_then(literal) {
        survey.layout_refs.insert(layout.to_string());
    }
    if kind == "button" && !repeated {
        let selection = field(map, &["selection", "select", "selection_position"]).and_then(|value| match value {
            Value::Array(items) if items.len() >= 2 => Some((items[0].as_i64()?, items[1].as_i64()?)),
            _ => None,
        });
        if let Some(selection) = selection {
            survey.selections.entry(selection).or_default().push(id.unwrap_or("button").to_string());
        }
    }
}

fn layout_names(map: &Map<String, Value>) -> BTreeSet<String> {
    match map.get("layouts") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().and_then(|layout| field_str(layout, &["name", "id"])))
            .map(str::to_string)
            .collect(),
        Some(Value::Object(layouts)) => layouts.keys().cloned().collect(),
        _ => BTreeSet::new(),
    }
}

#[derive(Default)]
struct Vocabularies {
    actions: BTreeSet<String>,
    predicates: BTreeSet<String>,
    functions: BTreeSet<String>,
}

/// Walks the whole tree. Objects under action keys are actions, under
/// condition keys conditions, and `$func` objects are variable functions.
fn collect_names(node: &Value, role: Option<Role>, names: &mut Vocabularies) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_names(item, role, names);
            }
        }
        Value::Object(map) => {
            if let Some(function) = map.get(FUNC_KEY).and_then(Value::as_str).and_then(literal) {
                names.functions.insert(function.to_string());
            }
            match role {
                Some(Role::Action) => {
                    if let Some(action) = Action::from_value(node) {
                        if let Some(name) = literal(&action.name) {
                            names.actions.insert(name.to_string());
                        }
                    }
                }
                Some(Role::Condition) => {
                    if let Some(condition) = Condition::from_value(node) {
                        if let Some(name) = literal(&condition.name) {
                            names.predicates.insert(name.to_string());
                        }
                    }
                }
                None => {}
            }
            for (key, value) in map {
                let child = if ACTION_KEYS.contains(&key.as_str()) {
                    Some(Role::Action)
                } else if CONDITION_KEYS.contains(&key.as_str()) {
                    Some(Role::Condition)
                } else {
                    None
                };
                collect_names(value, child, names);
            }
        }
        _ => {}
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Action,
    Condition,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> Vec<ValidationEvent> {
        MenuValidator::default().validate_str(Path::new("menu.json"), text)
    }

    fn messages(events: &[ValidationEvent], severity: Severity) -> Vec<String> {
        events.iter().filter(|event| event.severity == severity).map(|event| event.message.clone()).collect()
    }

    #[test]
    fn severity_display_formats() {
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn reports_invalid_json() {
        let events = check("{ not json");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Error);
    }

    #[test]
    fn reports_missing_file() {
        let events = MenuValidator::default().validate_path(Path::new("nowhere/menu.json"));
        assert_eq!(events[0].severity, Severity::Warning);
        assert!(events[0].message.contains("not found"));
    }

    #[test]
    fn clean_document_only_reports_summary() {
        let events = check(
            r#"{"id": "main", "layouts": [{"name": "list", "type": "vertical"}],
                "elements": [
                  {"type": "text", "id": "title", "text": "Hi"},
                  {"type": "button", "id": "play", "layout": "list", "selection": [0, 0],
                   "click": {"name": "OpenMenu", "params": ["songs"],
                             "guard": {"name": "GetSettingBool", "params": ["ready"]}}}
                ]}"#,
        );
        assert!(messages(&events, Severity::Warning).is_empty(), "{events:?}");
        assert!(messages(&events, Severity::Error).is_empty(), "{events:?}");
        assert_eq!(messages(&events, Severity::Info), vec!["Menu 'main': 2 elements, 1 layouts".to_string()]);
    }

    #[test]
    fn flags_unknown_names_and_references() {
        let events = check(
            r#"{"elements": [
                  {"type": "hologram", "id": "x"},
                  {"type": "button", "id": "a", "selection": [0, 0], "parent": "ghost",
                   "click": {"name": "Teleport", "guard": {"name": "IsFullMoon"}}},
                  {"type": "button", "id": "a", "selection": [0, 0], "layout": "missing"}
                ]}"#,
        );
        let warnings = messages(&events, Severity::Warning);
        assert!(warnings.iter().any(|m| m.contains("hologram")));
        assert!(warnings.iter().any(|m| m.contains("'a' is used 2 times")));
        assert!(warnings.iter().any(|m| m.contains("share selection (0, 0)")));
        assert!(warnings.iter().any(|m| m.contains("'ghost'")));
        assert!(warnings.iter().any(|m| m.contains("'missing'")));
        let errors = messages(&events, Severity::Error);
        assert!(errors.contains(&"Unknown action 'Teleport'.".to_string()));
        assert!(errors.contains(&"Unknown predicate 'IsFullMoon'.".to_string()));
    }

    #[test]
    fn templated_buttons_are_not_duplicates() {
        let events = check(
            r#"{"elements": [{"for": "i", "count": 3, "elements":
                  [{"type": "button", "id": "b${i}", "selection": [0, 0]}]}]}"#,
        );
        assert!(messages(&events, Severity::Warning).is_empty(), "{events:?}");
    }
}
