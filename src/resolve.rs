//! Variable and expression resolution.
//!
//! A `"$name"` string is a reference into the active [`VariableScope`],
//! `"${name}"` inside a longer string is interpolated, and an object with a
//! `"$func"` key is a variable function evaluated against live state.
//! Everything else resolves to itself.

use crate::actions::DeferredSlots;
use crate::predicate::{ConditionSet, PredicateRegistry};
use crate::scope::VariableScope;
use crate::services::Services;
use crate::stage::{ElementKey, Stage};
use crate::value::{display_text, Map, Params, Value};
use rand::Rng;
use std::collections::HashMap;

pub const FUNC_KEY: &str = "$func";

/// Keys whose subtrees hold actions, conditions or element nodes. Variable
/// functions under them stay unevaluated until they run or are parsed.
pub const LAZY_KEYS: &[&str] = &[
    "action",
    "actions",
    "click",
    "on_click",
    "on_complete",
    "on_select",
    "on_deselect",
    "guard",
    "condition",
    "conditions",
    "spawn_condition",
    "spawn_action",
    "exit_func",
    "element",
    "elements",
];

pub type VariableFn = fn(&Query<'_>, &Params<'_>) -> Value;

/// Name → variable function table.
pub struct FunctionRegistry {
    functions: HashMap<String, VariableFn>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self { functions: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, function: VariableFn) {
        self.functions.insert(name.into(), function);
    }

    pub fn get(&self, name: &str) -> Option<VariableFn> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("GetSettingBool", fn_setting_bool);
        registry.register("GetSettingInt", fn_setting_int);
        registry.register("GetSettingFloat", fn_setting_float);
        registry.register("GetSettingString", fn_setting_string);
        registry.register("GetSaveValue", fn_save_value);
        registry.register("Counter", fn_counter);
        registry.register("Collection", fn_collection);
        registry.register("Condition", fn_condition);
        registry.register("Add", fn_add);
        registry.register("Multiply", fn_multiply);
        registry.register("Concat", fn_concat);
        registry.register("If", fn_if);
        registry.register("Length", fn_length);
        registry.register("RandomInt", fn_random_int);
        registry.register("RandomChoice", fn_random_choice);
        registry.register("ElementText", fn_element_text);
        registry.register("SceneName", fn_scene_name);
        registry
    }
}

/// Predicate and variable-function tables shared by the resolver, the
/// predicate evaluator and the dispatcher.
#[derive(Default)]
pub struct Vocabulary {
    pub predicates: PredicateRegistry,
    pub functions: FunctionRegistry,
}

/// Read-only view of everything resolution and predicates may consult.
#[derive(Clone, Copy)]
pub struct Query<'a> {
    pub vocabulary: &'a Vocabulary,
    pub services: &'a Services,
    pub stage: &'a Stage,
    pub scope: &'a VariableScope,
    pub menu_id: Option<&'a str>,
    pub context: Option<ElementKey>,
}

impl<'a> Query<'a> {
    pub fn with_scope<'b>(&self, scope: &'b VariableScope) -> Query<'b>
    where
        'a: 'b,
    {
        Query {
            vocabulary: self.vocabulary,
            services: self.services,
            stage: self.stage,
            scope,
            menu_id: self.menu_id,
            context: self.context,
        }
    }

    /// Resolves one node without descending into containers.
    pub fn resolve(&self, node: &Value) -> Value {
        match node {
            Value::String(text) => self.resolve_string(text, false),
            Value::Object(map) if map.contains_key(FUNC_KEY) => self.call_function(map),
            other => other.clone(),
        }
    }

    /// Resolves every reference and function in a tree. With `lazy` set,
    /// functions are kept and unresolved references stay as written so they
    /// can be resolved again at execution time.
    pub fn resolve_deep(&self, node: &Value, lazy: bool) -> Value {
        match node {
            Value::String(text) => self.resolve_string(text, lazy),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.resolve_deep(item, lazy)).collect()),
            Value::Object(map) if map.contains_key(FUNC_KEY) => {
                if lazy {
                    Value::Object(self.resolve_map(map, true))
                } else {
                    self.call_function(map)
                }
            }
            Value::Object(map) => Value::Object(self.resolve_map(map, lazy)),
            other => other.clone(),
        }
    }

    /// Resolves an action's parameters. Positional slots in `deferred`
    /// get the same lazy treatment as a named action key.
    pub fn resolve_params(&self, params: &Value, deferred: DeferredSlots) -> Value {
        match (params, deferred) {
            (_, DeferredSlots::None) => self.resolve_deep(params, false),
            (_, DeferredSlots::All) => self.resolve_deep(params, true),
            (Value::Array(items), slots) => Value::Array(
                items.iter().enumerate().map(|(index, item)| self.resolve_deep(item, slots.contains(index))).collect(),
            ),
            (other, _) => self.resolve_deep(other, false),
        }
    }

    fn resolve_map(&self, map: &Map<String, Value>, lazy: bool) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let lazy = lazy || LAZY_KEYS.contains(&key.as_str());
                (key.clone(), self.resolve_deep(value, lazy))
            })
            .collect()
    }

    fn resolve_string(&self, text: &str, lazy: bool) -> Value {
        if let Some(name) = reference_name(text) {
            return match self.scope.get(name) {
                Some(value) => value.clone(),
                None if lazy => Value::String(text.to_string()),
                None => Value::Null,
            };
        }
        if !text.contains("${") {
            return Value::String(text.to_string());
        }
        Value::String(self.interpolate(text, lazy))
    }

    fn interpolate(&self, text: &str, lazy: bool) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match self.scope.get(name) {
                Some(value) => out.push_str(&display_text(value)),
                None if lazy => {
                    out.push_str("${");
                    out.push_str(name);
                    out.push('}');
                }
                None => {}
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn call_function(&self, map: &Map<String, Value>) -> Value {
        let Some(name) = map.get(FUNC_KEY).and_then(Value::as_str) else {
            return Value::Null;
        };
        let Some(function) = self.vocabulary.functions.get(name) else {
            tracing::warn!("unknown variable function '{name}'");
            return Value::Null;
        };
        let raw = map.get("params").or_else(|| map.get("settings")).cloned().unwrap_or(Value::Null);
        let resolved = self.resolve_deep(&raw, false);
        function(self, &Params::new(&resolved))
    }

    pub fn evaluate(&self, conditions: &ConditionSet) -> bool {
        conditions.evaluate(self)
    }
}

/// `"$name"` → `Some("name")` when the whole string is a reference.
pub fn reference_name(text: &str) -> Option<&str> {
    let name = text.strip_prefix('$')?;
    if name.is_empty() || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') {
        return None;
    }
    Some(name)
}

fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn or_default(value: Option<Value>, params: &Params<'_>, index: usize) -> Value {
    value.or_else(|| params.get(index, "default").cloned()).unwrap_or(Value::Null)
}

fn fn_setting_bool(query: &Query<'_>, params: &Params<'_>) -> Value {
    let Some(key) = params.str(0, "key") else { return Value::Null };
    or_default(query.services.settings.get_bool(key).map(Value::from), params, 1)
}

fn fn_setting_int(query: &Query<'_>, params: &Params<'_>) -> Value {
    let Some(key) = params.str(0, "key") else { return Value::Null };
    or_default(query.services.settings.get_int(key).map(Value::from), params, 1)
}

fn fn_setting_float(query: &Query<'_>, params: &Params<'_>) -> Value {
    let Some(key) = params.str(0, "key") else { return Value::Null };
    or_default(query.services.settings.get_float(key).map(|v| Value::from(v as f64)), params, 1)
}

fn fn_setting_string(query: &Query<'_>, params: &Params<'_>) -> Value {
    let Some(key) = params.str(0, "key") else { return Value::Null };
    or_default(query.services.settings.get_string(key).map(Value::from), params, 1)
}

fn fn_save_value(query: &Query<'_>, params: &Params<'_>) -> Value {
    let Some(key) = params.str(0, "key") else { return Value::Null };
    let profile = params
        .i64(1, "profile")
        .map(|p| p.max(0) as u32)
        .unwrap_or_else(|| query.services.saves.active_profile());
    or_default(query.services.saves.load(profile, key), params, 2)
}

fn fn_counter(query: &Query<'_>, params: &Params<'_>) -> Value {
    params
        .str(0, "name")
        .and_then(|name| query.services.session.counter(name))
        .map(Value::from)
        .unwrap_or(Value::Null)
}

fn fn_collection(query: &Query<'_>, params: &Params<'_>) -> Value {
    params
        .str(0, "name")
        .and_then(|name| query.services.session.collection(name))
        .map(Value::Array)
        .unwrap_or(Value::Null)
}

fn fn_condition(query: &Query<'_>, params: &Params<'_>) -> Value {
    let node = match params.raw() {
        Some(Value::Array(items)) if items.len() == 1 => &items[0],
        Some(other) => other,
        None => return Value::Bool(true),
    };
    Value::Bool(ConditionSet::from_value(node).evaluate(query))
}

fn fn_add(_query: &Query<'_>, params: &Params<'_>) -> Value {
    let (Some(a), Some(b)) = (params.get(0, "a"), params.get(1, "b")) else {
        return Value::Null;
    };
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => number(a + b),
        _ => Value::String(format!("{}{}", display_text(a), display_text(b))),
    }
}

fn fn_multiply(_query: &Query<'_>, params: &Params<'_>) -> Value {
    match (params.get(0, "a").and_then(Value::as_f64), params.get(1, "b").and_then(Value::as_f64)) {
        (Some(a), Some(b)) => number(a * b),
        _ => Value::Null,
    }
}

fn fn_concat(_query: &Query<'_>, params: &Params<'_>) -> Value {
    let text = match params.raw() {
        Some(Value::Array(items)) => items.iter().map(display_text).collect::<String>(),
        Some(Value::Object(map)) => map.values().map(display_text).collect::<String>(),
        Some(other) => display_text(other),
        None => String::new(),
    };
    Value::String(text)
}

fn fn_if(query: &Query<'_>, params: &Params<'_>) -> Value {
    let condition = params.get(0, "condition").map(ConditionSet::from_value).unwrap_or_default();
    let branch = if condition.evaluate(query) { params.get(1, "then") } else { params.get(2, "else") };
    branch.cloned().unwrap_or(Value::Null)
}

fn fn_length(_query: &Query<'_>, params: &Params<'_>) -> Value {
    match params.get(0, "value") {
        Some(Value::Array(items)) => Value::from(items.len()),
        Some(Value::String(text)) => Value::from(text.chars().count()),
        Some(Value::Object(map)) => Value::from(map.len()),
        _ => Value::from(0),
    }
}

fn fn_random_int(_query: &Query<'_>, params: &Params<'_>) -> Value {
    let (Some(min), Some(max)) = (params.i64(0, "min"), params.i64(1, "max")) else {
        return Value::Null;
    };
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    Value::from(rand::thread_rng().gen_range(low..=high))
}

fn fn_random_choice(_query: &Query<'_>, params: &Params<'_>) -> Value {
    let items = match params.raw() {
        Some(Value::Array(items)) if items.len() == 1 && items[0].is_array() => items[0].as_array(),
        Some(Value::Array(items)) => Some(items),
        Some(Value::Object(map)) => map.get("values").and_then(Value::as_array),
        _ => None,
    };
    match items {
        Some(items) if !items.is_empty() => items[rand::thread_rng().gen_range(0..items.len())].clone(),
        _ => Value::Null,
    }
}

fn fn_element_text(query: &Query<'_>, params: &Params<'_>) -> Value {
    params
        .str(0, "id")
        .and_then(|id| query.stage.find(id))
        .and_then(|key| query.stage.get(key))
        .map(|element| Value::String(element.text.clone()))
        .unwrap_or(Value::Null)
}

fn fn_scene_name(query: &Query<'_>, _params: &Params<'_>) -> Value {
    Value::String(query.services.host.current_scene().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SessionState;
    use serde_json::json;

    struct Fixture {
        vocabulary: Vocabulary,
        services: Services,
        stage: Stage,
    }

    impl Fixture {
        fn new() -> Self {
            let session = SessionState::default()
                .with_counter("player_count", 2)
                .with_collection("songs", vec![json!("intro"), json!("finale")]);
            let mut services = Services::headless().with_session(session);
            services.settings.set("volume", json!(8));
            Self { vocabulary: Vocabulary::default(), services, stage: Stage::default() }
        }

        fn query<'a>(&'a self, scope: &'a VariableScope) -> Query<'a> {
            Query {
                vocabulary: &self.vocabulary,
                services: &self.services,
                stage: &self.stage,
                scope,
                menu_id: None,
                context: None,
            }
        }
    }

    #[test]
    fn deferred_slots_keep_their_functions() {
        let fixture = Fixture::new();
        let scope = VariableScope::new();
        let query = fixture.query(&scope);
        let volume = json!({"$func": "GetSettingInt", "params": ["volume"]});
        let params = json!([volume.clone(), {"name": "Log", "params": [volume.clone()]}]);
        let resolved = query.resolve_params(&params, DeferredSlots::At(&[1]));
        assert_eq!(resolved[0], json!(8));
        assert_eq!(resolved[1]["params"][0], volume);
        assert_eq!(query.resolve_params(&params, DeferredSlots::None)[1]["params"][0], json!(8));
    }

    #[test]
    fn scalars_resolve_to_themselves() {
        let fixture = Fixture::new();
        let scope = VariableScope::with_bindings([("x", json!(1))]);
        let query = fixture.query(&scope);
        for scalar in [json!(3), json!(2.5), json!("plain"), json!(true), Value::Null] {
            assert_eq!(query.resolve(&scalar), scalar);
            assert_eq!(query.resolve(&query.resolve(&scalar)), scalar);
        }
    }

    #[test]
    fn references_and_interpolation() {
        let fixture = Fixture::new();
        let scope = VariableScope::with_bindings([("name", json!("Ava")), ("count", json!(3))]);
        let query = fixture.query(&scope);
        assert_eq!(query.resolve(&json!("$count")), json!(3));
        assert_eq!(query.resolve(&json!("Hi ${name} x${count}")), json!("Hi Ava x3"));
        assert_eq!(query.resolve(&json!("$missing")), Value::Null);
        assert_eq!(query.resolve(&json!("[${missing}]")), json!("[]"));
    }

    #[test]
    fn functions_read_live_state() {
        let fixture = Fixture::new();
        let scope = VariableScope::new();
        let query = fixture.query(&scope);
        assert_eq!(query.resolve(&json!({"$func": "GetSettingInt", "params": ["volume"]})), json!(8));
        assert_eq!(query.resolve(&json!({"$func": "GetSettingInt", "params": ["nope", 5]})), json!(5));
        assert_eq!(query.resolve(&json!({"$func": "Counter", "params": ["player_count"]})), json!(2));
        assert_eq!(
            query.resolve(&json!({"$func": "Add", "params": [{"$func": "Counter", "params": ["player_count"]}, 1]})),
            json!(3)
        );
        assert_eq!(query.resolve(&json!({"$func": "Unknown"})), Value::Null);
    }

    #[test]
    fn lazy_mode_keeps_functions_under_action_keys() {
        let fixture = Fixture::new();
        let scope = VariableScope::with_bindings([("target", json!("title"))]);
        let query = fixture.query(&scope);
        let node = json!({
            "text": {"$func": "GetSettingInt", "params": ["volume"]},
            "click": {"name": "SetText", "params": ["$target", {"$func": "GetSettingInt", "params": ["volume"]}, "$later"]}
        });
        let resolved = query.resolve_deep(&node, false);
        assert_eq!(resolved["text"], json!(8));
        assert_eq!(resolved["click"]["params"][0], json!("title"));
        assert!(resolved["click"]["params"][1].get(FUNC_KEY).is_some());
        assert_eq!(resolved["click"]["params"][2], json!("$later"));
    }

    #[test]
    fn random_int_stays_in_range() {
        let fixture = Fixture::new();
        let scope = VariableScope::new();
        let query = fixture.query(&scope);
        for _ in 0..32 {
            let value = query.resolve(&json!({"$func": "RandomInt", "params": [3, 5]}));
            let n = value.as_i64().expect("int");
            assert!((3..=5).contains(&n));
        }
    }
}
