//! Value Tree helpers.
//!
//! Menu documents are plain JSON; the tree is kept as [`serde_json::Value`]
//! (with insertion order preserved) and read through the accessors below.

use std::cmp::Ordering;

pub use serde_json::{Map, Value};

/// Positional-or-named parameter access.
///
/// `params` may be an array (fixed order declared by the handler) or an
/// object keyed by name. Both shapes resolve to the same parameter.
#[derive(Clone, Copy, Debug)]
pub struct Params<'a> {
    raw: Option<&'a Value>,
}

impl<'a> Params<'a> {
    pub fn new(raw: &'a Value) -> Self {
        match raw {
            Value::Null => Self { raw: None },
            other => Self { raw: Some(other) },
        }
    }

    pub fn empty() -> Self {
        Self { raw: None }
    }

    pub fn raw(&self) -> Option<&'a Value> {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        match self.raw {
            None => true,
            Some(Value::Array(items)) => items.is_empty(),
            Some(Value::Object(map)) => map.is_empty(),
            Some(_) => false,
        }
    }

    /// Parameter at `index` for array params, `name` for object params.
    ///
    /// A scalar `params` is treated as a one-element array.
    pub fn get(&self, index: usize, name: &str) -> Option<&'a Value> {
        match self.raw? {
            Value::Array(items) => items.get(index).filter(|value| !value.is_null()),
            Value::Object(map) => map.get(name).filter(|value| !value.is_null()),
            scalar if index == 0 => Some(scalar),
            _ => None,
        }
    }

    pub fn f32(&self, index: usize, name: &str) -> Option<f32> {
        self.get(index, name).and_then(as_f32)
    }

    pub fn i64(&self, index: usize, name: &str) -> Option<i64> {
        self.get(index, name).and_then(as_i64)
    }

    pub fn bool(&self, index: usize, name: &str) -> Option<bool> {
        self.get(index, name).and_then(as_bool)
    }

    pub fn str(&self, index: usize, name: &str) -> Option<&'a str> {
        self.get(index, name).and_then(Value::as_str)
    }

    /// Number of positional parameters, or named keys for object params.
    pub fn len(&self) -> usize {
        match self.raw {
            None => 0,
            Some(Value::Array(items)) => items.len(),
            Some(Value::Object(map)) => map.len(),
            Some(_) => 1,
        }
    }
}

pub fn as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(number) => number.as_f64().map(|v| v as f32),
        Value::String(text) => text.trim().parse::<f32>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|v| v.round() as i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Bool(flag) => Some(*flag as i64),
        _ => None,
    }
}

pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => number.as_f64().map(|v| v != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Text form used when a value is interpolated into a string.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

/// Numbers compare numerically (ints and floats mix), strings lexically.
/// Mismatched kinds are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            let (a, b) = (as_f64(a)?, as_f64(b)?);
            a.partial_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match compare_values(a, b) {
        Some(order) => order == Ordering::Equal,
        None => a == b,
    }
}

/// Reads a string field that may be stored under one of several aliases.
pub fn field_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_str))
}

pub fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key).filter(|value| !value.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn positional_and_named_params_agree() {
        let positional = json!(["title", "Hello"]);
        let named = json!({"id": "title", "text": "Hello"});
        for raw in [&positional, &named] {
            let params = Params::new(raw);
            assert_eq!(params.str(0, "id"), Some("title"));
            assert_eq!(params.str(1, "text"), Some("Hello"));
        }
    }

    #[test]
    fn missing_params_are_none() {
        let raw = json!(["only"]);
        let params = Params::new(&raw);
        assert!(params.get(1, "second").is_none());
        assert!(Params::empty().get(0, "anything").is_none());
    }

    #[test]
    fn numeric_comparison_mixes_ints_and_floats() {
        assert_eq!(compare_values(&json!(2), &json!(1.5)), Some(Ordering::Greater));
        assert!(values_equal(&json!(3), &json!(3.0)));
        assert!(compare_values(&json!("a"), &json!(true)).is_none());
    }

    #[test]
    fn bool_coercion_accepts_common_spellings() {
        assert_eq!(as_bool(&json!("on")), Some(true));
        assert_eq!(as_bool(&json!(0)), Some(false));
        assert_eq!(as_bool(&json!("maybe")), None);
    }
}
