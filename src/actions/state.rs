use super::{ActionCall, ActionRegistry};
use crate::runtime::MenuRuntime;
use crate::value::{as_f32, as_i64, display_text, Value};

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("UpdateSettingBool", update_setting_bool);
    registry.register("UpdateSettingInt", update_setting_int);
    registry.register("UpdateSettingFloat", update_setting_float);
    registry.register("UpdateSettingString", update_setting_string);
    registry.register("SaveValue", save_value);
    registry.register("SetVariable", set_variable);
}

/// `[key, value?]`; a missing value toggles.
fn update_setting_bool(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(key) = params.str(0, "key") else {
        tracing::warn!("UpdateSettingBool needs a key");
        return;
    };
    let value = match params.bool(1, "value") {
        Some(value) => value,
        None => !runtime.services.settings.get_bool(key).unwrap_or(false),
    };
    runtime.services.settings.set(key, Value::Bool(value));
}

/// `[key, value, relative, min, max]`
fn update_setting_int(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let (Some(key), Some(value)) = (params.str(0, "key"), params.i64(1, "value")) else {
        tracing::warn!("UpdateSettingInt needs a key and an integer value");
        return;
    };
    let mut next = if params.bool(2, "relative").unwrap_or(false) {
        runtime.services.settings.get_int(key).unwrap_or(0).saturating_add(value)
    } else {
        value
    };
    if let Some(min) = params.i64(3, "min") {
        next = next.max(min);
    }
    if let Some(max) = params.i64(4, "max") {
        next = next.min(max);
    }
    runtime.services.settings.set(key, Value::from(next));
}

/// `[key, value, relative, min, max]`
fn update_setting_float(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let (Some(key), Some(value)) = (params.str(0, "key"), params.f32(1, "value")) else {
        tracing::warn!("UpdateSettingFloat needs a key and a numeric value");
        return;
    };
    let mut next = if params.bool(2, "relative").unwrap_or(false) {
        runtime.services.settings.get_float(key).unwrap_or(0.0) + value
    } else {
        value
    };
    if let Some(min) = params.f32(3, "min") {
        next = next.max(min);
    }
    if let Some(max) = params.f32(4, "max") {
        next = next.min(max);
    }
    runtime.services.settings.set(key, Value::from(next as f64));
}

fn update_setting_string(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let (Some(key), Some(value)) = (params.str(0, "key"), params.get(1, "value")) else {
        tracing::warn!("UpdateSettingString needs a key and a value");
        return;
    };
    runtime.services.settings.set(key, Value::String(display_text(value)));
}

/// `[key, value, relative, profile]`. Relative updates add numbers and
/// otherwise overwrite.
fn save_value(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let (Some(key), Some(value)) = (params.str(0, "key"), params.get(1, "value")) else {
        tracing::warn!("SaveValue needs a key and a value");
        return;
    };
    let profile = params
        .i64(3, "profile")
        .and_then(|profile| u32::try_from(profile).ok())
        .unwrap_or_else(|| runtime.services.saves.active_profile());
    let relative = params.bool(2, "relative").unwrap_or(false);
    let stored = if relative { runtime.services.saves.load(profile, key) } else { None };
    let next = match stored {
        Some(current) => add_values(&current, value).unwrap_or_else(|| value.clone()),
        None => value.clone(),
    };
    runtime.services.saves.save(profile, key, next);
}

fn add_values(current: &Value, delta: &Value) -> Option<Value> {
    if current.is_i64() && delta.is_i64() {
        return Some(Value::from(as_i64(current)?.saturating_add(as_i64(delta)?)));
    }
    let sum = as_f32(current)? + as_f32(delta)?;
    Some(Value::from(sum as f64))
}

/// `[name, value]`. Visible to every later resolution as `$name`.
fn set_variable(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(name) = params.str(0, "name").map(str::to_string) else {
        tracing::warn!("SetVariable needs a name");
        return;
    };
    let value = params.get(1, "value").cloned().unwrap_or(Value::Null);
    runtime.set_variable(&name, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn relative_save_values_add_numbers() {
        assert_eq!(add_values(&json!(3), &json!(4)), Some(json!(7)));
        assert_eq!(add_values(&json!(1.5), &json!(1)), Some(json!(2.5)));
        assert_eq!(add_values(&json!("a"), &json!(1)), None);
    }
}
