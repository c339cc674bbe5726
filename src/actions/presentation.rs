use super::{ActionCall, ActionRegistry, DeferredSlots};
use crate::descriptor::ParentRef;
use crate::parse::{ivec2, parse_color};
use crate::runtime::MenuRuntime;
use crate::stage::ElementKey;
use crate::value::{as_i64, display_text, Value};
use glam::{IVec2, Vec2};

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("SetText", set_text);
    registry.register("SetColor", set_color);
    registry.register("SetOpacity", set_opacity);
    registry.register("SetElementActive", set_element_active);
    registry.register_deferred("AddElement", add_element, DeferredSlots::At(&[0]));
    registry.register("RemoveElement", remove_element);
    registry.register("ScrollLayout", scroll_layout);
    registry.register("Select", select);
}

/// Element named by the `id` parameter, or the calling element.
fn target(runtime: &MenuRuntime, call: &ActionCall<'_>) -> Option<ElementKey> {
    let id = call.params().str(0, "id");
    let key = runtime.target(id, call.context);
    if key.is_none() {
        tracing::debug!("{}: no element {}", call.name, id.unwrap_or("in context"));
    }
    key
}

/// `[id, text]`
fn set_text(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(key) = target(runtime, call) else {
        return;
    };
    let text = call.params().get(1, "text").map(display_text).unwrap_or_default();
    runtime.set_text(key, text);
}

/// `[id, color]` where color is a theme slot, a hex string or an RGBA array.
fn set_color(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(key) = target(runtime, call) else {
        return;
    };
    let color = match call.params().get(1, "color") {
        Some(value @ Value::Number(_)) => {
            as_i64(value).map(|slot| runtime.theme_slot(slot.max(0) as usize))
        }
        Some(value) => parse_color(value),
        None => None,
    };
    match color {
        Some(color) => {
            runtime.set_color(key, color);
        }
        None => tracing::warn!("SetColor: unreadable color {}", call.params),
    }
}

/// `[id, opacity]`
fn set_opacity(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(key) = target(runtime, call) else {
        return;
    };
    let Some(opacity) = call.params().f32(1, "opacity").or_else(|| call.params().f32(1, "value")) else {
        tracing::warn!("SetOpacity needs a value");
        return;
    };
    runtime.set_opacity(key, opacity);
}

/// `[id, active?]`; a missing flag toggles.
fn set_element_active(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(key) = target(runtime, call) else {
        return;
    };
    let active = match call.params().bool(1, "active") {
        Some(active) => active,
        None => runtime.stage().get(key).is_some_and(|element| !element.active),
    };
    runtime.set_element_active(key, active);
}

/// `[element, parent?]`. The parent names a live layout or element.
fn add_element(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(node) = params.get(0, "element").or_else(|| params.get(0, "elements")) else {
        tracing::warn!("AddElement needs an element node");
        return;
    };
    let parent = params.str(1, "parent").map(|name| {
        if runtime.stage().layout(name).is_some() {
            ParentRef::Layout(name.to_string())
        } else {
            ParentRef::Element(name.to_string())
        }
    });
    let added = runtime.add_elements(node, parent);
    tracing::debug!("AddElement added {added} elements");
}

/// `[id]`
fn remove_element(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(id) = call.params().str(0, "id") else {
        tracing::warn!("RemoveElement needs an id");
        return;
    };
    if !runtime.remove_element(id) {
        tracing::debug!("RemoveElement: no element '{id}'");
    }
}

/// `[layout, x, y, relative]`
fn scroll_layout(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(layout) = params.str(0, "layout") else {
        tracing::warn!("ScrollLayout needs a layout name");
        return;
    };
    let scroll = Vec2::new(params.f32(1, "x").unwrap_or(0.0), params.f32(2, "y").unwrap_or(0.0));
    let relative = params.bool(3, "relative").unwrap_or(false);
    if !runtime.scroll_layout(layout, scroll, relative) {
        tracing::debug!("ScrollLayout: layout '{layout}' is not live");
    }
}

/// `[x, y]` or `{"position": [x, y]}`
fn select(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let position = match params.get(0, "position").and_then(ivec2) {
        Some(position) => Some(position),
        None => match (params.i64(0, "x"), params.i64(1, "y")) {
            (Some(x), Some(y)) => Some(IVec2::new(x as i32, y as i32)),
            _ => None,
        },
    };
    let Some(position) = position else {
        tracing::warn!("Select needs a coordinate");
        return;
    };
    if !runtime.set_focus(position) {
        tracing::debug!("Select: no button at {position}");
    }
}
