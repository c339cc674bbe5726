use super::{ActionCall, ActionRegistry, DeferredSlots};
use crate::action::ActionList;
use crate::animation::{AnimationSequence, AnimationTrack, Channel, ChannelTarget, Keyframe, TrackValue};
use crate::easing::Easing;
use crate::parse::parse_color;
use crate::runtime::MenuRuntime;
use crate::stage::ElementKey;
use crate::value::{as_bool, as_f32, field, Value};

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register_deferred("AnimateID", animate_element, DeferredSlots::At(&[3]));
    registry.register_deferred("AnimateEffect", animate_effect, DeferredSlots::At(&[3]));
    registry.register("StopAnimation", stop_animation);
    registry.register("StopEffect", stop_effect);
}

/// Keyframes as `{"time", "value", "easing", "relative"}` objects or
/// `[time, value, easing?, relative?]` arrays. Unreadable entries are
/// skipped.
pub fn parse_keyframes(node: &Value, color: bool) -> Vec<Keyframe<TrackValue>> {
    let Some(items) = node.as_array() else {
        return Vec::new();
    };
    let value_of = |value: &Value| {
        if color {
            parse_color(value).map(TrackValue::Color)
        } else {
            as_f32(value).map(TrackValue::Scalar)
        }
    };
    let mut keyframes = Vec::with_capacity(items.len());
    for item in items {
        let parsed = match item {
            Value::Object(map) => field(map, &["time", "t"]).and_then(as_f32).zip(
                field(map, &["value", "val", "v"]).and_then(value_of),
            )
            .map(|(time, value)| {
                let easing = field(map, &["easing", "ease"]).and_then(Value::as_str);
                let relative = field(map, &["relative", "rel"]).and_then(as_bool).unwrap_or(false);
                (time, value, easing, relative)
            }),
            Value::Array(parts) if parts.len() >= 2 => as_f32(&parts[0]).zip(value_of(&parts[1])).map(|(time, value)| {
                let easing = parts.get(2).and_then(Value::as_str);
                let relative = parts.get(3).and_then(as_bool).unwrap_or(false);
                (time, value, easing, relative)
            }),
            _ => None,
        };
        match parsed {
            Some((time, value, easing, relative)) => {
                let mut keyframe = Keyframe::new(time.max(0.0), value).relative(relative);
                if let Some(easing) = easing {
                    keyframe = keyframe.eased(Easing::from_name(easing));
                }
                keyframes.push(keyframe);
            }
            None => tracing::warn!("skipping unreadable keyframe {item}"),
        }
    }
    keyframes
}

/// Tracks for one element, from `{"channel": [keyframes]}` or
/// `[{"channel": name, "keyframes": [...]}]`.
pub fn parse_tracks(node: &Value, key: ElementKey) -> Vec<AnimationTrack> {
    let mut tracks = Vec::new();
    let mut push = |name: &str, keyframes: &Value| {
        let Some(channel) = Channel::from_name(name) else {
            tracing::warn!("unknown animation channel '{name}'");
            return;
        };
        let keyframes = parse_keyframes(keyframes, channel.is_color());
        if keyframes.is_empty() {
            tracing::warn!("channel '{name}' has no usable keyframes");
            return;
        }
        tracks.push(AnimationTrack::new(ChannelTarget::Element { key, channel }, keyframes));
    };
    match node {
        Value::Object(map) => {
            for (name, keyframes) in map {
                push(name, keyframes);
            }
        }
        Value::Array(items) => {
            for item in items.iter().filter_map(Value::as_object) {
                let (Some(name), Some(keyframes)) =
                    (field(item, &["channel", "property"]).and_then(Value::as_str), field(item, &["keyframes", "frames"]))
                else {
                    continue;
                };
                push(name, keyframes);
            }
        }
        _ => {}
    }
    tracks
}

/// `{id, name, channels | tracks, loop, on_complete}` or
/// `[id, channels, loop, on_complete, name]`.
fn animate_element(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let id = params.str(0, "id");
    let Some(key) = runtime.target(id, call.context) else {
        tracing::debug!("AnimateID: no element {}", id.unwrap_or("in context"));
        return;
    };
    let Some(node) = params.get(1, "channels").or_else(|| params.get(1, "tracks")) else {
        tracing::warn!("AnimateID needs channels");
        return;
    };
    let tracks = parse_tracks(node, key);
    if tracks.is_empty() {
        return;
    }
    let name = params.str(4, "name").unwrap_or("animation");
    let on_complete = params.get(3, "on_complete").map(ActionList::from_value).unwrap_or_default();
    let mut sequence = AnimationSequence::new(name)
        .with_context(Some(key))
        .owned_by(runtime.current_session())
        .looped(params.bool(2, "loop").unwrap_or(false))
        .on_complete(on_complete);
    for track in tracks {
        sequence = sequence.with_track(track);
    }
    runtime.play_animation(sequence);
}

/// `{effect, keyframes, loop, on_complete, global}` or
/// `[effect, keyframes, loop, on_complete, global]`. Global sequences
/// outlive the menu that started them.
fn animate_effect(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(effect) = params.str(0, "effect") else {
        tracing::warn!("AnimateEffect needs an effect name");
        return;
    };
    let keyframes = params.get(1, "keyframes").map(|node| parse_keyframes(node, false)).unwrap_or_default();
    if keyframes.is_empty() {
        tracing::warn!("AnimateEffect '{effect}' has no usable keyframes");
        return;
    }
    let owner = if params.bool(4, "global").unwrap_or(false) { None } else { runtime.current_session() };
    let sequence = AnimationSequence::new(effect)
        .owned_by(owner)
        .looped(params.bool(2, "loop").unwrap_or(false))
        .on_complete(params.get(3, "on_complete").map(ActionList::from_value).unwrap_or_default())
        .with_track(AnimationTrack::new(ChannelTarget::Effect(effect.to_string()), keyframes));
    runtime.stop_effect(effect, false);
    runtime.play_animation(sequence);
}

/// `[id, name, complete]`, `{id, name, complete}` or `{effect, complete}`.
/// The positional form always names an element; use `StopEffect` to stop
/// an effect positionally.
fn stop_animation(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let complete = params.bool(2, "complete").unwrap_or(false);
    if let Some(effect) = params.raw().and_then(|raw| raw.get("effect")).and_then(Value::as_str) {
        runtime.stop_effect(effect, complete);
        return;
    }
    let id = params.str(0, "id");
    let Some(key) = runtime.target(id, call.context) else {
        tracing::debug!("StopAnimation: no element {}", id.unwrap_or("in context"));
        return;
    };
    let stopped = runtime.stop_animations(key, params.str(1, "name"), complete);
    tracing::debug!("StopAnimation stopped {stopped} sequences");
}

/// `[effect, complete]`
fn stop_effect(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(effect) = params.str(0, "effect") else {
        tracing::warn!("StopEffect needs an effect name");
        return;
    };
    runtime.stop_effect(effect, params.bool(1, "complete").unwrap_or(false));
}
