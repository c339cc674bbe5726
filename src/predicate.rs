//! Named conditions and their combination.

use crate::resolve::Query;
use crate::value::{compare_values, field, field_str, values_equal, Params, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub name: String,
    pub params: Value,
    pub negate: bool,
    pub otherwise: bool,
}

impl Condition {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self { name: name.into(), params, negate: false, otherwise: false }
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn otherwise(mut self, otherwise: bool) -> Self {
        self.otherwise = otherwise;
        self
    }

    pub fn from_value(node: &Value) -> Option<Self> {
        let map = node.as_object()?;
        let name = field_str(map, &["name", "type", "condition"])?;
        let params = field(map, &["params", "settings", "parameters"]).cloned().unwrap_or(Value::Null);
        let flag = |keys: &[&str]| field(map, keys).and_then(Value::as_bool).unwrap_or(false);
        Some(Self {
            name: name.to_string(),
            params,
            negate: flag(&["negate", "not", "invert"]),
            otherwise: flag(&["otherwise", "or"]),
        })
    }

    /// Evaluates this condition alone. Unknown names and malformed
    /// parameters evaluate to `false` regardless of `negate`.
    pub fn evaluate(&self, query: &Query<'_>) -> bool {
        let Some(predicate) = query.vocabulary.predicates.get(&self.name) else {
            tracing::warn!("unknown predicate '{}'", self.name);
            return false;
        };
        let resolved = query.resolve_deep(&self.params, false);
        match predicate(query, &Params::new(&resolved)) {
            Some(raw) => raw != self.negate,
            None => {
                tracing::debug!("predicate '{}' rejected parameters {}", self.name, self.params);
                false
            }
        }
    }
}

/// Ordered conditions combined with the `otherwise` override rule.
///
/// Starting from `true`, a regular condition that fails clears the result
/// and an `otherwise` condition that passes sets it again. An empty set is
/// `true`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    pub fn from_value(node: &Value) -> Self {
        let mut conditions = Vec::new();
        collect(node, &mut conditions);
        Self { conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn evaluate(&self, query: &Query<'_>) -> bool {
        combine(self.conditions.iter().map(|condition| (condition.otherwise, condition.evaluate(query))))
    }
}

/// The override combinator over `(otherwise, result)` pairs.
pub fn combine(results: impl IntoIterator<Item = (bool, bool)>) -> bool {
    let mut can_proceed = true;
    for (otherwise, passed) in results {
        if !otherwise && !passed {
            can_proceed = false;
        }
        if otherwise && passed {
            can_proceed = true;
        }
    }
    can_proceed
}

fn collect(node: &Value, out: &mut Vec<Condition>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect(item, out);
            }
        }
        Value::Object(_) => match Condition::from_value(node) {
            Some(condition) => out.push(condition),
            None => tracing::warn!("skipping condition node without a name: {node}"),
        },
        _ => {}
    }
}

pub type PredicateFn = fn(&Query<'_>, &Params<'_>) -> Option<bool>;

pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn empty() -> Self {
        Self { predicates: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, predicate: PredicateFn) {
        self.predicates.insert(name.into(), predicate);
    }

    pub fn get(&self, name: &str) -> Option<PredicateFn> {
        self.predicates.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("Always", |_, _| Some(true));
        registry.register("GetSettingBool", setting_bool);
        registry.register("SettingIntEquals", |q, p| setting_int(q, p, Ordering::Equal));
        registry.register("SettingIntGreater", |q, p| setting_int(q, p, Ordering::Greater));
        registry.register("SettingIntLesser", |q, p| setting_int(q, p, Ordering::Less));
        registry.register("PlayerCountEquals", |q, p| counter(q, p, "player_count", Ordering::Equal));
        registry.register("PlayerCountGreater", |q, p| counter(q, p, "player_count", Ordering::Greater));
        registry.register("PlayerCountLesser", |q, p| counter(q, p, "player_count", Ordering::Less));
        registry.register("StoryChapterEquals", |q, p| counter(q, p, "story_chapter", Ordering::Equal));
        registry.register("StoryChapterGreater", |q, p| counter(q, p, "story_chapter", Ordering::Greater));
        registry.register("StoryChapterLesser", |q, p| counter(q, p, "story_chapter", Ordering::Less));
        registry.register("SceneIs", scene_is);
        registry.register("ModeIs", mode_is);
        registry.register("MenuIs", menu_is);
        registry.register("ElementActive", element_active);
        registry.register("LayoutScrollXGreater", |q, p| layout_scroll(q, p, Axis::X, Ordering::Greater));
        registry.register("LayoutScrollXLesser", |q, p| layout_scroll(q, p, Axis::X, Ordering::Less));
        registry.register("LayoutScrollYGreater", |q, p| layout_scroll(q, p, Axis::Y, Ordering::Greater));
        registry.register("LayoutScrollYLesser", |q, p| layout_scroll(q, p, Axis::Y, Ordering::Less));
        registry.register("SaveValueEquals", |q, p| save_value(q, p, Ordering::Equal));
        registry.register("SaveValueGreater", |q, p| save_value(q, p, Ordering::Greater));
        registry.register("SaveValueLesser", |q, p| save_value(q, p, Ordering::Less));
        registry.register("RankEquals", |q, p| rank(q, p, Ordering::Equal));
        registry.register("RankGreater", |q, p| rank(q, p, Ordering::Greater));
        registry.register("RankLesser", |q, p| rank(q, p, Ordering::Less));
        registry.register("ValueEquals", value_equals);
        registry.register("MusicPlaying", music_playing);
        registry
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

fn setting_bool(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let key = params.str(0, "key")?;
    Some(query.services.settings.get_bool(key).unwrap_or(false))
}

fn setting_int(query: &Query<'_>, params: &Params<'_>, expected: Ordering) -> Option<bool> {
    let key = params.str(0, "key")?;
    let value = params.i64(1, "value")?;
    let current = query.services.settings.get_int(key).unwrap_or(0);
    Some(current.cmp(&value) == expected)
}

fn counter(query: &Query<'_>, params: &Params<'_>, name: &str, expected: Ordering) -> Option<bool> {
    let value = params.i64(0, "value")?;
    let current = query.services.session.counter(name).unwrap_or(0);
    Some(current.cmp(&value) == expected)
}

fn scene_is(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let name = params.str(0, "name")?;
    Some(query.services.host.current_scene().eq_ignore_ascii_case(name))
}

fn mode_is(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let mode = params.str(0, "mode")?;
    Some(query.services.session.mode().eq_ignore_ascii_case(mode))
}

fn menu_is(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let id = params.str(0, "id")?;
    Some(query.menu_id == Some(id))
}

fn element_active(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let id = params.str(0, "id")?;
    let active = query.stage.find(id).and_then(|key| query.stage.get(key)).is_some_and(|element| element.active);
    Some(active)
}

fn layout_scroll(query: &Query<'_>, params: &Params<'_>, axis: Axis, expected: Ordering) -> Option<bool> {
    let name = params.str(0, "layout")?;
    let value = params.f32(1, "value")?;
    let Some(layout) = query.stage.layout(name) else {
        return Some(false);
    };
    let current = match axis {
        Axis::X => layout.scroll.x,
        Axis::Y => layout.scroll.y,
    };
    Some(current.partial_cmp(&value) == Some(expected))
}

fn save_value(query: &Query<'_>, params: &Params<'_>, expected: Ordering) -> Option<bool> {
    let key = params.str(0, "key")?;
    let value = params.get(1, "value")?;
    let profile = params
        .i64(2, "profile")
        .map(|p| p.max(0) as u32)
        .unwrap_or_else(|| query.services.saves.active_profile());
    let Some(current) = query.services.saves.load(profile, key) else {
        return Some(false);
    };
    Some(compare_values(&current, value) == Some(expected))
}

fn rank(query: &Query<'_>, params: &Params<'_>, expected: Ordering) -> Option<bool> {
    let song = params.str(0, "song")?;
    let value = params.i64(1, "rank")?;
    let Some(current) = query.services.session.rank(song) else {
        return Some(false);
    };
    Some(current.cmp(&value) == expected)
}

fn value_equals(_query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    if params.len() < 2 {
        return None;
    }
    let a = params.get(0, "a").unwrap_or(&Value::Null);
    let b = params.get(1, "b").unwrap_or(&Value::Null);
    Some(values_equal(a, b))
}

fn music_playing(query: &Query<'_>, params: &Params<'_>) -> Option<bool> {
    let current = query.services.audio.current_music();
    match params.str(0, "name") {
        Some(name) => Some(current == Some(name)),
        None => Some(current.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otherwise_overrides_an_earlier_failure() {
        assert!(combine([(false, false), (true, true)]));
    }

    #[test]
    fn failure_after_override_still_blocks() {
        assert!(!combine([(true, true), (false, false)]));
        assert!(!combine([(false, false), (true, false)]));
    }

    #[test]
    fn otherwise_alone_never_clears() {
        assert!(combine([(true, false)]));
        assert!(combine(std::iter::empty()));
    }

    #[test]
    fn parses_flags_and_lists() {
        let node = serde_json::json!([
            {"name": "SceneIs", "params": ["Menu"], "negate": true},
            {"type": "PlayerCountEquals", "params": {"value": 2}, "otherwise": true}
        ]);
        let set = ConditionSet::from_value(&node);
        let parsed: Vec<_> = set.iter().map(|c| (c.name.as_str(), c.negate, c.otherwise)).collect();
        assert_eq!(parsed, vec![("SceneIs", true, false), ("PlayerCountEquals", false, true)]);
    }
}
