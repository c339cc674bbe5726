//! Menu document parser.
//!
//! Walks a document top-down, resolving variables as it goes, and produces a
//! [`MenuDescriptor`]. Only structural problems are errors; a bad element,
//! layout or action node is logged and skipped.

use crate::action::ActionList;
use crate::descriptor::{
    ElementDescriptor, ElementKind, MenuDescriptor, MusicRef, ParentRef, RectDescriptor, TextAlign,
};
use crate::layout::{Alignment, LayoutDescriptor, LayoutFlags, LayoutKind};
use crate::predicate::ConditionSet;
use crate::resolve::{Query, Vocabulary};
use crate::scope::VariableScope;
use crate::services::{Palette, Services};
use crate::stage::Stage;
use crate::value::{as_bool, as_f32, as_i64, field, field_str, Map, Value};
use anyhow::{bail, Context, Result};
use glam::{IVec2, Vec2, Vec4};
use std::fs;
use std::path::Path;

const MAX_PREFAB_DEPTH: usize = 16;

/// Everything shared by the nodes of one document.
struct Document<'d> {
    prefabs: &'d Map<String, Value>,
    menu_id: String,
}

pub struct MenuParser<'a> {
    vocabulary: &'a Vocabulary,
    services: &'a Services,
    stage: &'a Stage,
    globals: VariableScope,
}

impl<'a> MenuParser<'a> {
    pub fn new(vocabulary: &'a Vocabulary, services: &'a Services, stage: &'a Stage) -> Self {
        Self { vocabulary, services, stage, globals: VariableScope::new() }
    }

    /// Bindings visible to every document before its own `variables`.
    pub fn with_globals(mut self, globals: VariableScope) -> Self {
        self.globals = globals;
        self
    }

    fn query<'s>(&'s self, scope: &'s VariableScope, menu_id: Option<&'s str>) -> Query<'s> {
        Query {
            vocabulary: self.vocabulary,
            services: self.services,
            stage: self.stage,
            scope,
            menu_id,
            context: None,
        }
    }

    pub fn load_path(&self, path: &Path) -> Result<MenuDescriptor> {
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read menu document {}", path.display()))?;
        let fallback = path.file_stem().and_then(|stem| stem.to_str()).unwrap_or("menu");
        self.parse_str(&text, fallback).with_context(|| format!("Failed to parse menu document {}", path.display()))
    }

    pub fn parse_str(&self, text: &str, fallback_id: &str) -> Result<MenuDescriptor> {
        let document: Value = serde_json::from_str(text).context("menu document is not valid JSON")?;
        self.parse_value(&document, fallback_id)
    }

    pub fn parse_value(&self, document: &Value, fallback_id: &str) -> Result<MenuDescriptor> {
        let Some(root) = document.as_object() else {
            bail!("menu document must be an object, found {}", kind_of(document));
        };
        let id = field_str(root, &["id"]).unwrap_or(fallback_id).to_string();
        let mut menu = MenuDescriptor::new(id.clone());

        let mut scope = self.globals.clone();
        if let Some(variables) = root.get("variables").and_then(Value::as_object) {
            for (name, node) in variables {
                let value = self.query(&scope, Some(&id)).resolve_deep(node, false);
                scope = scope.extend(name.clone(), value);
            }
        }
        let query = self.query(&scope, Some(&id));

        if let Some(name) = root.get("name") {
            menu.name = crate::value::display_text(&query.resolve(name));
        }
        if let Some(theme) = root.get("theme") {
            menu.theme = parse_theme(&query.resolve_deep(theme, false));
        }
        if let Some(sprites) = root.get("sprites").and_then(Value::as_object) {
            for (name, path) in sprites {
                match query.resolve(path) {
                    Value::String(path) => {
                        menu.sprites.insert(name.clone(), path);
                    }
                    other => tracing::warn!("menu '{id}': sprite '{name}' has non-string path {other}"),
                }
            }
        }
        if let Some(layouts) = root.get("layouts") {
            for layout in self.parse_layouts(layouts, &query) {
                menu.insert_layout(layout);
            }
        }

        let prefabs = root.get("prefabs").and_then(Value::as_object).cloned().unwrap_or_default();
        if let Some(elements) = root.get("elements") {
            let document = Document { prefabs: &prefabs, menu_id: id.clone() };
            self.expand(elements, &scope, &document, None, 0, &mut menu.elements);
        }
        menu.prefabs = prefabs;

        if let Some(exit) = root.get("exit_func").or_else(|| root.get("exit")) {
            menu.exit = ActionList::from_value(&query.resolve_deep(exit, true));
        }
        if let Some(music) = root.get("music_name").or_else(|| root.get("music")) {
            menu.music = parse_music(&query.resolve_deep(music, false));
        }
        if let Some(select) = root.get("default_select") {
            menu.default_select = ivec2(&query.resolve_deep(select, false)).unwrap_or(IVec2::ZERO);
        }
        menu.pause_game = root.get("pause_game").and_then(as_bool).unwrap_or(false);
        menu.layer = root.get("layer").and_then(as_i64).unwrap_or(0) as i32;
        menu.scope = scope;
        tracing::debug!(
            "parsed menu '{}' ({} elements, {} layouts)",
            menu.id,
            menu.elements.len(),
            menu.layouts.len()
        );
        Ok(menu)
    }

    /// Expands a single element node (or group) under `scope`. Used by
    /// actions that add elements to a running menu; `prefabs` are the ones
    /// the menu's document declared.
    pub fn parse_elements(
        &self,
        node: &Value,
        scope: &VariableScope,
        menu_id: &str,
        prefabs: &Map<String, Value>,
    ) -> Vec<ElementDescriptor> {
        let document = Document { prefabs, menu_id: menu_id.to_string() };
        let mut out = Vec::new();
        self.expand(node, scope, &document, None, 0, &mut out);
        out
    }

    fn parse_layouts(&self, node: &Value, query: &Query<'_>) -> Vec<LayoutDescriptor> {
        let resolved = query.resolve_deep(node, false);
        let mut layouts = Vec::new();
        match &resolved {
            Value::Array(items) => {
                for item in items {
                    if let Some(layout) = item.as_object().and_then(|map| parse_layout(map, None)) {
                        layouts.push(layout);
                    }
                }
            }
            Value::Object(map) => {
                for (name, item) in map {
                    if let Some(layout) = item.as_object().and_then(|m| parse_layout(m, Some(name))) {
                        layouts.push(layout);
                    }
                }
            }
            _ => tracing::warn!("'layouts' must be an array or an object"),
        }
        layouts
    }

    fn expand(
        &self,
        node: &Value,
        scope: &VariableScope,
        document: &Document<'_>,
        parent: Option<&ParentRef>,
        depth: usize,
        out: &mut Vec<ElementDescriptor>,
    ) {
        let map = match node {
            Value::Array(items) => {
                for item in items {
                    self.expand(item, scope, document, parent, depth, out);
                }
                return;
            }
            Value::Object(map) => map,
            Value::Null => return,
            other => {
                tracing::warn!("menu '{}': skipping non-object element node {other}", document.menu_id);
                return;
            }
        };
        let query = self.query(scope, Some(&document.menu_id));

        if let Some(variable) = map.get("for") {
            self.expand_for(map, variable, scope, document, parent, depth, out);
            return;
        }
        let kind = map.get("type").map(|node| query.resolve(node));
        if kind.as_ref().and_then(Value::as_str).is_some_and(|kind| kind.eq_ignore_ascii_case("group")) {
            if let Some(children) = field(map, &["elements", "children"]) {
                self.expand(children, scope, document, parent, depth, out);
            }
            return;
        }

        let copies = match map.get("loop") {
            Some(count) => match as_i64(&query.resolve(count)) {
                Some(count) => count.max(0) as usize,
                None => {
                    tracing::warn!("menu '{}': 'loop' must be a number", document.menu_id);
                    1
                }
            },
            None => 1,
        };
        let looped = map.contains_key("loop");
        for index in 0..copies {
            let copy_scope = if looped { scope.extend("loop_index", Value::from(index)) } else { scope.clone() };
            let before = out.len();
            if map.contains_key("prefab") {
                self.expand_prefab(map, &copy_scope, document, parent, depth, out);
            } else if let Some(element) = self.build_element(map, &copy_scope, document, parent) {
                out.push(element);
            }
            if index > 0 {
                for element in &mut out[before..] {
                    element.loop_copy = true;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn expand_for(
        &self,
        map: &Map<String, Value>,
        variable: &Value,
        scope: &VariableScope,
        document: &Document<'_>,
        parent: Option<&ParentRef>,
        depth: usize,
        out: &mut Vec<ElementDescriptor>,
    ) {
        let query = self.query(scope, Some(&document.menu_id));
        let Some(name) = variable.as_str() else {
            tracing::warn!("menu '{}': 'for' needs a variable name", document.menu_id);
            return;
        };
        let values: Vec<Value> = if let Some(count) = map.get("count") {
            let count = as_i64(&query.resolve(count)).unwrap_or(0).max(0);
            (0..count).map(Value::from).collect()
        } else {
            match field(map, &["in", "over"]).map(|node| query.resolve_deep(node, false)) {
                Some(Value::Array(items)) => items,
                Some(Value::Object(entries)) => entries.into_iter().map(|(_, value)| value).collect(),
                Some(Value::Null) | None => {
                    tracing::debug!("menu '{}': 'for {name}' has nothing to iterate", document.menu_id);
                    Vec::new()
                }
                Some(other) => vec![other],
            }
        };
        let Some(body) = field(map, &["elements", "body", "children"]) else {
            return;
        };
        for (index, value) in values.into_iter().enumerate() {
            let child = scope.extend_many([(name.to_string(), value), ("index".to_string(), Value::from(index))]);
            self.expand(body, &child, document, parent, depth, out);
        }
    }

    fn expand_prefab(
        &self,
        map: &Map<String, Value>,
        scope: &VariableScope,
        document: &Document<'_>,
        parent: Option<&ParentRef>,
        depth: usize,
        out: &mut Vec<ElementDescriptor>,
    ) {
        let query = self.query(scope, Some(&document.menu_id));
        let Some(prefab) = map.get("prefab").map(|node| query.resolve(node)) else {
            return;
        };
        let Some(prefab) = prefab.as_str().map(str::to_string) else {
            tracing::warn!("menu '{}': 'prefab' must name a prefab", document.menu_id);
            return;
        };
        if depth >= MAX_PREFAB_DEPTH {
            tracing::warn!("menu '{}': prefab '{prefab}' nests too deeply, skipping", document.menu_id);
            return;
        }
        let Some(fragment) = document.prefabs.get(&prefab) else {
            tracing::warn!("menu '{}': unknown prefab '{prefab}'", document.menu_id);
            return;
        };
        let base_id = field(map, &["id"]).map(|node| query.resolve(node));
        let base_id = base_id.as_ref().and_then(Value::as_str).unwrap_or(prefab.as_str()).to_string();
        let variable = field_str(map, &["var", "as"]);
        let items = field(map, &["over", "in", "items"]).map(|node| query.resolve_deep(node, false));
        let iterations: Vec<(usize, Option<Value>)> = match items {
            Some(Value::Array(items)) => items.into_iter().map(Some).enumerate().collect(),
            Some(Value::Null) => Vec::new(),
            Some(other) => vec![(0, Some(other))],
            None => vec![(0, None)],
        };
        let iterated = map.contains_key("over") || map.contains_key("in") || map.contains_key("items");

        for (index, item) in iterations {
            let mut entry = scope.extend("index", Value::from(index));
            if let Some(item) = &item {
                entry = entry.extend("item", item.clone());
                if let Some(variable) = variable {
                    entry = entry.extend(variable, item.clone());
                }
            }
            let entry_query = self.query(&entry, Some(&document.menu_id));
            let container_id = if iterated { format!("{base_id}_{index}") } else { base_id.clone() };

            let resolved = entry_query.resolve_deep(&Value::Object(without(map, &["overrides", "elements"])), false);
            let Some(resolved) = resolved.as_object() else { continue };
            let mut container = ElementDescriptor::new(container_id.clone(), ElementKind::PrefabInstance {
                prefab: prefab.clone(),
            });
            apply_common(&mut container, resolved, parent);
            container.id = container_id.clone();
            out.push(container);

            let overrides = map.get("overrides").map(|node| entry_query.resolve_deep(node, false));
            let item_overrides = item.as_ref().and_then(|item| item.get("overrides")).cloned();
            let inherited = ParentRef::Element(container_id);
            let fragments: Vec<&Value> = match fragment {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for node in fragments {
                let mut node = node.clone();
                if let Value::Object(fields) = &mut node {
                    let fragment_id = fields.get("id").and_then(Value::as_str).map(str::to_string);
                    for source in [&overrides, &item_overrides].into_iter().flatten() {
                        merge_overrides(fields, source, fragment_id.as_deref());
                    }
                }
                self.expand(&node, &entry, document, Some(&inherited), depth + 1, out);
            }
        }
    }

    fn build_element(
        &self,
        map: &Map<String, Value>,
        scope: &VariableScope,
        document: &Document<'_>,
        parent: Option<&ParentRef>,
    ) -> Option<ElementDescriptor> {
        let query = self.query(scope, Some(&document.menu_id));
        let node = Value::Object(without(map, &["loop"]));
        let resolved = query.resolve_deep(&node, false);
        let map = resolved.as_object()?;
        let Some(kind_name) = field_str(map, &["type", "kind"]) else {
            tracing::warn!("menu '{}': element without a type: {resolved}", document.menu_id);
            return None;
        };
        let text = field(map, &["text", "label"]).map(crate::value::display_text).unwrap_or_default();
        let sprite = field_str(map, &["sprite", "image"]).map(str::to_string);
        let kind = match kind_name.to_ascii_lowercase().as_str() {
            "image" | "sprite" | "rect" | "panel" => ElementKind::Image {
                sprite,
                preserve_aspect: field(map, &["preserve_aspect"]).and_then(as_bool).unwrap_or(false),
            },
            "text" | "label" => ElementKind::Text {
                text,
                font_size: field(map, &["font_size", "size_font"]).and_then(as_f32).unwrap_or(32.0),
                align: field_str(map, &["align", "alignment"]).map(TextAlign::from_name).unwrap_or_default(),
            },
            "button" => ElementKind::Button {
                text,
                sprite,
                click: field(map, &["click", "on_click", "action"]).map(ActionList::from_value).unwrap_or_default(),
                selection: field(map, &["selection", "select", "selection_position"])
                    .and_then(ivec2)
                    .unwrap_or(IVec2::ZERO),
            },
            "event" => ElementKind::Event,
            other => {
                tracing::warn!("menu '{}': unknown element type '{other}'", document.menu_id);
                return None;
            }
        };
        let id = field_str(map, &["id"]).unwrap_or(kind_name).to_string();
        let mut element = ElementDescriptor::new(id, kind);
        apply_common(&mut element, map, parent);
        if matches!(element.kind, ElementKind::Event) {
            if let Some(action) = field(map, &["action", "actions", "event"]) {
                element.spawn_action = ActionList::from_value(action).then(&element.spawn_action);
            }
        }
        Some(element)
    }
}

/// Fields shared by every element variant.
fn apply_common(element: &mut ElementDescriptor, map: &Map<String, Value>, parent: Option<&ParentRef>) {
    if let Some(name) = field_str(map, &["name"]) {
        element.name = name.to_string();
    }
    element.parent = if let Some(id) = field_str(map, &["parent"]) {
        ParentRef::Element(id.to_string())
    } else if let Some(layout) = field_str(map, &["parentLayout", "parent_layout", "layout"]) {
        ParentRef::Layout(layout.to_string())
    } else {
        parent.cloned().unwrap_or_default()
    };
    element.rect = parse_rect(map);
    element.color = field(map, &["color"]).and_then(as_i64).map(|slot| slot.max(0) as usize).unwrap_or(0);
    element.opacity = field(map, &["opacity", "alpha"]).and_then(as_f32).unwrap_or(1.0);
    element.length = field(map, &["length", "spawn_length"]).and_then(as_f32).unwrap_or(0.0);
    element.wait = field(map, &["wait"]).and_then(as_bool).unwrap_or(false);
    element.spawn_guard =
        field(map, &["spawn_condition", "condition"]).map(ConditionSet::from_value).unwrap_or_default();
    element.spawn_action = field(map, &["spawn_action"]).map(ActionList::from_value).unwrap_or_default();
}

fn without(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter().filter(|(key, _)| !keys.contains(&key.as_str())).map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Overrides are either fields for every fragment element, or a map keyed
/// by fragment element id.
fn merge_overrides(fields: &mut Map<String, Value>, overrides: &Value, fragment_id: Option<&str>) {
    let Some(overrides) = overrides.as_object() else {
        return;
    };
    if let Some(targeted) = fragment_id.and_then(|id| overrides.get(id)).and_then(Value::as_object) {
        for (key, value) in targeted {
            fields.insert(key.clone(), value.clone());
        }
        return;
    }
    let keyed_by_id = overrides.values().all(Value::is_object) && !overrides.is_empty();
    if keyed_by_id {
        return;
    }
    for (key, value) in overrides {
        fields.insert(key.clone(), value.clone());
    }
}

fn parse_layout(map: &Map<String, Value>, name: Option<&String>) -> Option<LayoutDescriptor> {
    let name = match name {
        Some(name) => name.clone(),
        None => match field_str(map, &["name", "id"]) {
            Some(name) => name.to_string(),
            None => {
                tracing::warn!("skipping layout without a name");
                return None;
            }
        },
    };
    let kind = match field_str(map, &["type", "kind"]).unwrap_or("vertical").to_ascii_lowercase().as_str() {
        "grid" => LayoutKind::Grid {
            columns: field(map, &["columns", "constraint_count"]).and_then(as_i64).unwrap_or(1).max(1) as u32,
            cell_size: field(map, &["cell_size", "cell"]).and_then(vec2).unwrap_or(Vec2::splat(100.0)),
        },
        "horizontal" | "row" => LayoutKind::Horizontal,
        "vertical" | "column" => LayoutKind::Vertical,
        other => {
            tracing::warn!("layout '{name}' has unknown type '{other}'");
            return None;
        }
    };
    let mut layout = LayoutDescriptor::new(name, kind).with_rect(parse_rect(map));
    layout.spacing = field(map, &["spacing"]).and_then(vec2).unwrap_or(Vec2::ZERO);
    layout.padding = field(map, &["padding"]).and_then(as_f32).unwrap_or(0.0);
    layout.alignment = field_str(map, &["alignment", "child_alignment"]).map(Alignment::from_name).unwrap_or_default();
    layout.scrollable = field(map, &["scrollable", "scroll"]).and_then(as_bool).unwrap_or(false);
    layout.parent = if let Some(id) = field_str(map, &["parent"]) {
        ParentRef::Element(id.to_string())
    } else if let Some(other) = field_str(map, &["parentLayout", "parent_layout"]) {
        ParentRef::Layout(other.to_string())
    } else {
        ParentRef::Root
    };
    let mut flags = LayoutFlags::empty();
    if let Some(Value::Array(names)) = map.get("flags") {
        for name in names.iter().filter_map(Value::as_str) {
            match LayoutFlags::from_key(name) {
                Some(flag) => flags |= flag,
                None => tracing::warn!("layout '{}': unknown flag '{name}'", layout.name),
            }
        }
    }
    for (key, value) in map {
        if let (Some(flag), Some(true)) = (LayoutFlags::from_key(key), as_bool(value)) {
            flags |= flag;
        }
    }
    layout.flags = flags;
    Some(layout)
}

fn parse_rect(map: &Map<String, Value>) -> RectDescriptor {
    let source = match map.get("rect").and_then(Value::as_object) {
        Some(rect) => rect,
        None => map,
    };
    let mut rect = RectDescriptor::default();
    if let Some(anchor) = field(source, &["anchor"]).and_then(vec2) {
        rect.anchor_min = anchor;
        rect.anchor_max = anchor;
    }
    if let Some(min) = field(source, &["anchor_min", "anchorMin"]).and_then(vec2) {
        rect.anchor_min = min;
    }
    if let Some(max) = field(source, &["anchor_max", "anchorMax"]).and_then(vec2) {
        rect.anchor_max = max;
    }
    if let Some(pivot) = field(source, &["pivot"]).and_then(vec2) {
        rect.pivot = pivot;
    }
    if let Some(position) = field(source, &["position", "pos", "offset"]).and_then(vec2) {
        rect.position = position;
    }
    if let Some(size) = field(source, &["size"]).and_then(vec2) {
        rect.size = size;
    }
    if let Some(rotation) = field(source, &["rotation"]).and_then(as_f32) {
        rect.rotation = rotation;
    }
    rect
}

fn parse_theme(node: &Value) -> Option<Palette> {
    let Value::Array(slots) = node else {
        tracing::warn!("'theme' must be an array of colors");
        return None;
    };
    let colors = slots
        .iter()
        .map(|slot| {
            parse_color(slot).unwrap_or_else(|| {
                tracing::warn!("invalid theme color {slot}, using white");
                Vec4::ONE
            })
        })
        .collect();
    Some(Palette::new(colors))
}

fn parse_music(node: &Value) -> Option<MusicRef> {
    match node {
        Value::String(name) if !name.is_empty() => Some(MusicRef::new(name.clone())),
        Value::Object(map) => {
            let name = field_str(map, &["name", "track"])?;
            let mut music = MusicRef::new(name);
            if let Some(fade) = field(map, &["fade", "fade_time"]).and_then(as_f32) {
                music.fade = fade.max(0.0);
            }
            if let Some(looped) = field(map, &["loop", "looped"]).and_then(as_bool) {
                music.looped = looped;
            }
            Some(music)
        }
        _ => None,
    }
}

/// `[x, y]`, `{"x": .., "y": ..}` or a single number for both axes.
pub fn vec2(value: &Value) -> Option<Vec2> {
    match value {
        Value::Array(items) if items.len() >= 2 => Some(Vec2::new(as_f32(&items[0])?, as_f32(&items[1])?)),
        Value::Object(map) => Some(Vec2::new(map.get("x").and_then(as_f32)?, map.get("y").and_then(as_f32)?)),
        other => as_f32(other).map(Vec2::splat),
    }
}

pub fn ivec2(value: &Value) -> Option<IVec2> {
    match value {
        Value::Array(items) if items.len() >= 2 => {
            Some(IVec2::new(as_i64(&items[0])? as i32, as_i64(&items[1])? as i32))
        }
        Value::Object(map) => {
            Some(IVec2::new(map.get("x").and_then(as_i64)? as i32, map.get("y").and_then(as_i64)? as i32))
        }
        _ => None,
    }
}

/// `"#RRGGBB"`, `"#RRGGBBAA"` or `[r, g, b(, a)]`. Array components above
/// one are read as 0-255.
pub fn parse_color(value: &Value) -> Option<Vec4> {
    match value {
        Value::String(text) => parse_hex(text),
        Value::Array(items) if items.len() >= 3 => {
            let components: Vec<f32> = items.iter().take(4).map(as_f32).collect::<Option<_>>()?;
            let scale = if components.iter().any(|c| *c > 1.0) { 255.0 } else { 1.0 };
            let alpha = components.get(3).map(|a| a / scale).unwrap_or(1.0);
            Some(Vec4::new(components[0] / scale, components[1] / scale, components[2] / scale, alpha))
        }
        _ => None,
    }
}

fn parse_hex(text: &str) -> Option<Vec4> {
    let hex = text.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return None;
    }
    let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok().map(|v| v as f32 / 255.0);
    let alpha = if hex.len() == 8 { channel(6)? } else { 1.0 };
    Some(Vec4::new(channel(0)?, channel(2)?, channel(4)?, alpha))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
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
            let session = SessionState::default().with_collection("songs", vec![json!("intro"), json!("finale")]);
            Self { vocabulary: Vocabulary::default(), services: Services::headless().with_session(session), stage: Stage::new() }
        }

        fn parse(&self, document: Value) -> MenuDescriptor {
            MenuParser::new(&self.vocabulary, &self.services, &self.stage)
                .parse_value(&document, "test")
                .expect("parse menu")
        }
    }

    #[test]
    fn rejects_non_object_documents() {
        let fixture = Fixture::new();
        let parser = MenuParser::new(&fixture.vocabulary, &fixture.services, &fixture.stage);
        assert!(parser.parse_value(&json!([1, 2]), "x").is_err());
        assert!(parser.parse_str("{ not json", "x").is_err());
    }

    #[test]
    fn variables_feed_later_variables_and_elements() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "id": "main",
            "variables": {"player": "Ava", "greeting": "Hi ${player}"},
            "elements": [{"type": "Text", "id": "title", "text": "$greeting"}]
        }));
        assert_eq!(menu.element("title").and_then(|e| e.kind.text()), Some("Hi Ava"));
    }

    #[test]
    fn loop_marks_copies() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "elements": [{"type": "Text", "id": "row${loop_index}", "text": "${loop_index}", "loop": 3}]
        }));
        let summary: Vec<_> = menu.elements.iter().map(|e| (e.id.as_str(), e.loop_copy)).collect();
        assert_eq!(summary, vec![("row0", false), ("row1", true), ("row2", true)]);
    }

    #[test]
    fn for_binds_loop_variable_and_groups_flatten() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "elements": [
                {"type": "Text", "id": "header"},
                {"for": "song", "in": {"$func": "Collection", "params": ["songs"]}, "elements": [
                    [{"type": "Button", "id": "${song}", "selection": [0, "$index"]}]
                ]},
                {"type": "Group", "elements": [{"type": "Text", "id": "footer"}]}
            ]
        }));
        let ids: Vec<_> = menu.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["header", "intro", "finale", "footer"]);
        assert_eq!(menu.element("finale").and_then(|e| e.selection()), Some(IVec2::new(0, 1)));
    }

    #[test]
    fn prefab_iterations_get_containers_and_overrides() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "prefabs": {"row": [
                {"type": "Text", "id": "label${index}", "text": "$item"},
                {"type": "Image", "id": "icon${index}", "parent": "elsewhere"}
            ]},
            "elements": [{
                "prefab": "row", "id": "rows", "over": ["a", "b"], "layout": "list",
                "overrides": {"label${index}": {"color": 3}}
            }]
        }));
        let ids: Vec<_> = menu.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["rows_0", "label0", "icon0", "rows_1", "label1", "icon1"]);
        assert!(menu.prefabs.contains_key("row"));
        let container = menu.element("rows_1").expect("container");
        assert!(matches!(container.kind, ElementKind::PrefabInstance { .. }));
        assert_eq!(container.parent, ParentRef::Layout("list".into()));
        let label = menu.element("label1").expect("label");
        assert_eq!(label.parent, ParentRef::Element("rows_1".into()));
        assert_eq!(label.kind.text(), Some("b"));
        assert_eq!(label.color, 3);
        assert_eq!(menu.element("icon1").map(|e| e.color), Some(0));
        assert_eq!(menu.element("icon0").map(|e| e.parent.clone()), Some(ParentRef::Element("elsewhere".into())));
    }

    #[test]
    fn top_level_fields() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "id": "pause",
            "theme": ["#ff000080", [0, 0, 255]],
            "music_name": {"name": "lobby", "fade": 2.0, "loop": false},
            "default_select": [1, 2],
            "pause_game": true,
            "layer": 3,
            "layouts": [{"name": "list", "type": "Grid", "columns": 2, "cell_size": [50, 20], "flags": ["reverse"]}],
            "exit_func": {"name": "CloseMenu"}
        }));
        let theme = menu.theme.as_ref().expect("theme");
        assert_eq!(theme.get(0).map(|c| c.w), Some(128.0 / 255.0));
        assert_eq!(theme.get(1), Some(Vec4::new(0.0, 0.0, 1.0, 1.0)));
        let music = menu.music.as_ref().expect("music");
        assert_eq!((music.name.as_str(), music.fade, music.looped), ("lobby", 2.0, false));
        assert_eq!(menu.default_select, IVec2::new(1, 2));
        assert!(menu.pause_game);
        assert_eq!(menu.layer, 3);
        assert!(menu.layout("list").is_some_and(|l| l.flags.contains(LayoutFlags::REVERSE)));
        assert_eq!(menu.exit.names().collect::<Vec<_>>(), vec!["CloseMenu"]);
    }

    #[test]
    fn click_functions_stay_lazy() {
        let fixture = Fixture::new();
        let menu = fixture.parse(json!({
            "variables": {"target": "title"},
            "elements": [{"type": "Button", "id": "b", "click": {"name": "SetText",
                "params": ["$target", {"$func": "GetSettingInt", "params": ["volume"]}]}}]
        }));
        let click = menu.element("b").and_then(|e| e.click()).expect("click");
        let action = click.iter().next().expect("action");
        assert_eq!(action.params[0], json!("title"));
        assert!(action.params[1].get("$func").is_some());
    }
}
