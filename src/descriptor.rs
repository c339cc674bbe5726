//! Typed description of a menu screen.

use crate::action::ActionList;
use crate::layout::LayoutDescriptor;
use crate::predicate::ConditionSet;
use crate::scope::VariableScope;
use crate::services::Palette;
use crate::value::{Map, Value};
use glam::{IVec2, Vec2};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GenerationState {
    #[default]
    NotStarted,
    Generating,
    Open,
    Closed,
}

/// Anchored rectangle: anchors and pivot are normalized to the parent,
/// position and size are in reference pixels, rotation in degrees.
#[derive(Clone, Debug, PartialEq)]
pub struct RectDescriptor {
    pub anchor_min: Vec2,
    pub anchor_max: Vec2,
    pub pivot: Vec2,
    pub position: Vec2,
    pub size: Vec2,
    pub rotation: f32,
}

impl Default for RectDescriptor {
    fn default() -> Self {
        Self {
            anchor_min: Vec2::splat(0.5),
            anchor_max: Vec2::splat(0.5),
            pivot: Vec2::splat(0.5),
            position: Vec2::ZERO,
            size: Vec2::new(100.0, 100.0),
            rotation: 0.0,
        }
    }
}

impl RectDescriptor {
    pub fn at(position: Vec2, size: Vec2) -> Self {
        Self { position, size, ..Self::default() }
    }

    pub fn stretched(&self) -> bool {
        self.anchor_min != self.anchor_max
    }
}

/// Weak reference to where an element is attached. Resolved by name at
/// generation time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ParentRef {
    #[default]
    Root,
    Layout(String),
    Element(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "left" | "start" => TextAlign::Left,
            "right" | "end" => TextAlign::Right,
            _ => TextAlign::Center,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ElementKind {
    Image { sprite: Option<String>, preserve_aspect: bool },
    Text { text: String, font_size: f32, align: TextAlign },
    Button { text: String, sprite: Option<String>, click: ActionList, selection: IVec2 },
    Event,
    PrefabInstance { prefab: String },
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Image { .. } => "Image",
            ElementKind::Text { .. } => "Text",
            ElementKind::Button { .. } => "Button",
            ElementKind::Event => "Event",
            ElementKind::PrefabInstance { .. } => "Prefab",
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ElementKind::Text { text, .. } | ElementKind::Button { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn sprite(&self) -> Option<&str> {
        match self {
            ElementKind::Image { sprite, .. } | ElementKind::Button { sprite, .. } => sprite.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ElementDescriptor {
    pub id: String,
    pub name: String,
    pub kind: ElementKind,
    pub parent: ParentRef,
    pub rect: RectDescriptor,
    pub color: usize,
    pub opacity: f32,
    pub length: f32,
    pub wait: bool,
    pub spawn_guard: ConditionSet,
    pub spawn_action: ActionList,
    /// Set on copies produced by `loop`; the first instance stays `false`.
    pub loop_copy: bool,
}

impl ElementDescriptor {
    pub fn new(id: impl Into<String>, kind: ElementKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            parent: ParentRef::Root,
            rect: RectDescriptor::default(),
            color: 0,
            opacity: 1.0,
            length: 0.0,
            wait: false,
            spawn_guard: ConditionSet::default(),
            spawn_action: ActionList::default(),
            loop_copy: false,
        }
    }

    pub fn text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Text { text: text.into(), font_size: 32.0, align: TextAlign::Center })
    }

    pub fn image(id: impl Into<String>, sprite: Option<String>) -> Self {
        Self::new(id, ElementKind::Image { sprite, preserve_aspect: false })
    }

    pub fn button(id: impl Into<String>, text: impl Into<String>, selection: IVec2, click: ActionList) -> Self {
        Self::new(id, ElementKind::Button { text: text.into(), sprite: None, click, selection })
    }

    pub fn event(id: impl Into<String>, action: ActionList) -> Self {
        let mut element = Self::new(id, ElementKind::Event);
        element.spawn_action = action;
        element
    }

    pub fn with_parent(mut self, parent: ParentRef) -> Self {
        self.parent = parent;
        self
    }

    pub fn with_rect(mut self, rect: RectDescriptor) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_spawn(mut self, length: f32, wait: bool) -> Self {
        self.length = length;
        self.wait = wait;
        self
    }

    pub fn with_guard(mut self, guard: ConditionSet) -> Self {
        self.spawn_guard = guard;
        self
    }

    pub fn with_spawn_action(mut self, action: ActionList) -> Self {
        self.spawn_action = action;
        self
    }

    pub fn with_color(mut self, slot: usize) -> Self {
        self.color = slot;
        self
    }

    pub fn is_visual(&self) -> bool {
        !matches!(self.kind, ElementKind::Event)
    }

    pub fn click(&self) -> Option<&ActionList> {
        match &self.kind {
            ElementKind::Button { click, .. } => Some(click),
            _ => None,
        }
    }

    pub fn selection(&self) -> Option<IVec2> {
        match &self.kind {
            ElementKind::Button { selection, .. } => Some(*selection),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MusicRef {
    pub name: String,
    pub fade: f32,
    pub looped: bool,
}

impl MusicRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fade: 1.0, looped: true }
    }
}

#[derive(Clone, Debug)]
pub struct MenuDescriptor {
    pub id: String,
    pub name: String,
    pub elements: Vec<ElementDescriptor>,
    pub layouts: BTreeMap<String, LayoutDescriptor>,
    pub music: Option<MusicRef>,
    pub exit: ActionList,
    pub default_select: IVec2,
    pub pause_game: bool,
    pub layer: i32,
    pub state: GenerationState,
    pub scope: VariableScope,
    pub theme: Option<Palette>,
    pub sprites: BTreeMap<String, String>,
    /// Named element fragments from the document, kept for runtime
    /// `AddElement` calls.
    pub prefabs: Map<String, Value>,
}

impl MenuDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            elements: Vec::new(),
            layouts: BTreeMap::new(),
            music: None,
            exit: ActionList::default(),
            default_select: IVec2::ZERO,
            pause_game: false,
            layer: 0,
            state: GenerationState::NotStarted,
            scope: VariableScope::new(),
            theme: None,
            sprites: BTreeMap::new(),
            prefabs: Map::new(),
        }
    }

    pub fn with_element(mut self, element: ElementDescriptor) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_layout(mut self, layout: LayoutDescriptor) -> Self {
        self.insert_layout(layout);
        self
    }

    /// First element with `id`; ids are not enforced unique.
    pub fn element(&self, id: &str) -> Option<&ElementDescriptor> {
        self.elements.iter().find(|element| element.id == id)
    }

    /// Drops the element named `id`, returning the index it held.
    pub fn remove_element(&mut self, id: &str) -> Option<usize> {
        let index = self.elements.iter().position(|element| element.id == id)?;
        self.elements.remove(index);
        Some(index)
    }

    pub fn layout(&self, name: &str) -> Option<&LayoutDescriptor> {
        self.layouts.get(name)
    }

    /// Registers a layout; a second layout with the same name is rejected.
    pub fn insert_layout(&mut self, layout: LayoutDescriptor) -> bool {
        if self.layouts.contains_key(&layout.name) {
            tracing::warn!("menu '{}' already has a layout named '{}'", self.id, layout.name);
            return false;
        }
        self.layouts.insert(layout.name.clone(), layout);
        true
    }

    pub fn buttons(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.elements.iter().filter(|element| matches!(element.kind, ElementKind::Button { .. }))
    }

    pub fn resolve_sprite<'a>(&'a self, sprite: &'a str) -> &'a str {
        self.sprites.get(sprite).map(String::as_str).unwrap_or(sprite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutKind;

    #[test]
    fn element_lookup_is_first_match() {
        let menu = MenuDescriptor::new("main")
            .with_element(ElementDescriptor::text("dup", "first"))
            .with_element(ElementDescriptor::text("dup", "second"));
        assert_eq!(menu.element("dup").and_then(|e| e.kind.text()), Some("first"));
    }

    #[test]
    fn layout_names_are_unique() {
        let mut menu = MenuDescriptor::new("main");
        assert!(menu.insert_layout(LayoutDescriptor::new("list", LayoutKind::Vertical)));
        assert!(!menu.insert_layout(LayoutDescriptor::new("list", LayoutKind::Horizontal)));
        assert_eq!(menu.layout("list").map(|l| l.kind.clone()), Some(LayoutKind::Vertical));
    }
}
