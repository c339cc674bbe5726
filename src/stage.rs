//! Live, materialized elements of the open menu.
//!
//! Elements and layouts are stored in owned maps and refer to each other by
//! key or name only, so removing one never leaves a dangling pointer behind.

use crate::action::ActionList;
use crate::animation::{Channel, TrackValue};
use crate::descriptor::{ElementDescriptor, ElementKind, RectDescriptor};
use crate::layout::LayoutDescriptor;
use glam::{IVec2, Vec2, Vec4};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementKey(u64);

impl ElementKey {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Where a live element or layout is attached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Container {
    #[default]
    Root,
    Layout(String),
    Element(ElementKey),
}

#[derive(Clone, Debug)]
pub struct LiveElement {
    pub key: ElementKey,
    pub id: String,
    pub name: String,
    pub kind: ElementKind,
    pub session: u64,
    pub container: Container,
    pub rect: RectDescriptor,
    pub position: Vec2,
    pub size: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
    pub color: Vec4,
    pub opacity: f32,
    pub text: String,
    /// Spawn progress in `[0, 1]`; drives text reveal and fade-in.
    pub reveal: f32,
    pub active: bool,
    pub focused: bool,
    spawn_elapsed: f32,
    spawn_length: f32,
    fresh: bool,
}

impl LiveElement {
    pub fn visible_text(&self) -> &str {
        let total = self.text.chars().count();
        let shown = (total as f32 * self.reveal.clamp(0.0, 1.0)).ceil() as usize;
        match self.text.char_indices().nth(shown) {
            Some((index, _)) => &self.text[..index],
            None => &self.text,
        }
    }

    pub fn spawning(&self) -> bool {
        self.reveal < 1.0
    }

    pub fn selection(&self) -> Option<IVec2> {
        match &self.kind {
            ElementKind::Button { selection, .. } => Some(*selection),
            _ => None,
        }
    }

    pub fn click(&self) -> Option<&ActionList> {
        match &self.kind {
            ElementKind::Button { click, .. } => Some(click),
            _ => None,
        }
    }

    pub fn read(&self, channel: Channel) -> TrackValue {
        match channel {
            Channel::PositionX => TrackValue::Scalar(self.position.x),
            Channel::PositionY => TrackValue::Scalar(self.position.y),
            Channel::Width => TrackValue::Scalar(self.size.x),
            Channel::Height => TrackValue::Scalar(self.size.y),
            Channel::Rotation => TrackValue::Scalar(self.rotation),
            Channel::Scale | Channel::ScaleX => TrackValue::Scalar(self.scale.x),
            Channel::ScaleY => TrackValue::Scalar(self.scale.y),
            Channel::Opacity => TrackValue::Scalar(self.opacity),
            Channel::Color => TrackValue::Color(self.color),
            Channel::Reveal => TrackValue::Scalar(self.reveal),
        }
    }

    pub fn write(&mut self, channel: Channel, value: TrackValue) {
        match (channel, value) {
            (Channel::Color, TrackValue::Color(color)) => self.color = color,
            (Channel::Color, TrackValue::Scalar(_)) => {}
            (_, TrackValue::Color(_)) => {}
            (channel, TrackValue::Scalar(v)) => match channel {
                Channel::PositionX => self.position.x = v,
                Channel::PositionY => self.position.y = v,
                Channel::Width => self.size.x = v,
                Channel::Height => self.size.y = v,
                Channel::Rotation => self.rotation = v,
                Channel::Scale => self.scale = Vec2::splat(v),
                Channel::ScaleX => self.scale.x = v,
                Channel::ScaleY => self.scale.y = v,
                Channel::Opacity => self.opacity = v.clamp(0.0, 1.0),
                Channel::Reveal => self.reveal = v.clamp(0.0, 1.0),
                Channel::Color => {}
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct LiveLayout {
    pub descriptor: LayoutDescriptor,
    pub session: u64,
    pub container: Container,
    pub scroll: Vec2,
}

#[derive(Default)]
pub struct Stage {
    elements: BTreeMap<ElementKey, LiveElement>,
    layouts: BTreeMap<String, LiveLayout>,
    next_key: u64,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Creates a live element from its descriptor. Spawn progress starts at
    /// zero unless `length` is not positive.
    pub fn spawn(
        &mut self,
        descriptor: &ElementDescriptor,
        session: u64,
        container: Container,
        color: Vec4,
    ) -> ElementKey {
        let key = ElementKey(self.next_key);
        self.next_key += 1;
        let length = if descriptor.length.is_finite() { descriptor.length.max(0.0) } else { f32::MAX };
        let element = LiveElement {
            key,
            id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            kind: descriptor.kind.clone(),
            session,
            container: container.clone(),
            rect: descriptor.rect.clone(),
            position: descriptor.rect.position,
            size: descriptor.rect.size,
            rotation: descriptor.rect.rotation,
            scale: Vec2::ONE,
            color,
            opacity: descriptor.opacity.clamp(0.0, 1.0),
            text: descriptor.kind.text().unwrap_or_default().to_string(),
            reveal: if length > 0.0 { 0.0 } else { 1.0 },
            active: true,
            focused: false,
            spawn_elapsed: 0.0,
            spawn_length: length,
            fresh: true,
        };
        self.elements.insert(key, element);
        if let Container::Layout(name) = container {
            self.relayout(&name);
        }
        key
    }

    pub fn get(&self, key: ElementKey) -> Option<&LiveElement> {
        self.elements.get(&key)
    }

    pub fn get_mut(&mut self, key: ElementKey) -> Option<&mut LiveElement> {
        self.elements.get_mut(&key)
    }

    /// First live element with `id`, in creation order.
    pub fn find(&self, id: &str) -> Option<ElementKey> {
        self.elements.values().find(|element| element.id == id).map(|element| element.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveElement> {
        self.elements.values()
    }

    pub fn keys(&self) -> Vec<ElementKey> {
        self.elements.keys().copied().collect()
    }

    /// Active buttons with their selection coordinates.
    pub fn buttons(&self) -> impl Iterator<Item = (ElementKey, IVec2)> + '_ {
        self.elements
            .values()
            .filter(|element| element.active)
            .filter_map(|element| element.selection().map(|selection| (element.key, selection)))
    }

    pub fn button_at(&self, selection: IVec2) -> Option<ElementKey> {
        self.buttons().find(|(_, position)| *position == selection).map(|(key, _)| key)
    }

    /// Removes an element and everything attached to it, including layouts
    /// hosted by any removed element. Returns the removed keys, children
    /// first.
    pub fn remove(&mut self, key: ElementKey) -> Vec<ElementKey> {
        let mut removed = Vec::new();
        self.remove_into(key, &mut removed);
        loop {
            let orphaned: Vec<String> = self
                .layouts
                .iter()
                .filter(|(_, layout)| matches!(layout.container, Container::Element(host) if removed.contains(&host)))
                .map(|(name, _)| name.clone())
                .collect();
            if orphaned.is_empty() {
                return removed;
            }
            for name in orphaned {
                self.layouts.remove(&name);
                for child in self.children_of_layout(&name) {
                    self.remove_into(child, &mut removed);
                }
            }
        }
    }

    fn remove_into(&mut self, key: ElementKey, removed: &mut Vec<ElementKey>) {
        let children: Vec<ElementKey> = self
            .elements
            .values()
            .filter(|element| element.container == Container::Element(key))
            .map(|element| element.key)
            .collect();
        for child in children {
            self.remove_into(child, removed);
        }
        if let Some(element) = self.elements.remove(&key) {
            removed.push(key);
            if let Container::Layout(name) = element.container {
                self.relayout(&name);
            }
        }
    }

    /// Drops every element and layout created by `session`.
    pub fn clear_session(&mut self, session: u64) -> Vec<ElementKey> {
        let keys: Vec<ElementKey> =
            self.elements.values().filter(|element| element.session == session).map(|element| element.key).collect();
        for key in &keys {
            self.elements.remove(key);
        }
        self.layouts.retain(|_, layout| layout.session != session);
        keys
    }

    pub fn clear(&mut self) -> Vec<ElementKey> {
        self.layouts.clear();
        let keys = self.keys();
        self.elements.clear();
        keys
    }

    pub fn insert_layout(&mut self, descriptor: LayoutDescriptor, session: u64, container: Container) {
        let name = descriptor.name.clone();
        self.layouts.insert(name, LiveLayout { descriptor, session, container, scroll: Vec2::ZERO });
    }

    pub fn layout(&self, name: &str) -> Option<&LiveLayout> {
        self.layouts.get(name)
    }

    pub fn layouts(&self) -> impl Iterator<Item = &LiveLayout> {
        self.layouts.values()
    }

    pub fn children_of_layout(&self, name: &str) -> Vec<ElementKey> {
        self.elements
            .values()
            .filter(|element| matches!(&element.container, Container::Layout(layout) if layout == name))
            .map(|element| element.key)
            .collect()
    }

    /// Sets (or offsets) a layout's scroll position and re-places its
    /// children. Returns `false` when the layout does not exist.
    pub fn scroll_layout(&mut self, name: &str, scroll: Vec2, relative: bool) -> bool {
        let Some(layout) = self.layouts.get_mut(name) else {
            return false;
        };
        layout.scroll = if relative { layout.scroll + scroll } else { scroll };
        self.relayout(name);
        true
    }

    /// Re-places the active children of a layout in creation order.
    pub fn relayout(&mut self, name: &str) -> Vec<ElementKey> {
        let Some(layout) = self.layouts.get(name) else {
            return Vec::new();
        };
        let children: Vec<ElementKey> = self
            .children_of_layout(name)
            .into_iter()
            .filter(|key| self.elements.get(key).is_some_and(|element| element.active))
            .collect();
        let sizes: Vec<Vec2> =
            children.iter().filter_map(|key| self.elements.get(key)).map(|element| element.rect.size).collect();
        let slots = layout.descriptor.arrange(&sizes);
        let scroll = layout.scroll;
        for (key, slot) in children.iter().zip(slots) {
            if let Some(element) = self.elements.get_mut(key) {
                element.position = slot.position - scroll;
                element.size = slot.size;
            }
        }
        children
    }

    /// Advances spawn presentation. Elements created since the previous
    /// call start revealing on the next one. Returns elements whose reveal
    /// changed.
    pub fn advance_spawns(&mut self, dt: f32) -> Vec<ElementKey> {
        let mut changed = Vec::new();
        for element in self.elements.values_mut() {
            if std::mem::take(&mut element.fresh) {
                continue;
            }
            if !element.spawning() || element.spawn_length <= 0.0 {
                continue;
            }
            element.spawn_elapsed += dt;
            element.reveal = (element.spawn_elapsed / element.spawn_length).clamp(0.0, 1.0);
            changed.push(element.key);
        }
        changed
    }

    pub fn set_active(&mut self, key: ElementKey, active: bool) -> bool {
        let Some(element) = self.elements.get_mut(&key) else {
            return false;
        };
        element.active = active;
        element.focused &= active;
        if let Container::Layout(name) = element.container.clone() {
            self.relayout(&name);
        }
        true
    }

    /// Direct children of `key` (not layouts).
    pub fn children_of(&self, key: ElementKey) -> Vec<ElementKey> {
        self.elements
            .values()
            .filter(|element| element.container == Container::Element(key))
            .map(|element| element.key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutKind;

    fn text(id: &str, length: f32) -> ElementDescriptor {
        ElementDescriptor::text(id, "Hello").with_spawn(length, false)
    }

    #[test]
    fn text_reveals_over_spawn_length() {
        let mut stage = Stage::new();
        let key = stage.spawn(&text("t", 1.0), 1, Container::Root, Vec4::ONE);
        assert!(stage.advance_spawns(0.5).is_empty(), "spawn frame does not count");
        assert_eq!(stage.get(key).map(|e| e.visible_text()), Some(""));
        stage.advance_spawns(0.5);
        assert_eq!(stage.get(key).map(|e| e.visible_text()), Some("Hel"));
        stage.advance_spawns(0.5);
        assert_eq!(stage.get(key).map(|e| e.visible_text()), Some("Hello"));
        assert!(stage.advance_spawns(0.5).is_empty());
    }

    #[test]
    fn removal_takes_children_along() {
        let mut stage = Stage::new();
        let parent = stage.spawn(&text("panel", 0.0), 1, Container::Root, Vec4::ONE);
        let child = stage.spawn(&text("label", 0.0), 1, Container::Element(parent), Vec4::ONE);
        let removed = stage.remove(parent);
        assert_eq!(removed, vec![child, parent]);
        assert!(stage.is_empty());
    }

    #[test]
    fn removal_drops_layouts_hosted_by_descendants() {
        let mut stage = Stage::new();
        let panel = stage.spawn(&text("panel", 0.0), 1, Container::Root, Vec4::ONE);
        let frame = stage.spawn(&text("frame", 0.0), 1, Container::Element(panel), Vec4::ONE);
        stage.insert_layout(LayoutDescriptor::new("list", LayoutKind::Vertical), 1, Container::Element(frame));
        let row = stage.spawn(&text("row", 0.0), 1, Container::Layout("list".into()), Vec4::ONE);
        stage.insert_layout(LayoutDescriptor::new("inner", LayoutKind::Horizontal), 1, Container::Element(row));
        let cell = stage.spawn(&text("cell", 0.0), 1, Container::Layout("inner".into()), Vec4::ONE);

        let removed = stage.remove(panel);
        for key in [panel, frame, row, cell] {
            assert!(removed.contains(&key));
        }
        assert!(stage.is_empty());
        assert_eq!(stage.layouts().count(), 0);
    }

    #[test]
    fn layout_children_follow_scroll() {
        let mut stage = Stage::new();
        let layout = LayoutDescriptor::new("list", LayoutKind::Vertical)
            .with_rect(RectDescriptor::at(Vec2::ZERO, Vec2::new(100.0, 300.0)));
        stage.insert_layout(layout, 1, Container::Root);
        let mut row = text("row", 0.0);
        row.rect.size = Vec2::new(100.0, 50.0);
        let first = stage.spawn(&row, 1, Container::Layout("list".into()), Vec4::ONE);
        let second = stage.spawn(&row, 1, Container::Layout("list".into()), Vec4::ONE);
        assert_eq!(stage.get(second).map(|e| e.position.y), Some(50.0));
        assert!(stage.scroll_layout("list", Vec2::new(0.0, 20.0), false));
        assert_eq!(stage.get(first).map(|e| e.position.y), Some(-20.0));
        assert!(!stage.scroll_layout("missing", Vec2::ZERO, true));
    }

    #[test]
    fn first_match_lookup_and_session_clear() {
        let mut stage = Stage::new();
        let a = stage.spawn(&text("same", 0.0), 1, Container::Root, Vec4::ONE);
        stage.spawn(&text("same", 0.0), 2, Container::Root, Vec4::ONE);
        assert_eq!(stage.find("same"), Some(a));
        assert_eq!(stage.clear_session(1), vec![a]);
        assert_eq!(stage.len(), 1);
    }
}
