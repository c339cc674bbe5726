//! Built-in menu actions, dispatched by name.
//!
//! Handlers receive the runtime and an [`ActionCall`] whose parameters are
//! already resolved against the calling scope. Nested action lists inside
//! lazy keys (`action`, `on_complete`, ...) stay unresolved until they run,
//! and so do the positional slots a handler registers as deferred.

mod animation;
mod audio;
mod composite;
mod navigation;
mod presentation;
mod state;
mod timing;

pub use animation::{parse_keyframes, parse_tracks};

use crate::runtime::MenuRuntime;
use crate::scope::VariableScope;
use crate::stage::ElementKey;
use crate::value::{Params, Value};
use std::collections::HashMap;

pub type ActionHandler = fn(&mut MenuRuntime, &ActionCall<'_>);

pub struct ActionCall<'a> {
    pub name: &'a str,
    pub params: Value,
    pub context: Option<ElementKey>,
    pub scope: &'a VariableScope,
}

impl ActionCall<'_> {
    pub fn params(&self) -> Params<'_> {
        Params::new(&self.params)
    }
}

/// Positional parameters that hold nested actions or element nodes. They
/// resolve lazily, the same way their named keys do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeferredSlots {
    #[default]
    None,
    At(&'static [usize]),
    All,
}

impl DeferredSlots {
    pub fn contains(self, index: usize) -> bool {
        match self {
            DeferredSlots::None => false,
            DeferredSlots::At(slots) => slots.contains(&index),
            DeferredSlots::All => true,
        }
    }
}

#[derive(Clone, Copy)]
struct Entry {
    handler: ActionHandler,
    deferred: DeferredSlots,
}

pub struct ActionRegistry {
    handlers: HashMap<String, Entry>,
}

impl ActionRegistry {
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Adds or replaces a handler.
    pub fn register(&mut self, name: impl Into<String>, handler: ActionHandler) {
        self.register_deferred(name, handler, DeferredSlots::None);
    }

    /// Adds or replaces a handler whose `deferred` positional slots are
    /// left for the handler to run later.
    pub fn register_deferred(&mut self, name: impl Into<String>, handler: ActionHandler, deferred: DeferredSlots) {
        self.handlers.insert(name.into(), Entry { handler, deferred });
    }

    pub fn get(&self, name: &str) -> Option<ActionHandler> {
        self.handlers.get(name).map(|entry| entry.handler)
    }

    pub fn deferred_slots(&self, name: &str) -> DeferredSlots {
        self.handlers.get(name).map(|entry| entry.deferred).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        navigation::register(&mut registry);
        state::register(&mut registry);
        presentation::register(&mut registry);
        audio::register(&mut registry);
        timing::register(&mut registry);
        animation::register(&mut registry);
        composite::register(&mut registry);
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_covers_builtin_groups() {
        let registry = ActionRegistry::default();
        for name in ["OpenMenu", "UpdateSettingBool", "SetText", "PlaySound", "Wait", "AnimateID", "StopEffect", "Run"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(!registry.contains("Teleport"));
    }

    #[test]
    fn nested_action_slots_are_declared() {
        let registry = ActionRegistry::default();
        assert!(registry.deferred_slots("Wait").contains(1));
        assert!(!registry.deferred_slots("Wait").contains(0));
        assert!(registry.deferred_slots("AnimateID").contains(3));
        assert!(registry.deferred_slots("Run").contains(5));
        assert_eq!(registry.deferred_slots("SetText"), DeferredSlots::None);
        assert_eq!(registry.deferred_slots("Teleport"), DeferredSlots::None);
    }
}
