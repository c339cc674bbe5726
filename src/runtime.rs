//! The menu runtime: owns the current menu and drives it one tick at a time.
//!
//! Everything runs on the caller's thread. Actions that must not run inside
//! an iteration (animation completions, fired timers) are queued and drained
//! at the end of [`MenuRuntime::tick`].

use crate::action::{Action, ActionList};
use crate::actions::{ActionCall, ActionRegistry};
use crate::animation::{
    AnimationRegistry, AnimationSequence, AnimationTrack, Channel, ChannelSink, ChannelTarget, Keyframe,
    SequenceId, TrackValue,
};
use crate::config::RuntimeConfig;
use crate::descriptor::{ElementDescriptor, ElementKind, GenerationState, MenuDescriptor, ParentRef};
use crate::easing::Easing;
use crate::events::{EventBus, MenuEvent, OperationKind};
use crate::generation::{Generation, GenerationStep};
use crate::library::MenuLibrary;
use crate::navigation::{initial_focus, step, Direction, NavOutcome};
use crate::parse::MenuParser;
use crate::predicate::ConditionSet;
use crate::resolve::{Query, Vocabulary};
use crate::scope::VariableScope;
use crate::services::{Services, VisualHost};
use crate::stage::{Container, ElementKey, LiveElement, Stage};
use crate::time::Clock;
use crate::value::Value;
use anyhow::{anyhow, Result};
use glam::{IVec2, Vec2, Vec4};
use std::collections::{BTreeMap, VecDeque};

pub const FOCUS_ANIMATION: &str = "focus";

struct ActiveMenu {
    descriptor: MenuDescriptor,
    session: u64,
    generation: Generation,
    focus: Option<IVec2>,
}

struct DeferredTimer {
    remaining: f32,
    session: Option<u64>,
    actions: ActionList,
    context: Option<ElementKey>,
    scope: VariableScope,
}

struct QueuedActions {
    actions: ActionList,
    context: Option<ElementKey>,
    scope: VariableScope,
    session: Option<u64>,
}

/// Routes animation output into live elements and effect parameters.
struct StageSink<'a> {
    stage: &'a mut Stage,
    visuals: &'a mut dyn VisualHost,
}

impl ChannelSink for StageSink<'_> {
    fn read(&self, target: &ChannelTarget) -> Option<TrackValue> {
        match target {
            ChannelTarget::Element { key, channel } => self.stage.get(*key).map(|element| element.read(*channel)),
            ChannelTarget::Effect(name) => self.visuals.effect(name).map(TrackValue::Scalar),
        }
    }

    fn write(&mut self, target: &ChannelTarget, value: TrackValue) {
        match target {
            ChannelTarget::Element { key, channel } => {
                if let Some(element) = self.stage.get_mut(*key) {
                    element.write(*channel, value);
                    self.visuals.update(element);
                }
            }
            ChannelTarget::Effect(name) => {
                if let Some(value) = value.as_scalar() {
                    self.visuals.set_effect(name, value);
                }
            }
        }
    }
}

pub struct MenuRuntime {
    config: RuntimeConfig,
    pub services: Services,
    vocabulary: Vocabulary,
    actions: ActionRegistry,
    library: Option<MenuLibrary>,
    menus: BTreeMap<String, MenuDescriptor>,
    current: Option<ActiveMenu>,
    next_session: u64,
    stage: Stage,
    animations: AnimationRegistry,
    timers: Vec<DeferredTimer>,
    queue: VecDeque<QueuedActions>,
    events: EventBus,
    variables: VariableScope,
    clock: Clock,
}

impl MenuRuntime {
    pub fn new(config: RuntimeConfig, services: Services) -> Self {
        Self {
            config,
            services,
            vocabulary: Vocabulary::default(),
            actions: ActionRegistry::default(),
            library: None,
            menus: BTreeMap::new(),
            current: None,
            next_session: 1,
            stage: Stage::new(),
            animations: AnimationRegistry::new(),
            timers: Vec::new(),
            queue: VecDeque::new(),
            events: EventBus::default(),
            variables: VariableScope::new(),
            clock: Clock::new(),
        }
    }

    pub fn headless() -> Self {
        Self::new(RuntimeConfig::default(), Services::headless())
    }

    pub fn with_library(mut self, library: MenuLibrary) -> Self {
        self.library = Some(library);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn animations(&self) -> &AnimationRegistry {
        &self.animations
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut self.vocabulary
    }

    pub fn actions_mut(&mut self) -> &mut ActionRegistry {
        &mut self.actions
    }

    pub fn variables(&self) -> &VariableScope {
        &self.variables
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<MenuEvent> {
        self.events.drain()
    }

    pub fn emit(&mut self, event: MenuEvent) {
        self.events.push(event);
    }

    pub fn pending_actions(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    // ---------------------------------------------------------------- menus

    pub fn register_menu(&mut self, descriptor: MenuDescriptor) {
        tracing::debug!("registered menu '{}'", descriptor.id);
        self.menus.insert(descriptor.id.clone(), descriptor);
    }

    pub fn menu(&self, id: &str) -> Option<&MenuDescriptor> {
        self.menus.get(id)
    }

    pub fn menu_ids(&self) -> impl Iterator<Item = &str> {
        self.menus.keys().map(String::as_str)
    }

    pub fn current_menu(&self) -> Option<&MenuDescriptor> {
        self.current.as_ref().map(|active| &active.descriptor)
    }

    pub fn current_session(&self) -> Option<u64> {
        self.current.as_ref().map(|active| active.session)
    }

    pub fn generation_state(&self) -> Option<GenerationState> {
        self.current.as_ref().map(|active| active.generation.state())
    }

    /// Parser bound to this runtime's vocabulary, services and globals.
    pub fn parser(&self) -> MenuParser<'_> {
        MenuParser::new(&self.vocabulary, &self.services, &self.stage).with_globals(self.variables.clone())
    }

    /// Parses a document and registers it without opening it.
    pub fn load_document(&mut self, text: &str, fallback_id: &str) -> Result<String> {
        let descriptor = self.parser().parse_str(text, fallback_id)?;
        let id = descriptor.id.clone();
        self.register_menu(descriptor);
        Ok(id)
    }

    /// Opens a registered menu, falling back to the library.
    pub fn open_menu(&mut self, id: &str) -> bool {
        if let Some(descriptor) = self.menus.get(id).cloned() {
            self.open_descriptor(descriptor);
            return true;
        }
        match self.load_menu(id) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("cannot open menu '{id}': {err:#}");
                false
            }
        }
    }

    /// Loads a menu document from the library, registers it and opens it.
    pub fn load_menu(&mut self, name: &str) -> Result<()> {
        let library = self.library.as_mut().ok_or_else(|| anyhow!("no menu library configured"))?;
        if library.find(name).is_none() {
            library.refresh()?;
        }
        let descriptor = match &self.library {
            Some(library) => {
                let parser = MenuParser::new(&self.vocabulary, &self.services, &self.stage)
                    .with_globals(self.variables.clone());
                library.load(name, &parser)?
            }
            None => return Err(anyhow!("no menu library configured")),
        };
        self.open_descriptor(descriptor);
        Ok(())
    }

    /// Makes `descriptor` the current menu. The previous menu is torn down
    /// first; generation begins on the next tick.
    pub fn open_descriptor(&mut self, mut descriptor: MenuDescriptor) -> u64 {
        self.teardown_current();
        let session = self.next_session;
        self.next_session += 1;
        descriptor.state = GenerationState::NotStarted;
        self.menus.insert(descriptor.id.clone(), descriptor.clone());

        for layout in descriptor.layouts.values() {
            let container = match &layout.parent {
                ParentRef::Layout(name) if descriptor.layouts.contains_key(name) => Container::Layout(name.clone()),
                ParentRef::Root => Container::Root,
                other => {
                    tracing::debug!("layout '{}' parent {other:?} not available, attaching to root", layout.name);
                    Container::Root
                }
            };
            self.stage.insert_layout(layout.clone(), session, container);
        }
        if descriptor.pause_game {
            self.services.host.set_paused(true);
        }
        if let Some(music) = &descriptor.music {
            if self.services.audio.current_music() != Some(music.name.as_str()) {
                self.services.audio.play_music(&music.name, music.fade, music.looped);
                self.events.push(MenuEvent::MusicRequested {
                    name: music.name.clone(),
                    fade: music.fade,
                    looped: music.looped,
                });
            }
        }
        tracing::info!("opening menu '{}' (session {session})", descriptor.id);
        self.events.push(MenuEvent::MenuOpened { id: descriptor.id.clone(), session });
        self.current = Some(ActiveMenu {
            generation: Generation::new(session, self.clock.frame()),
            descriptor,
            session,
            focus: None,
        });
        session
    }

    pub fn close_menu(&mut self) -> bool {
        let closed = self.current.is_some();
        self.teardown_current();
        closed
    }

    /// Forgets every registered menu. The current menu keeps running.
    pub fn clear_menus(&mut self) {
        tracing::info!("clearing {} registered menus", self.menus.len());
        self.menus.clear();
    }

    /// Runs the current menu's exit action.
    pub fn run_exit(&mut self) {
        let Some(exit) = self.current.as_ref().map(|active| active.descriptor.exit.clone()) else {
            return;
        };
        if exit.is_empty() {
            tracing::debug!("current menu has no exit action");
            return;
        }
        self.execute(&exit, None);
    }

    /// Stops the current menu's animations, cancels its timers and queued
    /// work, then destroys its elements.
    fn teardown_current(&mut self) {
        let Some(mut active) = self.current.take() else {
            return;
        };
        let session = active.session;
        if matches!(active.generation.state(), GenerationState::NotStarted | GenerationState::Generating) {
            tracing::info!(
                "menu '{}' superseded during generation at element {}",
                active.descriptor.id,
                active.generation.cursor()
            );
            self.events.push(MenuEvent::GenerationSuperseded {
                id: active.descriptor.id.clone(),
                session,
                cursor: active.generation.cursor(),
            });
        }
        active.generation.close();
        let stopped = self.animations.stop_owned(session);
        self.timers.retain(|timer| timer.session != Some(session));
        self.queue.retain(|entry| entry.session != Some(session));
        for key in self.stage.clear_session(session) {
            self.services.visuals.despawn(key);
        }
        if active.descriptor.pause_game {
            self.services.host.set_paused(false);
        }
        if let Some(stored) = self.menus.get_mut(&active.descriptor.id) {
            stored.state = GenerationState::Closed;
        }
        tracing::debug!("closed menu '{}' ({stopped} animations stopped)", active.descriptor.id);
        self.events.push(MenuEvent::MenuClosed { id: active.descriptor.id, session });
    }

    // ----------------------------------------------------------------- tick

    /// Advances the runtime by `dt` seconds: clock, timers, generation,
    /// spawn presentation, animations, then the action queue.
    pub fn tick(&mut self, dt: f32) {
        self.clock.tick(dt);
        let dt = self.clock.delta_seconds();
        self.advance_timers(dt);
        self.advance_generation();
        for key in self.stage.advance_spawns(dt) {
            if let Some(element) = self.stage.get(key) {
                self.services.visuals.update(element);
            }
        }
        let completions = {
            let mut sink = StageSink { stage: &mut self.stage, visuals: self.services.visuals.as_mut() };
            self.animations.tick(dt, &mut sink)
        };
        for completion in completions {
            self.events.push(MenuEvent::AnimationCompleted { name: completion.name.clone() });
            let scope = self.scope();
            self.queue.push_back(QueuedActions {
                actions: completion.actions,
                context: completion.context,
                scope,
                session: completion.owner,
            });
        }
        self.drain_queue();
    }

    fn advance_timers(&mut self, dt: f32) {
        if self.timers.is_empty() {
            return;
        }
        let mut pending = Vec::with_capacity(self.timers.len());
        for mut timer in self.timers.drain(..) {
            timer.remaining -= dt;
            if timer.remaining <= 0.0 {
                self.queue.push_back(QueuedActions {
                    actions: timer.actions,
                    context: timer.context,
                    scope: timer.scope,
                    session: timer.session,
                });
            } else {
                pending.push(timer);
            }
        }
        self.timers = pending;
    }

    fn drain_queue(&mut self) {
        let budget = self.config.max_actions_per_tick.max(1);
        let mut processed = 0;
        while processed < budget {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            self.run_list(&entry.actions, entry.context, &entry.scope);
            processed += 1;
        }
        if !self.queue.is_empty() {
            tracing::debug!("{} queued action lists carried to the next tick", self.queue.len());
            self.events.push(MenuEvent::ActionsDeferred { remaining: self.queue.len() });
        }
    }

    fn advance_generation(&mut self) {
        let now = self.clock.elapsed_seconds();
        let frame = self.clock.frame();
        loop {
            let Some(active) = self.current.as_mut() else {
                return;
            };
            let session = active.session;
            let len = active.descriptor.elements.len();
            match active.generation.next(now, frame, len) {
                GenerationStep::Idle => return,
                GenerationStep::Finished => {
                    active.descriptor.state = GenerationState::Open;
                    let id = active.descriptor.id.clone();
                    if let Some(stored) = self.menus.get_mut(&id) {
                        stored.state = GenerationState::Open;
                    }
                    tracing::debug!("menu '{id}' generated");
                    self.events.push(MenuEvent::MenuGenerated { id, session });
                    self.refocus();
                    return;
                }
                GenerationStep::Element(index) => {
                    active.descriptor.state = GenerationState::Generating;
                    let element = active.descriptor.elements[index].clone();
                    self.generate_element(&element, session);
                    if self.current_session() != Some(session) {
                        return;
                    }
                }
            }
        }
    }

    fn generate_element(&mut self, element: &ElementDescriptor, session: u64) {
        if !element.spawn_guard.is_empty() && !self.evaluate(&element.spawn_guard, None) {
            tracing::debug!("element '{}' skipped by its spawn condition", element.id);
            return;
        }
        if matches!(element.kind, ElementKind::Event) {
            let action = element.spawn_action.clone();
            self.execute(&action, None);
            if element.wait {
                self.suspend_generation(session, element.length);
            }
            return;
        }
        let key = self.materialize(element, session);
        if element.wait {
            self.suspend_generation(session, element.length);
        }
        if !element.spawn_action.is_empty() {
            let action = element.spawn_action.clone();
            self.execute(&action, Some(key));
        }
    }

    fn suspend_generation(&mut self, session: u64, seconds: f32) {
        let now = self.clock.elapsed_seconds();
        if let Some(active) = self.current.as_mut().filter(|active| active.session == session) {
            active.generation.suspend(now, seconds);
        }
    }

    /// Creates the live element and its visual. Unresolvable parents fall
    /// back to the root container.
    fn materialize(&mut self, element: &ElementDescriptor, session: u64) -> ElementKey {
        let container = self.resolve_container(&element.parent);
        let color = self.theme_color(element.color);
        let key = self.stage.spawn(element, session, container, color);
        let sprite = element.kind.sprite().map(|name| match self.current.as_ref() {
            Some(active) => active.descriptor.resolve_sprite(name).to_string(),
            None => name.to_string(),
        });
        if let Some(live) = self.stage.get(key) {
            if let Err(err) = self.services.visuals.spawn(live, sprite.as_deref()) {
                tracing::warn!("visual for element '{}' failed: {err:#}", element.id);
            }
        }
        self.events.push(MenuEvent::ElementSpawned { key, id: element.id.clone() });
        key
    }

    fn resolve_container(&self, parent: &ParentRef) -> Container {
        match parent {
            ParentRef::Root => Container::Root,
            ParentRef::Layout(name) => {
                if self.stage.layout(name).is_some() {
                    Container::Layout(name.clone())
                } else {
                    tracing::warn!("layout '{name}' not found, attaching to root");
                    Container::Root
                }
            }
            ParentRef::Element(id) => match self.stage.find(id) {
                Some(key) => Container::Element(key),
                None => {
                    tracing::warn!("parent element '{id}' not found, attaching to root");
                    Container::Root
                }
            },
        }
    }

    fn theme_color(&self, slot: usize) -> Vec4 {
        self.current
            .as_ref()
            .and_then(|active| active.descriptor.theme.as_ref())
            .and_then(|palette| palette.get(slot))
            .unwrap_or_else(|| self.services.theme.color(slot))
    }

    // -------------------------------------------------------------- actions

    fn scope(&self) -> VariableScope {
        match &self.current {
            Some(active) => active
                .descriptor
                .scope
                .extend_many(self.variables.iter().map(|(name, value)| (name.clone(), value.clone()))),
            None => self.variables.clone(),
        }
    }

    /// `base` with the runtime variables laid over it. Bindings that are
    /// not runtime variables, such as loop indices, pass through.
    fn live_scope(&self, base: &VariableScope) -> VariableScope {
        if self.variables.is_empty() {
            return base.clone();
        }
        base.extend_many(self.variables.iter().map(|(name, value)| (name.clone(), value.clone())))
    }

    fn query<'a>(&'a self, scope: &'a VariableScope, context: Option<ElementKey>) -> Query<'a> {
        Query {
            vocabulary: &self.vocabulary,
            services: &self.services,
            stage: &self.stage,
            scope,
            menu_id: self.current.as_ref().map(|active| active.descriptor.id.as_str()),
            context,
        }
    }

    /// Runs an action list now, in order, against the current menu scope.
    pub fn execute(&mut self, actions: &ActionList, context: Option<ElementKey>) {
        let scope = self.scope();
        self.run_list(actions, context, &scope);
    }

    /// Evaluates a condition set against live state.
    pub fn evaluate(&mut self, conditions: &ConditionSet, context: Option<ElementKey>) -> bool {
        self.report_unknown_predicates(conditions);
        let scope = self.scope();
        self.query(&scope, context).evaluate(conditions)
    }

    /// Queues an action list for the end of the current (or next) tick.
    pub fn enqueue(&mut self, actions: ActionList, context: Option<ElementKey>) {
        let scope = self.scope();
        let session = self.current_session();
        self.queue.push_back(QueuedActions { actions, context, scope, session });
    }

    pub(crate) fn run_list(&mut self, actions: &ActionList, context: Option<ElementKey>, scope: &VariableScope) {
        for action in actions.iter() {
            self.run_action(action, context, scope);
        }
    }

    fn run_action(&mut self, action: &Action, context: Option<ElementKey>, scope: &VariableScope) {
        self.report_unknown_predicates(&action.guard);
        // Earlier siblings may have set variables since `scope` was taken.
        let scope = &self.live_scope(scope);
        let (allowed, params) = {
            let query = self.query(scope, context);
            let deferred = self.actions.deferred_slots(&action.name);
            (query.evaluate(&action.guard), query.resolve_params(&action.params, deferred))
        };
        if !allowed {
            tracing::debug!("action '{}' skipped by its guard", action.name);
            return;
        }
        let Some(handler) = self.actions.get(&action.name) else {
            tracing::warn!("unknown action '{}'", action.name);
            self.events.push(MenuEvent::UnknownOperation { kind: OperationKind::Action, name: action.name.clone() });
            return;
        };
        tracing::debug!("action '{}' {}", action.name, params);
        handler(self, &ActionCall { name: &action.name, params, context, scope });
    }

    fn report_unknown_predicates(&mut self, conditions: &ConditionSet) {
        for condition in conditions.iter() {
            if !self.vocabulary.predicates.contains(&condition.name) {
                self.events.push(MenuEvent::UnknownOperation {
                    kind: OperationKind::Predicate,
                    name: condition.name.clone(),
                });
            }
        }
    }

    /// Defers `actions` by `seconds`. The timer belongs to the current menu
    /// session and dies with it.
    pub fn schedule(
        &mut self,
        seconds: f32,
        actions: ActionList,
        context: Option<ElementKey>,
        scope: VariableScope,
    ) {
        let session = self.current_session();
        if seconds.is_nan() || seconds <= 0.0 {
            self.queue.push_back(QueuedActions { actions, context, scope, session });
            return;
        }
        self.timers.push(DeferredTimer { remaining: seconds, session, actions, context, scope });
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.set(name, value);
    }

    // ------------------------------------------------------------- elements

    /// `id` when given, otherwise the context element.
    pub fn target(&self, id: Option<&str>, context: Option<ElementKey>) -> Option<ElementKey> {
        match id {
            Some(id) => self.stage.find(id),
            None => context,
        }
    }

    pub fn set_text(&mut self, key: ElementKey, text: String) -> bool {
        self.update_element(key, |element| element.text = text)
    }

    pub fn set_color(&mut self, key: ElementKey, color: Vec4) -> bool {
        self.update_element(key, |element| element.color = color)
    }

    pub fn set_opacity(&mut self, key: ElementKey, opacity: f32) -> bool {
        self.update_element(key, |element| element.opacity = opacity.clamp(0.0, 1.0))
    }

    fn update_element(&mut self, key: ElementKey, apply: impl FnOnce(&mut LiveElement)) -> bool {
        let Some(element) = self.stage.get_mut(key) else {
            return false;
        };
        apply(element);
        self.services.visuals.update(element);
        true
    }

    pub fn set_element_active(&mut self, key: ElementKey, active: bool) -> bool {
        if !self.stage.set_active(key, active) {
            return false;
        }
        if let Some(element) = self.stage.get(key) {
            self.services.visuals.update(element);
        }
        self.refocus_if_lost();
        true
    }

    pub fn theme_slot(&self, slot: usize) -> Vec4 {
        self.theme_color(slot)
    }

    /// Parses element nodes under the current scope and adds them to the
    /// current menu. Before the menu is open they join the generation list;
    /// afterwards they are materialized immediately.
    pub fn add_elements(&mut self, node: &Value, parent: Option<ParentRef>) -> usize {
        let Some(active) = self.current.as_ref() else {
            tracing::debug!("no current menu to add elements to");
            return 0;
        };
        let scope = self.scope();
        let mut elements = MenuParser::new(&self.vocabulary, &self.services, &self.stage).parse_elements(
            node,
            &scope,
            &active.descriptor.id,
            &active.descriptor.prefabs,
        );
        if let Some(parent) = parent {
            for element in elements.iter_mut().filter(|element| element.parent == ParentRef::Root) {
                element.parent = parent.clone();
            }
        }
        let count = elements.len();
        let Some(active) = self.current.as_mut() else {
            return 0;
        };
        let session = active.session;
        let open = active.generation.state() == GenerationState::Open;
        active.descriptor.elements.extend(elements.iter().cloned());
        if open {
            for element in &elements {
                self.generate_element(element, session);
                if self.current_session() != Some(session) {
                    break;
                }
            }
            self.refocus_if_lost();
        }
        count
    }

    /// Removes the first element with `id`, everything attached to it and
    /// the animations driving them.
    pub fn remove_element(&mut self, id: &str) -> bool {
        let Some(key) = self.stage.find(id) else {
            return false;
        };
        for removed in self.stage.remove(key) {
            for sequence in self.animations.sequences_targeting(removed) {
                self.animations.stop(sequence, false);
            }
            self.services.visuals.despawn(removed);
            self.events.push(MenuEvent::ElementRemoved { key: removed });
        }
        if let Some(active) = self.current.as_mut() {
            if let Some(index) = active.descriptor.remove_element(id) {
                active.generation.element_removed(index);
            }
        }
        self.refocus_if_lost();
        true
    }

    pub fn scroll_layout(&mut self, name: &str, scroll: Vec2, relative: bool) -> bool {
        if !self.stage.scroll_layout(name, scroll, relative) {
            return false;
        }
        for key in self.stage.children_of_layout(name) {
            if let Some(element) = self.stage.get(key) {
                self.services.visuals.update(element);
            }
        }
        true
    }

    // ----------------------------------------------------------- animation

    /// Registers a sequence. A running sequence with the same context
    /// element and name is replaced.
    pub fn play_animation(&mut self, sequence: AnimationSequence) -> SequenceId {
        if let Some(context) = sequence.context {
            if let Some(existing) = self.animations.find(context, &sequence.name) {
                self.animations.stop(existing, false);
            }
        }
        self.events.push(MenuEvent::AnimationStarted { name: sequence.name.clone(), context: sequence.context });
        let mut sink = StageSink { stage: &mut self.stage, visuals: self.services.visuals.as_mut() };
        self.animations.play(sequence, &mut sink)
    }

    /// Stops sequences touching `key` (optionally only those named `name`).
    /// With `complete`, their completion actions run immediately.
    pub fn stop_animations(&mut self, key: ElementKey, name: Option<&str>, complete: bool) -> usize {
        let ids: Vec<SequenceId> = self
            .animations
            .sequences_targeting(key)
            .into_iter()
            .filter(|id| name.is_none() || self.animations.get(*id).map(|s| s.name.as_str()) == name)
            .collect();
        let count = ids.len();
        for id in ids {
            if let Some(completion) = self.animations.stop(id, complete) {
                self.events.push(MenuEvent::AnimationCompleted { name: completion.name.clone() });
                self.execute(&completion.actions, completion.context);
            }
        }
        count
    }

    /// Stops sequences driving the named effect parameter.
    pub fn stop_effect(&mut self, effect: &str, complete: bool) -> usize {
        let ids: Vec<SequenceId> = self
            .animations
            .iter()
            .filter(|(_, sequence)| {
                sequence
                    .tracks
                    .iter()
                    .any(|track| matches!(&track.target, ChannelTarget::Effect(name) if name == effect))
            })
            .map(|(id, _)| id)
            .collect();
        let count = ids.len();
        for id in ids {
            if let Some(completion) = self.animations.stop(id, complete) {
                self.execute(&completion.actions, completion.context);
            }
        }
        count
    }

    // ----------------------------------------------------------- navigation

    pub fn focus(&self) -> Option<IVec2> {
        self.current.as_ref().and_then(|active| active.focus)
    }

    pub fn focused_element(&self) -> Option<ElementKey> {
        self.focus().and_then(|focus| self.stage.button_at(focus))
    }

    fn button_coordinates(&self) -> Vec<IVec2> {
        self.stage.buttons().map(|(_, selection)| selection).collect()
    }

    /// Moves focus one step. Only an open menu navigates.
    pub fn navigate(&mut self, direction: Direction) -> NavOutcome {
        let Some(active) = self.current.as_ref() else {
            return NavOutcome::Inactive;
        };
        if active.generation.state() != GenerationState::Open {
            return NavOutcome::Inactive;
        }
        let buttons = self.button_coordinates();
        let Some(from) = active.focus else {
            return match initial_focus(&buttons, active.descriptor.default_select) {
                Some(to) => {
                    self.set_focus(to);
                    NavOutcome::Moved { from: to, to }
                }
                None => {
                    self.events.push(MenuEvent::NavigationBlocked { at: IVec2::ZERO, direction: direction.offset() });
                    NavOutcome::Blocked { at: IVec2::ZERO }
                }
            };
        };
        match step(&buttons, from, direction) {
            Some(to) => {
                self.set_focus(to);
                NavOutcome::Moved { from, to }
            }
            None => {
                tracing::debug!("navigation {direction:?} blocked at {from}");
                self.events.push(MenuEvent::NavigationBlocked { at: from, direction: direction.offset() });
                NavOutcome::Blocked { at: from }
            }
        }
    }

    /// Focuses the button at `to`. Returns `false` when none is there.
    pub fn set_focus(&mut self, to: IVec2) -> bool {
        let Some(new_key) = self.stage.button_at(to) else {
            return false;
        };
        let Some(active) = self.current.as_mut() else {
            return false;
        };
        let session = active.session;
        let from = active.focus.replace(to);
        if from == Some(to) {
            return true;
        }
        if let Some(old_key) = from.and_then(|coordinate| self.stage.button_at(coordinate)) {
            self.apply_focus(old_key, false, session);
        }
        self.apply_focus(new_key, true, session);
        self.events.push(MenuEvent::FocusChanged { from, to });
        true
    }

    fn apply_focus(&mut self, key: ElementKey, focused: bool, session: u64) {
        if let Some(element) = self.stage.get_mut(key) {
            element.focused = focused;
        }
        let target = if focused { self.config.focus_scale } else { 1.0 };
        let track = AnimationTrack::new(
            ChannelTarget::Element { key, channel: Channel::Scale },
            vec![
                Keyframe::new(0.0, TrackValue::Scalar(0.0)).relative(true),
                Keyframe::new(self.config.focus_duration.max(0.0), TrackValue::Scalar(target))
                    .eased(Easing::from_name("OutQuad")),
            ],
        );
        let sequence = AnimationSequence::new(FOCUS_ANIMATION)
            .with_context(Some(key))
            .owned_by(Some(session))
            .with_track(track);
        self.play_animation(sequence);
    }

    fn refocus(&mut self) {
        let Some(default_select) = self.current.as_ref().map(|active| active.descriptor.default_select) else {
            return;
        };
        if let Some(to) = initial_focus(&self.button_coordinates(), default_select) {
            self.set_focus(to);
        }
    }

    fn refocus_if_lost(&mut self) {
        let Some(active) = self.current.as_mut() else {
            return;
        };
        if active.generation.state() != GenerationState::Open {
            return;
        }
        if let Some(focus) = active.focus {
            if self.stage.button_at(focus).is_some() {
                return;
            }
            active.focus = None;
        }
        self.refocus();
    }

    /// Clicks the focused button.
    pub fn submit(&mut self) -> bool {
        match self.focused_element() {
            Some(key) => self.click_key(key),
            None => false,
        }
    }

    /// Clicks the first active button with `id`.
    pub fn click(&mut self, id: &str) -> bool {
        match self.stage.find(id) {
            Some(key) => self.click_key(key),
            None => false,
        }
    }

    fn click_key(&mut self, key: ElementKey) -> bool {
        let Some(element) = self.stage.get(key).filter(|element| element.active) else {
            return false;
        };
        let Some(click) = element.click().filter(|click| !click.is_empty()).cloned() else {
            return false;
        };
        self.events.push(MenuEvent::Clicked { key, id: element.id.clone() });
        self.execute(&click, Some(key));
        true
    }
}
