use crate::stage::ElementKey;
use glam::IVec2;
use std::fmt;

/// Observable outcome of running menus. Hosts drain these once per frame.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuEvent {
    MenuOpened { id: String, session: u64 },
    MenuGenerated { id: String, session: u64 },
    MenuClosed { id: String, session: u64 },
    GenerationSuperseded { id: String, session: u64, cursor: usize },
    ElementSpawned { key: ElementKey, id: String },
    ElementRemoved { key: ElementKey },
    FocusChanged { from: Option<IVec2>, to: IVec2 },
    NavigationBlocked { at: IVec2, direction: IVec2 },
    Clicked { key: ElementKey, id: String },
    SoundRequested { name: String, volume: f32 },
    MusicRequested { name: String, fade: f32, looped: bool },
    MusicStopped { fade: f32 },
    SceneRequested { name: String },
    QuitRequested,
    AnimationStarted { name: String, context: Option<ElementKey> },
    AnimationCompleted { name: String },
    UnknownOperation { kind: OperationKind, name: String },
    ActionsDeferred { remaining: usize },
    Log { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Action,
    Predicate,
    Function,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Action => write!(f, "action"),
            OperationKind::Predicate => write!(f, "predicate"),
            OperationKind::Function => write!(f, "function"),
        }
    }
}

impl fmt::Display for MenuEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuEvent::MenuOpened { id, session } => write!(f, "MenuOpened id={id} session={session}"),
            MenuEvent::MenuGenerated { id, session } => write!(f, "MenuGenerated id={id} session={session}"),
            MenuEvent::MenuClosed { id, session } => write!(f, "MenuClosed id={id} session={session}"),
            MenuEvent::GenerationSuperseded { id, session, cursor } => {
                write!(f, "GenerationSuperseded id={id} session={session} cursor={cursor}")
            }
            MenuEvent::ElementSpawned { key, id } => write!(f, "ElementSpawned key={} id={id}", key.raw()),
            MenuEvent::ElementRemoved { key } => write!(f, "ElementRemoved key={}", key.raw()),
            MenuEvent::FocusChanged { from, to } => match from {
                Some(from) => write!(f, "FocusChanged from=({}, {}) to=({}, {})", from.x, from.y, to.x, to.y),
                None => write!(f, "FocusChanged to=({}, {})", to.x, to.y),
            },
            MenuEvent::NavigationBlocked { at, direction } => {
                write!(f, "NavigationBlocked at=({}, {}) direction=({}, {})", at.x, at.y, direction.x, direction.y)
            }
            MenuEvent::Clicked { key, id } => write!(f, "Clicked key={} id={id}", key.raw()),
            MenuEvent::SoundRequested { name, volume } => write!(f, "SoundRequested name={name} volume={volume:.2}"),
            MenuEvent::MusicRequested { name, fade, looped } => {
                write!(f, "MusicRequested name={name} fade={fade:.2} loop={looped}")
            }
            MenuEvent::MusicStopped { fade } => write!(f, "MusicStopped fade={fade:.2}"),
            MenuEvent::SceneRequested { name } => write!(f, "SceneRequested name={name}"),
            MenuEvent::QuitRequested => write!(f, "QuitRequested"),
            MenuEvent::AnimationStarted { name, context } => match context {
                Some(key) => write!(f, "AnimationStarted name={name} context={}", key.raw()),
                None => write!(f, "AnimationStarted name={name}"),
            },
            MenuEvent::AnimationCompleted { name } => write!(f, "AnimationCompleted name={name}"),
            MenuEvent::UnknownOperation { kind, name } => write!(f, "UnknownOperation {kind} name={name}"),
            MenuEvent::ActionsDeferred { remaining } => write!(f, "ActionsDeferred remaining={remaining}"),
            MenuEvent::Log { message } => write!(f, "Log {message}"),
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    events: Vec<MenuEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: MenuEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<MenuEvent> {
        self.events.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MenuEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
