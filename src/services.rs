//! Collaborator interfaces the interpreter consumes, plus headless
//! implementations used by tests, tools and the demo binary.

use crate::audio::AudioManager;
use crate::stage::{ElementKey, LiveElement};
use crate::value::{as_bool, as_f32, as_i64, Value};
use anyhow::{Context, Result};
use glam::Vec4;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted key/value settings.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).as_ref().and_then(as_bool)
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).as_ref().and_then(as_i64)
    }

    fn get_float(&self, key: &str) -> Option<f32> {
        self.get(key).as_ref().and_then(as_f32)
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|value| value.as_str().map(str::to_string))
    }
}

/// Per-profile save data.
pub trait SaveStore {
    fn active_profile(&self) -> u32;
    fn load(&self, profile: u32, key: &str) -> Option<Value>;
    fn save(&mut self, profile: u32, key: &str, value: Value);
}

pub trait AudioService {
    fn play_sound(&mut self, name: &str, volume: f32);
    fn play_music(&mut self, name: &str, fade: f32, looped: bool);
    fn stop_music(&mut self, fade: f32);
    fn pause_music(&mut self, paused: bool);
    fn current_music(&self) -> Option<&str>;
}

/// Scene/navigation host of the game.
pub trait SceneHost {
    fn current_scene(&self) -> &str;
    fn load_scene(&mut self, name: &str);
    fn set_paused(&mut self, paused: bool);
    fn quit(&mut self);
}

/// Resolves a color slot against the active theme.
pub trait ThemeProvider {
    fn color(&self, slot: usize) -> Vec4;
}

/// Rendering side of live elements. Effect parameters cover the global
/// post-processing values animations may drive.
pub trait VisualHost {
    fn spawn(&mut self, element: &LiveElement, sprite_path: Option<&str>) -> Result<()>;
    fn update(&mut self, element: &LiveElement);
    fn despawn(&mut self, key: ElementKey);

    fn effect(&self, _name: &str) -> Option<f32> {
        None
    }

    fn set_effect(&mut self, _name: &str, _value: f32) {}
}

/// Read access to game/session state queried by predicates and variables.
pub trait GameSession {
    fn counter(&self, name: &str) -> Option<i64>;
    fn mode(&self) -> &str;
    fn rank(&self, song: &str) -> Option<i64>;
    fn collection(&self, name: &str) -> Option<Vec<Value>>;
}

pub struct Services {
    pub settings: Box<dyn SettingsStore>,
    pub saves: Box<dyn SaveStore>,
    pub audio: Box<dyn AudioService>,
    pub host: Box<dyn SceneHost>,
    pub theme: Box<dyn ThemeProvider>,
    pub visuals: Box<dyn VisualHost>,
    pub session: Box<dyn GameSession>,
}

impl Services {
    pub fn headless() -> Self {
        Self {
            settings: Box::new(MemorySettings::default()),
            saves: Box::new(MemorySaves::default()),
            audio: Box::new(AudioManager::new(64)),
            host: Box::new(HeadlessHost::default()),
            theme: Box::new(Palette::default()),
            visuals: Box::new(HeadlessVisuals::default()),
            session: Box::new(SessionState::default()),
        }
    }

    pub fn with_session(mut self, session: SessionState) -> Self {
        self.session = Box::new(session);
        self
    }

    pub fn with_settings(mut self, settings: impl SettingsStore + 'static) -> Self {
        self.settings = Box::new(settings);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: BTreeMap<String, Value>,
    path: Option<PathBuf>,
}

impl MemorySettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let values = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(Self { values, path: Some(path.to_path_buf()) })
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("Settings load error: {err:?}. Starting from empty settings.");
                Self { values: BTreeMap::new(), path: Some(path.to_path_buf()) }
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.values).context("Serializing settings")?;
        fs::write(path, json).with_context(|| format!("Writing settings file {}", path.display()))?;
        Ok(())
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        if let Err(err) = self.save() {
            tracing::warn!("Settings persist error: {err:?}");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySaves {
    pub profile: u32,
    slots: BTreeMap<(u32, String), Value>,
}

impl SaveStore for MemorySaves {
    fn active_profile(&self) -> u32 {
        self.profile
    }

    fn load(&self, profile: u32, key: &str) -> Option<Value> {
        self.slots.get(&(profile, key.to_string())).cloned()
    }

    fn save(&mut self, profile: u32, key: &str, value: Value) {
        self.slots.insert((profile, key.to_string()), value);
    }
}

#[derive(Debug, Clone)]
pub struct HeadlessHost {
    scene: String,
    pub paused: bool,
    pub quit_requested: bool,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self { scene: "Menu".to_string(), paused: false, quit_requested: false }
    }
}

impl SceneHost for HeadlessHost {
    fn current_scene(&self) -> &str {
        &self.scene
    }

    fn load_scene(&mut self, name: &str) {
        self.scene = name.to_string();
    }

    fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    fn quit(&mut self) {
        self.quit_requested = true;
    }
}

/// Fixed list of theme colors; slots past the end fall back to white.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Vec4>,
}

impl Palette {
    pub fn new(colors: Vec<Vec4>) -> Self {
        Self { colors }
    }

    pub fn get(&self, slot: usize) -> Option<Vec4> {
        self.colors.get(slot).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(vec![
            Vec4::new(1.0, 1.0, 1.0, 1.0),
            Vec4::new(0.08, 0.08, 0.1, 1.0),
            Vec4::new(0.95, 0.3, 0.55, 1.0),
            Vec4::new(0.3, 0.75, 0.95, 1.0),
            Vec4::new(0.55, 0.55, 0.6, 1.0),
        ])
    }
}

impl ThemeProvider for Palette {
    fn color(&self, slot: usize) -> Vec4 {
        self.get(slot).unwrap_or(Vec4::ONE)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessVisuals {
    pub live: usize,
    effects: BTreeMap<String, f32>,
}

impl VisualHost for HeadlessVisuals {
    fn spawn(&mut self, _element: &LiveElement, _sprite_path: Option<&str>) -> Result<()> {
        self.live += 1;
        Ok(())
    }

    fn update(&mut self, _element: &LiveElement) {}

    fn despawn(&mut self, _key: ElementKey) {
        self.live = self.live.saturating_sub(1);
    }

    fn effect(&self, name: &str) -> Option<f32> {
        self.effects.get(name).copied()
    }

    fn set_effect(&mut self, name: &str, value: f32) {
        self.effects.insert(name.to_string(), value);
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub counters: BTreeMap<String, i64>,
    pub mode: String,
    pub ranks: BTreeMap<String, i64>,
    pub collections: BTreeMap<String, Vec<Value>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            counters: BTreeMap::new(),
            mode: "Story".to_string(),
            ranks: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }
}

impl SessionState {
    pub fn with_counter(mut self, name: &str, value: i64) -> Self {
        self.counters.insert(name.to_string(), value);
        self
    }

    pub fn with_collection(mut self, name: &str, values: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), values);
        self
    }

    pub fn with_rank(mut self, song: &str, rank: i64) -> Self {
        self.ranks.insert(song.to_string(), rank);
        self
    }
}

impl GameSession for SessionState {
    fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    fn mode(&self) -> &str {
        &self.mode
    }

    fn rank(&self, song: &str) -> Option<i64> {
        self.ranks.get(song).copied()
    }

    fn collection(&self, name: &str) -> Option<Vec<Value>> {
        self.collections.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_persist_to_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        let mut settings = MemorySettings::load_or_default(&path);
        settings.set("fullscreen", json!(true));
        settings.set("volume", json!(7));

        let reloaded = MemorySettings::load(&path).expect("reload settings");
        assert_eq!(reloaded.get_bool("fullscreen"), Some(true));
        assert_eq!(reloaded.get_int("volume"), Some(7));
    }

    #[test]
    fn palette_falls_back_to_white() {
        let palette = Palette::new(vec![Vec4::ZERO]);
        assert_eq!(palette.color(0), Vec4::ZERO);
        assert_eq!(palette.color(9), Vec4::ONE);
    }
}
