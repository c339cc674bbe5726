use crate::services::AudioService;
use std::collections::VecDeque;

/// Audio backend that records what it was asked to play.
///
/// Decoding and mixing live in the host; this keeps the music state the
/// menus query and a bounded history of triggers.
pub struct AudioManager {
    enabled: bool,
    capacity: usize,
    triggers: VecDeque<String>,
    music: Option<MusicState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicState {
    pub name: String,
    pub looped: bool,
    pub paused: bool,
}

impl AudioManager {
    pub fn new(capacity: usize) -> Self {
        Self { enabled: true, capacity: capacity.max(1), triggers: VecDeque::new(), music: None }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn clear(&mut self) {
        self.triggers.clear();
    }

    pub fn recent_triggers(&self) -> impl ExactSizeIterator<Item = &String> {
        self.triggers.iter()
    }

    pub fn music(&self) -> Option<&MusicState> {
        self.music.as_ref()
    }

    fn push_trigger(&mut self, trigger: String) {
        if self.triggers.len() == self.capacity {
            self.triggers.pop_front();
        }
        self.triggers.push_back(trigger);
    }
}

impl AudioService for AudioManager {
    fn play_sound(&mut self, name: &str, volume: f32) {
        if !self.enabled {
            return;
        }
        self.push_trigger(format!("sound:{name}:{volume:.2}"));
    }

    fn play_music(&mut self, name: &str, fade: f32, looped: bool) {
        if self.music.as_ref().is_some_and(|music| music.name == name && !music.paused) {
            return;
        }
        self.push_trigger(format!("music:{name}:{fade:.2}"));
        self.music = Some(MusicState { name: name.to_string(), looped, paused: false });
    }

    fn stop_music(&mut self, fade: f32) {
        if self.music.take().is_some() {
            self.push_trigger(format!("music_stop:{fade:.2}"));
        }
    }

    fn pause_music(&mut self, paused: bool) {
        if let Some(music) = self.music.as_mut() {
            music.paused = paused;
        }
    }

    fn current_music(&self) -> Option<&str> {
        self.music.as_ref().filter(|music| !music.paused).map(|music| music.name.as_str())
    }
}
