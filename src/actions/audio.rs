use super::{ActionCall, ActionRegistry};
use crate::events::MenuEvent;
use crate::runtime::MenuRuntime;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("PlaySound", play_sound);
    registry.register("PlayMusic", play_music);
    registry.register("StopMusic", stop_music);
    registry.register("PauseMusic", pause_music);
}

/// `[name, volume]`
fn play_sound(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(name) = params.str(0, "name") else {
        tracing::warn!("PlaySound needs a sound name");
        return;
    };
    let volume = params.f32(1, "volume").unwrap_or(1.0).clamp(0.0, 1.0);
    runtime.services.audio.play_sound(name, volume);
    runtime.emit(MenuEvent::SoundRequested { name: name.to_string(), volume });
}

/// `[name, fade, loop]`. Requesting the track already playing is ignored.
fn play_music(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let Some(name) = params.str(0, "name") else {
        tracing::warn!("PlayMusic needs a track name");
        return;
    };
    if runtime.services.audio.current_music() == Some(name) {
        return;
    }
    let fade = params.f32(1, "fade").unwrap_or(0.0).max(0.0);
    let looped = params.bool(2, "loop").unwrap_or(true);
    runtime.services.audio.play_music(name, fade, looped);
    runtime.emit(MenuEvent::MusicRequested { name: name.to_string(), fade, looped });
}

/// `[fade]`
fn stop_music(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let fade = call.params().f32(0, "fade").unwrap_or(0.0).max(0.0);
    runtime.services.audio.stop_music(fade);
    runtime.emit(MenuEvent::MusicStopped { fade });
}

/// `[paused]`, defaulting to pause.
fn pause_music(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let paused = call.params().bool(0, "paused").unwrap_or(true);
    runtime.services.audio.pause_music(paused);
}
