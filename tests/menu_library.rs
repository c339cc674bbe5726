use beatmenu::config::RuntimeConfig;
use beatmenu::descriptor::GenerationState;
use beatmenu::events::MenuEvent;
use beatmenu::library::MenuLibrary;
use beatmenu::services::{AudioService, Services, SessionState, SettingsStore};
use beatmenu::validation::{MenuValidator, Severity};
use beatmenu::MenuRuntime;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

const DT: f32 = 0.25;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures").join("menus")
}

fn fixture_runtime() -> MenuRuntime {
    let session = SessionState::default().with_collection("songs", vec![json!("Alpha"), json!("Beta")]);
    MenuRuntime::new(RuntimeConfig::default(), Services::headless().with_session(session))
        .with_library(MenuLibrary::new(fixtures()))
}

fn settle(runtime: &mut MenuRuntime) {
    for _ in 0..16 {
        runtime.tick(DT);
        if runtime.generation_state() == Some(GenerationState::Open) {
            return;
        }
    }
}

fn text_of(runtime: &MenuRuntime, id: &str) -> String {
    let key = runtime.stage().find(id).unwrap_or_else(|| panic!("missing {id}"));
    runtime.stage().get(key).expect("live").text.clone()
}

#[test]
fn main_menu_loads_from_the_library() {
    let mut runtime = fixture_runtime();
    runtime.load_menu("main").expect("main loads");
    assert_eq!(runtime.services.audio.current_music(), Some("title_theme"));
    settle(&mut runtime);

    assert_eq!(runtime.generation_state(), Some(GenerationState::Open));
    assert_eq!(text_of(&runtime, "title"), "Welcome back");
    assert_eq!(text_of(&runtime, "btn_0"), "Play");
    assert_eq!(text_of(&runtime, "btn_2"), "Quit");
    assert_eq!(runtime.focus(), Some(glam::IVec2::ZERO));
    assert!(runtime.drain_events().iter().any(|event| matches!(
        event,
        MenuEvent::AnimationStarted { name, .. } if name == "intro"
    )));
}

#[test]
fn buttons_open_other_library_menus() {
    let mut runtime = fixture_runtime();
    runtime.load_menu("MAIN").expect("names are case-insensitive");
    settle(&mut runtime);

    assert!(runtime.submit());
    assert_eq!(runtime.current_menu().map(|menu| menu.id.as_str()), Some("songs"));
    settle(&mut runtime);
    assert!(runtime.stage().find("song_0").is_some());
    assert!(runtime.stage().find("song_1").is_some());
    assert!(runtime.stage().iter().any(|element| element.text == "Beta"));
    assert!(runtime.stage().find("btn_0").is_none());

    assert!(runtime.click("back"));
    settle(&mut runtime);
    assert_eq!(runtime.current_menu().map(|menu| menu.id.as_str()), Some("main"));
}

#[test]
fn options_menu_pauses_and_toggles_settings() {
    let mut runtime = fixture_runtime();
    runtime.load_menu("options").expect("options loads");
    settle(&mut runtime);
    assert!(runtime.current_menu().expect("options").pause_game);
    assert!(runtime.submit());
    assert_eq!(runtime.services.settings.get_bool("music_enabled"), Some(true));
    assert!(runtime.click("volume_up"));
    assert!(runtime.click("volume_up"));
    assert_eq!(runtime.services.settings.get_int("volume"), Some(2));
}

#[test]
fn missing_menus_are_errors() {
    let mut runtime = fixture_runtime();
    assert!(runtime.load_menu("credits").is_err());
    assert!(runtime.current_menu().is_none());

    let mut bare = MenuRuntime::headless();
    assert!(bare.load_menu("main").is_err());
}

#[test]
fn new_documents_are_found_after_a_refresh() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut runtime = MenuRuntime::headless().with_library(MenuLibrary::new(dir.path()));
    assert!(runtime.load_menu("late").is_err());
    fs::write(dir.path().join("late.json"), r#"{"elements": [{"type": "text", "id": "hi", "text": "hi"}]}"#)
        .expect("write menu");
    runtime.load_menu("late").expect("found after refresh");
    settle(&mut runtime);
    assert!(runtime.stage().find("hi").is_some());
}

#[test]
fn fixture_menus_validate_cleanly() {
    let validator = MenuValidator::default();
    let mut checked = 0;
    for entry in fs::read_dir(fixtures()).expect("fixtures") {
        let path = entry.expect("entry").path();
        let problems: Vec<String> = validator
            .validate_path(&path)
            .into_iter()
            .filter(|event| event.severity != Severity::Info)
            .map(|event| format!("{}: {}", event.severity, event.message))
            .collect();
        assert!(problems.is_empty(), "{}: {problems:?}", path.display());
        checked += 1;
    }
    assert_eq!(checked, 3);
}
