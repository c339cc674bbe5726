use beatmenu::descriptor::GenerationState;
use beatmenu::events::MenuEvent;
use beatmenu::MenuRuntime;

const DT: f32 = 0.25;

fn runtime_with(documents: &[(&str, &str)]) -> MenuRuntime {
    let mut runtime = MenuRuntime::headless();
    for (id, text) in documents {
        runtime.load_document(text, id).expect("document parses");
    }
    runtime
}

#[test]
fn generation_starts_on_the_tick_after_open() {
    let mut runtime = runtime_with(&[("main", r#"{"elements": [{"type": "text", "id": "a", "text": "A"}]}"#)]);
    assert!(runtime.open_menu("main"));
    assert_eq!(runtime.generation_state(), Some(GenerationState::NotStarted));
    assert!(runtime.stage().is_empty());

    runtime.tick(DT);
    assert!(runtime.stage().find("a").is_some());
    assert_eq!(runtime.generation_state(), Some(GenerationState::Open));
}

#[test]
fn waiting_element_holds_the_next_one_for_its_length() {
    let mut runtime = runtime_with(&[(
        "main",
        r#"{"elements": [
            {"type": "text", "id": "first", "text": "Hello", "length": 0.5, "wait": true},
            {"type": "text", "id": "second", "text": "World"}
        ]}"#,
    )]);
    runtime.open_menu("main");

    runtime.tick(DT);
    assert!(runtime.stage().find("first").is_some());
    assert!(runtime.stage().find("second").is_none());
    assert_eq!(runtime.generation_state(), Some(GenerationState::Generating));

    runtime.tick(DT);
    assert!(runtime.stage().find("second").is_none());
    let first = runtime.stage().find("first").and_then(|key| runtime.stage().get(key)).expect("first");
    assert!(first.spawning());

    runtime.tick(DT);
    assert!(runtime.stage().find("second").is_some());
    let first = runtime.stage().find("first").and_then(|key| runtime.stage().get(key)).expect("first");
    assert!(!first.spawning());
    assert_eq!(first.visible_text(), "Hello");
    assert_eq!(runtime.generation_state(), Some(GenerationState::Open));
}

#[test]
fn elements_spawn_in_document_order() {
    let mut runtime = runtime_with(&[(
        "main",
        r#"{"elements": [
            {"type": "image", "id": "bg"},
            [{"type": "text", "id": "t0", "text": "x"}, {"type": "text", "id": "t1", "text": "y"}],
            {"type": "button", "id": "b", "text": "go", "selection": [0, 0]}
        ]}"#,
    )]);
    runtime.open_menu("main");
    runtime.tick(DT);
    let spawned: Vec<String> = runtime
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            MenuEvent::ElementSpawned { id, .. } => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(spawned, vec!["bg", "t0", "t1", "b"]);
}

#[test]
fn spawn_condition_skips_elements() {
    let mut runtime = runtime_with(&[(
        "main",
        r#"{"elements": [
            {"type": "text", "id": "shown", "text": "x", "spawn_condition": {"name": "Always"}},
            {"type": "text", "id": "hidden", "text": "y", "spawn_condition": {"name": "Always", "negate": true}}
        ]}"#,
    )]);
    runtime.open_menu("main");
    runtime.tick(DT);
    assert!(runtime.stage().find("shown").is_some());
    assert!(runtime.stage().find("hidden").is_none());
}

#[test]
fn opening_another_menu_supersedes_generation() {
    let mut runtime = runtime_with(&[
        (
            "a",
            r#"{"elements": [
                {"type": "text", "id": "a0", "text": "x", "length": 1.0, "wait": true},
                {"type": "text", "id": "a1", "text": "y"}
            ]}"#,
        ),
        ("b", r#"{"elements": [{"type": "text", "id": "b0", "text": "z"}]}"#),
    ]);
    runtime.open_menu("a");
    runtime.tick(DT);
    assert!(runtime.stage().find("a0").is_some());
    runtime.drain_events();

    runtime.open_menu("b");
    let events = runtime.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        MenuEvent::GenerationSuperseded { id, cursor: 1, .. } if id == "a"
    )));
    assert!(runtime.stage().find("a0").is_none());

    for _ in 0..8 {
        runtime.tick(DT);
    }
    assert!(runtime.stage().find("a1").is_none());
    assert!(runtime.stage().find("b0").is_some());
    assert_eq!(runtime.current_menu().map(|menu| menu.id.as_str()), Some("b"));
    assert_eq!(runtime.menu("a").map(|menu| menu.state), Some(GenerationState::Closed));
}

#[test]
fn event_element_opening_a_menu_stops_the_current_build() {
    let mut runtime = runtime_with(&[
        (
            "a",
            r#"{"elements": [
                {"type": "event", "action": {"name": "OpenMenu", "params": ["b"]}},
                {"type": "text", "id": "after", "text": "never"}
            ]}"#,
        ),
        ("b", r#"{"elements": [{"type": "text", "id": "b0", "text": "z"}]}"#),
    ]);
    runtime.open_menu("a");
    runtime.tick(DT);
    assert!(runtime.stage().find("after").is_none());
    assert_eq!(runtime.current_menu().map(|menu| menu.id.as_str()), Some("b"));

    runtime.tick(DT);
    assert!(runtime.stage().find("b0").is_some());
    assert!(runtime.stage().find("after").is_none());
}

#[test]
fn loops_and_for_blocks_expand_before_generation() {
    let mut runtime = runtime_with(&[(
        "main",
        r#"{"variables": {"rows": 3},
            "elements": [
              {"type": "text", "id": "star_${loop_index}", "text": "*", "loop": 2},
              {"for": "row", "count": "$rows", "elements": [
                {"type": "button", "id": "row_${row}", "text": "Row ${row}", "selection": [0, "$row"]}
              ]}
            ]}"#,
    )]);
    runtime.open_menu("main");
    runtime.tick(DT);
    for id in ["star_0", "star_1", "row_0", "row_1", "row_2"] {
        assert!(runtime.stage().find(id).is_some(), "missing {id}");
    }
    let row_two = runtime.stage().find("row_2").and_then(|key| runtime.stage().get(key)).expect("row_2");
    assert_eq!(row_two.text, "Row 2");
}

#[test]
fn closing_a_menu_clears_its_elements_and_pause() {
    let mut runtime = runtime_with(&[(
        "pause",
        r#"{"pause_game": true, "elements": [{"type": "text", "id": "t", "text": "Paused"}]}"#,
    )]);
    runtime.open_menu("pause");
    runtime.tick(DT);
    assert_eq!(runtime.stage().len(), 1);
    assert!(runtime.close_menu());
    assert!(runtime.stage().is_empty());
    assert!(runtime.current_menu().is_none());
    let events = runtime.drain_events();
    assert!(events.iter().any(|event| matches!(event, MenuEvent::MenuClosed { id, .. } if id == "pause")));
    assert!(!runtime.close_menu());
}

#[test]
fn removing_a_spawned_element_mid_build_keeps_the_rest() {
    let mut runtime = runtime_with(&[(
        "main",
        r#"{"elements": [
            {"type": "text", "id": "a", "text": "A"},
            {"type": "event", "action": {"name": "RemoveElement", "params": ["a"]}},
            {"type": "text", "id": "b", "text": "B"},
            {"type": "text", "id": "c", "text": "C"}
        ]}"#,
    )]);
    runtime.open_menu("main");
    for _ in 0..4 {
        runtime.tick(DT);
    }
    assert!(runtime.stage().find("a").is_none());
    assert!(runtime.stage().find("b").is_some());
    assert!(runtime.stage().find("c").is_some());
    assert_eq!(runtime.generation_state(), Some(GenerationState::Open));
}
