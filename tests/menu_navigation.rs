use beatmenu::events::MenuEvent;
use beatmenu::navigation::{Direction, NavOutcome};
use beatmenu::predicate::{Condition, ConditionSet};
use beatmenu::services::SettingsStore;
use beatmenu::MenuRuntime;
use glam::IVec2;
use serde_json::json;

const DT: f32 = 0.25;

const GRID: &str = r#"{
    "elements": [
        {"type": "button", "id": "a", "text": "A", "selection": [0, 0], "click": {"name": "SetVariable", "params": ["picked", "a"]}},
        {"type": "button", "id": "b", "text": "B", "selection": [1, 0]},
        {"type": "button", "id": "c", "text": "C", "selection": [2, 0]},
        {"type": "button", "id": "d", "text": "D", "selection": [0, 1]},
        {"type": "button", "id": "e", "text": "E", "selection": [1, 1], "click": {"name": "SetVariable", "params": ["picked", "e"]}}
    ]
}"#;

fn grid_runtime() -> MenuRuntime {
    let mut runtime = MenuRuntime::headless();
    runtime.load_document(GRID, "grid").expect("grid parses");
    runtime.open_menu("grid");
    runtime
}

#[test]
fn navigation_is_inactive_until_generated() {
    let mut runtime = grid_runtime();
    assert_eq!(runtime.navigate(Direction::Down), NavOutcome::Inactive);
    runtime.tick(DT);
    assert_eq!(runtime.focus(), Some(IVec2::ZERO));
    assert!(runtime.drain_events().contains(&MenuEvent::FocusChanged { from: None, to: IVec2::ZERO }));
}

#[test]
fn moving_down_clamps_to_the_shorter_row() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    runtime.drain_events();

    assert_eq!(
        runtime.navigate(Direction::Right),
        NavOutcome::Moved { from: IVec2::new(0, 0), to: IVec2::new(1, 0) }
    );
    runtime.navigate(Direction::Right);
    assert_eq!(runtime.focus(), Some(IVec2::new(2, 0)));
    assert_eq!(
        runtime.navigate(Direction::Down),
        NavOutcome::Moved { from: IVec2::new(2, 0), to: IVec2::new(1, 1) }
    );

    assert_eq!(runtime.navigate(Direction::Down), NavOutcome::Blocked { at: IVec2::new(1, 1) });
    assert_eq!(runtime.focus(), Some(IVec2::new(1, 1)));
    assert!(runtime
        .drain_events()
        .contains(&MenuEvent::NavigationBlocked { at: IVec2::new(1, 1), direction: IVec2::new(0, 1) }));
}

#[test]
fn focus_scales_the_focused_button() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    let duration = runtime.config().focus_duration;
    let target = runtime.config().focus_scale;
    runtime.tick(duration + DT);
    let a = runtime.focused_element().expect("focused");
    let element = runtime.stage().get(a).expect("a");
    assert!(element.focused);
    assert!((element.scale.x - target).abs() < 1e-4);

    runtime.navigate(Direction::Right);
    runtime.tick(duration + DT);
    let element = runtime.stage().get(a).expect("a");
    assert!(!element.focused);
    assert!((element.scale.x - 1.0).abs() < 1e-4);
}

#[test]
fn submit_clicks_the_focused_button() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    runtime.drain_events();
    assert!(runtime.submit());
    assert_eq!(runtime.variables().get("picked"), Some(&json!("a")));
    let a = runtime.stage().find("a").expect("a");
    assert!(runtime.drain_events().contains(&MenuEvent::Clicked { key: a, id: "a".into() }));

    assert!(runtime.set_focus(IVec2::new(1, 1)));
    assert!(runtime.submit());
    assert_eq!(runtime.variables().get("picked"), Some(&json!("e")));

    assert!(!runtime.set_focus(IVec2::new(2, 1)));
    assert!(!runtime.click("b"));
}

#[test]
fn deactivated_focus_moves_to_another_button() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    runtime.execute(&beatmenu::action::ActionList::single("SetElementActive", json!(["a", false])), None);
    assert_eq!(runtime.focus(), Some(IVec2::new(1, 0)));
    assert!(!runtime.submit());
}

#[test]
fn select_action_moves_focus() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    runtime.execute(&beatmenu::action::ActionList::single("Select", json!({"position": [0, 1]})), None);
    assert_eq!(runtime.focus(), Some(IVec2::new(0, 1)));
}

#[test]
fn guarded_clicks_follow_live_settings() {
    let mut runtime = MenuRuntime::headless();
    runtime
        .load_document(
            r#"{"elements": [{"type": "button", "id": "go", "text": "Go", "selection": [0, 0],
                "click": {"name": "SetVariable", "params": ["went", true],
                          "guard": {"name": "GetSettingBool", "params": ["unlocked"]}}}]}"#,
            "main",
        )
        .expect("parses");
    runtime.open_menu("main");
    runtime.tick(DT);
    runtime.submit();
    assert!(runtime.variables().get("went").is_none());
    runtime.services.settings.set("unlocked", json!(true));
    runtime.submit();
    assert_eq!(runtime.variables().get("went"), Some(&json!(true)));
}

#[test]
fn otherwise_conditions_override_earlier_failures() {
    let mut runtime = MenuRuntime::headless();
    runtime.services.settings.set("level", json!(3));
    let failing = Condition::new("SettingIntGreater", json!(["level", 5]));
    let passing = Condition::new("SettingIntEquals", json!(["level", 3]));

    assert!(!runtime.evaluate(&ConditionSet::new(vec![failing.clone(), passing.clone()]), None));
    assert!(runtime.evaluate(&ConditionSet::new(vec![failing.clone(), passing.clone().otherwise(true)]), None));
    assert!(!runtime.evaluate(&ConditionSet::new(vec![passing.clone().otherwise(true), failing.clone()]), None));
    assert!(runtime.evaluate(&ConditionSet::default(), None));
}

#[test]
fn unknown_predicates_fail_and_are_reported() {
    let mut runtime = MenuRuntime::headless();
    let conditions = ConditionSet::new(vec![Condition::new("IsFullMoon", json!(null)).negated(true)]);
    assert!(!runtime.evaluate(&conditions, None));
    assert!(runtime.drain_events().iter().any(|event| matches!(
        event,
        MenuEvent::UnknownOperation { name, .. } if name == "IsFullMoon"
    )));
}

#[test]
fn malformed_predicates_fail_even_when_negated() {
    let mut runtime = MenuRuntime::headless();
    runtime.services.settings.set("level", json!(3));
    for params in [json!([]), json!(["level"]), json!({"key": "level", "value": "high"}), json!(null)] {
        let negated = Condition::new("SettingIntGreater", params.clone()).negated(true);
        assert!(!runtime.evaluate(&ConditionSet::new(vec![negated]), None), "{params}");
    }
    let valid = Condition::new("SettingIntGreater", json!(["level", 5])).negated(true);
    assert!(runtime.evaluate(&ConditionSet::new(vec![valid]), None));
}

#[test]
fn buttons_without_click_actions_do_not_click() {
    let mut runtime = grid_runtime();
    runtime.tick(DT);
    assert!(runtime.set_focus(IVec2::new(1, 0)));
    runtime.drain_events();
    assert!(!runtime.submit());
    assert!(!runtime.click("c"));
    assert!(!runtime.drain_events().iter().any(|event| matches!(event, MenuEvent::Clicked { .. })));
}
