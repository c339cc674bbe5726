use super::{ActionCall, ActionRegistry, DeferredSlots};
use crate::action::ActionList;
use crate::events::MenuEvent;
use crate::runtime::MenuRuntime;
use crate::value::display_text;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register_deferred("Run", run, DeferredSlots::All);
    registry.register("Log", log);
}

/// `{"actions": [...]}` or a bare array of actions.
fn run(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let node = match call.params.get("actions").or_else(|| call.params.get("action")) {
        Some(node) => node,
        None => &call.params,
    };
    let actions = ActionList::from_value(node);
    runtime.run_list(&actions, call.context, call.scope);
}

/// `[message]`
fn log(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let message = call.params().get(0, "message").map(display_text).unwrap_or_default();
    tracing::info!(target: "beatmenu::menu", "{message}");
    runtime.emit(MenuEvent::Log { message });
}
