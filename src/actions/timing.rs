use super::{ActionCall, ActionRegistry, DeferredSlots};
use crate::action::ActionList;
use crate::runtime::MenuRuntime;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register_deferred("Wait", wait, DeferredSlots::At(&[1]));
}

/// `[seconds, action]`. Schedules the nested action on a timer owned by the
/// current menu session.
fn wait(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let params = call.params();
    let seconds = params.f32(0, "seconds").or_else(|| params.f32(0, "time")).unwrap_or(0.0);
    let actions = params
        .get(1, "action")
        .or_else(|| params.get(1, "actions"))
        .map(ActionList::from_value)
        .unwrap_or_default();
    if actions.is_empty() {
        tracing::debug!("Wait without a nested action");
        return;
    }
    runtime.schedule(seconds, actions, call.context, call.scope.clone());
}
