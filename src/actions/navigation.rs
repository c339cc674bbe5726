use super::{ActionCall, ActionRegistry};
use crate::events::MenuEvent;
use crate::runtime::MenuRuntime;

pub(super) fn register(registry: &mut ActionRegistry) {
    registry.register("OpenMenu", open_menu);
    registry.register("LoadMenu", load_menu);
    registry.register("CloseMenu", close_menu);
    registry.register("ClearMenus", clear_menus);
    registry.register("Exit", exit);
    registry.register("LoadScene", load_scene);
    registry.register("Quit", quit);
}

fn open_menu(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(id) = call.params().str(0, "id").map(str::to_string) else {
        tracing::warn!("OpenMenu needs a menu id");
        return;
    };
    runtime.open_menu(&id);
}

fn load_menu(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(name) = call.params().str(0, "name").map(str::to_string) else {
        tracing::warn!("LoadMenu needs a menu name");
        return;
    };
    if let Err(err) = runtime.load_menu(&name) {
        tracing::warn!("LoadMenu '{name}' failed: {err:#}");
    }
}

fn close_menu(runtime: &mut MenuRuntime, _call: &ActionCall<'_>) {
    runtime.close_menu();
}

fn clear_menus(runtime: &mut MenuRuntime, _call: &ActionCall<'_>) {
    runtime.clear_menus();
}

fn exit(runtime: &mut MenuRuntime, _call: &ActionCall<'_>) {
    runtime.run_exit();
}

fn load_scene(runtime: &mut MenuRuntime, call: &ActionCall<'_>) {
    let Some(name) = call.params().str(0, "name").map(str::to_string) else {
        tracing::warn!("LoadScene needs a scene name");
        return;
    };
    tracing::info!("loading scene '{name}'");
    runtime.services.host.load_scene(&name);
    runtime.emit(MenuEvent::SceneRequested { name });
}

fn quit(runtime: &mut MenuRuntime, _call: &ActionCall<'_>) {
    tracing::info!("quit requested");
    runtime.services.host.quit();
    runtime.emit(MenuEvent::QuitRequested);
}
