//! Headless demo driver behind the `beatmenu` binary.

use crate::cli::CliOverrides;
use crate::config::RuntimeConfig;
use crate::events::MenuEvent;
use crate::library::MenuLibrary;
use crate::runtime::MenuRuntime;
use crate::services::{MemorySettings, Services};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "config/beatmenu.json";
pub const DEFAULT_TICKS: u32 = 240;

pub fn run() -> Result<()> {
    run_with_overrides(CliOverrides::default())
}

/// Loads config and the start menu, ticks the runtime and prints every
/// drained event.
pub fn run_with_overrides(cli: CliOverrides) -> Result<()> {
    let config_path = cli.config_path().cloned().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let ticks = cli.ticks().unwrap_or(DEFAULT_TICKS);
    let overrides = cli.into_config_overrides();
    let mut config = RuntimeConfig::load_or_default(&config_path);
    config.apply_overrides(&overrides);
    init_tracing(&config.log_filter);
    if !overrides.is_empty() {
        tracing::info!("CLI overrides applied: {}", overrides.applied_fields().join(", "));
    }

    let mut services = Services::headless();
    if let Some(path) = &config.settings_path {
        services = services.with_settings(MemorySettings::load_or_default(path));
    }
    let mut library = MenuLibrary::new(&config.menu_root);
    library.refresh().with_context(|| format!("Scanning menus in {}", config.menu_root.display()))?;
    tracing::info!("{} menus available under {}", library.entries().len(), library.root().display());

    let frame_dt = config.frame_dt;
    let start_menu = config.start_menu.clone();
    let mut runtime = MenuRuntime::new(config, services).with_library(library);
    runtime.load_menu(&start_menu).with_context(|| format!("Opening start menu '{start_menu}'"))?;
    for _ in 0..ticks {
        runtime.tick(frame_dt);
        let elapsed = runtime.clock().elapsed_seconds();
        for event in runtime.drain_events() {
            println!("[{elapsed:>8.3}] {event}");
            if matches!(event, MenuEvent::QuitRequested) {
                return Ok(());
            }
        }
    }
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
