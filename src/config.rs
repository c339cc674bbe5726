use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_menu_root")]
    pub menu_root: PathBuf,
    #[serde(default = "RuntimeConfig::default_start_menu")]
    pub start_menu: String,
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
    #[serde(default = "RuntimeConfig::default_max_actions_per_tick")]
    pub max_actions_per_tick: usize,
    #[serde(default = "RuntimeConfig::default_focus_scale")]
    pub focus_scale: f32,
    #[serde(default = "RuntimeConfig::default_focus_duration")]
    pub focus_duration: f32,
    #[serde(default = "RuntimeConfig::default_frame_dt")]
    pub frame_dt: f32,
    #[serde(default = "RuntimeConfig::default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigOverrides {
    pub menu_root: Option<PathBuf>,
    pub start_menu: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub frame_dt: Option<f32>,
    pub log_filter: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            menu_root: Self::default_menu_root(),
            start_menu: Self::default_start_menu(),
            settings_path: None,
            max_actions_per_tick: Self::default_max_actions_per_tick(),
            focus_scale: Self::default_focus_scale(),
            focus_duration: Self::default_focus_duration(),
            frame_dt: Self::default_frame_dt(),
            log_filter: Self::default_log_filter(),
        }
    }
}

impl RuntimeConfig {
    fn default_menu_root() -> PathBuf {
        PathBuf::from("menus")
    }

    fn default_start_menu() -> String {
        "main".to_string()
    }

    const fn default_max_actions_per_tick() -> usize {
        256
    }

    const fn default_focus_scale() -> f32 {
        1.1
    }

    const fn default_focus_duration() -> f32 {
        0.15
    }

    fn default_frame_dt() -> f32 {
        1.0 / 60.0
    }

    fn default_log_filter() -> String {
        "info".to_string()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!("config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &RuntimeConfigOverrides) {
        if let Some(root) = &overrides.menu_root {
            self.menu_root = root.clone();
        }
        if let Some(start) = &overrides.start_menu {
            self.start_menu = start.clone();
        }
        if let Some(path) = &overrides.settings_path {
            self.settings_path = Some(path.clone());
        }
        if let Some(dt) = overrides.frame_dt {
            self.frame_dt = dt;
        }
        if let Some(filter) = &overrides.log_filter {
            self.log_filter = filter.clone();
        }
    }
}

impl RuntimeConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.menu_root.is_some() {
            fields.push("menu_root");
        }
        if self.start_menu.is_some() {
            fields.push("start_menu");
        }
        if self.settings_path.is_some() {
            fields.push("settings_path");
        }
        if self.frame_dt.is_some() {
            fields.push("frame_dt");
        }
        if self.log_filter.is_some() {
            fields.push("log_filter");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_take_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"start_menu": "title", "max_actions_per_tick": 8}}"#).expect("write config");
        let cfg = RuntimeConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.start_menu, "title");
        assert_eq!(cfg.max_actions_per_tick, 8);
        assert_eq!(cfg.menu_root, PathBuf::from("menus"));
        assert!((cfg.focus_scale - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn unreadable_config_falls_back() {
        let cfg = RuntimeConfig::load_or_default("/definitely/not/here.json");
        assert_eq!(cfg.start_menu, "main");
    }

    #[test]
    fn overrides_replace_fields() {
        let mut cfg = RuntimeConfig::default();
        let overrides = RuntimeConfigOverrides {
            start_menu: Some("pause".into()),
            frame_dt: Some(0.5),
            ..Default::default()
        };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.start_menu, "pause");
        assert_eq!(cfg.frame_dt, 0.5);
        assert_eq!(overrides.applied_fields(), vec!["start_menu", "frame_dt"]);
    }
}
