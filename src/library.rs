use crate::descriptor::MenuDescriptor;
use crate::parse::MenuParser;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MENU_EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Directory of menu documents, addressed by file stem.
pub struct MenuLibrary {
    root: PathBuf,
    entries: Vec<MenuEntry>,
    revision: u64,
}

impl MenuLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), entries: Vec::new(), revision: 0 }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    pub fn ensure_root(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)
                .with_context(|| format!("Creating menu directory {}", self.root.display()))?;
        }
        Ok(())
    }

    pub fn refresh(&mut self) -> Result<()> {
        self.ensure_root()?;
        let mut grouped: BTreeMap<String, MenuEntry> = BTreeMap::new();
        for entry in
            fs::read_dir(&self.root).with_context(|| format!("Scanning menus under {}", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let is_menu = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MENU_EXTENSION));
            if !is_menu {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            grouped.insert(name.to_lowercase(), MenuEntry { name: name.to_string(), path: path.clone() });
        }
        self.entries = grouped.into_values().collect();
        self.revision = self.revision.wrapping_add(1);
        Ok(())
    }

    /// Looks a menu up by name, case-insensitively.
    pub fn find(&self, name: &str) -> Option<&MenuEntry> {
        self.entries.iter().find(|entry| entry.name.eq_ignore_ascii_case(name))
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let mut file_name = name.trim().to_string();
        if file_name.is_empty() {
            file_name.push_str("menu");
        }
        let sanitized = file_name
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' { ch } else { '_' })
            .collect::<String>();
        self.root.join(format!("{sanitized}.{MENU_EXTENSION}"))
    }

    /// Parses the named menu, preferring a scanned entry over the
    /// sanitized default path.
    pub fn load(&self, name: &str, parser: &MenuParser<'_>) -> Result<MenuDescriptor> {
        let path = self.find(name).map(|entry| entry.path.clone()).unwrap_or_else(|| self.path_for(name));
        parser.load_path(&path)
    }

    pub fn version(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_lists_json_documents_sorted() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("Pause.json"), "{}").expect("write");
        fs::write(dir.path().join("main.json"), "{}").expect("write");
        fs::write(dir.path().join("notes.txt"), "ignored").expect("write");
        let mut library = MenuLibrary::new(dir.path());
        library.refresh().expect("refresh");
        let names: Vec<_> = library.entries().iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["main", "Pause"]);
        assert!(library.find("pause").is_some());
        assert_eq!(library.version(), 1);
    }

    #[test]
    fn path_for_sanitizes_names() {
        let library = MenuLibrary::new("menus");
        assert_eq!(library.path_for("../evil name"), PathBuf::from("menus/___evil_name.json"));
        assert_eq!(library.path_for("  "), PathBuf::from("menus/menu.json"));
    }
}
