// Editor settings
// Loaded from ~/.config/gridedit/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the selection moves after Enter commits an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnterDirection {
    #[default]
    Down,
    Right,
}

impl EnterDirection {
    /// (d_row, d_col) for a plain Enter; Shift+Enter uses the negation
    pub fn delta(&self) -> (isize, isize) {
        match self {
            EnterDirection::Down => (1, 0),
            EnterDirection::Right => (0, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Formula editing
    #[serde(rename = "formula.autoCloseParens")]
    pub auto_close_parens: bool,

    #[serde(rename = "formula.autocompleteLimit")]
    pub autocomplete_limit: usize,

    // History
    #[serde(rename = "history.maxEntries")]
    pub history_max_entries: usize,

    // Editor
    #[serde(rename = "editor.enterDirection")]
    pub enter_direction: EnterDirection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_close_parens: true,
            autocomplete_limit: 10,
            history_max_entries: 100,
            enter_direction: EnterDirection::Down,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // Formula editing
    // Close unmatched "(" when a formula is committed
    "formula.autoCloseParens": true,
    // Maximum number of function suggestions shown while typing
    "formula.autocompleteLimit": 10,

    // Undo history depth
    "history.maxEntries": 100,

    // Selection movement after Enter: "down" or "right"
    "editor.enterDirection": "down"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridedit");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults.
    /// Writes a commented default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            Self::create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from a specific file. Missing or malformed files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring whole-line `//` comments
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}
