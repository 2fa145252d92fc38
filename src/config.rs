use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::board::BoardSettings;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::models::Column;
use crate::persistence::{DEFAULT_AUTO_BACKUP_LIMIT, DEFAULT_MANUAL_BACKUP_LIMIT};
use crate::reminders::ReminderSettings;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Theme used when nothing has been chosen yet
pub const DEFAULT_THEME: &str = "light";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_auto_backup_limit")]
    pub auto_backup_limit: usize,
    #[serde(default = "default_manual_backup_limit")]
    pub manual_backup_limit: usize,
    #[serde(default = "default_reminder_sweep_secs")]
    pub reminder_sweep_secs: u64,
    #[serde(default = "default_reminder_tolerance_secs")]
    pub reminder_tolerance_secs: u64,
    #[serde(default = "default_reminder_display_secs")]
    pub reminder_display_secs: u64,
    #[serde(default = "default_seed_sample_cards")]
    pub seed_sample_cards: bool,
    #[serde(default)]
    pub themes: HashMap<String, Theme>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default = "default_gradient")]
    pub gradient: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            columns: default_columns(),
            history_limit: default_history_limit(),
            auto_backup_limit: default_auto_backup_limit(),
            manual_backup_limit: default_manual_backup_limit(),
            reminder_sweep_secs: default_reminder_sweep_secs(),
            reminder_tolerance_secs: default_reminder_tolerance_secs(),
            reminder_display_secs: default_reminder_display_secs(),
            seed_sample_cards: default_seed_sample_cards(),
            themes: HashMap::new(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Theme {
    fn preset(label: &str, emoji: &str, gradient: &str) -> Self {
        Self {
            label: label.to_string(),
            emoji: emoji.to_string(),
            gradient: gradient.to_string(),
        }
    }

    /// Get preset themes that are always available
    pub fn get_preset_themes() -> HashMap<String, Theme> {
        let mut themes = HashMap::new();

        themes.insert("light".to_string(), Theme::preset(
            "Light", "🌞", "linear-gradient(45deg, #f8f9fa, #e9ecef, #dee2e6)",
        ));
        themes.insert("dark".to_string(), Theme::preset(
            "Dark", "🌙", "linear-gradient(45deg, #1a1a2e, #16213e, #0f3460)",
        ));
        themes.insert("reading".to_string(), Theme::preset(
            "Reading", "📖", "linear-gradient(45deg, #faf8f5, #f5f5f0, #f0f0eb)",
        ));
        themes.insert("calm-blue".to_string(), Theme::preset(
            "Calm Blue", "🌊", "linear-gradient(45deg, #e3f2fd, #bbdefb, #90caf9)",
        ));
        themes.insert("energetic-orange".to_string(), Theme::preset(
            "Energetic", "🔥", "linear-gradient(45deg, #fff3e0, #ffe0b2, #ffcc80)",
        ));
        themes.insert("romantic-purple".to_string(), Theme::preset(
            "Romantic", "💜", "linear-gradient(45deg, #f3e5f5, #e1bee7, #ce93d8)",
        ));

        themes
    }
}

// Default value functions
fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    if let Some(data_dir) = utils::get_data_dir(utils::Profile::Prod) {
        data_dir.join("board.db").to_string_lossy().to_string()
    } else {
        "~/.local/share/lanes/board.db".to_string()
    }
}

fn default_log_level() -> String {
    crate::logging::default_log_level().to_string()
}

fn default_columns() -> Vec<String> {
    Column::defaults().into_iter().map(String::from).collect()
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_auto_backup_limit() -> usize {
    DEFAULT_AUTO_BACKUP_LIMIT
}

fn default_manual_backup_limit() -> usize {
    DEFAULT_MANUAL_BACKUP_LIMIT
}

fn default_reminder_sweep_secs() -> u64 {
    60
}

fn default_reminder_tolerance_secs() -> u64 {
    60
}

fn default_reminder_display_secs() -> u64 {
    10
}

fn default_seed_sample_cards() -> bool {
    true
}

fn default_gradient() -> String {
    "none".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and database paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let config = Self::from_toml(&contents)?;
            Ok(config)
        } else {
            // Create default config and save it
            let mut config = Config::default();
            config.database_path = Self::default_database_path_for_profile(profile);
            config.save_with_profile(profile)?;
            Ok(config)
        }
    }

    /// Load an explicit config file (`--config`); it must exist
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse and check a config document
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.columns.is_empty() {
            return Err(ConfigError::InvalidValue("columns cannot be empty".to_string()));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(ConfigError::InvalidValue("column names cannot be blank".to_string()));
            }
            if self.columns[..i].contains(column) {
                return Err(ConfigError::InvalidValue(format!("duplicate column '{}'", column)));
            }
        }
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidValue("history_limit must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        let config_path = Self::get_config_path(profile)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default database path for a specific profile
    fn default_database_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("board.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/lanes-dev/board.db".to_string(),
                utils::Profile::Prod => "~/.local/share/lanes/board.db".to_string(),
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Log files live next to the database, under `logs/`
    pub fn get_log_dir(&self) -> PathBuf {
        self.get_database_path()
            .parent()
            .map(|dir| dir.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Look up a theme, user-defined first, then presets
    pub fn get_theme(&self, name: &str) -> Option<Theme> {
        self.themes
            .get(name)
            .cloned()
            .or_else(|| Theme::get_preset_themes().remove(name))
    }

    /// Get all available theme names (presets + user-defined)
    pub fn get_available_themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Theme::get_preset_themes().keys().cloned().collect();

        // Add user-defined themes that aren't already in presets
        for theme_name in self.themes.keys() {
            if !themes.contains(theme_name) {
                themes.push(theme_name.clone());
            }
        }

        // Sort for consistent display
        themes.sort();
        themes
    }

    pub fn board_settings(&self) -> BoardSettings {
        let secs = |s: u64| Duration::seconds(i64::try_from(s).unwrap_or(i64::MAX).min(i64::MAX / 1000));
        BoardSettings {
            columns: self.columns.iter().map(|c| Column::from(c.as_str())).collect(),
            themes: self.get_available_themes(),
            history_limit: self.history_limit,
            auto_backup_limit: self.auto_backup_limit,
            manual_backup_limit: self.manual_backup_limit,
            reminders: ReminderSettings {
                sweep_interval: secs(self.reminder_sweep_secs),
                tolerance: secs(self.reminder_tolerance_secs),
                display_for: secs(self.reminder_display_secs),
            },
            seed_sample_cards: self.seed_sample_cards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.columns, vec!["todo", "doing", "done", "review"]);
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.auto_backup_limit, 5);
        assert_eq!(config.manual_backup_limit, 10);
        assert!(config.seed_sample_cards);
    }

    #[test]
    fn custom_columns_and_themes_flow_into_board_settings() {
        let config = Config::from_toml(
            r#"
            columns = ["todo", "blocked", "done"]
            reminder_sweep_secs = 30

            [themes.solarized]
            label = "Solarized"
            emoji = "☀"
            "#,
        )
        .unwrap();
        let settings = config.board_settings();
        assert_eq!(
            settings.columns,
            vec![Column::Todo, Column::Custom("blocked".into()), Column::Done]
        );
        assert_eq!(settings.reminders.sweep_interval, Duration::seconds(30));
        assert!(settings.themes.contains(&"solarized".to_string()));
        assert!(settings.themes.contains(&"romantic-purple".to_string()));
        assert_eq!(config.get_theme("solarized").unwrap().gradient, "none");
        assert_eq!(config.get_theme("dark").unwrap().label, "Dark");
    }

    #[test]
    fn duplicate_or_empty_columns_are_rejected() {
        assert!(Config::from_toml("columns = []").is_err());
        assert!(Config::from_toml(r#"columns = ["todo", "todo"]"#).is_err());
        assert!(Config::from_toml("history_limit = 0").is_err());
    }

    #[test]
    fn config_survives_a_toml_round_trip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back = Config::from_toml(&text).unwrap();
        assert_eq!(back.columns, config.columns);
        assert_eq!(back.database_path, config.database_path);
    }
}
