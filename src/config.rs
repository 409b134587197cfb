//! Configuration system for layerwm
//!
//! Loads configuration from TOML file at `~/.config/layerwm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::keyboard::default_bindings;
use crate::wm::placement::PlacementPolicy;
use crate::wm::settings::{DrawMode, FocusModel, SnapMode};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub desktops: DesktopsConfig,
    pub focus: FocusConfig,
    pub placement: PlacementConfig,
    pub move_resize: MoveResizeConfig,
    pub theme: ThemeConfig,
    pub groups: Vec<GroupConfig>,
    pub keys: Vec<KeyConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desktops: DesktopsConfig::default(),
            focus: FocusConfig::default(),
            placement: PlacementConfig::default(),
            move_resize: MoveResizeConfig::default(),
            theme: ThemeConfig::default(),
            groups: Vec::new(),
            keys: default_bindings()
                .into_iter()
                .map(|(key, action)| KeyConfig { key, action })
                .collect(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location is created with defaults;
    /// a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from(path);
        }

        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("layerwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Default configuration as TOML text
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        fs::write(path, Self::default_toml()?)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Virtual desktops
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopsConfig {
    pub count: u32,
    pub names: Vec<String>,
}

impl Default for DesktopsConfig {
    fn default() -> Self {
        Self {
            count: 4,
            names: Vec::new(),
        }
    }
}

/// Focus and click behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub model: FocusModel,
    pub double_click_ms: u64,
    /// Unanswered close requests older than this escalate to a kill
    pub close_timeout_ms: u64,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            model: FocusModel::Click,
            double_click_ms: 400,
            close_timeout_ms: 3000,
        }
    }
}

/// Initial placement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub policy: PlacementPolicy,
}

/// Interactive move/resize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveResizeConfig {
    pub snap_mode: SnapMode,
    pub snap_distance: i32,
    pub move_mode: DrawMode,
    pub resize_mode: DrawMode,
    pub aero_snap: bool,
    /// 0 disables switching desktops at the screen edge
    pub edge_switch_delay_ms: u64,
    pub keyboard_step: i32,
}

impl Default for MoveResizeConfig {
    fn default() -> Self {
        Self {
            snap_mode: SnapMode::Border,
            snap_distance: 10,
            move_mode: DrawMode::Opaque,
            resize_mode: DrawMode::Opaque,
            aero_snap: true,
            edge_switch_delay_ms: 0,
            keyboard_step: 10,
        }
    }
}

/// Decoration metrics and colours (0xRRGGBB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub border_width: i32,
    pub title_height: i32,
    pub active_color: u32,
    pub inactive_color: u32,
    pub urgent_color: u32,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            border_width: 4,
            title_height: 20,
            active_color: 0x5e81ac,   // Frost Blue
            inactive_color: 0x3b4252, // Polar Night
            urgent_color: 0xbf616a,   // Aurora Red
        }
    }
}

/// Group rule: options for windows matching a class and/or title
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub class: Option<String>,
    pub name: Option<String>,
    /// e.g. `"sticky"`, `"desktop:2"`, `"layer:above"`, `"opacity:0.8"`
    pub options: Vec<String>,
}

/// Key binding: `key = "Mod1+F4"`, `action = "close"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    pub key: String,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [desktops]
            count = 6

            [move_resize]
            snap_mode = "screen"

            [[groups]]
            class = "xterm"
            options = ["sticky", "layer:above"]
            "#,
        )
        .unwrap();
        assert_eq!(config.desktops.count, 6);
        assert_eq!(config.move_resize.snap_mode, SnapMode::Screen);
        assert_eq!(config.move_resize.snap_distance, 10);
        assert_eq!(config.groups[0].options.len(), 2);
        assert_eq!(config.placement.policy, PlacementPolicy::Cascade);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.desktops.count, 4);
        assert_eq!(parsed.theme.title_height, 20);
    }

    #[test]
    fn test_missing_keys_section_uses_default_bindings() {
        let config: Config = toml::from_str("[desktops]\ncount = 2\n").unwrap();
        assert!(!config.keys.is_empty());

        let config: Config = toml::from_str("keys = []\n").unwrap();
        assert!(config.keys.is_empty());
    }
}
