//! Settings and application paths.
//!
//! Path priority for both config and data files:
//! 1. `--config-dir` CLI argument
//! 2. `SEGMARK_CONFIG_DIR` environment variable
//! 3. Current directory IF any segmark files exist there (segmark.json, segmark.log)
//! 4. Platform directory from dirs-next
//!
//! Platform paths:
//! - Linux: ~/.config/segmark/{name}, ~/.local/share/segmark/{name}
//! - macOS: ~/Library/Application Support/segmark/{name}
//! - Windows: %APPDATA%\segmark\{name}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::coordinator::DEFAULT_HISTORY_CAPACITY;
use crate::core::debouncer::DEFAULT_DEBOUNCE_MS;
use crate::entities::dataset::DEFAULT_SUBSET;
use crate::widgets::timeline::TimelineConfig;

pub const APP_NAME: &str = "segmark";
pub const SETTINGS_FILE: &str = "segmark.json";
pub const LOG_FILE: &str = "segmark.log";
pub const CONFIG_DIR_ENV: &str = "SEGMARK_CONFIG_DIR";

/// Overrides for the default application paths.
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI arg → ENV var → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    get_config_dir(config).join(name)
}

/// Path to a data file (logs).
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    get_data_dir(config).join(name)
}

/// Create the config and data directories if missing.
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let config_dir = get_config_dir(config);
    let data_dir = get_data_dir(config);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;
    }
    if data_dir != config_dir && !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
    }
    Ok(())
}

fn has_local_files(dir: &Path) -> bool {
    [SETTINGS_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

fn resolve_dir(config: &PathConfig, platform: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }
    if let Ok(current_dir) = std::env::current_dir() {
        if has_local_files(&current_dir) {
            return current_dir;
        }
    }
    match platform {
        Some(dir) => dir.join(APP_NAME),
        None => PathBuf::from("."),
    }
}

fn get_config_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::config_dir())
}

fn get_data_dir(config: &PathConfig) -> PathBuf {
    resolve_dir(config, dirs_next::data_dir())
}

/// Persistent settings (`segmark.json`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Edge/drag/min-duration/snap thresholds for every lane.
    pub timeline: TimelineConfig,
    pub time_scale_enabled: bool,
    /// Settle delay for form edits.
    pub debounce_ms: u64,
    pub history_capacity: usize,
    /// 0 = unlimited
    pub undo_limit: usize,
    pub confidence_threshold: f64,
    pub export_subset: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            time_scale_enabled: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            undo_limit: 0,
            confidence_threshold: 0.0,
            export_subset: DEFAULT_SUBSET.to_string(),
        }
    }
}

impl Settings {
    /// Load from `path`. Missing file → defaults; unreadable or malformed → warning and defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings at {}, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => {
                    info!("Settings loaded from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Malformed settings {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Cannot read settings {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write settings: {}", path.display()))?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }
}
