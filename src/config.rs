//! Configuration and persisted preferences
//!
//! Two kinds of state live here:
//!
//! - [`MonitorConfig`] - runtime knobs of the poll cycle (tick period,
//!   planner gap threshold)
//! - [`Preferences`] - what survives a restart: selected port, unit id,
//!   motor model, window geometry, and per-channel display preferences
//!   (color, activity, secondary-axis assignment)
//!
//! Preferences are stored as JSON in the platform data directory
//! (`~/.local/share/servoscope/` on Linux). The core only exposes the
//! state and load/save plumbing; deciding *when* to save belongs to the
//! caller. Loading tolerates a missing or corrupt file by falling back to
//! defaults (logged, never fatal).

use crate::catalog::MotorModel;
use crate::error::{Result, ServoScopeError};
use crate::types::Channel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for the data directory
pub const APP_ID: &str = "servoscope";

/// Preferences filename
pub const PREFERENCES_FILE: &str = "preferences.json";

/// Default poll period in milliseconds
pub const DEFAULT_TICK_PERIOD_MS: u64 = 10;

/// Default Modbus unit id
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Runtime configuration of the poll cycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Poll period in milliseconds
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Maximum address gap merged into one range read
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: u16,
}

fn default_tick_period_ms() -> u64 {
    DEFAULT_TICK_PERIOD_MS
}

fn default_gap_threshold() -> u16 {
    crate::backend::planner::DEFAULT_GAP_THRESHOLD
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            gap_threshold: default_gap_threshold(),
        }
    }
}

impl MonitorConfig {
    /// The tick period as a [`Duration`]
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

/// Persisted display preferences for one channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelPrefs {
    /// Plot color (RGBA)
    pub color: [u8; 4],
    /// Whether the channel is polled
    pub active: bool,
    /// Whether the channel plots on the secondary Y axis
    pub second_axis: bool,
}

/// Persisted window placement
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 800,
            height: 600,
        }
    }
}

/// Persistent application preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Last selected serial port
    #[serde(default)]
    pub selected_port: Option<String>,

    /// Modbus unit id of the drive
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,

    /// Selected drive model
    #[serde(default)]
    pub model: MotorModel,

    /// Window placement (UI-owned, only stored here)
    #[serde(default)]
    pub window: WindowGeometry,

    /// Poll cycle configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Per-channel display preferences, keyed by channel name
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelPrefs>,
}

fn default_unit_id() -> u8 {
    DEFAULT_UNIT_ID
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_port: None,
            unit_id: DEFAULT_UNIT_ID,
            model: MotorModel::default(),
            window: WindowGeometry::default(),
            monitor: MonitorConfig::default(),
            channels: BTreeMap::new(),
        }
    }
}

/// The platform data directory for this application
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Default path of the preferences file
pub fn preferences_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(PREFERENCES_FILE))
}

impl Preferences {
    /// Load preferences from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServoScopeError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ServoScopeError::Config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Load preferences from the default location, falling back to
    /// defaults on any problem
    pub fn load_or_default() -> Self {
        let Some(path) = preferences_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load preferences, using defaults");
            Self::default()
        })
    }

    /// Save preferences to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ServoScopeError::Config(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ServoScopeError::Config(format!("failed to serialize: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            ServoScopeError::Config(format!("failed to write {}: {e}", path.display()))
        })
    }

    /// Save preferences to the default location
    pub fn save(&self) -> Result<()> {
        let path = preferences_path()
            .ok_or_else(|| ServoScopeError::Config("no data directory".to_string()))?;
        self.save_to(path)
    }

    /// Stored preferences for one channel
    pub fn channel_prefs(&self, name: &str) -> Option<&ChannelPrefs> {
        self.channels.get(name)
    }

    /// Apply stored per-channel preferences to a channel set
    ///
    /// Channels without a stored entry are left untouched.
    pub fn apply_to(&self, channels: &mut [Channel]) {
        for ch in channels {
            if let Some(prefs) = self.channels.get(&ch.name) {
                ch.set_color(prefs.color);
                ch.set_active(prefs.active);
                ch.set_second_axis(prefs.second_axis);
            }
        }
    }

    /// Capture the current display state of a channel set
    pub fn capture(&mut self, channels: &[Channel]) {
        for ch in channels {
            self.channels.insert(
                ch.name.clone(),
                ChannelPrefs {
                    color: ch.color(),
                    active: ch.is_active(),
                    second_axis: ch.on_second_axis(),
                },
            );
        }
    }
}
