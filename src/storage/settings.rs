//! Application settings.
//!
//! Stored as JSON at `~/.config/qpace/settings.json`. A missing or
//! unreadable file silently falls back to defaults; the core only ever
//! consumes the ordered, enabled provider subset.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::budget::DEFAULT_START_HOUR;
use crate::core::provider::ProviderId;

/// Settings file name under the config dir.
const SETTINGS_FILE: &str = "settings.json";

// =============================================================================
// Provider Config
// =============================================================================

/// Per-provider display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    pub enabled: bool,
    pub order: i32,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, enabled: bool, order: i32) -> Self {
        Self {
            id: id.into(),
            enabled,
            order,
        }
    }
}

// =============================================================================
// App Settings
// =============================================================================

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Settings file version for migrations.
    pub version: u32,

    /// Provider configurations (enabled state, display order).
    pub providers: Vec<ProviderConfig>,

    /// Refresh interval in seconds, for callers that poll repeatedly.
    pub refresh_interval_seconds: u64,

    /// Use deterministic sample data instead of network/credential access.
    pub developer_mode_enabled: bool,

    /// HTTP timeout in seconds.
    pub http_timeout_seconds: u64,

    /// Hour of day (0-23) where a "work day" begins for budget pacing.
    pub work_day_start_hour: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            providers: ProviderId::ALL
                .iter()
                .enumerate()
                .map(|(order, p)| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                    let order = order as i32;
                    ProviderConfig::new(p.cli_name(), true, order)
                })
                .collect(),
            refresh_interval_seconds: 120,
            developer_mode_enabled: false,
            http_timeout_seconds: 30,
            work_day_start_hour: DEFAULT_START_HOUR,
        }
    }
}

impl AppSettings {
    /// Enabled providers in display order. Entries with ids outside the
    /// allowed set are skipped rather than failing the whole poll.
    #[must_use]
    pub fn enabled_providers(&self) -> Vec<ProviderId> {
        let mut enabled: Vec<(i32, ProviderId)> = self
            .providers
            .iter()
            .filter(|p| p.enabled)
            .filter_map(|p| ProviderId::parse(&p.id).ok().map(|id| (p.order, id)))
            .collect();
        enabled.sort_by_key(|(order, _)| *order);
        enabled.into_iter().map(|(_, id)| id).collect()
    }

    /// Load settings from the default location, falling back to defaults
    /// when the file is missing or malformed.
    #[must_use]
    pub fn load() -> Self {
        Self::settings_path().map_or_else(Self::default, |path| Self::load_from(&path))
    }

    /// Load settings from an explicit path (tests).
    #[must_use]
    pub fn load_from(path: &std::path::Path) -> Self {
        let settings = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| match serde_json::from_str::<Self>(&raw) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e,
                        "malformed settings file, using defaults");
                    None
                }
            })
            .unwrap_or_default();
        settings.sanitized()
    }

    /// Default settings file location.
    #[must_use]
    pub fn settings_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "qpace")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Clamp out-of-range values instead of failing the poll over them.
    fn sanitized(mut self) -> Self {
        self.work_day_start_hour = self.work_day_start_hour.min(23);
        self.http_timeout_seconds = self.http_timeout_seconds.max(1);
        self
    }
}
