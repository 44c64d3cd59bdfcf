//! Application settings

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding `catalog.base_url`
pub const CATALOG_URL_ENV: &str = "POLYFORM_CATALOG_URL";

/// Catalog service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Base URL of the catalog service; `None` runs offline
    pub base_url: Option<String>,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 250,
        }
    }
}

impl CatalogSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Predictive cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Candidate symbols computed per warming pass
    pub max_candidates: usize,
    /// Entries kept before the oldest are evicted
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_candidates: 20,
            capacity: 4096,
        }
    }
}

/// Edge snapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Largest point-to-edge distance that still counts as a candidate
    pub threshold: f64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self { threshold: 0.25 }
    }
}

/// Frame loop cadence for the driver binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSettings {
    pub interval_ms: u64,
    /// Frames to run before exiting
    pub frames: u64,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            interval_ms: 16,
            frames: 120,
        }
    }
}

impl FrameSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// All application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub snap: SnapSettings,
    #[serde(default)]
    pub frame: FrameSettings,
    /// JSON reference set used instead of the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_path: Option<PathBuf>,
}

impl AppSettings {
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "polyform", "polyform")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    /// Load settings from file, or return default if not found.
    /// `POLYFORM_CATALOG_URL` wins over the file.
    pub fn load() -> Self {
        let mut settings: Self = Self::config_path()
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_default();
        settings.apply_env();
        settings
    }

    /// Settings stored at `path`; `None` if missing or unreadable
    pub fn load_from(path: &Path) -> Option<Self> {
        let json = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&json) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(path = %path.display(), "ignoring settings file: {e}");
                None
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(CATALOG_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.catalog.base_url = Some(url.trim_end_matches('/').to_string());
            }
        }
    }

    /// Save settings to file
    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Err(e) = self.save_to(&path) {
                tracing::warn!(path = %path.display(), "saving settings failed: {e}");
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
