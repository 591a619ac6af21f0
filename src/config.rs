use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;

/// Results per search page. A page returning exactly this many items
/// signals that another page may follow.
pub const PAGE_SIZE: u32 = 12;
/// Results per trending-feed page.
pub const TRENDING_PAGE_SIZE: u32 = 15;
/// Quiet window before a typed query fires.
pub const DEBOUNCE_MS: u64 = 300;

/// Client configuration: service endpoints, provider credentials, and
/// tuning knobs. Loaded from an optional TOML file with `MEDLEY_*`
/// environment overrides applied on top.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MedleyConfig {
    /// Backend REST base, e.g. `http://localhost:5000/api`.
    pub backend_url: String,
    /// Image provider base URL.
    pub image_api_url: String,
    /// Image provider access key (sent as `Client-ID`).
    pub image_access_key: Option<String>,
    /// Video provider base URL.
    pub video_api_url: String,
    /// Video provider API key (sent raw in `Authorization`).
    pub video_api_key: Option<String>,
    pub page_size: u32,
    pub trending_page_size: u32,
    pub debounce_ms: u64,
    /// Override for the persisted-state file location.
    pub state_file: Option<PathBuf>,
}

impl Default for MedleyConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000/api".to_string(),
            image_api_url: "https://api.unsplash.com".to_string(),
            image_access_key: None,
            video_api_url: "https://api.pexels.com/videos".to_string(),
            video_api_key: None,
            page_size: PAGE_SIZE,
            trending_page_size: TRENDING_PAGE_SIZE,
            debounce_ms: DEBOUNCE_MS,
            state_file: None,
        }
    }
}

impl MedleyConfig {
    /// Load configuration: defaults, then the config file (if present),
    /// then environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match Self::default_config_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading config: {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("parsing config: {}", path.display()))?
            }
            _ => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    /// `medley.toml` under the user's config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "medley", "medley").map(|p| p.config_dir().join("medley.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("MEDLEY_BACKEND_URL") {
            if !v.trim().is_empty() {
                self.backend_url = v;
            }
        }
        if let Ok(v) = std::env::var("MEDLEY_IMAGE_API_URL") {
            if !v.trim().is_empty() {
                self.image_api_url = v;
            }
        }
        if let Ok(v) = std::env::var("MEDLEY_IMAGE_ACCESS_KEY") {
            if !v.trim().is_empty() {
                self.image_access_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("MEDLEY_VIDEO_API_URL") {
            if !v.trim().is_empty() {
                self.video_api_url = v;
            }
        }
        if let Ok(v) = std::env::var("MEDLEY_VIDEO_API_KEY") {
            if !v.trim().is_empty() {
                self.video_api_key = Some(v);
            }
        }
        if let Some(n) = std::env::var("MEDLEY_PAGE_SIZE").ok().and_then(|s| s.parse().ok()) {
            self.page_size = n;
        }
        if let Some(n) = std::env::var("MEDLEY_DEBOUNCE_MS").ok().and_then(|s| s.parse().ok()) {
            self.debounce_ms = n;
        }
        if let Ok(v) = std::env::var("MEDLEY_STATE_FILE") {
            if !v.trim().is_empty() {
                self.state_file = Some(PathBuf::from(v));
            }
        }
    }
}
