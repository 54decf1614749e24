//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_STREAM_URL;

/// Which engine decodes streams for the playback surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EngineKind {
    /// `ffmpeg` child process piping raw frames
    #[default]
    Pipe,
    /// Linked libav decoder (needs the `internal-player` feature)
    Internal,
}

impl EngineKind {
    pub fn label(&self) -> &'static str {
        match self {
            EngineKind::Pipe => "FFmpeg process",
            EngineKind::Internal => "Built-in decoder",
        }
    }
}

pub const USER_AGENTS: &[(&str, &str)] = &[
    ("Player13", "Player13/0.1"),
    ("VLC", "VLC/3.0.20 LibVLC/3.0.20"),
    (
        "Chrome",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    ),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,
    /// Start playback (muted) as soon as a stream is ready
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_stream_url")]
    pub default_stream_url: String,
    /// Frames are scaled down to this height before upload
    #[serde(default = "default_max_frame_height")]
    pub max_frame_height: u32,
    #[serde(default = "default_true")]
    pub hw_accel: bool,
    #[serde(default)]
    pub welcome_done: bool,
}

fn default_ffmpeg() -> String { "ffmpeg".to_string() }
fn default_ffprobe() -> String { "ffprobe".to_string() }
fn default_true() -> bool { true }
fn default_user_agent() -> String { USER_AGENTS[0].1.to_string() }
fn default_stream_url() -> String { DEFAULT_STREAM_URL.to_string() }
fn default_max_frame_height() -> u32 { 720 }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            autoplay: true,
            user_agent: default_user_agent(),
            default_stream_url: default_stream_url(),
            max_frame_height: default_max_frame_height(),
            hw_accel: true,
            welcome_done: false,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("player13");
        path.push("config.json");
        path
    }

    /// Read the config at `path`, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = fs::write(path, content) {
                    log::error!("Failed to save config {}: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("Failed to encode config: {}", e),
        }
    }

    /// Stream played by the watch screen when no payload was handed over.
    pub fn fallback_stream(&self) -> &str {
        let url = self.default_stream_url.trim();
        if url.is_empty() {
            DEFAULT_STREAM_URL
        } else {
            url
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"autoplay": false}"#).unwrap();
        assert!(!config.autoplay);
        assert_eq!(config.engine, EngineKind::Pipe);
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.default_stream_url, DEFAULT_STREAM_URL);
        assert!(!config.welcome_done);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player13").join("config.json");

        let mut config = AppConfig::default();
        config.engine = EngineKind::Internal;
        config.welcome_done = true;
        config.save_to(&path);

        assert_eq!(AppConfig::load_from(&path), config);
    }

    #[test]
    fn test_malformed_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_blank_default_stream_uses_builtin() {
        let config = AppConfig {
            default_stream_url: "  ".to_string(),
            ..Default::default()
        };
        assert_eq!(config.fallback_stream(), DEFAULT_STREAM_URL);
    }
}
