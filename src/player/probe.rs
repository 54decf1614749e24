//! Stream inspection through `ffprobe -print_format json`

use std::process::{Command, Stdio};

use serde::Deserialize;

use super::QualityLevel;
use crate::error::PlayerError;

/// What the engine needs to know before decoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbeInfo {
    /// `None` for live streams
    pub duration: Option<f64>,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
    /// HLS variants, best first as listed by the master playlist
    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub program_id: i64,
    pub level: QualityLevel,
}

impl ProbeInfo {
    pub fn levels(&self) -> Option<Vec<QualityLevel>> {
        if self.variants.is_empty() {
            None
        } else {
            Some(self.variants.iter().map(|v| v.level.clone()).collect())
        }
    }

    pub fn variant(&self, level: i32) -> Option<&Variant> {
        usize::try_from(level).ok().and_then(|i| self.variants.get(i))
    }
}

#[derive(Debug, Deserialize, Default)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<FormatSection>,
    #[serde(default)]
    streams: Vec<StreamSection>,
    #[serde(default)]
    programs: Vec<ProgramSection>,
}

#[derive(Debug, Deserialize)]
struct FormatSection {
    #[serde(default)]
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamSection {
    #[serde(default)]
    codec_type: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProgramSection {
    program_id: i64,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
    #[serde(default)]
    streams: Vec<StreamSection>,
}

/// Run ffprobe against `url`. Blocking.
pub fn probe(ffprobe: &str, url: &str, user_agent: &str) -> Result<ProbeInfo, PlayerError> {
    let mut cmd = Command::new(ffprobe);
    cmd.args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams", "-show_programs"]);
    if is_network(url) {
        cmd.args(["-user_agent", user_agent]);
    }
    cmd.arg(url).stdin(Stdio::null());

    let output = cmd.output().map_err(|source| PlayerError::Spawn {
        program: ffprobe.to_string(),
        source,
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr.lines().last().unwrap_or("ffprobe exited with an error");
        return Err(PlayerError::Probe(message.trim().to_string()));
    }

    parse_probe(&output.stdout)
}

pub fn parse_probe(json: &[u8]) -> Result<ProbeInfo, PlayerError> {
    let output: ProbeOutput = serde_json::from_slice(json).map_err(|e| PlayerError::Probe(e.to_string()))?;

    let duration = output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or(PlayerError::NoVideo)?;
    let has_audio = output.streams.iter().any(|s| s.codec_type == "audio");

    let mut variants = Vec::new();
    for program in &output.programs {
        let Some(program_video) = program.streams.iter().find(|s| s.codec_type == "video") else {
            continue;
        };
        let bitrate = program
            .tags
            .get("variant_bitrate")
            .and_then(|b| b.parse().ok())
            .unwrap_or(0);
        let index = variants.len() as i32;
        variants.push(Variant {
            program_id: program.program_id,
            level: QualityLevel::new(
                index,
                program_video.width.unwrap_or(0),
                program_video.height.unwrap_or(0),
                bitrate,
            ),
        });
    }
    // A single program is just the stream itself
    if variants.len() < 2 {
        variants.clear();
    }

    Ok(ProbeInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio,
        variants,
    })
}

pub fn is_network(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HLS_MASTER: &str = r#"{
        "programs": [
            {"program_id": 0, "program_num": 0, "nb_streams": 2,
             "tags": {"variant_bitrate": "2500000"},
             "streams": [{"index": 0, "codec_type": "video", "width": 1280, "height": 720},
                         {"index": 1, "codec_type": "audio"}]},
            {"program_id": 1, "program_num": 1, "nb_streams": 2,
             "tags": {"variant_bitrate": "800000"},
             "streams": [{"index": 2, "codec_type": "video", "width": 640, "height": 360},
                         {"index": 3, "codec_type": "audio"}]}
        ],
        "streams": [
            {"index": 0, "codec_type": "video", "width": 1280, "height": 720},
            {"index": 1, "codec_type": "audio"},
            {"index": 2, "codec_type": "video", "width": 640, "height": 360},
            {"index": 3, "codec_type": "audio"}
        ],
        "format": {"format_name": "hls", "duration": "N/A"}
    }"#;

    #[test]
    fn test_hls_master_lists_variants() {
        let info = parse_probe(HLS_MASTER.as_bytes()).unwrap();
        assert_eq!(info.duration, None);
        assert!(info.has_audio);
        assert_eq!((info.width, info.height), (1280, 720));

        let levels = info.levels().unwrap();
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].name, "720p");
        assert_eq!(levels[1].bitrate, 800_000);
        assert_eq!(info.variant(1).map(|v| v.program_id), Some(1));
        assert!(info.variant(-1).is_none());
    }

    #[test]
    fn test_file_with_duration_has_no_levels() {
        let json = r#"{
            "programs": [],
            "streams": [{"codec_type": "video", "width": 1920, "height": 1080}],
            "format": {"duration": "125.500000"}
        }"#;
        let info = parse_probe(json.as_bytes()).unwrap();
        assert_eq!(info.duration, Some(125.5));
        assert!(!info.has_audio);
        assert!(info.levels().is_none());
    }

    #[test]
    fn test_audio_only_is_rejected() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#;
        assert!(matches!(parse_probe(json.as_bytes()), Err(PlayerError::NoVideo)));
    }

    #[test]
    fn test_is_network() {
        assert!(is_network("HTTPS://example.com/a.m3u8"));
        assert!(!is_network("/videos/a.mp4"));
        assert!(!is_network("udp://@233.50.230.1:5000"));
    }
}
