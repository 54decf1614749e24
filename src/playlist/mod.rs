//! Playlist import into the channel store
//!
//! Accepts M3U/M3U8 and XSPF, from a local file or an HTTP(S) address,
//! optionally gzip-compressed.

mod fetch;
mod m3u;
mod xspf;

pub use fetch::{decode_bytes, download, read_file};
pub use m3u::parse_m3u;
pub use xspf::{is_xspf, parse_xspf};

use crate::error::ImportError;

/// One importable stream, independent of the source format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaylistEntry {
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub group: Option<String>,
}

/// Where a playlist comes from
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistSource {
    File(std::path::PathBuf),
    Url(String),
}

impl PlaylistSource {
    /// Treat anything with a scheme as a URL, the rest as a path.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.contains("://") {
            PlaylistSource::Url(input.to_string())
        } else {
            PlaylistSource::File(input.into())
        }
    }

    pub fn label(&self) -> String {
        match self {
            PlaylistSource::File(path) => path.display().to_string(),
            PlaylistSource::Url(url) => url.clone(),
        }
    }
}

/// Parse playlist text, sniffing the format from the content.
pub fn parse_playlist(content: &str) -> Result<Vec<PlaylistEntry>, ImportError> {
    let content = content.trim_start_matches('\u{feff}');
    if is_xspf(content) {
        return parse_xspf(content);
    }

    let entries = parse_m3u(content);
    if entries.is_empty() && !content.trim_start().starts_with("#EXTM3U") {
        return Err(ImportError::Parse("expected #EXTM3U header or XSPF document".to_string()));
    }
    Ok(entries)
}

/// Fetch and parse a playlist. Blocking; run it off the UI thread.
pub fn load(source: &PlaylistSource, user_agent: &str) -> Result<Vec<PlaylistEntry>, ImportError> {
    let content = match source {
        PlaylistSource::File(path) => read_file(path)?,
        PlaylistSource::Url(url) => download(url, user_agent)?,
    };
    let entries = parse_playlist(&content)?;
    log::info!("Parsed {} entries from {}", entries.len(), source.label());
    Ok(entries)
}
