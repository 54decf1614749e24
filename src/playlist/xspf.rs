//! XSPF (XML Shareable Playlist Format) playlists
//!
//! Only the fields a channel needs are read: `location`, `title`, `image`,
//! and `creator`/`album` (or the playlist title) as the group.
//!
//! Reference: https://xspf.org/spec

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use super::PlaylistEntry;
use crate::error::ImportError;

#[derive(Debug, Default)]
struct Track {
    location: Option<String>,
    title: Option<String>,
    image: Option<String>,
    creator: Option<String>,
    album: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    PlaylistTitle,
    Location,
    Title,
    Image,
    Creator,
    Album,
}

/// Check if content is an XSPF playlist
pub fn is_xspf(content: &str) -> bool {
    let head = content.trim_start();
    let head = &head[..head.len().min(4096)];
    head.contains("<playlist")
        && (head.contains("http://xspf.org/ns/0/") || content.contains("<trackList"))
}

pub fn parse_xspf(content: &str) -> Result<Vec<PlaylistEntry>, ImportError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut playlist_title: Option<String> = None;
    let mut saw_playlist = false;
    let mut track: Option<Track> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                text.clear();
                field = match e.local_name().as_ref() {
                    b"playlist" => {
                        saw_playlist = true;
                        None
                    }
                    b"track" => {
                        track = Some(Track::default());
                        None
                    }
                    b"location" if track.is_some() => Some(Field::Location),
                    b"title" if track.is_some() => Some(Field::Title),
                    b"title" => Some(Field::PlaylistTitle),
                    b"image" if track.is_some() => Some(Field::Image),
                    b"creator" if track.is_some() => Some(Field::Creator),
                    b"album" if track.is_some() => Some(Field::Album),
                    _ => None,
                };
            }
            Ok(Event::Text(ref e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(ref e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(ref e)) => {
                if field.is_some() {
                    text.push('&');
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    text.push(';');
                }
            }
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"track" {
                    if let Some(finished) = track.take() {
                        if let Some(entry) = finished.into_entry(playlist_title.as_deref()) {
                            entries.push(entry);
                        }
                    }
                } else if let Some(f) = field.take() {
                    let value = decode_entities(text.trim());
                    let value = (!value.is_empty()).then_some(value);
                    match (f, track.as_mut()) {
                        (Field::PlaylistTitle, _) => playlist_title = value,
                        (Field::Location, Some(t)) => t.location = value,
                        (Field::Title, Some(t)) => t.title = value,
                        (Field::Image, Some(t)) => t.image = value,
                        (Field::Creator, Some(t)) => t.creator = value,
                        (Field::Album, Some(t)) => t.album = value,
                        _ => {}
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ImportError::Parse(format!(
                    "XSPF error at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
        buf.clear();
    }

    if !saw_playlist {
        return Err(ImportError::Parse("missing <playlist> element".to_string()));
    }
    Ok(entries)
}

impl Track {
    fn into_entry(self, playlist_title: Option<&str>) -> Option<PlaylistEntry> {
        let url = self.location?;
        let name = self.title.unwrap_or_else(|| {
            url.rsplit('/')
                .next()
                .map(|s| s.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(s))
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown")
                .to_string()
        });
        let group = match (self.creator, self.album) {
            (Some(creator), Some(album)) => Some(format!("{} - {}", creator, album)),
            (Some(creator), None) => Some(creator),
            (None, Some(album)) => Some(album),
            (None, None) => playlist_title.map(str::to_string),
        };
        Some(PlaylistEntry {
            name,
            url,
            logo: self.image,
            group,
        })
    }
}

/// Resolve the predefined and numeric entities left in collected text.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            out.push_str(&rest[amp..]);
            return out;
        };
        let name = &after[..semi];
        let resolved = match name {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match resolved {
            Some(c) => out.push(c),
            None => out.push_str(&rest[amp..amp + semi + 2]),
        }
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_xspf() {
        let content = r#"<?xml version="1.0" encoding="UTF-8"?>
<playlist version="1" xmlns="http://xspf.org/ns/0/">
  <title>Evening</title>
  <trackList>
    <track><location>http://example.com/one.m3u8</location><title>One</title></track>
    <track><location>http://example.com/two.ts</location></track>
    <track><title>No location</title></track>
  </trackList>
</playlist>"#;

        let entries = parse_xspf(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "One");
        assert_eq!(entries[0].group.as_deref(), Some("Evening"));
        assert_eq!(entries[1].name, "two");
    }

    #[test]
    fn test_entities_in_location_and_title() {
        let content = r#"<playlist version="1" xmlns="http://xspf.org/ns/0/"><trackList>
<track>
  <location>http://example.com/play?id=1&amp;token=x</location>
  <title>Tom &amp; Jerry &#169;</title>
  <creator>Cartoons</creator>
  <album>Classics</album>
  <image>http://example.com/tj.png</image>
</track>
</trackList></playlist>"#;

        let entries = parse_xspf(content).unwrap();
        assert_eq!(entries[0].url, "http://example.com/play?id=1&token=x");
        assert_eq!(entries[0].name, "Tom & Jerry ©");
        assert_eq!(entries[0].group.as_deref(), Some("Cartoons - Classics"));
        assert_eq!(entries[0].logo.as_deref(), Some("http://example.com/tj.png"));
    }

    #[test]
    fn test_is_xspf() {
        assert!(is_xspf(r#"<playlist xmlns="http://xspf.org/ns/0/"><trackList/></playlist>"#));
        assert!(!is_xspf("#EXTM3U\n"));
    }

    #[test]
    fn test_decode_entities_keeps_unknown() {
        assert_eq!(decode_entities("a &nbsp; b &amp; c"), "a &nbsp; b & c");
        assert_eq!(decode_entities("dangling & end"), "dangling & end");
    }
}
