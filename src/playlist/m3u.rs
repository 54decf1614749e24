//! M3U / M3U8 channel lists (`#EXTINF` with tvg attributes)

use std::collections::HashMap;

use super::PlaylistEntry;

/// Parse M3U content into entries. Lines that are not attached to an
/// `#EXTINF` header still import, named after the last path segment.
pub fn parse_m3u(content: &str) -> Vec<PlaylistEntry> {
    let mut entries = Vec::new();
    let mut attrs: HashMap<String, String> = HashMap::new();
    let mut title: Option<String> = None;
    let mut group_line: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(info) = line.strip_prefix("#EXTINF:") {
            attrs.clear();
            group_line = None;
            let (attr_part, name) = split_title(info);
            read_attrs(attr_part, &mut attrs);
            title = Some(name.trim().to_string());
        } else if let Some(group) = line.strip_prefix("#EXTGRP:") {
            group_line = Some(group.trim().to_string());
        } else if !line.starts_with('#') {
            let name = title
                .take()
                .filter(|n| !n.is_empty())
                .or_else(|| attrs.get("tvg-name").cloned())
                .unwrap_or_else(|| name_from_url(line));

            entries.push(PlaylistEntry {
                name,
                url: line.to_string(),
                logo: attrs.remove("tvg-logo"),
                group: attrs.remove("group-title").or_else(|| group_line.take()),
            });
            attrs.clear();
            group_line = None;
        }
    }

    entries
}

/// Split `-1 tvg-id="x" group-title="a, b",Name` at the comma that ends the
/// attribute list. Commas inside quotes do not count; with unbalanced quotes
/// the last comma is used.
fn split_title(info: &str) -> (&str, &str) {
    let mut in_quotes = false;
    for (i, c) in info.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => return (&info[..i], &info[i + 1..]),
            _ => {}
        }
    }
    match info.rfind(',') {
        Some(i) => (&info[..i], &info[i + 1..]),
        None => (info, ""),
    }
}

/// Read `key="value"` and `key=value` pairs after the duration.
fn read_attrs(part: &str, attrs: &mut HashMap<String, String>) {
    let mut rest = part.trim_start();

    // leading duration, e.g. "-1" or "0"
    let duration_end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '-' || c == '.'))
        .unwrap_or(rest.len());
    rest = &rest[duration_end..];

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '"');
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].trim().to_lowercase();
        rest = &rest[eq + 1..];

        let value = if let Some(quoted) = rest.strip_prefix('"') {
            match quoted.find('"') {
                Some(end) => {
                    let value = &quoted[..end];
                    rest = &quoted[end + 1..];
                    value
                }
                None => {
                    let value = quoted;
                    rest = "";
                    value
                }
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let value = &rest[..end];
            rest = &rest[end..];
            value
        };

        if !key.is_empty() && !key.contains(char::is_whitespace) && !value.is_empty() {
            attrs.insert(key, value.to_string());
        }
    }
}

fn name_from_url(url: &str) -> String {
    let last = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    let stem = last.rsplit_once('.').map(|(s, _)| s).unwrap_or(last);
    if stem.is_empty() {
        url.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
#[path = "m3u_tests.rs"]
mod tests;
