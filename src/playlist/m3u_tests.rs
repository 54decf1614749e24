//! Tests for M3U and M3U8 playlist parsing

use super::*;

#[test]
fn test_parse_m3u() {
    let content = r#"
#EXTM3U
#EXTINF:-1 tvg-id="cnn" group-title="News",CNN
http://example.com/live/user/pass/1.ts
#EXTINF:-1 tvg-id="bbc" group-title="News",BBC
http://example.com/live/user/pass/2.ts
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "CNN");
    assert_eq!(entries[0].group.as_deref(), Some("News"));
    assert_eq!(entries[1].url, "http://example.com/live/user/pass/2.ts");
}

#[test]
fn test_logo_and_unquoted_attrs() {
    let content = r#"#EXTM3U
#EXTINF:-1 tvg-id=unquoted tvg-logo="http://example.com/logo.png" group-title="Quoted Group",Test Channel
http://example.com/stream.m3u8
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Test Channel");
    assert_eq!(entries[0].logo.as_deref(), Some("http://example.com/logo.png"));
    assert_eq!(entries[0].group.as_deref(), Some("Quoted Group"));
}

#[test]
fn test_comma_inside_quoted_group() {
    let content = r#"#EXTM3U
#EXTINF:-1 group-title="News, Weather",Local 5
http://example.com/5.m3u8
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries[0].name, "Local 5");
    assert_eq!(entries[0].group.as_deref(), Some("News, Weather"));
}

#[test]
fn test_stray_quote_before_attribute() {
    let content = r#"#EXTM3U
#EXTINF:0 tvg-logo="https://example.com/logo.png" "tvg-name="SRF1.ch" group-title="Deutsch", SRF 1 FHD
udp://@233.50.230.1:5000
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "SRF 1 FHD");
    assert_eq!(entries[0].logo.as_deref(), Some("https://example.com/logo.png"));
    assert_eq!(entries[0].group.as_deref(), Some("Deutsch"));
    assert_eq!(entries[0].url, "udp://@233.50.230.1:5000");
}

#[test]
fn test_extgrp_and_missing_title() {
    let content = r#"#EXTM3U
#EXTINF:-1 tvg-name="Fallback Name",
#EXTGRP:Sports
http://example.com/sports.m3u8
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries[0].name, "Fallback Name");
    assert_eq!(entries[0].group.as_deref(), Some("Sports"));
}

#[test]
fn test_bare_urls_are_named_from_path() {
    let content = "#EXTM3U\nhttp://example.com/live/channel_one.m3u8?token=abc\n";
    let entries = parse_m3u(content);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "channel_one");
    assert!(entries[0].group.is_none());
}

#[test]
fn test_attributes_do_not_leak_between_entries() {
    let content = r#"#EXTM3U
#EXTINF:-1 tvg-logo="http://example.com/a.png" group-title="A",First
http://example.com/1.m3u8
http://example.com/2.m3u8
"#;
    let entries = parse_m3u(content);
    assert_eq!(entries.len(), 2);
    assert!(entries[1].logo.is_none());
    assert!(entries[1].group.is_none());
    assert_eq!(entries[1].name, "2");
}
