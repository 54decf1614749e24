//! Data models for Player13

use serde::{Deserialize, Serialize};

/// Stream played when the watch screen is opened without a payload.
pub const DEFAULT_STREAM_URL: &str = "http://ky-tv.cc:80/XTV1313XTV/XTV1313XTV/516261.m3u8";

/// Opaque channel identifier, assigned from the wall clock at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

/// User-defined named pointer to a stream address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    /// Logo address from an imported playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Group title from an imported playlist
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Data handed from the home screen to the watch screen. Never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationPayload {
    pub stream_url: String,
    pub channel_name: String,
    pub channel_logo: Option<String>,
    pub category: Option<String>,
}

impl NavigationPayload {
    pub fn for_channel(channel: &Channel) -> Self {
        Self {
            stream_url: channel.url.clone(),
            channel_name: channel.name.clone(),
            channel_logo: channel.logo.clone(),
            category: channel.group.clone(),
        }
    }

    /// The hero card's "Browse Channels" target.
    pub fn live_stream(default_url: &str) -> Self {
        Self {
            stream_url: default_url.to_string(),
            channel_name: "Live Stream".to_string(),
            channel_logo: None,
            category: Some("IPTV Channel".to_string()),
        }
    }
}

/// Top-level screens
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Welcome,
    Home,
    Watch(Option<NavigationPayload>),
}

impl Route {
    /// Resolve the stream address for a watch route, falling back to the default.
    pub fn stream_url<'a>(payload: Option<&'a NavigationPayload>, default_url: &'a str) -> &'a str {
        match payload {
            Some(p) if !p.stream_url.is_empty() => &p.stream_url,
            _ => default_url,
        }
    }
}
