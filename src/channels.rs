//! Channel list backed by the key-value store
//!
//! The list is ordered by insertion and written back as a whole after every
//! mutation. Ids come from the wall clock in milliseconds, bumped past the
//! largest existing id when the clock has not advanced.

use crate::error::ChannelError;
use crate::models::{Channel, ChannelId};
use crate::playlist::PlaylistEntry;
use crate::storage::{KeyValueStore, CHANNELS_KEY};

/// Key under which an unreadable channel list is preserved.
pub const CORRUPT_CHANNELS_KEY: &str = "iptvChannels.corrupt";

/// What the channel list should render for a given filter.
#[derive(Debug, PartialEq)]
pub enum ChannelListView<'a> {
    /// The store holds no channels at all.
    Empty,
    /// Channels exist but none match the filter.
    NoMatches,
    Items(Vec<&'a Channel>),
}

impl ChannelListView<'_> {
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            ChannelListView::Empty => Some("No channels added yet"),
            ChannelListView::NoMatches => Some("No channels found"),
            ChannelListView::Items(_) => None,
        }
    }
}

/// Result of a successful delete
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub channel: Channel,
    /// The removed channel was the selected (playing) one.
    pub was_selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: Vec<Channel>,
    selected: Option<ChannelId>,
}

impl ChannelStore {
    /// Load from storage. An absent key is an empty list. An unreadable value
    /// is copied to [`CORRUPT_CHANNELS_KEY`] and the list starts empty.
    pub fn load(store: &mut dyn KeyValueStore) -> Self {
        let Some(raw) = store.get(CHANNELS_KEY) else {
            return Self::default();
        };

        match serde_json::from_str::<Vec<Channel>>(&raw) {
            Ok(channels) => {
                log::info!("Loaded {} channels", channels.len());
                Self {
                    channels: dedupe_ids(channels),
                    selected: None,
                }
            }
            Err(e) => {
                log::warn!("Stored channel list is unreadable ({}), starting empty", e);
                if let Err(e) = store.set(CORRUPT_CHANNELS_KEY, raw) {
                    log::error!("Could not preserve unreadable channel list: {}", e);
                }
                Self::default()
            }
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Validate, assign an id, append and persist.
    pub fn add(&mut self, store: &mut dyn KeyValueStore, name: &str, url: &str) -> Result<Channel, ChannelError> {
        self.add_at(store, name, url, now_millis())
    }

    pub(crate) fn add_at(
        &mut self,
        store: &mut dyn KeyValueStore,
        name: &str,
        url: &str,
        now_ms: u64,
    ) -> Result<Channel, ChannelError> {
        let channel = self.build(name, url, now_ms)?;
        log::info!("Added channel {:?} ({})", channel.name, channel.id.0);
        self.channels.push(channel.clone());
        self.persist(store);
        Ok(channel)
    }

    fn build(&self, name: &str, url: &str, now_ms: u64) -> Result<Channel, ChannelError> {
        let name = name.trim();
        let url = url.trim();
        if name.is_empty() {
            return Err(ChannelError::MissingName);
        }
        if url.is_empty() {
            return Err(ChannelError::MissingUrl);
        }
        Ok(Channel {
            id: self.next_id(now_ms),
            name: name.to_string(),
            url: url.to_string(),
            logo: None,
            group: None,
        })
    }

    fn next_id(&self, now_ms: u64) -> ChannelId {
        match self.channels.iter().map(|c| c.id.0).max() {
            Some(max) if now_ms <= max => ChannelId(max + 1),
            _ => ChannelId(now_ms),
        }
    }

    pub fn delete(&mut self, store: &mut dyn KeyValueStore, id: ChannelId) -> Option<Deleted> {
        let pos = self.channels.iter().position(|c| c.id == id)?;
        let channel = self.channels.remove(pos);
        let was_selected = self.selected == Some(id);
        if was_selected {
            self.selected = None;
        }
        log::info!("Deleted channel {:?} (selected: {})", channel.name, was_selected);
        self.persist(store);
        Some(Deleted { channel, was_selected })
    }

    /// Case-insensitive containment filter over names. Never mutates.
    pub fn search(&self, query: &str) -> ChannelListView<'_> {
        if self.channels.is_empty() {
            return ChannelListView::Empty;
        }

        let query = query.trim().to_lowercase();
        let items: Vec<&Channel> = if query.is_empty() {
            self.channels.iter().collect()
        } else {
            self.channels
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&query))
                .collect()
        };

        if items.is_empty() {
            ChannelListView::NoMatches
        } else {
            ChannelListView::Items(items)
        }
    }

    pub fn select(&mut self, id: ChannelId) -> Option<&Channel> {
        let channel = self.channels.iter().find(|c| c.id == id)?;
        self.selected = Some(id);
        Some(channel)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Channel> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn is_selected(&self, id: ChannelId) -> bool {
        self.selected == Some(id)
    }

    /// Bulk add from a parsed playlist. Entries with an empty name or url, or
    /// whose url is already present, are skipped. Persists once.
    pub fn import(&mut self, store: &mut dyn KeyValueStore, entries: &[PlaylistEntry]) -> ImportSummary {
        self.import_at(store, entries, now_millis())
    }

    pub(crate) fn import_at(
        &mut self,
        store: &mut dyn KeyValueStore,
        entries: &[PlaylistEntry],
        now_ms: u64,
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for entry in entries {
            let url = entry.url.trim();
            if self.channels.iter().any(|c| c.url == url) {
                summary.skipped += 1;
                continue;
            }
            match self.build(&entry.name, url, now_ms) {
                Ok(mut channel) => {
                    channel.logo = entry.logo.clone();
                    channel.group = entry.group.clone();
                    self.channels.push(channel);
                    summary.added += 1;
                }
                Err(_) => summary.skipped += 1,
            }
        }

        if summary.added > 0 {
            self.persist(store);
        }
        log::info!("Imported {} channels ({} skipped)", summary.added, summary.skipped);
        summary
    }

    fn persist(&self, store: &mut dyn KeyValueStore) {
        let result = serde_json::to_string(&self.channels)
            .map_err(crate::error::StorageError::from)
            .and_then(|json| store.set(CHANNELS_KEY, json));
        if let Err(e) = result {
            log::error!("Failed to save channels: {}", e);
        }
    }
}

/// Hand-edited storage may repeat ids; later duplicates get fresh ones.
fn dedupe_ids(mut channels: Vec<Channel>) -> Vec<Channel> {
    let mut seen = std::collections::HashSet::new();
    let mut max = channels.iter().map(|c| c.id.0).max().unwrap_or(0);
    for channel in channels.iter_mut() {
        if !seen.insert(channel.id) {
            max += 1;
            log::warn!("Duplicate channel id {} reassigned to {}", channel.id.0, max);
            channel.id = ChannelId(max);
            seen.insert(channel.id);
        }
    }
    channels
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
#[path = "channels_tests.rs"]
mod tests;
