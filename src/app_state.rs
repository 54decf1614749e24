//! State shared by every screen: storage, theme, channels, routing and the
//! active playback session

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use serde_json::json;

use crate::bridge::Bridge;
use crate::channels::{ChannelStore, Deleted, ImportSummary};
use crate::config::AppConfig;
use crate::error::{ChannelError, ImportError};
use crate::models::{Channel, ChannelId, NavigationPayload, Route};
use crate::player::{MediaBackend, PlaybackSession};
use crate::playlist::{PlaylistEntry, PlaylistSource};
use crate::security::{ContentSecurityPolicy, Directive};
use crate::storage::KeyValueStore;
use crate::theme::ThemeContext;

/// Bridge channel carrying the new theme name after a toggle
pub const THEME_CHANNEL: &str = "theme";
/// Bridge channel carrying import results
pub const IMPORT_CHANNEL: &str = "import";

pub type EngineFactory = Box<dyn Fn(&AppConfig) -> Box<dyn MediaBackend>>;

pub struct AppState {
    store: Box<dyn KeyValueStore>,
    pub theme: ThemeContext,
    pub channels: ChannelStore,
    pub config: AppConfig,
    config_path: Option<PathBuf>,
    route: Route,
    session: Option<PlaybackSession>,
    policy: ContentSecurityPolicy,
    bridge: Bridge,
    engine_factory: EngineFactory,
    visuals_dirty: Rc<Cell<bool>>,
    status: Option<String>,
}

impl AppState {
    pub fn new(
        mut store: Box<dyn KeyValueStore>,
        config: AppConfig,
        policy: ContentSecurityPolicy,
        engine_factory: EngineFactory,
    ) -> Self {
        let mut theme = ThemeContext::load(store.as_ref());
        let channels = ChannelStore::load(store.as_mut());
        let route = if config.welcome_done { Route::Home } else { Route::Welcome };
        log::info!(
            "Loaded {} channels, theme {}",
            channels.len(),
            theme.theme().as_str()
        );

        // Theme changes travel over the bridge and mark the visuals stale
        let mut bridge = Bridge::new();
        let visuals_dirty = Rc::new(Cell::new(true));
        let dirty = Rc::clone(&visuals_dirty);
        bridge.on(THEME_CHANNEL, move |_| dirty.set(true));
        bridge.on(IMPORT_CHANNEL, |summary| log::debug!("Import finished: {}", summary));
        let handle = bridge.handle();
        theme.subscribe(move |t| {
            handle.send(THEME_CHANNEL, json!(t.as_str()));
        });

        Self {
            store,
            theme,
            channels,
            config,
            config_path: None,
            route,
            session: None,
            policy,
            bridge,
            engine_factory,
            visuals_dirty,
            status: None,
        }
    }

    /// Persist config changes to `path`.
    pub fn with_config_path(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn save_config(&self) {
        if let Some(ref path) = self.config_path {
            self.config.save_to(path);
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Payload of the current watch route, if any.
    pub fn now_playing(&self) -> Option<&NavigationPayload> {
        match &self.route {
            Route::Watch(payload) => payload.as_ref(),
            _ => None,
        }
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.session.as_mut()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Deliver queued bridge messages. Called once per frame.
    pub fn pump(&mut self) -> usize {
        self.bridge.dispatch_pending()
    }

    /// True once after every theme change.
    pub fn take_visuals_dirty(&self) -> bool {
        self.visuals_dirty.replace(false)
    }

    /// Switch screens. Watch routes must pass the media policy; a blocked
    /// route leaves the current screen in place and reports on the status line.
    pub fn navigate(&mut self, route: Route) -> bool {
        match route {
            Route::Watch(payload) => {
                let url = Route::stream_url(payload.as_ref(), self.config.fallback_stream()).to_string();
                if let Err(violation) = self.policy.check(Directive::Media, &url) {
                    self.status = Some(violation.to_string());
                    return false;
                }
                self.open_session(&url);
                self.route = Route::Watch(payload);
            }
            other => {
                // Leaving the watch screen tears the session down
                if self.session.take().is_some() {
                    log::debug!("Playback session closed");
                }
                self.route = other;
            }
        }
        true
    }

    fn open_session(&mut self, url: &str) {
        let autoplay = self.config.autoplay;
        match self.session {
            Some(ref mut session) => session.set_source(url, autoplay),
            None => {
                let mut session = PlaybackSession::new((self.engine_factory)(&self.config));
                session.set_source(url, autoplay);
                self.session = Some(session);
            }
        }
    }

    pub fn go_home(&mut self) {
        self.navigate(Route::Home);
    }

    /// The hero card target: the default live stream.
    pub fn browse_live(&mut self) -> bool {
        let payload = NavigationPayload::live_stream(self.config.fallback_stream());
        self.navigate(Route::Watch(Some(payload)))
    }

    /// Select a channel and open it on the watch screen.
    pub fn watch_channel(&mut self, id: ChannelId) -> bool {
        let Some(payload) = self.channels.select(id).map(NavigationPayload::for_channel) else {
            return false;
        };
        self.navigate(Route::Watch(Some(payload)))
    }

    pub fn finish_welcome(&mut self) {
        self.config.welcome_done = true;
        self.save_config();
        self.navigate(Route::Home);
    }

    pub fn toggle_theme(&mut self) {
        match self.theme.toggle(self.store.as_mut()) {
            Ok(theme) => log::info!("Theme set to {}", theme.as_str()),
            Err(e) => {
                log::error!("Failed to save theme: {}", e);
                self.status = Some(format!("Could not save theme: {}", e));
            }
        }
    }

    pub fn add_channel(&mut self, name: &str, url: &str) -> Result<Channel, ChannelError> {
        let channel = self.channels.add(self.store.as_mut(), name, url)?;
        log::info!("Added channel {}", channel.name);
        Ok(channel)
    }

    /// Remove a channel, stopping playback when it was the one selected.
    pub fn delete_channel(&mut self, id: ChannelId) -> Option<Deleted> {
        let deleted = self.channels.delete(self.store.as_mut(), id)?;
        log::info!("Deleted channel {}", deleted.channel.name);
        if deleted.was_selected {
            if let Some(ref mut session) = self.session {
                session.stop();
            }
        }
        Some(deleted)
    }

    /// Policy gate for playlist downloads. Local files are always allowed.
    pub fn check_import_source(&self, source: &PlaylistSource) -> Result<(), ImportError> {
        match source {
            PlaylistSource::File(_) => Ok(()),
            PlaylistSource::Url(url) => self
                .policy
                .check(Directive::Connect, url)
                .map_err(|v| ImportError::Blocked(v.to_string())),
        }
    }

    pub fn import_entries(&mut self, source: &str, entries: &[PlaylistEntry]) -> ImportSummary {
        let summary = self.channels.import(self.store.as_mut(), entries);
        log::info!(
            "Imported {} channels from {} ({} skipped)",
            summary.added,
            source,
            summary.skipped
        );
        self.status = Some(format!(
            "Imported {} channels ({} skipped)",
            summary.added, summary.skipped
        ));
        self.bridge.handle().send(
            IMPORT_CHANNEL,
            json!({ "source": source, "added": summary.added, "skipped": summary.skipped }),
        );
        summary
    }

    /// Whether a channel logo may be fetched.
    pub fn logo_allowed(&self, url: &str) -> bool {
        self.policy.allows(Directive::Img, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::{PlaybackPhase, PlayerEvent, QualityLevel, VideoFrame};
    use crate::security::DEFAULT_POLICY;
    use crate::storage::{MemoryStore, CHANNELS_KEY, THEME_KEY};
    use std::cell::RefCell;

    /// Engine that only records the sources it was asked to load.
    struct RecordingEngine {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl MediaBackend for RecordingEngine {
        fn load(&mut self, url: &str) {
            self.log.borrow_mut().push(format!("load {}", url));
        }
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn stop(&mut self) {
            self.log.borrow_mut().push("stop".to_string());
        }
        fn seek_to(&mut self, _fraction: f64) {}
        fn set_volume(&mut self, _volume: f32) {}
        fn set_muted(&mut self, _muted: bool) {}
        fn current_time(&self) -> f64 {
            0.0
        }
        fn duration(&self) -> Option<f64> {
            None
        }
        fn quality_levels(&self) -> Option<Vec<QualityLevel>> {
            None
        }
        fn current_level(&self) -> i32 {
            -1
        }
        fn set_level(&mut self, _level: i32) {}
        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            Vec::new()
        }
        fn take_frame(&mut self) -> Option<VideoFrame> {
            None
        }
    }

    fn state_with(store: MemoryStore, policy: &str) -> (AppState, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let engine_log = Rc::clone(&log);
        let factory: EngineFactory = Box::new(move |_: &AppConfig| {
            Box::new(RecordingEngine {
                log: Rc::clone(&engine_log),
            }) as Box<dyn MediaBackend>
        });
        let config = AppConfig {
            welcome_done: true,
            ..Default::default()
        };
        let state = AppState::new(
            Box::new(store),
            config,
            ContentSecurityPolicy::parse(policy),
            factory,
        );
        (state, log)
    }

    fn state() -> (AppState, Rc<RefCell<Vec<String>>>) {
        state_with(MemoryStore::new(), DEFAULT_POLICY)
    }

    #[test]
    fn test_first_run_starts_on_welcome() {
        let state = AppState::new(
            Box::new(MemoryStore::new()),
            AppConfig::default(),
            ContentSecurityPolicy::default(),
            Box::new(|_: &AppConfig| -> Box<dyn MediaBackend> { unreachable!() }),
        );
        assert_eq!(*state.route(), Route::Welcome);
    }

    #[test]
    fn test_watch_without_payload_plays_default_stream() {
        let (mut state, log) = state();
        assert!(state.navigate(Route::Watch(None)));

        let session = state.session().unwrap();
        assert_eq!(session.source(), Some(crate::models::DEFAULT_STREAM_URL));
        assert_eq!(session.phase(), PlaybackPhase::Loading);
        assert_eq!(log.borrow()[0], format!("load {}", crate::models::DEFAULT_STREAM_URL));
    }

    #[test]
    fn test_leaving_watch_drops_session() {
        let (mut state, log) = state();
        state.browse_live();
        assert_eq!(state.now_playing().unwrap().channel_name, "Live Stream");

        state.go_home();
        assert!(state.session().is_none());
        assert_eq!(log.borrow().last().map(String::as_str), Some("stop"));
    }

    #[test]
    fn test_blocked_media_keeps_current_route() {
        let (mut state, _) = state_with(MemoryStore::new(), "default-src 'self'");
        assert!(!state.navigate(Route::Watch(None)));

        assert_eq!(*state.route(), Route::Home);
        assert!(state.session().is_none());
        assert!(state.status().unwrap().contains("media-src"));
    }

    #[test]
    fn test_delete_selected_stops_playback() {
        let (mut state, log) = state();
        let a = state.add_channel("A", "http://example.com/a.m3u8").unwrap();
        assert!(state.watch_channel(a.id));
        log.borrow_mut().clear();

        let deleted = state.delete_channel(a.id).unwrap();
        assert!(deleted.was_selected);
        assert_eq!(*log.borrow(), vec!["stop".to_string()]);
        assert_eq!(state.session().unwrap().phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_delete_other_channel_leaves_playback_alone() {
        let (mut state, log) = state();
        let a = state.add_channel("A", "http://example.com/a.m3u8").unwrap();
        let b = state.add_channel("B", "http://example.com/b.m3u8").unwrap();
        state.watch_channel(a.id);
        log.borrow_mut().clear();

        let deleted = state.delete_channel(b.id).unwrap();
        assert!(!deleted.was_selected);
        assert!(log.borrow().is_empty());
        assert_eq!(state.channels.len(), 1);
        assert_eq!(state.channels.channels()[0].name, "A");
        assert_eq!(state.session().unwrap().phase(), PlaybackPhase::Loading);
    }

    #[test]
    fn test_switching_channels_reuses_session() {
        let (mut state, log) = state();
        let a = state.add_channel("A", "http://example.com/a.m3u8").unwrap();
        let b = state.add_channel("B", "http://example.com/b.m3u8").unwrap();
        state.watch_channel(a.id);
        state.watch_channel(b.id);

        assert_eq!(
            *log.borrow(),
            vec![
                "load http://example.com/a.m3u8".to_string(),
                "load http://example.com/b.m3u8".to_string()
            ]
        );
        assert!(state.channels.is_selected(b.id));
    }

    #[test]
    fn test_theme_toggle_marks_visuals_dirty() {
        let (mut state, _) = state_with(MemoryStore::with(THEME_KEY, "light"), DEFAULT_POLICY);
        assert!(state.take_visuals_dirty());
        assert!(!state.take_visuals_dirty());

        state.toggle_theme();
        assert!(state.theme.is_dark());
        assert_eq!(state.pump(), 1);
        assert!(state.take_visuals_dirty());
    }

    #[test]
    fn test_import_reports_and_persists() {
        let (mut state, _) = state();
        let entries = vec![
            PlaylistEntry {
                name: "One".to_string(),
                url: "http://example.com/1.m3u8".to_string(),
                ..Default::default()
            },
            PlaylistEntry {
                name: "".to_string(),
                url: "http://example.com/2.m3u8".to_string(),
                ..Default::default()
            },
        ];
        let summary = state.import_entries("test.m3u", &entries);
        assert_eq!((summary.added, summary.skipped), (1, 1));
        assert_eq!(state.status(), Some("Imported 1 channels (1 skipped)"));
        assert_eq!(state.pump(), 1);
        assert!(state.store.get(CHANNELS_KEY).unwrap().contains("One"));
    }

    #[test]
    fn test_import_and_logo_policy() {
        let (state, _) = state();
        assert!(state
            .check_import_source(&PlaylistSource::Url("https://example.com/list.m3u".to_string()))
            .is_ok());
        assert!(state.check_import_source(&PlaylistSource::parse("/tmp/list.m3u")).is_ok());

        assert!(state.logo_allowed("https://example.com/logo.png"));
        assert!(!state.logo_allowed("http://example.com/logo.png"));

        let (strict, _) = state_with(MemoryStore::new(), "default-src 'self'");
        assert!(matches!(
            strict.check_import_source(&PlaylistSource::Url("https://example.com/list.m3u".to_string())),
            Err(ImportError::Blocked(_))
        ));
    }
}
