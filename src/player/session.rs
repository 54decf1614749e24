//! Playback state mirrored from the engine plus the gesture handling of the
//! control overlay
//!
//! All timing is passed in as `Instant`s so the update loop decides when
//! deadlines fire.

use std::time::{Duration, Instant};

use eframe::egui::Key;

use super::{MediaBackend, PlayerEvent, QualityLevel, VideoFrame, AUTO_LEVEL};

pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);
pub const HIDE_DELAY: Duration = Duration::from_secs(3);
pub const VOLUME_STEP: f32 = 0.1;
/// Upper bound of the seek bar
pub const MAX_PLAYED: f64 = 0.999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
}

pub struct PlaybackSession {
    engine: Box<dyn MediaBackend>,
    source: Option<String>,
    phase: PlaybackPhase,
    playing: bool,
    muted: bool,
    volume: f32,
    played: f64,
    duration: f64,
    ready: bool,
    loading: bool,
    seeking: bool,
    fullscreen: bool,
    fullscreen_request: Option<bool>,
    qualities: Vec<QualityLevel>,
    current_quality: i32,
    quality_menu_open: bool,
    controls_visible: bool,
    hide_deadline: Option<Instant>,
    next_poll: Option<Instant>,
    live_frame: Option<VideoFrame>,
    live_frame_id: u64,
    snapshot: Option<VideoFrame>,
    snapshot_id: u64,
    last_error: Option<String>,
}

impl PlaybackSession {
    pub fn new(engine: Box<dyn MediaBackend>) -> Self {
        Self {
            engine,
            source: None,
            phase: PlaybackPhase::Idle,
            playing: false,
            muted: false,
            volume: 1.0,
            played: 0.0,
            duration: 0.0,
            ready: false,
            loading: false,
            seeking: false,
            fullscreen: false,
            fullscreen_request: None,
            qualities: Vec::new(),
            current_quality: AUTO_LEVEL,
            quality_menu_open: false,
            controls_visible: true,
            hide_deadline: None,
            next_poll: None,
            live_frame: None,
            live_frame_id: 0,
            snapshot: None,
            snapshot_id: 0,
            last_error: None,
        }
    }

    /// Load a new source. Autoplayed sources start muted.
    pub fn set_source(&mut self, url: &str, autoplay: bool) {
        log::info!("Playing {} (autoplay: {})", url, autoplay);
        self.source = Some(url.to_string());
        self.ready = false;
        self.loading = true;
        self.seeking = false;
        self.playing = autoplay;
        self.muted = autoplay;
        self.played = 0.0;
        self.duration = 0.0;
        self.qualities.clear();
        self.current_quality = AUTO_LEVEL;
        self.quality_menu_open = false;
        self.snapshot = None;
        self.live_frame = None;
        self.last_error = None;
        self.next_poll = None;
        self.phase = PlaybackPhase::Loading;

        self.engine.load(url);
        self.engine.set_volume(self.volume);
        self.engine.set_muted(self.muted);
        if autoplay {
            self.engine.play();
        }
    }

    /// Drain engine events and frames, poll progress and run the hide timer.
    pub fn pump(&mut self, now: Instant) {
        for event in self.engine.poll_events() {
            self.handle_event(event);
        }

        if let Some(frame) = self.engine.take_frame() {
            if self.snapshot.is_none() {
                self.live_frame = Some(frame);
                self.live_frame_id += 1;
            }
        }

        if self.playing && !self.seeking && self.next_poll.map_or(true, |t| now >= t) {
            self.poll_progress();
            self.next_poll = Some(now + PROGRESS_INTERVAL);
        }

        self.tick(now);
    }

    fn poll_progress(&mut self) {
        self.duration = self.engine.duration().unwrap_or(0.0);
        self.played = if self.duration > 0.0 {
            (self.engine.current_time() / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        log::debug!("Player event {:?}", event);
        match event {
            PlayerEvent::Ready => {
                self.ready = true;
                self.loading = false;
                self.duration = self.engine.duration().unwrap_or(0.0);
                if let Some(levels) = self.engine.quality_levels() {
                    self.qualities = levels;
                    self.current_quality = self.engine.current_level();
                }
                self.phase = PlaybackPhase::Ready;
            }
            PlayerEvent::Play => {
                self.playing = true;
                self.loading = false;
                self.snapshot = None;
                self.phase = PlaybackPhase::Playing;
            }
            PlayerEvent::Pause => {
                self.playing = false;
                self.freeze();
                self.phase = PlaybackPhase::Paused;
            }
            PlayerEvent::Ended => {
                self.playing = false;
                self.freeze();
                self.phase = PlaybackPhase::Ended;
            }
            PlayerEvent::Waiting => {
                self.loading = true;
                self.phase = PlaybackPhase::Loading;
            }
            PlayerEvent::CanPlay => {
                self.loading = false;
                if self.phase == PlaybackPhase::Loading && self.ready {
                    self.phase = if self.playing {
                        PlaybackPhase::Playing
                    } else {
                        PlaybackPhase::Ready
                    };
                }
            }
            PlayerEvent::Error(message) => {
                log::error!("Video playback error: {}", message);
                self.last_error = Some(message);
            }
        }
    }

    /// Keep showing the last decoded frame.
    fn freeze(&mut self) {
        if let Some(frame) = self.live_frame.clone() {
            self.snapshot = Some(frame);
            self.snapshot_id += 1;
        }
    }

    /// Ignored until the engine reported ready. Playing after the end
    /// rewinds to the start first.
    pub fn toggle_play_pause(&mut self) -> bool {
        if !self.ready {
            return false;
        }
        if self.playing {
            self.playing = false;
            self.engine.pause();
        } else {
            if self.phase == PlaybackPhase::Ended {
                self.played = 0.0;
                self.engine.seek_to(0.0);
                self.next_poll = None;
            }
            self.playing = true;
            self.engine.play();
        }
        true
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
        self.engine.set_muted(self.muted);
    }

    /// Zero mutes, anything else unmutes.
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume = volume;
        self.muted = volume == 0.0;
        self.engine.set_volume(volume);
        self.engine.set_muted(self.muted);
    }

    pub fn seek_begin(&mut self) {
        self.seeking = true;
    }

    pub fn seek_drag(&mut self, fraction: f64) {
        self.played = fraction.clamp(0.0, MAX_PLAYED);
    }

    /// Issue the one seek for this drag and resume polling on the next pump.
    pub fn seek_end(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, MAX_PLAYED);
        self.seeking = false;
        self.played = fraction;
        self.engine.seek_to(fraction);
        self.next_poll = None;
    }

    /// Ask the host to flip fullscreen. State changes only when the host
    /// reports back through [`Self::on_fullscreen_changed`].
    pub fn request_fullscreen(&mut self) {
        self.fullscreen_request = Some(!self.fullscreen);
    }

    pub fn take_fullscreen_request(&mut self) -> Option<bool> {
        self.fullscreen_request.take()
    }

    pub fn on_fullscreen_changed(&mut self, fullscreen: bool) {
        if self.fullscreen != fullscreen {
            log::debug!("Fullscreen now {}", fullscreen);
        }
        self.fullscreen = fullscreen;
    }

    pub fn pointer_moved(&mut self, now: Instant) {
        self.controls_visible = true;
        self.hide_deadline = Some(now + HIDE_DELAY);
    }

    pub fn pointer_left(&mut self) {
        if self.playing {
            self.controls_visible = false;
            self.hide_deadline = None;
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(deadline) = self.hide_deadline {
            if now >= deadline {
                self.hide_deadline = None;
                if self.playing {
                    self.controls_visible = false;
                }
            }
        }
    }

    pub fn toggle_quality_menu(&mut self) {
        if self.qualities.is_empty() {
            return;
        }
        self.quality_menu_open = !self.quality_menu_open;
    }

    pub fn close_quality_menu(&mut self) {
        self.quality_menu_open = false;
    }

    /// Pin the engine to a level, or [`AUTO_LEVEL`].
    pub fn select_quality(&mut self, level: i32) {
        self.engine.set_level(level);
        self.current_quality = level;
        self.quality_menu_open = false;
    }

    /// Keyboard shortcuts. Returns true when the key was consumed.
    pub fn handle_key(&mut self, key: Key) -> bool {
        match key {
            Key::Space => {
                self.toggle_play_pause();
            }
            Key::M => self.toggle_mute(),
            Key::F => self.request_fullscreen(),
            Key::ArrowUp => self.set_volume(step_volume(self.volume, VOLUME_STEP)),
            Key::ArrowDown => self.set_volume(step_volume(self.volume, -VOLUME_STEP)),
            Key::Escape if self.quality_menu_open => self.close_quality_menu(),
            _ => return false,
        }
        true
    }

    pub fn stop(&mut self) {
        if self.source.take().is_some() {
            log::info!("Playback stopped");
        }
        self.engine.stop();
        self.phase = PlaybackPhase::Idle;
        self.playing = false;
        self.ready = false;
        self.loading = false;
        self.seeking = false;
        self.played = 0.0;
        self.duration = 0.0;
        self.qualities.clear();
        self.current_quality = AUTO_LEVEL;
        self.quality_menu_open = false;
        self.controls_visible = true;
        self.hide_deadline = None;
        self.live_frame = None;
        self.snapshot = None;
    }

    /// How soon the UI must redraw for the session's timers.
    pub fn repaint_after(&self, now: Instant) -> Option<Duration> {
        if self.playing || self.loading {
            return Some(Duration::from_millis(16));
        }
        self.hide_deadline.map(|d| d.saturating_duration_since(now))
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Value for the volume slider: zero while muted.
    pub fn volume_display(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn played(&self) -> f64 {
        self.played
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn elapsed(&self) -> f64 {
        self.duration * self.played
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn qualities(&self) -> &[QualityLevel] {
        &self.qualities
    }

    pub fn current_quality(&self) -> i32 {
        self.current_quality
    }

    pub fn quality_menu_open(&self) -> bool {
        self.quality_menu_open && !self.qualities.is_empty()
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    pub fn live_frame(&self) -> Option<(u64, &VideoFrame)> {
        self.live_frame.as_ref().map(|f| (self.live_frame_id, f))
    }

    /// Frame shown instead of the live surface while paused or ended.
    pub fn snapshot(&self) -> Option<(u64, &VideoFrame)> {
        self.snapshot.as_ref().map(|f| (self.snapshot_id, f))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

fn step_volume(volume: f32, delta: f32) -> f32 {
    ((volume + delta) * 10.0).round() / 10.0
}

/// `m:ss`, or `h:mm:ss` once there are hours.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
