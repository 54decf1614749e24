//! Tests for the playback session, driven by a scripted engine

use super::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(f32),
    Muted(bool),
    Level(i32),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    events: VecDeque<PlayerEvent>,
    frames: VecDeque<VideoFrame>,
    time: f64,
    duration: Option<f64>,
    levels: Option<Vec<QualityLevel>>,
    level: i32,
}

#[derive(Clone, Default)]
struct FakeEngine(Rc<RefCell<Script>>);

impl FakeEngine {
    fn push(&self, event: PlayerEvent) {
        self.0.borrow_mut().events.push_back(event);
    }

    fn frame(&self, marker: u8) {
        self.0.borrow_mut().frames.push_back(VideoFrame {
            width: 1,
            height: 1,
            data: vec![marker; 3],
            time: 0.0,
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    fn seeks(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::Seek(_))).count()
    }

    fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }
}

impl MediaBackend for FakeEngine {
    fn load(&mut self, url: &str) {
        self.0.borrow_mut().calls.push(Call::Load(url.to_string()));
    }
    fn play(&mut self) {
        self.0.borrow_mut().calls.push(Call::Play);
    }
    fn pause(&mut self) {
        self.0.borrow_mut().calls.push(Call::Pause);
    }
    fn stop(&mut self) {
        self.0.borrow_mut().calls.push(Call::Stop);
    }
    fn seek_to(&mut self, fraction: f64) {
        self.0.borrow_mut().calls.push(Call::Seek(fraction));
    }
    fn set_volume(&mut self, volume: f32) {
        self.0.borrow_mut().calls.push(Call::Volume(volume));
    }
    fn set_muted(&mut self, muted: bool) {
        self.0.borrow_mut().calls.push(Call::Muted(muted));
    }
    fn current_time(&self) -> f64 {
        self.0.borrow().time
    }
    fn duration(&self) -> Option<f64> {
        self.0.borrow().duration
    }
    fn quality_levels(&self) -> Option<Vec<QualityLevel>> {
        self.0.borrow().levels.clone()
    }
    fn current_level(&self) -> i32 {
        self.0.borrow().level
    }
    fn set_level(&mut self, level: i32) {
        let mut script = self.0.borrow_mut();
        script.level = level;
        script.calls.push(Call::Level(level));
    }
    fn poll_events(&mut self) -> Vec<PlayerEvent> {
        self.0.borrow_mut().events.drain(..).collect()
    }
    fn take_frame(&mut self) -> Option<VideoFrame> {
        self.0.borrow_mut().frames.pop_back()
    }
}

fn session() -> (FakeEngine, PlaybackSession) {
    let engine = FakeEngine::default();
    engine.0.borrow_mut().level = AUTO_LEVEL;
    let session = PlaybackSession::new(Box::new(engine.clone()));
    (engine, session)
}

/// Loaded, ready and playing a 100 s source
fn playing_session(now: Instant) -> (FakeEngine, PlaybackSession) {
    let (engine, mut s) = session();
    engine.0.borrow_mut().duration = Some(100.0);
    s.set_source("http://example.com/a.m3u8", true);
    engine.push(PlayerEvent::Ready);
    engine.push(PlayerEvent::Play);
    s.pump(now);
    engine.clear_calls();
    (engine, s)
}

#[test]
fn test_set_source_resets_and_autoplays_muted() {
    let (engine, mut s) = session();
    s.set_source("http://example.com/a.m3u8", true);

    assert_eq!(s.phase(), PlaybackPhase::Loading);
    assert!(s.is_playing());
    assert!(s.is_muted());
    assert!(!s.is_ready());
    assert!(s.is_loading());
    let calls = engine.calls();
    assert_eq!(calls[0], Call::Load("http://example.com/a.m3u8".to_string()));
    assert!(calls.contains(&Call::Play));
    assert!(calls.contains(&Call::Muted(true)));
}

#[test]
fn test_toggle_play_is_ignored_until_ready() {
    let (engine, mut s) = session();
    s.set_source("http://example.com/a.m3u8", false);
    engine.clear_calls();

    assert!(!s.toggle_play_pause());
    assert!(engine.calls().is_empty());
    assert!(!s.is_playing());

    engine.push(PlayerEvent::Ready);
    s.pump(Instant::now());
    assert_eq!(s.phase(), PlaybackPhase::Ready);
    assert!(s.toggle_play_pause());
    assert_eq!(engine.calls(), vec![Call::Play]);
}

#[test]
fn test_ready_reads_duration_and_levels() {
    let (engine, mut s) = session();
    {
        let mut script = engine.0.borrow_mut();
        script.duration = Some(3725.0);
        script.levels = Some(vec![QualityLevel::new(0, 1280, 720, 2_000_000), QualityLevel::new(1, 0, 0, 500_000)]);
    }
    s.set_source("http://example.com/master.m3u8", true);
    engine.push(PlayerEvent::Ready);
    s.pump(Instant::now());

    assert_eq!(s.duration(), 3725.0);
    assert_eq!(s.qualities().len(), 2);
    assert_eq!(s.qualities()[1].name, "Level 2");
    assert_eq!(s.current_quality(), AUTO_LEVEL);
    assert!(!s.is_loading());
}

#[test]
fn test_quality_menu_needs_levels() {
    let (engine, mut s) = playing_session(Instant::now());
    s.toggle_quality_menu();
    assert!(!s.quality_menu_open());

    engine.0.borrow_mut().levels = Some(vec![QualityLevel::new(0, 1920, 1080, 5_000_000)]);
    s.set_source("http://example.com/master.m3u8", true);
    engine.push(PlayerEvent::Ready);
    s.pump(Instant::now());

    s.toggle_quality_menu();
    assert!(s.quality_menu_open());
    s.select_quality(0);
    assert_eq!(s.current_quality(), 0);
    assert!(!s.quality_menu_open());
    assert!(engine.calls().contains(&Call::Level(0)));

    s.toggle_quality_menu();
    assert!(s.handle_key(Key::Escape));
    assert!(!s.quality_menu_open());
    assert!(!s.handle_key(Key::Escape));
}

#[test]
fn test_pause_and_end_freeze_last_frame() {
    let now = Instant::now();
    let (engine, mut s) = playing_session(now);

    engine.frame(7);
    s.pump(now);
    assert!(s.snapshot().is_none());
    assert_eq!(s.live_frame().map(|(_, f)| f.data[0]), Some(7));

    engine.push(PlayerEvent::Pause);
    s.pump(now);
    assert_eq!(s.phase(), PlaybackPhase::Paused);
    assert_eq!(s.snapshot().map(|(_, f)| f.data[0]), Some(7));

    // Frames arriving while frozen do not replace the snapshot
    engine.frame(9);
    s.pump(now);
    assert_eq!(s.snapshot().map(|(_, f)| f.data[0]), Some(7));

    engine.push(PlayerEvent::Play);
    s.pump(now);
    assert!(s.snapshot().is_none());

    engine.frame(8);
    s.pump(now);
    engine.push(PlayerEvent::Ended);
    s.pump(now);
    assert_eq!(s.phase(), PlaybackPhase::Ended);
    assert!(!s.is_playing());
    assert_eq!(s.snapshot().map(|(_, f)| f.data[0]), Some(8));
}

#[test]
fn test_waiting_and_canplay_toggle_loading() {
    let now = Instant::now();
    let (engine, mut s) = playing_session(now);

    engine.push(PlayerEvent::Waiting);
    s.pump(now);
    assert!(s.is_loading());
    assert_eq!(s.phase(), PlaybackPhase::Loading);

    engine.push(PlayerEvent::CanPlay);
    s.pump(now);
    assert!(!s.is_loading());
    assert_eq!(s.phase(), PlaybackPhase::Playing);
}

#[test]
fn test_error_is_recorded_without_state_change() {
    let now = Instant::now();
    let (engine, mut s) = playing_session(now);
    engine.push(PlayerEvent::Error("404".to_string()));
    s.pump(now);
    assert_eq!(s.last_error(), Some("404"));
    assert_eq!(s.phase(), PlaybackPhase::Playing);
    assert!(engine.calls().is_empty());
}

#[test]
fn test_progress_polls_every_100ms_while_playing() {
    let start = Instant::now();
    let (engine, mut s) = playing_session(start);

    engine.0.borrow_mut().time = 25.0;
    s.pump(start + Duration::from_millis(50));
    assert_eq!(s.played(), 0.0);

    s.pump(start + Duration::from_millis(100));
    assert!((s.played() - 0.25).abs() < 1e-9);

    engine.push(PlayerEvent::Pause);
    s.pump(start + Duration::from_millis(150));
    engine.0.borrow_mut().time = 90.0;
    s.pump(start + Duration::from_millis(400));
    assert!((s.played() - 0.25).abs() < 1e-9);
}

#[test]
fn test_live_stream_progress_is_zero() {
    let start = Instant::now();
    let (engine, mut s) = playing_session(start);
    engine.0.borrow_mut().duration = None;
    engine.0.borrow_mut().time = 40.0;
    s.pump(start + Duration::from_secs(1));
    assert_eq!(s.played(), 0.0);
    assert_eq!(s.duration(), 0.0);
}

#[test]
fn test_seek_drag_issues_exactly_one_seek() {
    let start = Instant::now();
    let (engine, mut s) = playing_session(start);
    engine.0.borrow_mut().time = 10.0;

    s.seek_begin();
    for (i, f) in [0.2, 0.4, 0.6].iter().enumerate() {
        s.seek_drag(*f);
        s.pump(start + Duration::from_millis(200 * (i as u64 + 1)));
        assert_eq!(s.played(), *f);
    }
    assert_eq!(engine.seeks(), 0);

    s.seek_end(0.6);
    assert_eq!(engine.seeks(), 1);
    assert!(engine.calls().contains(&Call::Seek(0.6)));

    // Polling resumes on the very next pump
    engine.0.borrow_mut().time = 61.0;
    s.pump(start + Duration::from_millis(801));
    assert!((s.played() - 0.61).abs() < 1e-9);
}

#[test]
fn test_seek_clamps_to_bar_range() {
    let (engine, mut s) = playing_session(Instant::now());
    s.seek_begin();
    s.seek_end(1.5);
    assert_eq!(engine.calls(), vec![Call::Seek(MAX_PLAYED)]);
}

#[test]
fn test_volume_zero_mutes_and_nonzero_unmutes() {
    let (_engine, mut s) = session();
    s.set_volume(0.0);
    assert!(s.is_muted());
    assert_eq!(s.volume(), 0.0);

    s.set_volume(0.4);
    assert!(!s.is_muted());
    assert_eq!(s.volume_display(), 0.4);
}

#[test]
fn test_unmute_after_zero_volume_keeps_zero_until_changed() {
    let (_engine, mut s) = session();
    s.set_volume(0.0);
    assert!(s.is_muted());

    s.toggle_mute();
    assert!(!s.is_muted());
    assert_eq!(s.volume(), 0.0);

    s.set_volume(0.3);
    s.toggle_mute();
    s.toggle_mute();
    assert!(!s.is_muted());
    assert_eq!(s.volume(), 0.3);
}

#[test]
fn test_play_after_end_restarts_from_beginning() {
    let now = Instant::now();
    let (engine, mut s) = playing_session(now);
    engine.0.borrow_mut().time = 100.0;
    s.pump(now);
    engine.push(PlayerEvent::Ended);
    s.pump(now);
    assert_eq!(s.phase(), PlaybackPhase::Ended);
    engine.clear_calls();

    assert!(s.handle_key(Key::Space));
    assert_eq!(engine.calls(), vec![Call::Seek(0.0), Call::Play]);
    assert!(s.is_playing());
    assert_eq!(s.played(), 0.0);

    // A plain pause/resume does not rewind
    engine.push(PlayerEvent::Play);
    s.pump(now);
    engine.clear_calls();
    s.toggle_play_pause();
    engine.push(PlayerEvent::Pause);
    s.pump(now);
    s.toggle_play_pause();
    assert_eq!(engine.calls(), vec![Call::Pause, Call::Play]);
}

#[test]
fn test_mute_keeps_stored_volume() {
    let (engine, mut s) = session();
    s.set_volume(0.7);
    engine.clear_calls();

    s.toggle_mute();
    assert!(s.is_muted());
    assert_eq!(s.volume(), 0.7);
    assert_eq!(s.volume_display(), 0.0);

    s.toggle_mute();
    assert_eq!(s.volume_display(), 0.7);
    assert_eq!(engine.calls(), vec![Call::Muted(true), Call::Muted(false)]);
}

#[test]
fn test_fullscreen_only_follows_host() {
    let (_engine, mut s) = session();
    s.request_fullscreen();
    assert!(!s.is_fullscreen());
    assert_eq!(s.take_fullscreen_request(), Some(true));
    assert_eq!(s.take_fullscreen_request(), None);

    // Host refused: nothing changes
    assert!(!s.is_fullscreen());

    s.on_fullscreen_changed(true);
    assert!(s.is_fullscreen());
    assert!(s.handle_key(Key::F));
    assert_eq!(s.take_fullscreen_request(), Some(false));
}

#[test]
fn test_controls_hide_after_three_seconds_while_playing() {
    let start = Instant::now();
    let (_engine, mut s) = playing_session(start);

    s.pointer_moved(start);
    s.tick(start + Duration::from_millis(2999));
    assert!(s.controls_visible());
    s.tick(start + HIDE_DELAY);
    assert!(!s.controls_visible());

    // Movement re-arms the timer
    s.pointer_moved(start + Duration::from_secs(4));
    assert!(s.controls_visible());
    s.pointer_moved(start + Duration::from_secs(6));
    s.tick(start + Duration::from_secs(8));
    assert!(s.controls_visible());
    s.tick(start + Duration::from_secs(9));
    assert!(!s.controls_visible());
}

#[test]
fn test_controls_stay_visible_while_paused() {
    let start = Instant::now();
    let (engine, mut s) = playing_session(start);
    engine.push(PlayerEvent::Pause);
    s.pump(start);

    s.pointer_moved(start);
    s.tick(start + Duration::from_secs(5));
    assert!(s.controls_visible());

    s.pointer_left();
    assert!(s.controls_visible());
}

#[test]
fn test_pointer_leave_hides_immediately_while_playing() {
    let start = Instant::now();
    let (_engine, mut s) = playing_session(start);
    s.pointer_moved(start);
    s.pointer_left();
    assert!(!s.controls_visible());
}

#[test]
fn test_keyboard_shortcuts() {
    let (engine, mut s) = playing_session(Instant::now());
    s.set_volume(0.5);

    assert!(s.handle_key(Key::ArrowUp));
    assert_eq!(s.volume(), 0.6);
    assert!(s.handle_key(Key::ArrowDown));
    assert!(s.handle_key(Key::ArrowDown));
    assert_eq!(s.volume(), 0.4);

    assert!(s.handle_key(Key::M));
    assert!(s.is_muted());

    engine.clear_calls();
    assert!(s.handle_key(Key::Space));
    assert_eq!(engine.calls(), vec![Call::Pause]);
    assert!(!s.handle_key(Key::Q));
}

#[test]
fn test_volume_keys_saturate() {
    let (_engine, mut s) = session();
    s.handle_key(Key::ArrowUp);
    assert_eq!(s.volume(), 1.0);
    for _ in 0..12 {
        s.handle_key(Key::ArrowDown);
    }
    assert_eq!(s.volume(), 0.0);
    assert!(s.is_muted());
}

#[test]
fn test_stop_resets_to_idle() {
    let (engine, mut s) = playing_session(Instant::now());
    s.stop();
    assert_eq!(s.phase(), PlaybackPhase::Idle);
    assert!(s.source().is_none());
    assert!(!s.is_playing());
    assert_eq!(engine.calls(), vec![Call::Stop]);
}

#[test]
fn test_format_time() {
    assert_eq!(format_time(0.0), "0:00");
    assert_eq!(format_time(5.9), "0:05");
    assert_eq!(format_time(65.0), "1:05");
    assert_eq!(format_time(3599.0), "59:59");
    assert_eq!(format_time(3725.0), "1:02:05");
    assert_eq!(format_time(f64::NAN), "0:00");
    assert_eq!(format_time(-3.0), "0:00");
}
