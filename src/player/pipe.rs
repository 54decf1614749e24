//! Engine that runs the `ffmpeg` command line and reads raw frames from it
//!
//! One worker thread per loaded source owns the child processes. Pausing,
//! seeking and switching levels kill the current child and start a new one
//! at the right position; every child gets a generation number so output
//! from a killed process is ignored.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use super::probe::{self, ProbeInfo};
use super::{MediaBackend, PlayerEvent, QualityLevel, VideoFrame, AUTO_LEVEL};
use crate::config::AppConfig;
use crate::error::PlayerError;

const OUTPUT_FPS: f64 = 30.0;
const FALLBACK_SIZE: (u32, u32) = (1280, 720);

#[derive(Debug, Clone)]
pub struct PipeSettings {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub user_agent: String,
    pub max_frame_height: u32,
    pub hw_accel: bool,
}

impl PipeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            user_agent: config.user_agent.clone(),
            max_frame_height: config.max_frame_height.max(144),
            hw_accel: config.hw_accel,
        }
    }
}

#[derive(Debug)]
struct Shared {
    position: f64,
    duration: Option<f64>,
    levels: Option<Vec<QualityLevel>>,
    level: i32,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            position: 0.0,
            duration: None,
            levels: None,
            level: AUTO_LEVEL,
        }
    }
}

enum WorkerMsg {
    Play,
    Pause,
    Seek(f64),
    SetLevel(i32),
    Gain(f32),
    Stop,
    Probed(Result<ProbeInfo, PlayerError>),
    Frame { generation: u64, frame: VideoFrame },
    StreamClosed { generation: u64 },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct PipeEngine {
    settings: PipeSettings,
    shared: Arc<Mutex<Shared>>,
    frame: Arc<Mutex<Option<VideoFrame>>>,
    worker: Option<Sender<WorkerMsg>>,
    events: Option<Receiver<PlayerEvent>>,
    volume: f32,
    muted: bool,
}

impl PipeEngine {
    pub fn new(settings: PipeSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Mutex::new(Shared::default())),
            frame: Arc::new(Mutex::new(None)),
            worker: None,
            events: None,
            volume: 1.0,
            muted: false,
        }
    }

    fn send(&self, msg: WorkerMsg) {
        if let Some(ref worker) = self.worker {
            let _ = worker.send(msg);
        }
    }

    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }
}

impl MediaBackend for PipeEngine {
    fn load(&mut self, url: &str) {
        self.stop();
        // Fresh slots so a worker still winding down cannot touch the new source
        self.shared = Arc::new(Mutex::new(Shared::default()));
        self.frame = Arc::new(Mutex::new(None));

        let (worker_tx, worker_rx) = channel();
        let (event_tx, event_rx) = channel();
        self.worker = Some(worker_tx.clone());
        self.events = Some(event_rx);

        let probe_tx = worker_tx.clone();
        let ffprobe = self.settings.ffprobe.clone();
        let user_agent = self.settings.user_agent.clone();
        let probe_url = url.to_string();
        thread::spawn(move || {
            let result = probe::probe(&ffprobe, &probe_url, &user_agent);
            let _ = probe_tx.send(WorkerMsg::Probed(result));
        });

        let worker = Worker {
            settings: self.settings.clone(),
            url: url.to_string(),
            tx: worker_tx,
            events: event_tx,
            shared: Arc::clone(&self.shared),
            frame: Arc::clone(&self.frame),
            info: None,
            want_play: false,
            position: 0.0,
            generation: 0,
            child: None,
            frames: 0,
            spawn_position: 0.0,
            got_frame: false,
            gain: self.gain(),
            audio: None,
        };
        thread::spawn(move || worker.run(worker_rx));
        log::info!("Loading {}", url);
    }

    fn play(&mut self) {
        self.send(WorkerMsg::Play);
    }

    fn pause(&mut self) {
        self.send(WorkerMsg::Pause);
    }

    fn stop(&mut self) {
        self.send(WorkerMsg::Stop);
        self.worker = None;
        self.events = None;
        *lock(&self.frame) = None;
    }

    fn seek_to(&mut self, fraction: f64) {
        self.send(WorkerMsg::Seek(fraction.clamp(0.0, 1.0)));
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.send(WorkerMsg::Gain(self.gain()));
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.send(WorkerMsg::Gain(self.gain()));
    }

    fn current_time(&self) -> f64 {
        lock(&self.shared).position
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.shared).duration
    }

    fn quality_levels(&self) -> Option<Vec<QualityLevel>> {
        lock(&self.shared).levels.clone()
    }

    fn current_level(&self) -> i32 {
        lock(&self.shared).level
    }

    fn set_level(&mut self, level: i32) {
        lock(&self.shared).level = level;
        self.send(WorkerMsg::SetLevel(level));
    }

    fn poll_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        if let Some(ref receiver) = self.events {
            loop {
                match receiver.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.events = None;
                        break;
                    }
                }
            }
        }
        events
    }

    fn take_frame(&mut self) -> Option<VideoFrame> {
        lock(&self.frame).take()
    }
}

impl Drop for PipeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    settings: PipeSettings,
    url: String,
    tx: Sender<WorkerMsg>,
    events: Sender<PlayerEvent>,
    shared: Arc<Mutex<Shared>>,
    frame: Arc<Mutex<Option<VideoFrame>>>,
    info: Option<ProbeInfo>,
    want_play: bool,
    position: f64,
    generation: u64,
    child: Option<Child>,
    frames: u64,
    spawn_position: f64,
    got_frame: bool,
    gain: f32,
    audio: Option<audio::AudioOut>,
}

impl Worker {
    fn run(mut self, rx: Receiver<WorkerMsg>) {
        for msg in rx.iter() {
            match msg {
                WorkerMsg::Play => {
                    self.want_play = true;
                    if self.info.is_some() && self.child.is_none() {
                        self.start();
                    }
                }
                WorkerMsg::Pause => {
                    let was_active = self.want_play || self.child.is_some();
                    self.want_play = false;
                    self.kill();
                    if was_active {
                        self.emit(PlayerEvent::Pause);
                    }
                }
                WorkerMsg::Seek(fraction) => {
                    let Some(duration) = self.info.as_ref().and_then(|i| i.duration) else {
                        log::debug!("Ignoring seek on a live stream");
                        continue;
                    };
                    self.position = fraction * duration;
                    lock(&self.shared).position = self.position;
                    if self.child.is_some() {
                        self.start();
                    }
                }
                WorkerMsg::SetLevel(level) => {
                    log::info!("Quality level set to {}", level);
                    if self.child.is_some() {
                        self.start();
                    }
                }
                WorkerMsg::Gain(gain) => {
                    self.gain = gain;
                    if let Some(ref audio) = self.audio {
                        audio.set_gain(gain);
                    }
                }
                WorkerMsg::Stop => break,
                WorkerMsg::Probed(Ok(info)) => {
                    {
                        let mut shared = lock(&self.shared);
                        shared.duration = info.duration;
                        shared.levels = info.levels();
                    }
                    log::info!(
                        "Probed {}x{}, duration {:?}, {} variants",
                        info.width,
                        info.height,
                        info.duration,
                        info.variants.len()
                    );
                    self.info = Some(info);
                    self.emit(PlayerEvent::Ready);
                    if self.want_play {
                        self.start();
                    }
                }
                WorkerMsg::Probed(Err(e)) => {
                    log::error!("Could not open {}: {}", self.url, e);
                    self.emit(PlayerEvent::Error(e.to_string()));
                }
                WorkerMsg::Frame { generation, mut frame } => {
                    if generation != self.generation {
                        continue;
                    }
                    self.frames += 1;
                    self.position = self.spawn_position + self.frames as f64 / OUTPUT_FPS;
                    if let Some(duration) = self.info.as_ref().and_then(|i| i.duration) {
                        self.position = self.position.min(duration);
                    }
                    frame.time = self.position;
                    lock(&self.shared).position = self.position;
                    *lock(&self.frame) = Some(frame);

                    if !self.got_frame {
                        self.got_frame = true;
                        self.emit(PlayerEvent::CanPlay);
                        self.emit(PlayerEvent::Play);
                    }
                }
                WorkerMsg::StreamClosed { generation } => {
                    if generation != self.generation {
                        continue;
                    }
                    let success = self
                        .child
                        .take()
                        .and_then(|mut child| child.wait().ok())
                        .map(|status| status.success())
                        .unwrap_or(false);
                    self.audio = None;
                    self.want_play = false;
                    if success {
                        if let Some(duration) = self.info.as_ref().and_then(|i| i.duration) {
                            self.position = duration;
                            lock(&self.shared).position = duration;
                        }
                        self.emit(PlayerEvent::Ended);
                    } else {
                        self.emit(PlayerEvent::Error("stream stopped unexpectedly".to_string()));
                        self.emit(PlayerEvent::Pause);
                    }
                }
            }
        }
        self.kill();
        log::debug!("Pipe worker for {} finished", self.url);
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    fn kill(&mut self) {
        self.generation += 1;
        self.audio = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// (Re)start decoding at the current position.
    fn start(&mut self) {
        self.kill();
        let Some(info) = self.info.as_ref() else { return };

        let level = lock(&self.shared).level;
        let variant = info.variant(level);
        let (width, height) = frame_size(
            variant.map(|v| (v.level.width, v.level.height)).unwrap_or((info.width, info.height)),
            self.settings.max_frame_height,
        );
        let start_at = info.duration.map(|_| self.position).filter(|p| *p > 0.0);
        let map = variant.map(|v| format!("0:p:{}:v:0", v.program_id));

        let mut cmd = Command::new(&self.settings.ffmpeg);
        cmd.args(input_args(&self.settings, &self.url, start_at));
        let size = format!("{}x{}", width, height);
        let fps = OUTPUT_FPS.to_string();
        cmd.args(["-map", map.as_deref().unwrap_or("0:v:0")])
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", size.as_str(), "-r", fps.as_str(), "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        self.emit(PlayerEvent::Waiting);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let e = PlayerError::Spawn {
                    program: self.settings.ffmpeg.clone(),
                    source,
                };
                log::error!("{}", e);
                self.want_play = false;
                self.emit(PlayerEvent::Error(e.to_string()));
                return;
            }
        };

        self.frames = 0;
        self.got_frame = false;
        self.spawn_position = start_at.unwrap_or(0.0);
        let generation = self.generation;

        if let Some(stderr) = child.stderr.take() {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if !line.trim().is_empty() {
                        log::warn!("[ffmpeg] {}", line);
                    }
                }
            });
        }

        if let Some(mut stdout) = child.stdout.take() {
            let tx = self.tx.clone();
            thread::spawn(move || {
                let frame_len = (width * height * 3) as usize;
                loop {
                    let mut data = vec![0u8; frame_len];
                    if stdout.read_exact(&mut data).is_err() {
                        break;
                    }
                    let frame = VideoFrame {
                        width,
                        height,
                        data,
                        time: 0.0,
                    };
                    if tx.send(WorkerMsg::Frame { generation, frame }).is_err() {
                        return;
                    }
                }
                let _ = tx.send(WorkerMsg::StreamClosed { generation });
            });
        }

        if info.has_audio {
            let audio_map = variant.map(|v| format!("0:p:{}:a:0?", v.program_id));
            self.audio = audio::AudioOut::spawn(
                &self.settings,
                &self.url,
                start_at,
                audio_map.as_deref(),
                self.gain,
            );
        }

        log::info!(
            "Decoding {} at {:.1}s, {}x{}, level {}",
            self.url,
            self.spawn_position,
            width,
            height,
            level
        );
        self.child = Some(child);
    }
}

/// Arguments up to and including `-i <url>`.
fn input_args(settings: &PipeSettings, url: &str, start_at: Option<f64>) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-v", "error"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if settings.hw_accel {
        args.extend(["-hwaccel".to_string(), "auto".to_string()]);
    }
    if probe::is_network(url) {
        args.extend([
            "-user_agent".to_string(),
            settings.user_agent.clone(),
            "-reconnect".to_string(),
            "1".to_string(),
            "-reconnect_streamed".to_string(),
            "1".to_string(),
            "-reconnect_delay_max".to_string(),
            "5".to_string(),
        ]);
    }
    if let Some(start) = start_at {
        args.extend(["-ss".to_string(), format!("{:.3}", start)]);
    }
    args.extend(["-re".to_string(), "-i".to_string(), url.to_string()]);
    args
}

/// Scale to at most `max_height` keeping the aspect ratio; both sides even.
fn frame_size((width, height): (u32, u32), max_height: u32) -> (u32, u32) {
    let (width, height) = if width == 0 || height == 0 {
        FALLBACK_SIZE
    } else {
        (width, height)
    };
    let (width, height) = if height > max_height {
        let scaled = (width as u64 * max_height as u64 / height as u64) as u32;
        (scaled, max_height)
    } else {
        (width, height)
    };
    ((width & !1).max(2), (height & !1).max(2))
}

#[cfg(feature = "audio")]
mod audio {
    use std::io::Read;
    use std::process::{Child, Command, Stdio};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;

    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};

    use super::{input_args, PipeSettings};

    const SAMPLE_RATE: u32 = 48_000;
    const CHANNELS: u16 = 2;
    /// ~85 ms of stereo f32 samples
    const CHUNK_BYTES: usize = 4096 * 4 * CHANNELS as usize;

    /// Second ffmpeg child decoding the audio track into a rodio sink.
    pub struct AudioOut {
        child: Child,
        gain: Arc<AtomicU32>,
    }

    impl AudioOut {
        pub fn spawn(
            settings: &PipeSettings,
            url: &str,
            start_at: Option<f64>,
            map: Option<&str>,
            gain: f32,
        ) -> Option<Self> {
            let mut cmd = Command::new(&settings.ffmpeg);
            cmd.args(input_args(settings, url, start_at))
                .args(["-map", map.unwrap_or("0:a:0?")])
                .args(["-vn", "-f", "f32le", "-ac", "2", "-ar", "48000", "-"])
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::null());

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) => {
                    log::warn!("Audio decoder failed to start: {}", e);
                    return None;
                }
            };
            let mut stdout = child.stdout.take()?;
            let shared_gain = Arc::new(AtomicU32::new(gain.to_bits()));
            let thread_gain = Arc::clone(&shared_gain);

            thread::spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(output) => output,
                    Err(e) => {
                        log::warn!("No audio output device: {}", e);
                        return;
                    }
                };
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(e) => {
                        log::warn!("Could not open audio sink: {}", e);
                        return;
                    }
                };

                let mut buf = vec![0u8; CHUNK_BYTES];
                while stdout.read_exact(&mut buf).is_ok() {
                    let samples: Vec<f32> = buf
                        .chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect();
                    sink.set_volume(f32::from_bits(thread_gain.load(Ordering::Relaxed)));
                    sink.append(SamplesBuffer::new(CHANNELS, SAMPLE_RATE, samples));
                }
                sink.stop();
            });

            Some(Self {
                child,
                gain: shared_gain,
            })
        }

        pub fn set_gain(&self, gain: f32) {
            self.gain.store(gain.to_bits(), Ordering::Relaxed);
        }
    }

    impl Drop for AudioOut {
        fn drop(&mut self) {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(not(feature = "audio"))]
mod audio {
    use super::PipeSettings;

    /// Audio output is compiled out; volume changes are only recorded.
    pub struct AudioOut;

    impl AudioOut {
        pub fn spawn(
            _settings: &PipeSettings,
            _url: &str,
            _start_at: Option<f64>,
            _map: Option<&str>,
            _gain: f32,
        ) -> Option<Self> {
            None
        }

        pub fn set_gain(&self, _gain: f32) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PipeSettings {
        PipeSettings {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            user_agent: "Player13/0.1".to_string(),
            max_frame_height: 720,
            hw_accel: false,
        }
    }

    #[test]
    fn test_frame_size_scales_and_rounds() {
        assert_eq!(frame_size((1920, 1080), 720), (1280, 720));
        assert_eq!(frame_size((641, 361), 720), (640, 360));
        assert_eq!(frame_size((0, 0), 720), (1280, 720));
        assert_eq!(frame_size((1000, 1000), 501), (500, 500));
    }

    #[test]
    fn test_input_args_for_network_stream() {
        let args = input_args(&settings(), "https://example.com/live.m3u8", Some(12.5));
        let joined = args.join(" ");
        assert!(joined.contains("-user_agent Player13/0.1"));
        assert!(joined.contains("-ss 12.500 -re -i https://example.com/live.m3u8"));
        assert!(!joined.contains("-hwaccel"));
    }

    #[test]
    fn test_input_args_for_local_file() {
        let mut s = settings();
        s.hw_accel = true;
        let args = input_args(&s, "/videos/clip.mp4", None);
        assert!(!args.iter().any(|a| a == "-user_agent" || a == "-ss"));
        assert!(args.iter().any(|a| a == "-hwaccel"));
        assert_eq!(args.last().map(String::as_str), Some("/videos/clip.mp4"));
    }

    #[test]
    fn test_missing_binary_reports_error() {
        let mut s = settings();
        s.ffprobe = "/nonexistent/ffprobe-player13".to_string();
        let mut engine = PipeEngine::new(s);
        engine.load("/videos/clip.mp4");

        let mut events = Vec::new();
        for _ in 0..200 {
            events.extend(engine.poll_events());
            if !events.is_empty() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(matches!(events.first(), Some(PlayerEvent::Error(_))));
        assert!(engine.duration().is_none());
    }
}
