// Built-in decoder using ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable

#[cfg(feature = "internal-player")]
mod engine_impl {
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::thread;
    use std::time::{Duration, Instant};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as RawFrame;

    use crate::config::AppConfig;
    use crate::player::{MediaBackend, PlayerEvent, QualityLevel, VideoFrame, AUTO_LEVEL};

    pub const AVAILABLE: bool = true;

    enum Command {
        Play,
        Pause,
        Seek(f64),
        SetLevel(i32),
        Stop,
    }

    #[derive(Default)]
    struct Shared {
        position: f64,
        duration: Option<f64>,
        levels: Option<Vec<QualityLevel>>,
        level: i32,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Video-only decoder on a background thread
    pub struct InternalEngine {
        user_agent: String,
        max_height: u32,
        shared: Arc<Mutex<Shared>>,
        current_frame: Arc<Mutex<Option<VideoFrame>>>,
        command_sender: Option<Sender<Command>>,
        event_receiver: Option<Receiver<PlayerEvent>>,
        volume: f32,
        muted: bool,
    }

    impl InternalEngine {
        pub fn new(config: &AppConfig) -> Self {
            if let Err(e) = ffmpeg::init() {
                log::error!("FFmpeg init failed: {}", e);
            }

            Self {
                user_agent: config.user_agent.clone(),
                max_height: config.max_frame_height.max(144),
                shared: Arc::new(Mutex::new(Shared::default())),
                current_frame: Arc::new(Mutex::new(None)),
                command_sender: None,
                event_receiver: None,
                volume: 1.0,
                muted: false,
            }
        }

        fn send(&self, command: Command) {
            if let Some(ref sender) = self.command_sender {
                let _ = sender.send(command);
            }
        }
    }

    impl MediaBackend for InternalEngine {
        fn load(&mut self, url: &str) {
            self.stop();
            self.shared = Arc::new(Mutex::new(Shared {
                level: AUTO_LEVEL,
                ..Default::default()
            }));
            self.current_frame = Arc::new(Mutex::new(None));

            let (cmd_tx, cmd_rx) = channel();
            let (event_tx, event_rx) = channel();
            self.command_sender = Some(cmd_tx);
            self.event_receiver = Some(event_rx);

            let decoder = DecodeThread {
                url: url.to_string(),
                user_agent: self.user_agent.clone(),
                max_height: self.max_height,
                shared: Arc::clone(&self.shared),
                current_frame: Arc::clone(&self.current_frame),
                events: event_tx,
            };
            thread::spawn(move || decoder.run(cmd_rx));
        }

        fn play(&mut self) {
            self.send(Command::Play);
        }

        fn pause(&mut self) {
            self.send(Command::Pause);
        }

        fn stop(&mut self) {
            self.send(Command::Stop);
            self.command_sender = None;
            self.event_receiver = None;
            *lock(&self.current_frame) = None;
        }

        fn seek_to(&mut self, fraction: f64) {
            self.send(Command::Seek(fraction.clamp(0.0, 1.0)));
        }

        // Audio is not decoded here; the values are kept for the controls.
        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = muted;
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
            self.send(Command::SetLevel(level));
        }

        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            let mut events = Vec::new();
            if let Some(ref receiver) = self.event_receiver {
                loop {
                    match receiver.try_recv() {
                        Ok(event) => events.push(event),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.event_receiver = None;
                            break;
                        }
                    }
                }
            }
            events
        }

        fn take_frame(&mut self) -> Option<VideoFrame> {
            lock(&self.current_frame).take()
        }
    }

    impl Drop for InternalEngine {
        fn drop(&mut self) {
            self.stop();
        }
    }

    /// Video stream index per variant program, in level order.
    fn variant_streams(ictx: &ffmpeg::format::context::Input) -> Vec<(usize, QualityLevel)> {
        let mut variants = Vec::new();
        for program in ictx.programs() {
            let bitrate = program
                .metadata()
                .get("variant_bitrate")
                .and_then(|b| b.parse().ok())
                .unwrap_or(0);
            let video = program.stream_indices().find(|&i| {
                ictx.stream(i)
                    .map(|s| s.parameters().medium() == Type::Video)
                    .unwrap_or(false)
            });
            if let Some(index) = video {
                let (width, height) = ictx
                    .stream(index)
                    .and_then(|s| ffmpeg::codec::context::Context::from_parameters(s.parameters()).ok())
                    .and_then(|c| c.decoder().video().ok())
                    .map(|d| (d.width(), d.height()))
                    .unwrap_or((0, 0));
                let level = variants.len() as i32;
                variants.push((index, QualityLevel::new(level, width, height, bitrate)));
            }
        }
        if variants.len() < 2 {
            variants.clear();
        }
        variants
    }

    struct Pipeline {
        stream_index: usize,
        time_base: f64,
        decoder: ffmpeg::decoder::Video,
        scaler: ScalingContext,
        width: u32,
        height: u32,
    }

    impl Pipeline {
        fn open(ictx: &ffmpeg::format::context::Input, stream_index: usize, max_height: u32) -> Result<Self, String> {
            let stream = ictx.stream(stream_index).ok_or("No video stream found")?;
            let time_base = f64::from(stream.time_base());
            let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                .map_err(|e| format!("Failed to read codec parameters: {}", e))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(|e| format!("Failed to create decoder: {}", e))?;

            let (src_w, src_h) = (decoder.width(), decoder.height());
            let (width, height) = if src_h > max_height {
                let w = (src_w as u64 * max_height as u64 / src_h.max(1) as u64) as u32;
                ((w & !1).max(2), max_height & !1)
            } else {
                (src_w, src_h)
            };

            let scaler = ScalingContext::get(
                decoder.format(),
                src_w,
                src_h,
                Pixel::RGB24,
                width,
                height,
                Flags::BILINEAR,
            )
            .map_err(|e| format!("Failed to create scaler: {}", e))?;

            Ok(Self {
                stream_index,
                time_base,
                decoder,
                scaler,
                width,
                height,
            })
        }

        /// Feed one packet; returns the last frame it produced.
        fn decode(&mut self, packet: &ffmpeg::Packet) -> Option<VideoFrame> {
            if self.decoder.send_packet(packet).is_err() {
                return None;
            }
            let mut latest = None;
            let mut decoded = RawFrame::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = RawFrame::empty();
                if self.scaler.run(&decoded, &mut rgb_frame).is_err() {
                    continue;
                }
                let data = rgb_frame.data(0);
                let stride = rgb_frame.stride(0);
                let row_len = self.width as usize * 3;

                // Copy frame data (handling stride)
                let mut frame_data = Vec::with_capacity(row_len * self.height as usize);
                for y in 0..self.height as usize {
                    let row_start = y * stride;
                    frame_data.extend_from_slice(&data[row_start..row_start + row_len]);
                }

                latest = Some(VideoFrame {
                    width: self.width,
                    height: self.height,
                    data: frame_data,
                    time: decoded.pts().unwrap_or(0) as f64 * self.time_base,
                });
            }
            latest
        }
    }

    struct DecodeThread {
        url: String,
        user_agent: String,
        max_height: u32,
        shared: Arc<Mutex<Shared>>,
        current_frame: Arc<Mutex<Option<VideoFrame>>>,
        events: Sender<PlayerEvent>,
    }

    impl DecodeThread {
        fn fail(&self, message: String) {
            log::error!("{}", message);
            let _ = self.events.send(PlayerEvent::Error(message));
        }

        fn run(self, cmd_rx: Receiver<Command>) {
            // Set options for network streams
            let mut options = ffmpeg::Dictionary::new();
            options.set("user_agent", &self.user_agent);
            options.set("reconnect", "1");
            options.set("reconnect_streamed", "1");
            options.set("reconnect_delay_max", "5");
            options.set("timeout", "5000000"); // 5 second timeout

            let mut ictx = match ffmpeg::format::input_with_dictionary(&self.url, options) {
                Ok(ctx) => ctx,
                Err(e) => return self.fail(format!("Failed to open stream: {}", e)),
            };

            let Some(best) = ictx.streams().best(Type::Video).map(|s| s.index()) else {
                return self.fail("No video stream found".to_string());
            };
            let variants = variant_streams(&ictx);
            let duration = Some(ictx.duration())
                .filter(|d| *d > 0)
                .map(|d| d as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE));

            let mut pipeline = match Pipeline::open(&ictx, best, self.max_height) {
                Ok(p) => p,
                Err(e) => return self.fail(e),
            };

            {
                let mut shared = lock(&self.shared);
                shared.duration = duration;
                shared.levels = if variants.is_empty() {
                    None
                } else {
                    Some(variants.iter().map(|(_, l)| l.clone()).collect())
                };
            }
            let _ = self.events.send(PlayerEvent::Ready);

            let mut playing = false;
            let mut announced = false;
            let mut last_frame_time = Instant::now();
            let mut last_pts: Option<f64> = None;

            loop {
                // Wait for commands while paused, poll them while playing
                let command = if playing {
                    match cmd_rx.try_recv() {
                        Ok(c) => Some(c),
                        Err(TryRecvError::Empty) => None,
                        Err(TryRecvError::Disconnected) => break,
                    }
                } else {
                    match cmd_rx.recv() {
                        Ok(c) => Some(c),
                        Err(_) => break,
                    }
                };

                match command {
                    Some(Command::Stop) => break,
                    Some(Command::Play) => {
                        playing = true;
                        announced = false;
                        last_pts = None;
                        let _ = self.events.send(PlayerEvent::Waiting);
                    }
                    Some(Command::Pause) => {
                        if playing {
                            playing = false;
                            let _ = self.events.send(PlayerEvent::Pause);
                        }
                        continue;
                    }
                    Some(Command::Seek(fraction)) => {
                        if let Some(d) = duration {
                            let target = fraction * d;
                            let ts = (target * f64::from(ffmpeg::ffi::AV_TIME_BASE)) as i64;
                            match ictx.seek(ts, ..ts) {
                                Ok(()) => {
                                    pipeline.decoder.flush();
                                    lock(&self.shared).position = target;
                                    last_pts = None;
                                }
                                Err(e) => log::warn!("Seek failed: {}", e),
                            }
                        }
                    }
                    Some(Command::SetLevel(level)) => {
                        let index = usize::try_from(level)
                            .ok()
                            .and_then(|i| variants.get(i))
                            .map(|(index, _)| *index)
                            .unwrap_or(best);
                        if index != pipeline.stream_index {
                            match Pipeline::open(&ictx, index, self.max_height) {
                                Ok(p) => pipeline = p,
                                Err(e) => log::warn!("Level switch failed: {}", e),
                            }
                        }
                    }
                    None => {}
                }

                if !playing {
                    continue;
                }

                let mut packet = ffmpeg::Packet::empty();
                match packet.read(&mut ictx) {
                    Ok(()) => {}
                    Err(ffmpeg::Error::Eof) => {
                        playing = false;
                        if let Some(d) = duration {
                            lock(&self.shared).position = d;
                        }
                        let _ = self.events.send(PlayerEvent::Ended);
                        continue;
                    }
                    Err(_) => continue,
                }
                if packet.stream() != pipeline.stream_index {
                    continue;
                }

                if let Some(frame) = pipeline.decode(&packet) {
                    // Pace by presentation time, at most one frame period of sleep
                    if let Some(prev) = last_pts {
                        let gap = (frame.time - prev).clamp(0.0, 0.1);
                        let elapsed = last_frame_time.elapsed().as_secs_f64();
                        if elapsed < gap {
                            thread::sleep(Duration::from_secs_f64(gap - elapsed));
                        }
                    }
                    last_pts = Some(frame.time);
                    last_frame_time = Instant::now();

                    lock(&self.shared).position = frame.time.max(0.0);
                    *lock(&self.current_frame) = Some(frame);

                    if !announced {
                        announced = true;
                        let _ = self.events.send(PlayerEvent::CanPlay);
                        let _ = self.events.send(PlayerEvent::Play);
                    }
                }
            }
        }
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod engine_impl {
    use crate::config::AppConfig;
    use crate::player::{MediaBackend, PlayerEvent, QualityLevel, VideoFrame, AUTO_LEVEL};

    pub const AVAILABLE: bool = false;

    pub struct InternalEngine {
        pending: Vec<PlayerEvent>,
    }

    impl InternalEngine {
        pub fn new(_config: &AppConfig) -> Self {
            Self { pending: Vec::new() }
        }
    }

    impl MediaBackend for InternalEngine {
        fn load(&mut self, _url: &str) {
            self.pending.push(PlayerEvent::Error(
                "Built-in decoder not enabled. Build with --features internal-player".to_string(),
            ));
        }
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn stop(&mut self) {}
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
            AUTO_LEVEL
        }
        fn set_level(&mut self, _level: i32) {}
        fn poll_events(&mut self) -> Vec<PlayerEvent> {
            std::mem::take(&mut self.pending)
        }
        fn take_frame(&mut self) -> Option<VideoFrame> {
            None
        }
    }
}

pub use engine_impl::*;
