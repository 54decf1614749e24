//! Embedded media engines and the playback session driving them
//!
//! Engines do their decoding and network I/O on background threads and
//! report through [`PlayerEvent`]s and a latest-frame slot. The UI thread only
//! issues commands and reads state through the [`MediaBackend`] trait.

pub mod internal;
pub mod overlay;
pub mod pipe;
pub mod probe;
pub mod session;

pub use session::{format_time, PlaybackPhase, PlaybackSession};

use crate::config::{AppConfig, EngineKind};

/// Transport notifications from an engine, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Source opened; duration and levels are now readable
    Ready,
    Play,
    Pause,
    Ended,
    /// Stalled waiting for data
    Waiting,
    /// Enough data to continue after `Waiting`
    CanPlay,
    Error(String),
}

/// A decoded RGB24 frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Presentation time in seconds
    pub time: f64,
}

/// One adaptive-stream variant the engine can be pinned to.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityLevel {
    pub index: i32,
    pub width: u32,
    pub height: u32,
    pub bitrate: u64,
    pub name: String,
}

impl QualityLevel {
    pub fn new(index: i32, width: u32, height: u32, bitrate: u64) -> Self {
        let name = if height > 0 {
            format!("{}p", height)
        } else {
            format!("Level {}", index + 1)
        };
        Self {
            index,
            width,
            height,
            bitrate,
            name,
        }
    }
}

/// Level value meaning "let the engine choose".
pub const AUTO_LEVEL: i32 = -1;

/// Command surface of an embedded player.
pub trait MediaBackend {
    /// Open a new source, dropping whatever was loaded before.
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Seek to a fraction (0..=1) of the duration.
    fn seek_to(&mut self, fraction: f64);
    fn set_volume(&mut self, volume: f32);
    fn set_muted(&mut self, muted: bool);
    /// Current position in seconds
    fn current_time(&self) -> f64;
    /// Total length in seconds, `None` for live streams or before ready.
    fn duration(&self) -> Option<f64>;
    /// Variant levels, `None` when the source is not adaptive.
    fn quality_levels(&self) -> Option<Vec<QualityLevel>>;
    fn current_level(&self) -> i32;
    fn set_level(&mut self, level: i32);
    fn poll_events(&mut self) -> Vec<PlayerEvent>;
    /// Latest decoded frame since the last call, if any.
    fn take_frame(&mut self) -> Option<VideoFrame>;
}

/// Build the engine selected in the config.
pub fn create_engine(config: &AppConfig) -> Box<dyn MediaBackend> {
    match config.engine {
        EngineKind::Pipe => Box::new(pipe::PipeEngine::new(pipe::PipeSettings::from_config(config))),
        EngineKind::Internal => {
            if internal::AVAILABLE {
                Box::new(internal::InternalEngine::new(config))
            } else {
                log::warn!("Built-in decoder not compiled in, using the FFmpeg process engine");
                Box::new(pipe::PipeEngine::new(pipe::PipeSettings::from_config(config)))
            }
        }
    }
}
