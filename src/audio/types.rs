//! Audio-related small types and handles.
//!
//! This module defines common enums and type aliases used by the
//! audio subsystem (looping mode, commands, playback info and handles).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopMode {
    /// Stop after the last track of the playlist.
    NoLoop,
    /// Wrap around to the start of the playlist.
    LoopAll,
    /// Repeat the current song when it ends.
    LoopOne,
}

impl Default for LoopMode {
    fn default() -> Self {
        Self::LoopAll
    }
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Set the source to the given file and start playing it.
    Load(PathBuf),
    /// Resume the loaded source.
    Play,
    /// Pause the loaded source.
    Pause,
    /// Stop playback and unload the source.
    Stop,
    /// Jump to an absolute position.
    SeekTo(Duration),
    /// Seek by the specified number of seconds (positive or negative).
    SeekBy(i64),
    /// Output volume, clamped to 0.0..=1.0.
    SetVolume(f32),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// File currently loaded, if any.
    pub path: Option<PathBuf>,
    /// Playback position in the loaded file.
    pub elapsed: Duration,
    /// Total length reported by the decoder, when it knows it.
    pub duration: Option<Duration>,
    /// Whether playback is currently active.
    pub playing: bool,
    /// Set when the loaded source played to its end. The event loop clears it.
    pub finished: bool,
    /// Last failure to open or decode a file.
    pub error: Option<String>,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Clamp a requested volume into the range the sink accepts.
pub fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
