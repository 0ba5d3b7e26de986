//! Playback controller: a dedicated thread owning the `rodio` output.
//!
//! The UI sends `AudioCmd`s through `AudioPlayer` and reads position,
//! duration and end-of-track from the shared `PlaybackHandle`.

mod player;
mod sink;
mod thread;
mod types;

pub use player::AudioPlayer;
pub use types::*;

#[cfg(test)]
mod tests;
