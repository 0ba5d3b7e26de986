use super::types::{clamp_volume, LoopMode, PlaybackInfo};
use std::time::Duration;

#[test]
fn clamp_volume_keeps_values_in_range() {
    assert_eq!(clamp_volume(0.5), 0.5);
    assert_eq!(clamp_volume(-0.2), 0.0);
    assert_eq!(clamp_volume(1.7), 1.0);
    assert_eq!(clamp_volume(f32::NAN), 0.0);
}

#[test]
fn default_playback_info_is_idle() {
    let info = PlaybackInfo::default();
    assert!(info.path.is_none());
    assert_eq!(info.elapsed, Duration::ZERO);
    assert!(info.duration.is_none());
    assert!(!info.playing);
    assert!(!info.finished);
    assert!(info.error.is_none());
}

#[test]
fn loop_mode_defaults_to_loop_all() {
    assert_eq!(LoopMode::default(), LoopMode::LoopAll);
}
