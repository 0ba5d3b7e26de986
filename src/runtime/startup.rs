use std::path::PathBuf;

use tracing::warn;

use crate::app::App;
use crate::audio::LoopMode;
use crate::config;
use crate::library::{LibraryStore, LoadOutcome, ScanOptions, TagReader};

/// Build the store from settings and load the persisted library. The second
/// value is a status line for the UI when the saved library was unusable.
pub fn open_library(settings: &config::Settings) -> (LibraryStore, Option<String>) {
    let mut store = LibraryStore::new(
        settings.library_file(),
        ScanOptions::from_settings(&settings.library),
        Box::new(TagReader),
    );
    if store.state_file().is_none() {
        warn!("no data directory; the library will not be saved");
    }
    let notice = match store.load() {
        LoadOutcome::Missing => None,
        LoadOutcome::Reset(err) => Some(format!("Saved library ignored: {err}")),
        LoadOutcome::Loaded { pruned, .. } if pruned > 0 => {
            Some(format!("{pruned} missing track(s) dropped from the library"))
        }
        LoadOutcome::Loaded { .. } => None,
    };
    (store, notice)
}

pub fn loop_mode_from(setting: config::LoopModeSetting) -> LoopMode {
    match setting {
        config::LoopModeSetting::NoLoop => LoopMode::NoLoop,
        config::LoopModeSetting::LoopAll => LoopMode::LoopAll,
        config::LoopModeSetting::LoopOne => LoopMode::LoopOne,
    }
}

pub fn apply_playback_defaults(app: &mut App, settings: &config::Settings) {
    app.loop_mode = loop_mode_from(settings.playback.loop_mode);
    app.volume = crate::audio::clamp_volume(settings.audio.volume);
}

/// Scan folders named on the command line. Already known folders are no-ops.
pub fn scan_cli_folders(app: &mut App, folders: impl IntoIterator<Item = PathBuf>) {
    for folder in folders {
        if let Err(err) = app.add_folder(&folder) {
            warn!(error = %err, "cannot scan command line folder");
            app.set_message(err.to_string());
        }
    }
}
