//! Application model types: `App` and `PlaybackState`.
//!
//! `App` owns the library store, the genre filter and the playlist built
//! from it, plus the selection and playback flags the UI renders. Methods
//! that need the audio thread return the `AudioCmd` to send instead of
//! sending it, so the runtime stays the only place doing I/O.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::audio::{clamp_volume, AudioCmd, LoopMode, PlaybackHandle, PlaybackInfo};
use crate::library::{
    GenreFilter, LibraryError, LibraryStore, Playlist, PlaylistEntry, ScanOutcome, ScanReport,
};

/// The playback state of the application.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// The main application model.
pub struct App {
    pub store: LibraryStore,
    pub filter: GenreFilter,
    pub playlist: Playlist,
    /// Cursor row in the track list.
    pub selected: usize,
    /// Tracks picked for removal.
    pub marked: BTreeSet<PathBuf>,

    pub playback: PlaybackState,
    pub playback_handle: Option<PlaybackHandle>,
    /// Track loaded in the player. Survives filter changes that hide it.
    pub now_playing: Option<PlaylistEntry>,

    pub follow_playback: bool,
    pub loop_mode: LoopMode,
    pub volume: f32,

    /// Folder path being typed, while the add-folder prompt is open.
    pub prompt: Option<String>,
    pub metadata_window: bool,
    /// One-line feedback for the status box.
    pub message: Option<String>,
}

impl App {
    /// Create an `App` over an already loaded store.
    pub fn new(store: LibraryStore) -> Self {
        let playlist = Playlist::new(store.flatten(&GenreFilter::All));
        let mut app = Self {
            store,
            filter: GenreFilter::All,
            playlist,
            selected: 0,
            marked: BTreeSet::new(),

            playback: PlaybackState::Stopped,
            playback_handle: None,
            now_playing: None,

            follow_playback: true,
            loop_mode: LoopMode::LoopAll,
            volume: 0.8,

            prompt: None,
            metadata_window: false,
            message: None,
        };
        app.rebuild_playlist();
        app
    }

    /// Attach a `PlaybackHandle` used to observe playback progress.
    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback_handle = Some(h);
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Return true if the current playlist has any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.playlist.is_empty()
    }

    pub fn selected_entry(&self) -> Option<&PlaylistEntry> {
        self.playlist.get(self.selected)
    }

    /// Snapshot of the audio thread's published state.
    pub fn playback_info(&self) -> Option<PlaybackInfo> {
        self.playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|info| info.clone()))
    }

    // ---- genre filter & playlist projection ----

    /// "All Genres" followed by every genre in library order.
    pub fn genre_filters(&self) -> Vec<GenreFilter> {
        std::iter::once(GenreFilter::All)
            .chain(
                self.store
                    .library()
                    .genre_names()
                    .map(|g| GenreFilter::Genre(g.to_string())),
            )
            .collect()
    }

    pub fn set_filter(&mut self, filter: GenreFilter) {
        self.filter = filter;
        self.rebuild_playlist();
        self.selected = self.playlist.current_index().unwrap_or(0);
    }

    /// Step to the next (or previous) genre filter, wrapping.
    pub fn cycle_genre(&mut self, forward: bool) {
        let filters = self.genre_filters();
        let pos = filters.iter().position(|f| f == &self.filter).unwrap_or(0);
        let len = filters.len();
        let next = if forward {
            (pos + 1) % len
        } else {
            (pos + len - 1) % len
        };
        self.set_filter(filters[next].clone());
    }

    /// Recompute the playlist from the store and the active filter.
    ///
    /// The playlist cursor follows the loaded track; the selection and marks
    /// are kept only for tracks still visible.
    pub fn rebuild_playlist(&mut self) {
        if let GenreFilter::Genre(name) = &self.filter {
            if !self.store.library().has_genre(name) {
                self.filter = GenreFilter::All;
            }
        }

        let selected_path = self.selected_entry().map(|e| e.track.path.clone());
        self.playlist.replace(self.store.flatten(&self.filter));

        if self.playlist.current_index().is_none() {
            if let Some(np) = &self.now_playing {
                if let Some(pos) = self.playlist.position_of(&np.track.path) {
                    self.playlist.set_current(pos);
                }
            }
        }

        let visible: BTreeSet<PathBuf> = self
            .playlist
            .entries()
            .iter()
            .map(|e| e.track.path.clone())
            .collect();
        self.marked.retain(|p| visible.contains(p));

        self.selected = selected_path
            .and_then(|p| self.playlist.position_of(&p))
            .unwrap_or_else(|| self.selected.min(self.playlist.len().saturating_sub(1)));
    }

    // ---- selection ----

    /// Set the selected row, clamped to the playlist.
    pub fn set_selected(&mut self, idx: usize) {
        self.selected = idx.min(self.playlist.len().saturating_sub(1));
    }

    /// Move selection to the next row, wrapping.
    pub fn next(&mut self) {
        if self.has_tracks() {
            self.selected = (self.selected + 1) % self.playlist.len();
        }
    }

    /// Move selection to the previous row, wrapping.
    pub fn prev(&mut self) {
        if self.has_tracks() {
            let len = self.playlist.len();
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
        if let Some(i) = self.playlist.current_index() {
            self.selected = i;
        }
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    pub fn toggle_mark(&mut self) {
        let Some(path) = self.selected_entry().map(|e| e.track.path.clone()) else {
            return;
        };
        if !self.marked.remove(&path) {
            self.marked.insert(path);
        }
    }

    /// Marked tracks, or the selected one when nothing is marked.
    pub fn removal_selection(&self) -> Vec<PathBuf> {
        if self.marked.is_empty() {
            self.selected_entry()
                .map(|e| vec![e.track.path.clone()])
                .unwrap_or_default()
        } else {
            self.marked.iter().cloned().collect()
        }
    }

    // ---- library mutations ----

    /// Scan `folder` and rebuild the playlist.
    pub fn add_folder(&mut self, folder: &Path) -> Result<ScanOutcome, LibraryError> {
        let outcome = self.store.scan(folder)?;
        match &outcome {
            ScanOutcome::AlreadyScanned => {
                self.set_message(format!("{} is already in the library", folder.display()));
            }
            ScanOutcome::Scanned(report) => {
                self.set_message(format!(
                    "Scanned {}: {}",
                    folder.display(),
                    describe_report(report)
                ));
            }
        }
        self.rebuild_playlist();
        Ok(outcome)
    }

    /// Rebuild the whole library from the known folders.
    pub fn refresh(&mut self) -> Option<AudioCmd> {
        let report = self.store.refresh();
        self.set_message(format!("Refreshed: {}", describe_report(&report)));
        self.rebuild_playlist();
        self.stop_if_now_playing_gone()
    }

    /// Remove the marked (or selected) tracks under the active filter.
    pub fn remove_selection(&mut self) -> Option<AudioCmd> {
        let selection = self.removal_selection();
        let removed = self.store.remove(&selection, &self.filter);
        if removed == 0 {
            return None;
        }
        self.marked.clear();
        self.set_message(format!("Removed {removed} track(s)"));
        self.rebuild_playlist();
        self.stop_if_now_playing_gone()
    }

    pub fn clear_library(&mut self) -> Option<AudioCmd> {
        self.store.clear();
        self.marked.clear();
        self.set_message("Library cleared");
        self.rebuild_playlist();
        self.stop_if_now_playing_gone()
    }

    fn stop_if_now_playing_gone(&mut self) -> Option<AudioCmd> {
        let np = self.now_playing.as_ref()?;
        let still_there = self
            .store
            .library()
            .genres()
            .any(|(_, tracks)| tracks.iter().any(|t| t.path == np.track.path));
        if still_there {
            return None;
        }
        Some(self.stop())
    }

    // ---- transport ----

    /// Load playlist row `index` into the player.
    pub fn play_index(&mut self, index: usize) -> Option<AudioCmd> {
        let entry = self.playlist.set_current(index)?.clone();
        let path = entry.track.path.clone();
        info!(path = %path.display(), genre = %entry.genre, "play");
        self.now_playing = Some(entry);
        self.playback = PlaybackState::Playing;
        if self.follow_playback {
            self.selected = index;
        }
        Some(AudioCmd::Load(path))
    }

    pub fn play_selected(&mut self) -> Option<AudioCmd> {
        self.play_index(self.selected)
    }

    /// Next track, wrapping at the end.
    pub fn play_next(&mut self) -> Option<AudioCmd> {
        let i = self.playlist.next_index()?;
        self.play_index(i)
    }

    /// Previous track, wrapping at the start.
    pub fn play_prev(&mut self) -> Option<AudioCmd> {
        let i = self.playlist.prev_index()?;
        self.play_index(i)
    }

    pub fn toggle_pause(&mut self) -> Option<AudioCmd> {
        match self.playback {
            PlaybackState::Stopped => self.play_selected(),
            PlaybackState::Playing => {
                self.playback = PlaybackState::Paused;
                Some(AudioCmd::Pause)
            }
            PlaybackState::Paused => {
                self.playback = PlaybackState::Playing;
                Some(AudioCmd::Play)
            }
        }
    }

    pub fn play(&mut self) -> Option<AudioCmd> {
        match self.playback {
            PlaybackState::Paused => {
                self.playback = PlaybackState::Playing;
                Some(AudioCmd::Play)
            }
            PlaybackState::Stopped => self.play_selected(),
            PlaybackState::Playing => None,
        }
    }

    pub fn pause(&mut self) -> Option<AudioCmd> {
        if self.playback != PlaybackState::Playing {
            return None;
        }
        self.playback = PlaybackState::Paused;
        Some(AudioCmd::Pause)
    }

    pub fn stop(&mut self) -> AudioCmd {
        self.playback = PlaybackState::Stopped;
        self.now_playing = None;
        self.playlist.clear_current();
        AudioCmd::Stop
    }

    /// Decide what plays after the loaded track ran out.
    pub fn on_track_finished(&mut self) -> Option<AudioCmd> {
        match self.loop_mode {
            LoopMode::LoopOne => {
                let path = self.now_playing.as_ref()?.track.path.clone();
                self.playback = PlaybackState::Playing;
                Some(AudioCmd::Load(path))
            }
            LoopMode::LoopAll => self.play_next(),
            LoopMode::NoLoop => {
                let at_end = match self.playlist.current_index() {
                    Some(i) => i + 1 >= self.playlist.len(),
                    None => self.playlist.is_empty(),
                };
                if at_end {
                    Some(self.stop())
                } else {
                    self.play_next()
                }
            }
        }
    }

    /// Shuffle the playlist in place; the loaded track stays loaded.
    pub fn shuffle(&mut self) {
        self.playlist.shuffle(&mut rand::rng());
        self.selected = self.playlist.current_index().unwrap_or(0);
        self.set_message("Playlist shuffled");
    }

    /// Cycle `loop_mode` through `NoLoop -> LoopAll -> LoopOne`.
    pub fn cycle_loop_mode(&mut self) {
        self.loop_mode = match self.loop_mode {
            LoopMode::NoLoop => LoopMode::LoopAll,
            LoopMode::LoopAll => LoopMode::LoopOne,
            LoopMode::LoopOne => LoopMode::NoLoop,
        };
    }

    pub fn change_volume(&mut self, delta: f32) -> AudioCmd {
        self.volume = clamp_volume(self.volume + delta);
        AudioCmd::SetVolume(self.volume)
    }

    /// Mirror the audio thread's state. Returns true once per finished track.
    ///
    /// Only a snapshot of the track `App` loaded is trusted; anything else is a
    /// command the audio thread has not applied yet.
    pub fn sync_playback(&mut self, info: &PlaybackInfo) -> bool {
        let expected = self.now_playing.as_ref().map(|e| e.track.path.as_path());
        if info.path.as_deref() != expected {
            if info.path.is_none() && info.error.is_some() {
                self.playback = PlaybackState::Stopped;
            }
            return false;
        }
        if info.finished {
            return expected.is_some();
        }
        if expected.is_some() {
            self.playback = if info.playing {
                PlaybackState::Playing
            } else {
                PlaybackState::Paused
            };
        }
        false
    }

    // ---- add-folder prompt ----

    pub fn open_prompt(&mut self) {
        self.prompt = Some(String::new());
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn push_prompt_char(&mut self, c: char) {
        if let Some(p) = self.prompt.as_mut() {
            p.push(c);
        }
    }

    pub fn pop_prompt_char(&mut self) {
        if let Some(p) = self.prompt.as_mut() {
            p.pop();
        }
    }

    /// Close the prompt and scan what was typed. Errors end up in `message`.
    pub fn submit_prompt(&mut self) {
        let Some(raw) = self.prompt.take() else {
            return;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return;
        }
        let folder = expand_home(raw);
        if let Err(err) = self.add_folder(&folder) {
            self.set_message(err.to_string());
        }
    }
}

fn describe_report(report: &ScanReport) -> String {
    let mut text = format!("{} added", report.added);
    if report.defaulted > 0 {
        text.push_str(&format!(", {} without tags", report.defaulted));
    }
    if report.walk_errors > 0 {
        text.push_str(&format!(", {} unreadable", report.walk_errors));
    }
    text
}

/// Expand a leading `~` to `$HOME`.
fn expand_home(raw: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    match (raw.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}

#[cfg(test)]
pub(super) fn expand_home_for_test(raw: &str) -> PathBuf {
    expand_home(raw)
}
