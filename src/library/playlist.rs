use rand::Rng;
use rand::seq::SliceRandom;

use super::model::PlaylistEntry;

/// The flattened, filter-derived list the player walks through, plus the
/// cursor of the track loaded into the player.
///
/// The cursor follows track identity (path): rebuilding or shuffling the
/// list keeps it on the same track, or clears it when that track is gone.
#[derive(Debug, Default, Clone)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        Self {
            entries,
            current: None,
        }
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&PlaylistEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    pub fn position_of(&self, path: &std::path::Path) -> Option<usize> {
        self.entries.iter().position(|e| e.track.path == path)
    }

    /// Install a freshly flattened list, keeping the cursor on the same track.
    pub fn replace(&mut self, entries: Vec<PlaylistEntry>) {
        let current_path = self.current().map(|e| e.track.path.clone());
        self.entries = entries;
        self.current = current_path.and_then(|p| self.position_of(&p));
    }

    /// Point the cursor at `index`. Out-of-range indices are ignored.
    pub fn set_current(&mut self, index: usize) -> Option<&PlaylistEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.current = Some(index);
        self.entries.get(index)
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Index after the current one, wrapping. With nothing loaded this is 0.
    pub fn next_index(&self) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        Some(match self.current {
            Some(i) => (i + 1) % self.entries.len(),
            None => 0,
        })
    }

    /// Index before the current one, wrapping. With nothing loaded this is
    /// the last entry.
    pub fn prev_index(&self) -> Option<usize> {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }
        Some(match self.current {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        })
    }

    /// Reorder in place. The library order is untouched and the cursor stays
    /// on the track it pointed at.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let current_path = self.current().map(|e| e.track.path.clone());
        self.entries.shuffle(rng);
        self.current = current_path.and_then(|p| self.position_of(&p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Track;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    fn entry(genre: &str, name: &str) -> PlaylistEntry {
        PlaylistEntry {
            genre: genre.into(),
            track: Track {
                path: PathBuf::from(format!("/music/{genre}/{name}.mp3")),
                title: name.into(),
                artist: "Unknown Artist".into(),
                album_art: None,
            },
        }
    }

    fn playlist(n: usize) -> Playlist {
        Playlist::new((0..n).map(|i| entry("Rock", &format!("song{i}"))).collect())
    }

    #[test]
    fn next_and_prev_wrap_around() {
        let mut p = playlist(3);
        p.set_current(2);
        assert_eq!(p.next_index(), Some(0));
        p.set_current(0);
        assert_eq!(p.prev_index(), Some(2));
        p.set_current(1);
        assert_eq!(p.next_index(), Some(2));
        assert_eq!(p.prev_index(), Some(0));
    }

    #[test]
    fn navigation_without_current_starts_at_either_end() {
        let p = playlist(4);
        assert_eq!(p.next_index(), Some(0));
        assert_eq!(p.prev_index(), Some(3));
    }

    #[test]
    fn empty_playlist_has_nowhere_to_go() {
        let mut p = Playlist::default();
        assert_eq!(p.next_index(), None);
        assert_eq!(p.prev_index(), None);
        assert!(p.set_current(0).is_none());
        assert_eq!(p.current_index(), None);
    }

    #[test]
    fn shuffle_keeps_cursor_on_the_same_track() {
        let mut p = playlist(20);
        p.set_current(7);
        let before = p.current().unwrap().track.path.clone();

        let mut rng = StdRng::seed_from_u64(42);
        p.shuffle(&mut rng);

        assert_eq!(p.len(), 20);
        assert_eq!(p.current().unwrap().track.path, before);
    }

    #[test]
    fn shuffle_without_current_leaves_cursor_empty() {
        let mut p = playlist(5);
        let mut rng = StdRng::seed_from_u64(1);
        p.shuffle(&mut rng);
        assert_eq!(p.current_index(), None);
    }

    #[test]
    fn replace_follows_track_identity() {
        let mut p = Playlist::new(vec![entry("Rock", "a"), entry("Rock", "b")]);
        p.set_current(1);

        p.replace(vec![
            entry("Jazz", "x"),
            entry("Rock", "a"),
            entry("Rock", "b"),
        ]);
        assert_eq!(p.current_index(), Some(2));

        p.replace(vec![entry("Jazz", "x")]);
        assert_eq!(p.current_index(), None);
    }
}
