use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Label shown for the filter that spans every genre.
pub const ALL_GENRES: &str = "All Genres";

/// One audio file known to the library.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    /// Embedded picture bytes. Only ever held in memory.
    pub album_art: Option<Arc<[u8]>>,
}

/// A track annotated with the genre bucket it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub genre: String,
    pub track: Track,
}

/// Which part of the library the playlist is built from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum GenreFilter {
    #[default]
    All,
    Genre(String),
}

impl GenreFilter {
    pub fn label(&self) -> &str {
        match self {
            GenreFilter::All => ALL_GENRES,
            GenreFilter::Genre(name) => name,
        }
    }
}

impl fmt::Display for GenreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Genre name -> ordered bucket of tracks.
///
/// Paths are unique inside a bucket; `insert` refuses a path the bucket
/// already holds. Genres iterate in name order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Library {
    genres: BTreeMap<String, Vec<Track>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    /// Number of tracks across every bucket.
    pub fn track_count(&self) -> usize {
        self.genres.values().map(Vec::len).sum()
    }

    pub fn genre_names(&self) -> impl Iterator<Item = &str> {
        self.genres.keys().map(String::as_str)
    }

    pub fn genres(&self) -> impl Iterator<Item = (&str, &[Track])> {
        self.genres
            .iter()
            .map(|(name, tracks)| (name.as_str(), tracks.as_slice()))
    }

    pub fn bucket(&self, genre: &str) -> Option<&[Track]> {
        self.genres.get(genre).map(Vec::as_slice)
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.contains_key(genre)
    }

    /// Create an empty bucket for `genre` unless one exists.
    pub fn ensure_genre(&mut self, genre: &str) {
        if !self.genres.contains_key(genre) {
            self.genres.insert(genre.to_string(), Vec::new());
        }
    }

    pub fn contains(&self, genre: &str, path: &Path) -> bool {
        self.genres
            .get(genre)
            .is_some_and(|tracks| tracks.iter().any(|t| t.path == path))
    }

    /// Append `track` to `genre`, creating the bucket if needed.
    ///
    /// Returns false (and drops the track) when the bucket already has its path.
    pub fn insert(&mut self, genre: &str, track: Track) -> bool {
        let bucket = self.genres.entry(genre.to_string()).or_default();
        if bucket.iter().any(|t| t.path == track.path) {
            return false;
        }
        bucket.push(track);
        true
    }

    /// Remove `paths` from every bucket (`GenreFilter::All`) or from one
    /// bucket only, then drop the buckets that were emptied.
    pub fn remove_paths(&mut self, paths: &[PathBuf], filter: &GenreFilter) -> usize {
        if paths.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut emptied: Vec<String> = Vec::new();
        for (genre, tracks) in self.genres.iter_mut() {
            if let GenreFilter::Genre(only) = filter {
                if only != genre {
                    continue;
                }
            }
            let before = tracks.len();
            tracks.retain(|t| !paths.contains(&t.path));
            if tracks.len() != before {
                removed += before - tracks.len();
                if tracks.is_empty() {
                    emptied.push(genre.clone());
                }
            }
        }

        for genre in emptied {
            self.genres.remove(&genre);
        }
        removed
    }

    pub fn clear(&mut self) {
        self.genres.clear();
    }

    /// Flatten into playlist entries, in bucket order then track order.
    pub fn flatten(&self, filter: &GenreFilter) -> Vec<PlaylistEntry> {
        let annotate = |genre: &str, tracks: &[Track]| {
            tracks
                .iter()
                .map(|t| PlaylistEntry {
                    genre: genre.to_string(),
                    track: t.clone(),
                })
                .collect::<Vec<_>>()
        };

        match filter {
            GenreFilter::All => self
                .genres
                .iter()
                .flat_map(|(genre, tracks)| annotate(genre, tracks))
                .collect(),
            GenreFilter::Genre(name) => self
                .bucket(name)
                .map(|tracks| annotate(name, tracks))
                .unwrap_or_default(),
        }
    }
}

/// Genre label for a directory: its last path segment.
///
/// Falls back to the whole path for roots such as `/` that have no name.
pub fn genre_for_dir(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
