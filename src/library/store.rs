//! The library store: genre buckets, scanned folders and their persistence.

use std::collections::BTreeSet;
use std::path::{self, Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::LibraryError;
use super::metadata::MetadataExtractor;
use super::model::{GenreFilter, Library, PlaylistEntry, Track};
use super::persist::{self, LibraryFile, StoredTrack};
use super::scan::{scan_into, ScanOptions, ScanReport};

/// Result of `LibraryStore::scan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The folder was scanned before; nothing changed.
    AlreadyScanned,
    Scanned(ScanReport),
}

/// Result of `LibraryStore::load`. Loading never fails outright.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No library file yet.
    Missing,
    /// The file could not be read or parsed; the store starts empty.
    Reset(LibraryError),
    Loaded {
        tracks: usize,
        /// Entries dropped because their file is gone.
        pruned: usize,
        /// Legacy entries whose title or artist had to be re-read from tags.
        backfilled: usize,
    },
}

pub struct LibraryStore {
    library: Library,
    folders: BTreeSet<PathBuf>,
    state_file: Option<PathBuf>,
    options: ScanOptions,
    extractor: Box<dyn MetadataExtractor>,
}

impl LibraryStore {
    /// Create an empty store. With `state_file == None` nothing is persisted.
    pub fn new(
        state_file: Option<PathBuf>,
        options: ScanOptions,
        extractor: Box<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            library: Library::new(),
            folders: BTreeSet::new(),
            state_file,
            options,
            extractor,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn folders(&self) -> impl Iterator<Item = &Path> {
        self.folders.iter().map(PathBuf::as_path)
    }

    pub fn is_scanned(&self, folder: &Path) -> bool {
        self.folders.contains(folder)
    }

    pub fn state_file(&self) -> Option<&Path> {
        self.state_file.as_deref()
    }

    /// Hydrate from the library file.
    ///
    /// Missing files are dropped, legacy records get their title/artist
    /// re-read, album art is re-extracted, and the result is written back.
    pub fn load(&mut self) -> LoadOutcome {
        self.library.clear();
        self.folders.clear();

        let Some(path) = self.state_file.clone() else {
            return LoadOutcome::Missing;
        };

        let file = match persist::read_file(&path) {
            Ok(Some(file)) => file,
            Ok(None) => {
                info!(path = %path.display(), "no library file yet");
                return LoadOutcome::Missing;
            }
            Err(err) => {
                warn!(error = %err, "starting with an empty library");
                return LoadOutcome::Reset(err);
            }
        };

        let mut pruned = 0;
        let mut backfilled = 0;
        for (genre, stored) in file.genres {
            self.library.ensure_genre(&genre);
            for record in stored {
                if !record.path.exists() {
                    pruned += 1;
                    continue;
                }
                let (track, was_legacy) = self.hydrate(record);
                if was_legacy {
                    backfilled += 1;
                }
                self.library.insert(&genre, track);
            }
        }
        self.folders = file.folders.into_iter().collect();

        let tracks = self.library.track_count();
        info!(
            path = %path.display(),
            tracks,
            pruned,
            backfilled,
            "library loaded"
        );
        self.persist();

        LoadOutcome::Loaded {
            tracks,
            pruned,
            backfilled,
        }
    }

    fn hydrate(&self, record: StoredTrack) -> (Track, bool) {
        let extracted = self.extractor.extract(&record.path);
        if extracted.is_defaulted() {
            debug!(path = %record.path.display(), "tags unreadable, keeping stored fields");
        }
        let metadata = extracted.into_metadata();
        let was_legacy = record.title.is_none() || record.artist.is_none();
        let track = Track {
            title: record.title.unwrap_or(metadata.title),
            artist: record.artist.unwrap_or(metadata.artist),
            album_art: metadata.album_art,
            path: record.path,
        };
        (track, was_legacy)
    }

    /// Write the library file.
    pub fn save(&self) -> Result<(), LibraryError> {
        let Some(path) = self.state_file.as_deref() else {
            return Ok(());
        };

        let file = LibraryFile {
            genres: self
                .library
                .genres()
                .map(|(genre, tracks)| {
                    let stored = tracks
                        .iter()
                        .map(|t| StoredTrack {
                            path: t.path.clone(),
                            title: Some(t.title.clone()),
                            artist: Some(t.artist.clone()),
                            album_art: None,
                        })
                        .collect();
                    (genre.to_string(), stored)
                })
                .collect(),
            folders: self.folders.iter().cloned().collect(),
        };

        persist::write_file(path, &file)
    }

    /// Save, logging instead of failing.
    fn persist(&self) {
        if let Err(err) = self.save() {
            warn!(error = %err, "library not saved");
        }
    }

    /// Scan `folder` into the library unless it was scanned already.
    ///
    /// Relative folders are resolved against the working directory first, so
    /// stored track paths stay valid from anywhere.
    pub fn scan(&mut self, folder: &Path) -> Result<ScanOutcome, LibraryError> {
        let folder = path::absolute(folder).map_err(|source| LibraryError::Resolve {
            path: folder.to_path_buf(),
            source,
        })?;
        if self.is_scanned(&folder) {
            return Ok(ScanOutcome::AlreadyScanned);
        }
        if !folder.is_dir() {
            return Err(LibraryError::NotADirectory(folder));
        }

        let report = self.walk(&folder);
        self.persist();
        Ok(ScanOutcome::Scanned(report))
    }

    fn walk(&mut self, folder: &Path) -> ScanReport {
        let report = scan_into(
            &mut self.library,
            folder,
            &self.options,
            self.extractor.as_ref(),
        );
        self.folders.insert(folder.to_path_buf());
        info!(
            folder = %folder.display(),
            added = report.added,
            existing = report.existing,
            defaulted = report.defaulted,
            walk_errors = report.walk_errors,
            "folder scanned"
        );
        report
    }

    /// Empty the library and walk every known folder again from scratch.
    pub fn refresh(&mut self) -> ScanReport {
        let folders = std::mem::take(&mut self.folders);
        self.library.clear();

        let mut total = ScanReport::default();
        for folder in folders {
            if !folder.is_dir() {
                warn!(folder = %folder.display(), "folder is gone; dropping it");
                continue;
            }
            let report = self.walk(&folder);
            total.added += report.added;
            total.existing += report.existing;
            total.defaulted += report.defaulted;
            total.walk_errors += report.walk_errors;
        }

        self.persist();
        total
    }

    /// Remove the tracks at `paths`, from every genre or only the filtered one.
    /// Buckets left empty disappear.
    pub fn remove(&mut self, paths: &[PathBuf], filter: &GenreFilter) -> usize {
        let removed = self.library.remove_paths(paths, filter);
        if removed > 0 {
            info!(removed, filter = %filter, "tracks removed");
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.library.clear();
        self.folders.clear();
        info!("library cleared");
        self.persist();
    }

    pub fn flatten(&self, filter: &GenreFilter) -> Vec<PlaylistEntry> {
        self.library.flatten(filter)
    }
}
