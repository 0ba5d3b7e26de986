use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::metadata::{Extracted, MetadataExtractor};
use super::model::{genre_for_dir, Library, Track};

/// Walk settings taken from `LibrarySettings`.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot.
    pub extensions: Vec<String>,
    pub follow_links: bool,
    pub include_hidden: bool,
}

impl ScanOptions {
    pub fn from_settings(settings: &LibrarySettings) -> Self {
        let extensions = settings
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            extensions,
            follow_links: settings.follow_links,
            include_hidden: settings.include_hidden,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_settings(&LibrarySettings::default())
    }
}

/// What one walk did to the library.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub added: usize,
    /// Audio files whose path was already in their genre bucket.
    pub existing: usize,
    /// Files added with default metadata because their tags could not be read.
    pub defaulted: usize,
    /// Entries the walker could not read (permissions, symlink loops).
    pub walk_errors: usize,
}

fn is_audio_file(path: &Path, options: &ScanOptions) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            options.extensions.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Walk `root` recursively and append every new audio file to the bucket
/// named after its parent directory.
///
/// Every directory visited gets a bucket, even one without audio files.
/// Unreadable entries are logged and skipped.
pub(super) fn scan_into(
    library: &mut Library,
    root: &Path,
    options: &ScanOptions,
    extractor: &dyn MetadataExtractor,
) -> ScanReport {
    let mut report = ScanReport::default();

    let walker = WalkDir::new(root)
        .follow_links(options.follow_links)
        .sort_by_file_name();

    for entry in walker
        .into_iter()
        .filter_entry(|e| options.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                report.walk_errors += 1;
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            library.ensure_genre(&genre_for_dir(path));
            continue;
        }

        if !entry.file_type().is_file() || !is_audio_file(path, options) {
            continue;
        }

        let Some(parent) = path.parent() else {
            continue;
        };
        let genre = genre_for_dir(parent);
        if library.contains(&genre, path) {
            report.existing += 1;
            continue;
        }

        let extracted = extractor.extract(path);
        if let Extracted::Defaulted { reason, .. } = &extracted {
            debug!(error = %reason, "using default metadata");
            report.defaulted += 1;
        }
        let metadata = extracted.into_metadata();

        let inserted = library.insert(
            &genre,
            Track {
                path: path.to_path_buf(),
                title: metadata.title,
                artist: metadata.artist,
                album_art: metadata.album_art,
            },
        );
        if inserted {
            report.added += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_audio_file_matches_configured_extensions_case_insensitive() {
        let options = ScanOptions::default();
        assert!(is_audio_file(Path::new("/tmp/a.mp3"), &options));
        assert!(is_audio_file(Path::new("/tmp/a.MP3"), &options));
        assert!(is_audio_file(Path::new("/tmp/a.flac"), &options));
        assert!(is_audio_file(Path::new("/tmp/a.wav"), &options));
        assert!(is_audio_file(Path::new("/tmp/a.Ogg"), &options));
        assert!(is_audio_file(Path::new("/tmp/a.m4a"), &options));
        assert!(!is_audio_file(Path::new("/tmp/a.txt"), &options));
        assert!(!is_audio_file(Path::new("/tmp/a"), &options));
    }

    #[test]
    fn options_normalize_configured_extensions() {
        let settings = LibrarySettings {
            extensions: vec![".MP3".into(), " flac ".into(), "".into()],
            ..LibrarySettings::default()
        };
        let options = ScanOptions::from_settings(&settings);
        assert_eq!(options.extensions, vec!["mp3".to_string(), "flac".to_string()]);
    }

    #[test]
    fn hidden_detection_uses_leading_dot() {
        assert!(is_hidden(Path::new("/music/.cache")));
        assert!(!is_hidden(Path::new("/music/Rock")));
    }
}
