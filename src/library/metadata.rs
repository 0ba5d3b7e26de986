//! Tag reading for library tracks.
//!
//! `MetadataExtractor` is the seam the store scans through. `TagReader` is the
//! real implementation on top of `lofty`; it never fails, it reports whether
//! the values came from tags or from defaults.

use std::path::Path;
use std::sync::Arc;

use lofty::picture::PictureType;
use lofty::prelude::{Accessor, TaggedFileExt};
use tracing::debug;

use super::error::MetadataError;

/// Artist shown when a file has no usable artist tag.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album_art: Option<Arc<[u8]>>,
}

impl TrackMetadata {
    /// Filename-derived title, unknown artist, no art.
    pub fn fallback(path: &Path) -> Self {
        Self {
            title: default_title(path),
            artist: UNKNOWN_ARTIST.to_string(),
            album_art: None,
        }
    }
}

/// Result of one extraction.
#[derive(Debug)]
pub enum Extracted {
    /// Tags were read. Fields missing from the tag still hold defaults.
    Tagged(TrackMetadata),
    /// The file could not be read; every field is a default.
    Defaulted {
        metadata: TrackMetadata,
        reason: MetadataError,
    },
}

impl Extracted {
    pub fn into_metadata(self) -> TrackMetadata {
        match self {
            Extracted::Tagged(m) => m,
            Extracted::Defaulted { metadata, .. } => metadata,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Extracted::Defaulted { .. })
    }
}

pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> Extracted;
}

/// Reads title, artist and the front cover with `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TagReader;

impl MetadataExtractor for TagReader {
    fn extract(&self, path: &Path) -> Extracted {
        let tagged = match lofty::read_from_path(path) {
            Ok(tagged) => tagged,
            Err(source) => {
                return Extracted::Defaulted {
                    metadata: TrackMetadata::fallback(path),
                    reason: MetadataError::Tags {
                        path: path.to_path_buf(),
                        source,
                    },
                };
            }
        };

        let mut metadata = TrackMetadata::fallback(path);

        let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
            debug!(path = %path.display(), "no tag present");
            return Extracted::Tagged(metadata);
        };

        if let Some(v) = tag.title() {
            let v = v.trim();
            if !v.is_empty() {
                metadata.title = v.to_string();
            }
        }
        if let Some(v) = tag.artist() {
            let v = v.trim();
            if !v.is_empty() {
                metadata.artist = v.to_string();
            }
        }

        // Prefer the front cover, otherwise whatever picture comes first.
        let pictures = tag.pictures();
        let picture = pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first());
        metadata.album_art = picture
            .map(|p| p.data())
            .filter(|data| !data.is_empty())
            .map(Arc::from);

        Extracted::Tagged(metadata)
    }
}

/// File stem, or the whole file name when there is no stem.
pub fn default_title(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
