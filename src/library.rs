//! Library module: the folder-grouped track model and everything that feeds it.
//!
//! `LibraryStore` owns the genre buckets and the set of scanned folders, the
//! scanner walks directories into it, and `Playlist` is the flattened view the
//! UI plays from.

mod display;
mod error;
mod metadata;
mod model;
mod persist;
mod playlist;
mod scan;
mod store;

pub use display::display_from_fields;
pub use error::{LibraryError, MetadataError};
pub use metadata::{Extracted, MetadataExtractor, TagReader, TrackMetadata, UNKNOWN_ARTIST};
pub use model::{GenreFilter, Library, PlaylistEntry, Track, ALL_GENRES};
pub use playlist::Playlist;
pub use scan::{ScanOptions, ScanReport};
pub use store::{LibraryStore, LoadOutcome, ScanOutcome};

#[cfg(test)]
mod tests;
