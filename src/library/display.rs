use crate::config::TrackDisplayField;

use super::metadata::UNKNOWN_ARTIST;
use super::model::PlaylistEntry;

/// Build a display string for a playlist entry according to `fields` and `sep`.
///
/// This composes metadata fields (title, artist, genre, filename, path) in the
/// configured order and falls back to the title when no parts were produced.
/// The unknown-artist sentinel counts as "no artist".
pub fn display_from_fields(entry: &PlaylistEntry, fields: &[TrackDisplayField], sep: &str) -> String {
    let track = &entry.track;
    let mut parts: Vec<String> = Vec::new();

    for f in fields {
        match f {
            TrackDisplayField::Title => {
                if !track.title.trim().is_empty() {
                    parts.push(track.title.trim().to_string());
                }
            }
            TrackDisplayField::Artist => {
                let artist = track.artist.trim();
                if !artist.is_empty() && artist != UNKNOWN_ARTIST {
                    parts.push(artist.to_string());
                }
            }
            TrackDisplayField::Genre => {
                if !entry.genre.trim().is_empty() {
                    parts.push(entry.genre.clone());
                }
            }
            TrackDisplayField::Filename => {
                if let Some(stem) = track.path.file_stem().and_then(|s| s.to_str()) {
                    if !stem.trim().is_empty() {
                        parts.push(stem.to_string());
                    }
                }
            }
            TrackDisplayField::Path => {
                parts.push(track.path.display().to_string());
            }
        }
    }

    if parts.is_empty() {
        track.title.clone()
    } else {
        parts.join(sep)
    }
}
