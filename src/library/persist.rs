//! On-disk JSON shape of the library.
//!
//! ```json
//! {"genres": {"Rock": [{"path": "...", "title": "...", "artist": "...", "album_art": null}]},
//!  "folders": ["/music/Rock"]}
//! ```
//!
//! Album art is never written; the field is always `null`. Records written
//! by older versions may lack `title`/`artist` and carry extra keys, which
//! are ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::LibraryError;

#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct LibraryFile {
    #[serde(default)]
    pub genres: BTreeMap<String, Vec<StoredTrack>>,
    #[serde(default)]
    pub folders: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct StoredTrack {
    pub path: PathBuf,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default, skip_deserializing)]
    pub album_art: Option<()>,
}

/// Read and parse the library file. `Ok(None)` when it does not exist.
pub(super) fn read_file(path: &Path) -> Result<Option<LibraryFile>, LibraryError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(LibraryError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| LibraryError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

/// Serialize `file` next to `path` and rename it into place, so a failed
/// write leaves the previous file as it was.
pub(super) fn write_file(path: &Path, file: &LibraryFile) -> Result<(), LibraryError> {
    let content = serde_json::to_vec(file)?;

    let write_err = |source| LibraryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content).map_err(write_err)?;
    if let Err(source) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(source));
    }
    Ok(())
}
