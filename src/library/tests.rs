use super::*;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::{TempDir, tempdir};

/// Extractor that records every path it is asked about.
#[derive(Clone, Default)]
struct CountingExtractor {
    calls: Rc<RefCell<Vec<PathBuf>>>,
}

impl CountingExtractor {
    fn calls_for(&self, path: &Path) -> usize {
        self.calls.borrow().iter().filter(|p| p.as_path() == path).count()
    }

    fn total(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl MetadataExtractor for CountingExtractor {
    fn extract(&self, path: &Path) -> Extracted {
        self.calls.borrow_mut().push(path.to_path_buf());
        let mut metadata = TrackMetadata::fallback(path);
        metadata.artist = "Tagged Artist".to_string();
        Extracted::Tagged(metadata)
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"not real audio").unwrap();
}

fn store_with(state_file: Option<PathBuf>) -> (LibraryStore, CountingExtractor) {
    let extractor = CountingExtractor::default();
    let store = LibraryStore::new(
        state_file,
        ScanOptions::default(),
        Box::new(extractor.clone()),
    );
    (store, extractor)
}

/// `<tmp>/music/Rock/{song1,song2}.mp3`
fn rock_fixture() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let rock = dir.path().join("music").join("Rock");
    touch(&rock.join("song1.mp3"));
    touch(&rock.join("song2.mp3"));
    (dir, rock)
}

fn paths(entries: &[PlaylistEntry]) -> Vec<PathBuf> {
    entries.iter().map(|e| e.track.path.clone()).collect()
}

#[test]
fn scanning_rock_folder_builds_one_bucket() {
    let (_dir, rock) = rock_fixture();
    let (mut store, _) = store_with(None);

    let outcome = store.scan(&rock).unwrap();
    let ScanOutcome::Scanned(report) = outcome else {
        panic!("expected a fresh scan");
    };
    assert_eq!(report.added, 2);

    let bucket = store.library().bucket("Rock").unwrap();
    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket[0].path, rock.join("song1.mp3"));
    assert_eq!(bucket[0].title, "song1");
    assert_eq!(bucket[1].path, rock.join("song2.mp3"));

    let all = store.flatten(&GenreFilter::All);
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|e| e.genre == "Rock"));
}

#[test]
fn removing_every_track_drops_the_genre() {
    let (_dir, rock) = rock_fixture();
    let (mut store, _) = store_with(None);
    store.scan(&rock).unwrap();

    let removed = store.remove(&[rock.join("song1.mp3")], &GenreFilter::All);
    assert_eq!(removed, 1);
    assert_eq!(
        paths(&store.flatten(&GenreFilter::All)),
        vec![rock.join("song2.mp3")]
    );

    store.remove(&[rock.join("song2.mp3")], &GenreFilter::All);
    assert!(store.library().is_empty());
    assert!(!store.library().has_genre("Rock"));
    assert!(store.flatten(&GenreFilter::All).is_empty());
}

#[test]
fn rescanning_the_same_folder_is_a_no_op() {
    let (_dir, rock) = rock_fixture();
    let (mut store, extractor) = store_with(None);

    store.scan(&rock).unwrap();
    let after_first = store.library().clone();
    let calls = extractor.total();

    assert_eq!(store.scan(&rock).unwrap(), ScanOutcome::AlreadyScanned);
    assert_eq!(store.library(), &after_first);
    assert_eq!(extractor.total(), calls);
}

#[test]
fn scanning_a_parent_does_not_duplicate_or_reextract() {
    let (dir, rock) = rock_fixture();
    let (mut store, extractor) = store_with(None);

    store.scan(&rock).unwrap();
    let ScanOutcome::Scanned(report) = store.scan(&dir.path().join("music")).unwrap() else {
        panic!("parent folder is new");
    };

    assert_eq!(report.added, 0);
    assert_eq!(report.existing, 2);
    assert_eq!(store.library().bucket("Rock").unwrap().len(), 2);
    assert_eq!(extractor.calls_for(&rock.join("song1.mp3")), 1);
    assert_eq!(extractor.calls_for(&rock.join("song2.mp3")), 1);
    // The parent directory itself became an (empty) genre.
    assert_eq!(store.library().bucket("music"), Some(&[][..]));
}

#[test]
fn nested_directories_become_their_own_genres() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("Library");
    touch(&root.join("top.flac"));
    touch(&root.join("Jazz").join("Bebop").join("a.OGG"));
    touch(&root.join("Jazz").join("b.m4a"));
    touch(&root.join("Jazz").join("cover.jpg"));
    touch(&root.join("Jazz").join("notes.txt"));

    let (mut store, _) = store_with(None);
    store.scan(&root).unwrap();

    let lib = store.library();
    assert_eq!(lib.bucket("Library").unwrap().len(), 1);
    assert_eq!(lib.bucket("Jazz").unwrap().len(), 1);
    assert_eq!(lib.bucket("Bebop").unwrap().len(), 1);
    assert_eq!(lib.track_count(), 3);
}

#[test]
fn flatten_all_covers_every_bucket_with_matching_annotations() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("music");
    touch(&root.join("Rock").join("r1.mp3"));
    touch(&root.join("Rock").join("r2.wav"));
    touch(&root.join("Jazz").join("j1.flac"));
    touch(&root.join("Blues").join("b1.ogg"));

    let (mut store, _) = store_with(None);
    store.scan(&root).unwrap();

    let all = store.flatten(&GenreFilter::All);
    let bucket_total: usize = store.library().genres().map(|(_, t)| t.len()).sum();
    assert_eq!(all.len(), bucket_total);
    assert_eq!(all.len(), 4);
    for e in &all {
        let bucket = store.library().bucket(&e.genre).unwrap();
        assert!(bucket.iter().any(|t| t.path == e.track.path));
    }

    let jazz = store.flatten(&GenreFilter::Genre("Jazz".into()));
    assert_eq!(paths(&jazz), vec![root.join("Jazz").join("j1.flac")]);
    assert!(store.flatten(&GenreFilter::Genre("Metal".into())).is_empty());
}

#[test]
fn same_named_folders_under_different_roots_share_a_genre() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a").join("Rock");
    let b = dir.path().join("b").join("Rock");
    touch(&a.join("one.mp3"));
    touch(&b.join("two.mp3"));

    let (mut store, _) = store_with(None);
    store.scan(&a).unwrap();
    store.scan(&b).unwrap();

    assert_eq!(store.library().genre_names().collect::<Vec<_>>(), vec!["Rock"]);
    assert_eq!(store.library().bucket("Rock").unwrap().len(), 2);
}

#[test]
fn remove_with_genre_filter_only_touches_that_bucket() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("x").join("Rock");
    let b = dir.path().join("y").join("Pop");
    touch(&a.join("s.mp3"));
    touch(&b.join("s.mp3"));

    let (mut store, _) = store_with(None);
    store.scan(&a).unwrap();
    store.scan(&b).unwrap();

    let rock_song = a.join("s.mp3");
    let pop_song = b.join("s.mp3");
    let removed = store.remove(
        &[rock_song.clone(), pop_song.clone()],
        &GenreFilter::Genre("Pop".into()),
    );

    assert_eq!(removed, 1);
    assert!(!store.library().has_genre("Pop"));
    assert!(store.library().contains("Rock", &rock_song));
}

#[test]
fn empty_selection_removes_nothing() {
    let (_dir, rock) = rock_fixture();
    let (mut store, _) = store_with(None);
    store.scan(&rock).unwrap();

    assert_eq!(store.remove(&[], &GenreFilter::All), 0);
    assert_eq!(store.library().track_count(), 2);
}

#[test]
fn scanning_a_file_is_rejected() {
    let (_dir, rock) = rock_fixture();
    let (mut store, _) = store_with(None);

    let err = store.scan(&rock.join("song1.mp3")).unwrap_err();
    assert!(matches!(err, LibraryError::NotADirectory(_)));
    assert!(store.library().is_empty());
    assert_eq!(store.folders().count(), 0);
}

#[test]
fn refresh_rebuilds_and_reextracts_everything() {
    let (_dir, rock) = rock_fixture();
    let (mut store, extractor) = store_with(None);
    store.scan(&rock).unwrap();

    touch(&rock.join("song3.mp3"));
    fs::remove_file(rock.join("song1.mp3")).unwrap();

    let report = store.refresh();
    assert_eq!(report.added, 2);
    assert_eq!(
        paths(&store.flatten(&GenreFilter::All)),
        vec![rock.join("song2.mp3"), rock.join("song3.mp3")]
    );
    assert_eq!(extractor.calls_for(&rock.join("song2.mp3")), 2);
    assert!(store.is_scanned(&rock));
}

#[test]
fn clear_forgets_tracks_and_folders() {
    let (_dir, rock) = rock_fixture();
    let (mut store, _) = store_with(None);
    store.scan(&rock).unwrap();

    store.clear();
    assert!(store.library().is_empty());
    assert!(!store.is_scanned(&rock));
    assert!(matches!(store.scan(&rock).unwrap(), ScanOutcome::Scanned(_)));
}

#[test]
fn save_then_load_round_trips_through_the_library_file() {
    let (dir, rock) = rock_fixture();
    let state = dir.path().join("state").join("library.json");

    let (mut store, _) = store_with(Some(state.clone()));
    store.scan(&rock).unwrap();
    assert!(state.exists());

    let (mut reloaded, _) = store_with(Some(state));
    let outcome = reloaded.load();
    assert!(matches!(
        outcome,
        LoadOutcome::Loaded {
            tracks: 2,
            pruned: 0,
            backfilled: 0
        }
    ));
    assert_eq!(
        reloaded.library().bucket("Rock").unwrap()[0].artist,
        "Tagged Artist"
    );
    assert!(reloaded.is_scanned(&rock));
}

#[test]
fn load_prunes_missing_files_and_persists_the_result() {
    let (dir, rock) = rock_fixture();
    let state = dir.path().join("library.json");

    let (mut store, _) = store_with(Some(state.clone()));
    store.scan(&rock).unwrap();
    fs::remove_file(rock.join("song1.mp3")).unwrap();

    let (mut reloaded, _) = store_with(Some(state.clone()));
    let outcome = reloaded.load();
    assert!(matches!(outcome, LoadOutcome::Loaded { pruned: 1, .. }));
    assert_eq!(
        paths(&reloaded.flatten(&GenreFilter::All)),
        vec![rock.join("song2.mp3")]
    );

    let on_disk: serde_json::Value =
        serde_json::from_slice(&fs::read(&state).unwrap()).unwrap();
    assert_eq!(on_disk["genres"]["Rock"].as_array().unwrap().len(), 1);
}

#[test]
fn load_backfills_legacy_records() {
    let dir = tempdir().unwrap();
    let song = dir.path().join("Rock").join("old.mp3");
    touch(&song);
    let state = dir.path().join("library.json");
    let legacy = serde_json::json!({
        "genres": {"Rock": [{"path": song, "title": "Old Title", "genre": "Rock"}]},
        "folders": [dir.path().join("Rock")]
    });
    fs::write(&state, serde_json::to_vec(&legacy).unwrap()).unwrap();

    let (mut store, _) = store_with(Some(state.clone()));
    let outcome = store.load();
    assert!(matches!(outcome, LoadOutcome::Loaded { backfilled: 1, .. }));

    let track = &store.library().bucket("Rock").unwrap()[0];
    assert_eq!(track.title, "Old Title");
    assert_eq!(track.artist, "Tagged Artist");

    let on_disk: serde_json::Value =
        serde_json::from_slice(&fs::read(&state).unwrap()).unwrap();
    assert_eq!(on_disk["genres"]["Rock"][0]["artist"], "Tagged Artist");
}

#[test]
fn malformed_library_file_loads_empty() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("library.json");
    fs::write(&state, "[1, 2, 3").unwrap();

    let (mut store, _) = store_with(Some(state));
    assert!(matches!(store.load(), LoadOutcome::Reset(_)));
    assert!(store.library().is_empty());
    assert_eq!(store.folders().count(), 0);
}

#[test]
fn missing_library_file_loads_empty() {
    let dir = tempdir().unwrap();
    let (mut store, _) = store_with(Some(dir.path().join("nothing.json")));
    assert!(matches!(store.load(), LoadOutcome::Missing));
    assert!(store.library().is_empty());
}

#[test]
fn hidden_entries_are_skipped_when_configured() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("Rock");
    touch(&root.join("visible.mp3"));
    touch(&root.join(".hidden.mp3"));
    touch(&root.join(".stash").join("inner.mp3"));

    let extractor = CountingExtractor::default();
    let options = ScanOptions {
        include_hidden: false,
        ..ScanOptions::default()
    };
    let mut store = LibraryStore::new(None, options, Box::new(extractor));
    store.scan(&root).unwrap();

    assert_eq!(
        paths(&store.flatten(&GenreFilter::All)),
        vec![root.join("visible.mp3")]
    );
    assert!(!store.library().has_genre(".stash"));
}

fn scratch_in_cwd() -> TempDir {
    tempfile::Builder::new()
        .prefix("tunefold-scan")
        .tempdir_in(".")
        .unwrap()
}

#[test]
fn relative_folders_are_stored_as_absolute_paths() {
    // Created under the working directory so a relative path reaches it.
    let dir = scratch_in_cwd();
    let name = dir.path().file_name().unwrap();
    touch(&dir.path().join("Rock").join("a.mp3"));
    let (mut store, _) = store_with(None);

    let relative = Path::new(name).join("Rock");
    assert!(relative.is_relative());
    assert!(matches!(store.scan(&relative).unwrap(), ScanOutcome::Scanned(_)));

    let stored = paths(&store.flatten(&GenreFilter::All));
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_absolute());
    assert!(stored[0].ends_with("Rock/a.mp3"));
    assert!(store.folders().all(|f| f.is_absolute()));

    let absolute = std::env::current_dir().unwrap().join(&relative);
    assert_eq!(store.scan(&absolute).unwrap(), ScanOutcome::AlreadyScanned);
}

#[test]
fn scanning_the_current_directory_names_the_genre_after_it() {
    let dir = scratch_in_cwd();
    let name = dir.path().file_name().unwrap();
    let rock = dir.path().join("Rock");
    touch(&rock.join("a.mp3"));
    let (mut store, _) = store_with(None);

    store.scan(&Path::new(name).join("Rock").join(".")).unwrap();

    assert!(store.library().has_genre("Rock"));
    assert!(!store.library().has_genre("."));
}

#[cfg(unix)]
#[test]
fn symlink_loops_are_counted_and_skipped() {
    let (_dir, rock) = rock_fixture();
    std::os::unix::fs::symlink(&rock, rock.join("loop")).unwrap();
    let (mut store, _) = store_with(None);

    let report = match store.scan(&rock).unwrap() {
        ScanOutcome::Scanned(report) => report,
        other => panic!("expected a scan, got {other:?}"),
    };

    assert_eq!(report.added, 2);
    assert!(report.walk_errors >= 1);
    assert_eq!(
        paths(&store.flatten(&GenreFilter::All)),
        vec![rock.join("song1.mp3"), rock.join("song2.mp3")]
    );
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectories_do_not_stop_the_scan() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, rock) = rock_fixture();
    let locked = rock.join("locked");
    touch(&locked.join("hidden.mp3"));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read through the mode bits; nothing to observe then.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (mut store, _) = store_with(None);
    let outcome = store.scan(&rock);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let report = match outcome.unwrap() {
        ScanOutcome::Scanned(report) => report,
        other => panic!("expected a scan, got {other:?}"),
    };
    assert_eq!(report.added, 2);
    assert!(report.walk_errors >= 1);
    assert!(store.library().contains("Rock", &rock.join("song1.mp3")));
}
