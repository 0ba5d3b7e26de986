//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, PlaybackState};
use crate::audio::{LoopMode, PlaybackInfo};
use crate::config::{Settings, TimeField, UiSettings};
use crate::library::{GenreFilter, PlaylistEntry, display_from_fields};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected song".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next song".to_string());
    // H/L is filled dynamically from config.
    map.insert("-/+".to_string(), "volume".to_string());
    map.insert("tab".to_string(), "next genre".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "loop mode".to_string());
    map.insert("m".to_string(), "mark".to_string());
    map.insert("d".to_string(), "remove".to_string());
    map.insert("a".to_string(), "add folder".to_string());
    map.insert("R".to_string(), "refresh".to_string());
    map.insert("CC".to_string(), "clear library".to_string());
    map.insert("K".to_string(), "metadata".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "-/+", "tab", "s", "r", "m", "d", "a",
        "R", "CC", "K", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Fraction of the track already played, for the progress gauge.
fn progress_ratio(info: &PlaybackInfo) -> f64 {
    match info.duration {
        Some(total) if !total.is_zero() => {
            (info.elapsed.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn album_art_text(entry: &PlaylistEntry) -> String {
    match &entry.track.album_art {
        Some(bytes) => format!("embedded image, {} bytes", bytes.len()),
        None => "none".to_string(),
    }
}

fn status_text(app: &App, info: Option<&PlaybackInfo>, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    // cursor mode
    if app.follow_playback {
        parts.push(" CURSOR: Follow".to_string());
    } else {
        parts.push(" CURSOR: Free-roam".to_string());
    }

    // loop mode
    let loop_text = match app.loop_mode {
        LoopMode::NoLoop => "PLAYBACK: No-loop",
        LoopMode::LoopAll => "PLAYBACK: Loop-around",
        LoopMode::LoopOne => "PLAYBACK: Repeat-one",
    };
    parts.push(loop_text.to_string());

    parts.push(format!("GENRE: {}", app.filter));

    // playback info
    match (&app.now_playing, app.playback) {
        (Some(entry), state) if state != PlaybackState::Stopped => {
            let song = display_from_fields(
                entry,
                &ui.now_playing_track_fields,
                &ui.now_playing_track_separator,
            );
            let time = info.and_then(|i| now_playing_time_text(i.elapsed, i.duration, ui));
            match time {
                Some(time) => parts.push(format!("Song: {} [{}]", song, time)),
                None => parts.push(format!("Song: {}", song)),
            }
            parts.push(if state == PlaybackState::Playing {
                "Playing".to_string()
            } else {
                "Paused".to_string()
            });
        }
        _ => parts.push("Stopped".to_string()),
    }

    parts.push(format!("Volume: {:.0}%", app.volume * 100.0));

    let library = app.store.library();
    parts.push(format!(
        "Library: {} tracks in {} genres from {} folders",
        library.track_count(),
        library.genre_names().count(),
        app.store.folders().count()
    ));

    if !app.marked.is_empty() {
        parts.push(format!("Marked: {}", app.marked.len()));
    }

    if let Some(err) = info.and_then(|i| i.error.as_deref()) {
        parts.push(format!("Error: {err}"));
    } else if let Some(msg) = &app.message {
        parts.push(msg.clone());
    }

    parts.join(" • ")
}

fn track_row(app: &App, index: usize, entry: &PlaylistEntry, settings: &Settings) -> String {
    let mark = if app.marked.contains(&entry.track.path) {
        '*'
    } else {
        ' '
    };
    let playing = if app.playlist.current_index() == Some(index) {
        '♪'
    } else {
        ' '
    };
    let text = display_from_fields(
        entry,
        &settings.library.display_fields,
        &settings.library.display_separator,
    );
    if settings.ui.show_genre_column && app.filter == GenreFilter::All {
        format!("{mark}{playing} [{}] {}", entry.genre, text)
    } else {
        format!("{mark}{playing} {}", text)
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(frame: &mut Frame, app: &App, settings: &Settings) {
    let ui_settings = &settings.ui;
    let info = app.playback_info();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());
    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" tunefold ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status_par = Paragraph::new(status_text(app, info.as_ref(), ui_settings))
        .slow_blink()
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Progress
    {
        let (ratio, label) = match info.as_ref().filter(|i| i.path.is_some()) {
            Some(i) => (
                progress_ratio(i),
                now_playing_time_text(i.elapsed, i.duration, ui_settings).unwrap_or_default(),
            ),
            None => (0.0, String::new()),
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" progress "))
            .ratio(ratio)
            .label(label);
        frame.render_widget(gauge, chunks[2]);
    }

    // Main list
    {
        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let entries = app.playlist.entries();
        let total = entries.len();
        let list_height = chunks[3].height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = if sel_pos > half { sel_pos - half } else { 0 };
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = entries[start..end]
            .iter()
            .enumerate()
            .map(|(offset, entry)| ListItem::new(track_row(app, start + offset, entry, settings)))
            .collect();

        let title = format!(" {} ({}) ", app.filter, total);
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[3], &mut state);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let list_area = chunks[3];
        let popup_area = centered_rect_sized(72, 8, list_area);
        frame.render_widget(Clear, popup_area);

        let meta = match app.selected_entry() {
            Some(entry) => format!(
                "Title: {}\nArtist: {}\nGenre: {}\nAlbum art: {}\nPath: {}",
                entry.track.title,
                entry.track.artist,
                entry.genre,
                album_art_text(entry),
                entry.track.path.display()
            ),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    if let Some(input) = &app.prompt {
        let popup_area = centered_rect_sized(72, 5, chunks[3]);
        frame.render_widget(Clear, popup_area);
        let prompt = Paragraph::new(format!("{input}_"))
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 1,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" add folder (enter scans, esc cancels) "),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(prompt, popup_area);
    }

    let footer_text = controls_text(settings.controls.scrub_seconds);
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}
