use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::app::{App, PlaybackState};
use crate::audio::{AudioCmd, AudioPlayer};
use crate::config;
use crate::mpris::ControlCmd;
use crate::mpris::MprisHandle;
use crate::runtime::mpris_sync::update_mpris;
use crate::ui;

/// State tracked by the runtime event loop across iterations.
#[derive(Debug, Default)]
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    /// Same for `CC` (clear library).
    pub pending_cc: bool,
}

impl EventLoopState {
    fn reset_prefixes(&mut self) {
        self.pending_gg = false;
        self.pending_cc = false;
    }
}

fn send(audio_player: &AudioPlayer, cmd: Option<AudioCmd>) {
    if let Some(cmd) = cmd {
        debug!(?cmd, "audio command");
        let _ = audio_player.send(cmd);
    }
}

/// Main terminal event loop: handles input, UI drawing, sync with the audio
/// thread and MPRIS. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    mpris: &MprisHandle,
    control_tx: &mpsc::Sender<ControlCmd>,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        // Sync playback state from the audio thread and auto-advance at track end.
        if let Some(handle) = app.playback_handle.as_ref().cloned() {
            let finished = match handle.lock() {
                Ok(mut info) => {
                    let finished = app.sync_playback(&info);
                    info.finished = false;
                    finished
                }
                Err(_) => false,
            };
            if finished {
                let cmd = app.on_track_finished();
                send(audio_player, cmd);
            }
        }

        // Keep MPRIS in sync even when playback changes come from media keys or auto-advance.
        update_mpris(mpris, app);

        terminal.draw(|f| ui::draw(f, app, settings))?;

        while let Ok(cmd) = control_rx.try_recv() {
            if handle_control_cmd(cmd, settings, app, audio_player) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, audio_player, control_tx, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Apply a transport command from MPRIS (or from keys routed through it).
/// Returns true when the app should quit.
fn handle_control_cmd(
    cmd: ControlCmd,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
) -> bool {
    let audio_cmd = match cmd {
        ControlCmd::Quit => {
            audio_player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        ControlCmd::Play => app.play(),
        ControlCmd::Pause => app.pause(),
        ControlCmd::PlayPause => app.toggle_pause(),
        ControlCmd::Stop => Some(app.stop()),
        ControlCmd::Next => app.play_next(),
        ControlCmd::Prev => app.play_prev(),
        ControlCmd::SeekBy(secs) => app.now_playing.as_ref().map(|_| AudioCmd::SeekBy(secs)),
        ControlCmd::SeekTo(pos) => app.now_playing.as_ref().map(|_| AudioCmd::SeekTo(pos)),
    };
    if matches!(
        cmd,
        ControlCmd::Play | ControlCmd::PlayPause | ControlCmd::Next | ControlCmd::Prev
    ) {
        app.follow_playback_on();
    }
    send(audio_player, audio_cmd);
    false
}

/// Keys while the add-folder prompt is open.
fn handle_prompt_key(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => app.cancel_prompt(),
        KeyCode::Enter => app.submit_prompt(),
        KeyCode::Backspace => app.pop_prompt_char(),
        KeyCode::Char(c) if !c.is_control() => app.push_prompt_char(c),
        _ => {}
    }
}

fn handle_key_event(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App,
    audio_player: &AudioPlayer,
    control_tx: &mpsc::Sender<ControlCmd>,
    state: &mut EventLoopState,
) -> bool {
    if app.prompt.is_some() {
        state.reset_prefixes();
        handle_prompt_key(key, app);
        return false;
    }

    let pending_gg = std::mem::take(&mut state.pending_gg);
    let pending_cc = std::mem::take(&mut state.pending_cc);

    match key.code {
        KeyCode::Char('q') => {
            audio_player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
            return true;
        }
        KeyCode::Char('g') => {
            if pending_gg {
                app.follow_playback_off();
                app.set_selected(0);
            } else {
                state.pending_gg = true;
            }
        }
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.set_selected(app.playlist.len().saturating_sub(1));
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            let is_playing_selected = app.playback == PlaybackState::Playing
                && app.playlist.current_index() == Some(app.selected);
            if !is_playing_selected {
                app.follow_playback_on();
                let cmd = app.play_selected();
                send(audio_player, cmd);
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            send(audio_player, Some(AudioCmd::SeekBy(secs)));
        }
        KeyCode::Char('H') => {
            let secs = settings.controls.scrub_seconds.min(i64::MAX as u64) as i64;
            send(audio_player, Some(AudioCmd::SeekBy(-secs)));
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            let cmd = app.change_volume(settings.controls.volume_step);
            send(audio_player, Some(cmd));
        }
        KeyCode::Char('-') => {
            let cmd = app.change_volume(-settings.controls.volume_step);
            send(audio_player, Some(cmd));
        }
        KeyCode::Tab => app.cycle_genre(true),
        KeyCode::BackTab => app.cycle_genre(false),
        KeyCode::Char('s') => app.shuffle(),
        KeyCode::Char('r') => app.cycle_loop_mode(),
        KeyCode::Char('m') => {
            app.toggle_mark();
            app.next();
        }
        KeyCode::Char('d') => {
            let cmd = app.remove_selection();
            send(audio_player, cmd);
        }
        KeyCode::Char('a') => app.open_prompt(),
        KeyCode::Char('R') => {
            let cmd = app.refresh();
            send(audio_player, cmd);
        }
        KeyCode::Char('C') => {
            if pending_cc {
                let cmd = app.clear_library();
                send(audio_player, cmd);
            } else {
                state.pending_cc = true;
                app.set_message("Press C again to clear the library");
            }
        }
        KeyCode::Char('K') => app.toggle_metadata_window(),
        KeyCode::Esc => {
            app.metadata_window = false;
            app.message = None;
        }
        _ => {}
    }

    false
}
