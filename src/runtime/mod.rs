use std::env;
use std::path::PathBuf;
use std::sync::mpsc;

use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::AudioPlayer;
use crate::logging;
use crate::mpris::ControlCmd;

mod event_loop;
mod mpris_sync;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (settings, config_problem) = settings::load_settings();
    if let Some(problem) = &config_problem {
        eprintln!("tunefold: {problem}");
    }

    let log_path = logging::init(&settings);
    info!(log = ?log_path, "tunefold starting");
    if let Some(problem) = config_problem {
        warn!("{problem}");
    }

    let (store, notice) = startup::open_library(&settings);
    let mut app = App::new(store);
    if let Some(notice) = notice {
        app.set_message(notice);
    }
    startup::apply_playback_defaults(&mut app, &settings);
    startup::scan_cli_folders(&mut app, env::args_os().skip(1).map(PathBuf::from));

    let audio_player = AudioPlayer::new(settings.audio.clone());
    app.set_playback_handle(audio_player.playback_handle());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = crate::mpris::spawn_mpris(control_tx.clone());

    mpris_sync::update_mpris(&mpris, &app);

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let run_result: Result<(), Box<dyn std::error::Error>> = (|| {
        let mut state = event_loop::EventLoopState::default();

        event_loop::run(
            &mut terminal,
            &settings,
            &mut app,
            &audio_player,
            &mpris,
            &control_tx,
            &control_rx,
            &mut state,
        )
    })();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = app.store.save() {
        warn!(error = %err, "failed to save library on exit");
        eprintln!("tunefold: {err}");
    }
    info!("tunefold stopped");

    run_result
}
