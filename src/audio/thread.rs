use std::path::PathBuf;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, error, warn};

use crate::config::AudioSettings;

use super::sink::create_sink_at;
use super::types::{clamp_volume, AudioCmd, PlaybackHandle};

const TICK: Duration = Duration::from_millis(200);

/// State owned by the audio thread.
struct Deck {
    stream: OutputStream,
    sink: Option<Sink>,
    path: Option<PathBuf>,
    paused: bool,
    /// Position the current sink started from; `sink.get_pos()` is relative to it.
    base: Duration,
    volume: f32,
    playback_info: PlaybackHandle,
    settings: AudioSettings,
}

impl Deck {
    fn elapsed(&self) -> Duration {
        self.sink
            .as_ref()
            .map_or(Duration::ZERO, |s| self.base + s.get_pos())
    }

    fn publish_error(&self, message: String) {
        if let Ok(mut info) = self.playback_info.lock() {
            info.error = Some(message);
        }
    }

    fn load(&mut self, path: PathBuf) {
        let (new_sink, total) = match create_sink_at(&self.stream, &path, Duration::ZERO) {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "cannot play file");
                self.publish_error(err.to_string());
                self.stop();
                return;
            }
        };

        let crossfade_ms = self.settings.crossfade_ms;
        let crossfade_steps = self.settings.crossfade_steps.max(1);

        // Crossfade if currently playing a sink; otherwise just swap.
        if let Some(old_sink) = self.sink.as_ref() {
            if !self.paused && crossfade_ms > 0 {
                old_sink.set_volume(self.volume);
                new_sink.set_volume(0.0);
                new_sink.play();

                // Fade volumes in a short blocking loop; audio continues in rodio's mixer thread.
                for step in 1..=crossfade_steps {
                    let t = (step as f32) / (crossfade_steps as f32);
                    old_sink.set_volume(self.volume * (1.0 - t));
                    new_sink.set_volume(self.volume * t);
                    thread::sleep(Duration::from_millis((crossfade_ms / crossfade_steps).max(1)));
                }
            }
            old_sink.stop();
        }

        new_sink.set_volume(self.volume);
        new_sink.play();
        debug!(path = %path.display(), "playing");

        self.sink = Some(new_sink);
        self.path = Some(path.clone());
        self.paused = false;
        self.base = Duration::ZERO;

        if let Ok(mut info) = self.playback_info.lock() {
            info.path = Some(path);
            info.elapsed = Duration::ZERO;
            info.duration = total;
            info.playing = true;
            info.finished = false;
            info.error = None;
        }
    }

    fn set_paused(&mut self, paused: bool) {
        let Some(s) = self.sink.as_ref() else {
            return;
        };
        if paused {
            s.pause();
        } else {
            s.play();
        }
        self.paused = paused;
        if let Ok(mut info) = self.playback_info.lock() {
            info.playing = !paused;
        }
    }

    fn stop(&mut self) {
        if let Some(s) = self.sink.take() {
            s.stop();
        }
        self.path = None;
        self.paused = true;
        self.base = Duration::ZERO;
        if let Ok(mut info) = self.playback_info.lock() {
            info.path = None;
            info.elapsed = Duration::ZERO;
            info.duration = None;
            info.playing = false;
            info.finished = false;
        }
    }

    /// Rebuild the current sink starting at `target`.
    fn seek(&mut self, target: Duration) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let duration = self.playback_info.lock().ok().and_then(|i| i.duration);
        let target = duration.map_or(target, |d| target.min(d));

        let (new_sink, _) = match create_sink_at(&self.stream, &path, target) {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "seek failed");
                self.publish_error(err.to_string());
                return;
            }
        };

        if let Some(s) = self.sink.as_ref() {
            s.stop();
        }
        new_sink.set_volume(self.volume);
        if !self.paused {
            new_sink.play();
        }
        self.sink = Some(new_sink);
        self.base = target;
        if let Ok(mut info) = self.playback_info.lock() {
            info.elapsed = target;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        if let Some(s) = self.sink.as_ref() {
            s.set_volume(self.volume);
        }
    }

    fn fade_out(&self, fade_out_ms: u64) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        if fade_out_ms == 0 || self.paused {
            sink.set_volume(0.0);
            return;
        }
        let steps: u64 = 20;
        let step_ms = (fade_out_ms / steps).max(1);
        for step in 1..=steps {
            let t = step as f32 / steps as f32;
            sink.set_volume(self.volume * (1.0 - t));
            thread::sleep(Duration::from_millis(step_ms));
        }
        sink.set_volume(0.0);
    }

    /// Publish the position and flag the end of the source.
    fn tick(&mut self) {
        let Some(s) = self.sink.as_ref() else {
            return;
        };
        let ended = !self.paused && s.empty();
        let elapsed = self.elapsed();
        if let Ok(mut info) = self.playback_info.lock() {
            info.elapsed = elapsed;
            if ended {
                info.playing = false;
                info.finished = true;
            }
        }
        if ended {
            self.paused = true;
            self.sink = None;
        }
    }
}

pub(super) fn spawn_audio_thread(
    rx: Receiver<AudioCmd>,
    playback_info: PlaybackHandle,
    audio_settings: AudioSettings,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "no audio output device");
                if let Ok(mut info) = playback_info.lock() {
                    info.error = Some(format!("no audio output device: {err}"));
                }
                drain_until_quit(&rx);
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);

        let mut deck = Deck {
            stream,
            sink: None,
            path: None,
            paused: true,
            base: Duration::ZERO,
            volume: clamp_volume(audio_settings.volume),
            playback_info,
            settings: audio_settings,
        };

        loop {
            match rx.recv_timeout(TICK) {
                Ok(cmd) => match cmd {
                    AudioCmd::Load(path) => deck.load(path),
                    AudioCmd::Play => deck.set_paused(false),
                    AudioCmd::Pause => deck.set_paused(true),
                    AudioCmd::Stop => deck.stop(),
                    AudioCmd::SeekTo(target) => deck.seek(target),
                    AudioCmd::SeekBy(secs) => {
                        let cur = deck.elapsed().as_secs() as i64;
                        let new = (cur + secs).max(0) as u64;
                        deck.seek(Duration::from_secs(new));
                    }
                    AudioCmd::SetVolume(v) => deck.set_volume(v),
                    AudioCmd::Quit { fade_out_ms } => {
                        deck.fade_out(fade_out_ms);
                        deck.stop();
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => deck.tick(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}

/// Without an output device there is nothing to play; keep the channel
/// alive so senders do not error, until asked to quit.
fn drain_until_quit(rx: &Receiver<AudioCmd>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCmd::Quit { .. } => break,
            AudioCmd::Load(path) => debug!(path = %path.display(), "ignored: no device"),
            _ => {}
        }
    }
}
