use crate::app::App;
use crate::mpris::MprisHandle;

pub fn update_mpris(mpris: &MprisHandle, app: &App) {
    let info = app.playback_info().unwrap_or_default();
    let length = info.duration;
    mpris.set_position(info.elapsed);
    mpris.set_track_metadata(
        app.playlist.current_index(),
        app.now_playing.as_ref(),
        length,
    );
    mpris.set_playback(app.playback);
}
