//! Log setup. The terminal belongs to the UI, so records go to a file.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Environment variable holding a filter directive; wins over `log.level`.
pub const LOG_ENV: &str = "TUNEFOLD_LOG";

/// Audio parsing crates are chatty at info level.
const QUIET_DEPS: &str = "symphonia=error,lofty=error,zbus=warn";

fn filter_for(env_override: Option<&str>, level: &str) -> EnvFilter {
    env_override
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .or_else(|| EnvFilter::try_new(format!("{level},{QUIET_DEPS}")).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("info,{QUIET_DEPS}")))
}

/// Install the global subscriber. Returns the log path in use, or `None` when
/// logging stays disabled (no writable location). Never fails the caller.
pub fn init(settings: &Settings) -> Option<std::path::PathBuf> {
    let path = settings.log_file()?;
    let file = open_log(&path).ok()?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(filter_for(
            std::env::var(LOG_ENV).ok().as_deref(),
            &settings.log.level,
        ))
        .try_init()
        .ok()?;
    Some(path)
}

fn open_log(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
