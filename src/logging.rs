// src/logging.rs
use std::fs::{File, OpenOptions};
use std::io;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_PATH: &str = "apartment_tracker.log";

/// Opens `path` for appending. An empty path turns file logging off.
pub fn open_log_file(path: &str) -> io::Result<Option<Mutex<File>>> {
    if path.trim().is_empty() {
        return Ok(None);
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Some(Mutex::new(file)))
}

/// Stdout, plus a plain-text copy of every event in `log_file` when given.
pub fn subscriber(
    filter: EnvFilter,
    log_file: Option<Mutex<File>>,
) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(log_file.map(|file| fmt::layer().with_ansi(false).with_writer(file)))
}

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init(log_path: &str) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = subscriber(filter, open_log_file(log_path)?).try_init();
    Ok(())
}
