use std::path::PathBuf;

use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_PREFIX: &str = "plex-watch";
const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub directory: PathBuf,
    pub max_files: usize,
}

impl LogSettings {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            max_files: 14,
        }
    }
}

/// Build the file logger. The returned guard must be held until exit so
/// buffered lines are flushed; the dispatch is installed by the caller.
pub fn build(settings: &LogSettings) -> anyhow::Result<(Dispatch, WorkerGuard)> {
    std::fs::create_dir_all(&settings.directory)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(settings.max_files)
        .build(&settings.directory)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .finish();

    Ok((Dispatch::new(subscriber), guard))
}
