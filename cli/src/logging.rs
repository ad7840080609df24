//! Tracing setup for the command line tool
//!
//! Logs go to the lensfolio log file (see [`PathManager::log_file_path`]);
//! `--verbose` mirrors them to stderr as well.

use config::PathManager;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,lensfolio_core=debug";

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered lines reach the file.
pub fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fn stderr_layer<S>(verbose: bool) -> Option<impl tracing_subscriber::Layer<S>>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        verbose.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_target(true)
        })
    }

    let Some(path) = PathManager::log_file_path() else {
        let _ = tracing_subscriber::registry().with(filter).with(stderr_layer(verbose)).try_init();
        return None;
    };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("[lensfolio] Failed to create log directory {:?}: {}", parent, e);
        }
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let file_layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(stderr_layer(verbose))
                .try_init();
            tracing::debug!("Logging initialized, writing to {:?}", path);
            Some(guard)
        }
        Err(e) => {
            eprintln!("[lensfolio] Failed to open log file {:?}: {}", path, e);
            let _ = tracing_subscriber::registry().with(filter).with(stderr_layer(verbose)).try_init();
            None
        }
    }
}
