use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "scraper.log";
const DEFAULT_FILTER: &str = "grocery_scraper=info,warn";

/// Human-readable events on stderr plus JSON lines in `logs/scraper.log.<date>`.
///
/// `RUST_LOG` replaces the default filter. Stdout stays free for `fetch`.
pub fn init_logging() {
    if let Err(e) = fs::create_dir_all(LOG_DIR) {
        eprintln!("Cannot create {LOG_DIR}/: {e}");
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(LOG_DIR, LOG_FILE));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    // Dropping the guard stops the writer thread
    std::mem::forget(guard);
}
