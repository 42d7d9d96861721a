//! Logging configuration for db-ask.
//!
//! Logs go to stderr by default so stdout stays clean for answers and JSON
//! envelopes. `--log-file` redirects them to a file instead.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Builds the filter from `RUST_LOG`, falling back to crate-level `info`
/// (`debug` when verbose).
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "db_ask=debug,ask=debug,info"
        } else {
            "warn,db_ask=info"
        })
    })
}

/// Initializes logging to stderr.
pub fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Initializes logging to the file at `path`.
///
/// The file is truncated on each run. Falls back to stderr logging if the
/// file cannot be created.
pub fn init_file_logging(path: &Path, verbose: bool) {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            init_stderr_logging(verbose);
            return;
        }
    }

    let log_file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {}: {e}", path.display());
            init_stderr_logging(verbose);
            return;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(log_file)
        .with_ansi(false)
        .init();
}

/// Returns the default log file location.
///
/// Uses the platform state directory (`~/.local/state/db-ask/db-ask.log` on
/// Linux), then the config directory, then the temp directory.
pub fn default_log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("db-ask").join("db-ask.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("db-ask").join("db-ask.log");
    }

    std::env::temp_dir().join("db-ask.log")
}
