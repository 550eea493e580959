//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over `[logging] level`; an unparsable level falls back to
//! `info`. With `[logging] file` set, output is appended to that file
//! without ANSI colors instead of going to stderr.

use super::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

const FALLBACK_LEVEL: &str = "info";

/// Filter from an optional `RUST_LOG` value and the configured level.
fn build_filter(env_directives: Option<&str>, configured_level: &str) -> EnvFilter {
    env_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(configured_level).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_LEVEL))
}

pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = build_filter(env_directives.as_deref(), &config.level);

    let result = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| format!("Failed to create log directory: {}", e))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {}", path.display(), e))?;

            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    result.map_err(|e| format!("Failed to initialize logging: {}", e).into())
}
