//! Logging initialization for pmlogd-daemon.
//!
//! Configures `tracing-subscriber` from the CLI overrides. Supports
//! JSON structured logging and human-readable pretty format.
//!
//! The daemon's own diagnostics go through `tracing`; they are
//! independent of the syslog streams the daemon routes to disk.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
///
/// # Arguments
///
/// * `log_level` - Filter directive used when `RUST_LOG` is not set
/// * `log_format` - `"json"` for machine-parseable lines, `"pretty"`
///   for human-readable colored output
pub fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                log_format
            ));
        }
    }

    Ok(())
}
