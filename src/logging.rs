//! Logging setup for the provider binary.
//!
//! All logs go to **stderr**: stdout carries the handshake line the host
//! reads to find the gRPC address.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `onos_provider=debug`)
//!
//! ```bash
//! # Trace every ONOS request
//! RUST_LOG=onos_provider::client=debug ./provider-onos
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// Returns `false` if a global subscriber was already installed, which is
/// harmless when the provider is embedded in a test process.
pub fn init_logging() -> bool {
    try_init_logging_with_default(DEFAULT_LOG_LEVEL)
}

/// Like [`init_logging`] with a caller-chosen default level.
pub fn try_init_logging_with_default(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_LEVEL).is_ok());
        assert!(EnvFilter::try_new("onos_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,onos_provider::client=trace").is_ok());
    }

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_logging();
        assert!(!try_init_logging_with_default("debug"));
    }
}
