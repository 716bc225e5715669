//! Logging and tracing utilities.
//!
//! All logs are written to **stderr** so stdout stays free for whatever the
//! host expects there.
//!
//! # Quick Start
//!
//! ```ignore
//! use aidbox_provider::init_logging;
//!
//! fn main() {
//!     // Reads RUST_LOG, defaults to info
//!     init_logging();
//!     tracing::info!("Starting provider");
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls log levels (e.g., `info`, `debug`, `aidbox_provider=debug`)
//!
//! # Examples
//!
//! ```bash
//! # Show debug logs for the provider only, including raw RPC failures
//! RUST_LOG=aidbox_provider=debug ./my-host
//!
//! # Trace the HTTP transport as well
//! RUST_LOG=aidbox_provider=debug,reqwest=trace ./my-host
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the default logging subscriber.
///
/// Writes compact, human-readable lines to stderr, filtered by `RUST_LOG`,
/// defaulting to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging with a custom default level.
///
/// Like [`init_logging`], but `default_level` is used if `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
///
/// # Example
///
/// ```ignore
/// use aidbox_provider::init_logging_with_default;
///
/// fn main() {
///     init_logging_with_default("aidbox_provider=debug");
/// }
/// ```
pub fn init_logging_with_default(default_level: &str) {
    if let Err(e) = install(default_level) {
        panic!("failed to initialize logging: {}", e);
    }
}

/// Try to initialize logging, returning false if already initialized.
///
/// Unlike [`init_logging`], this function does not panic if a subscriber
/// has already been set, which makes it safe to call from tests.
pub fn try_init_logging() -> bool {
    install("info").is_ok()
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn install(default_level: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so only the
    // second call is asserted.

    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("aidbox_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,aidbox_provider=debug,reqwest=trace").is_ok());
    }

    #[test]
    fn test_second_init_is_rejected() {
        let _ = try_init_logging();
        assert!(!try_init_logging());
    }
}
