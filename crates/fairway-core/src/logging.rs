#![forbid(unsafe_code)]

//! Logging setup.
//!
//! With the `tracing` feature the usual macros are re-exported so dependents
//! can log through `fairway_core::logging`. With `tracing-json`, [`init`]
//! installs a JSON subscriber on stderr honouring `RUST_LOG`, falling back to
//! the given directive.

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// The global subscriber could not be installed.
#[cfg(feature = "tracing-json")]
#[derive(Debug)]
pub struct LoggingInitError(String);

#[cfg(feature = "tracing-json")]
impl std::fmt::Display for LoggingInitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to install tracing subscriber: {}", self.0)
    }
}

#[cfg(feature = "tracing-json")]
impl std::error::Error for LoggingInitError {}

/// Install a JSON subscriber writing to stderr.
///
/// `default_directive` (e.g. `"fairway=info"`) applies when `RUST_LOG` is
/// unset or invalid. Fails if a global subscriber is already set.
#[cfg(feature = "tracing-json")]
pub fn init(default_directive: &str) -> Result<(), LoggingInitError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .with_current_span(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| LoggingInitError(e.to_string()))
}
