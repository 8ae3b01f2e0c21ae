//! Logging setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binary.

/// Environment variable holding the log filter, e.g. `mytodo=debug`.
pub const LOG_ENV_VAR: &str = "MYTODO_LOG";

/// Filter used when [`LOG_ENV_VAR`] is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Filter used when verbose output is requested.
pub const VERBOSE_FILTER: &str = "warn,mytodo=debug";

/// Pick the filter directive: an explicit value wins, then verbosity.
#[must_use]
pub fn filter_directive(explicit: Option<&str>, verbose: bool) -> String {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => VERBOSE_FILTER.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this more than once is harmless; later calls are ignored.
#[cfg(feature = "cli")]
pub fn init(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let explicit = std::env::var(LOG_ENV_VAR).ok();
    let directive = filter_directive(explicit.as_deref(), verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid {LOG_ENV_VAR} value {directive:?}: {e}");
        EnvFilter::new(DEFAULT_FILTER)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
