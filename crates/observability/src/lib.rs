//! Process-wide tracing setup for the print daemon and tools.

/// Subscriber installation (filters, output format).
pub mod tracing;

pub use self::tracing::{DEFAULT_DIRECTIVE, LogFormat, UnknownLogFormat, init_with};

/// JSON logs filtered by `RUST_LOG` (default `info`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    init_with(LogFormat::Json);
}

/// Human-readable logs for interactive runs.
pub fn init_pretty() {
    init_with(LogFormat::Pretty);
}
