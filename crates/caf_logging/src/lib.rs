#![deny(missing_docs)]
//! Shared logging utilities for the ChangeAnyFile client workspace.
//!
//! This crate provides the `caf_*` logging macros used by the engine and the
//! command-line app, plus a minimal test initializer for the global logger.
//! All macros forward to the `log` facade, so whichever logger the binary
//! installs (see `caf_app::logging`) receives the records.

use std::sync::Once;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! caf_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! caf_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! caf_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! caf_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! caf_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

static TEST_LOGGER: Once = Once::new();

/// Initializes a terminal logger for use in tests.
///
/// Safe to call from every test: only the first call installs a logger, and
/// a logger installed by someone else is left in place.
pub fn initialize_for_tests() {
    TEST_LOGGER.call_once(|| {
        use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

        // Debug builds get the request-level chatter, release builds do not.
        let level = if cfg!(debug_assertions) {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };

        let _ = CombinedLogger::init(vec![TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )]);
    });
}
