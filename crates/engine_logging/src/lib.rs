#![deny(missing_docs)]
//! Shared logging utilities for the grabber workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Messages logged from a
//! pool worker carry that worker's tag (`[w3] ...`) so interleaved lines from
//! concurrent downloads can be told apart.

use std::cell::Cell;

thread_local! {
    /// Thread-local id of the pool worker running on this thread, if any.
    static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Marks the current thread as pool worker `id`.
/// Called once by the orchestrator when a worker thread starts.
pub fn set_worker_id(id: usize) {
    WORKER_ID.with(|v| v.set(Some(id)));
}

/// Clears the worker id of the current thread.
pub fn clear_worker_id() {
    WORKER_ID.with(|v| v.set(None));
}

/// Returns the worker id of the current thread, or `None` off the pool.
pub fn worker_id() -> Option<usize> {
    WORKER_ID.with(|v| v.get())
}

/// Returns the log prefix for the current thread: `"[w3] "` on worker 3,
/// empty elsewhere.
pub fn worker_tag() -> String {
    match worker_id() {
        Some(id) => format!("[w{id}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::worker_tag(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::worker_tag(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::worker_tag(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::worker_tag(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::worker_tag(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}
