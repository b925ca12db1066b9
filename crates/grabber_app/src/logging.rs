//! Logger initialization for the command-line tool.
//!
//! Terminal output goes to stderr so it never mixes with the summary on
//! stdout; an optional log file receives the same lines at debug level or
//! above.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Destination for log output.
pub enum LogDestination {
    /// Write to the terminal (stderr).
    Terminal,
    /// Write to the terminal and to a file.
    TerminalAndFile(PathBuf),
}

/// Map `-q` / `-v` counts onto a level. Warnings (per-item failures) are shown
/// by default.
pub fn level_from_flags(quiet: bool, verbose: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Initialize the global logger.
pub fn initialize(destination: LogDestination, level: LevelFilter) -> anyhow::Result<()> {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let LogDestination::TerminalAndFile(path) = destination {
        loggers.push(create_file_logger(&path, level.max(LevelFilter::Debug), config)?);
    }

    CombinedLogger::init(loggers).context("logger already initialized")?;
    Ok(())
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .set_thread_level(LevelFilter::Off)
        // Only our own crates; hyper, reqwest and rustls are filtered out.
        .add_filter_allow_str("grabber_")
        .add_filter_allow_str(env!("CARGO_CRATE_NAME"))
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> anyhow::Result<Box<WriteLogger<File>>> {
    let file =
        File::create(path).with_context(|| format!("could not create log file {path:?}"))?;
    Ok(WriteLogger::new(level, config, file))
}
