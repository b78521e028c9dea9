//! Logger setup for the `changeanyfile` binary.
//!
//! Terminal output goes to stderr so progress lines on stdout stay clean.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[derive(Debug, Clone)]
pub enum LogDestination {
    Terminal,
    /// Terminal plus a log file, which always records at debug level.
    Both(PathBuf),
}

pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let LogDestination::Both(path) = destination {
        if let Some(file_logger) = create_file_logger(&path, config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(path: &Path, config: Config) -> Option<Box<WriteLogger<File>>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(LevelFilter::Debug, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", path, err);
            None
        }
    }
}
