use std::path::PathBuf;
use std::time::Duration;

use caf_engine::{EngineConfig, ServiceConfig, BASE_URL_ENV, DEFAULT_BASE_URL};
use clap::Parser;
use log::LevelFilter;

use crate::logging::LogDestination;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "changeanyfile",
    version,
    about = "Upload a file, have the service process it, and fetch the result"
)]
pub struct Cli {
    /// File to upload
    pub file: PathBuf,

    /// Instruction for the service (defaults to a generic conversion)
    #[arg(long, short)]
    pub prompt: Option<String>,

    /// Base URL of the processing service
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Delay between job status requests
    #[arg(
        long,
        default_value_t = 1500,
        value_parser = clap::value_parser!(u64).range(10..)
    )]
    pub poll_interval_ms: u64,

    /// Directory the processed file is saved into
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,

    /// Stop once the job completes; print the download URL instead of saving
    #[arg(long)]
    pub no_download: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log engine activity to stderr
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            service: ServiceConfig {
                base_url: self.base_url.clone(),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                ..ServiceConfig::default()
            },
            output_dir: self.output.clone(),
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_local_service() {
        let cli = Cli::try_parse_from(["changeanyfile", "photo.png"]).unwrap();
        let config = cli.engine_config();
        assert_eq!(config.service.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(cli.prompt.is_none());
        assert!(!cli.no_download);
        assert_eq!(cli.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn flags_are_applied() {
        let cli = Cli::try_parse_from([
            "changeanyfile",
            "scan.pdf",
            "--prompt",
            "OCR this",
            "--base-url",
            "http://files.local:9000",
            "--poll-interval-ms",
            "250",
            "--output",
            "out",
            "--no-download",
            "--log-file",
            "caf.log",
            "-v",
        ])
        .unwrap();
        let config = cli.engine_config();
        assert_eq!(config.service.base_url, "http://files.local:9000");
        assert_eq!(config.service.poll_interval, Duration::from_millis(250));
        assert_eq!(cli.prompt.as_deref(), Some("OCR this"));
        assert!(cli.no_download);
        assert!(matches!(cli.log_destination(), LogDestination::Both(_)));
        assert_eq!(cli.log_level(), LevelFilter::Debug);
    }

    #[test]
    fn tiny_poll_interval_is_rejected() {
        let result =
            Cli::try_parse_from(["changeanyfile", "a.txt", "--poll-interval-ms", "0"]);
        assert!(result.is_err());
    }
}
