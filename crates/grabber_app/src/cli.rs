//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use grabber_engine::{EngineConfig, FetchSettings, NormalizeSettings, RetryPolicy};

/// Download labelled images from a CSV list and store them as uniform JPEGs.
///
/// Every row of the input (`url,label`) becomes `<output>/<slug>_<n>.jpg`.
/// Files that already exist are skipped, so interrupted runs can be repeated.
#[derive(Parser, Debug)]
#[command(name = "image_grabber")]
#[command(author, version, about)]
pub struct Args {
    /// CSV file with `url,label` rows
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Directory the images are written to (created if missing)
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Number of parallel workers
    #[arg(long, default_value_t = grabber_engine::DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Treat the first CSV row as data instead of a header
    #[arg(long)]
    pub no_header: bool,

    /// Extensions tried after the url itself, in order
    #[arg(long, value_delimiter = ',', default_value = "jpeg,jpg,png,webp")]
    pub extensions: Vec<String>,

    /// JPEG quality of the written files (1-100)
    #[arg(long, default_value_t = 95, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout_secs: u64,

    /// Retries per url on transient failures (0-10)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: u32,

    /// User-Agent header sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Referer header sent with every request
    #[arg(long)]
    pub referer: Option<String>,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Write failed rows (`url,label,stage,reason`) to this CSV for a later retry
    #[arg(long)]
    pub failed_csv: Option<PathBuf>,

    /// Also write log lines to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Do not draw a progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Exit with status 2 when any item failed
    #[arg(long)]
    pub strict: bool,
}

fn parse_workers(raw: &str) -> Result<usize, String> {
    let workers: usize = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a positive integer"))?;
    if workers == 0 {
        return Err("at least one worker is required".to_string());
    }
    Ok(workers)
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        let mut fetch = FetchSettings {
            request_timeout: Duration::from_secs(self.timeout_secs),
            referer: self.referer.clone(),
            extensions: self
                .extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            retry: RetryPolicy {
                max_attempts: self.retries + 1,
                ..RetryPolicy::default()
            },
            ..FetchSettings::default()
        };
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }

        EngineConfig {
            output_dir: self.output.clone(),
            workers: self.workers,
            fetch,
            normalize: NormalizeSettings {
                quality: self.quality,
                ..NormalizeSettings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["image_grabber", "-i", "in.csv", "-o", "out"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.workers, 16);
        assert_eq!(args.quality, 95);
        assert_eq!(args.extensions, vec!["jpeg", "jpg", "png", "webp"]);
        assert!(!args.no_header);
        assert!(!args.strict);
    }

    #[test]
    fn input_and_output_are_required() {
        let err = Args::try_parse_from(["image_grabber", "-i", "in.csv"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(parse(&["--workers", "0"]).is_err());
        assert_eq!(parse(&["--workers", "4"]).unwrap().workers, 4);
    }

    #[test]
    fn quality_is_range_checked() {
        assert!(parse(&["--quality", "0"]).is_err());
        assert!(parse(&["--quality", "101"]).is_err());
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(parse(&["-q", "-v"]).is_err());
    }

    #[test]
    fn engine_config_reflects_flags() {
        let args = parse(&[
            "--workers",
            "3",
            "--extensions",
            ".PNG, webp",
            "--retries",
            "0",
            "--user-agent",
            "ua/1",
            "--referer",
            "https://ref.example/",
        ])
        .unwrap();
        let config = args.engine_config();
        assert_eq!(config.workers, 3);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.fetch.extensions, vec!["png", "webp"]);
        assert_eq!(config.fetch.retry.max_attempts, 1);
        assert_eq!(config.fetch.user_agent, "ua/1");
        assert_eq!(config.fetch.referer.as_deref(), Some("https://ref.example/"));
        assert_eq!(config.normalize.quality, 95);
    }
}
