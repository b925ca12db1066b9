mod cli;
mod logging;
mod progress;
mod reports;

use std::fs;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use engine_logging::{engine_info, engine_warn};
use grabber_core::parse_work_items;

use cli::Args;
use logging::LogDestination;
use progress::ProgressReporter;

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let destination = match &args.log_file {
        Some(path) => LogDestination::TerminalAndFile(path.clone()),
        None => LogDestination::Terminal,
    };
    logging::initialize(destination, logging::level_from_flags(args.quiet, args.verbose))?;

    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("reading input {:?}", args.input))?;
    let items = parse_work_items(&raw, !args.no_header);
    engine_info!("Loaded {} work items from {:?}", items.len(), args.input);
    if items.is_empty() {
        engine_warn!("No usable rows in {:?}", args.input);
    }

    let config = args.engine_config();
    let reporter = ProgressReporter::new(items.len(), !args.no_progress && !args.quiet);
    let report = grabber_engine::run(&items, &config, &reporter)
        .with_context(|| format!("could not start run into {:?}", config.output_dir))?;
    reporter.finish();

    let summary = report.summary;
    println!(
        "Done. Saved: {}, skipped: {}, failed: {}",
        summary.saved, summary.skipped, summary.failed
    );

    if let Some(path) = &args.summary_json {
        let finished_utc = Utc::now().to_rfc3339();
        let json = reports::summary_json(summary, &config.output_dir, &finished_utc)?;
        reports::write_report_file(path, &json)?;
        engine_info!("Summary written to {:?}", path);
    }
    if let Some(path) = &args.failed_csv {
        reports::write_report_file(path, &reports::failed_csv(&report.failures))?;
        engine_info!("{} failed rows written to {:?}", report.failures.len(), path);
    }

    if args.strict && summary.failed > 0 {
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}
