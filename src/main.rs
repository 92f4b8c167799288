//! CLI entry point for the manga downloader.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mdownloader_core::{
    ApiClient, DownloadOptions, HttpClient, RetryPolicy, Runner, UnitKind, collect_ids,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let options = DownloadOptions {
        compare_mode: args.check_images,
        archive_format: args.save_format,
        keep_loose_folder: args.keep_folder,
        language: args.language.clone(),
        output_dir: args.directory.clone(),
        chapter_delay: Duration::from_secs(args.chapter_delay),
        title_delay: Duration::from_secs(args.title_delay),
    };
    options.validate()?;

    let ids = collect_ids(&args.ids)?;
    if ids.is_empty() {
        info!("No IDs found in input");
        return Ok(ExitCode::SUCCESS);
    }
    let kind = UnitKind::from(args.kind);
    if kind == UnitKind::Chapter && args.range.is_some() {
        warn!("--range only applies to titles, ignoring it");
    }

    let api = ApiClient::new(HttpClient::new(), &args.api_url)
        .with_context(|| format!("invalid API URL {}", args.api_url))?;

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} pages")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    info!(
        units = ids.len(),
        mode = %options.compare_mode,
        format = %options.archive_format,
        "mdownloader starting"
    );
    let runner =
        Runner::new(api, options, RetryPolicy::default()).with_progress(progress.clone());
    let summary = runner.run_all(kind, &ids, args.range.as_ref()).await;
    progress.finish_and_clear();

    info!(
        complete = summary.complete,
        partial = summary.partial,
        skipped = summary.skipped,
        failed = summary.failed,
        already_done = summary.already_done,
        units_failed = summary.units_failed,
        "Download complete"
    );

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
