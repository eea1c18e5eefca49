//! The main entry point for the `fnr` command-line application.
//!
//! Parses arguments, starts a run on the background controller and renders
//! its events on the main thread.

use fnr::cli::{self, Commands};
use fnr::controller::{RunController, RunMode};
use fnr::errors::Result;
use fnr::logging;
use fnr::output_formatter::{self, OutputFormat, OutputFormatter};
use fnr::scanner::RunState;
use fnr::stats::Stats;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::process;

const EXIT_FILE_ERRORS: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_CANCELLED: i32 = 130;

fn main() {
    let args = cli::parse_args();

    let code = match run(args.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            if err.is_config_error() {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FILE_ERRORS
            }
        }
    };

    process::exit(code);
}

fn run(command: Commands) -> Result<i32> {
    let (search, mode, replace, show_preview) = match command {
        Commands::Find { search, preview } => (search, RunMode::Find, None, preview),
        Commands::Replace { search, replace } => (search, RunMode::Replace, replace, false),
    };

    logging::init(search.verbose);

    let config = search.to_run_config(replace.as_deref(), mode)?;
    let format = OutputFormat::from(search.format.as_str());
    let formatter = OutputFormatter::new(format, mode);

    let mut controller = RunController::new();
    let events = controller.start(config, mode)?;

    let token = controller.cancel_token();
    if let Err(err) = ctrlc::set_handler(move || token.cancel()) {
        tracing::warn!(error = %err, "could not install Ctrl-C handler");
    }

    let progress = if format == OutputFormat::Text {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    formatter.write_header(&mut out)?;

    let mut last_stats = Stats::default();
    for event in events {
        progress.set_length(event.stats.total_files as u64);
        progress.set_position(event.stats.processed_files as u64);
        last_stats = event.stats;

        let Some(outcome) = event.outcome else {
            continue;
        };
        progress.set_message(outcome.relative_path.clone());

        if output_formatter::should_display(&outcome) {
            let preview = show_preview.then(|| output_formatter::preview_for(&outcome)).flatten();
            progress.suspend(|| formatter.write_outcome(&mut out, &outcome, preview.as_deref()))?;
        }
    }
    progress.finish_and_clear();

    let state = controller.join();
    if state == RunState::Cancelled {
        eprintln!(
            "Cancelled after {} of {} files",
            last_stats.processed_files, last_stats.total_files
        );
    } else if last_stats.total_files == 0 {
        eprintln!("No files found matching the mask");
    }

    formatter.write_summary(&mut out, &last_stats)?;
    out.flush()?;

    Ok(if state == RunState::Cancelled {
        EXIT_CANCELLED
    } else if last_stats.failed_to_open > 0 || last_stats.failed_to_write > 0 {
        EXIT_FILE_ERRORS
    } else {
        0
    })
}
