//! `fnr` is a library for bulk find-and-replace across a directory tree.
//!
//! It provides the core logic for the `fnr` command-line tool but can also be
//! embedded behind any other front end. The main components are:
//!
//! - `Scanner`: read-only engine that reports the matches in every file.
//! - `Replacer`: reuses the scanner's matching and rewrites each file that
//!   had matches, atomically.
//! - `RunController`: runs either engine on a background thread and hands
//!   the per-file `RunEvent`s back to the caller in order.
//! - `preview`: builds the context-line preview shown for a file's matches.
//! - `config`: the validated `RunConfig` and YAML run profiles.
//!
//! Failures on individual files never abort a run. They are reported on the
//! file's `FileOutcome` and counted in the run's `Stats`.

pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod file_enumerator;
pub mod logging;
pub mod output_formatter;
pub mod patterns;
pub mod preview;
pub mod replacer;
pub mod scanner;
pub mod stats;

// Re-export main types for easier access by library users.
pub use config::RunConfig;
pub use controller::{EventReceiver, RunController, RunMode};
pub use errors::{Error, Result};
pub use output_formatter::{OutputFormat, OutputFormatter};
pub use patterns::{MatchSpan, PatternMatcher};
pub use preview::build_preview;
pub use replacer::Replacer;
pub use scanner::{CancelToken, FileOutcome, RunEvent, RunState, Scanner};
pub use stats::Stats;
