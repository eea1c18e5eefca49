use crate::config::{ConfigLoader, RunConfig, RunProfile};
use crate::controller::RunMode;
use crate::errors::{Error, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Bulk find and replace across a directory tree.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find and replace text in many files at once",
    long_about = "fnr - find (and optionally replace) literal text or regular expressions in
every file under a directory whose name matches a wildcard mask.

QUICK EXAMPLES:
  fnr find -d . -m '*.txt' -f 'TODO'                  # List files containing TODO
  fnr find -d src -m '*.rs;*.toml' -s -f 'v[0-9]+' --regex --preview
  fnr replace -d . -m '*.cs' -s -f 'Foo' -r 'Bar'     # Replace in all subdirectories
  fnr replace -c rename-version.yaml                   # Use a saved profile

Use \\n for a newline and \\\" for a quote inside --find/--replace."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// The set of available commands for the `fnr` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search files without modifying them
    Find {
        #[command(flatten)]
        search: SearchArgs,

        /// Show the lines surrounding each match.
        #[arg(long)]
        preview: bool,
    },

    /// Search files and rewrite every match with the replacement text
    Replace {
        #[command(flatten)]
        search: SearchArgs,

        /// The replacement text. Regex mode expands `$1`, `${name}`.
        #[arg(short, long)]
        replace: Option<String>,
    },
}

/// Options shared by both commands.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Path to a YAML profile providing defaults for the options below.
    #[arg(short, long, env = "FNR_CONFIG")]
    pub config: Option<PathBuf>,

    /// The directory to search.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Wildcard mask for file names, `;`-separated (default `*`).
    #[arg(short, long)]
    pub mask: Option<String>,

    /// The text to find.
    #[arg(short, long)]
    pub find: Option<String>,

    /// Include files in subdirectories.
    #[arg(short = 's', long = "include-subdirectories")]
    pub include_subdirectories: bool,

    /// Match case exactly.
    #[arg(long)]
    pub case_sensitive: bool,

    /// Treat the find text as a regular expression.
    #[arg(long)]
    pub regex: bool,

    /// The output format (`text`, `json`, `csv`).
    #[arg(long = "format", default_value = "text")]
    pub format: String,

    /// Log progress details to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SearchArgs {
    /// Merges flags with the optional profile into a `RunConfig`.
    ///
    /// Flags win over profile values; boolean flags can only switch an option
    /// on. Escapes in the find and replace texts are decoded here.
    pub fn to_run_config(&self, replace: Option<&str>, mode: RunMode) -> Result<RunConfig> {
        let profile = match &self.config {
            Some(path) => ConfigLoader::resolve_profile(path)?,
            None => RunProfile::default(),
        };

        let dir = self
            .dir
            .clone()
            .or(profile.dir)
            .ok_or_else(|| Error::Config("--dir is required".to_string()))?;
        let find = self
            .find
            .as_deref()
            .or(profile.find.as_deref())
            .ok_or_else(|| Error::Config("--find is required".to_string()))?;
        let mask = self
            .mask
            .clone()
            .or(profile.file_mask)
            .unwrap_or_else(|| "*".to_string());

        let include_subdirectories =
            self.include_subdirectories || profile.include_subdirectories.unwrap_or(false);
        let mut config = RunConfig::new(dir, mask, decode_escapes(find))
            .with_subdirectories(include_subdirectories)
            .with_case_sensitive(self.case_sensitive || profile.case_sensitive.unwrap_or(false))
            .with_regex(self.regex || profile.regex.unwrap_or(false));

        if mode == RunMode::Replace {
            let replace = replace
                .or(profile.replace.as_deref())
                .ok_or_else(|| Error::Config("--replace is required".to_string()))?;
            config = config.with_replace_text(decode_escapes(replace));
        }

        Ok(config)
    }
}

/// Decodes the command-line escapes `\n`, `\r`, `\t`, `\"` and `\\`.
///
/// Any other backslash sequence is kept as typed so regex escapes such as
/// `\d` pass through untouched.
pub fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Parses command-line arguments and returns the populated `Args` struct.
pub fn parse_args() -> Args {
    Args::parse()
}
