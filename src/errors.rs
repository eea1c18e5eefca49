use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all operations in the `fnr` application.
///
/// Only configuration problems and controller misuse ever reach a caller.
/// Per-file failures (`Read`, `Write`) are folded into the file's
/// `FileOutcome` by the engines and the run carries on.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to file system I/O.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The find text is not a valid regular expression.
    #[error("Pattern compilation failed: {0}")]
    Regex(#[from] regex::Error),

    /// The file mask is not a valid wildcard pattern.
    #[error("Invalid file mask: {0}")]
    Glob(#[from] globset::Error),

    /// An error that occurred while parsing a YAML profile.
    #[error("Config parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A general configuration-related error.
    #[error("Config error: {0}")]
    Config(String),

    /// The root directory does not exist or is not a directory.
    #[error("Invalid root directory: {}", path.display())]
    InvalidRoot { path: PathBuf },

    /// A run was started while another one is still active.
    #[error("A run is already in progress")]
    AlreadyRunning,

    /// A single file could not be read as text.
    #[error("{reason}")]
    Read { reason: String },

    /// A single file could not be rewritten.
    #[error("{reason}")]
    Write { reason: String },

    /// An error related to CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An error related to JSON serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for errors that reject a run before any file is touched.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Regex(_)
                | Error::Glob(_)
                | Error::InvalidRoot { .. }
                | Error::Yaml(_)
        )
    }

    pub(crate) fn read(err: impl std::fmt::Display) -> Self {
        Error::Read {
            reason: err.to_string(),
        }
    }

    pub(crate) fn write(err: impl std::fmt::Display) -> Self {
        Error::Write {
            reason: err.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, fnr::errors::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Config(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Config(s.to_string())
    }
}
