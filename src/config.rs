use crate::errors::{Error, Result};
use crate::file_enumerator::FileMask;
use crate::patterns::PatternMatcher;
use serde::Deserialize;
use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Everything an engine needs to know about one run.
///
/// Construct with `RunConfig::new` and the `with_*` setters, then call
/// `validate` (the controller does this before starting a worker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub root_dir: PathBuf,
    pub file_mask: String,
    pub include_subdirectories: bool,
    pub find_text: String,
    /// Only used by the replace engine.
    pub replace_text: Option<String>,
    pub is_case_sensitive: bool,
    pub find_text_is_regex: bool,
}

impl RunConfig {
    pub fn new(
        root_dir: impl Into<PathBuf>,
        file_mask: impl Into<String>,
        find_text: impl Into<String>,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            file_mask: file_mask.into(),
            include_subdirectories: false,
            find_text: find_text.into(),
            replace_text: None,
            is_case_sensitive: false,
            find_text_is_regex: false,
        }
    }

    pub fn with_subdirectories(mut self, include: bool) -> Self {
        self.include_subdirectories = include;
        self
    }

    pub fn with_replace_text(mut self, replace_text: impl Into<String>) -> Self {
        self.replace_text = Some(replace_text.into());
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.is_case_sensitive = case_sensitive;
        self
    }

    pub fn with_regex(mut self, is_regex: bool) -> Self {
        self.find_text_is_regex = is_regex;
        self
    }

    /// Checks the config and compiles its pattern and mask.
    ///
    /// Every failure here is a configuration error: the run must not start.
    pub fn validate(&self) -> Result<(PatternMatcher, FileMask)> {
        if self.find_text.is_empty() {
            return Err("Find text must not be empty".into());
        }
        if self.file_mask.trim().is_empty() {
            return Err("File mask must not be empty".into());
        }
        if !self.root_dir.is_dir() || fs::read_dir(&self.root_dir).is_err() {
            return Err(Error::InvalidRoot {
                path: self.root_dir.clone(),
            });
        }

        let matcher = PatternMatcher::new(
            &self.find_text,
            self.is_case_sensitive,
            self.find_text_is_regex,
        )?;
        let mask = FileMask::new(&self.file_mask)?;
        Ok((matcher, mask))
    }

    /// The replacement text, or a config error when none was given.
    pub fn require_replace_text(&self) -> Result<&str> {
        self.replace_text
            .as_deref()
            .ok_or_else(|| Error::Config("Replace text is required in replace mode".to_string()))
    }
}

/// A saved search loaded from YAML. Every field is optional so command-line
/// flags can fill in or override what the file leaves out.
///
/// ```yaml
/// dir: ./src
/// file_mask: "*.cs;*.resx"
/// include_subdirectories: true
/// find: 'Version="(\d+)"'
/// replace: 'Version="$1-beta"'
/// regex: true
/// ```
#[derive(Debug, Default, Deserialize, Clone)]
pub struct RunProfile {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub file_mask: Option<String>,
    #[serde(default)]
    pub include_subdirectories: Option<bool>,
    #[serde(default)]
    pub find: Option<String>,
    #[serde(default)]
    pub replace: Option<String>,
    #[serde(default)]
    pub case_sensitive: Option<bool>,
    #[serde(default)]
    pub regex: Option<bool>,
}

/// A utility for locating and loading run profiles.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Finds a profile by searching, in order: the path as given, the path
    /// relative to `working_dir`, and the `fnr` directory under the user's
    /// config directory.
    pub fn find_config(config_path: &Path, working_dir: &Path) -> Result<PathBuf> {
        if config_path.exists() {
            return Ok(config_path.to_path_buf());
        }

        let mut tried_locations = vec![config_path.display().to_string()];

        if config_path.is_relative() {
            let in_working_dir = working_dir.join(config_path);
            if in_working_dir.exists() {
                return Ok(in_working_dir);
            }
            tried_locations.push(in_working_dir.display().to_string());

            if let Some(config_dir) = dirs::config_dir() {
                let user_config = config_dir.join("fnr").join(config_path);
                if user_config.exists() {
                    return Ok(user_config);
                }
                tried_locations.push(user_config.display().to_string());
            }
        }

        Err(format!(
            "Config file '{}' not found. Searched in:\n  - {}",
            config_path.display(),
            tried_locations.join("\n  - ")
        )
        .into())
    }

    /// Loads a `RunProfile` from a YAML file.
    pub fn load_profile(path: &Path) -> Result<RunProfile> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Resolves `config_path` against the current directory and loads it.
    pub fn resolve_profile(config_path: &Path) -> Result<RunProfile> {
        let cwd = env::current_dir()?;
        let path = Self::find_config(config_path, &cwd)?;
        tracing::debug!(path = %path.display(), "loading run profile");
        Self::load_profile(&path)
    }
}
