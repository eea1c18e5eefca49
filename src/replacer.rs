use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::scanner::{drive_run, CancelToken, FileOutcome, RunEvent, RunState, Scanner};
use crate::stats::Stats;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Find-and-replace engine.
///
/// Reuses the `Scanner` for reading and matching, then rewrites each file
/// that had at least one match. Files without matches are never opened for
/// writing.
pub struct Replacer {
    scanner: Scanner,
    replace_text: String,
    state: RunState,
}

impl Replacer {
    /// Validates `config`; it must carry a replacement text.
    pub fn new(config: RunConfig) -> Result<Self> {
        let replace_text = config.require_replace_text()?.to_string();
        let scanner = Scanner::new(config)?;
        Ok(Self {
            scanner,
            replace_text,
            state: RunState::Idle,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Processes a single file: read, match, rewrite when needed.
    ///
    /// A failed write leaves the matches counted but adds nothing to
    /// `total_replaces`.
    pub fn process_file(&self, path: &Path, stats: &mut Stats) -> FileOutcome {
        let root = &self.scanner.config().root_dir;

        let (content, matches) = match self.scanner.read_and_match(path) {
            Ok(found) => found,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to open file");
                stats.record_open_failure();
                return FileOutcome::failed(root, path, &err);
            }
        };

        let num_matches = matches.len();
        stats.record_success(num_matches > 0, num_matches);
        let mut outcome = FileOutcome::matched(root, path, matches);

        if num_matches == 0 {
            return outcome;
        }

        let new_content = self.scanner.matcher().replace_all(&content, &self.replace_text);
        match write_atomic(path, new_content.as_bytes()) {
            Ok(()) => {
                debug!(path = %path.display(), replaced = num_matches, "file rewritten");
                stats.record_replaces(num_matches);
                outcome.wrote_successfully = Some(true);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to write file");
                stats.record_write_failure();
                outcome.wrote_successfully = Some(false);
                outcome.error_message = err.to_string();
            }
        }

        outcome
    }

    /// Runs the replacement, calling `on_event` once per file in enumeration order.
    pub fn run<F>(&mut self, mut on_event: F, cancel: &CancelToken) -> RunState
    where
        F: FnMut(RunEvent),
    {
        self.state = RunState::Running;
        let config = self.scanner.config();
        info!(root = %config.root_dir.display(), mask = %config.file_mask, "replace started");

        let files = self.scanner.files();
        let state = drive_run(files, cancel, &mut on_event, |path, stats| {
            self.process_file(path, stats)
        });
        self.state = state;
        state
    }
}

/// Replaces the file at `path` with `content` without ever leaving it half
/// written: the data goes to a temporary file in the same directory which is
/// then renamed over the original. Permissions are carried over. A symlink
/// is resolved first so the link survives and its target gets the content.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let path = &fs::canonicalize(path).map_err(Error::write)?;
    let parent = path.parent().ok_or_else(|| {
        Error::write(format!(
            "Could not get parent directory for {}",
            path.display()
        ))
    })?;

    let perms = fs::metadata(path).map_err(Error::write)?.permissions();
    if perms.readonly() {
        return Err(Error::write("file is read-only"));
    }

    let mut temp_file = NamedTempFile::new_in(parent).map_err(Error::write)?;
    temp_file.write_all(content).map_err(Error::write)?;
    temp_file.as_file().sync_all().map_err(Error::write)?;
    fs::set_permissions(temp_file.path(), perms).map_err(Error::write)?;
    temp_file.persist(path).map_err(|e| Error::write(e.error))?;

    Ok(())
}
