use crate::config::RunConfig;
use crate::errors::{Error, Result};
use crate::file_enumerator::{FileEnumerator, FileMask};
use crate::patterns::{MatchSpan, PatternMatcher};
use crate::stats::Stats;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bytes inspected when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 1024;

/// The result of processing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub file_name: String,
    /// Path below the run's root, rendered as `./dir/file.txt`.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub matches: Vec<MatchSpan>,
    pub num_matches: usize,
    /// `false` when the file could not be read as text.
    pub is_success: bool,
    pub error_message: String,
    /// Replace runs only: `Some(true)` once the rewrite landed, `Some(false)`
    /// when it failed. `None` when no write was attempted.
    pub wrote_successfully: Option<bool>,
}

impl FileOutcome {
    fn new(root: &Path, path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        Self {
            file_name,
            relative_path: format!(".{}{}", MAIN_SEPARATOR, relative.display()),
            absolute_path,
            matches: Vec::new(),
            num_matches: 0,
            is_success: true,
            error_message: String::new(),
            wrote_successfully: None,
        }
    }

    pub(crate) fn matched(root: &Path, path: &Path, matches: Vec<MatchSpan>) -> Self {
        let mut outcome = Self::new(root, path);
        outcome.num_matches = matches.len();
        outcome.matches = matches;
        outcome
    }

    pub(crate) fn failed(root: &Path, path: &Path, err: &Error) -> Self {
        let mut outcome = Self::new(root, path);
        outcome.is_success = false;
        outcome.error_message = err.to_string();
        outcome
    }

    /// Whether the file failed to open or, in a replace run, to be written.
    pub fn has_error(&self) -> bool {
        !self.is_success || self.wrote_successfully == Some(false)
    }
}

/// One unit of progress: the file just processed and the counters after it.
///
/// `outcome` is `None` only for the single event of a run that found no files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    pub outcome: Option<FileOutcome>,
    pub stats: Stats,
}

impl RunEvent {
    /// `true` for the last event of a run that was not cancelled.
    pub fn is_final(&self) -> bool {
        self.stats.is_complete()
    }
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// A cooperative cancellation flag shared between a controller and an engine.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only engine: finds matches in every enumerated file.
pub struct Scanner {
    config: RunConfig,
    matcher: PatternMatcher,
    mask: FileMask,
    state: RunState,
}

impl Scanner {
    /// Validates `config` and compiles its pattern and mask.
    pub fn new(config: RunConfig) -> Result<Self> {
        let (matcher, mask) = config.validate()?;
        Ok(Self {
            config,
            matcher,
            mask,
            state: RunState::Idle,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// A fresh enumeration of the files this run covers.
    pub fn files(&self) -> FileEnumerator {
        FileEnumerator::new(
            &self.config.root_dir,
            self.mask.clone(),
            self.config.include_subdirectories,
        )
    }

    /// Reads `path` and returns its content together with all matches.
    pub fn read_and_match(&self, path: &Path) -> Result<(String, Vec<MatchSpan>)> {
        let content = read_text(path)?;
        let matches = self.matcher.find_all(&content);
        Ok((content, matches))
    }

    /// Scans a single file. Read failures are reported in the outcome.
    pub fn scan_file(&self, path: &Path, stats: &mut Stats) -> FileOutcome {
        let root = &self.config.root_dir;
        match self.read_and_match(path) {
            Ok((_, matches)) => {
                stats.record_success(!matches.is_empty(), matches.len());
                FileOutcome::matched(root, path, matches)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to open file");
                stats.record_open_failure();
                FileOutcome::failed(root, path, &err)
            }
        }
    }

    /// Runs the scan, calling `on_event` once per file in enumeration order.
    pub fn run<F>(&mut self, mut on_event: F, cancel: &CancelToken) -> RunState
    where
        F: FnMut(RunEvent),
    {
        self.state = RunState::Running;
        info!(
            root = %self.config.root_dir.display(),
            mask = %self.config.file_mask,
            "find started"
        );

        let files = self.files();
        let state = drive_run(files, cancel, &mut on_event, |path, stats| {
            self.scan_file(path, stats)
        });
        self.state = state;
        state
    }
}

/// The loop shared by both engines.
///
/// Materializes the file list to fix `total_files`, then processes files one
/// at a time, checking `cancel` before each. Stats are updated before the
/// event for that file is built, so the snapshot always includes it.
pub(crate) fn drive_run<E, P>(
    files: FileEnumerator,
    cancel: &CancelToken,
    on_event: &mut E,
    mut process: P,
) -> RunState
where
    E: FnMut(RunEvent),
    P: FnMut(&Path, &mut Stats) -> FileOutcome,
{
    let mut paths: Vec<PathBuf> = Vec::new();
    for path in files {
        if cancel.is_cancelled() {
            info!("run cancelled during enumeration");
            return RunState::Cancelled;
        }
        paths.push(path);
    }

    let mut stats = Stats::new(paths.len());
    debug!(total_files = stats.total_files, "enumeration complete");

    if paths.is_empty() {
        on_event(RunEvent {
            outcome: None,
            stats: stats.snapshot(),
        });
        info!("no files matched the mask");
        return RunState::Completed;
    }

    for path in &paths {
        if cancel.is_cancelled() {
            info!(processed = stats.processed_files, total = stats.total_files, "run cancelled");
            return RunState::Cancelled;
        }

        let outcome = process(path, &mut stats);
        debug!(file = %outcome.relative_path, matches = outcome.num_matches, "file processed");
        on_event(RunEvent {
            outcome: Some(outcome),
            stats: stats.snapshot(),
        });
    }

    info!(
        files = stats.processed_files,
        with_matches = stats.files_with_matches,
        failed_to_open = stats.failed_to_open,
        matches = stats.total_matches,
        "run completed"
    );
    RunState::Completed
}

/// Reads a whole file as UTF-8 text, rejecting binary content.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(Error::read)?;

    if bytes.iter().take(BINARY_SNIFF_LEN).any(|&b| b == 0) {
        return Err(Error::read("binary file"));
    }

    String::from_utf8(bytes).map_err(|_| Error::read("file is not valid UTF-8 text"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn collect(scanner: &mut Scanner) -> (RunState, Vec<RunEvent>) {
        let mut events = Vec::new();
        let state = scanner.run(|e| events.push(e), &CancelToken::new());
        (state, events)
    }

    fn outcome(event: &RunEvent) -> &FileOutcome {
        event.outcome.as_ref().unwrap()
    }

    #[test]
    fn test_three_file_scenario() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), "foo bar foo").unwrap();
        fs::write(root.join("b.txt"), b"foo\0\x01\x02").unwrap();
        fs::write(root.join("c.txt"), "nothing here").unwrap();

        let config = RunConfig::new(root, "*.txt", "foo").with_case_sensitive(true);
        let mut scanner = Scanner::new(config).unwrap();
        let (state, events) = collect(&mut scanner);

        assert_eq!(state, RunState::Completed);
        assert_eq!(scanner.state(), RunState::Completed);
        assert_eq!(events.len(), 3);

        let a = outcome(&events[0]);
        assert_eq!(a.file_name, "a.txt");
        assert_eq!(a.relative_path, format!(".{MAIN_SEPARATOR}a.txt"));
        assert_eq!(a.num_matches, 2);
        assert!(a.is_success);

        let b = outcome(&events[1]);
        assert!(!b.is_success);
        assert!(!b.error_message.is_empty());
        assert_eq!(b.num_matches, 0);

        let c = outcome(&events[2]);
        assert!(c.is_success);
        assert_eq!(c.num_matches, 0);

        let last = events[2].stats;
        assert!(events[2].is_final());
        assert_eq!(last.total_files, 3);
        assert_eq!(last.processed_files, 3);
        assert_eq!(last.files_with_matches, 1);
        assert_eq!(last.files_without_matches, 1);
        assert_eq!(last.failed_to_open, 1);
        assert_eq!(last.total_matches, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_is_a_read_failure() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("locked.txt");
        fs::write(&path, "foo").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read anything; nothing to simulate then.
        if fs::read(&path).is_ok() {
            return;
        }

        let mut scanner = Scanner::new(RunConfig::new(temp_dir.path(), "*", "foo")).unwrap();
        let (_, events) = collect(&mut scanner);
        assert!(!outcome(&events[0]).is_success);
        assert_eq!(events[0].stats.failed_to_open, 1);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn test_vanished_file_is_a_read_failure() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = Scanner::new(RunConfig::new(temp_dir.path(), "*", "foo")).unwrap();
        let mut stats = Stats::new(1);

        let result = scanner.scan_file(&temp_dir.path().join("gone.txt"), &mut stats);
        assert!(!result.is_success);
        assert!(result.has_error());
        assert_eq!(stats.failed_to_open, 1);
        assert_eq!(stats.processed_files, 1);
    }

    #[test]
    fn test_empty_directory_emits_single_final_event() {
        let temp_dir = TempDir::new().unwrap();
        let mut scanner = Scanner::new(RunConfig::new(temp_dir.path(), "*.txt", "foo")).unwrap();
        let (state, events) = collect(&mut scanner);

        assert_eq!(state, RunState::Completed);
        assert_eq!(events.len(), 1);
        assert!(events[0].outcome.is_none());
        assert!(events[0].is_final());
        assert_eq!(events[0].stats.total_files, 0);
    }

    #[test]
    fn test_scan_is_idempotent_and_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("one.txt"), "alpha beta\nALPHA").unwrap();
        fs::write(root.join("nested/two.txt"), "alpha").unwrap();

        let config = RunConfig::new(root, "*.txt", "alpha").with_subdirectories(true);
        let (_, first) = collect(&mut Scanner::new(config.clone()).unwrap());
        let (_, second) = collect(&mut Scanner::new(config).unwrap());

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(fs::read_to_string(root.join("one.txt")).unwrap(), "alpha beta\nALPHA");
        assert_eq!(first.last().unwrap().stats.total_matches, 3);
    }

    #[test]
    fn test_stats_are_monotonic() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..6 {
            fs::write(temp_dir.path().join(format!("f{i}.txt")), "x".repeat(i)).unwrap();
        }

        let mut scanner = Scanner::new(RunConfig::new(temp_dir.path(), "*", "x")).unwrap();
        let (_, events) = collect(&mut scanner);

        assert_eq!(events.len(), 6);
        for pair in events.windows(2) {
            assert_eq!(pair[1].stats.processed_files, pair[0].stats.processed_files + 1);
            assert!(pair[1].stats.total_matches >= pair[0].stats.total_matches);
            assert_eq!(pair[1].stats.total_files, 6);
        }
        assert_eq!(events[5].stats.total_matches, 15);
    }

    #[test]
    fn test_cancel_stops_before_next_file() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(temp_dir.path().join(format!("f{i}.txt")), "foo").unwrap();
        }

        let cancel = CancelToken::new();
        let mut events = Vec::new();
        let mut scanner = Scanner::new(RunConfig::new(temp_dir.path(), "*", "foo")).unwrap();
        let state = scanner.run(
            |e| {
                events.push(e);
                if events.len() == 2 {
                    cancel.cancel();
                }
            },
            &cancel,
        );

        assert_eq!(state, RunState::Cancelled);
        assert_eq!(events.len(), 2);
        let last = events[1].stats;
        assert!(last.processed_files <= last.total_files);
        assert!(!events[1].is_final());
    }

    #[test]
    fn test_utf8_bom_and_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let bom = temp_dir.path().join("bom.txt");
        fs::write(&bom, "\u{feff}foo").unwrap();
        assert!(read_text(&bom).unwrap().starts_with('\u{feff}'));

        let latin1 = temp_dir.path().join("latin1.txt");
        fs::write(&latin1, [b'c', b'a', 0xE9, b'f']).unwrap();
        assert!(matches!(read_text(&latin1), Err(Error::Read { .. })));
    }
}
