use serde::Serialize;

/// Running counters for one run.
///
/// The engine owns the only mutable instance. Consumers receive copies
/// attached to each `RunEvent`, so a snapshot never changes after it is sent.
///
/// `record_success` and `record_open_failure` are the per-file calls: exactly
/// one of them runs for every processed file and bumps `processed_files`.
/// `record_replaces` and `record_write_failure` only annotate a file that was
/// already counted as a success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_files: usize,
    pub processed_files: usize,
    pub files_with_matches: usize,
    pub files_without_matches: usize,
    pub failed_to_open: usize,
    pub failed_to_write: usize,
    pub total_matches: usize,
    pub total_replaces: usize,
}

impl Stats {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// Counts a file that was read and searched.
    pub fn record_success(&mut self, had_matches: bool, num_matches: usize) {
        self.processed_files += 1;
        if had_matches {
            self.files_with_matches += 1;
        } else {
            self.files_without_matches += 1;
        }
        self.total_matches += num_matches;
    }

    /// Counts a file that could not be read.
    pub fn record_open_failure(&mut self) {
        self.processed_files += 1;
        self.failed_to_open += 1;
    }

    /// Marks the current file's rewrite as failed.
    pub fn record_write_failure(&mut self) {
        self.failed_to_write += 1;
    }

    /// Adds the replacements written to the current file.
    pub fn record_replaces(&mut self, num_replaces: usize) {
        self.total_replaces += num_replaces;
    }

    /// Returns an immutable copy for delivery to a consumer.
    pub fn snapshot(&self) -> Stats {
        *self
    }

    /// `true` once every enumerated file has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed_files == self.total_files
    }
}
