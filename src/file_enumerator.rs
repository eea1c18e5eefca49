use crate::errors::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::{Walk, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wildcard file-name filter built from a mask such as `*.txt` or `*.cs;*.resx`.
///
/// Masks are matched against the file name only, never the directory part.
/// Case sensitivity follows the host filesystem convention.
#[derive(Debug, Clone)]
pub struct FileMask {
    set: GlobSet,
}

impl FileMask {
    /// Parses a `;`-separated list of shell wildcards.
    pub fn new(mask: &str) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut count = 0;

        for part in mask.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let glob = GlobBuilder::new(part)
                .literal_separator(true)
                .case_insensitive(cfg!(any(windows, target_os = "macos")))
                .build()?;
            builder.add(glob);
            count += 1;
        }

        if count == 0 {
            return Err("File mask must not be empty".into());
        }

        Ok(Self { set: builder.build()? })
    }

    /// Returns `true` if the final component of `path` matches the mask.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.set.is_match(Path::new(name)))
    }
}

/// A lazy, depth-first sequence of files below a root directory.
///
/// Entries are visited in file-name order so that two walks over the same
/// tree always produce the same sequence. Directories that cannot be opened
/// are skipped. Symlinks to files are yielded; symlinked directories are not
/// descended into.
pub struct FileEnumerator {
    walk: Walk,
    mask: FileMask,
}

impl FileEnumerator {
    pub fn new(root: &Path, mask: FileMask, recursive: bool) -> Self {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .max_depth(if recursive { None } else { Some(1) })
            .sort_by_file_name(|a, b| a.cmp(b));

        Self {
            walk: builder.build(),
            mask,
        }
    }
}

impl Iterator for FileEnumerator {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.walk.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let is_file = entry
                .file_type()
                .is_some_and(|ft| ft.is_file() || (ft.is_symlink() && entry.path().is_file()));
            if is_file && self.mask.matches(entry.path()) {
                return Some(entry.into_path());
            }
        }
        None
    }
}

/// Enumerates the files below `root` whose names match `mask`.
pub fn enumerate(root: &Path, mask: &str, recursive: bool) -> Result<FileEnumerator> {
    Ok(FileEnumerator::new(root, FileMask::new(mask)?, recursive))
}
