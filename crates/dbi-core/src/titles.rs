//! Title index: maps short package file names to absolute paths.
//!
//! The index is rebuilt from the titles root on every LIST command by a
//! recursive walk. A file is eligible when its name's last four characters
//! are exactly `.nsp`, `.nsz`, or `.xci` (case-sensitive); everything else
//! is ignored, including directories and symlinks.
//!
//! Collision policy: when two files in different subdirectories share a
//! name, the one visited last wins. The walk sorts entries by file name at
//! every level, so the winner is stable for a given tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// File name suffixes that mark a file as a servable title.
pub const ELIGIBLE_EXTENSIONS: [&str; 3] = [".nsp", ".nsz", ".xci"];

/// Error type for title index construction.
#[derive(Debug, Error)]
pub enum TitleError {
    /// The titles root (or a directory inside it) does not exist or cannot
    /// be read.
    #[error("cannot access titles directory {path}: {source}")]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Mapping from short title name to absolute file path.
///
/// Backed by a `BTreeMap` so iteration (and therefore the LIST payload) is
/// in sorted name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl TitleIndex {
    /// Creates an empty index. A FILE_RANGE arriving before any LIST runs
    /// against this: every name falls back to literal path resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index by recursively scanning `root`.
    ///
    /// The root is canonicalized first, so the stored paths are absolute
    /// even when `root` is relative, and a missing or unreadable root fails
    /// up front.
    ///
    /// # Errors
    ///
    /// Returns [`TitleError::DirectoryAccess`] when the root cannot be
    /// canonicalized or any directory in the tree cannot be read. The caller
    /// does not retry.
    pub fn scan(root: &Path) -> Result<Self, TitleError> {
        let root = root
            .canonicalize()
            .map_err(|source| TitleError::DirectoryAccess {
                path: root.to_path_buf(),
                source,
            })?;

        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                TitleError::DirectoryAccess {
                    path,
                    source: e.into(),
                }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            // Non-UTF-8 names cannot appear in the UTF-8 listing payload.
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            if !is_eligible(name) {
                continue;
            }

            debug!(name, path = %entry.path().display(), "indexed title");
            entries.insert(name.to_string(), entry.path().to_path_buf());
        }

        Ok(Self { entries })
    }

    /// Looks up the absolute path cached for `name`. `None` means the
    /// caller should fall back to treating `name` as a literal path.
    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    /// Renders the LIST payload: every title name in sorted order, each
    /// followed by a newline.
    pub fn render_listing(&self) -> String {
        let mut listing = String::new();
        for name in self.entries.keys() {
            listing.push_str(name);
            listing.push('\n');
        }
        listing
    }

    /// Number of indexed titles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no titles are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// True when the name's last four characters are one of the eligible
/// package suffixes. Ordinal comparison; `GAME.NSP` is not eligible.
fn is_eligible(name: &str) -> bool {
    ELIGIBLE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
