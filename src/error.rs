//! Error types for nulldiff
//!
//! Mirrors the error taxonomy a careful rewrite of the original C tools
//! needs: usage errors, access errors (open/stat/type/empty/fully-sparse),
//! mapping failures, "no shared data", and terminal content mismatches.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for nulldiff operations.
#[derive(Error, Debug)]
pub enum NullDiffError {
    /// Wrong argument count or flag shape.
    #[error("{0}")]
    Usage(String),

    /// Open/stat failure on a path.
    #[error("unable to open '{path}': {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path exists but isn't a regular file.
    #[error("not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// Zero-length file.
    #[error("file is zero-length: {0}")]
    EmptyFile(PathBuf),

    /// File has a non-zero size but no data extents at all.
    #[error("file is non-zero but is completely sparse, with no data: {0}")]
    FullySparse(PathBuf),

    /// mmap failure.
    #[error("unable to mmap '{path}': {source}")]
    Mapping {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The two files share no overlapping data extent.
    #[error("files do not share any data blocks")]
    NoSharedData,

    /// The byte-level residual comparator found two non-zero, non-equal
    /// bytes at the given absolute offset.
    #[error("files mismatch at byte {offset}")]
    ContentMismatch { offset: u64 },

    /// Writing combined output to the destination sink failed.
    #[error("error writing combined output: {0}")]
    Io(#[from] io::Error),
}

impl NullDiffError {
    /// Build an [`Access`](Self::Access) error for the given path.
    pub fn access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }

    /// Build a [`Mapping`](Self::Mapping) error for the given path.
    pub fn mapping(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Mapping {
            path: path.into(),
            source,
        }
    }

    /// Exit code for a two-file tool (`null_diff`, `null_combine`),
    /// per spec.md §6/§7. `accounting` distinguishes `null_diff`'s basic
    /// invocation (mismatch -> `1`) from its `-g`/`-s` accounting variant
    /// (mismatch -> `-1`).
    pub fn dual_file_exit_code(&self, accounting: bool) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Access { .. } | Self::NotRegularFile(_) | Self::EmptyFile(_) | Self::FullySparse(_) => -3,
            Self::Mapping { .. } | Self::Io(_) => -4,
            Self::NoSharedData => -2,
            Self::ContentMismatch { .. } => {
                if accounting {
                    -1
                } else {
                    1
                }
            }
        }
    }

    /// Exit code for a single-file tool (`has_hole`, `has_null`): every
    /// error class collapses to the fixed code spec.md §7 allows for
    /// single-file tools.
    pub fn single_file_exit_code(&self) -> i32 {
        2
    }
}

/// Result type alias for nulldiff operations.
pub type Result<T> = std::result::Result<T, NullDiffError>;
