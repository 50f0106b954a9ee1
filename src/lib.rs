//! # nulldiff - null-equivalence comparison of sparse files
//!
//! Treats two regular files as equivalent when they differ only in which
//! bytes are zero (whether that zero comes from an actual hole in the
//! allocation map or an explicit zero byte). Exposes this through five
//! small CLI tools (`has_hole`, `has_null`, `null_diff`, `null_combine`)
//! built on the library surface re-exported here.
//!
//! ## Quick start
//!
//! ```no_run
//! use nulldiff::prelude::*;
//!
//! let a = FileView::open("a.bin").unwrap();
//! let b = FileView::open("b.bin").unwrap();
//! let outcome = compare(&a, &b, CompareOptions { show_greatest: true, check_subset: true }).unwrap();
//! println!("{}", outcome.retcode.describe());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Subset/size bookkeeping shared by the comparison engine and combiner.
pub mod accounting;
/// Merges two null-equivalent files into one (C7).
pub mod combine;
/// Halving block comparator (C4).
pub mod compare;
/// Two-file null-equivalence state machine (C5).
pub mod engine;
/// Error taxonomy for every binary.
pub mod error;
/// Sparse-file primitives: cursor, mapped view, readahead window.
pub mod fs;
/// Single-file hole/embedded-null-page probes (C6).
pub mod holes;
/// Alignment helpers.
pub mod util;
/// Zero-content oracle (C3).
pub mod zero;

pub use engine::{compare, CompareOptions, CompareOutcome, RetCode};
pub use error::{NullDiffError, Result};
pub use fs::{FileView, SparseCursor, WindowManager};

/// Library version, shared by every binary's `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient re-exports for the four binaries and for tests.
pub mod prelude {
    //! ```no_run
    //! use nulldiff::prelude::*;
    //! ```

    pub use crate::accounting::Accounting;
    pub use crate::combine::{combine, Prefer};
    pub use crate::engine::{compare, CompareOptions, CompareOutcome, RetCode};
    pub use crate::error::{NullDiffError, Result};
    pub use crate::fs::{FileView, SparseCursor, WindowManager};
    pub use crate::holes::{has_embedded_null_page, has_hole};
}
