//! Low-level sparse-file primitives
//!
//! Opening regular files, mapping them read-only, and walking their
//! data/hole extents. This is the layer the comparison engine (`engine`,
//! `compare`, `holes`, `combine`) builds on.

mod cursor;
mod view;
mod window;

pub use cursor::SparseCursor;
pub use view::FileView;
pub use window::WindowManager;
