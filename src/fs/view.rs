//! `FileView`: one open, mapped, accounted-for input file.

use std::cell::Cell;
use std::fs::File;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, UncheckedAdvice};

use crate::error::{NullDiffError, Result};
use crate::fs::cursor::SparseCursor;

/// A regular file, opened, stat'd, and mapped read-only over its full
/// `[0, length)` range.
///
/// Invariants (spec.md §3): `0 <= unmap_off <= f_off <= length`,
/// `unmap_off` is always page-aligned, and `madv_off >= f_off` whenever the
/// cursor is inside a data extent. `unmap_off`/`madv_off` are the window
/// manager's bookkeeping, stored here because they're conceptually part of
/// this file's mapping lifecycle, not the engine's comparison state.
pub struct FileView {
    path: PathBuf,
    file: File,
    mmap: Mmap,
    len: u64,
    page_size: u64,
    /// Low watermark of the still-mapped region (page-aligned).
    pub(crate) unmap_off: Cell<u64>,
    /// End of the region already advised `MADV_SEQUENTIAL`/`WILLNEED`.
    pub(crate) madv_off: Cell<u64>,
}

impl FileView {
    /// Opens `path`, validates it per §6's input contract (regular,
    /// non-empty, at least one data extent), and maps it read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| NullDiffError::access(path, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| NullDiffError::access(path, e))?;

        if !metadata.is_file() {
            return Err(NullDiffError::NotRegularFile(path.to_path_buf()));
        }
        let len = metadata.len();
        if len == 0 {
            return Err(NullDiffError::EmptyFile(path.to_path_buf()));
        }

        match SparseCursor::seek_first_data(&file) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(NullDiffError::FullySparse(path.to_path_buf())),
            Err(e) => return Err(NullDiffError::mapping(path, e)),
        }

        // SAFETY: the mapping is read-only and private; the file is not
        // modified by this process while mapped. External modification of
        // the backing file during the run is a known, accepted risk shared
        // with every other mmap-based file-comparison tool.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| NullDiffError::mapping(path, e))?;

        // SAFETY: `DontDump` is advisory; a failure here never affects
        // correctness, only whether this mapping appears in core dumps.
        let _ = unsafe { mmap.unchecked_advise(UncheckedAdvice::DontDump) };

        let page_size = detect_page_size(&file);

        Ok(Self {
            path: path.to_path_buf(),
            file,
            mmap,
            len,
            page_size,
            unmap_off: Cell::new(0),
            madv_off: Cell::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// The full mapped span. Reading at or past `unmap_off.get()` into the
    /// already-unmapped prefix is the caller's responsibility to avoid;
    /// `WindowManager` upholds that invariant for the engine.
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    pub fn span(&self, start: u64, end: u64) -> &[u8] {
        &self.mmap[start as usize..end as usize]
    }

    pub(crate) fn base_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    pub(crate) fn mmap(&self) -> &Mmap {
        &self.mmap
    }
}

#[cfg(unix)]
fn detect_page_size(file: &File) -> u64 {
    use nix::sys::stat::fstat;

    match fstat(file.as_raw_fd()) {
        Ok(stat) if stat.st_blksize > 0 => stat.st_blksize as u64,
        _ => system_page_size(),
    }
}

#[cfg(not(unix))]
fn detect_page_size(_file: &File) -> u64 {
    system_page_size()
}

fn system_page_size() -> u64 {
    #[cfg(unix)]
    {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            return size as u64;
        }
    }
    4096
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn open_rejects_empty_file() {
        let f = NamedTempFile::new().unwrap();
        let err = FileView::open(f.path()).unwrap_err();
        assert!(matches!(err, NullDiffError::EmptyFile(_)));
    }

    #[test]
    fn open_rejects_fully_sparse_file() {
        let f = NamedTempFile::new().unwrap();
        f.as_file().set_len(1 << 20).unwrap();
        let err = FileView::open(f.path()).unwrap_err();
        assert!(matches!(err, NullDiffError::FullySparse(_)));
    }

    #[test]
    fn open_maps_a_file_with_data() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        f.flush().unwrap();
        let view = FileView::open(f.path()).unwrap();
        assert_eq!(view.len(), 11);
        assert_eq!(view.as_slice(), b"hello world");
    }
}
