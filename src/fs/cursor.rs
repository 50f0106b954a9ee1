//! Sparse Map Cursor (C1)
//!
//! Exposes a file's data/hole boundaries via `lseek(SEEK_DATA)` /
//! `lseek(SEEK_HOLE)`. These report the allocation map, not file content —
//! a data extent may still contain all-zero bytes; hole-ness is never
//! inferred from content (spec.md §4.1).

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;

/// Namespace for the `lseek(SEEK_DATA)`/`lseek(SEEK_HOLE)` operations.
/// Stateless: callers own whatever caching they need (the engine caches
/// `next_hole` itself, per spec.md's "cursor caches the last `next_hole`").
pub struct SparseCursor;

impl SparseCursor {
    /// First byte offset of any allocated data in `file`, or `Ok(None)` if
    /// the file has no data extents at all (fully sparse).
    ///
    /// `Err` for any `lseek` failure other than `ENXIO` (spec.md:60-63): a
    /// failing block device (`EIO`) or a filesystem without `SEEK_DATA`
    /// support (`EINVAL`) surfaces here rather than taking down the
    /// process.
    pub fn seek_first_data(file: &File) -> io::Result<Option<u64>> {
        seek(file, 0, libc::SEEK_DATA)
    }

    /// Least offset `>= from` whose content is a hole. Returns the file's
    /// length if there is no following hole — this is `lseek(SEEK_HOLE)`'s
    /// own documented behavior, so no separate "no hole" sentinel is
    /// needed.
    pub fn next_hole(file: &File, from: u64) -> io::Result<u64> {
        // SEEK_HOLE from a position within the file never reports ENXIO;
        // any `Ok(None)` here would indicate a caller bug (offset past
        // EOF), which we surface as an I/O error rather than panicking.
        match seek(file, from as i64, libc::SEEK_HOLE)? {
            Some(off) => Ok(off),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "SEEK_HOLE reported no data at an offset expected to be within the file",
            )),
        }
    }

    /// If `at` is within a hole, jumps to the next data extent and reports
    /// the hole that follows it. Returns `Ok(None)` ("EXHAUSTED") when
    /// there is no more data at or after `at`.
    pub fn advance(file: &File, at: u64) -> io::Result<Option<(u64, u64)>> {
        let Some(data) = seek(file, at as i64, libc::SEEK_DATA)? else {
            return Ok(None);
        };
        let hole = Self::next_hole(file, data)?;
        Ok(Some((data, hole)))
    }
}

/// `lseek(fd, offset, whence)`, translating `ENXIO` ("no further data") to
/// `Ok(None)` and propagating any other error to the caller.
fn seek(file: &File, offset: i64, whence: i32) -> io::Result<Option<u64>> {
    let fd = file.as_raw_fd();
    let result = unsafe { libc::lseek(fd, offset, whence) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ENXIO) {
            return Ok(None);
        }
        return Err(err);
    }
    Ok(Some(result as u64))
}
