//! Combiner (C7)
//!
//! Merges two null-equivalent files into one: wherever the files agree, or
//! one side is zero, the non-zero (or either, if both zero) side is
//! written; zero blocks are skipped rather than written so the output
//! stays sparse on a seekable sink. Genuine two-sided mismatches are
//! resolved by `Prefer`, or are a terminal error.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::error::{NullDiffError, Result};
use crate::fs::FileView;
use crate::zero::is_zero;

/// Buffer/block size the combiner works in, matching the original source's
/// cluster-sized `BUF_SIZE` (spec.md §4.7).
const BUF_SIZE: u64 = 4096;

/// Sub-blocks smaller than this are combined byte-by-byte.
const BYTEWISE_THRESHOLD: usize = 16;

/// Which side wins an irreconcilable byte-level mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefer {
    /// No preference: a genuine mismatch is a terminal error.
    #[default]
    Neither,
    /// The first file's byte wins.
    First,
    /// The second file's byte wins.
    Second,
}

/// Merges `v1` and `v2` into `out`, per `prefer`.
///
/// `out` need not be genuinely seekable: seekability is probed once (a
/// zero-length relative seek) and, if it fails (as it does for a pipe),
/// the combiner downgrades to writing literal zero bytes for blocks it
/// would otherwise have skipped over (spec.md §9 item 4).
pub fn combine(v1: &FileView, v2: &FileView, prefer: Prefer, out: &mut File) -> Result<()> {
    let mut sink = Sink::new(out);

    let len1 = v1.len();
    let len2 = v2.len();
    let min_len = len1.min(len2);
    let max_len = len1.max(len2);

    let mut pos = 0u64;
    while pos < min_len {
        let blen = BUF_SIZE.min(min_len - pos);
        let a = v1.span(pos, pos + blen);
        let b = v2.span(pos, pos + blen);

        if a == b {
            if is_zero(a) {
                sink.skip(blen)?;
            } else {
                sink.write(a)?;
            }
        } else {
            combine_span(a, b, pos, prefer, &mut sink)?;
        }
        pos += blen;
    }

    if len1 > min_len {
        emit_tail(v1, min_len, len1, &mut sink)?;
    } else if len2 > min_len {
        emit_tail(v2, min_len, len2, &mut sink)?;
    }

    sink.finish(max_len)?;
    Ok(())
}

/// Halving descent to `BYTEWISE_THRESHOLD`, then a byte-wise finish — the
/// write-side twin of `compare::compare_span`.
fn combine_span(a: &[u8], b: &[u8], base_off: u64, prefer: Prefer, sink: &mut Sink) -> Result<()> {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len();
    if n == 0 {
        return Ok(());
    }

    let mut checked = 0usize;
    let mut blocksize = largest_pow2_leq(n);

    while checked < n {
        while blocksize > n - checked {
            blocksize /= 2;
        }
        if blocksize == 0 {
            blocksize = n - checked;
        }

        if blocksize >= BYTEWISE_THRESHOLD {
            let a_blk = &a[checked..checked + blocksize];
            let b_blk = &b[checked..checked + blocksize];
            if a_blk == b_blk {
                if is_zero(a_blk) {
                    sink.skip(blocksize as u64)?;
                } else {
                    sink.write(a_blk)?;
                }
                checked += blocksize;
            } else if blocksize == BYTEWISE_THRESHOLD && is_zero(a_blk) {
                sink.write(b_blk)?;
                checked += blocksize;
            } else if blocksize == BYTEWISE_THRESHOLD && is_zero(b_blk) {
                sink.write(a_blk)?;
                checked += blocksize;
            } else {
                // Either a genuine mismatch, or one side is full-zero at a
                // coarser granularity than the threshold: keep halving so a
                // half-sparse/half-data block doesn't collapse into one
                // non-sparse write (original source: halve further rather
                // than commit above the 16-byte floor).
                blocksize /= 2;
                continue;
            }
        } else {
            for i in 0..blocksize {
                let (av, bv) = (a[checked + i], b[checked + i]);
                if av == bv || bv == 0 {
                    sink.write(&a[checked + i..checked + i + 1])?;
                } else if av == 0 {
                    sink.write(&b[checked + i..checked + i + 1])?;
                } else {
                    match prefer {
                        Prefer::First => sink.write(&a[checked + i..checked + i + 1])?,
                        Prefer::Second => sink.write(&b[checked + i..checked + i + 1])?,
                        Prefer::Neither => {
                            return Err(NullDiffError::ContentMismatch {
                                offset: base_off + (checked + i) as u64,
                            })
                        }
                    }
                }
            }
            checked += blocksize;
        }

        while blocksize != 0 && blocksize * 2 <= n - checked {
            blocksize *= 2;
        }
        if blocksize == 0 && checked < n {
            blocksize = largest_pow2_leq(n - checked);
        }
    }

    Ok(())
}

/// Writes the longer file's excess `[start, end)` to the sink, chunk by
/// chunk, skipping whole-zero chunks.
fn emit_tail(view: &FileView, start: u64, end: u64, sink: &mut Sink) -> Result<()> {
    let mut pos = start;
    while pos < end {
        let blen = BUF_SIZE.min(end - pos);
        let chunk = view.span(pos, pos + blen);
        if is_zero(chunk) {
            sink.skip(blen)?;
        } else {
            sink.write(chunk)?;
        }
        pos += blen;
    }
    Ok(())
}

fn largest_pow2_leq(x: usize) -> usize {
    if x == 0 {
        0
    } else {
        1usize << (usize::BITS - 1 - x.leading_zeros())
    }
}

/// Thin write/seek-or-zero-fill wrapper around the destination `File`.
struct Sink<'a> {
    out: &'a mut File,
    seekable: bool,
    len: u64,
}

impl<'a> Sink<'a> {
    fn new(out: &'a mut File) -> Self {
        let seekable = out.seek(SeekFrom::Current(0)).is_ok();
        if !seekable {
            tracing::warn!("output is not seekable; writing zero bytes instead of sparse holes");
        }
        Self {
            out,
            seekable,
            len: 0,
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.out.write_all(buf)?;
        self.len += buf.len() as u64;
        Ok(())
    }

    /// Skips `len` bytes of output that would otherwise be zero, either by
    /// seeking past them (leaving a hole behind on a sparse-aware
    /// filesystem) or, on a non-seekable sink, by writing real zero bytes.
    fn skip(&mut self, len: u64) -> Result<()> {
        if self.seekable {
            self.out.seek(SeekFrom::Current(len as i64))?;
            self.len += len;
            Ok(())
        } else {
            let mut remaining = len;
            let zeros = [0u8; BUF_SIZE as usize];
            while remaining > 0 {
                let chunk = remaining.min(BUF_SIZE) as usize;
                self.out.write_all(&zeros[..chunk])?;
                remaining -= chunk as u64;
            }
            self.len += len;
            Ok(())
        }
    }

    /// Establishes the final output length. Only meaningful on a seekable
    /// sink: if the last operation was a `skip` past `total`, the
    /// underlying file's actual length is still short of it.
    fn finish(&mut self, total: u64) -> Result<()> {
        if self.seekable && self.len < total {
            self.out.set_len(total)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::{tempfile, NamedTempFile};

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.as_file().write_all(bytes).unwrap();
        f.as_file().flush().unwrap();
        f
    }

    fn read_all(f: &mut File) -> Vec<u8> {
        f.seek(SeekFrom::Start(0)).unwrap();
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn identical_files_combine_to_themselves() {
        let data = vec![0xAAu8; 9000];
        let fa = file_with(&data);
        let fb = file_with(&data);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out = tempfile().unwrap();
        combine(&v1, &v2, Prefer::Neither, &mut out).unwrap();
        assert_eq!(read_all(&mut out), data);
    }

    #[test]
    fn zero_side_is_filled_from_the_other() {
        let pattern = vec![0xBBu8; 8192];
        let mut sparse_side = vec![0u8; 8192];
        sparse_side[..4096].copy_from_slice(&pattern[..4096]);
        // second half of sparse_side is zero; pattern has data there.
        let fa = file_with(&sparse_side);
        let fb = file_with(&pattern);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out = tempfile().unwrap();
        combine(&v1, &v2, Prefer::Neither, &mut out).unwrap();
        assert_eq!(read_all(&mut out), pattern);
    }

    #[test]
    fn unresolved_mismatch_without_preference_errors() {
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        a[10] = 1;
        b[10] = 2;
        let fa = file_with(&a);
        let fb = file_with(&b);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out = tempfile().unwrap();
        let err = combine(&v1, &v2, Prefer::Neither, &mut out).unwrap_err();
        assert!(matches!(err, NullDiffError::ContentMismatch { offset: 10 }));
    }

    #[test]
    fn preferring_first_resolves_mismatch() {
        let mut a = vec![0u8; 64];
        let mut b = vec![0u8; 64];
        a[10] = 1;
        b[10] = 2;
        let fa = file_with(&a);
        let fb = file_with(&b);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out = tempfile().unwrap();
        combine(&v1, &v2, Prefer::First, &mut out).unwrap();
        assert_eq!(read_all(&mut out), a);
    }

    #[test]
    fn result_is_at_least_as_large_as_the_bigger_input() {
        let small = vec![0xCCu8; 4096];
        let mut big = vec![0xCCu8; 4096];
        big.extend(vec![0u8; 4096]); // trailing hole-equivalent
        let fa = file_with(&small);
        let fb = file_with(&big);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out = tempfile().unwrap();
        combine(&v1, &v2, Prefer::Neither, &mut out).unwrap();
        assert_eq!(out.metadata().unwrap().len(), 8192);
    }

    #[test]
    fn combine_is_idempotent_on_identical_inputs() {
        let data = vec![0x11u8; 5000];
        let fa = file_with(&data);
        let fb = file_with(&data);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let mut out1 = tempfile().unwrap();
        combine(&v1, &v2, Prefer::Neither, &mut out1).unwrap();
        let mut out2 = tempfile().unwrap();
        combine(&v1, &v2, Prefer::Neither, &mut out2).unwrap();
        assert_eq!(read_all(&mut out1), read_all(&mut out2));
    }
}
