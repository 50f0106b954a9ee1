//! Equivalence Engine (C5)
//!
//! Drives a single monotone file-offset cursor `f_off` across two
//! `FileView`s: `ALIGN_FIRST_DATA` finds the first offset both files have
//! data at, `COMPARE_BULK`/`COMPARE_FINE` classify 1 MiB windows
//! page-by-page (falling into the halving comparator only for a page that
//! fails the cheap three-way test), `ADVANCE_HOLE` re-syncs the cursor
//! across a hole, and `TAIL` accounts for any data past the shorter file's
//! length.

use bitflags::bitflags;

use crate::accounting::Accounting;
use crate::compare::compare_span;
use crate::error::{NullDiffError, Result};
use crate::fs::{FileView, SparseCursor, WindowManager};
use crate::zero::{count_nonzero_chunks, is_zero};

/// Width of a `COMPARE_BULK` window (spec.md §4.5).
const BULK_CHUNK: u64 = 1 << 20;

bitflags! {
    /// The 7-bit exit-code mask spec.md §6 defines for the accounting
    /// variant of `null_diff`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RetCode: u8 {
        /// File 1 is a null-subset of file 2.
        const SUBSET_1   = 0b0000_0001;
        /// File 2 is a null-subset of file 1.
        const SUBSET_2   = 0b0000_0010;
        /// File 1 has strictly more non-zero bytes than file 2.
        const GREATEST_1 = 0b0000_0100;
        /// File 2 has strictly more non-zero bytes than file 1.
        const GREATEST_2 = 0b0000_1000;
    }
}

impl RetCode {
    /// Human-readable rendering, used by `null_diff`'s success messaging.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.contains(RetCode::SUBSET_1) {
            parts.push("file 1 is a null-subset of file 2".to_string());
        }
        if self.contains(RetCode::SUBSET_2) {
            parts.push("file 2 is a null-subset of file 1".to_string());
        }
        if self.contains(RetCode::GREATEST_1) {
            parts.push("file 1 has more non-zero data".to_string());
        }
        if self.contains(RetCode::GREATEST_2) {
            parts.push("file 2 has more non-zero data".to_string());
        }
        if parts.is_empty() {
            "no relationship established".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Which accounting bits the caller wants reflected in the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOptions {
    /// Enable `GREATEST_1`/`GREATEST_2` in the result.
    pub show_greatest: bool,
    /// Enable `SUBSET_1`/`SUBSET_2` in the result.
    pub check_subset: bool,
}

/// Result of a successful (null-equivalent) comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareOutcome {
    /// The accounting bits the caller asked for, per [`CompareOptions`].
    pub retcode: RetCode,
}

/// Compares `v1` and `v2` for null-equivalence (spec.md §4.5).
///
/// Returns `Ok` with the requested accounting bits set when the files are
/// null-equivalent, or `Err(ContentMismatch)` at the first offset where
/// both sides are non-zero and unequal. `Err(NoSharedData)` when the files
/// share no overlapping data extent at all.
pub fn compare(v1: &FileView, v2: &FileView, opts: CompareOptions) -> Result<CompareOutcome> {
    let mut acc = Accounting::new();

    let (mut f_off, mut next_hole) = align_first_data(v1, v2, &mut acc)?;
    let max_size = v1.len().min(v2.len());
    if f_off >= max_size {
        return Err(NullDiffError::NoSharedData);
    }

    let mut exhausted_early = false;
    while f_off < max_size {
        if f_off >= next_hole {
            match (advance(v1, f_off)?, advance(v2, f_off)?) {
                (None, None) => break,
                (None, Some((d2, _))) => {
                    // Per spec.md §9: only the exhausted side becomes a
                    // subset; the other's bit is left exactly as accounted
                    // so far.
                    acc.subset1 = true;
                    acc.procsz2 += scan_remaining_nonzero(v2, d2)?;
                    exhausted_early = true;
                    break;
                }
                (Some((d1, _)), None) => {
                    acc.subset2 = true;
                    acc.procsz1 += scan_remaining_nonzero(v1, d1)?;
                    exhausted_early = true;
                    break;
                }
                (Some((d1, h1)), Some((d2, h2))) => {
                    f_off = d1.min(d2);
                    next_hole = h1.min(h2);
                    continue;
                }
            }
        }

        let bulk_end = next_hole.min(f_off + BULK_CHUNK).min(max_size);
        f_off = compare_region(v1, v2, f_off, bulk_end, next_hole, &mut acc)?;
    }

    if !exhausted_early {
        tail_accounting(v1, v2, max_size, &mut acc)?;
    }

    Ok(CompareOutcome {
        retcode: compose_retcode(opts, &acc),
    })
}

fn compose_retcode(opts: CompareOptions, acc: &Accounting) -> RetCode {
    let mut retcode = RetCode::empty();
    if opts.show_greatest {
        if acc.procsz1 > acc.procsz2 {
            retcode |= RetCode::GREATEST_1;
        } else if acc.procsz2 > acc.procsz1 {
            retcode |= RetCode::GREATEST_2;
        }
    }
    if opts.check_subset {
        if acc.subset1 {
            retcode |= RetCode::SUBSET_1;
        }
        if acc.subset2 {
            retcode |= RetCode::SUBSET_2;
        }
    }
    retcode
}

/// `SparseCursor::advance`, mapping any `lseek` failure to a `Mapping`
/// error tagged with `view`'s path (spec.md:60-63: these must surface as
/// typed I/O errors, not panic the process).
fn advance(view: &FileView, at: u64) -> Result<Option<(u64, u64)>> {
    SparseCursor::advance(view.file(), at).map_err(|e| NullDiffError::mapping(view.path(), e))
}

/// `SparseCursor::next_hole`, with the same error mapping as [`advance`].
fn next_hole_of(view: &FileView, from: u64) -> Result<u64> {
    SparseCursor::next_hole(view.file(), from).map_err(|e| NullDiffError::mapping(view.path(), e))
}

/// `ALIGN_FIRST_DATA`: walks both cursors forward until they report the
/// same `next_data`, accounting for any data one side has in a region
/// where the other is a pure hole. Returns the shared `(f_off, next_hole)`.
fn align_first_data(v1: &FileView, v2: &FileView, acc: &mut Accounting) -> Result<(u64, u64)> {
    let mut data1 = SparseCursor::seek_first_data(v1.file())
        .map_err(|e| NullDiffError::mapping(v1.path(), e))?
        .expect("validated non-sparse at open");
    let mut data2 = SparseCursor::seek_first_data(v2.file())
        .map_err(|e| NullDiffError::mapping(v2.path(), e))?
        .expect("validated non-sparse at open");
    // Never look past the other file's first data point.
    let hole1 = next_hole_of(v1, data1)?.min(data2);
    let hole2 = next_hole_of(v2, data2)?.min(data1);
    let mut next_hole = hole1.min(hole2);

    loop {
        if data1 < data2 {
            let extra = scan_span_nonzero(v1, data1, next_hole);
            if extra > 0 {
                acc.procsz1 += extra;
                acc.subset2 = false;
            }
        } else if data2 < data1 {
            let extra = scan_span_nonzero(v2, data2, next_hole);
            if extra > 0 {
                acc.procsz2 += extra;
                acc.subset1 = false;
            }
        }

        match (advance(v1, next_hole)?, advance(v2, next_hole)?) {
            (Some((d1, h1)), Some((d2, h2))) => {
                data1 = d1;
                data2 = d2;
                next_hole = h1.min(h2);
                if data1 == data2 {
                    return Ok((data1, next_hole));
                }
            }
            _ => return Err(NullDiffError::NoSharedData),
        }
    }
}

/// Processes `[f_off, bulk_end)` a page at a time (`COMPARE_BULK`'s cheap
/// three-way test), falling into the halving comparator (`COMPARE_FINE`)
/// for any page that fails all three. Returns the new `f_off`.
fn compare_region(
    v1: &FileView,
    v2: &FileView,
    f_off: u64,
    bulk_end: u64,
    next_hole: u64,
    acc: &mut Accounting,
) -> Result<u64> {
    let page = v1.page_size().min(v2.page_size());
    let mut pos = f_off;
    while pos < bulk_end {
        WindowManager::advance_window(v1, pos, next_hole);
        WindowManager::advance_window(v2, pos, next_hole);

        let len = page.min(bulk_end - pos);
        let a = v1.span(pos, pos + len);
        let b = v2.span(pos, pos + len);

        if a == b {
            // Equal (including both-zero, which is accounting-neutral).
        } else if is_zero(a) {
            acc.zero_in_a(len);
        } else if is_zero(b) {
            acc.zero_in_b(len);
        } else {
            compare_span(a, b, pos, acc)?;
        }
        pos += len;
    }
    Ok(pos)
}

/// Sum of non-zero bytes in `view`'s mapped span `[start, end)`, at
/// page granularity.
fn scan_span_nonzero(view: &FileView, start: u64, end: u64) -> u64 {
    if end <= start {
        return 0;
    }
    count_nonzero_chunks(view.span(start, end), view.page_size() as usize, false)
}

/// Walks every remaining data extent of `view` starting at the data offset
/// `data`, summing non-zero bytes across all of them to the file's end.
fn scan_remaining_nonzero(view: &FileView, mut data: u64) -> Result<u64> {
    let mut total = 0u64;
    loop {
        let hole = next_hole_of(view, data)?.min(view.len());
        total += scan_span_nonzero(view, data, hole);
        if hole >= view.len() {
            break;
        }
        match advance(view, hole)? {
            Some((d, _)) => data = d,
            None => break,
        }
    }
    Ok(total)
}

/// `TAIL`: only relevant when the main loop ran to completion without
/// hitting the mid-loop exhaustion branch (which already folds this in for
/// whichever side was exhausted). Accounts for either file's data past
/// `max_size`. Fixes spec.md §9's "both added to procsz1" bug: file 2's
/// excess goes to `procsz2`.
fn tail_accounting(v1: &FileView, v2: &FileView, max_size: u64, acc: &mut Accounting) -> Result<()> {
    if v1.len() > max_size {
        if let Some((d, _)) = advance(v1, max_size)? {
            acc.procsz1 += scan_remaining_nonzero(v1, d)?;
        }
    }
    if v2.len() > max_size {
        if let Some((d, _)) = advance(v2, max_size)? {
            acc.procsz2 += scan_remaining_nonzero(v2, d)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    fn full_opts() -> CompareOptions {
        CompareOptions {
            show_greatest: true,
            check_subset: true,
        }
    }

    #[test]
    fn reflexivity_sets_both_subsets_no_greatest() {
        let data = vec![0xAAu8; 4096];
        let f = file_with(&data);
        let v1 = FileView::open(f.path()).unwrap();
        let v2 = FileView::open(f.path()).unwrap();
        let outcome = compare(&v1, &v2, full_opts()).unwrap();
        assert!(outcome.retcode.contains(RetCode::SUBSET_1));
        assert!(outcome.retcode.contains(RetCode::SUBSET_2));
        assert!(!outcome.retcode.contains(RetCode::GREATEST_1));
        assert!(!outcome.retcode.contains(RetCode::GREATEST_2));
    }

    #[test]
    fn terminal_mismatch_on_two_sided_difference() {
        let mut a = vec![0xAAu8; 4096];
        a.extend(vec![0xAAu8; 4096]);
        let mut b = a.clone();
        b[4096] = 0xBB;
        let fa = file_with(&a);
        let fb = file_with(&b);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let err = compare(&v1, &v2, full_opts()).unwrap_err();
        assert!(matches!(err, NullDiffError::ContentMismatch { offset: 4096 }));
    }

    #[test]
    fn zero_page_in_a_yields_subset1_and_greatest2() {
        // a = P Z P ; b = P P P  (P = pattern page, Z = zero page)
        let p = vec![0xAAu8; 4096];
        let z = vec![0u8; 4096];
        let mut a = p.clone();
        a.extend(z);
        a.extend(p.clone());
        let mut b = p.clone();
        b.extend(p.clone());
        b.extend(p.clone());

        let fa = file_with(&a);
        let fb = file_with(&b);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let outcome = compare(&v1, &v2, full_opts()).unwrap();
        assert!(outcome.retcode.contains(RetCode::SUBSET_1));
        assert!(!outcome.retcode.contains(RetCode::SUBSET_2));
        assert!(outcome.retcode.contains(RetCode::GREATEST_2));
    }

    #[test]
    fn subset_symmetry_swaps_bits() {
        let p = vec![0xAAu8; 4096];
        let z = vec![0u8; 4096];
        let mut a = p.clone();
        a.extend(z);
        a.extend(p.clone());
        let mut b = p.clone();
        b.extend(p.clone());
        b.extend(p.clone());
        let fa = file_with(&a);
        let fb = file_with(&b);

        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let ab = compare(&v1, &v2, full_opts()).unwrap().retcode;

        let v2b = FileView::open(fb.path()).unwrap();
        let v1b = FileView::open(fa.path()).unwrap();
        let ba = compare(&v2b, &v1b, full_opts()).unwrap().retcode;

        assert_eq!(ab.contains(RetCode::SUBSET_1), ba.contains(RetCode::SUBSET_2));
        assert_eq!(ab.contains(RetCode::SUBSET_2), ba.contains(RetCode::SUBSET_1));
        assert_eq!(
            ab.contains(RetCode::GREATEST_1),
            ba.contains(RetCode::GREATEST_2)
        );
    }

    #[test]
    fn trailing_zeros_do_not_imply_greatest() {
        let p = vec![0xAAu8; 4096];
        let mut a = p.clone();
        a.extend(vec![0u8; 4096]);
        let fa = file_with(&a);
        let fb = file_with(&p);
        let v1 = FileView::open(fa.path()).unwrap();
        let v2 = FileView::open(fb.path()).unwrap();
        let outcome = compare(&v1, &v2, full_opts()).unwrap();
        assert!(!outcome.retcode.contains(RetCode::GREATEST_1));
        assert!(!outcome.retcode.contains(RetCode::GREATEST_2));
    }
}
