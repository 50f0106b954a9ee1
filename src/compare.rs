//! Block Comparator (C4)
//!
//! Compares two equal-length spans using halving block sizes down to a
//! 16-byte threshold, then finishes byte-wise. Classifies each consumed
//! sub-block as equal, zero-on-one-side, or a terminal mismatch.
//!
//! This re-expresses the original C source's `goto recalc_blocksize` /
//! label-based halving as an explicit loop with no control-flow
//! specialness (spec.md §9).

use crate::accounting::Accounting;
use crate::error::{NullDiffError, Result};
use crate::zero::is_zero;

/// Sub-blocks smaller than this are compared byte-by-byte rather than via
/// a further halving step (spec.md §4.4).
const BYTEWISE_THRESHOLD: usize = 16;

/// Compares `a` and `b` (equal length, `<= page`) starting at absolute
/// offset `base_off`, updating `acc` as zero/non-zero contributions are
/// discovered. Returns `Err(ContentMismatch)` with the absolute offset of
/// the first byte where both sides are non-zero and unequal.
pub fn compare_span(a: &[u8], b: &[u8], base_off: u64, acc: &mut Accounting) -> Result<()> {
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
                checked += blocksize;
            } else if is_zero(a_blk) {
                acc.zero_in_a(blocksize as u64);
                checked += blocksize;
            } else if is_zero(b_blk) {
                acc.zero_in_b(blocksize as u64);
                checked += blocksize;
            } else {
                blocksize /= 2;
                continue;
            }
        } else {
            for i in 0..blocksize {
                let (av, bv) = (a[checked + i], b[checked + i]);
                if av == bv {
                    // equal (whether zero or not): neutral, no accounting.
                } else if av == 0 {
                    acc.zero_in_a(1);
                } else if bv == 0 {
                    acc.zero_in_b(1);
                } else {
                    return Err(NullDiffError::ContentMismatch {
                        offset: base_off + (checked + i) as u64,
                    });
                }
            }
            checked += blocksize;
        }

        // Doubled re-attack: after a successful block, grow the block size
        // back up for the untouched remainder, bounded by what's left.
        while blocksize != 0 && blocksize * 2 <= n - checked {
            blocksize *= 2;
        }
        if blocksize == 0 && checked < n {
            blocksize = largest_pow2_leq(n - checked);
        }
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
