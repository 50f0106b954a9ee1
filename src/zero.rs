//! Zero Oracle (C3)
//!
//! Answers "is this span all zero?" and "how many non-zero bytes does it
//! contain?" against a shared, process-wide, page-sized zero reference
//! buffer, compared in page-sized chunks.

use std::sync::OnceLock;

/// Size of the process-wide zero reference buffer. Filesystem page sizes
/// larger than this are handled by chunking comparisons at this size
/// instead of the filesystem's own page size — the oracle doesn't need to
/// match page boundaries exactly, only to amortize the memcmp cost.
const ZERO_PAGE_LEN: usize = 4096;

static ZERO_PAGE: OnceLock<Box<[u8]>> = OnceLock::new();

fn zero_page() -> &'static [u8] {
    ZERO_PAGE.get_or_init(|| vec![0u8; ZERO_PAGE_LEN].into_boxed_slice())
}

/// True iff every byte in `span` is zero.
pub fn is_zero(span: &[u8]) -> bool {
    let page = zero_page();
    span.chunks(page.len()).all(|c| c == &page[..c.len()])
}

/// Sum of bytes belonging to any `chunk_size`-sized chunk of `span` that is
/// not entirely zero. A single non-zero byte within a chunk counts the
/// whole chunk — this matches the engine's page-granular accounting.
///
/// When `stop_on_mismatch` is true, returns as soon as the first non-zero
/// chunk is found (used when only the "is there any non-zero?" bit
/// matters, to avoid scanning the rest of a large span).
pub fn count_nonzero_chunks(span: &[u8], chunk_size: usize, stop_on_mismatch: bool) -> u64 {
    assert!(chunk_size > 0, "chunk_size must be positive");
    let mut total = 0u64;
    for chunk in span.chunks(chunk_size) {
        if !is_zero(chunk) {
            total += chunk.len() as u64;
            if stop_on_mismatch {
                break;
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_span_is_zero() {
        assert!(is_zero(&[]));
    }

    #[test]
    fn all_zero_span_is_zero() {
        assert!(is_zero(&vec![0u8; 9000]));
    }

    #[test]
    fn single_nonzero_byte_breaks_zero() {
        let mut buf = vec![0u8; 4096];
        buf[4095] = 1;
        assert!(!is_zero(&buf));
    }

    #[test]
    fn count_nonzero_chunks_counts_whole_chunks() {
        let mut buf = vec![0u8; 4096 * 3];
        buf[4096 + 10] = 0xAA;
        assert_eq!(count_nonzero_chunks(&buf, 4096, false), 4096);
    }

    #[test]
    fn count_nonzero_chunks_stops_early() {
        let mut buf = vec![0u8; 4096 * 4];
        buf[10] = 1;
        buf[4096 * 3 + 1] = 1;
        assert_eq!(count_nonzero_chunks(&buf, 4096, true), 4096);
    }
}
