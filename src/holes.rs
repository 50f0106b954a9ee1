//! Hole Detectors (C6)
//!
//! The boolean probes behind `has_hole` and `has_null`: one asks the
//! allocation map whether any hole exists at all, the other asks the data
//! extents whether any whole page of content is all-zero.

use crate::error::Result;
use crate::fs::{FileView, SparseCursor};
use crate::zero::is_zero;

/// True iff `view`'s file has at least one hole anywhere in `[0, len)`
/// (spec.md §4.6): a gap between two data extents, or past the last one.
///
/// Purely allocation-map based — never inspects file content. Any
/// underlying `lseek` failure (failing device, unsupported filesystem)
/// surfaces as an error rather than a boolean answer.
pub fn has_hole(view: &FileView) -> Result<bool> {
    let Some(first_data) = SparseCursor::seek_first_data(view.file())? else {
        // FileView::open already rejects fully-sparse files, but a
        // standalone caller could still hand us one.
        return Ok(view.len() > 0);
    };
    if first_data > 0 {
        return Ok(true);
    }

    let mut data = first_data;
    loop {
        let hole = SparseCursor::next_hole(view.file(), data)?;
        if hole < view.len() {
            return Ok(true);
        }
        match SparseCursor::advance(view.file(), hole)? {
            Some((d, _)) => data = d,
            None => return Ok(false),
        }
    }
}

/// True iff `view` has at least one whole page of all-zero content within
/// a data extent (spec.md §4.6) — an "embedded null page", which a hole
/// probe alone cannot see since the bytes are actually allocated.
pub fn has_embedded_null_page(view: &FileView) -> Result<bool> {
    let page = view.page_size();
    let Some(mut data) = SparseCursor::seek_first_data(view.file())? else {
        return Ok(false);
    };

    loop {
        let hole = SparseCursor::next_hole(view.file(), data)?.min(view.len());
        let mut pos = data;
        while pos < hole {
            let end = (pos + page).min(hole);
            if is_zero(view.span(pos, end)) && end - pos == page {
                return Ok(true);
            }
            pos = end;
        }
        if hole >= view.len() {
            return Ok(false);
        }
        match SparseCursor::advance(view.file(), hole)? {
            Some((d, _)) => data = d,
            None => return Ok(false),
        }
    }
}
