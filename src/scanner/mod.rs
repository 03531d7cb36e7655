//! # Scanner
//!
//! This module covers exact byte-signature searches over live memory

use std::ops::Range;
use std::slice;

use memchr::memmem;
use tracing::warn;

/// Returns the offset of the first occurrence of `signature` in `haystack`.
///
/// Matches must lie entirely inside `haystack`. An empty signature never matches.
pub fn find(haystack: &[u8], signature: &[u8]) -> Option<usize> {
    if signature.is_empty() {
        return None;
    }
    memmem::find(haystack, signature)
}

/// Returns the number of non-overlapping occurrences of `signature` in `haystack`
pub fn count(haystack: &[u8], signature: &[u8]) -> usize {
    if signature.is_empty() {
        return 0;
    }
    memmem::find_iter(haystack, signature).count()
}

/// Scans the absolute address range `range` and returns the absolute address of the first occurrence of `signature`.
///
/// A signature that starts inside the range but would end past `range.end` is not a match, and nothing at or past `range.end` is read.
/// The first match always wins; further occurrences are only reported with a warning.
///
/// # Safety
///
/// Every byte in `range` must be readable for the duration of the call
pub unsafe fn scan_range(range: Range<usize>, signature: &[u8]) -> Option<usize> {
    let len = range.end.saturating_sub(range.start);
    if len == 0 {
        return None;
    }

    // Safety: caller guarantees the range is readable
    let haystack = slice::from_raw_parts(range.start as *const u8, len);

    let offset = find(haystack, signature)?;
    let rest = &haystack[offset + signature.len()..];
    let duplicates = count(rest, signature);
    if duplicates > 0 {
        warn!(
            location = format_args!("{:#x}", range.start + offset),
            duplicates, "signature is not unique, patching the first occurrence"
        );
    }

    Some(range.start + offset)
}
