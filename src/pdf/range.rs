//! Page range expressions such as `"1-3,5,7-9"`

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Parse a page range expression into the sorted, deduplicated set of
/// 1-indexed pages that exist in a document of `max_pages` pages.
///
/// Each comma-separated item is either a page number or an inclusive
/// `start-end` range. Pages outside `1..=max_pages` are dropped, as are
/// ranges whose start is past their end. Anything that is not a number
/// fails the whole expression.
pub fn parse_page_range(range: &str, max_pages: u32) -> Result<Vec<u32>> {
    let invalid = || Error::InvalidPageRange {
        range: range.to_string(),
    };

    if range.trim().is_empty() {
        return Err(invalid());
    }

    let mut pages = BTreeSet::new();

    for part in range.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid());
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (parse_page_number(start), parse_page_number(end)),
            None => {
                let page = parse_page_number(part);
                (page, page)
            }
        };
        let (start, end) = (start.ok_or_else(invalid)?, end.ok_or_else(invalid)?);

        let first = start.max(1);
        let last = end.min(max_pages);
        if first <= last {
            pages.extend(first..=last);
        }
    }

    Ok(pages.into_iter().collect())
}

/// Digits only. Numbers too large for `u32` saturate, so clamping drops them.
fn parse_page_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(s.parse().unwrap_or(u32::MAX))
}
