// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Pagination controller
//!
//! Slices a view into pages. The page index is clamped whenever the view
//! shrinks below it; [`Page::corrected`] tells the caller to persist the
//! clamped index so the UI never asks for a page that doesn't exist.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Page sizes offered by the page-size selector
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Number of pages for a view of `total` rows (at least one, even when empty)
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// One page of a view
#[derive(Debug)]
pub struct Page<'v, E> {
    pub items: &'v [E],
    /// Requested index clamped into range
    pub safe_page_index: usize,
    pub page_count: usize,
    /// Rows in the whole view
    pub total: usize,
    /// Human-readable range, e.g. "11-12 of 12"
    pub range_label: String,
    /// True if the requested index was out of range and has been clamped
    pub corrected: bool,
}

impl<E> Page<'_, E> {
    pub fn has_next(&self) -> bool {
        self.safe_page_index + 1 < self.page_count
    }

    pub fn has_prev(&self) -> bool {
        self.safe_page_index > 0
    }
}

/// Slice `view` into the page at `page_index`
pub fn paginate<E>(view: &[E], page_size: usize, page_index: usize) -> Page<'_, E> {
    let page_size = page_size.max(1);
    let total = view.len();
    let pages = page_count(total, page_size);
    let safe_page_index = page_index.min(pages - 1);
    let corrected = safe_page_index != page_index;
    if corrected {
        debug!(requested = page_index, clamped = safe_page_index, "Clamped page index");
    }

    let start = (safe_page_index * page_size).min(total);
    let end = (start + page_size).min(total);

    Page {
        items: &view[start..end],
        safe_page_index,
        page_count: pages,
        total,
        range_label: range_label(start, end, total),
        corrected,
    }
}

fn range_label(start: usize, end: usize, total: usize) -> String {
    if total == 0 {
        "0 of 0".to_string()
    } else {
        format!("{}-{} of {}", start + 1, end, total)
    }
}

/// Page size and index for one list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    page_size: usize,
    page_index: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_index: 0,
        }
    }
}

impl Pagination {
    /// Start at the first page with `page_size`, falling back to the default
    /// size if it isn't one of [`PAGE_SIZE_OPTIONS`]
    pub fn new(page_size: usize) -> Self {
        let mut pagination = Self::default();
        pagination.set_page_size(page_size);
        pagination
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    /// Change the page size and go back to the first page
    ///
    /// Sizes outside [`PAGE_SIZE_OPTIONS`] are ignored.
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&page_size) {
            debug!(page_size, "Ignoring unsupported page size");
            return false;
        }
        self.page_size = page_size;
        self.page_index = 0;
        true
    }

    /// Request a page; out-of-range indexes are clamped on the next render
    pub fn set_page_index(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn first_page(&mut self) {
        self.page_index = 0;
    }

    pub fn last_page(&mut self, total: usize) {
        self.page_index = page_count(total, self.page_size) - 1;
    }

    pub fn next_page(&mut self, total: usize) {
        let last = page_count(total, self.page_size) - 1;
        self.page_index = (self.page_index + 1).min(last);
    }

    pub fn prev_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Slice a view with the current settings, persisting a clamped index
    pub fn apply<'v, E>(&mut self, view: &'v [E]) -> Page<'v, E> {
        let page = paginate(view, self.page_size, self.page_index);
        if page.corrected {
            self.page_index = page.safe_page_index;
        }
        page
    }
}
