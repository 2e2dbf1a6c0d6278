// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-list view state
//!
//! [`ListState`] bundles everything one list instance remembers between
//! renders: filters and search, sort, pagination, selection and grouping.
//! It is plain data (serde) so a front end can persist or restore it.
//! [`ListState::render`] runs the engine, pagination and grouping over a row
//! snapshot and writes back a clamped page index.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::engine::{FilterState, SortState, compute};
use crate::grouping::{Group, GroupBy, GroupCollapse, group};
use crate::pagination::Pagination;
use crate::schema::Schema;
use crate::search::SearchQuery;
use crate::selection::{SelectAllState, Selection};

/// View state of one list instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListState {
    #[serde(default)]
    filters: FilterState,
    #[serde(default)]
    sort: Option<SortState>,
    #[serde(default)]
    default_sort: Option<SortState>,
    #[serde(default)]
    pagination: Pagination,
    #[serde(default)]
    selection: Selection,
    #[serde(default)]
    group_by: Option<String>,
    #[serde(default)]
    collapsed: GroupCollapse,
}

impl ListState {
    /// Fresh state for a list
    ///
    /// An invalid or missing default sort falls back to the first sortable
    /// column, ascending. Unsupported page sizes fall back to the default.
    pub fn new<T>(schema: &Schema<T>, default_sort: Option<SortState>, page_size: usize) -> Self {
        let default_sort = match default_sort {
            Some(sort) if schema.is_sortable(&sort.key) => Some(sort),
            other => {
                if let Some(sort) = other {
                    debug!(column = %sort.key, "Default sort column is not sortable");
                }
                schema.first_sortable().map(|c| SortState::ascending(c.id.clone()))
            }
        };
        Self {
            filters: FilterState::new(),
            sort: default_sort.clone(),
            default_sort,
            pagination: Pagination::new(page_size),
            selection: Selection::new(),
            group_by: None,
            collapsed: GroupCollapse::new(),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Replace or clear one column's filter; no-op for non-filterable columns
    pub fn set_column_filter<T>(
        &mut self,
        schema: &Schema<T>,
        column_id: &str,
        values: Option<BTreeSet<String>>,
    ) -> bool {
        self.filters.set_column(schema, column_id, values)
    }

    pub fn set_search(&mut self, query: &str) {
        self.filters.set_search(SearchQuery::new(query));
    }

    /// Drop every filter and the search text; sort is left alone
    pub fn clear_all_filters(&mut self) {
        self.filters.clear();
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.is_active()
    }

    pub fn sort(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Header click on `column_id`: toggle if active, else sort ascending
    ///
    /// Returns `false` if the column isn't sortable.
    pub fn set_sort<T>(&mut self, schema: &Schema<T>, column_id: &str) -> bool {
        if !schema.is_sortable(column_id) {
            debug!(column = column_id, "Ignoring sort on non-sortable column");
            return false;
        }
        self.sort = SortState::clicked(self.sort.as_ref(), schema, column_id);
        true
    }

    /// Set an explicit sort, ignored for non-sortable columns
    pub fn set_sort_state<T>(&mut self, schema: &Schema<T>, sort: SortState) -> bool {
        if !schema.is_sortable(&sort.key) {
            debug!(column = %sort.key, "Ignoring sort on non-sortable column");
            return false;
        }
        self.sort = Some(sort);
        true
    }

    pub fn reset_sort(&mut self) {
        self.sort = self.default_sort.clone();
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        self.pagination.set_page_size(page_size)
    }

    /// Request a page; clamped on the next render
    pub fn set_page(&mut self, page_index: usize) {
        self.pagination.set_page_index(page_index);
    }

    pub fn next_page(&mut self) {
        self.pagination
            .set_page_index(self.pagination.page_index().saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.pagination.prev_page();
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn group_by(&self) -> Option<&str> {
        self.group_by.as_deref()
    }

    /// Switch grouping mode; `None` turns grouping off
    ///
    /// Unknown columns are ignored. Changing the mode expands every group.
    pub fn set_group_by<T>(&mut self, schema: &Schema<T>, column_id: Option<&str>) -> bool {
        if let Some(id) = column_id
            && schema.column(id).is_none()
        {
            debug!(column = id, "Ignoring grouping by unknown column");
            return false;
        }
        let next = column_id.map(str::to_string);
        if next != self.group_by {
            self.group_by = next;
            self.collapsed.expand_all();
        }
        true
    }

    /// Flip a group's collapse state; returns whether it is now collapsed
    pub fn toggle_group(&mut self, group_key: &str) -> bool {
        self.collapsed.toggle(group_key)
    }

    pub fn collapsed(&self) -> &GroupCollapse {
        &self.collapsed
    }

    /// Compute everything a front end needs to draw the list
    pub fn render<'a, T: 'static>(&mut self, rows: &'a [T], schema: &Schema<T>) -> ListOutput<'a, T> {
        let view = compute(rows, schema, &self.filters, self.sort.as_ref());

        let page = self.pagination.apply(&view.items);
        let page_items: Vec<&'a T> = page.items.to_vec();
        let page_index = page.safe_page_index;
        let page_count = page.page_count;
        let range_label = page.range_label.clone();
        let (has_next, has_prev) = (page.has_next(), page.has_prev());

        let page_keys: Vec<String> = page_items.iter().map(|r| schema.row_key(r)).collect();
        let groups = self
            .group_by
            .as_deref()
            .and_then(|id| GroupBy::from_schema(schema, id))
            .map(|by| group(&page_items, &by));

        ListOutput {
            total: view.items.len(),
            view: view.items,
            distinct_values_by_column: view.distinct_values_by_column,
            value_counts_by_column: view.value_counts_by_column,
            select_all: self.selection.page_state(&page_keys),
            page_items,
            page_keys,
            page_index,
            page_count,
            range_label,
            has_next,
            has_prev,
            groups,
            has_active_filters: self.filters.is_active(),
            selected_count: self.selection.len(),
        }
    }
}

/// Result of [`ListState::render`]
#[derive(Debug)]
pub struct ListOutput<'a, T> {
    /// Filtered-and-sorted rows (every page)
    pub view: Vec<&'a T>,
    pub distinct_values_by_column: BTreeMap<String, Vec<String>>,
    pub value_counts_by_column: BTreeMap<String, BTreeMap<String, usize>>,
    pub total: usize,
    pub page_items: Vec<&'a T>,
    /// Row keys of `page_items`, in the same order
    pub page_keys: Vec<String>,
    pub page_index: usize,
    pub page_count: usize,
    pub range_label: String,
    pub has_next: bool,
    pub has_prev: bool,
    /// Groups of the current page when a grouping mode is active
    pub groups: Option<Vec<Group<'a, T>>>,
    pub select_all: SelectAllState,
    pub has_active_filters: bool,
    pub selected_count: usize,
}
