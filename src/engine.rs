// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Filter/sort engine
//!
//! Computes the filtered-and-sorted view of a row snapshot together with
//! per-column facet values and counts for the multi-select filter UI.
//!
//! ## Filter semantics
//!
//! - A column absent from the filter state places no constraint on it
//! - An empty accepted set excludes every row
//! - Multiple columns combine with AND, values within a column with OR
//!
//! ## Facets
//!
//! Facets for column X are counted over the rows that pass every active
//! constraint *except* X's own filter, so the UI can show how many rows each
//! candidate value would yield, including values not currently selected.
//!
//! Requests naming unknown or non-operable columns are ignored, never
//! surfaced as errors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use crate::schema::{CellValue, Column, ColumnKind, Schema, compare_cells, compare_text};
use crate::search::SearchQuery;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// Apply the direction to an ascending comparison result
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Active sort column and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: String,
    pub order: SortOrder,
}

impl SortState {
    pub fn new(key: impl Into<String>, order: SortOrder) -> Self {
        Self {
            key: key.into(),
            order,
        }
    }

    pub fn ascending(key: impl Into<String>) -> Self {
        Self::new(key, SortOrder::Asc)
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self::new(key, SortOrder::Desc)
    }

    /// Next sort state after the user clicks `column_id`
    ///
    /// Clicking the active column toggles the order; any other sortable column
    /// becomes the key in ascending order. Non-sortable columns are ignored.
    pub fn clicked<T>(current: Option<&SortState>, schema: &Schema<T>, column_id: &str) -> Option<SortState> {
        if !schema.is_sortable(column_id) {
            debug!(column = column_id, "Ignoring sort on non-sortable column");
            return current.cloned();
        }
        match current {
            Some(sort) if sort.key == column_id => Some(SortState::new(column_id, sort.order.toggled())),
            _ => Some(SortState::ascending(column_id)),
        }
    }
}

/// Accepted values per filterable column, plus the free-text search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    columns: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "SearchQuery::is_empty")]
    search: SearchQuery,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace or clear one column's filter
    ///
    /// Returns `false` (and changes nothing) for unknown or non-filterable
    /// columns.
    pub fn set_column<T>(
        &mut self,
        schema: &Schema<T>,
        column_id: &str,
        values: Option<BTreeSet<String>>,
    ) -> bool {
        if !schema.is_filterable(column_id) {
            debug!(column = column_id, "Ignoring filter on non-filterable column");
            return false;
        }
        match values {
            Some(values) => {
                self.columns.insert(column_id.to_string(), values);
            }
            None => {
                self.columns.remove(column_id);
            }
        }
        true
    }

    /// Accepted values for a column, `None` if unconstrained
    pub fn get(&self, column_id: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(column_id)
    }

    pub fn columns(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.columns
    }

    pub fn search(&self) -> &SearchQuery {
        &self.search
    }

    pub fn set_search(&mut self, query: SearchQuery) {
        self.search = query;
    }

    /// Drop every column filter and the search text
    pub fn clear(&mut self) {
        self.columns.clear();
        self.search = SearchQuery::default();
    }

    /// True if any column filter or a non-empty search is set
    pub fn is_active(&self) -> bool {
        !self.columns.is_empty() || !self.search.is_empty()
    }
}

/// Output of [`compute`]
#[derive(Debug)]
pub struct ComputedView<'a, T> {
    /// Filtered-and-sorted rows
    pub items: Vec<&'a T>,
    /// Facet values per filterable column, in ascending order
    pub distinct_values_by_column: BTreeMap<String, Vec<String>>,
    /// Facet counts per filterable column
    pub value_counts_by_column: BTreeMap<String, BTreeMap<String, usize>>,
}

impl<T> ComputedView<'_, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// How a row fares against the active column filters
#[derive(Clone, Copy)]
enum FilterOutcome<'f> {
    Pass,
    /// Fails exactly one column's filter (still counts toward that facet)
    FailsOnly(&'f str),
    Fails,
}

/// Compute the filtered-and-sorted view and facets
///
/// Filter entries naming unknown or non-filterable columns and a sort naming
/// a non-sortable column are ignored. Without a usable sort the view is
/// ordered by the schema's natural key. Rows are never mutated.
pub fn compute<'a, T>(
    rows: &'a [T],
    schema: &Schema<T>,
    filters: &FilterState,
    sort: Option<&SortState>,
) -> ComputedView<'a, T> {
    let active: Vec<(&Column<T>, &BTreeSet<String>)> = filters
        .columns
        .iter()
        .filter_map(|(id, accepted)| match schema.column(id) {
            Some(col) if col.filterable => Some((col, accepted)),
            _ => {
                debug!(column = %id, "Skipping filter on unknown or non-filterable column");
                None
            }
        })
        .collect();
    let matcher = filters.search.compile(schema);
    let facet_columns: Vec<&Column<T>> = schema.filterable_columns().collect();

    let mut items = Vec::new();
    let mut counts: BTreeMap<String, BTreeMap<String, usize>> = facet_columns
        .iter()
        .map(|c| (c.id.clone(), BTreeMap::new()))
        .collect();

    for row in rows {
        if !matcher.matches(schema, row) {
            continue;
        }

        let outcome = evaluate_filters(&active, row);
        if matches!(outcome, FilterOutcome::Pass) {
            items.push(row);
        }

        for col in &facet_columns {
            let counts_row = match outcome {
                FilterOutcome::Pass => true,
                FilterOutcome::FailsOnly(failed) => failed == col.id,
                FilterOutcome::Fails => false,
            };
            if counts_row && let Some(column_counts) = counts.get_mut(&col.id) {
                *column_counts.entry(col.text_value(row)).or_insert(0) += 1;
            }
        }
    }

    sort_rows(&mut items, schema, sort);

    let distinct_values_by_column = counts
        .iter()
        .map(|(id, values)| {
            let mut distinct: Vec<String> = values.keys().cloned().collect();
            sort_facet_values(&mut distinct);
            (id.clone(), distinct)
        })
        .collect();

    trace!(
        rows = rows.len(),
        matched = items.len(),
        filters = active.len(),
        "Computed list view"
    );

    ComputedView {
        items,
        distinct_values_by_column,
        value_counts_by_column: counts,
    }
}

fn evaluate_filters<'f, T>(active: &[(&'f Column<T>, &BTreeSet<String>)], row: &T) -> FilterOutcome<'f> {
    let mut failed: Option<&'f str> = None;
    for &(col, accepted) in active {
        if accepted.contains(&col.text_value(row)) {
            continue;
        }
        if failed.is_some() {
            return FilterOutcome::Fails;
        }
        failed = Some(col.id.as_str());
    }
    match failed {
        None => FilterOutcome::Pass,
        Some(id) => FilterOutcome::FailsOnly(id),
    }
}

/// Stable sort by the active column, ties broken by natural key ascending
fn sort_rows<T>(items: &mut Vec<&T>, schema: &Schema<T>, sort: Option<&SortState>) {
    let column = sort.and_then(|s| match schema.column(&s.key) {
        Some(col) if col.sortable => Some((col, s.order)),
        _ => {
            debug!(column = %s.key, "Sort column is not sortable, using natural order");
            None
        }
    });

    // Decorate once so accessors aren't re-run for every comparison
    let mut decorated: Vec<(&T, Option<CellValue>, String)> = items
        .iter()
        .map(|row| {
            let value = match column {
                Some((col, _)) if !matches!(col.kind, ColumnKind::Custom(_)) => Some(col.value(row)),
                _ => None,
            };
            (*row, value, schema.natural_key(row))
        })
        .collect();

    decorated.sort_by(|(a, a_value, a_key), (b, b_value, b_key)| {
        let primary = match (column, a_value, b_value) {
            (Some((_, order)), Some(x), Some(y)) => order.apply(compare_cells(x, y)),
            (Some((col, order)), _, _) => order.apply(col.compare(a, b)),
            (None, _, _) => Ordering::Equal,
        };
        primary.then_with(|| compare_text(a_key, b_key))
    });

    *items = decorated.into_iter().map(|(row, _, _)| row).collect();
}

/// Order facet values numerically when they all parse as numbers
fn sort_facet_values(values: &mut [String]) {
    let numeric: Option<Vec<f64>> = values.iter().map(|v| v.parse::<f64>().ok()).collect();
    if numeric.is_some() {
        values.sort_by(|a, b| {
            let x = a.parse::<f64>().unwrap_or(f64::NAN);
            let y = b.parse::<f64>().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        });
    } else {
        values.sort_by(|a, b| compare_text(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_rows::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn names<T: HasName>(items: &[&T]) -> Vec<String> {
        items.iter().map(|r| r.name().to_string()).collect()
    }

    trait HasName {
        fn name(&self) -> &str;
    }

    impl HasName for TestRow {
        fn name(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn test_no_filters_returns_everything_sorted() {
        let rows = twelve_rows();
        let schema = test_schema();
        let view = compute(&rows, &schema, &FilterState::new(), Some(&SortState::descending("name")));
        assert_eq!(view.len(), 12);
        assert_eq!(view.items[0].name, "app-11");
        assert_eq!(view.items[11].name, "app-00");
    }

    #[test]
    fn test_scenario_a_facet_counts_without_filters() {
        let rows = twelve_rows();
        let schema = test_schema();
        let view = compute(&rows, &schema, &FilterState::new(), None);

        let ns_counts = &view.value_counts_by_column["namespace"];
        let expected: BTreeMap<String, usize> =
            [("a".to_string(), 5), ("b".to_string(), 4), ("c".to_string(), 3)].into();
        assert_eq!(ns_counts, &expected);
        assert_eq!(view.distinct_values_by_column["namespace"], vec!["a", "b", "c"]);
    }

    #[test]
    fn test_or_within_column_and_across_columns() {
        let rows = twelve_rows();
        let schema = test_schema();
        let mut filters = FilterState::new();
        filters.set_column(&schema, "namespace", Some(set(&["a", "b"])));
        assert_eq!(compute(&rows, &schema, &filters, None).len(), 9);

        filters.set_column(&schema, "status", Some(set(&["Degraded"])));
        let view = compute(&rows, &schema, &filters, None);
        assert_eq!(names(&view.items), vec!["app-00", "app-07"]);
    }

    #[test]
    fn test_empty_set_excludes_everything() {
        let rows = twelve_rows();
        let schema = test_schema();
        let mut filters = FilterState::new();
        filters.set_column(&schema, "namespace", Some(BTreeSet::new()));
        let view = compute(&rows, &schema, &filters, None);
        assert!(view.is_empty());
        assert!(filters.is_active());
        // The namespace facet still shows every candidate value
        assert_eq!(view.value_counts_by_column["namespace"].len(), 3);
    }

    #[test]
    fn test_facets_exclude_own_filter() {
        let rows = twelve_rows();
        let schema = test_schema();
        let mut filters = FilterState::new();
        filters.set_column(&schema, "namespace", Some(set(&["a"])));
        filters.set_column(&schema, "status", Some(set(&["Running"])));
        let view = compute(&rows, &schema, &filters, None);

        // namespace facet: filtered by status only (10 Running rows)
        let ns = &view.value_counts_by_column["namespace"];
        assert_eq!(ns["a"], 4);
        assert_eq!(ns["b"], 3);
        assert_eq!(ns["c"], 3);

        // status facet: filtered by namespace only (5 rows in a)
        let status = &view.value_counts_by_column["status"];
        assert_eq!(status["Running"], 4);
        assert_eq!(status["Degraded"], 1);

        // replicas facet: filtered by both
        assert_eq!(view.value_counts_by_column["replicas"].values().sum::<usize>(), 4);
    }

    #[test]
    fn test_numeric_facet_values_sort_numerically() {
        let rows = twelve_rows();
        let schema = test_schema();
        let view = compute(&rows, &schema, &FilterState::new(), None);
        let replicas = &view.distinct_values_by_column["replicas"];
        assert_eq!(replicas.first().map(String::as_str), Some("0"));
        assert_eq!(replicas.last().map(String::as_str), Some("11"));
        assert_eq!(replicas[2], "2");
    }

    #[test]
    fn test_filter_on_unknown_or_non_filterable_column_is_noop() {
        let schema = test_schema();
        let mut filters = FilterState::new();
        assert!(!filters.set_column(&schema, "name", Some(set(&["x"]))));
        assert!(!filters.set_column(&schema, "missing", Some(set(&["x"]))));
        assert!(!filters.is_active());
    }

    #[test]
    fn test_deserialized_invalid_filter_keys_are_ignored() {
        let rows = twelve_rows();
        let schema = test_schema();
        let filters: FilterState =
            serde_json::from_str(r#"{"columns": {"name": ["nothing"], "bogus": []}}"#).unwrap();
        assert_eq!(compute(&rows, &schema, &filters, None).len(), 12);
    }

    #[test]
    fn test_clear_filters() {
        let schema = test_schema();
        let mut filters = FilterState::new();
        filters.set_column(&schema, "status", Some(set(&["Running"])));
        filters.set_search(SearchQuery::new("app"));
        filters.clear();
        assert!(!filters.is_active());
        assert_eq!(filters, FilterState::new());
    }

    #[test]
    fn test_search_constrains_every_facet() {
        let rows = twelve_rows();
        let schema = test_schema();
        let mut filters = FilterState::new();
        filters.set_search(SearchQuery::new("ns:b"));
        assert!(filters.is_active());
        let view = compute(&rows, &schema, &filters, None);
        assert_eq!(view.len(), 4);
        assert_eq!(view.value_counts_by_column["namespace"].len(), 1);
        assert_eq!(view.value_counts_by_column["status"]["Degraded"], 1);
    }

    #[test]
    fn test_numeric_sort_and_tie_break() {
        let schema = test_schema();
        let rows = vec![
            row("zeta", "a", "Running", 10.0),
            row("alpha", "a", "Running", 9.0),
            row("beta", "a", "Running", 10.0),
        ];
        let asc = compute(&rows, &schema, &FilterState::new(), Some(&SortState::ascending("replicas")));
        assert_eq!(names(&asc.items), vec!["alpha", "beta", "zeta"]);

        // Ties stay in ascending name order even when descending
        let desc = compute(&rows, &schema, &FilterState::new(), Some(&SortState::descending("replicas")));
        assert_eq!(names(&desc.items), vec!["beta", "zeta", "alpha"]);
    }

    #[test]
    fn test_sort_on_non_sortable_column_falls_back_to_natural_order() {
        let schema = test_schema();
        let rows = vec![row("b", "x", "Running", 1.0), row("a", "y", "Running", 2.0)];
        let view = compute(&rows, &schema, &FilterState::new(), Some(&SortState::descending("notes")));
        assert_eq!(names(&view.items), vec!["a", "b"]);
    }

    #[test]
    fn test_custom_comparator_is_inverted_for_desc() {
        let schema = Schema::new(
            vec![
                Column::text("name", "Name", |r: &TestRow| r.name.clone()).sortable(),
                Column::custom(
                    "len",
                    "Length",
                    |r: &TestRow| CellValue::from(r.name.len() as u64),
                    |a: &TestRow, b: &TestRow| a.name.len().cmp(&b.name.len()),
                )
                .sortable(),
            ],
            |r: &TestRow| r.name.clone(),
        )
        .unwrap();
        let rows = vec![
            row("ccc", "a", "Running", 0.0),
            row("a", "a", "Running", 0.0),
            row("bb", "a", "Running", 0.0),
        ];
        let asc = compute(&rows, &schema, &FilterState::new(), Some(&SortState::ascending("len")));
        assert_eq!(names(&asc.items), vec!["a", "bb", "ccc"]);
        let desc = compute(&rows, &schema, &FilterState::new(), Some(&SortState::descending("len")));
        assert_eq!(names(&desc.items), vec!["ccc", "bb", "a"]);
    }

    #[test]
    fn test_sort_clicked_toggles() {
        let schema = test_schema();
        let first = SortState::clicked(None, &schema, "namespace").unwrap();
        assert_eq!(first, SortState::ascending("namespace"));
        let second = SortState::clicked(Some(&first), &schema, "namespace").unwrap();
        assert_eq!(second.order, SortOrder::Desc);
        let other = SortState::clicked(Some(&second), &schema, "status").unwrap();
        assert_eq!(other, SortState::ascending("status"));
        // Non-sortable column keeps the previous state
        let kept = SortState::clicked(Some(&other), &schema, "notes");
        assert_eq!(kept, Some(other));
    }

    #[test]
    fn test_input_rows_untouched() {
        let rows = twelve_rows();
        let before = rows.clone();
        let schema = test_schema();
        let _ = compute(&rows, &schema, &FilterState::new(), Some(&SortState::descending("replicas")));
        assert_eq!(rows, before);
    }
}
