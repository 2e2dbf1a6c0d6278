// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Column schema for list tables
//!
//! A schema is a static description of a table's columns plus the key
//! function that gives each row a stable identity. Pages supply it; the
//! engine, pagination, grouping, layout and export all consume it.
//!
//! Accessors must be pure: they are called repeatedly while filtering,
//! sorting and computing facets.

use anyhow::{Result, bail};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Default column width in pixels
pub const DEFAULT_COLUMN_WIDTH: u32 = 150;

/// Default minimum column width in pixels
pub const DEFAULT_MIN_WIDTH: u32 = 60;

/// Value extracted from a row for one column
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Stringified form used for filtering, facets and export
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            // Integral numbers print without a trailing ".0" so "3" filters as "3"
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

/// Compare two cell values the way an untyped column sorts them
///
/// Numbers compare numerically, text compares case-insensitively with the
/// exact string as a tie-breaker, and numbers sort before text.
pub fn compare_cells(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x.total_cmp(y),
        (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
        (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
        (CellValue::Text(x), CellValue::Text(y)) => compare_text(x, y),
    }
}

/// Case-insensitive string comparison with a deterministic tie-breaker
///
/// Strings compare by their Unicode lowercase form, then by raw bytes. There is
/// no locale collation: accented letters order by code point, after `z`.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

pub type Accessor<T> = Arc<dyn Fn(&T) -> CellValue + Send + Sync>;
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;
pub type KeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// How a column's values sort
pub enum ColumnKind<T> {
    /// Case-insensitive string ordering, see [`compare_text`]
    ///
    /// No locale collation is applied.
    Text,
    /// Numeric ordering
    Number,
    /// Page-supplied ascending comparator
    Custom(Comparator<T>),
}

impl<T> Clone for ColumnKind<T> {
    fn clone(&self) -> Self {
        match self {
            ColumnKind::Text => ColumnKind::Text,
            ColumnKind::Number => ColumnKind::Number,
            ColumnKind::Custom(cmp) => ColumnKind::Custom(Arc::clone(cmp)),
        }
    }
}

impl<T> fmt::Debug for ColumnKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => f.write_str("Text"),
            ColumnKind::Number => f.write_str("Number"),
            ColumnKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// One table column
///
/// # Examples
///
/// ```ignore
/// let columns = vec![
///     Column::text("name", "Name", |p: &Pod| p.name.clone()).sortable().always_visible(),
///     Column::text("namespace", "Namespace", |p: &Pod| p.namespace.clone()).sortable().filterable(),
///     Column::number("restarts", "Restarts", |p: &Pod| p.restarts as f64).sortable(),
/// ];
/// ```
pub struct Column<T> {
    /// Identifier, unique within a schema
    pub id: String,
    /// Header text
    pub label: String,
    pub kind: ColumnKind<T>,
    accessor: Accessor<T>,
    pub sortable: bool,
    pub filterable: bool,
    pub default_width: u32,
    pub min_width: u32,
    pub default_visible: bool,
    /// Column can never be hidden (typically the name column)
    pub always_visible: bool,
}

impl<T> Column<T> {
    fn with_kind<F>(id: &str, label: &str, kind: ColumnKind<T>, accessor: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            accessor: Arc::new(accessor),
            sortable: false,
            filterable: false,
            default_width: DEFAULT_COLUMN_WIDTH,
            min_width: DEFAULT_MIN_WIDTH,
            default_visible: true,
            always_visible: false,
        }
    }

    /// Create a string-valued column
    pub fn text<F>(id: &str, label: &str, accessor: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::with_kind(id, label, ColumnKind::Text, move |row| {
            CellValue::Text(accessor(row))
        })
    }

    /// Create a number-valued column
    pub fn number<F>(id: &str, label: &str, accessor: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        Self::with_kind(id, label, ColumnKind::Number, move |row| {
            CellValue::Number(accessor(row))
        })
    }

    /// Create a column with an arbitrary accessor and a custom comparator
    ///
    /// The comparator is written ascending-only; descending order is applied
    /// by the engine.
    pub fn custom<F, C>(id: &str, label: &str, accessor: F, compare: C) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self::with_kind(id, label, ColumnKind::Custom(Arc::new(compare)), accessor)
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    /// Set the default and minimum width (the minimum never exceeds the default)
    pub fn width(mut self, default_width: u32, min_width: u32) -> Self {
        self.min_width = min_width.min(default_width);
        self.default_width = default_width;
        self
    }

    /// Hidden until the user shows it
    pub fn hidden(mut self) -> Self {
        self.default_visible = false;
        self.always_visible = false;
        self
    }

    pub fn always_visible(mut self) -> Self {
        self.always_visible = true;
        self.default_visible = true;
        self
    }

    pub fn value(&self, row: &T) -> CellValue {
        (self.accessor)(row)
    }

    /// Stringified value, as used by filters and facets
    pub fn text_value(&self, row: &T) -> String {
        self.value(row).to_text()
    }

    pub fn accessor(&self) -> Accessor<T> {
        Arc::clone(&self.accessor)
    }

    /// Ascending comparison of two rows by this column
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        match &self.kind {
            ColumnKind::Custom(cmp) => cmp(a, b),
            ColumnKind::Text | ColumnKind::Number => compare_cells(&self.value(a), &self.value(b)),
        }
    }

    /// Clamp a requested width to this column's minimum
    pub fn clamp_width(&self, width: u32) -> u32 {
        width.max(self.min_width)
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            label: self.label.clone(),
            kind: self.kind.clone(),
            accessor: Arc::clone(&self.accessor),
            sortable: self.sortable,
            filterable: self.filterable,
            default_width: self.default_width,
            min_width: self.min_width,
            default_visible: self.default_visible,
            always_visible: self.always_visible,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("default_width", &self.default_width)
            .field("min_width", &self.min_width)
            .field("default_visible", &self.default_visible)
            .field("always_visible", &self.always_visible)
            .finish()
    }
}

/// Validated set of columns plus the row identity function
pub struct Schema<T> {
    columns: Vec<Column<T>>,
    key: KeyFn<T>,
    /// Column used to break sort ties; falls back to the row key
    natural_key: Option<String>,
}

impl<T> Schema<T> {
    /// Build a schema, rejecting empty or duplicate column ids
    ///
    /// `key` produces the composite key used for selection and export scope,
    /// e.g. `namespace/name` or `name` for cluster-scoped resources.
    pub fn new<K>(columns: Vec<Column<T>>, key: K) -> Result<Self>
    where
        K: Fn(&T) -> String + Send + Sync + 'static,
    {
        let mut seen = HashSet::new();
        for col in &columns {
            if col.id.trim().is_empty() {
                bail!("Column with label '{}' has an empty id", col.label);
            }
            if !seen.insert(col.id.as_str()) {
                bail!("Duplicate column id '{}'", col.id);
            }
        }

        let natural_key = columns
            .iter()
            .find(|c| c.id == "name")
            .map(|c| c.id.clone());

        Ok(Self {
            columns,
            key: Arc::new(key),
            natural_key,
        })
    }

    /// Use a specific column to break sort ties
    pub fn with_natural_key(mut self, column_id: &str) -> Result<Self> {
        if self.column(column_id).is_none() {
            bail!("Natural key column '{}' is not part of the schema", column_id);
        }
        self.natural_key = Some(column_id.to_string());
        Ok(self)
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn column(&self, id: &str) -> Option<&Column<T>> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Look up a column by id or label, ignoring case
    pub fn find_column(&self, name: &str) -> Option<&Column<T>> {
        self.columns
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(name) || c.label.eq_ignore_ascii_case(name))
    }

    pub fn is_filterable(&self, id: &str) -> bool {
        self.column(id).is_some_and(|c| c.filterable)
    }

    pub fn is_sortable(&self, id: &str) -> bool {
        self.column(id).is_some_and(|c| c.sortable)
    }

    pub fn filterable_columns(&self) -> impl Iterator<Item = &Column<T>> {
        self.columns.iter().filter(|c| c.filterable)
    }

    /// First sortable column, used when no valid default sort is supplied
    pub fn first_sortable(&self) -> Option<&Column<T>> {
        self.columns.iter().find(|c| c.sortable)
    }

    /// Composite key identifying a row
    pub fn row_key(&self, row: &T) -> String {
        (self.key)(row)
    }

    pub fn key_fn(&self) -> KeyFn<T> {
        Arc::clone(&self.key)
    }

    /// Value used to break sort ties
    pub fn natural_key(&self, row: &T) -> String {
        match self.natural_key.as_deref().and_then(|id| self.column(id)) {
            Some(col) => col.text_value(row),
            None => self.row_key(row),
        }
    }

    /// All column values of a row joined by spaces (search haystack)
    pub fn row_text(&self, row: &T) -> String {
        self.columns
            .iter()
            .map(|c| c.text_value(row))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            key: Arc::clone(&self.key),
            natural_key: self.natural_key.clone(),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("columns", &self.columns)
            .field("natural_key", &self.natural_key)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_rows {
    //! Shared fixture rows for module tests

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct TestRow {
        pub name: String,
        pub namespace: String,
        pub status: String,
        pub replicas: f64,
    }

    pub fn row(name: &str, namespace: &str, status: &str, replicas: f64) -> TestRow {
        TestRow {
            name: name.to_string(),
            namespace: namespace.to_string(),
            status: status.to_string(),
            replicas,
        }
    }

    pub fn test_schema() -> Schema<TestRow> {
        Schema::new(
            vec![
                Column::text("name", "Name", |r: &TestRow| r.name.clone())
                    .sortable()
                    .always_visible()
                    .width(200, 120),
                Column::text("namespace", "Namespace", |r: &TestRow| r.namespace.clone())
                    .sortable()
                    .filterable(),
                Column::text("status", "Status", |r: &TestRow| r.status.clone())
                    .sortable()
                    .filterable(),
                Column::number("replicas", "Replicas", |r: &TestRow| r.replicas)
                    .sortable()
                    .filterable(),
                Column::text("notes", "Notes", |_r: &TestRow| String::new()).hidden(),
            ],
            |r: &TestRow| format!("{}/{}", r.namespace, r.name),
        )
        .expect("valid test schema")
    }

    /// 12 rows: namespaces {a:5, b:4, c:3}, two of them Degraded
    pub fn twelve_rows() -> Vec<TestRow> {
        let mut rows = Vec::new();
        for i in 0..5 {
            let status = if i == 0 { "Degraded" } else { "Running" };
            rows.push(row(&format!("app-{:02}", i), "a", status, i as f64));
        }
        for i in 5..9 {
            let status = if i == 7 { "Degraded" } else { "Running" };
            rows.push(row(&format!("app-{:02}", i), "b", status, i as f64));
        }
        for i in 9..12 {
            rows.push(row(&format!("app-{:02}", i), "c", "Running", i as f64));
        }
        rows
    }
}
