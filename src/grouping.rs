// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Grouping layer
//!
//! Partitions the rows of the *current page* by a derived key (namespace,
//! storage class, ...). Grouping runs after pagination, so a group can span
//! several pages and its count only reflects the rows on this page.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::schema::{Column, KeyFn, Schema};

/// Label shown for rows whose group key is empty (e.g. cluster-scoped rows)
pub const EMPTY_GROUP_LABEL: &str = "(none)";

/// Grouping key and label functions
pub struct GroupBy<T> {
    /// Column id (or other identifier) this grouping derives from
    pub id: String,
    key: KeyFn<T>,
    label: Option<KeyFn<T>>,
}

impl<T> GroupBy<T> {
    pub fn new<K>(id: &str, key: K) -> Self
    where
        K: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            key: Arc::new(key),
            label: None,
        }
    }

    /// Use a display label that differs from the key
    pub fn with_label<L>(mut self, label: L) -> Self
    where
        L: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.label = Some(Arc::new(label));
        self
    }

    /// Group by a column's stringified value
    pub fn column(column: &Column<T>) -> Self
    where
        T: 'static,
    {
        let accessor = column.accessor();
        Self {
            id: column.id.clone(),
            key: Arc::new(move |row: &T| accessor(row).to_text()),
            label: None,
        }
    }

    /// Group by a schema column, `None` if the column doesn't exist
    pub fn from_schema(schema: &Schema<T>, column_id: &str) -> Option<Self>
    where
        T: 'static,
    {
        schema.column(column_id).map(Self::column)
    }

    pub fn key(&self, row: &T) -> String {
        (self.key)(row)
    }

    pub fn label(&self, row: &T) -> String {
        let label = match &self.label {
            Some(label) => label(row),
            None => self.key(row),
        };
        if label.is_empty() {
            EMPTY_GROUP_LABEL.to_string()
        } else {
            label
        }
    }
}

impl<T> fmt::Debug for GroupBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBy").field("id", &self.id).finish()
    }
}

/// Rows sharing one group key
#[derive(Debug)]
pub struct Group<'a, T> {
    pub group_key: String,
    pub label: String,
    pub rows: Vec<&'a T>,
}

impl<T> Group<'_, T> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition a page's rows into groups sorted by label
///
/// Rows keep the relative order they had on the page.
pub fn group<'a, T>(items: &[&'a T], by: &GroupBy<T>) -> Vec<Group<'a, T>> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<'a, T>> = Vec::new();

    for &row in items {
        let key = by.key(row);
        match index.get(&key) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    label: by.label(row),
                    group_key: key,
                    rows: vec![row],
                });
            }
        }
    }

    groups.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.group_key.cmp(&b.group_key)));
    groups
}

/// Collapsed group keys for one list instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupCollapse {
    collapsed: BTreeSet<String>,
}

impl GroupCollapse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, group_key: &str) -> bool {
        self.collapsed.contains(group_key)
    }

    /// Flip one group; returns whether it is now collapsed
    pub fn toggle(&mut self, group_key: &str) -> bool {
        if self.collapsed.remove(group_key) {
            false
        } else {
            self.collapsed.insert(group_key.to_string());
            true
        }
    }

    pub fn collapse_all<T>(&mut self, groups: &[Group<'_, T>]) {
        self.collapsed
            .extend(groups.iter().map(|g| g.group_key.clone()));
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }
}

/// One rendered line of a grouped table
#[derive(Debug)]
pub enum GroupedLine<'a, T> {
    Header {
        group_key: String,
        label: String,
        /// Rows of this group on the current page
        count: usize,
        collapsed: bool,
    },
    Row(&'a T),
}

/// Flatten groups into header and row lines, honoring collapse state
pub fn render_groups<'a, T>(groups: &[Group<'a, T>], collapse: &GroupCollapse) -> Vec<GroupedLine<'a, T>> {
    let mut lines = Vec::new();
    for group in groups {
        let collapsed = collapse.is_collapsed(&group.group_key);
        lines.push(GroupedLine::Header {
            group_key: group.group_key.clone(),
            label: group.label.clone(),
            count: group.rows.len(),
            collapsed,
        });
        if !collapsed {
            lines.extend(group.rows.iter().map(|&row| GroupedLine::Row(row)));
        }
    }
    lines
}
