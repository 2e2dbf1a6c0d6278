// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Row selection
//!
//! Selection is a set of composite row keys (`namespace/name`, or `name` for
//! cluster-scoped rows). It is independent of filters, sort and page: keys
//! stay selected while hidden by a filter or sitting on another page.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tri-state of the "select all on this page" checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectAllState {
    /// Every key on the page is selected (and the page is not empty)
    Checked,
    /// Some but not all keys on the page are selected
    Indeterminate,
    Unchecked,
}

/// Selected row keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    keys: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip one key; returns whether it is now selected
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.to_string());
            true
        }
    }

    /// Select a key without toggling
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Header checkbox click for the visible page
    ///
    /// If every key on the page is already selected, they are all removed;
    /// otherwise every key on the page is added. Keys from other pages are
    /// left alone.
    pub fn toggle_all_on_page<S: AsRef<str>>(&mut self, page_keys: &[S]) {
        if self.page_state(page_keys) == SelectAllState::Checked {
            for key in page_keys {
                self.keys.remove(key.as_ref());
            }
        } else {
            self.keys
                .extend(page_keys.iter().map(|k| k.as_ref().to_string()));
        }
    }

    pub fn page_state<S: AsRef<str>>(&self, page_keys: &[S]) -> SelectAllState {
        let selected = page_keys
            .iter()
            .filter(|k| self.keys.contains(k.as_ref()))
            .count();
        match selected {
            0 => SelectAllState::Unchecked,
            n if n == page_keys.len() => SelectAllState::Checked,
            _ => SelectAllState::Indeterminate,
        }
    }

    /// Drop a key, e.g. after a confirmed delete of that resource
    pub fn remove(&mut self, key: &str) -> bool {
        self.keys.remove(key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selected keys in ascending order
    pub fn selected(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FilterState, SortState, compute};
    use crate::pagination::paginate;
    use crate::schema::test_rows::*;

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle("a/web"));
        assert!(selection.is_selected("a/web"));
        assert!(!selection.toggle("a/web"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_page_state_tristate() {
        let page = ["a/x", "a/y", "a/z"];
        let mut selection = Selection::new();
        assert_eq!(selection.page_state(&page), SelectAllState::Unchecked);
        selection.toggle("a/y");
        assert_eq!(selection.page_state(&page), SelectAllState::Indeterminate);
        selection.toggle_all_on_page(&page);
        assert_eq!(selection.page_state(&page), SelectAllState::Checked);
        selection.toggle_all_on_page(&page);
        assert_eq!(selection.page_state(&page), SelectAllState::Unchecked);
    }

    #[test]
    fn test_empty_page_is_unchecked() {
        let mut selection = Selection::new();
        selection.toggle("a/x");
        let empty: [&str; 0] = [];
        assert_eq!(selection.page_state(&empty), SelectAllState::Unchecked);
        selection.toggle_all_on_page(&empty);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_selection_spans_pages() {
        let rows = twelve_rows();
        let schema = test_schema();
        let view = compute(&rows, &schema, &FilterState::new(), Some(&SortState::ascending("name")));
        let mut selection = Selection::new();

        let first: Vec<String> = paginate(&view.items, 10, 0)
            .items
            .iter()
            .map(|r| schema.row_key(r))
            .collect();
        selection.toggle_all_on_page(&first);
        assert_eq!(selection.len(), 10);

        let second: Vec<String> = paginate(&view.items, 10, 1)
            .items
            .iter()
            .map(|r| schema.row_key(r))
            .collect();
        assert_eq!(selection.page_state(&second), SelectAllState::Unchecked);
        selection.toggle(&second[0]);
        assert_eq!(selection.page_state(&second), SelectAllState::Indeterminate);
        assert_eq!(selection.len(), 11);

        // Unselecting page 2 leaves page 1 alone
        selection.toggle_all_on_page(&second);
        assert_eq!(selection.len(), 12);
        selection.toggle_all_on_page(&second);
        assert_eq!(selection.len(), 10);
        assert_eq!(selection.page_state(&first), SelectAllState::Checked);
    }

    #[test]
    fn test_selection_survives_filter_changes() {
        let rows = twelve_rows();
        let schema = test_schema();
        let mut selection = Selection::new();
        selection.toggle("c/app-11");

        let mut filters = FilterState::new();
        filters.set_column(&schema, "namespace", Some(["a".to_string()].into()));
        let view = compute(&rows, &schema, &filters, None);
        assert!(view.items.iter().all(|r| r.namespace == "a"));
        assert!(selection.is_selected("c/app-11"));

        filters.clear();
        assert_eq!(selection.selected(), vec!["c/app-11"]);
    }

    #[test]
    fn test_remove_and_selected_sorted() {
        let mut selection = Selection::new();
        selection.toggle("b/two");
        selection.toggle("a/one");
        selection.insert("c/three");
        assert_eq!(selection.selected(), vec!["a/one", "b/two", "c/three"]);
        assert!(selection.remove("b/two"));
        assert!(!selection.remove("b/two"));
        selection.clear();
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn test_serde_roundtrip_as_array() {
        let mut selection = Selection::new();
        selection.toggle("a/one");
        let json = serde_json::to_string(&selection).unwrap();
        assert_eq!(json, r#"["a/one"]"#);
        let back: Selection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, selection);
    }
}
