// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Free-text search over list rows
//!
//! The search box accepts a few forms:
//! - `nginx` - case-insensitive substring over all column values
//! - `status:pending` / `ns:kube-system` - substring on one column
//! - `re:^web-[0-9]+` or `/^web-[0-9]+/` - regular expression over all values
//!
//! An invalid regular expression matches nothing rather than erroring, so a
//! half-typed pattern simply empties the view until it becomes valid. A
//! `field:` prefix naming no column of the schema also matches nothing.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::Schema;

/// Short names accepted in `column:value` searches
const COLUMN_ALIASES: &[(&str, &str)] = &[("ns", "namespace")];

/// Raw search text as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchQuery {
    raw: String,
}

impl SearchQuery {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// True if the query places no constraint on rows
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Resolve the query against a schema into a reusable matcher
    pub fn compile<T>(&self, schema: &Schema<T>) -> SearchMatcher {
        let raw = self.raw.trim();
        if raw.is_empty() {
            return SearchMatcher::Any;
        }

        if let Some(pattern) = regex_pattern(raw) {
            return match RegexBuilder::new(pattern).build() {
                Ok(re) => SearchMatcher::Regex(re),
                Err(e) => {
                    debug!(pattern, error = %e, "Invalid search regex, matching nothing");
                    SearchMatcher::Nothing
                }
            };
        }

        if let Some((field, value)) = parse_field_search(raw) {
            return match resolve_column(schema, field) {
                Some(column) => SearchMatcher::Field {
                    column,
                    needle: value.to_lowercase(),
                },
                None => {
                    debug!(field, "Search names an unknown column, matching nothing");
                    SearchMatcher::Nothing
                }
            };
        }

        SearchMatcher::Text(raw.to_lowercase())
    }
}

/// Extract the pattern from `re:<pattern>` or `/<pattern>/`
fn regex_pattern(raw: &str) -> Option<&str> {
    if let Some(prefix) = raw.get(..3)
        && prefix.eq_ignore_ascii_case("re:")
    {
        return Some(raw[3..].trim());
    }
    if raw.len() > 2 && raw.starts_with('/') && raw.ends_with('/') {
        return Some(raw[1..raw.len() - 1].trim());
    }
    None
}

/// Split `field:value`, rejecting empty halves
fn parse_field_search(raw: &str) -> Option<(&str, &str)> {
    let (field, value) = raw.split_once(':')?;
    let field = field.trim();
    let value = value.trim();
    if field.is_empty() || value.is_empty() || field.contains(char::is_whitespace) {
        return None;
    }
    Some((field, value))
}

fn resolve_column<T>(schema: &Schema<T>, field: &str) -> Option<String> {
    let field = COLUMN_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(field))
        .map(|(_, target)| *target)
        .unwrap_or(field);
    schema.find_column(field).map(|c| c.id.clone())
}

/// Compiled form of a [`SearchQuery`]
#[derive(Debug, Clone)]
pub enum SearchMatcher {
    /// No search text
    Any,
    /// Invalid pattern or unknown column
    Nothing,
    Regex(Regex),
    /// Substring on a single column (lowercased needle)
    Field { column: String, needle: String },
    /// Substring over all column values (lowercased needle)
    Text(String),
}

impl SearchMatcher {
    pub fn is_any(&self) -> bool {
        matches!(self, SearchMatcher::Any)
    }

    pub fn matches<T>(&self, schema: &Schema<T>, row: &T) -> bool {
        match self {
            SearchMatcher::Any => true,
            SearchMatcher::Nothing => false,
            SearchMatcher::Regex(re) => re.is_match(&schema.row_text(row)),
            SearchMatcher::Field { column, needle } => schema
                .column(column)
                .is_some_and(|c| c.text_value(row).to_lowercase().contains(needle.as_str())),
            SearchMatcher::Text(needle) => schema
                .row_text(row)
                .to_lowercase()
                .contains(needle.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;
    use crate::schema::test_rows::*;

    fn matching(query: &str) -> Vec<String> {
        let schema = test_schema();
        let matcher = SearchQuery::new(query).compile(&schema);
        twelve_rows()
            .into_iter()
            .filter(|r| matcher.matches(&schema, r))
            .map(|r| r.name)
            .collect()
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(SearchQuery::new("   ").is_empty());
        assert_eq!(matching("").len(), 12);
        assert!(SearchQuery::default().compile(&test_schema()).is_any());
    }

    #[test]
    fn test_plain_substring_case_insensitive() {
        assert_eq!(matching("DEGRADED"), vec!["app-00", "app-07"]);
        assert_eq!(matching("app-1"), vec!["app-10", "app-11"]);
    }

    #[test]
    fn test_field_search() {
        assert_eq!(matching("namespace:c").len(), 3);
        assert_eq!(matching("ns:c").len(), 3);
        assert_eq!(matching("Status:degr"), vec!["app-00", "app-07"]);
    }

    #[test]
    fn test_unknown_field_matches_nothing() {
        let schema = test_schema();
        let matcher = SearchQuery::new("bogus:value").compile(&schema);
        assert!(matches!(matcher, SearchMatcher::Nothing));

        // A row whose text literally contains the query is still excluded
        let rows = vec![row("bogus:value", "a", "Running", 1.0)];
        assert!(!matcher.matches(&schema, &rows[0]));
    }

    #[test]
    fn test_ns_alias_without_namespace_column_matches_nothing() {
        let schema = Schema::new(
            vec![Column::text("name", "Name", |r: &TestRow| r.name.clone()).sortable()],
            |r: &TestRow| r.name.clone(),
        )
        .unwrap();
        let rows = vec![row("ns:a", "a", "Running", 1.0), row("node-a", "a", "Running", 1.0)];
        let matcher = SearchQuery::new("ns:a").compile(&schema);
        assert!(rows.iter().all(|r| !matcher.matches(&schema, r)));
    }

    #[test]
    fn test_regex_forms() {
        assert_eq!(matching("re:app-0[0-1]"), vec!["app-00", "app-01"]);
        assert_eq!(matching("/app-1[01]/"), vec!["app-10", "app-11"]);
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        assert!(matching("re:app-[").is_empty());
        let matcher = SearchQuery::new("/(unclosed/").compile(&test_schema());
        assert!(matches!(matcher, SearchMatcher::Nothing));
    }

    #[test]
    fn test_parse_field_search_rejects_empty_parts() {
        assert_eq!(parse_field_search(":x"), None);
        assert_eq!(parse_field_search("x:"), None);
        assert_eq!(parse_field_search("two words:x"), None);
        assert_eq!(parse_field_search(" ns : kube-system "), Some(("ns", "kube-system")));
    }
}
