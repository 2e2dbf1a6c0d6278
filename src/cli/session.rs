// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! One loaded resource list and its view state, shared by batch and REPL mode

use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use k8slist::config::Config;
use k8slist::export::{download_full_manifest, export_rows, write_artifact};
use k8slist::resources::{
    LoadedManifests, ResourceRow, default_sort, detect_resource, export_config, load_rows, resolve_resource,
    schema_for,
};
use k8slist::{
    ColumnLayoutStore, ExportConfig, ExportFormat, FileLayoutBackend, LayoutBackend, ListState, Schema, SortState,
};

use super::{Args, OutputFormat};
use crate::output::PageTable;

/// Table id used when the input doesn't match a preset
const GENERIC_TABLE: &str = "resources";

pub struct Session<B: LayoutBackend = FileLayoutBackend> {
    /// Preset name, also the layout table id
    pub table_id: String,
    pub rows: Vec<ResourceRow>,
    pub schema: Schema<ResourceRow>,
    pub state: ListState,
    pub layout: ColumnLayoutStore<B>,
    pub export: ExportConfig<ResourceRow>,
}

/// Read input from a file, or stdin when no file is given
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read manifests from stdin")?;
            Ok(content)
        }
    }
}

/// Split a `column=v1,v2` filter; an empty value list clears the filter
pub fn parse_filter(spec: &str) -> Result<(String, Option<BTreeSet<String>>)> {
    let Some((column, values)) = spec.split_once('=') else {
        bail!("Invalid filter '{}': expected COLUMN=VALUE[,VALUE...]", spec);
    };
    let column = column.trim();
    if column.is_empty() {
        bail!("Invalid filter '{}': missing column", spec);
    }
    let values: BTreeSet<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((column.to_string(), (!values.is_empty()).then_some(values)))
}

impl<B: LayoutBackend> Session<B> {
    /// Build a session over loaded rows
    ///
    /// `resource` picks the preset; when absent it is detected from the rows.
    pub fn new(resource: Option<&str>, rows: Vec<ResourceRow>, page_size: usize, layout: ColumnLayoutStore<B>) -> Result<Self> {
        let table_id = match resource {
            Some(name) => match resolve_resource(name) {
                Some(kind) => kind.name.to_string(),
                None => bail!("Unknown resource '{}'", name),
            },
            None => detect_resource(&rows)
                .map(|kind| kind.name.to_string())
                .unwrap_or_else(|| GENERIC_TABLE.to_string()),
        };
        let schema = schema_for(&table_id)?;
        let export = export_config(&table_id, &schema);
        let state = ListState::new(&schema, Some(default_sort()), page_size);
        info!(resource = %table_id, rows = rows.len(), "Loaded resource list");

        Ok(Self {
            table_id,
            rows,
            schema,
            state,
            layout,
            export,
        })
    }

    /// Resolve a user-typed column name (id, label, or `ns`)
    pub fn column_id(&self, name: &str) -> Result<String> {
        let name = if name.eq_ignore_ascii_case("ns") { "namespace" } else { name };
        match self.schema.find_column(name) {
            Some(column) => Ok(column.id.clone()),
            None => bail!("Unknown column '{}' for {}", name, self.table_id),
        }
    }

    pub fn apply_filter(&mut self, spec: &str) -> Result<()> {
        let (column, values) = parse_filter(spec)?;
        let id = self.column_id(&column)?;
        if !self.state.set_column_filter(&self.schema, &id, values) {
            bail!("Column '{}' is not filterable", id);
        }
        Ok(())
    }

    pub fn apply_sort(&mut self, column: &str, descending: bool) -> Result<()> {
        let id = self.column_id(column)?;
        let sort = if descending {
            SortState::descending(id.clone())
        } else {
            SortState::ascending(id.clone())
        };
        if !self.state.set_sort_state(&self.schema, sort) {
            bail!("Column '{}' is not sortable", id);
        }
        Ok(())
    }

    pub fn apply_group_by(&mut self, column: Option<&str>) -> Result<()> {
        let id = column.map(|c| self.column_id(c)).transpose()?;
        self.state.set_group_by(&self.schema, id.as_deref());
        Ok(())
    }

    /// Page size change, rejecting sizes outside the supported options
    pub fn apply_page_size(&mut self, page_size: usize) -> Result<()> {
        if !self.state.set_page_size(page_size) {
            bail!(
                "Unsupported page size {} (choose one of {:?})",
                page_size,
                k8slist::PAGE_SIZE_OPTIONS
            );
        }
        Ok(())
    }

    /// Apply the view flags of a batch invocation
    pub fn apply_args(&mut self, args: &Args) -> Result<()> {
        for spec in &args.filter {
            self.apply_filter(spec)?;
        }
        if let Some(query) = &args.search {
            self.state.set_search(query);
        }
        if let Some(column) = &args.sort {
            self.apply_sort(column, args.desc)?;
        }
        if let Some(column) = &args.group_by {
            self.apply_group_by(Some(column))?;
        }
        if let Some(page) = args.page {
            if page == 0 {
                bail!("Pages are numbered from 1");
            }
            self.state.set_page(page - 1);
        }
        for key in &args.select {
            self.state.selection_mut().insert(key);
        }
        debug!(state = ?self.state, "Applied command-line view state");
        Ok(())
    }

    /// Render the current page
    pub fn page(&mut self) -> PageTable {
        let output = self.state.render(&self.rows, &self.schema);
        PageTable::build(&output, &self.state, &self.schema, &self.layout, &self.table_id)
    }

    /// Render the page, returning the keys on it
    pub fn page_keys(&mut self) -> Vec<String> {
        self.state.render(&self.rows, &self.schema).page_keys
    }

    /// Distinct values and counts of one column under the other filters
    pub fn facets(&mut self, column: &str) -> Result<Vec<(String, usize)>> {
        let id = self.column_id(column)?;
        if !self.schema.is_filterable(&id) {
            bail!("Column '{}' is not filterable", id);
        }
        let output = self.state.render(&self.rows, &self.schema);
        let values = output.distinct_values_by_column.get(&id).cloned().unwrap_or_default();
        let counts = output.value_counts_by_column.get(&id);
        Ok(values
            .into_iter()
            .map(|v| {
                let count = counts.and_then(|c| c.get(&v)).copied().unwrap_or(0);
                (v, count)
            })
            .collect())
    }

    /// Export the filtered view (or the selected rows of it) into `dir`
    pub fn export_to(&mut self, dir: &Path, format: ExportFormat) -> Result<PathBuf> {
        let output = self.state.render(&self.rows, &self.schema);
        let artifact = export_rows(&output.view, self.state.selection(), &self.export, format)?;
        write_artifact(dir, &artifact)
    }

    /// Full manifest of one row, from the loaded input
    pub fn manifest(&self, key: &str) -> Result<String> {
        download_full_manifest(&LoadedManifests::new(&self.rows), key)
    }
}

impl Session<FileLayoutBackend> {
    /// Load input and apply config plus command-line flags
    pub fn load(args: &Args, config: &Config) -> Result<Self> {
        let content = read_input(args.file.as_deref())?;
        let rows = load_rows(&content, Utc::now())?;
        let layout = ColumnLayoutStore::open()?;
        let mut session = Self::new(args.resource.as_deref(), rows, config.page_size, layout)?;
        if let Some(page_size) = args.page_size {
            session.apply_page_size(page_size)?;
        }
        session.apply_args(args)?;
        Ok(session)
    }
}

/// Export format for an output format; tables export as CSV
pub fn export_format(output: OutputFormat) -> ExportFormat {
    match output {
        OutputFormat::Table | OutputFormat::Csv => ExportFormat::Csv,
        OutputFormat::Json => ExportFormat::Json,
        OutputFormat::Yaml => ExportFormat::Yaml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::pod_rows;
    use k8slist::MemoryLayoutBackend;
    use tempfile::TempDir;

    fn session() -> Session<MemoryLayoutBackend> {
        Session::new(Some("po"), pod_rows(), 10, ColumnLayoutStore::new(MemoryLayoutBackend::new())).unwrap()
    }

    #[test]
    fn test_parse_filter() {
        let (col, values) = parse_filter("status=Running, Pending").unwrap();
        assert_eq!(col, "status");
        let values = values.unwrap();
        assert!(values.contains("Running") && values.contains("Pending"));

        let (_, values) = parse_filter("status=").unwrap();
        assert!(values.is_none());

        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn test_resource_resolution() {
        let s = session();
        assert_eq!(s.table_id, "pods");

        let layout = ColumnLayoutStore::new(MemoryLayoutBackend::new());
        let s = Session::new(None, pod_rows(), 10, layout).unwrap();
        // Items of a bare List carry no kind
        assert_eq!(s.table_id, GENERIC_TABLE);

        let layout = ColumnLayoutStore::new(MemoryLayoutBackend::new());
        assert!(Session::new(Some("widgets"), pod_rows(), 10, layout).is_err());
    }

    #[test]
    fn test_column_aliases() {
        let s = session();
        assert_eq!(s.column_id("ns").unwrap(), "namespace");
        assert_eq!(s.column_id("Restarts").unwrap(), "restarts");
        assert!(s.column_id("bogus").is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut s = session();
        let args = Args {
            filter: vec!["ns=shop".to_string()],
            sort: Some("restarts".to_string()),
            desc: true,
            select: vec!["shop/web-1".to_string()],
            ..Args::default()
        };
        s.apply_args(&args).unwrap();

        let page = s.page();
        let names: Vec<&str> = page.rows().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["db, primary", "web-1"]);
        assert!(s.state.selection().is_selected("shop/web-1"));
    }

    #[test]
    fn test_apply_args_errors() {
        let mut s = session();
        let args = Args {
            page: Some(0),
            ..Args::default()
        };
        assert!(s.apply_args(&args).is_err());

        assert!(s.apply_filter("age=1d").is_err());
        assert!(s.apply_page_size(30).is_err());
        assert!(s.apply_page_size(25).is_ok());
    }

    #[test]
    fn test_facets_ignore_own_filter() {
        let mut s = session();
        s.apply_filter("status=Running").unwrap();
        let facets = s.facets("status").unwrap();
        assert_eq!(
            facets,
            vec![("Pending".to_string(), 1), ("Running".to_string(), 2)]
        );
        assert!(s.facets("age").is_err());
    }

    #[test]
    fn test_export_selected_rows() {
        let dir = TempDir::new().unwrap();
        let mut s = session();
        s.state.selection_mut().insert("kube-system/dns");

        let path = s.export_to(dir.path(), ExportFormat::Csv).unwrap();
        assert_eq!(path.file_name().unwrap(), "pods.csv");
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("dns"));
    }

    #[test]
    fn test_manifest_lookup() {
        let s = session();
        let yaml = s.manifest("kube-system/dns").unwrap();
        assert!(yaml.contains("name: dns"));
        assert!(s.manifest("default/missing").is_err());
    }

    #[test]
    fn test_export_format_for_output() {
        assert_eq!(export_format(OutputFormat::Table), ExportFormat::Csv);
        assert_eq!(export_format(OutputFormat::Yaml), ExportFormat::Yaml);
    }
}
