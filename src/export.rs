// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Export of list rows
//!
//! Exports cover the selected rows if anything is selected, otherwise the
//! whole filtered view (not just the visible page). Formats:
//! - CSV with one header record from the configured column labels
//! - JSON, a pretty-printed array of per-row objects
//! - YAML manifest stubs built from display fields only
//!
//! A stub is a skeleton for templating, not the resource as stored in the
//! cluster. The real manifest always comes from a [`ManifestSource`] via
//! [`download_full_manifest`].

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::schema::{Accessor, CellValue, KeyFn, Schema};
use crate::selection::Selection;
use crate::storage::atomic_write;

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Yaml,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => bail!("Unknown export format '{}' (expected csv, json or yaml)", other),
        }
    }
}

/// Minimal manifest skeleton for one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestStub {
    pub api_version: String,
    pub kind: String,
    pub metadata: StubMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// One CSV column: header label plus value accessor
pub struct CsvColumn<T> {
    pub label: String,
    value: Accessor<T>,
}

impl<T> CsvColumn<T> {
    pub fn new<F>(label: &str, value: F) -> Self
    where
        F: Fn(&T) -> CellValue + Send + Sync + 'static,
    {
        Self {
            label: label.to_string(),
            value: Arc::new(value),
        }
    }

    pub fn value(&self, row: &T) -> String {
        (self.value)(row).to_text()
    }
}

type ExportDataFn<T> = Arc<dyn Fn(&T) -> serde_json::Value + Send + Sync>;
type StubFn<T> = Arc<dyn Fn(&T) -> ManifestStub + Send + Sync>;

/// What a list exports and how
pub struct ExportConfig<T> {
    /// File name without extension
    pub base_name: String,
    key: KeyFn<T>,
    pub csv_columns: Vec<CsvColumn<T>>,
    export_data: ExportDataFn<T>,
    manifest_stub: Option<StubFn<T>>,
}

impl<T> ExportConfig<T> {
    /// Export every schema column: CSV uses the labels, JSON uses the ids
    pub fn from_schema(base_name: &str, schema: &Schema<T>) -> Self
    where
        T: 'static,
    {
        let csv_columns = schema
            .columns()
            .iter()
            .map(|c| {
                let accessor = c.accessor();
                CsvColumn::new(&c.label, move |row: &T| accessor(row))
            })
            .collect();

        let columns: Vec<(String, Accessor<T>)> = schema
            .columns()
            .iter()
            .map(|c| (c.id.clone(), c.accessor()))
            .collect();
        let export_data = move |row: &T| {
            let object = columns
                .iter()
                .map(|(id, accessor)| (id.clone(), cell_to_json(accessor(row))))
                .collect();
            serde_json::Value::Object(object)
        };

        Self {
            base_name: base_name.to_string(),
            key: schema.key_fn(),
            csv_columns,
            export_data: Arc::new(export_data),
            manifest_stub: None,
        }
    }

    pub fn with_csv_columns(mut self, columns: Vec<CsvColumn<T>>) -> Self {
        self.csv_columns = columns;
        self
    }

    pub fn with_export_data<F>(mut self, export_data: F) -> Self
    where
        F: Fn(&T) -> serde_json::Value + Send + Sync + 'static,
    {
        self.export_data = Arc::new(export_data);
        self
    }

    /// Offer YAML stub export
    pub fn with_manifest_stub<F>(mut self, stub: F) -> Self
    where
        F: Fn(&T) -> ManifestStub + Send + Sync + 'static,
    {
        self.manifest_stub = Some(Arc::new(stub));
        self
    }

    pub fn supports(&self, format: ExportFormat) -> bool {
        format != ExportFormat::Yaml || self.manifest_stub.is_some()
    }

    pub fn export_data(&self, row: &T) -> serde_json::Value {
        (self.export_data)(row)
    }

    pub fn manifest_stub(&self, row: &T) -> Option<ManifestStub> {
        self.manifest_stub.as_ref().map(|stub| stub(row))
    }
}

fn cell_to_json(value: CellValue) -> serde_json::Value {
    match value {
        CellValue::Text(s) => serde_json::Value::String(s),
        CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
            serde_json::Value::from(n as i64)
        }
        CellValue::Number(n) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
    }
}

/// Produced export file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub content: String,
}

/// Rows an export covers, in view order
pub fn export_scope<'a, T>(view: &[&'a T], selection: &Selection, config: &ExportConfig<T>) -> Vec<&'a T> {
    if selection.is_empty() {
        return view.to_vec();
    }
    view.iter()
        .copied()
        .filter(|row| selection.is_selected(&(config.key)(row)))
        .collect()
}

/// Serialize the export scope of `view` into an artifact
pub fn export_rows<T>(
    view: &[&T],
    selection: &Selection,
    config: &ExportConfig<T>,
    format: ExportFormat,
) -> Result<ExportArtifact> {
    let rows = export_scope(view, selection, config);
    debug!(
        rows = rows.len(),
        selected = selection.len(),
        format = %format,
        "Exporting rows"
    );

    let content = match format {
        ExportFormat::Csv => to_csv(&rows, config)?,
        ExportFormat::Json => {
            let data: Vec<serde_json::Value> = rows.iter().map(|r| config.export_data(r)).collect();
            serde_json::to_string_pretty(&data).context("Failed to serialize JSON export")?
        }
        ExportFormat::Yaml => to_yaml_stubs(&rows, config)?,
    };

    Ok(ExportArtifact {
        format,
        file_name: format!("{}.{}", config.base_name, format.extension()),
        content,
    })
}

fn to_csv<T>(rows: &[&T], config: &ExportConfig<T>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(config.csv_columns.iter().map(|c| c.label.as_str()))
        .context("Failed to write CSV header")?;
    for row in rows {
        writer
            .write_record(config.csv_columns.iter().map(|c| c.value(row)))
            .context("Failed to write CSV record")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV export: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV export is not valid UTF-8")
}

fn to_yaml_stubs<T>(rows: &[&T], config: &ExportConfig<T>) -> Result<String> {
    let Some(stub) = &config.manifest_stub else {
        bail!("YAML export is not available for {}", config.base_name);
    };
    let documents = rows
        .iter()
        .map(|row| serde_yaml::to_string(&stub(row)).context("Failed to serialize manifest stub"))
        .collect::<Result<Vec<_>>>()?;
    Ok(documents.join("---\n"))
}

/// Write an artifact into `dir`, returning the written path
pub fn write_artifact(dir: &Path, artifact: &ExportArtifact) -> Result<PathBuf> {
    let path = dir.join(&artifact.file_name);
    atomic_write(&path, artifact.content.as_bytes())
        .with_context(|| format!("export failed: could not write {}", path.display()))?;
    info!(path = %path.display(), format = %artifact.format, "Wrote export");
    Ok(path)
}

/// Provider of authoritative resource manifests (the API collaborator)
pub trait ManifestSource {
    /// Full manifest for the row identified by `key`, as YAML
    fn full_manifest(&self, key: &str) -> Result<String>;
}

/// Fetch the real manifest for a row
///
/// Never derived from a [`ManifestStub`]; failures are propagated.
pub fn download_full_manifest<S: ManifestSource + ?Sized>(source: &S, key: &str) -> Result<String> {
    source
        .full_manifest(key)
        .with_context(|| format!("Failed to download manifest for {}", key))
}
