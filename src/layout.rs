// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Column layout persistence
//!
//! Per-table column widths and visibility survive restarts. Layouts are kept
//! one JSON file per table:
//! ```text
//! ~/.k8slist/layout/
//!   pods.json
//!   deployments.json
//! ```
//! with the format `{"columns": {"<column id>": {"width": 180, "visible": true}}}`.
//! Missing entries fall back to the schema defaults, unknown keys are ignored.
//!
//! Thread/process safety:
//! - write_lock serializes read-modify-write cycles within one process
//! - Atomic file writes (tempfile + rename) protect against crashes
//! - Across processes the last write wins for a given (table, column)

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::config;
use crate::schema::{Column, Schema};
use crate::storage::{atomic_write, sanitize_filename};

/// Stored overrides for one column; `None` means "use the schema default"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayoutEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// Stored layout of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnLayoutEntry>,
}

impl TableLayout {
    /// Stored width, or the column default; never below the column minimum
    pub fn width<T>(&self, column: &Column<T>) -> u32 {
        let stored = self.columns.get(&column.id).and_then(|e| e.width);
        column.clamp_width(stored.unwrap_or(column.default_width))
    }

    pub fn is_visible<T>(&self, column: &Column<T>) -> bool {
        column.always_visible
            || self
                .columns
                .get(&column.id)
                .and_then(|e| e.visible)
                .unwrap_or(column.default_visible)
    }

    /// Visible columns of a schema, in schema order
    pub fn visible_columns<'s, T>(&self, schema: &'s Schema<T>) -> Vec<&'s Column<T>> {
        schema.columns().iter().filter(|c| self.is_visible(c)).collect()
    }
}

/// Where table layouts are kept
pub trait LayoutBackend {
    /// Load a table's layout; a table that was never saved yields the default
    fn load(&self, table_id: &str) -> Result<TableLayout>;

    fn save(&self, table_id: &str, layout: &TableLayout) -> Result<()>;

    /// Forget a table's layout entirely
    fn remove(&self, table_id: &str) -> Result<()>;

    /// Read-modify-write a table's layout
    ///
    /// An unreadable layout is replaced rather than blocking the write.
    fn update(&self, table_id: &str, apply: &mut dyn FnMut(&mut TableLayout)) -> Result<()> {
        let mut layout = load_or_default(self, table_id);
        apply(&mut layout);
        self.save(table_id, &layout)
    }
}

fn load_or_default<B: LayoutBackend + ?Sized>(backend: &B, table_id: &str) -> TableLayout {
    match backend.load(table_id) {
        Ok(layout) => layout,
        Err(e) => {
            warn!(table = table_id, "Failed to read column layout, using defaults: {:#}", e);
            TableLayout::default()
        }
    }
}

/// JSON files under `~/.k8slist/layout/`
pub struct FileLayoutBackend {
    base_dir: PathBuf,
    /// Serializes read-modify-write cycles from concurrent threads
    write_lock: Mutex<()>,
}

impl FileLayoutBackend {
    /// Backend rooted at the default layout directory
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(config::base_dir()?.join("layout")))
    }

    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn table_path(&self, table_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.json", sanitize_filename(table_id)))
    }

    fn write(&self, table_id: &str, layout: &TableLayout) -> Result<()> {
        let content =
            serde_json::to_string_pretty(layout).context("Failed to serialize column layout")?;
        let path = self.table_path(table_id);
        atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write column layout for table '{}'", table_id))
    }
}

impl LayoutBackend for FileLayoutBackend {
    fn load(&self, table_id: &str) -> Result<TableLayout> {
        let path = self.table_path(table_id);
        if !path.exists() {
            return Ok(TableLayout::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read layout file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse layout file: {}", path.display()))
    }

    fn save(&self, table_id: &str, layout: &TableLayout) -> Result<()> {
        let _lock = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Layout write lock poisoned"))?;
        self.write(table_id, layout)
    }

    fn remove(&self, table_id: &str) -> Result<()> {
        let _lock = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Layout write lock poisoned"))?;
        let path = self.table_path(table_id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove layout file: {}", path.display()))?;
        }
        Ok(())
    }

    fn update(&self, table_id: &str, apply: &mut dyn FnMut(&mut TableLayout)) -> Result<()> {
        let _lock = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Layout write lock poisoned"))?;
        let mut layout = load_or_default(self, table_id);
        apply(&mut layout);
        self.write(table_id, &layout)
    }
}

/// In-memory layouts, for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryLayoutBackend {
    tables: Mutex<HashMap<String, TableLayout>>,
}

impl MemoryLayoutBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayoutBackend for MemoryLayoutBackend {
    fn load(&self, table_id: &str) -> Result<TableLayout> {
        let tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("Layout lock poisoned"))?;
        Ok(tables.get(table_id).cloned().unwrap_or_default())
    }

    fn save(&self, table_id: &str, layout: &TableLayout) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("Layout lock poisoned"))?;
        tables.insert(table_id.to_string(), layout.clone());
        Ok(())
    }

    fn remove(&self, table_id: &str) -> Result<()> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow!("Layout lock poisoned"))?;
        tables.remove(table_id);
        Ok(())
    }
}

/// Column widths and visibility keyed by (table id, column id)
pub struct ColumnLayoutStore<B: LayoutBackend = FileLayoutBackend> {
    backend: B,
}

impl ColumnLayoutStore<FileLayoutBackend> {
    /// Store backed by `~/.k8slist/layout/`
    pub fn open() -> Result<Self> {
        Ok(Self::new(FileLayoutBackend::new()?))
    }
}

impl<B: LayoutBackend> ColumnLayoutStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A table's stored layout, read once; defaults if unreadable
    pub fn layout(&self, table_id: &str) -> TableLayout {
        load_or_default(&self.backend, table_id)
    }

    pub fn width<T>(&self, table_id: &str, column: &Column<T>) -> u32 {
        self.layout(table_id).width(column)
    }

    /// Persist a width, clamped to the column minimum; returns the stored width
    pub fn set_width<T>(&self, table_id: &str, column: &Column<T>, width: u32) -> Result<u32> {
        let width = column.clamp_width(width);
        self.backend.update(table_id, &mut |layout: &mut TableLayout| {
            layout.columns.entry(column.id.clone()).or_default().width = Some(width);
        })?;
        debug!(table = table_id, column = %column.id, width, "Saved column width");
        Ok(width)
    }

    pub fn is_visible<T>(&self, table_id: &str, column: &Column<T>) -> bool {
        self.layout(table_id).is_visible(column)
    }

    /// Persist visibility; returns `false` if the column cannot be hidden
    pub fn set_visible<T>(&self, table_id: &str, column: &Column<T>, visible: bool) -> Result<bool> {
        if column.always_visible && !visible {
            debug!(table = table_id, column = %column.id, "Refusing to hide always-visible column");
            return Ok(false);
        }
        self.backend.update(table_id, &mut |layout: &mut TableLayout| {
            layout.columns.entry(column.id.clone()).or_default().visible = Some(visible);
        })?;
        debug!(table = table_id, column = %column.id, visible, "Saved column visibility");
        Ok(true)
    }

    /// Visible columns of a schema, in schema order
    pub fn visible_columns<'s, T>(&self, table_id: &str, schema: &'s Schema<T>) -> Vec<&'s Column<T>> {
        self.layout(table_id).visible_columns(schema)
    }

    /// Drop every stored override for a table
    pub fn reset(&self, table_id: &str) -> Result<()> {
        self.backend.remove(table_id)
    }
}
