// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod table;

pub use table::TableFormatter;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};

use k8slist::grouping::render_groups;
use k8slist::{Column, ColumnLayoutStore, GroupedLine, LayoutBackend, ListOutput, ListState, Schema};

use crate::cli::OutputFormat;

/// Rendered page, ready for a formatter
#[derive(Debug, Clone)]
pub struct PageTable {
    /// Visible column ids, in schema order
    pub ids: Vec<String>,
    /// Header labels for `ids`
    pub columns: Vec<String>,
    /// Stored column widths for `ids`
    pub widths: Vec<u32>,
    pub lines: Vec<PageLine>,
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLine {
    Group {
        label: String,
        count: usize,
        collapsed: bool,
    },
    Row {
        key: String,
        selected: bool,
        cells: Vec<String>,
    },
}

impl PageTable {
    pub fn build<T, B: LayoutBackend>(
        output: &ListOutput<'_, T>,
        state: &ListState,
        schema: &Schema<T>,
        layout: &ColumnLayoutStore<B>,
        table_id: &str,
    ) -> Self {
        let table_layout = layout.layout(table_id);
        let visible: Vec<&Column<T>> = table_layout.visible_columns(schema);
        let row_line = |row: &T| PageLine::Row {
            key: schema.row_key(row),
            selected: state.selection().is_selected(&schema.row_key(row)),
            cells: visible.iter().map(|c| c.text_value(row)).collect(),
        };

        let lines = match &output.groups {
            Some(groups) => render_groups(groups, state.collapsed())
                .into_iter()
                .map(|line| match line {
                    GroupedLine::Header {
                        label,
                        count,
                        collapsed,
                        ..
                    } => PageLine::Group {
                        label,
                        count,
                        collapsed,
                    },
                    GroupedLine::Row(row) => row_line(row),
                })
                .collect(),
            None => output.page_items.iter().map(|&row| row_line(row)).collect(),
        };

        let mut footer = format!(
            "{} (page {}/{})",
            output.range_label,
            output.page_index + 1,
            output.page_count
        );
        if output.selected_count > 0 {
            footer.push_str(&format!(", {} selected", output.selected_count));
        }
        if output.has_active_filters {
            footer.push_str(", filtered");
        }

        Self {
            ids: visible.iter().map(|c| c.id.clone()).collect(),
            columns: visible.iter().map(|c| c.label.clone()).collect(),
            widths: visible.iter().map(|&c| table_layout.width(c)).collect(),
            lines,
            footer,
        }
    }

    /// Data rows only, without group headers
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.lines.iter().filter_map(|line| match line {
            PageLine::Row { cells, .. } => Some(cells.as_slice()),
            PageLine::Group { .. } => None,
        })
    }

    /// Page rows as JSON objects keyed by column id
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows()
            .map(|cells| {
                let obj: Map<String, Value> = self
                    .ids
                    .iter()
                    .zip(cells)
                    .map(|(id, val)| (id.clone(), Value::String(val.clone())))
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    pub fn format(&self, format: OutputFormat, no_headers: bool) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(TableFormatter::format(self, no_headers)),
            OutputFormat::Json => {
                serde_json::to_string_pretty(&self.to_json_rows()).context("Failed to serialize page as JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(&self.to_json_rows()).context("Failed to serialize page as YAML")
            }
            OutputFormat::Csv => self.to_csv(no_headers),
        }
    }

    fn to_csv(&self, no_headers: bool) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        if !no_headers {
            writer.write_record(&self.ids).context("Failed to write CSV header")?;
        }
        for cells in self.rows() {
            writer.write_record(cells).context("Failed to write CSV record")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush CSV output: {}", e.error()))?;
        let text = String::from_utf8(bytes).context("CSV output is not valid UTF-8")?;
        Ok(text.trim_end().to_string())
    }
}
