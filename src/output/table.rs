// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::{PageLine, PageTable};

/// Stored column widths are in pixels; the terminal gets one char per 8px
const PIXELS_PER_CHAR: u32 = 8;

/// Never truncate a cell below this many chars
const MIN_CELL_CHARS: usize = 6;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

fn chars_for_width(width: u32) -> usize {
    ((width / PIXELS_PER_CHAR) as usize).max(MIN_CELL_CHARS)
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(page: &PageTable, no_headers: bool) -> String {
        if page.lines.is_empty() {
            return format!("(0 rows)\n{}", page.footer);
        }

        let mut table = Table::new();
        // ASCII_BORDERS_ONLY_CONDENSED is close to kubectl style
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        if !no_headers {
            let mut header = vec![String::new()];
            header.extend(page.columns.iter().map(|c| c.to_uppercase()));
            table.set_header(header);
        }

        let limits: Vec<usize> = page.widths.iter().map(|w| chars_for_width(*w)).collect();

        for line in &page.lines {
            match line {
                PageLine::Group {
                    label,
                    count,
                    collapsed,
                } => {
                    let marker = if *collapsed { "+" } else { "-" };
                    let mut cells = vec![marker.to_string(), format!("{} ({})", label, count)];
                    cells.resize(page.columns.len() + 1, String::new());
                    table.add_row(cells);
                }
                PageLine::Row { selected, cells, .. } => {
                    let mut row: Vec<Cow<'_, str>> =
                        vec![Cow::Borrowed(if *selected { "[x]" } else { "[ ]" })];
                    row.extend(
                        cells
                            .iter()
                            .zip(&limits)
                            .map(|(val, limit)| truncate_value(val, *limit)),
                    );
                    table.add_row(row);
                }
            }
        }

        format!("{}\n{}", table, page.footer)
    }
}
