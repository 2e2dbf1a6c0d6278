// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::{Context as _, Result, bail};
use console::{Style, style};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use k8slist::config::{self, Config};
use k8slist::{ExportFormat, LayoutBackend};

use super::session::Session;
use crate::output::TableFormatter;

const COMMANDS: &[&str] = &[
    "filter",
    "search",
    "clear",
    "sort",
    "page",
    "next",
    "prev",
    "size",
    "select",
    "select-page",
    "unselect",
    "group",
    "toggle",
    "width",
    "hide",
    "show",
    "columns",
    "facets",
    "export",
    "manifest",
    "help",
    "quit",
];

/// Completes command names, then column ids
struct ListHelper {
    columns: Vec<String>,
}

impl Helper for ListHelper {}

impl Hinter for ListHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Validator for ListHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Completer for ListHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];

        let word_start = line_to_cursor
            .rfind(|c: char| c.is_whitespace() || c == '=')
            .map(|i| i + 1)
            .unwrap_or(0);

        let prefix = line_to_cursor[word_start..].to_lowercase();
        let candidates: Box<dyn Iterator<Item = &str> + '_> = if word_start == 0 {
            Box::new(COMMANDS.iter().copied())
        } else {
            Box::new(self.columns.iter().map(String::as_str))
        };

        let matches = candidates
            .filter(|c| c.starts_with(&prefix))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c.to_string(),
            })
            .collect();

        Ok((word_start, matches))
    }
}

impl Highlighter for ListHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        // Highlight a leading known command
        let end = line.find(char::is_whitespace).unwrap_or(line.len());
        if COMMANDS.contains(&&line[..end]) {
            Cow::Owned(format!("\x1b[1;34m{}\x1b[0m{}", &line[..end], &line[end..]))
        } else {
            Cow::Borrowed(line)
        }
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, _default: bool) -> Cow<'b, str> {
        Cow::Owned(format!("\x1b[1;32m{}\x1b[0m", prompt))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn print_welcome<B: LayoutBackend>(session: &Session<B>) {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} {} - {} {}",
        style("k8slist").cyan().bold(),
        style(format!("v{}", version)).dim(),
        session.rows.len(),
        session.table_id
    );
    println!(
        "{}",
        style("Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>").dim()
    );
    println!("{}", style("Type 'help' for commands, Ctrl+D to exit").dim());
    println!();
}

fn print_help() {
    let help_style = Style::new().cyan();
    let cmd_style = Style::new().yellow();

    println!("{}", help_style.apply_to("Filtering:"));
    println!("  {}  - Keep rows whose column is one of the values (no values clears)", cmd_style.apply_to("filter <column>=<v1>,<v2>"));
    println!("  {}  - Free text, field:value, re:<regex> or /<regex>/", cmd_style.apply_to("search <query>"));
    println!("  {}  - Drop all filters and the search", cmd_style.apply_to("clear"));
    println!("  {}  - Values and counts available for a column", cmd_style.apply_to("facets <column>"));
    println!();
    println!("{}", help_style.apply_to("Sorting and paging:"));
    println!("  {}  - Sort by a column; again to flip direction, no column resets", cmd_style.apply_to("sort [column]"));
    println!("  {}  - Go to a page (from 1)", cmd_style.apply_to("page <n>"));
    println!("  {}  - Next / previous page", cmd_style.apply_to("next, prev"));
    println!("  {}  - Rows per page: 10, 25, 50 or 100", cmd_style.apply_to("size <n>"));
    println!();
    println!("{}", help_style.apply_to("Selection and grouping:"));
    println!("  {}  - Toggle selection of rows", cmd_style.apply_to("select <key>..."));
    println!("  {}  - Select or unselect every row on the page", cmd_style.apply_to("select-page"));
    println!("  {}  - Clear the selection", cmd_style.apply_to("unselect"));
    println!("  {}  - Group the page by a column, no column ungroups", cmd_style.apply_to("group [column]"));
    println!("  {}  - Collapse or expand a group", cmd_style.apply_to("toggle <group>"));
    println!();
    println!("{}", help_style.apply_to("Columns:"));
    println!("  {}  - Show every column with its width and visibility", cmd_style.apply_to("columns"));
    println!("  {}  - Set a column width", cmd_style.apply_to("width <column> <px>"));
    println!("  {}  - Hide or show a column", cmd_style.apply_to("hide <column>, show <column>"));
    println!();
    println!("{}", help_style.apply_to("Export:"));
    println!("  {}  - Export the filtered rows (or the selection)", cmd_style.apply_to("export csv|json|yaml [dir]"));
    println!("  {}  - Print the full manifest of a row", cmd_style.apply_to("manifest <key>"));
    println!("  {} - Quit", cmd_style.apply_to("quit"));
    println!();
}

fn print_page<B: LayoutBackend>(session: &mut Session<B>) {
    println!("{}", TableFormatter::format(&session.page(), false));
}

fn print_columns<B: LayoutBackend>(session: &Session<B>) {
    let layout = session.layout.layout(&session.table_id);
    for column in session.schema.columns() {
        let visible = layout.is_visible(column);
        let mut flags = Vec::new();
        if column.sortable {
            flags.push("sortable");
        }
        if column.filterable {
            flags.push("filterable");
        }
        if column.always_visible {
            flags.push("always visible");
        }
        println!(
            "  {} {:<16} {:>4}px  {}",
            if visible { style("*").green() } else { style(" ").dim() },
            column.id,
            layout.width(column),
            style(flags.join(", ")).dim()
        );
    }
}

fn parse_number(arg: Option<&str>, what: &str) -> Result<usize> {
    let Some(arg) = arg else {
        bail!("Missing {}", what);
    };
    arg.parse()
        .with_context(|| format!("Invalid {} '{}'", what, arg))
}

fn require<'a>(arg: Option<&'a str>, what: &str) -> Result<&'a str> {
    match arg {
        Some(arg) if !arg.is_empty() => Ok(arg),
        _ => bail!("Missing {}", what),
    }
}

/// Outcome of one REPL line
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    /// View changed; redraw the page
    Redraw,
    /// Output was printed; nothing to redraw
    Done,
    Quit,
}

fn execute<B: LayoutBackend>(session: &mut Session<B>, export_dir: &Path, input: &str) -> Result<Flow> {
    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);
    debug!(command, args = rest, "REPL command");

    match command.to_lowercase().as_str() {
        "quit" | "exit" | "\\q" => return Ok(Flow::Quit),
        "help" | "\\?" => {
            print_help();
            return Ok(Flow::Done);
        }
        "filter" => session.apply_filter(require(arg, "filter (column=value,...)")?)?,
        "search" => session.state.set_search(rest),
        "clear" => session.state.clear_all_filters(),
        "sort" => match arg {
            Some(column) => {
                let id = session.column_id(column)?;
                if !session.state.set_sort(&session.schema, &id) {
                    bail!("Column '{}' is not sortable", id);
                }
            }
            None => session.state.reset_sort(),
        },
        "page" => {
            let page = parse_number(arg, "page number")?;
            if page == 0 {
                bail!("Pages are numbered from 1");
            }
            session.state.set_page(page - 1);
        }
        "next" => session.state.next_page(),
        "prev" => session.state.prev_page(),
        "size" => session.apply_page_size(parse_number(arg, "page size")?)?,
        "select" => {
            for key in require(arg, "row key")?.split_whitespace() {
                session.state.selection_mut().toggle(key);
            }
        }
        "select-page" => {
            let keys = session.page_keys();
            session.state.selection_mut().toggle_all_on_page(&keys);
        }
        "unselect" => session.state.selection_mut().clear(),
        "group" => session.apply_group_by(arg)?,
        "toggle" => {
            session.state.toggle_group(require(arg, "group")?);
        }
        "width" => {
            let mut parts = rest.split_whitespace();
            let id = session.column_id(require(parts.next(), "column")?)?;
            let width = parse_number(parts.next(), "width")?;
            let Some(column) = session.schema.column(&id) else {
                bail!("Unknown column '{}'", id);
            };
            let stored = session
                .layout
                .set_width(&session.table_id, column, u32::try_from(width).unwrap_or(u32::MAX))?;
            println!("{}", style(format!("{} width set to {}px", id, stored)).dim());
        }
        "hide" | "show" => {
            let id = session.column_id(require(arg, "column")?)?;
            let Some(column) = session.schema.column(&id) else {
                bail!("Unknown column '{}'", id);
            };
            let visible = command.eq_ignore_ascii_case("show");
            if !session.layout.set_visible(&session.table_id, column, visible)? {
                bail!("Column '{}' cannot be hidden", id);
            }
        }
        "columns" => {
            print_columns(session);
            return Ok(Flow::Done);
        }
        "facets" => {
            let column = require(arg, "column")?;
            for (value, count) in session.facets(column)? {
                println!("  {:<32} {}", value, style(count).dim());
            }
            return Ok(Flow::Done);
        }
        "export" => {
            let mut parts = rest.split_whitespace();
            let format: ExportFormat = require(parts.next(), "format (csv, json, yaml)")?.parse()?;
            let dir = parts.next().map(PathBuf::from).unwrap_or_else(|| export_dir.to_path_buf());
            let path = session.export_to(&dir, format)?;
            println!("{} {}", style("Exported to").green(), path.display());
            return Ok(Flow::Done);
        }
        "manifest" => {
            println!("{}", session.manifest(require(arg, "row key")?)?);
            return Ok(Flow::Done);
        }
        other => bail!("Unknown command '{}' (type 'help')", other),
    }
    Ok(Flow::Redraw)
}

pub fn run_repl<B: LayoutBackend>(mut session: Session<B>, config: &Config) -> Result<()> {
    let helper = ListHelper {
        columns: session.schema.columns().iter().map(|c| c.id.clone()).collect(),
    };
    let rl_config = rustyline::Config::builder()
        .auto_add_history(true)
        .max_history_size(1000)?
        .build();

    let mut rl: Editor<ListHelper, DefaultHistory> = Editor::with_config(rl_config)?;
    rl.set_helper(Some(helper));

    let history_path = config::base_dir()
        .map(|p| p.join("history"))
        .unwrap_or_else(|_| PathBuf::from(".k8slist_history"));
    if let Err(e) = rl.load_history(&history_path) {
        debug!(error = %e, "No REPL history loaded");
    }

    let export_dir = config.export_dir();

    print_welcome(&session);
    print_page(&mut session);

    loop {
        let prompt = format!("{}> ", session.table_id);

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match execute(&mut session, &export_dir, input) {
                    Ok(Flow::Quit) => {
                        println!("{}", style("Goodbye!").dim());
                        break;
                    }
                    Ok(Flow::Redraw) => print_page(&mut session),
                    Ok(Flow::Done) => {}
                    Err(e) => {
                        println!("{} {}", style("Error:").red().bold(), style(format!("{:#}", e)).red());
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", style("^C").dim());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", style("Goodbye!").dim());
                break;
            }
            Err(err) => {
                println!("{} {:?}", style("Error:").red().bold(), err);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(error = %e, "Could not create history directory");
    }
    if let Err(e) = rl.save_history(&history_path) {
        warn!(error = %e, "Could not save REPL history");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::pod_rows;
    use k8slist::{ColumnLayoutStore, MemoryLayoutBackend};
    use tempfile::TempDir;

    fn session() -> Session<MemoryLayoutBackend> {
        Session::new(Some("pods"), pod_rows(), 10, ColumnLayoutStore::new(MemoryLayoutBackend::new())).unwrap()
    }

    fn run(session: &mut Session<MemoryLayoutBackend>, input: &str) -> Result<Flow> {
        execute(session, Path::new("."), input)
    }

    #[test]
    fn test_filter_search_clear() {
        let mut s = session();
        assert_eq!(run(&mut s, "filter status=Running").unwrap(), Flow::Redraw);
        assert_eq!(s.page().rows().count(), 2);
        run(&mut s, "search web").unwrap();
        assert_eq!(s.page().rows().count(), 1);
        run(&mut s, "clear").unwrap();
        assert!(!s.state.has_active_filters());
        assert_eq!(s.page().rows().count(), 3);
    }

    #[test]
    fn test_sort_toggles_and_resets() {
        let mut s = session();
        run(&mut s, "sort restarts").unwrap();
        run(&mut s, "sort restarts").unwrap();
        let first = s.page().rows().next().unwrap()[0].clone();
        assert_eq!(first, "db, primary");
        run(&mut s, "sort").unwrap();
        assert_eq!(s.state.sort().map(|s| s.key.as_str()), Some("name"));
        assert!(run(&mut s, "sort age-of-universe").is_err());
    }

    #[test]
    fn test_selection_commands() {
        let mut s = session();
        run(&mut s, "select-page").unwrap();
        assert_eq!(s.state.selection().len(), 3);
        run(&mut s, "select-page").unwrap();
        assert!(s.state.selection().is_empty());
        run(&mut s, "select shop/web-1 kube-system/dns").unwrap();
        assert_eq!(s.state.selection().len(), 2);
        run(&mut s, "unselect").unwrap();
        assert!(s.state.selection().is_empty());
    }

    #[test]
    fn test_layout_commands() {
        let mut s = session();
        run(&mut s, "hide namespace").unwrap();
        assert!(!s.page().ids.contains(&"namespace".to_string()));
        run(&mut s, "show namespace").unwrap();
        assert!(s.page().ids.contains(&"namespace".to_string()));
        assert!(run(&mut s, "hide name").is_err());
        assert_eq!(run(&mut s, "width name 10").unwrap(), Flow::Redraw);
        assert_eq!(s.page().widths[0], 120);
    }

    #[test]
    fn test_paging_and_errors() {
        let mut s = session();
        assert!(run(&mut s, "page 0").is_err());
        assert!(run(&mut s, "page two").is_err());
        assert!(run(&mut s, "size 7").is_err());
        run(&mut s, "page 5").unwrap();
        assert_eq!(s.page().footer, "1-3 of 3 (page 1/1)");
        assert!(run(&mut s, "frobnicate").is_err());
        assert_eq!(run(&mut s, "quit").unwrap(), Flow::Quit);
    }

    #[test]
    fn test_export_command() {
        let dir = TempDir::new().unwrap();
        let mut s = session();
        let flow = execute(&mut s, dir.path(), "export json").unwrap();
        assert_eq!(flow, Flow::Done);
        assert!(dir.path().join("pods.json").exists());
        assert!(run(&mut s, "export xml").is_err());
    }

    #[test]
    fn test_completion() {
        let helper = ListHelper {
            columns: vec!["name".to_string(), "namespace".to_string(), "status".to_string()],
        };
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        let (start, pairs) = helper.complete("sel", 3, &ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<&str> = pairs.iter().map(|p| p.replacement.as_str()).collect();
        assert_eq!(names, vec!["select", "select-page"]);

        let (start, pairs) = helper.complete("filter nam", 10, &ctx).unwrap();
        assert_eq!(start, 7);
        assert_eq!(pairs.len(), 2);
    }
}
