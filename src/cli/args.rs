// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "k8slist")]
#[command(author, version, about = "Filter, sort, page and export Kubernetes resource lists")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Read manifests (JSON, YAML, multi-document YAML or a List) from a file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Resource preset (pods, deploy, svc, ...). Detected from the input when omitted
    #[arg(short, long, value_name = "RESOURCE")]
    pub resource: Option<String>,

    /// Column filter, repeatable. Examples: --filter status=Running,Pending --filter ns=kube-system
    #[arg(long, value_name = "COLUMN=V1,V2")]
    pub filter: Vec<String>,

    /// Free-text search. Supports "field:value", "re:<regex>" and "/<regex>/"
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Sort column
    #[arg(long, value_name = "COLUMN")]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Page number, starting at 1
    #[arg(short, long, value_name = "N")]
    pub page: Option<usize>,

    /// Rows per page (10, 25, 50 or 100)
    #[arg(long, value_name = "N")]
    pub page_size: Option<usize>,

    /// Group the page by a column
    #[arg(short, long, value_name = "COLUMN")]
    pub group_by: Option<String>,

    /// Select a row by key (namespace/name or name), repeatable. Exports cover only selected rows
    #[arg(long, value_name = "KEY")]
    pub select: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Write an export of the filtered list into DIR (format follows -o, table exports CSV)
    #[arg(long, value_name = "DIR")]
    pub export: Option<PathBuf>,

    /// Print the full manifest of one row and exit
    #[arg(long, value_name = "KEY")]
    pub manifest: Option<String>,

    /// Omit column headers in output
    #[arg(long)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start interactive REPL mode
    Interactive,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
    Yaml,
}

impl OutputFormat {
    /// Parse a config value such as "json"; case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_flags() {
        let args = Args::parse_from([
            "k8slist",
            "-f",
            "pods.yaml",
            "--filter",
            "status=Running,Pending",
            "--filter",
            "ns=kube-system",
            "--sort",
            "restarts",
            "--desc",
            "-p",
            "2",
            "-o",
            "json",
        ]);
        assert_eq!(args.file, Some(PathBuf::from("pods.yaml")));
        assert_eq!(args.filter.len(), 2);
        assert_eq!(args.sort.as_deref(), Some("restarts"));
        assert!(args.desc);
        assert_eq!(args.page, Some(2));
        assert_eq!(args.output, Some(OutputFormat::Json));
        assert!(args.command.is_none());
    }

    #[test]
    fn test_desc_requires_sort() {
        assert!(Args::try_parse_from(["k8slist", "--desc"]).is_err());
    }

    #[test]
    fn test_interactive_subcommand() {
        let args = Args::parse_from(["k8slist", "-f", "x.json", "interactive"]);
        assert!(matches!(args.command, Some(Command::Interactive)));
    }

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("YAML"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::from_name("table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::from_name("xml"), None);
    }
}
