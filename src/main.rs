// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
mod output;

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use k8slist::config::{self, Config};

use cli::{Args, Command, OutputFormat, Session};

/// Log file name under `~/.k8slist/log/`
const LOG_FILE: &str = "k8slist.log";
/// Rotated log files kept on disk
const LOG_FILES_KEPT: usize = 5;
const LOG_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default directive when `RUST_LOG` is unset
fn log_directive(verbose: bool) -> &'static str {
    if verbose { "k8slist=debug" } else { "k8slist=info" }
}

fn log_dir() -> PathBuf {
    config::base_dir()
        .map(|dir| dir.join("log"))
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Daily-rotating appender, also rolled over at `LOG_MAX_BYTES`
fn log_appender(dir: &Path) -> Result<RollingFileAppenderBase> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Could not create log directory {}", dir.display()))?;
    let condition = RollingConditionBase::new().daily().max_size(LOG_MAX_BYTES);
    RollingFileAppenderBase::new(dir.join(LOG_FILE), condition, LOG_FILES_KEPT)
        .with_context(|| format!("Could not open log file in {}", dir.display()))
}

/// Route tracing to the rolling log file, and to stderr when asked
fn init_logging(verbose: bool, to_stderr: bool) -> Result<()> {
    let (writer, guard) = log_appender(&log_dir())?.get_non_blocking_appender();
    // The background writer must outlive every log call
    std::mem::forget(guard);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(verbose)));
    let stderr = to_stderr.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(stderr)
        .init();
    Ok(())
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Using default configuration");
            Config::default()
        }
    }
}

/// `-o` wins over the configured default, which falls back to a table
fn output_format(args: &Args, config: &Config) -> OutputFormat {
    if let Some(format) = args.output {
        return format;
    }
    match config.default_output.as_deref() {
        Some(name) => OutputFormat::from_name(name).unwrap_or_else(|| {
            warn!(format = name, "Ignoring unknown default_output in config");
            OutputFormat::Table
        }),
        None => OutputFormat::Table,
    }
}

fn main() {
    let args = Args::parse();

    // Always log to ~/.k8slist/log/k8slist.log; batch mode with -v also logs to stderr
    let is_batch = args.command.is_none();
    if let Err(e) = init_logging(args.verbose, is_batch && args.verbose) {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    let result = match args.command {
        Some(Command::Interactive) => run_interactive(&args),
        None => run_batch(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_batch(args: &Args) -> Result<()> {
    let config = load_config();
    let mut session = Session::load(args, &config)?;

    if let Some(key) = &args.manifest {
        println!("{}", session.manifest(key)?);
        return Ok(());
    }

    let format = output_format(args, &config);
    println!("{}", session.page().format(format, args.no_headers)?);

    if let Some(dir) = &args.export {
        let path = session.export_to(dir, cli::session::export_format(format))?;
        eprintln!("Exported to {}", path.display());
    }

    Ok(())
}

fn run_interactive(args: &Args) -> Result<()> {
    if args.file.is_none() {
        bail!("Interactive mode needs an input file (-f FILE)");
    }
    let config = load_config();
    let session = Session::load(args, &config)?;
    cli::repl::run_repl(session, &config)
}
