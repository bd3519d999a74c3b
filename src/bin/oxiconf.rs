// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use oxiconf::{
    config::{ConfigSource, FileSource},
    executor::Executor,
    path::default_directive_file,
    report::RunReport,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs::write, path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  oxiconf [options] <oxiconf-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Apply(opts) => run_apply(opts),
            Command::Check(opts) => run_check(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Converge host to state described by directive file.
    #[command(override_usage = "oxiconf apply [options]")]
    Apply(ApplyOptions),

    /// Validate directive file, and list its directives without applying them.
    #[command(override_usage = "oxiconf check [options]")]
    Check(CheckOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ApplyOptions {
    /// Path to directive file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Write run report to path instead of standard output.
    #[arg(short, long, value_name = "path")]
    pub report: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CheckOptions {
    /// Path to directive file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn directive_source(config: Option<PathBuf>) -> Result<FileSource> {
    let path = match config {
        Some(path) => path,
        None => default_directive_file()?,
    };

    Ok(FileSource::new(path))
}

fn run_apply(opts: ApplyOptions) -> Result<()> {
    let source = directive_source(opts.config)?;
    let directives = source
        .fetch()
        .with_context(|| format!("failed to load {:?}", source.as_path().display()))?;

    let bar = ProgressBar::new(directives.len() as u64);
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}] {pos}/{len}",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);

    let executor = Executor::host();
    let report = executor.execute_with(directives, |_, directive, _| {
        bar.set_message(directive.to_string());
        bar.inc(1);
    });
    bar.finish_and_clear();

    emit_report(&report, opts.report)?;
    info!("{}", report.summary());

    for (index, directive, reason) in report.failures() {
        error!("directive #{index} ({directive}) failed: {reason}");
    }

    if !report.is_converged() {
        bail!("{} of {} directives failed", report.summary().failed, report.summary().total());
    }

    Ok(())
}

fn emit_report(report: &RunReport, path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        print!("{report}");
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        mkdirp::mkdirp(parent)
            .with_context(|| format!("failed to create {:?}", parent.display()))?;
    }

    write(&path, report.to_string())
        .with_context(|| format!("failed to write report to {:?}", path.display()))?;
    info!("report written to {:?}", path.display());

    Ok(())
}

fn run_check(opts: CheckOptions) -> Result<()> {
    let source = directive_source(opts.config)?;
    let directives = source
        .fetch()
        .with_context(|| format!("failed to load {:?}", source.as_path().display()))?;

    info!(
        "{:?} holds {} valid directives",
        source.as_path().display(),
        directives.len()
    );
    for (index, directive) in directives.iter().enumerate() {
        println!("{index:>3}  {directive}");
    }

    Ok(())
}
