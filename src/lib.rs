// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative host convergence.
//!
//! Oxiconf takes an ordered list of __directives__ describing the desired
//! state of a single host, i.e., which packages are installed, which files
//! exist with what ownership and permissions, and which services are running.
//! Each directive is applied in order, and the outcome of every directive is
//! recorded into a [`RunReport`].
//!
//! # Convergence
//!
//! Every directive kind has a reconciler that compares what the directive
//! wants against what the host currently looks like, and performs the
//! smallest action that closes the gap. A directive that fails is recorded as
//! failed, and the run moves on to the next directive. Thus, a run always
//! produces a complete report, and a caller learns about partial failure by
//! inspecting that report.
//!
//! There is no dependency graph between directives, no rollback, and no
//! concurrency. Directives run one after another in the order given.

pub mod command;
pub mod config;
pub mod directive;
pub mod executor;
pub mod fs;
pub mod path;
pub mod reconcile;
pub mod report;

pub use config::{ConfigSource, FileSource, LiteralSource, SourceError, StrSource};
pub use directive::{Directive, FileContent, FileDirective, PackageDirective, ServiceDirective};
pub use executor::Executor;
pub use report::{ReconcileResult, RunReport, RunSummary};
