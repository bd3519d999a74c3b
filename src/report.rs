// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Run reporting.
//!
//! Every invocation of the [`Executor`](crate::executor::Executor) produces a
//! [`RunReport`]. The report records when the run started and finished, the
//! exact directives that were applied, and one [`ReconcileResult`] per
//! directive at the same index.
//!
//! A run never fails as a whole. Instead, the caller inspects the report to
//! find out which directives failed, if any. Oxiconf does not persist reports
//! by itself. The report can be rendered as TOML through its [`Display`]
//! implementation, and the caller decides where that text should go.

use crate::directive::Directive;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::fmt::{Display, Error as FmtError, Formatter, Result as FmtResult};

/// Outcome of applying a single directive.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ReconcileResult {
    /// Action was taken, and host now matches directive.
    Converged,

    /// Host already matched directive, so nothing was done.
    ConvergedNoop,

    /// Directive could not be converged.
    Failed(String),
}

impl ReconcileResult {
    /// Check if result is a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Reason of failure, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

impl Display for ReconcileResult {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Converged => fmt.write_str("converged"),
            Self::ConvergedNoop => fmt.write_str("converged (no-op)"),
            Self::Failed(reason) => write!(fmt, "failed: {reason}"),
        }
    }
}

/// Structured record of one run.
///
/// # Invariant
///
/// - Results are index-aligned with directives.
/// - Once handed to the caller, a report is never modified.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RunReport {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    directives: Vec<Directive>,
    results: Vec<ReconcileResult>,
}

impl RunReport {
    /// Begin recording a new run over a set of directives.
    pub(crate) fn begin(directives: Vec<Directive>) -> Self {
        let now = Utc::now();
        let capacity = directives.len();
        Self {
            started_at: now,
            finished_at: now,
            directives,
            results: Vec::with_capacity(capacity),
        }
    }

    /// Record the result of the next directive.
    pub(crate) fn record(&mut self, result: ReconcileResult) {
        self.results.push(result);
    }

    /// Seal the report.
    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Wall clock time that the run took.
    pub fn duration(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }

    /// Directives that were applied, in order.
    pub fn directives(&self) -> &[Directive] {
        self.directives.as_slice()
    }

    /// Results of each directive, in order.
    pub fn results(&self) -> &[ReconcileResult] {
        self.results.as_slice()
    }

    /// Iterate each directive along with its result.
    pub fn entries(&self) -> impl Iterator<Item = (&Directive, &ReconcileResult)> {
        self.directives.iter().zip(self.results.iter())
    }

    /// Iterate all failed directives along with their index and reason.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Directive, &str)> {
        self.entries()
            .enumerate()
            .filter_map(|(index, (directive, result))| {
                result.reason().map(|reason| (index, directive, reason))
            })
    }

    /// Check that no directive failed.
    pub fn is_converged(&self) -> bool {
        !self.results.iter().any(ReconcileResult::is_failed)
    }

    /// Count results by outcome.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for result in &self.results {
            match result {
                ReconcileResult::Converged => summary.converged += 1,
                ReconcileResult::ConvergedNoop => summary.noop += 1,
                ReconcileResult::Failed(_) => summary.failed += 1,
            }
        }

        summary
    }
}

impl Display for RunReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let layout = ReportLayout {
            started_at: self.started_at,
            finished_at: self.finished_at,
            entry: self
                .entries()
                .map(|(directive, result)| EntryLayout { result, directive })
                .collect(),
        };

        fmt.write_str(
            toml::ser::to_string_pretty(&layout)
                .map_err(|_| FmtError)?
                .as_str(),
        )
    }
}

/// Tally of results in a run.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct RunSummary {
    pub converged: usize,
    pub noop: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.converged + self.noop + self.failed
    }
}

impl Display for RunSummary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} directives: {} converged, {} unchanged, {} failed",
            self.total(),
            self.converged,
            self.noop,
            self.failed
        )
    }
}

#[derive(Serialize)]
struct ReportLayout<'a> {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    entry: Vec<EntryLayout<'a>>,
}

#[derive(Serialize)]
struct EntryLayout<'a> {
    #[serde(flatten)]
    result: &'a ReconcileResult,
    directive: &'a Directive,
}
