// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directive execution.
//!
//! The executor applies an ordered list of directives to the host, one at a
//! time, in the exact order given. Each directive is dispatched to the
//! reconciler of its kind. Whatever the reconciler returns is recorded into
//! the [`RunReport`] at the same index as the directive.
//!
//! A failing directive never stops the run. Every directive after it is still
//! applied, and the failure shows up as data in the report instead.
//!
//! # Concurrency
//!
//! Directives are applied sequentially on the calling thread. Package and
//! service managers serialize on their own locks, so running them side by
//! side would only cause spurious failures. Every reconciler step blocks, and
//! nothing in here times out. A hung external command hangs the run.

use crate::{
    command::{CommandRunner, SystemRunner},
    directive::Directive,
    fs::{Filesystem, HostFilesystem},
    reconcile::{
        file::FileReconciler, package::PackageReconciler, service::ServiceReconciler,
    },
    report::{ReconcileResult, RunReport},
};

use tracing::{debug, info, instrument, warn};

/// Apply directives to the host.
#[derive(Debug, Default)]
pub struct Executor<R = SystemRunner, F = HostFilesystem>
where
    R: CommandRunner,
    F: Filesystem,
{
    runner: R,
    fs: F,
}

impl Executor {
    /// Construct executor that acts on the host itself.
    pub fn host() -> Self {
        Self::new(SystemRunner::new(), HostFilesystem::new())
    }
}

impl<R, F> Executor<R, F>
where
    R: CommandRunner,
    F: Filesystem,
{
    /// Construct new executor with given command runner and filesystem.
    pub fn new(runner: R, fs: F) -> Self {
        Self { runner, fs }
    }

    /// Apply all directives in order.
    ///
    /// Never fails. Inspect returned report to learn about failed directives.
    pub fn execute(&self, directives: Vec<Directive>) -> RunReport {
        self.execute_with(directives, |_, _, _| {})
    }

    /// Apply all directives in order, calling observer after each one.
    ///
    /// The observer receives the index of the directive, the directive itself,
    /// and its result.
    #[instrument(skip(self, directives, observer), fields(count = directives.len()), level = "debug")]
    pub fn execute_with<O>(&self, directives: Vec<Directive>, mut observer: O) -> RunReport
    where
        O: FnMut(usize, &Directive, &ReconcileResult),
    {
        info!("apply {} directives", directives.len());
        let mut report = RunReport::begin(directives);

        // INVARIANT: Exactly one result per directive, in directive order.
        for index in 0..report.directives().len() {
            let directive = &report.directives()[index];
            let result = self.apply(directive);
            match &result {
                ReconcileResult::Failed(reason) => warn!("{directive} failed: {reason}"),
                result => info!("{directive} {result}"),
            }

            observer(index, directive, &result);
            report.record(result);
        }

        let report = report.finish();
        debug!("{}", report.summary());

        report
    }

    /// Apply a single directive.
    pub fn apply(&self, directive: &Directive) -> ReconcileResult {
        match directive {
            Directive::Package(package) => {
                PackageReconciler::new(&self.runner).apply(package).into()
            }
            Directive::File(file) => FileReconciler::new(&self.fs).apply(file).into(),
            Directive::Service(service) => {
                ServiceReconciler::new(&self.runner).apply(service).into()
            }
        }
    }
}
