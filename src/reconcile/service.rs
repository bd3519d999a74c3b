// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Service reconciliation.
//!
//! Services are never queried for their current status. The start, stop, and
//! restart primitives of the service manager are idempotent on their own, so
//! the matching primitive is simply issued every time.

use crate::{
    command::CommandRunner,
    directive::ServiceDirective,
    reconcile::{run_checked, Outcome, Result},
};

use tracing::{info, instrument};

const SERVICE: &str = "service";

/// Converge service directives through the service manager.
#[derive(Debug)]
pub struct ServiceReconciler<R>
where
    R: CommandRunner,
{
    runner: R,
}

impl<R> ServiceReconciler<R>
where
    R: CommandRunner,
{
    /// Construct new service reconciler.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Bring service to desired run-state.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError::Command`](crate::reconcile::ReconcileError::Command)
    ///   if service manager exits non-zero.
    #[instrument(skip(self, directive), fields(service = %directive.name), level = "debug")]
    pub fn apply(&self, directive: &ServiceDirective) -> Result<Outcome> {
        let action = match (directive.desired_running, directive.force_restart) {
            (true, true) => "restart",
            (true, false) => "start",
            (false, _) => "stop",
        };

        info!("{action} service {:?}", directive.name);
        run_checked(&self.runner, SERVICE, &[directive.name.as_str(), action])?;

        Ok(Outcome::Changed)
    }
}
