// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package reconciliation.
//!
//! Packages are converged through dpkg and apt. The package database listing
//! determines whether a package is currently installed. Only an exact name
//! match with an "installed" status counts as present.
//!
//! | installed | present | upgrade | action                          |
//! |-----------|---------|---------|---------------------------------|
//! | true      | false   | any     | install                         |
//! | true      | true    | false   | nothing                         |
//! | true      | true    | true    | refresh package index, upgrade  |
//! | false     | true    | any     | remove                          |
//! | false     | false   | any     | fail, package not present       |

use crate::{
    command::CommandRunner,
    directive::PackageDirective,
    reconcile::{run_checked, Outcome, ReconcileError, Result},
};

use tracing::{debug, info, instrument};

const DPKG_QUERY: &str = "dpkg-query";
const APT_GET: &str = "apt-get";
const LISTING_FORMAT: &str = "--showformat=${Package}\\t${db:Status-Status}\\n";

/// Converge package directives through dpkg and apt.
#[derive(Debug)]
pub struct PackageReconciler<R>
where
    R: CommandRunner,
{
    runner: R,
}

impl<R> PackageReconciler<R>
where
    R: CommandRunner,
{
    /// Construct new package reconciler.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Bring package to desired state.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError::Command`] if package database query,
    ///   install, index refresh, upgrade, or removal exits non-zero.
    /// - Return [`ReconcileError::Precondition`] if package is marked for
    ///   removal but not present.
    #[instrument(skip(self, directive), fields(package = %directive.name), level = "debug")]
    pub fn apply(&self, directive: &PackageDirective) -> Result<Outcome> {
        let present = self.is_installed(&directive.name)?;
        debug!("package {:?} present: {present}", directive.name);

        match (directive.desired_installed, present) {
            (true, false) => {
                info!("install package {:?}", directive.name);
                run_checked(&self.runner, APT_GET, &["install", "-y", directive.name.as_str()])?;
                Ok(Outcome::Changed)
            }
            (true, true) if directive.upgrade => {
                info!("refresh package index to upgrade {:?}", directive.name);
                run_checked(&self.runner, APT_GET, &["update"])?;

                info!("upgrade package {:?}", directive.name);
                run_checked(
                    &self.runner,
                    APT_GET,
                    &["install", "--only-upgrade", "-y", directive.name.as_str()],
                )?;
                Ok(Outcome::Changed)
            }
            (true, true) => Ok(Outcome::Unchanged),
            (false, true) => {
                info!("remove package {:?}", directive.name);
                run_checked(&self.runner, APT_GET, &["remove", "-y", directive.name.as_str()])?;
                Ok(Outcome::Changed)
            }
            (false, false) => Err(ReconcileError::Precondition(format!(
                "package {:?} marked for removal but not present",
                directive.name
            ))),
        }
    }

    /// Check if package is installed according to package database.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError::Command`] if package database cannot be
    ///   queried.
    pub fn is_installed(&self, name: &str) -> Result<bool> {
        let output = run_checked(&self.runner, DPKG_QUERY, &["-W", LISTING_FORMAT])?;
        Ok(listing_contains(&output.stdout, name))
    }
}

/// Scan package listing for an installed package with exact name.
///
/// Each line is `<package>[:<arch>]\t<status>`.
fn listing_contains(listing: &str, name: &str) -> bool {
    listing.lines().any(|line| {
        let mut fields = line.split('\t');
        let package = fields.next().unwrap_or_default();
        let status = fields.next().unwrap_or_default();

        // INVARIANT: Architecture qualifier is not part of the package name.
        let package = package.split_once(':').map_or(package, |(base, _)| base);
        package == name && status.trim() == "installed"
    })
}
