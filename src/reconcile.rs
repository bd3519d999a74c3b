// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directive reconciliation.
//!
//! A __reconciler__ compares the desired state of one directive against the
//! observed state of the host, and applies the smallest action that brings
//! the host in line with the directive. Each directive kind has its own
//! reconciler:
//!
//! - [`package`] talks to the package manager.
//! - [`file`] talks to the filesystem.
//! - [`service`] talks to the service manager.
//!
//! Reconcilers report back through [`Outcome`] on success, and through
//! [`ReconcileError`] on failure. The [`Executor`](crate::executor::Executor)
//! turns both into a [`ReconcileResult`](crate::report::ReconcileResult), so
//! no reconciler failure ever escapes a run.
//!
//! # Error Taxonomy
//!
//! - __Precondition__ errors mean the directive cannot be satisfied given its
//!   own flags, e.g., a missing file that may not be created.
//! - __External command__ errors mean the package or service manager exited
//!   non-zero, or could not be spawned at all. Nothing is retried.
//! - __Syscall__ errors mean a filesystem operation failed.

pub mod file;
pub mod package;
pub mod service;

use crate::{
    command::{CommandLine, CommandOutput, CommandRunner},
    report::ReconcileResult,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
    path::PathBuf,
};

/// Successful reconciliation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Outcome {
    /// Host was changed to match directive.
    Changed,

    /// Host already matched directive.
    Unchanged,
}

impl From<Result<Outcome>> for ReconcileResult {
    fn from(result: Result<Outcome>) -> Self {
        match result {
            Ok(Outcome::Changed) => ReconcileResult::Converged,
            Ok(Outcome::Unchanged) => ReconcileResult::ConvergedNoop,
            Err(error) => ReconcileResult::Failed(error.to_string()),
        }
    }
}

/// Run external command, treating non-zero exit as failure.
///
/// # Errors
///
/// - Return [`ReconcileError::Spawn`] if command could not be spawned.
/// - Return [`ReconcileError::Command`] if command exited non-zero.
pub(crate) fn run_checked(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CommandOutput> {
    let command = CommandLine::new(program, args).to_string();
    let output = runner
        .run(program, args)
        .map_err(|source| ReconcileError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.is_success() {
        return Err(ReconcileError::Command {
            command,
            status: output
                .exit_code
                .map_or_else(|| "terminated by signal".into(), |code| code.to_string()),
            stderr: output.stderr,
        });
    }

    Ok(output)
}

/// Step of file reconciliation that failed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FileStep {
    Probe,
    CreateDirectory,
    CreateFile,
    Chown,
    Chmod,
}

impl Display for FileStep {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(match self {
            Self::Probe => "probe",
            Self::CreateDirectory => "create directory",
            Self::CreateFile => "create file",
            Self::Chown => "chown",
            Self::Chmod => "chmod",
        })
    }
}

/// All possible reconciliation failures.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Directive cannot be satisfied given its own flags.
    #[error("{0}")]
    Precondition(String),

    /// External command could not be spawned.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// External command exited non-zero.
    #[error("`{command}` exited with status {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// Filesystem operation failed.
    #[error("{step} failed for {:?}: {source}", .path.display())]
    Syscall {
        step: FileStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;
