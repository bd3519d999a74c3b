// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External command invocation.
//!
//! Package and service directives are converged by calling out to the host's
//! package manager and service manager. All of those calls go through the
//! [`CommandRunner`] trait so that the reconcilers never spawn processes
//! directly.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io,
    process::Command,
};
use tracing::{debug, instrument};

/// Invoke external programs.
pub trait CommandRunner {
    /// Run program with arguments to completion, capturing its output.
    ///
    /// A program that ran but exited non-zero is not an error. Only failure
    /// to spawn or wait on the program is.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] if program could not be spawned.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

impl<R> CommandRunner for &R
where
    R: CommandRunner + ?Sized,
{
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        (**self).run(program, args)
    }
}

/// Captured result of a finished program.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct CommandOutput {
    /// Exit code, or `None` if program was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Construct output of a program that exited with given code.
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Construct output of a program that exited zero without output.
    pub fn success() -> Self {
        Self::new(0, "", "")
    }

    /// Check if program exited zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Command line of a program invocation.
///
/// Only exists to render a readable command line in logs and failure reasons.
#[derive(Debug, Clone, Copy)]
pub struct CommandLine<'a> {
    pub program: &'a str,
    pub args: &'a [&'a str],
}

impl<'a> CommandLine<'a> {
    pub fn new(program: &'a str, args: &'a [&'a str]) -> Self {
        Self { program, args }
    }
}

impl Display for CommandLine<'_> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.program)?;
        for arg in self.args {
            write!(fmt, " {arg}")?;
        }

        Ok(())
    }
}

/// Command runner that spawns real processes on the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    /// Construct new system command runner.
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip(self), level = "debug")]
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        debug!("spawn {}", CommandLine::new(program, args));
        let output = Command::new(program).args(args).output()?;
        let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
        let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();

        // INVARIANT: Chomp trailing newlines.
        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: chomp(stdout),
            stderr: chomp(stderr),
        })
    }
}

fn chomp(message: String) -> String {
    message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message)
}
