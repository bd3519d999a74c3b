// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use oxiconf::command::{CommandOutput, CommandRunner};
use std::{cell::RefCell, collections::HashSet, io};

/// Simulated dpkg, apt, and service manager.
///
/// Keeps track of installed packages, so that installs and removals issued
/// through it show up in later package database queries.
#[derive(Debug, Default)]
pub(crate) struct HostFixture {
    installed: RefCell<HashSet<String>>,
    broken_services: HashSet<String>,
    calls: RefCell<Vec<String>>,
}

impl HostFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_installed(self, packages: impl IntoIterator<Item = &'static str>) -> Self {
        self.installed
            .borrow_mut()
            .extend(packages.into_iter().map(ToString::to_string));
        self
    }

    pub(crate) fn with_broken_service(mut self, name: &str) -> Self {
        self.broken_services.insert(name.to_string());
        self
    }

    pub(crate) fn is_installed(&self, name: &str) -> bool {
        self.installed.borrow().contains(name)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for HostFixture {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.borrow_mut().push(line);

        let output = match (program, args) {
            ("dpkg-query", _) => {
                let mut packages = self.installed.borrow().iter().cloned().collect::<Vec<_>>();
                packages.sort();
                let listing = packages
                    .iter()
                    .map(|name| format!("{name}\tinstalled\n"))
                    .collect::<String>();
                CommandOutput::new(0, listing, "")
            }
            ("apt-get", ["install", "-y", name]) => {
                self.installed.borrow_mut().insert(name.to_string());
                CommandOutput::success()
            }
            ("apt-get", ["remove", "-y", name]) => {
                self.installed.borrow_mut().remove(*name);
                CommandOutput::success()
            }
            ("apt-get", ["update"] | ["install", "--only-upgrade", "-y", _]) => {
                CommandOutput::success()
            }
            ("service", [name, _]) if self.broken_services.contains(*name) => {
                CommandOutput::new(1, "", format!("{name}: unrecognized service"))
            }
            ("service", [_, "start" | "stop" | "restart"]) => CommandOutput::success(),
            _ => CommandOutput::new(127, "", format!("{program}: command not found")),
        };

        Ok(output)
    }
}
