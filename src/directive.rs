// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Directive data model.
//!
//! A __directive__ is a single unit of desired host state. Oxiconf knows about
//! three kinds of directive: packages that should (or should not) be
//! installed, files or directories that should exist with a given owner,
//! group, and mode, and services that should be running or stopped.
//!
//! Directives are plain immutable values. They are built once from
//! configuration input, and then handed over to the
//! [`Executor`](crate::executor::Executor) in the order that they should be
//! applied. Oxiconf never reorders directives on its own, so if a service
//! needs its package installed first, then the package directive must come
//! first.
//!
//! # See Also
//!
//! 1. [`config`](crate::config)
//! 2. [`reconcile`](crate::reconcile)

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

/// Unit of desired host state.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Directive {
    /// Desired state of a system package.
    Package(PackageDirective),

    /// Desired state of a file or directory.
    File(FileDirective),

    /// Desired run-state of a system service.
    Service(ServiceDirective),
}

impl Directive {
    /// Short name of the directive kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Package(_) => "package",
            Self::File(_) => "file",
            Self::Service(_) => "service",
        }
    }
}

impl Display for Directive {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Package(package) => write!(fmt, "package {:?}", package.name),
            Self::File(file) => write!(fmt, "file {:?}", file.path.display()),
            Self::Service(service) => write!(fmt, "service {:?}", service.name),
        }
    }
}

impl From<PackageDirective> for Directive {
    fn from(directive: PackageDirective) -> Self {
        Self::Package(directive)
    }
}

impl From<FileDirective> for Directive {
    fn from(directive: FileDirective) -> Self {
        Self::File(directive)
    }
}

impl From<ServiceDirective> for Directive {
    fn from(directive: ServiceDirective) -> Self {
        Self::Service(directive)
    }
}

/// Desired state of a system package.
///
/// # Invariant
///
/// - The upgrade flag only matters when the package should be installed.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDirective {
    /// Exact name of the package in the package database.
    pub name: String,

    /// Whether the package should be installed or removed.
    #[serde(rename = "installed", default = "yes")]
    pub desired_installed: bool,

    /// Refresh the package index and upgrade the package if already installed.
    #[serde(default)]
    pub upgrade: bool,
}

impl PackageDirective {
    /// Construct new package directive that installs a package without
    /// upgrading it.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desired_installed: true,
            upgrade: false,
        }
    }

    /// Set whether package should be installed.
    pub fn installed(mut self, installed: bool) -> Self {
        self.desired_installed = installed;
        self
    }

    /// Set whether package should be upgraded when present.
    pub fn upgrade(mut self, upgrade: bool) -> Self {
        self.upgrade = upgrade;
        self
    }
}

/// Desired state of a file or directory.
///
/// # Invariant
///
/// - Content only applies to regular files, never to directories.
/// - A missing path with `create_if_missing` unset is only reported at apply
///   time.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileDirective {
    /// Path of the file or directory.
    pub path: PathBuf,

    /// Numeric user ID to own the path.
    pub owner: u32,

    /// Numeric group ID to own the path.
    pub group: u32,

    /// Permission bits of the path.
    #[serde(default = "default_mode")]
    pub mode: u32,

    /// Whether the path is a directory.
    #[serde(rename = "directory", default)]
    pub is_directory: bool,

    /// Create path when it does not exist.
    #[serde(rename = "create", default)]
    pub create_if_missing: bool,

    /// Content of newly created file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<FileContent>,
}

impl FileDirective {
    /// Construct new file directive.
    ///
    /// Defaults to a regular file with mode `0644` that must already exist.
    pub fn new(path: impl Into<PathBuf>, owner: u32, group: u32) -> Self {
        Self {
            path: path.into(),
            owner,
            group,
            mode: default_mode(),
            is_directory: false,
            create_if_missing: false,
            content: None,
        }
    }

    /// Set permission bits.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Treat path as a directory.
    pub fn directory(mut self, is_directory: bool) -> Self {
        self.is_directory = is_directory;
        self
    }

    /// Create path if it is missing.
    pub fn create(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    /// Set content to write into newly created file.
    pub fn content(mut self, content: impl Into<FileContent>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Treat path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.path.as_path()
    }
}

/// Raw byte content of a file directive.
///
/// Written as a plain string in directive files. Converting back into a
/// string is lossy: bytes that are not valid UTF-8 become U+FFFD, so
/// binary content does not survive a trip through a rendered report.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub struct FileContent(Vec<u8>);

impl FileContent {
    /// Treat content as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for FileContent {
    fn from(content: String) -> Self {
        Self(content.into_bytes())
    }
}

impl From<&str> for FileContent {
    fn from(content: &str) -> Self {
        Self(content.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(content: Vec<u8>) -> Self {
        Self(content)
    }
}

impl From<FileContent> for String {
    fn from(content: FileContent) -> Self {
        String::from_utf8_lossy(content.as_bytes()).into_owned()
    }
}

/// Desired run-state of a system service.
///
/// # Invariant
///
/// - The restart flag only matters when the service should be running.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDirective {
    /// Name of the service known to the service manager.
    pub name: String,

    /// Whether service should be running or stopped.
    #[serde(rename = "running", default = "yes")]
    pub desired_running: bool,

    /// Restart service instead of just starting it.
    #[serde(rename = "restart", default)]
    pub force_restart: bool,
}

impl ServiceDirective {
    /// Construct new service directive that starts a service.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desired_running: true,
            force_restart: false,
        }
    }

    /// Set whether service should be running.
    pub fn running(mut self, running: bool) -> Self {
        self.desired_running = running;
        self
    }

    /// Set whether service should be restarted.
    pub fn restart(mut self, restart: bool) -> Self {
        self.force_restart = restart;
        self
    }
}

fn yes() -> bool {
    true
}

fn default_mode() -> u32 {
    0o644
}
