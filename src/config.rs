// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout and sources.
//!
//! Specify the layout of directive files, and the sources that hand an
//! ordered directive list over to the [`Executor`](crate::executor::Executor).
//!
//! # Directive File Layout
//!
//! A directive file is a TOML document that lists one `[[directive]]` table
//! per directive, in the order that they should be applied. Each table names
//! its directive kind through the `kind` key:
//!
//! ```toml
//! [[directive]]
//! kind = "package"
//! name = "nginx"
//! installed = true
//! upgrade = true
//!
//! [[directive]]
//! kind = "file"
//! path = "/etc/nginx/sites-available/default"
//! owner = 1000
//! group = 1000
//! mode = 0o664
//! create = true
//! content = "server {}"
//!
//! [[directive]]
//! kind = "service"
//! name = "nginx"
//! running = true
//! restart = true
//! ```
//!
//! File paths go through shell expansion, so `~` and environment variables
//! can be used in them.

use crate::directive::Directive;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Supply an ordered directive list.
pub trait ConfigSource {
    /// Fetch ordered directive list.
    ///
    /// # Errors
    ///
    /// - Return [`SourceError`] if directives cannot be read, or are invalid.
    fn fetch(&self) -> Result<Vec<Directive>>;
}

/// Directive file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Construct new directive file source.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn as_path(&self) -> &Path {
        self.path.as_path()
    }
}

impl ConfigSource for FileSource {
    #[instrument(skip(self), fields(path = %self.path.display()), level = "debug")]
    fn fetch(&self) -> Result<Vec<Directive>> {
        debug!("read directive file {:?}", self.path.display());
        let data = read_to_string(&self.path).map_err(|err| SourceError::Read {
            source: err,
            path: self.path.clone(),
        })?;

        Ok(data.parse::<DirectiveFile>()?.directives)
    }
}

/// Directive file content held in memory.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    data: &'a str,
}

impl<'a> StrSource<'a> {
    /// Construct new in-memory directive file source.
    pub fn new(data: &'a str) -> Self {
        Self { data }
    }
}

impl ConfigSource for StrSource<'_> {
    fn fetch(&self) -> Result<Vec<Directive>> {
        Ok(self.data.parse::<DirectiveFile>()?.directives)
    }
}

/// Literal directive list.
#[derive(Default, Debug, Clone)]
pub struct LiteralSource {
    directives: Vec<Directive>,
}

impl LiteralSource {
    /// Construct new literal source.
    pub fn new(directives: impl IntoIterator<Item = impl Into<Directive>>) -> Self {
        Self {
            directives: directives.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConfigSource for LiteralSource {
    fn fetch(&self) -> Result<Vec<Directive>> {
        for directive in &self.directives {
            validate(directive)?;
        }

        Ok(self.directives.clone())
    }
}

/// Directive file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DirectiveFile {
    /// Ordered listing of directives.
    #[serde(rename = "directive", default)]
    pub directives: Vec<Directive>,
}

impl FromStr for DirectiveFile {
    type Err = SourceError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut layout: DirectiveFile =
            toml::de::from_str(data).map_err(SourceError::Deserialize)?;

        for directive in &mut layout.directives {
            // INVARIANT: Perform shell expansion on file paths.
            if let Directive::File(file) = directive {
                file.path = shellexpand::full(file.path.to_string_lossy().as_ref())
                    .map_err(SourceError::ShellExpansion)?
                    .into_owned()
                    .into();
            }

            validate(directive)?;
        }

        Ok(layout)
    }
}

impl Display for DirectiveFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(SourceError::Serialize)?
                .as_str(),
        )
    }
}

/// Reject directives that are structurally invalid.
fn validate(directive: &Directive) -> Result<()> {
    let invalid = |reason: &str| -> Result<()> {
        Err(SourceError::Invalid {
            directive: directive.to_string(),
            reason: reason.to_string(),
        })
    };

    match directive {
        Directive::Package(package) if package.name.trim().is_empty() => {
            invalid("package name is empty")
        }
        Directive::Service(service) if service.name.trim().is_empty() => {
            invalid("service name is empty")
        }
        Directive::File(file) if file.path.as_os_str().is_empty() => invalid("path is empty"),
        Directive::File(file) if file.mode & !0o7777 != 0 => {
            invalid("mode has bits outside of 0o7777")
        }
        Directive::File(file) if file.is_directory && file.content.is_some() => {
            invalid("content cannot be set on a directory")
        }
        _ => Ok(()),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Directive file cannot be read.
    #[error("failed to read directive file at {:?}", .path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize directives.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize directives.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on file path.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Directive is structurally invalid.
    #[error("invalid {directive}: {reason}")]
    Invalid { directive: String, reason: String },
}

impl From<SourceError> for FmtError {
    fn from(_: SourceError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
pub type Result<T, E = SourceError> = std::result::Result<T, E>;
