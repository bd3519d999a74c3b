// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Filesystem primitives.
//!
//! File directives are converged through a small set of POSIX-like
//! primitives: probe a path, create a directory or file with its content,
//! and set ownership and permission bits. Owners and groups are numeric IDs, and
//! permission bits are a plain mask.

use std::{
    fs::{
        metadata, remove_file, set_permissions, symlink_metadata, DirBuilder, OpenOptions,
        Permissions,
    },
    io::{self, ErrorKind, Write},
    os::unix::fs::{chown, DirBuilderExt, OpenOptionsExt, PermissionsExt},
    path::Path,
};

/// Observed state of a path.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PathState {
    /// Path exists.
    Present { is_directory: bool },

    /// Path does not exist.
    Absent,
}

/// Filesystem primitives used to converge file directives.
pub trait Filesystem {
    /// Classify path as present or absent.
    ///
    /// # Errors
    ///
    /// - Return [`io::Error`] for any failure other than path not existing.
    /// - Return [`io::Error`] if path is a symbolic link to nothing.
    fn probe(&self, path: &Path) -> io::Result<PathState>;

    /// Create a single directory with permission bits.
    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Create a new file with permission bits, and write optional content.
    ///
    /// Fails if the path already exists. No file is left behind when the
    /// content cannot be written.
    fn create_file(&self, path: &Path, mode: u32, content: Option<&[u8]>) -> io::Result<()>;

    /// Set numeric owner and group of path.
    fn chown(&self, path: &Path, owner: u32, group: u32) -> io::Result<()>;

    /// Set permission bits of path.
    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;
}

impl<F> Filesystem for &F
where
    F: Filesystem + ?Sized,
{
    fn probe(&self, path: &Path) -> io::Result<PathState> {
        (**self).probe(path)
    }

    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        (**self).create_dir(path, mode)
    }

    fn create_file(&self, path: &Path, mode: u32, content: Option<&[u8]>) -> io::Result<()> {
        (**self).create_file(path, mode, content)
    }

    fn chown(&self, path: &Path, owner: u32, group: u32) -> io::Result<()> {
        (**self).chown(path, owner, group)
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        (**self).chmod(path, mode)
    }
}

/// Filesystem of the host itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFilesystem;

impl HostFilesystem {
    /// Construct new host filesystem.
    pub fn new() -> Self {
        Self
    }
}

impl Filesystem for HostFilesystem {
    fn probe(&self, path: &Path) -> io::Result<PathState> {
        match metadata(path) {
            Ok(meta) => Ok(PathState::Present {
                is_directory: meta.is_dir(),
            }),
            Err(error) if error.kind() == ErrorKind::NotFound => match symlink_metadata(path) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    Err(io::Error::other("dangling symbolic link"))
                }
                _ => Ok(PathState::Absent),
            },
            Err(error) => Err(error),
        }
    }

    fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
        DirBuilder::new().mode(mode).create(path)
    }

    fn create_file(&self, path: &Path, mode: u32, content: Option<&[u8]>) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(mode)
            .open(path)?;

        // INVARIANT: Write through the creating handle, mode may forbid reopening.
        let Some(content) = content else {
            return Ok(());
        };
        let written = file.write_all(content).and_then(|_| file.sync_all());
        drop(file);
        if written.is_err() {
            let _ = remove_file(path);
        }

        written
    }

    fn chown(&self, path: &Path, owner: u32, group: u32) -> io::Result<()> {
        chown(path, Some(owner), Some(group))
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        set_permissions(path, Permissions::from_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{
        fs::read,
        os::unix::fs::{symlink, MetadataExt},
    };

    #[sealed_test]
    fn host_probe_classifies_paths() -> anyhow::Result<()> {
        let fs = HostFilesystem::new();
        assert_eq!(fs.probe(Path::new("missing"))?, PathState::Absent);

        fs.create_dir(Path::new("dir"), 0o755)?;
        assert_eq!(
            fs.probe(Path::new("dir"))?,
            PathState::Present { is_directory: true }
        );

        fs.create_file(Path::new("file"), 0o644, None)?;
        assert_eq!(
            fs.probe(Path::new("file"))?,
            PathState::Present {
                is_directory: false
            }
        );

        Ok(())
    }

    #[sealed_test]
    fn host_create_file_refuses_existing() -> anyhow::Result<()> {
        let fs = HostFilesystem::new();
        fs.create_file(Path::new("file"), 0o644, None)?;
        let result = fs.create_file(Path::new("file"), 0o644, None);
        assert_eq!(result.map_err(|err| err.kind()), Err(ErrorKind::AlreadyExists));

        Ok(())
    }

    #[sealed_test]
    fn host_probe_rejects_dangling_symlink() -> anyhow::Result<()> {
        let fs = HostFilesystem::new();
        symlink("nowhere", "link")?;
        let result = fs.probe(Path::new("link")).map_err(|err| err.to_string());
        assert_eq!(result, Err("dangling symbolic link".into()));

        fs.create_file(Path::new("nowhere"), 0o644, None)?;
        assert_eq!(
            fs.probe(Path::new("link"))?,
            PathState::Present {
                is_directory: false
            }
        );

        Ok(())
    }

    #[sealed_test]
    fn host_create_read_only_file_with_content() -> anyhow::Result<()> {
        let fs = HostFilesystem::new();
        let path = Path::new("secret");
        fs.create_file(path, 0o400, Some(b"hunter2"))?;
        assert_eq!(read(path)?, b"hunter2");
        assert_eq!(metadata(path)?.mode() & 0o777, 0o400);

        Ok(())
    }

    #[sealed_test]
    fn host_create_chown_chmod() -> anyhow::Result<()> {
        let fs = HostFilesystem::new();
        let path = Path::new("file");
        fs.create_file(path, 0o600, Some(b"hello"))?;
        assert_eq!(read(path)?, b"hello");

        // INVARIANT: Owner can always chown to their own IDs.
        let meta = metadata(path)?;
        fs.chown(path, meta.uid(), meta.gid())?;
        fs.chmod(path, 0o640)?;
        assert_eq!(metadata(path)?.mode() & 0o7777, 0o640);

        Ok(())
    }
}
