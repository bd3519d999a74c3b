// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File reconciliation.
//!
//! A file directive first makes sure that its path exists, creating it when
//! allowed to. Content is only ever written to newly created files. An
//! existing file keeps whatever content it already has.
//!
//! Once the path is known to exist, its owner, group, and mode are always
//! applied again. Thus, a file directive never reports a no-op.

use crate::{
    directive::FileDirective,
    fs::{Filesystem, PathState},
    reconcile::{FileStep, Outcome, ReconcileError, Result},
};

use std::{io, path::Path};
use tracing::{info, instrument, warn};

/// Converge file directives through filesystem primitives.
#[derive(Debug)]
pub struct FileReconciler<F>
where
    F: Filesystem,
{
    fs: F,
}

impl<F> FileReconciler<F>
where
    F: Filesystem,
{
    /// Construct new file reconciler.
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Bring file or directory to desired state.
    ///
    /// # Errors
    ///
    /// - Return [`ReconcileError::Precondition`] if path does not exist, and
    ///   may not be created.
    /// - Return [`ReconcileError::Syscall`] if probing, creation, chown, or
    ///   chmod fails.
    #[instrument(skip(self, directive), fields(path = %directive.path.display()), level = "debug")]
    pub fn apply(&self, directive: &FileDirective) -> Result<Outcome> {
        let path = directive.as_path();
        let state = self
            .fs
            .probe(path)
            .map_err(|err| syscall(FileStep::Probe, path, err))?;

        match state {
            PathState::Absent if !directive.create_if_missing => {
                return Err(ReconcileError::Precondition(format!(
                    "{:?} does not exist and createIfMissing is false",
                    path.display()
                )));
            }
            PathState::Absent => self.create(directive)?,
            PathState::Present { is_directory } if is_directory != directive.is_directory => {
                warn!(
                    "{:?} exists but is {}a directory, enforcing ownership and mode anyway",
                    path.display(),
                    if is_directory { "" } else { "not " }
                );
            }
            PathState::Present { .. } => {}
        }

        info!(
            "enforce owner {}:{} and mode {:o} on {:?}",
            directive.owner,
            directive.group,
            directive.mode,
            path.display()
        );
        self.fs
            .chown(path, directive.owner, directive.group)
            .map_err(|err| syscall(FileStep::Chown, path, err))?;
        self.fs
            .chmod(path, directive.mode)
            .map_err(|err| syscall(FileStep::Chmod, path, err))?;

        Ok(Outcome::Changed)
    }

    fn create(&self, directive: &FileDirective) -> Result<()> {
        let path = directive.as_path();
        if directive.is_directory {
            info!("create directory {:?}", path.display());
            return self
                .fs
                .create_dir(path, directive.mode)
                .map_err(|err| syscall(FileStep::CreateDirectory, path, err));
        }

        info!("create file {:?}", path.display());
        let content = directive
            .content
            .as_ref()
            .map(|content| content.as_bytes())
            .filter(|content| !content.is_empty());
        self.fs
            .create_file(path, directive.mode, content)
            .map_err(|err| syscall(FileStep::CreateFile, path, err))
    }
}

fn syscall(step: FileStep, path: &Path, source: io::Error) -> ReconcileError {
    ReconcileError::Syscall {
        step,
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::HostFilesystem;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{
        cell::RefCell,
        fs::{metadata, read, write},
        io::ErrorKind,
        os::unix::fs::{symlink, MetadataExt, PermissionsExt},
    };

    /// Host filesystem that records mutations, and can fail a single step.
    #[derive(Debug, Default)]
    struct RecordingFilesystem {
        host: HostFilesystem,
        fail: Option<FileStep>,
        steps: RefCell<Vec<FileStep>>,
    }

    impl RecordingFilesystem {
        fn failing(step: FileStep) -> Self {
            Self {
                fail: Some(step),
                ..Default::default()
            }
        }

        fn record(&self, step: FileStep) -> io::Result<()> {
            self.steps.borrow_mut().push(step);
            if self.fail == Some(step) {
                return Err(io::Error::new(ErrorKind::PermissionDenied, "denied"));
            }

            Ok(())
        }

        fn steps(&self) -> Vec<FileStep> {
            self.steps.borrow().clone()
        }
    }

    impl Filesystem for RecordingFilesystem {
        fn probe(&self, path: &Path) -> io::Result<PathState> {
            if self.fail == Some(FileStep::Probe) {
                return Err(io::Error::new(ErrorKind::PermissionDenied, "denied"));
            }

            self.host.probe(path)
        }

        fn create_dir(&self, path: &Path, mode: u32) -> io::Result<()> {
            self.record(FileStep::CreateDirectory)?;
            self.host.create_dir(path, mode)
        }

        fn create_file(&self, path: &Path, mode: u32, content: Option<&[u8]>) -> io::Result<()> {
            self.record(FileStep::CreateFile)?;
            self.host.create_file(path, mode, content)
        }

        fn chown(&self, path: &Path, owner: u32, group: u32) -> io::Result<()> {
            self.record(FileStep::Chown)?;
            self.host.chown(path, owner, group)
        }

        fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
            self.record(FileStep::Chmod)?;
            self.host.chmod(path, mode)
        }
    }

    /// Owner and group of the current working directory.
    ///
    /// Only these IDs can be applied without elevated privileges.
    fn own_ids() -> (u32, u32) {
        let meta = metadata(".").unwrap();
        (meta.uid(), meta.gid())
    }

    #[sealed_test]
    fn absent_without_create_fails_without_mutation() {
        let (uid, gid) = own_ids();
        let fs = RecordingFilesystem::default();
        let result = FileReconciler::new(&fs)
            .apply(&FileDirective::new("x.conf", uid, gid))
            .map_err(|err| err.to_string());
        assert_eq!(
            result,
            Err(r#""x.conf" does not exist and createIfMissing is false"#.into())
        );
        assert!(fs.steps().is_empty());
        assert!(!Path::new("x.conf").exists());
    }

    #[sealed_test]
    fn create_file_with_content() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        let fs = RecordingFilesystem::default();
        let directive = FileDirective::new("x.conf", uid, gid)
            .mode(0o640)
            .create(true)
            .content("server{}");
        let result = FileReconciler::new(&fs).apply(&directive)?;
        assert_eq!(result, Outcome::Changed);
        assert_eq!(
            fs.steps(),
            vec![FileStep::CreateFile, FileStep::Chown, FileStep::Chmod]
        );
        assert_eq!(read("x.conf")?, b"server{}");
        assert_eq!(metadata("x.conf")?.permissions().mode() & 0o7777, 0o640);

        Ok(())
    }

    #[sealed_test]
    fn create_read_only_file_with_content() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        let directive = FileDirective::new("secret", uid, gid)
            .mode(0o400)
            .create(true)
            .content("hunter2");
        let reconciler = FileReconciler::new(HostFilesystem::new());

        assert_eq!(reconciler.apply(&directive)?, Outcome::Changed);
        assert_eq!(read("secret")?, b"hunter2");
        assert_eq!(reconciler.apply(&directive)?, Outcome::Changed);
        assert_eq!(read("secret")?, b"hunter2");
        assert_eq!(metadata("secret")?.permissions().mode() & 0o7777, 0o400);

        Ok(())
    }

    #[sealed_test]
    fn dangling_symlink_fails_probe() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        symlink("nowhere", "x.conf")?;
        let fs = RecordingFilesystem::default();
        let result = FileReconciler::new(&fs)
            .apply(&FileDirective::new("x.conf", uid, gid).create(true))
            .map_err(|err| err.to_string());
        assert_eq!(
            result,
            Err(r#"probe failed for "x.conf": dangling symbolic link"#.into())
        );
        assert!(fs.steps().is_empty());

        Ok(())
    }

    #[sealed_test]
    fn type_mismatch_is_still_enforced() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        write("conf.d", "not a directory")?;
        let directive = FileDirective::new("conf.d", uid, gid)
            .mode(0o600)
            .directory(true)
            .create(true);
        let fs = RecordingFilesystem::default();
        let result = FileReconciler::new(&fs).apply(&directive)?;
        assert_eq!(result, Outcome::Changed);
        assert_eq!(fs.steps(), vec![FileStep::Chown, FileStep::Chmod]);
        assert!(metadata("conf.d")?.is_file());
        assert_eq!(metadata("conf.d")?.permissions().mode() & 0o7777, 0o600);

        Ok(())
    }

    #[sealed_test]
    fn create_empty_file() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        let directive = FileDirective::new("empty", uid, gid).create(true);
        FileReconciler::new(HostFilesystem::new()).apply(&directive)?;
        assert_eq!(read("empty")?, b"");

        Ok(())
    }

    #[sealed_test]
    fn create_directory() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        let directive = FileDirective::new("conf.d", uid, gid)
            .mode(0o750)
            .directory(true)
            .create(true);
        FileReconciler::new(HostFilesystem::new()).apply(&directive)?;
        let meta = metadata("conf.d")?;
        assert!(meta.is_dir());
        assert_eq!(meta.permissions().mode() & 0o7777, 0o750);

        Ok(())
    }

    #[sealed_test]
    fn existing_file_keeps_content_but_gets_mode() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        write("x.conf", "old")?;
        let directive = FileDirective::new("x.conf", uid, gid)
            .mode(0o600)
            .create(true)
            .content("new");
        let fs = RecordingFilesystem::default();
        let result = FileReconciler::new(&fs).apply(&directive)?;
        assert_eq!(result, Outcome::Changed);
        assert_eq!(fs.steps(), vec![FileStep::Chown, FileStep::Chmod]);
        assert_eq!(read("x.conf")?, b"old");
        assert_eq!(metadata("x.conf")?.permissions().mode() & 0o7777, 0o600);

        Ok(())
    }

    #[sealed_test]
    fn applying_twice_is_idempotent() -> anyhow::Result<()> {
        let (uid, gid) = own_ids();
        let directive = FileDirective::new("x.conf", uid, gid)
            .mode(0o644)
            .create(true)
            .content("server{}");
        let reconciler = FileReconciler::new(HostFilesystem::new());

        assert_eq!(reconciler.apply(&directive)?, Outcome::Changed);
        let first = read("x.conf")?;
        assert_eq!(reconciler.apply(&directive)?, Outcome::Changed);
        let second = read("x.conf")?;
        assert_eq!(first, second);

        Ok(())
    }

    #[sealed_test]
    fn failing_step_is_named() {
        let (uid, gid) = own_ids();
        let directive = FileDirective::new("x.conf", uid, gid).create(true);

        let fs = RecordingFilesystem::failing(FileStep::Chown);
        let result = FileReconciler::new(&fs)
            .apply(&directive)
            .map_err(|err| err.to_string());
        assert_eq!(result, Err(r#"chown failed for "x.conf": denied"#.into()));
        assert_eq!(fs.steps(), vec![FileStep::CreateFile, FileStep::Chown]);

        let fs = RecordingFilesystem::failing(FileStep::Probe);
        let result = FileReconciler::new(&fs)
            .apply(&FileDirective::new("other", uid, gid).create(true))
            .map_err(|err| err.to_string());
        assert_eq!(result, Err(r#"probe failed for "other": denied"#.into()));
        assert!(fs.steps().is_empty());
    }
}
