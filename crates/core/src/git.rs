//! Git CLI operation wrappers.
//!
//! Five operations, each a thin composition over the process runner: build
//! the fixed argument vector, delegate, return the runner's result
//! unchanged. Nothing here inspects repository state; success is solely the
//! child's exit status.

use std::path::Path;

use tracing::{debug, instrument};

use crate::errors::ProcessError;
use crate::process::{self, ProgressSender};

/// Thin wrapper around the `git` executable (or any compatible binary).
#[derive(Debug)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    /// Create a wrapper that invokes `program` for every operation.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Clone `repo` into `dir`, unless `dir` already exists.
    ///
    /// An existing directory is taken as an already-completed clone: no
    /// process is spawned and the call succeeds immediately, regardless of
    /// the directory's contents. Runs in the caller's working directory.
    #[instrument(skip(self, progress))]
    pub async fn clone_repo(
        &self,
        repo: &str,
        dir: &Path,
        progress: &ProgressSender,
    ) -> Result<(), ProcessError> {
        if dir.exists() {
            debug!("target directory exists, skipping clone");
            return Ok(());
        }
        let dir_str = dir.to_string_lossy().to_string();
        process::run(&self.program, &["clone", repo, &dir_str], None, progress).await
    }

    /// Force-check-out `branch` in `dir`, discarding uncommitted changes to
    /// tracked files.
    #[instrument(skip(self, progress))]
    pub async fn checkout(
        &self,
        branch: &str,
        dir: &Path,
        progress: &ProgressSender,
    ) -> Result<(), ProcessError> {
        process::run(
            &self.program,
            &["checkout", branch, "-f"],
            Some(dir),
            progress,
        )
        .await
    }

    /// Remove untracked files and untracked directories from `dir`.
    #[instrument(skip(self, progress))]
    pub async fn clean(&self, dir: &Path, progress: &ProgressSender) -> Result<(), ProcessError> {
        process::run(&self.program, &["clean", "-f", "-d"], Some(dir), progress).await
    }

    /// Update remote-tracking refs for `remote`; working files are untouched.
    #[instrument(skip(self, progress))]
    pub async fn fetch(
        &self,
        remote: &str,
        dir: &Path,
        progress: &ProgressSender,
    ) -> Result<(), ProcessError> {
        process::run(&self.program, &["fetch", remote], Some(dir), progress).await
    }

    /// Hard-reset the current branch to `<remote>/<branch>`, discarding all
    /// local commits and modifications.
    #[instrument(skip(self, progress))]
    pub async fn reset(
        &self,
        remote: &str,
        branch: &str,
        dir: &Path,
        progress: &ProgressSender,
    ) -> Result<(), ProcessError> {
        let target = format!("{}/{}", remote, branch);
        process::run(
            &self.program,
            &["reset", "--hard", &target],
            Some(dir),
            progress,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[cfg(unix)]
    use std::path::PathBuf;

    fn sender() -> ProgressSender {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    /// Write an executable stub that appends its argv to a log file.
    #[cfg(unix)]
    fn stub_git(dir: &Path) -> (PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;
        let log = dir.join("argv.log");
        let script = dir.join("fake-git");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" >> \"{}\"\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (script, log)
    }

    #[cfg(unix)]
    fn logged_argv(log: &Path) -> String {
        std::fs::read_to_string(log).unwrap().trim().to_string()
    }

    #[tokio::test]
    async fn test_clone_skips_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("not-a-repo.txt"), "junk").unwrap();

        // The program does not exist; success proves nothing was spawned.
        let git = GitCli::new("reposync-no-such-binary");
        assert_eq!(git.program(), "reposync-no-such-binary");
        git.clone_repo("https://example/r.git", dir.path(), &sender())
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clone_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let (script, log) = stub_git(tmp.path());
        let target = tmp.path().join("missing");

        let git = GitCli::new(script.to_string_lossy());
        git.clone_repo("https://example/r.git", &target, &sender())
            .await
            .unwrap();
        assert_eq!(
            logged_argv(&log),
            format!("clone https://example/r.git {}", target.display())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_checkout_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let (script, log) = stub_git(tmp.path());

        let git = GitCli::new(script.to_string_lossy());
        git.checkout("v2", tmp.path(), &sender()).await.unwrap();
        assert_eq!(logged_argv(&log), "checkout v2 -f");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let (script, log) = stub_git(tmp.path());

        let git = GitCli::new(script.to_string_lossy());
        git.clean(tmp.path(), &sender()).await.unwrap();
        assert_eq!(logged_argv(&log), "clean -f -d");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let (script, log) = stub_git(tmp.path());

        let git = GitCli::new(script.to_string_lossy());
        git.fetch("origin", tmp.path(), &sender()).await.unwrap();
        assert_eq!(logged_argv(&log), "fetch origin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reset_arguments() {
        let tmp = tempfile::tempdir().unwrap();
        let (script, log) = stub_git(tmp.path());

        let git = GitCli::new(script.to_string_lossy());
        git.reset("origin", "main", tmp.path(), &sender())
            .await
            .unwrap();
        assert_eq!(logged_argv(&log), "reset --hard origin/main");
    }
}
