//! The fixed five-step synchronization pipeline.
//!
//! `Idle → Cloning → CheckingOut → Cleaning → Fetching → Resetting → Done`,
//! with an absorbing `Failed` state reachable from every step. Each step is
//! gated on the previous operation's success; the first failure aborts the
//! remainder of the sequence.
//!
//! The order is load-bearing: clone must establish the directory before any
//! other git command can run there; checkout must land on the requested
//! branch before clean removes stray files; clean must run before fetch and
//! reset so untracked leftovers cannot interfere with the hard reset; fetch
//! must precede reset because `reset --hard <remote>/<branch>` needs an
//! up-to-date remote-tracking ref.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::config::DEFAULT_REMOTE;
use crate::errors::{ConfigError, SyncError};
use crate::git::GitCli;
use crate::process::ProgressSender;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    /// Name or path of the git executable.
    pub git: String,
    /// URL of the repository to clone from.
    pub repo: String,
    /// Local working directory to synchronize.
    pub dir: PathBuf,
    /// Branch to check out and reset to.
    pub branch: String,
    /// Remote name; fixed to `"origin"` everywhere this crate builds one.
    pub remote: String,
}

impl SyncRequest {
    /// Build a request with the default executable, branch, and remote.
    pub fn new(repo: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            git: "git".into(),
            repo: repo.into(),
            dir: dir.into(),
            branch: "master".into(),
            remote: DEFAULT_REMOTE.into(),
        }
    }

    /// Check that the required fields are present. Runs before the first
    /// step, so a bad request never spawns a process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repo.is_empty() {
            return Err(ConfigError::MissingProperty("repo"));
        }
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingProperty("dir"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// States of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Cloning,
    CheckingOut,
    Cleaning,
    Fetching,
    Resetting,
    Done,
    Failed,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Cloning => write!(f, "cloning"),
            Self::CheckingOut => write!(f, "checking_out"),
            Self::Cleaning => write!(f, "cleaning"),
            Self::Fetching => write!(f, "fetching"),
            Self::Resetting => write!(f, "resetting"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives the five git operations in fixed order with fail-fast semantics.
///
/// Exactly one child process is in flight at a time; step N fully completes
/// — including draining its output into the progress channel — before step
/// N+1 starts. There is no timeout on individual operations and no
/// cancellation once started. Concurrent runs against the same directory
/// are not serialized here; callers must do that externally.
pub struct SyncPipeline {
    git: GitCli,
    request: SyncRequest,
    progress: ProgressSender,
    state: Mutex<SyncState>,
}

impl SyncPipeline {
    /// Create a pipeline for `request`, forwarding stdout chunks of every
    /// operation to `progress` as they occur.
    pub fn new(request: SyncRequest, progress: ProgressSender) -> Self {
        Self {
            git: GitCli::new(request.git.clone()),
            request,
            progress,
            state: Mutex::new(SyncState::Idle),
        }
    }

    pub fn request(&self) -> &SyncRequest {
        &self.request
    }

    /// Current state of the run.
    pub fn state(&self) -> SyncState {
        // unwrap_or_else recovers the value if the mutex was poisoned by a
        // panic in another thread.
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SyncState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        info!(from = %*state, to = %next, "state transition");
        *state = next;
    }

    /// Run the pipeline to completion or first failure.
    ///
    /// The first failing operation moves the pipeline to `Failed` and its
    /// error is returned unmodified; steps after it never run. A failure
    /// leaves the directory in whatever state the failing step left it —
    /// there is no rollback.
    pub async fn run(&self) -> Result<(), SyncError> {
        self.request.validate()?;

        match self.run_steps().await {
            Ok(()) => {
                self.set_state(SyncState::Done);
                Ok(())
            }
            Err(e) => {
                self.set_state(SyncState::Failed);
                warn!(error = %e, "pipeline aborted");
                Err(e)
            }
        }
    }

    async fn run_steps(&self) -> Result<(), SyncError> {
        let req = &self.request;

        self.set_state(SyncState::Cloning);
        info!(repo = %req.repo, dir = %req.dir.display(), "cloning repository");
        self.git
            .clone_repo(&req.repo, &req.dir, &self.progress)
            .await?;

        self.set_state(SyncState::CheckingOut);
        info!(branch = %req.branch, "checking out branch");
        self.git
            .checkout(&req.branch, &req.dir, &self.progress)
            .await?;

        self.set_state(SyncState::Cleaning);
        info!("removing untracked files");
        self.git.clean(&req.dir, &self.progress).await?;

        self.set_state(SyncState::Fetching);
        info!(remote = %req.remote, "fetching remote");
        self.git.fetch(&req.remote, &req.dir, &self.progress).await?;

        self.set_state(SyncState::Resetting);
        info!(remote = %req.remote, branch = %req.branch, "resetting to remote branch");
        self.git
            .reset(&req.remote, &req.branch, &req.dir, &self.progress)
            .await?;

        Ok(())
    }
}

/// Run the full synchronization pipeline for `request`.
///
/// Convenience wrapper over [`SyncPipeline`] for callers that do not need
/// to observe intermediate state.
pub async fn run_sync(request: SyncRequest, progress: ProgressSender) -> Result<(), SyncError> {
    SyncPipeline::new(request, progress).run().await
}
