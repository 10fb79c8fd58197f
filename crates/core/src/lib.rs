//! reposync core library.
//!
//! This crate provides the components for synchronizing a local working
//! directory with a remote Git branch: configuration, the external-process
//! runner, the git operation wrappers, and the pipeline that sequences them.

pub mod config;
pub mod errors;
pub mod git;
pub mod pipeline;
pub mod process;

// Re-exports for convenience.
pub use config::SyncConfig;
pub use git::GitCli;
pub use pipeline::{run_sync, SyncPipeline, SyncRequest, SyncState};
pub use process::{ProgressEvent, ProgressSender};
