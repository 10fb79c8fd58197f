//! Configuration for reposync.
//!
//! A small TOML file (or nothing at all — every field can come from CLI
//! overrides) that is resolved into a [`SyncRequest`] before a run. The
//! required `repo` and `dir` properties are checked exactly once, here,
//! before any process is spawned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::ConfigError;
use crate::pipeline::SyncRequest;

/// The remote every run fetches from and resets against. Not configurable.
pub const DEFAULT_REMOTE: &str = "origin";

/// On-disk configuration, merged with CLI overrides before a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Name or path of the git executable.
    #[serde(default = "default_git")]
    pub git: String,

    /// URL of the repository to clone from. Required.
    #[serde(default)]
    pub repo: Option<String>,

    /// Target directory for the working tree. Required.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Branch to synchronize when none is given at invocation time.
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_git() -> String {
    "git".into()
}

fn default_branch() -> String {
    "master".into()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            repo: None,
            dir: None,
            branch: default_branch(),
        }
    }
}

impl SyncConfig {
    /// Load a [`SyncConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: SyncConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve into a [`SyncRequest`], checking the required properties.
    ///
    /// `branch_override` is the invocation-time branch; it takes precedence
    /// over the configured default.
    pub fn into_request(self, branch_override: Option<String>) -> Result<SyncRequest, ConfigError> {
        let repo = self
            .repo
            .filter(|r| !r.is_empty())
            .ok_or(ConfigError::MissingProperty("repo"))?;
        let dir = self
            .dir
            .filter(|d| !d.as_os_str().is_empty())
            .ok_or(ConfigError::MissingProperty("dir"))?;

        Ok(SyncRequest {
            git: self.git,
            repo,
            dir,
            branch: branch_override.unwrap_or(self.branch),
            remote: DEFAULT_REMOTE.into(),
        })
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# reposync configuration

# Name or path of the git executable.
# git = "git"

# URL of the repository to clone from. Required.
repo = "https://example.com/project.git"

# Target directory for the synchronized working tree. Required.
dir = "/var/lib/reposync/project"

# Branch to synchronize; a branch given on the command line wins.
branch = "master"
"#
    }
}
