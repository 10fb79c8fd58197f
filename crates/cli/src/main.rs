//! reposync command-line tool.
//!
//! Synchronizes a local working directory with a remote Git branch by
//! running clone, checkout, clean, fetch, and reset in a fixed order.
//! Configuration comes from an optional TOML file; command-line flags
//! override file values, and a positional branch overrides both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use reposync_core::config::SyncConfig;
use reposync_core::pipeline::run_sync;
use reposync_core::process::ProgressEvent;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Synchronize a local directory with a remote Git branch.
#[derive(Parser, Debug)]
#[command(
    name = "reposync",
    version,
    about = "Deterministic working-tree synchronization against a remote Git branch"
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the synchronization pipeline.
    Sync {
        /// Branch to check out (takes precedence over the configured branch).
        branch: Option<String>,

        /// Git executable to use.
        #[arg(long)]
        git: Option<String>,

        /// Repository URL to clone from.
        #[arg(long)]
        repo: Option<String>,

        /// Target directory for the working tree.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Load the configuration and report the resolved request.
    Validate,

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./reposync.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            branch,
            git,
            repo,
            dir,
        } => cmd_sync(config, branch, git, repo, dir).await,
        Commands::Validate => cmd_validate(config),
        Commands::Init { output } => cmd_init(&output),
    }
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(p) => SyncConfig::load_from_file(p)
            .with_context(|| format!("failed to load configuration from {}", p.display())),
        None => Ok(SyncConfig::default()),
    }
}

/// Run the pipeline with merged configuration.
async fn cmd_sync(
    mut config: SyncConfig,
    branch: Option<String>,
    git: Option<String>,
    repo: Option<String>,
    dir: Option<PathBuf>,
) -> Result<()> {
    // Flags override file values; the positional branch overrides both.
    if let Some(git) = git {
        config.git = git;
    }
    if repo.is_some() {
        config.repo = repo;
    }
    if dir.is_some() {
        config.dir = dir;
    }

    let request = config.into_request(branch)?;
    let dir_display = request.dir.display().to_string();
    let branch_name = request.branch.clone();
    let remote_name = request.remote.clone();
    info!(repo = %request.repo, dir = %dir_display, branch = %branch_name, "starting sync");

    // Surface interim process output at diagnostic level as it arrives.
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<ProgressEvent>();
    let drain = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            for line in event.text.lines() {
                debug!(target: "reposync::progress", "{}", line);
            }
        }
    });

    let result = run_sync(request, tx).await;
    // The sender was consumed by the pipeline; the drain task ends once the
    // channel closes.
    drain.await.ok();
    result?;

    println!(
        "✓ {} synchronized to {}/{}",
        dir_display, remote_name, branch_name
    );
    Ok(())
}

/// Resolve the configuration without running anything.
fn cmd_validate(config: SyncConfig) -> Result<()> {
    let request = config.into_request(None)?;
    println!("Configuration OK");
    println!("  git:    {}", request.git);
    println!("  repo:   {}", request.repo);
    println!("  dir:    {}", request.dir.display());
    println!("  branch: {}", request.branch);
    println!("  remote: {}", request.remote);
    Ok(())
}

/// Write the default configuration template.
fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("refusing to overwrite existing file: {}", output.display());
    }
    std::fs::write(output, SyncConfig::default_template())
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("✓ Wrote default configuration to {}", output.display());
    Ok(())
}
