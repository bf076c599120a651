//! # post-threads CLI (`threads`)
//!
//! Binds the posts of a static site to GitHub issues ahead of rendering.
//!
//! ## Usage
//!
//! ```bash
//! threads --config ./config/threads.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `threads sync` | Resolve every post and write the thread manifest |
//! | `threads sync --dry-run` | Show matches and pending creates without writing |
//! | `threads list` | List the project's threads |
//! | `threads resolve <file>` | Resolve a single post and print its metadata |
//! | `threads posts` | List the posts found in the content tree |
//!
//! Any failure exits non-zero and leaves the previous manifest untouched.
//! Set `RUST_LOG=post_threads=debug` to trace registry calls.

use clap::{Parser, Subcommand};
use post_threads::progress::ProgressMode;
use post_threads::{config, driver};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Bind static-site posts to GitHub issue threads.
#[derive(Parser)]
#[command(
    name = "threads",
    about = "Bind static-site posts to GitHub issue threads at build time",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/threads.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find or create a thread for every post and write the manifest.
    ///
    /// Aborts on the first registry error; the manifest is only written
    /// once every post has a thread.
    Sync {
        /// Show what would be matched or created without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Write the manifest here instead of `output.path`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// List all threads in the configured project.
    List,

    /// Resolve one post file and print its thread metadata.
    Resolve {
        /// Path to the post's markdown file.
        file: PathBuf,
    },

    /// List posts found under `content.root`.
    Posts,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sync {
            dry_run,
            output,
            progress,
        } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let reporter = mode.reporter();
            driver::run_sync(
                &cfg,
                driver::SyncOptions { dry_run, output },
                reporter.as_ref(),
            )
            .await?;
        }
        Commands::List => {
            driver::run_list(&cfg).await?;
        }
        Commands::Resolve { file } => {
            driver::run_resolve(&cfg, &file).await?;
        }
        Commands::Posts => {
            driver::run_posts(&cfg)?;
        }
    }

    Ok(())
}
