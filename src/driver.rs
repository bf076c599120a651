//! Build driver.
//!
//! Coordinates a full run: scan posts → resolve each against the registry →
//! write the manifest. This is the only place that decides a failure is
//! fatal: every error is returned to `main`, which exits non-zero before the
//! manifest is written.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::content;
use crate::manifest::Manifest;
use crate::models::Post;
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::registry::{Credential, GitHubRegistry, ThreadRegistry};
use crate::sync::{PlannedAction, ProjectLinks, SyncReport, Synchronizer};

/// Options for [`run_sync`].
#[derive(Debug, Default)]
pub struct SyncOptions {
    /// Report what would happen without creating threads or writing output.
    pub dry_run: bool,
    /// Overrides `output.path`.
    pub output: Option<PathBuf>,
}

/// Build the GitHub client from config, reading the token once.
pub fn connect(config: &Config) -> Result<GitHubRegistry> {
    let credential = Credential::from_env(&config.registry.token_env)?;
    GitHubRegistry::new(&config.registry, credential)
}

pub async fn run_sync(
    config: &Config,
    opts: SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<()> {
    let registry = connect(config)?;
    run_sync_with_registry(config, &registry, opts, progress).await
}

/// [`run_sync`] against any registry.
pub async fn run_sync_with_registry(
    config: &Config,
    registry: &dyn ThreadRegistry,
    opts: SyncOptions,
    progress: &dyn SyncProgressReporter,
) -> Result<()> {
    progress.report(SyncProgressEvent::Scanning {
        root: config.content.root.display().to_string(),
    });
    let mut posts = content::scan_posts(&config.content)?;
    let synchronizer = Synchronizer::new(registry, ProjectLinks::from_config(&config.registry));

    if opts.dry_run {
        let actions = synchronizer.plan(&posts).await?;
        print_plan(&posts, &actions);
        return Ok(());
    }

    let report = synchronizer.resolve_all(&mut posts, progress).await?;

    let output = opts.output.unwrap_or_else(|| config.output.path.clone());
    Manifest::from_posts(&config.registry.project, &posts)?.write(&output)?;

    print_report(&report, &output);
    Ok(())
}

fn print_plan(posts: &[Post], actions: &[PlannedAction]) {
    let mut creates = 0usize;
    println!("sync (dry-run)");
    for (post, action) in posts.iter().zip(actions) {
        let line = match action {
            PlannedAction::Match { thread_number } => format!("match #{}", thread_number),
            PlannedAction::Create => {
                creates += 1;
                "create".to_string()
            }
            PlannedAction::ShareWith { source_id } => format!("share with {}", source_id),
        };
        println!("  {:<40} {}", post.source_id, line);
    }
    println!("  posts found: {}", posts.len());
    println!("  threads to create: {}", creates);
}

fn print_report(report: &SyncReport, output: &Path) {
    println!("sync");
    println!("  posts: {}", report.total());
    println!("  matched: {}", report.matched);
    println!("  created: {}", report.created);
    if report.shared > 0 {
        println!("  shared: {}", report.shared);
    }
    println!("  manifest: {}", output.display());
    println!("ok");
}

/// Print every thread in the project.
pub async fn run_list(config: &Config) -> Result<()> {
    let registry = connect(config)?;
    let threads = registry.list_threads().await?;

    println!("{:<8} TITLE", "NUMBER");
    for thread in &threads {
        println!("{:<8} {}", thread.number, thread.title);
    }
    println!("{} threads in {}", threads.len(), config.registry.project);
    Ok(())
}

/// Resolve a single post file and print its metadata as JSON.
pub async fn run_resolve(config: &Config, path: &Path) -> Result<()> {
    let source_id = source_id_for(&config.content.root, path)?;
    let Some(mut post) = content::read_post(path, &source_id)? else {
        anyhow::bail!("{} is a draft", source_id);
    };

    let registry = connect(config)?;
    let synchronizer = Synchronizer::new(&registry, ProjectLinks::from_config(&config.registry));
    let resolution = synchronizer.resolve(&post).await.map_err(|source| {
        crate::error::ResolveError {
            source_id: post.source_id.clone(),
            title: post.title.clone(),
            source,
        }
    })?;
    post.bind(resolution.thread);

    let json = serde_json::json!({
        "source_id": post.source_id,
        "title": post.title,
        "thread": post.thread,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Print the posts found in the content tree. No network access.
/// The path of `file` relative to the content root, as `scan_posts` would
/// name it. Both sides are canonicalized so `./content/x.md` and an absolute
/// path to the same file agree.
fn source_id_for(root: &Path, file: &Path) -> Result<String> {
    let root_abs = root
        .canonicalize()
        .with_context(|| format!("content.root does not exist: {}", root.display()))?;
    let file_abs = file
        .canonicalize()
        .with_context(|| format!("Post file not found: {}", file.display()))?;
    let Ok(relative) = file_abs.strip_prefix(&root_abs) else {
        anyhow::bail!(
            "{} is not under content.root ({})",
            file.display(),
            root.display()
        );
    };
    Ok(relative.to_string_lossy().replace('\\', "/"))
}

pub fn run_posts(config: &Config) -> Result<()> {
    let posts = content::scan_posts(&config.content)?;
    println!("{:<40} TITLE", "POST");
    for post in &posts {
        println!("{:<40} {}", post.source_id, post.title);
    }
    println!("{} posts", posts.len());
    Ok(())
}
