//! Export resolved thread metadata as JSON for the site renderer.
//!
//! Produces a data file (by default `data/threads.json`) mapping each post's
//! path to its thread. Templates look a post up by path and render the
//! comment link and reply form from it.
//!
//! The file is only written once every post has resolved, and is replaced
//! atomically so a renderer never sees a half-written manifest.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::Post;

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub posts: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub title: String,
    pub thread_number: u64,
    pub thread_url: String,
    pub reply_endpoint: String,
}

impl Manifest {
    /// Collect resolved posts. Fails if any post is still unresolved.
    pub fn from_posts(project: &str, posts: &[Post]) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for post in posts {
            let Some(thread) = &post.thread else {
                bail!("Post {} has no thread bound", post.source_id);
            };
            entries.insert(
                post.source_id.clone(),
                ManifestEntry {
                    title: post.title.clone(),
                    thread_number: thread.thread_number,
                    thread_url: thread.thread_url.clone(),
                    reply_endpoint: thread.reply_endpoint.clone(),
                },
            );
        }

        Ok(Self {
            project: project.to_string(),
            generated_at: Utc::now(),
            posts: entries,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write to `path` via a sibling temp file and rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);
        std::fs::write(tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        tracing::info!(path = %path.display(), posts = self.posts.len(), "wrote manifest");
        Ok(())
    }
}
