//! Find-or-create synchronization of posts with tracker threads.
//!
//! For each post the [`Synchronizer`] lists the project's threads, takes the
//! first one whose title equals the post's title byte-for-byte, and creates
//! one only when nothing matches. The thread's identity is then projected
//! into a [`ResolvedThread`] the renderer can consume.
//!
//! ```text
//! Unresolved ──▶ Listing ──┬──▶ Matched  ──┬──▶ Resolved
//!                          └──▶ Creating ──┘
//! ```
//!
//! There is no failed state. Any registry error is returned to the caller
//! untouched and the build is expected to stop.

use std::collections::HashMap;

use crate::config::RegistryConfig;
use crate::error::{RegistryError, ResolveError};
use crate::models::{Post, ResolvedThread, Thread};
use crate::progress::{SyncProgressEvent, SyncProgressReporter};
use crate::registry::ThreadRegistry;

/// Builds the public URLs for a thread number within one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLinks {
    web_base: String,
    api_base: String,
    project: String,
}

impl ProjectLinks {
    pub fn new(
        web_base: impl Into<String>,
        api_base: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            web_base: web_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            project: project.into(),
        }
    }

    /// Links on github.com for `owner/name`.
    pub fn github(project: impl Into<String>) -> Self {
        Self::new("https://github.com", "https://api.github.com", project)
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(&config.web_base, &config.api_base, &config.project)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn thread_url(&self, number: u64) -> String {
        format!("{}/{}/issues/{}", self.web_base, self.project, number)
    }

    pub fn reply_endpoint(&self, number: u64) -> String {
        format!(
            "{}/repos/{}/issues/{}/comments",
            self.api_base, self.project, number
        )
    }

    pub fn resolve(&self, thread: &Thread) -> ResolvedThread {
        ResolvedThread {
            thread_number: thread.number,
            thread_url: self.thread_url(thread.number),
            reply_endpoint: self.reply_endpoint(thread.number),
        }
    }
}

/// How a post got its thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An existing thread carried the post's title.
    Matched,
    /// No thread matched; one was created.
    Created,
    /// An earlier post in the same run had the same title.
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub thread: ResolvedThread,
    pub outcome: Outcome,
}

/// Counts from a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub matched: usize,
    pub created: usize,
    pub shared: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.matched + self.created + self.shared
    }
}

/// What a sync would do for a post, without writing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Match { thread_number: u64 },
    Create,
    /// Same title as the post at `source_id`, which comes earlier.
    ShareWith { source_id: String },
}

pub struct Synchronizer<'a> {
    registry: &'a dyn ThreadRegistry,
    links: ProjectLinks,
}

impl<'a> Synchronizer<'a> {
    pub fn new(registry: &'a dyn ThreadRegistry, links: ProjectLinks) -> Self {
        Self { registry, links }
    }

    pub fn links(&self) -> &ProjectLinks {
        &self.links
    }

    /// Find or create the thread for one post.
    ///
    /// The full listing is fetched and scanned before a create is
    /// considered. The post itself is not modified; see [`Post::bind`].
    pub async fn resolve(&self, post: &Post) -> Result<Resolution, RegistryError> {
        let threads = self.registry.list_threads().await?;

        if let Some(thread) = first_match(&threads, &post.title) {
            tracing::info!(
                post = %post.source_id,
                number = thread.number,
                "matched existing thread"
            );
            return Ok(Resolution {
                thread: self.links.resolve(thread),
                outcome: Outcome::Matched,
            });
        }

        let thread = self
            .registry
            .create_thread(&post.title, &post.summary)
            .await?;
        tracing::info!(post = %post.source_id, number = thread.number, "created thread");

        Ok(Resolution {
            thread: self.links.resolve(&thread),
            outcome: Outcome::Created,
        })
    }

    /// Resolve every post in order and bind the result onto it.
    ///
    /// Posts sharing a title are resolved once; later ones reuse the first
    /// result. Stops at the first error, leaving the remaining posts
    /// unresolved.
    pub async fn resolve_all(
        &self,
        posts: &mut [Post],
        progress: &dyn SyncProgressReporter,
    ) -> Result<SyncReport, ResolveError> {
        let mut report = SyncReport::default();
        let mut by_title: HashMap<String, ResolvedThread> = HashMap::new();
        let total = posts.len() as u64;

        for (i, post) in posts.iter_mut().enumerate() {
            progress.report(SyncProgressEvent::Resolving {
                source_id: post.source_id.clone(),
                n: i as u64 + 1,
                total,
            });

            if let Some(thread) = by_title.get(&post.title) {
                tracing::info!(
                    post = %post.source_id,
                    number = thread.thread_number,
                    "reusing thread from an earlier post with the same title"
                );
                progress.report(SyncProgressEvent::Bound {
                    source_id: post.source_id.clone(),
                    thread_number: thread.thread_number,
                    outcome: Outcome::Shared,
                });
                post.bind(thread.clone());
                report.shared += 1;
                continue;
            }

            let resolution = self.resolve(post).await.map_err(|source| ResolveError {
                source_id: post.source_id.clone(),
                title: post.title.clone(),
                source,
            })?;

            match resolution.outcome {
                Outcome::Matched => report.matched += 1,
                Outcome::Created => report.created += 1,
                Outcome::Shared => report.shared += 1,
            }
            progress.report(SyncProgressEvent::Bound {
                source_id: post.source_id.clone(),
                thread_number: resolution.thread.thread_number,
                outcome: resolution.outcome,
            });
            by_title.insert(post.title.clone(), resolution.thread.clone());
            post.bind(resolution.thread);
        }

        Ok(report)
    }

    /// List once and report what [`resolve_all`](Self::resolve_all) would do.
    pub async fn plan(&self, posts: &[Post]) -> Result<Vec<PlannedAction>, RegistryError> {
        let threads = self.registry.list_threads().await?;
        let mut first_by_title: HashMap<&str, &str> = HashMap::new();

        let actions = posts
            .iter()
            .map(|post| {
                if let Some(earlier) = first_by_title.get(post.title.as_str()) {
                    return PlannedAction::ShareWith {
                        source_id: (*earlier).to_string(),
                    };
                }
                first_by_title.insert(&post.title, &post.source_id);
                match first_match(&threads, &post.title) {
                    Some(thread) => PlannedAction::Match {
                        thread_number: thread.number,
                    },
                    None => PlannedAction::Create,
                }
            })
            .collect();

        Ok(actions)
    }
}

/// First thread in listing order whose title equals `title` exactly.
fn first_match<'t>(threads: &'t [Thread], title: &str) -> Option<&'t Thread> {
    let mut matches = threads.iter().filter(|t| t.title == title);
    let first = matches.next()?;
    let others: Vec<u64> = matches.map(|t| t.number).collect();
    if !others.is_empty() {
        tracing::warn!(
            title,
            chosen = first.number,
            ignored = ?others,
            "several threads share this title; using the first listed"
        );
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(number: u64, title: &str) -> Thread {
        Thread {
            number,
            title: title.to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn links_use_fixed_formats() {
        let links = ProjectLinks::github("org/repo");
        assert_eq!(links.thread_url(12), "https://github.com/org/repo/issues/12");
        assert_eq!(
            links.reply_endpoint(12),
            "https://api.github.com/repos/org/repo/issues/12/comments"
        );
    }

    #[test]
    fn links_trim_trailing_slash() {
        let links = ProjectLinks::new("http://localhost:1/", "http://localhost:2/", "o/r");
        assert_eq!(links.thread_url(1), "http://localhost:1/o/r/issues/1");
        assert_eq!(
            links.reply_endpoint(1),
            "http://localhost:2/repos/o/r/issues/1/comments"
        );
    }

    #[test]
    fn first_match_is_exact() {
        let threads = vec![
            thread(1, "hello world"),
            thread(2, "Hello World "),
            thread(3, "Hello World"),
            thread(4, "Hello World"),
        ];
        assert_eq!(first_match(&threads, "Hello World").map(|t| t.number), Some(3));
        assert!(first_match(&threads, "HELLO WORLD").is_none());
    }
}
