//! Core data models used throughout post-threads.
//!
//! These types represent the posts read from the content tree, the threads
//! held by the tracker, and the thread identity bound back onto each post.

use serde::{Deserialize, Serialize};

/// A content item that needs a discussion thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Path relative to the content root, `/`-separated.
    pub source_id: String,
    /// Correlation key. Compared byte-for-byte against thread titles.
    pub title: String,
    /// Initial thread body when a thread has to be created. May be empty.
    pub summary: String,
    /// Set once the post has been resolved.
    pub thread: Option<ResolvedThread>,
}

impl Post {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            summary: summary.into(),
            thread: None,
        }
    }

    /// Record the thread this post is bound to.
    pub fn bind(&mut self, thread: ResolvedThread) {
        self.thread = Some(thread);
    }

    pub fn is_resolved(&self) -> bool {
        self.thread.is_some()
    }
}

/// A thread as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thread {
    pub number: u64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Render-time metadata for a resolved post. All three fields come from
/// the same thread record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedThread {
    pub thread_number: u64,
    pub thread_url: String,
    pub reply_endpoint: String,
}
