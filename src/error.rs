//! Typed failures at the tracker boundary.
//!
//! The registry client never decides whether a failure is fatal. It returns
//! a [`RegistryError`]; the synchronizer wraps it in a [`ResolveError`] that
//! names the post, and the CLI aborts the build.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Transport failure, server error, or a response that could not be read.
    #[error("registry unavailable: {message}")]
    Unavailable { message: String },

    /// Credential missing, invalid, or lacking access to the project.
    #[error("registry authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// The tracker asked us to slow down.
    #[error("registry rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<i64> },

    /// The tracker declined a write.
    #[error("registry rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

fn reset_suffix(reset_at: &Option<i64>) -> String {
    match reset_at {
        Some(ts) => format!(" (resets at unix time {})", ts),
        None => String::new(),
    }
}

impl RegistryError {
    /// Stable name of the error kind, used in build failure messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Unavailable { .. } => "RegistryUnavailable",
            RegistryError::Auth { .. } => "RegistryAuth",
            RegistryError::RateLimited { .. } => "RegistryRateLimited",
            RegistryError::Rejected { .. } => "RegistryRejected",
        }
    }

    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        RegistryError::Unavailable {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::unavailable(err.to_string())
    }
}

/// A post could not be bound to a thread. Aborts the build.
#[derive(Debug, Error)]
#[error("failed to resolve thread for post '{source_id}' (title {title:?}): [{}] {source}", .source.kind())]
pub struct ResolveError {
    pub source_id: String,
    pub title: String,
    #[source]
    pub source: RegistryError,
}
