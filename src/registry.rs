//! Thread registry client.
//!
//! All network interaction with the issue tracker goes through the
//! [`ThreadRegistry`] trait: one call to list every thread for the project,
//! one to create a thread. [`GitHubRegistry`] implements it against the
//! GitHub REST API.
//!
//! # Configuration
//!
//! ```toml
//! [registry]
//! project = "acme/blog"
//! # api_base = "https://api.github.com"
//! # token_env = "GITHUB_TOKEN"
//! # per_page = 100
//! # labels = ["comments"]
//! ```
//!
//! # Pagination
//!
//! The issues listing is paged. [`GitHubRegistry::list_threads`] follows the
//! `Link: <...>; rel="next"` header until the last page and only then
//! returns, so callers never see a partial listing.
//!
//! # Status Mapping
//!
//! | Response | Error |
//! |----------|-------|
//! | transport error, 5xx, undecodable body | [`RegistryError::Unavailable`] |
//! | 429; 403 with `x-ratelimit-remaining: 0`, `retry-after`, or a "rate limit" message | [`RegistryError::RateLimited`] |
//! | any other 401, 403, 404 | [`RegistryError::Auth`] |
//! | other 4xx on create | [`RegistryError::Rejected`] |
//!
//! Nothing is retried here.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK, RETRY_AFTER, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::models::Thread;

/// Read and write access to the threads of one project.
#[async_trait]
pub trait ThreadRegistry: Send + Sync {
    /// Every thread currently known for the project, in listing order.
    async fn list_threads(&self) -> Result<Vec<Thread>, RegistryError>;

    /// Create a thread and return the record the tracker assigned.
    async fn create_thread(&self, title: &str, body: &str) -> Result<Thread, RegistryError>;
}

// ============ Credentials ============

/// Bearer token for the tracker, read once at process start.
#[derive(Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Load the token from the environment variable named by `registry.token_env`.
    pub fn from_env(var: &str) -> Result<Self> {
        let token = std::env::var(var)
            .with_context(|| format!("{} environment variable not set", var))?;
        if token.trim().is_empty() {
            anyhow::bail!("{} environment variable is empty", var);
        }
        Ok(Self::new(token.trim()))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ============ GitHub ============

const API_VERSION: &str = "2022-11-28";

/// [`ThreadRegistry`] over the GitHub issues API.
pub struct GitHubRegistry {
    client: reqwest::Client,
    credential: Credential,
    api_base: String,
    project: String,
    per_page: u32,
    labels: Vec<String>,
}

/// Issue shape as returned by the API. Pull requests carry a
/// `pull_request` object and are dropped.
#[derive(Deserialize)]
struct IssueRecord {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<IssueRecord> for Thread {
    fn from(record: IssueRecord) -> Self {
        Thread {
            number: record.number,
            title: record.title,
            body: record.body.unwrap_or_default(),
        }
    }
}

impl GitHubRegistry {
    pub fn new(config: &RegistryConfig, credential: Credential) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            credential,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            per_page: config.per_page,
            labels: config.labels.clone(),
        })
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/issues", self.api_base, self.project)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Bearer {}", self.credential.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(
                USER_AGENT,
                concat!("post-threads/", env!("CARGO_PKG_VERSION")),
            )
    }
}

#[async_trait]
impl ThreadRegistry for GitHubRegistry {
    async fn list_threads(&self) -> Result<Vec<Thread>, RegistryError> {
        let mut threads = Vec::new();
        let first = self.request(self.client.get(self.issues_url()).query(&[
            ("state", "all".to_string()),
            ("per_page", self.per_page.to_string()),
        ]));
        let mut next = Some(first);
        let mut page = 0u32;

        while let Some(builder) = next.take() {
            page += 1;
            let resp = builder.send().await?;
            let resp = check_status(resp, false).await?;
            let next_url = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);

            let batch: Vec<IssueRecord> = resp.json().await.map_err(|e| {
                RegistryError::unavailable(format!("invalid issue listing on page {}: {}", page, e))
            })?;

            let fetched = batch.len();
            threads.extend(
                batch
                    .into_iter()
                    .filter(|record| record.pull_request.is_none())
                    .map(Thread::from),
            );
            tracing::debug!(page, fetched, total = threads.len(), "listed issues page");

            next = next_url.map(|url| self.request(self.client.get(url)));
        }

        Ok(threads)
    }

    async fn create_thread(&self, title: &str, body: &str) -> Result<Thread, RegistryError> {
        let mut payload = serde_json::json!({
            "title": title,
            "body": body,
        });
        if !self.labels.is_empty() {
            payload["labels"] = serde_json::json!(self.labels);
        }

        let resp = self
            .request(self.client.post(self.issues_url()))
            .json(&payload)
            .send()
            .await?;
        let resp = check_status(resp, true).await?;

        let thread: Thread = resp
            .json()
            .await
            .map_err(|e| RegistryError::unavailable(format!("invalid created issue: {}", e)))?;
        tracing::debug!(number = thread.number, title = %thread.title, "created issue");
        Ok(thread)
    }
}

/// Map a non-success response onto the error taxonomy.
async fn check_status(resp: Response, write: bool) -> Result<Response, RegistryError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let headers = resp.headers().clone();
    let body = resp.text().await.unwrap_or_default();
    Err(classify(status, &headers, &body, write))
}

fn classify(status: StatusCode, headers: &HeaderMap, body: &str, write: bool) -> RegistryError {
    let message = error_message(body);

    if is_rate_limited(status, headers, &message) {
        return RegistryError::RateLimited {
            reset_at: reset_at(headers),
        };
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
            RegistryError::Auth {
                status: status.as_u16(),
                message,
            }
        }
        s if s.is_client_error() && write => RegistryError::Rejected {
            status: s.as_u16(),
            message,
        },
        s => RegistryError::unavailable(format!("HTTP {}: {}", s, message)),
    }
}

/// GitHub reports both its primary and secondary limits as 403 or 429.
/// A secondary limit leaves `x-ratelimit-remaining` untouched, so it is
/// recognized by `retry-after` or by the wording of the message.
fn is_rate_limited(status: StatusCode, headers: &HeaderMap, message: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let exhausted = header_str(headers, "x-ratelimit-remaining").is_some_and(|v| v == "0");
    exhausted
        || headers.contains_key(RETRY_AFTER)
        || message.to_ascii_lowercase().contains("rate limit")
}

/// Epoch seconds when the limit lifts: `x-ratelimit-reset` if sent,
/// otherwise now plus `retry-after`.
fn reset_at(headers: &HeaderMap) -> Option<i64> {
    if let Some(reset) = header_str(headers, "x-ratelimit-reset").and_then(|v| v.parse().ok()) {
        return Some(reset);
    }
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|v| v.parse::<i64>().ok())
        .map(|secs| chrono::Utc::now().timestamp() + secs)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Pull GitHub's `message` field out of an error body, or fall back to a
/// truncated copy of the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(String::from)
    })
}
