//! Sync progress reporting.
//!
//! During `threads sync` each post produces two events: one when its
//! resolution starts (with its position in the run) and one once a thread is
//! bound to it (with the thread number and whether it was matched, created,
//! or shared). A failed resolution emits nothing further; the run stops and
//! the error is reported by the driver. Progress goes to **stderr** so stdout
//! remains parseable for scripts.

use std::io::Write;

use crate::sync::Outcome;

/// A single progress event for sync.
#[derive(Clone, Debug)]
pub enum SyncProgressEvent {
    /// Walking the content tree. Total unknown.
    Scanning { root: String },
    /// Resolving post `n` of `total`.
    Resolving {
        source_id: String,
        n: u64,
        total: u64,
    },
    /// A thread was bound to the post.
    Bound {
        source_id: String,
        thread_number: u64,
        outcome: Outcome,
    },
}

/// Reports sync progress. Implementations write to stderr (human or JSON).
pub trait SyncProgressReporter: Send + Sync {
    fn report(&self, event: SyncProgressEvent);
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Matched => "matched",
        Outcome::Created => "created",
        Outcome::Shared => "shared",
    }
}

/// One human-readable line, newline included.
pub fn human_line(event: &SyncProgressEvent) -> String {
    match event {
        SyncProgressEvent::Scanning { root } => format!("sync  scanning {}...\n", root),
        SyncProgressEvent::Resolving {
            source_id,
            n,
            total,
        } => format!(
            "sync  resolving  {} / {}  {}\n",
            format_number(*n),
            format_number(*total),
            source_id
        ),
        SyncProgressEvent::Bound {
            source_id,
            thread_number,
            outcome,
        } => format!(
            "sync  {:<8} #{}  {}\n",
            outcome_label(*outcome),
            thread_number,
            source_id
        ),
    }
}

pub fn json_event(event: &SyncProgressEvent) -> serde_json::Value {
    match event {
        SyncProgressEvent::Scanning { root } => serde_json::json!({
            "event": "progress",
            "phase": "scanning",
            "root": root,
        }),
        SyncProgressEvent::Resolving {
            source_id,
            n,
            total,
        } => serde_json::json!({
            "event": "progress",
            "phase": "resolving",
            "post": source_id,
            "n": n,
            "total": total,
        }),
        SyncProgressEvent::Bound {
            source_id,
            thread_number,
            outcome,
        } => serde_json::json!({
            "event": "progress",
            "phase": "bound",
            "post": source_id,
            "thread_number": thread_number,
            "outcome": outcome_label(*outcome),
        }),
    }
}

/// Human-friendly progress on stderr: "sync  resolving  12 / 1,024  2024/hello.md".
pub struct StderrProgress;

impl SyncProgressReporter for StderrProgress {
    fn report(&self, event: SyncProgressEvent) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(human_line(&event).as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl SyncProgressReporter for JsonProgress {
    fn report(&self, event: SyncProgressEvent) {
        if let Ok(line) = serde_json::to_string(&json_event(&event)) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl SyncProgressReporter for NoProgress {
    fn report(&self, _event: SyncProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// `--progress` values for `threads sync`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn SyncProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
