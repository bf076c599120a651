//! # post-threads
//!
//! Gives every post of a static site a GitHub issue to hold its comments,
//! before the site is rendered.
//!
//! For each post the tool looks for an issue whose title equals the post's
//! title, opens one if none exists, and records the issue number, its web
//! URL, and the API endpoint for posting replies in a JSON data file the
//! site templates read.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Content  │──▶│ Synchronizer │──▶│   Manifest   │──▶ renderer
//! │  (posts)  │   │ find/create  │   │ threads.json │
//! └───────────┘   └──────┬───────┘   └──────────────┘
//!                        │
//!                        ▼
//!                 ┌──────────────┐
//!                 │   Registry   │
//!                 │ GitHub issues│
//!                 └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=...
//! threads posts                  # show what will be synced
//! threads sync --dry-run         # show matches and pending creates
//! threads sync                   # create missing threads, write data/threads.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Posts, threads, resolved metadata |
//! | [`content`] | Content tree scanning and front matter |
//! | [`registry`] | Tracker client trait and GitHub implementation |
//! | [`sync`] | Find-or-create resolution |
//! | [`manifest`] | JSON output for the renderer |
//! | [`driver`] | CLI command runners |
//! | [`error`] | Registry and resolution errors |
//! | [`progress`] | Progress reporting on stderr |

pub mod config;
pub mod content;
pub mod driver;
pub mod error;
pub mod manifest;
pub mod models;
pub mod progress;
pub mod registry;
pub mod sync;
