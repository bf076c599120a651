//! Content scanner.
//!
//! Walks the site's content directory and turns every matching markdown file
//! into a [`Post`]. Only the front matter is read; the markdown body is left
//! to the renderer.
//!
//! Two front matter styles are accepted:
//!
//! ```text
//! +++                         ---
//! title = "Hello"             title: Hello
//! summary = "First post"      description: "First post"
//! +++                         ---
//! ```
//!
//! Keys other than the ones below are ignored, whatever their shape.
//! `title` is required. The summary comes from `summary`, then
//! `description`, and defaults to empty. Posts marked `draft` are skipped.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

use crate::config::ContentConfig;
use crate::models::Post;

/// Front matter fields the scanner cares about.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub draft: bool,
}

/// The block as written, before `summary`/`description` are merged.
#[derive(Deserialize)]
struct RawFrontMatter {
    title: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    draft: Option<DraftFlag>,
}

/// `draft` as a boolean, or as a string some generators write instead.
#[derive(Deserialize)]
#[serde(untagged)]
enum DraftFlag {
    Bool(bool),
    Text(String),
}

impl DraftFlag {
    fn is_set(&self) -> bool {
        match self {
            DraftFlag::Bool(b) => *b,
            DraftFlag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

pub fn scan_posts(config: &ContentConfig) -> Result<Vec<Post>> {
    let root = &config.root;
    if !root.exists() {
        bail!("content.root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/_drafts/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut posts = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        if let Some(post) = read_post(path, &rel_str)? {
            posts.push(post);
        }
    }

    // Sort for deterministic ordering
    posts.sort_by(|a, b| a.source_id.cmp(&b.source_id));
    tracing::debug!(root = %root.display(), posts = posts.len(), "scanned content");

    Ok(posts)
}

/// Read one post file. Returns `None` for drafts.
pub fn read_post(path: &Path, source_id: &str) -> Result<Option<Post>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read post: {}", path.display()))?;

    let front = parse_front_matter(&text)
        .with_context(|| format!("Invalid front matter in {}", source_id))?
        .with_context(|| format!("No front matter in {}", source_id))?;

    if front.draft {
        tracing::debug!(post = source_id, "skipping draft");
        return Ok(None);
    }

    let title = match front.title {
        Some(t) if !t.trim().is_empty() => t,
        _ => bail!("Post {} has no title", source_id),
    };

    Ok(Some(Post::new(
        source_id,
        title,
        front.summary.unwrap_or_default(),
    )))
}

/// Split off and parse the front matter block. `Ok(None)` when the text
/// does not start with one.
pub fn parse_front_matter(text: &str) -> Result<Option<FrontMatter>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines();
    let delimiter = match lines.next().map(str::trim_end) {
        Some(d @ ("+++" | "---")) => d,
        _ => return Ok(None),
    };

    let mut block = Vec::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == delimiter {
            closed = true;
            break;
        }
        block.push(line);
    }
    if !closed {
        bail!("front matter opened with '{}' is never closed", delimiter);
    }

    let block = block.join("\n");
    if block.trim().is_empty() {
        return Ok(Some(FrontMatter::default()));
    }
    let front = if delimiter == "+++" {
        parse_block(toml::from_str::<RawFrontMatter>(&block))?
    } else {
        parse_block(serde_yaml::from_str::<RawFrontMatter>(&block))?
    };
    Ok(Some(front))
}

fn parse_block<E>(parsed: Result<RawFrontMatter, E>) -> Result<FrontMatter>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw = parsed?;
    Ok(FrontMatter {
        title: raw.title,
        summary: raw.summary.or(raw.description),
        draft: raw.draft.is_some_and(|d| d.is_set()),
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn toml_front_matter() {
        let text = "+++\ntitle = \"Hello, World\"\nsummary = \"First post\"\n+++\n\nBody";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.title.as_deref(), Some("Hello, World"));
        assert_eq!(front.summary.as_deref(), Some("First post"));
        assert!(!front.draft);
    }

    #[test]
    fn yaml_front_matter_with_description() {
        let text = "---\nlayout: post\ntitle: \"Colons: a story\"\ndescription: 'It''s short'\ntags:\n  - rust\n---\nBody";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.title.as_deref(), Some("Colons: a story"));
        assert_eq!(front.summary.as_deref(), Some("It's short"));
    }

    #[test]
    fn summary_preferred_over_description() {
        let text = "+++\ntitle = \"T\"\ndescription = \"d\"\nsummary = \"s\"\n+++\n";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.summary.as_deref(), Some("s"));
    }

    #[test]
    fn no_front_matter() {
        assert_eq!(parse_front_matter("# Just markdown").unwrap(), None);
    }

    #[test]
    fn unclosed_front_matter_is_error() {
        assert!(parse_front_matter("---\ntitle: x\n\nbody").is_err());
    }

    #[test]
    fn crlf_delimiters() {
        let text = "---\r\ntitle: Windows\r\n---\r\nbody";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.title.as_deref(), Some("Windows"));
    }

    #[test]
    fn yaml_folded_title() {
        let text = "---\ntitle: >-\n  A long title\n  over two lines\n---\n";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.title.as_deref(), Some("A long title over two lines"));
    }

    #[test]
    fn yaml_inline_comment_dropped() {
        let text = "---\ntitle: Hello # working title\n---\n";
        let front = parse_front_matter(text).unwrap().unwrap();
        assert_eq!(front.title.as_deref(), Some("Hello"));
    }

    #[test]
    fn draft_spellings() {
        for text in [
            "---\ntitle: T\ndraft: True\n---\n",
            "---\ntitle: T\ndraft: true\n---\n",
            "---\ntitle: T\ndraft: \"true\"\n---\n",
            "+++\ntitle = \"T\"\ndraft = true\n+++\n",
        ] {
            let front = parse_front_matter(text).unwrap().unwrap();
            assert!(front.draft, "{text:?}");
        }
        let front = parse_front_matter("---\ntitle: T\ndraft: false\n---\n")
            .unwrap()
            .unwrap();
        assert!(!front.draft);
    }

    #[test]
    fn empty_block_has_no_title() {
        let front = parse_front_matter("---\n---\nbody").unwrap().unwrap();
        assert_eq!(front, FrontMatter::default());
    }

    fn content_config(root: &Path) -> ContentConfig {
        ContentConfig {
            root: root.to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec![],
            follow_symlinks: false,
        }
    }

    #[test]
    fn scan_sorts_and_skips_drafts() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("2024")).unwrap();
        fs::write(root.join("b.md"), "+++\ntitle = \"B\"\n+++\n").unwrap();
        fs::write(
            root.join("2024/a.md"),
            "---\ntitle: A\nsummary: about a\n---\n",
        )
        .unwrap();
        fs::write(root.join("draft.md"), "+++\ntitle = \"D\"\ndraft = true\n+++\n").unwrap();
        fs::write(root.join("yaml-draft.md"), "---\ntitle: Y\ndraft: true\n---\n").unwrap();
        fs::write(root.join("notes.txt"), "not a post").unwrap();

        let posts = scan_posts(&content_config(root)).unwrap();
        let ids: Vec<&str> = posts.iter().map(|p| p.source_id.as_str()).collect();
        assert_eq!(ids, vec!["2024/a.md", "b.md"]);
        assert_eq!(posts[0].summary, "about a");
        assert_eq!(posts[1].summary, "");
        assert!(posts.iter().all(|p| !p.is_resolved()));
    }

    #[test]
    fn scan_fails_on_missing_title() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("x.md"), "+++\nsummary = \"s\"\n+++\n").unwrap();

        let err = scan_posts(&content_config(tmp.path())).unwrap_err();
        assert!(err.to_string().contains("x.md"), "{err}");
    }

    #[test]
    fn scan_fails_without_front_matter() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("2024")).unwrap();
        fs::write(tmp.path().join("2024/plain.md"), "# Just a heading\n").unwrap();

        let err = scan_posts(&content_config(tmp.path())).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("No front matter in 2024/plain.md"), "{msg}");
    }

    #[test]
    fn scan_fails_on_missing_root() {
        let tmp = TempDir::new().unwrap();
        let err = scan_posts(&content_config(&tmp.path().join("absent"))).unwrap_err();
        assert!(err.to_string().contains("content.root"));
    }
}
