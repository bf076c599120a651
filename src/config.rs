use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub registry: RegistryConfig,
    pub content: ContentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Repository in `owner/name` form.
    pub project: String,
    #[serde(default = "default_web_base")]
    pub web_base: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default)]
    pub labels: Vec<String>,
}

fn default_web_base() -> String {
    "https://github.com".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_per_page() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContentConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.markdown".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("./data/threads.json")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate registry
    let project = config.registry.project.trim();
    match project.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
        _ => anyhow::bail!(
            "registry.project must be in 'owner/name' form, got '{}'",
            config.registry.project
        ),
    }
    config.registry.project = project.to_string();

    if !(1..=100).contains(&config.registry.per_page) {
        anyhow::bail!("registry.per_page must be in [1, 100]");
    }

    if config.registry.timeout_secs == 0 {
        anyhow::bail!("registry.timeout_secs must be > 0");
    }

    if config.registry.token_env.trim().is_empty() {
        anyhow::bail!("registry.token_env must not be empty");
    }

    for (key, base) in [
        ("registry.web_base", &mut config.registry.web_base),
        ("registry.api_base", &mut config.registry.api_base),
    ] {
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            anyhow::bail!("{} must be an http(s) URL, got '{}'", key, base);
        }
        *base = base.trim_end_matches('/').to_string();
    }

    // Validate content
    if config.content.include_globs.is_empty() {
        anyhow::bail!("content.include_globs must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[registry]
project = "org/repo"

[content]
root = "./content"
"#;

    #[test]
    fn defaults_point_at_github() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.registry.web_base, "https://github.com");
        assert_eq!(config.registry.api_base, "https://api.github.com");
        assert_eq!(config.registry.token_env, "GITHUB_TOKEN");
        assert_eq!(config.registry.per_page, 100);
        assert!(config.registry.labels.is_empty());
        assert_eq!(config.output.path, PathBuf::from("./data/threads.json"));
        assert_eq!(config.content.include_globs.len(), 2);
    }

    #[test]
    fn trailing_slashes_trimmed() {
        let config = parse_config(
            r#"
[registry]
project = "org/repo"
web_base = "https://git.example.com/"
api_base = "https://git.example.com/api/v3/"

[content]
root = "."
"#,
        )
        .unwrap();
        assert_eq!(config.registry.web_base, "https://git.example.com");
        assert_eq!(config.registry.api_base, "https://git.example.com/api/v3");
    }

    #[test]
    fn rejects_malformed_project() {
        for project in ["repo", "org/", "/repo", "a/b/c"] {
            let toml = MINIMAL.replace("org/repo", project);
            let err = parse_config(&toml).unwrap_err();
            assert!(
                err.to_string().contains("owner/name"),
                "unexpected error for {project}: {err}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let toml = MINIMAL.replace(
            "project = \"org/repo\"",
            "project = \"org/repo\"\nper_page = 500",
        );
        assert!(parse_config(&toml).is_err());
    }

    #[test]
    fn rejects_non_http_base() {
        let toml = MINIMAL.replace(
            "project = \"org/repo\"",
            "project = \"org/repo\"\napi_base = \"ftp://example.com\"",
        );
        let err = parse_config(&toml).unwrap_err();
        assert!(err.to_string().contains("registry.api_base"));
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_config(Path::new("/nonexistent/threads.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/threads.toml"));
    }
}
