use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SpecError};

/// Source ecosystem the extractors target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Laravel,
    #[value(alias = "spring")]
    #[serde(alias = "spring")]
    Java,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Laravel => write!(f, "laravel"),
            Ecosystem::Java => write!(f, "java"),
        }
    }
}

/// Shape of the emitted documentation artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Markdown,
    MarkdownMulti,
    Json,
    Notion,
    #[value(name = "notion-hier")]
    #[serde(rename = "notion-hier")]
    NotionHierarchy,
}

impl OutputFormat {
    pub fn is_workspace_export(&self) -> bool {
        matches!(self, OutputFormat::Notion | OutputFormat::NotionHierarchy)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::MarkdownMulti => "markdown-multi",
            OutputFormat::Json => "json",
            OutputFormat::Notion => "notion",
            OutputFormat::NotionHierarchy => "notion-hier",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Whether to generate descriptions at all
    pub enabled: bool,

    /// Backend name (claude, claude-code, gemini, openai)
    pub provider: String,

    /// Model name; each backend falls back to its own default
    pub model: Option<String>,

    /// API key (falls back to the backend's environment variable)
    pub api_key: Option<String>,

    /// Base URL override for HTTP backends
    pub base_url: Option<String>,

    /// Maximum tokens for responses
    pub max_tokens: Option<u32>,

    /// Temperature for responses (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Per-call timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts after a failed or timed-out call
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "claude-code".to_string(),
            model: None,
            api_key: None,
            base_url: None,
            max_tokens: Some(8000),
            temperature: None,
            timeout_secs: 120,
            retries: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Ecosystem used when the command line does not choose one
    pub ecosystem: Ecosystem,

    /// Extra directory names skipped while walking the tree
    pub ignore_dirs: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            ecosystem: Ecosystem::Laravel,
            ignore_dirs: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormat,

    /// Default output file
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Markdown,
            path: PathBuf::from("./outputs/spec.md"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Extra attempts after a failed request
    pub retries: u32,

    /// Title of the parent page in hierarchical mode (defaults to the output stem)
    pub root_title: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retries: 1,
            root_title: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project scanning settings
    pub project: ProjectConfig,

    /// Text generation settings
    pub llm: LlmConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Workspace export settings
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(SpecError::Config(format!(
                        "config file not found: {}",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                let candidates = [
                    "Specscribe.toml",
                    "specscribe.toml",
                    ".specscribe.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

/// Credentials for the workspace export, resolved from flags then environment
#[derive(Debug, Clone)]
pub struct WorkspaceCredentials {
    pub token: String,
    pub parent_page_id: String,
}

impl WorkspaceCredentials {
    /// Flag value wins; otherwise NOTION_TOKEN / NOTION_API_KEY and
    /// NOTION_PARENT_PAGE_ID / NOTION_PAGE_ID are looked up through `env` in that order.
    pub fn resolve_with<F>(token: Option<&str>, page_id: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first_set = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| env(*key))
                .find(|value| !value.trim().is_empty())
        };

        let token = token
            .map(str::to_string)
            .or_else(|| first_set(&["NOTION_TOKEN", "NOTION_API_KEY"]))
            .ok_or_else(|| SpecError::Config(
                "workspace token missing (use --notion-token or NOTION_TOKEN/NOTION_API_KEY)".to_string()
            ))?;

        let parent_page_id = page_id
            .map(str::to_string)
            .or_else(|| first_set(&["NOTION_PARENT_PAGE_ID", "NOTION_PAGE_ID"]))
            .ok_or_else(|| SpecError::Config(
                "workspace page id missing (use --notion-page-id or NOTION_PARENT_PAGE_ID/NOTION_PAGE_ID)".to_string()
            ))?;

        Ok(Self { token, parent_page_id })
    }
}
