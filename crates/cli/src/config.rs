//! Configuration loading from beacon.toml.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use slack::SearchParams;
use tools::{DriveToolOptions, SlackToolOptions};

/// Top-level configuration. Every section and field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub anthropic: AnthropicConfig,
    pub slack: SlackConfig,
    pub drive: DriveConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name announced to the host in `initialize`.
    pub name: String,
    /// Seconds a single tool call may run.
    pub tool_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "Beacon MCP".to_string(),
            tool_timeout_secs: mcp::DEFAULT_TOOL_TIMEOUT.as_secs(),
        }
    }
}

/// Completion model settings. The API key comes from `ANTHROPIC_API_KEY`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    /// Alternative Messages endpoint.
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: model::DEFAULT_MODEL.to_string(),
            max_tokens: model::DEFAULT_MAX_TOKENS,
            base_url: None,
        }
    }
}

impl AnthropicConfig {
    pub fn backend(&self, api_key: String) -> model::AnthropicBackend {
        let mut builder = model::AnthropicBackend::builder(api_key)
            .model(&self.model)
            .max_tokens(self.max_tokens);
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        builder.build()
    }
}

/// Slack search settings. The token comes from `SLACK_USER_TOKEN`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub sort: String,
    pub sort_dir: String,
    pub highlight: bool,
    pub count: u32,
    pub replies_limit: u32,
    pub summarize: bool,
    pub expand_topics: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        let search = SearchParams::default();
        let tool = SlackToolOptions::default();
        Self {
            sort: search.sort,
            sort_dir: search.sort_dir,
            highlight: search.highlight,
            count: search.count,
            replies_limit: tool.replies_limit,
            summarize: tool.summarize,
            expand_topics: tool.expand_topics,
        }
    }
}

impl SlackConfig {
    pub fn tool_options(&self) -> SlackToolOptions {
        SlackToolOptions {
            search: SearchParams {
                sort: self.sort.clone(),
                sort_dir: self.sort_dir.clone(),
                highlight: self.highlight,
                count: self.count,
            },
            replies_limit: self.replies_limit,
            summarize: self.summarize,
            expand_topics: self.expand_topics,
        }
    }
}

/// Google Drive settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// OAuth client secret downloaded from the Google Cloud console.
    pub creds_file_path: PathBuf,
    /// Where the user's token is kept between runs.
    pub token_path: PathBuf,
    pub page_size: u32,
    pub max_content_chars: usize,
}

impl Default for DriveConfig {
    fn default() -> Self {
        let tool = DriveToolOptions::default();
        Self {
            creds_file_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            page_size: tool.page_size,
            max_content_chars: tool.max_content_chars,
        }
    }
}

impl DriveConfig {
    pub fn tool_options(&self) -> DriveToolOptions {
        DriveToolOptions {
            page_size: self.page_size,
            max_content_chars: self.max_content_chars,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid("server.tool_timeout_secs must be positive".into()));
        }
        if self.drive.page_size == 0 || self.drive.page_size > 1000 {
            return Err(ConfigError::Invalid("drive.page_size must be between 1 and 1000".into()));
        }
        if self.slack.count == 0 {
            return Err(ConfigError::Invalid("slack.count must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
