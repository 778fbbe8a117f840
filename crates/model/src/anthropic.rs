//! Anthropic Messages API backend.

use crate::{Backend, Message, ModelError, ModelRequest, ModelResponse, Role, Usage};
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    base_url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: None,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Point the backend at a different Messages endpoint (proxies, gateways).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            system: self.system,
            url: self.base_url,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    url: String,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn build_request<'a>(&'a self, request: &ModelRequest<'a>) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: request
                .messages
                .iter()
                .map(|m: &'a Message| ApiMessage {
                    role: Self::role_to_api(m.role),
                    content: &m.content,
                })
                .collect(),
            system: request.system.or(self.system.as_deref()),
        }
    }

    fn parse_response(api_response: ApiResponse) -> ModelResponse {
        let blocks = api_response
            .content
            .into_iter()
            .filter_map(|block| match block {
                ApiResponseBlock::Text { text } => Some(text),
                ApiResponseBlock::Unknown => None,
            })
            .collect();

        let usage = api_response
            .usage
            .map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default();

        ModelResponse { blocks, usage }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({}, max_tokens={})", self.model, self.max_tokens)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let api_request = self.build_request(&request);

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let response = Self::parse_response(api_response);
        debug!(
            model = %self.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion"
        );
        Ok(response)
    }
}
