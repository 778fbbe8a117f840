use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A text message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Everything needed for a model request.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub system: Option<&'a str>,
}

/// The response from a model: its text content blocks, in order.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub blocks: Vec<String>,
    pub usage: Usage,
}

impl ModelResponse {
    /// Concatenate all text blocks.
    pub fn text(&self) -> String {
        self.blocks.concat()
    }
}

/// Trait for completion model backends.
pub trait Backend: Send + Sync {
    fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<ModelResponse, ModelError>> + Send;
}

/// Send a single user prompt and return the trimmed answer text.
pub async fn complete<B: Backend>(backend: &B, prompt: &str) -> Result<String, ModelError> {
    let messages = [Message::user(prompt.trim())];
    let response = backend
        .call(ModelRequest {
            messages: &messages,
            system: None,
        })
        .await?;

    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text.to_string())
}
