//! `getFilesFromDrive`: matching files, each read and queried through the model.

use std::sync::Arc;

use async_trait::async_trait;
use drive::{DocumentStore, fetch_text, topic_query};
use mcp::{Arguments, CallToolResult, Tool, ToolContext, ToolError, ToolHandler};
use model::{Backend, complete};
use tracing::{debug, info, warn};

use crate::prompts::{self, FileSummary};

pub const DRIVE_TOOL_NAME: &str = "getFilesFromDrive";

#[derive(Debug, Clone)]
pub struct DriveToolOptions {
    /// Files requested from `files.list`.
    pub page_size: u32,
    /// File text beyond this many characters is cut before prompting.
    pub max_content_chars: usize,
}

impl Default for DriveToolOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            max_content_chars: 100_000,
        }
    }
}

pub struct DriveFilesTool<D, B> {
    store: D,
    model: Arc<B>,
    options: DriveToolOptions,
}

impl<D: DocumentStore, B: Backend> DriveFilesTool<D, B> {
    pub fn new(store: D, model: Arc<B>, options: DriveToolOptions) -> Self {
        Self {
            store,
            model,
            options,
        }
    }

    /// The tool's answer for `topic` and the user's `query`. Never fails:
    /// problems become text.
    pub async fn files_for(&self, topic: &str, query: &str) -> String {
        let files = match self
            .store
            .list_files(&topic_query(topic), self.options.page_size)
            .await
        {
            Ok(files) => files,
            Err(e) if e.is_auth() => {
                warn!(error = %e, "Google authorization failed");
                return prompts::DRIVE_AUTH_FAILED.to_string();
            }
            Err(e) => {
                warn!(error = %e, "unable to list Drive files");
                return prompts::drive_list_failed(e);
            }
        };
        if files.is_empty() {
            return prompts::DRIVE_NO_FILES.to_string();
        }

        let mut summaries = Vec::new();
        for file in &files {
            let Some(mime) = file.supported_mime() else {
                debug!(file = %file.name, mime = %file.mime_type, "skipping unsupported file type");
                continue;
            };

            let content = match fetch_text(&self.store, file, mime).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %file.name, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            if content.trim().is_empty() {
                warn!(file = %file.name, "skipping file without text");
                continue;
            }

            let content = truncate_chars(&content, self.options.max_content_chars);
            let prompt = prompts::extract_from_file(&file.name, content, query);
            let answer = match complete(self.model.as_ref(), &prompt).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(file = %file.name, error = %e, "completion failed");
                    prompts::DRIVE_NO_ANSWER.to_string()
                }
            };

            summaries.push(FileSummary {
                name: file.name.clone(),
                id: file.id.clone(),
                link: file.web_view_link.clone().unwrap_or_default(),
                answer,
            });
        }

        info!(topic, listed = files.len(), analyzed = summaries.len(), "drive search");
        if summaries.is_empty() {
            return prompts::drive_no_readable_content(&files);
        }
        prompts::drive_summaries(&summaries)
    }
}

/// At most `max` characters of `text`.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[async_trait]
impl<D, B> ToolHandler for DriveFilesTool<D, B>
where
    D: DocumentStore + 'static,
    B: Backend + 'static,
{
    fn definition(&self) -> Tool {
        Tool::new(
            DRIVE_TOOL_NAME,
            "Get all files and its details from google drive regarding the topic of the user's query.",
        )
        .with_required_string(
            "topic",
            "The specific topic the user is looking to know about, without changing the terminology.",
        )
        .with_required_string(
            "query",
            "The query entered by the user as it is without any changes.",
        )
    }

    async fn call(
        &self,
        _context: ToolContext,
        arguments: Arguments,
    ) -> Result<CallToolResult, ToolError> {
        let topic = arguments.require_str("topic")?;
        let query = arguments.require_str("query")?;
        Ok(CallToolResult::text(self.files_for(topic, query).await))
    }
}
