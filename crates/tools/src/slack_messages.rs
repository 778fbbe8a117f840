//! `getMessagesFromSlack`: chat search resolved into whole conversations.

use std::sync::Arc;

use async_trait::async_trait;
use mcp::{Arguments, CallToolResult, Tool, ToolContext, ToolError, ToolHandler};
use model::Backend;
use slack::{ChatApi, DEFAULT_REPLIES_LIMIT, SearchParams, sanitize, unique_messages};
use tracing::{debug, info, warn};

use crate::prompts;
use crate::summarize::{extract_topics, summarize_messages};

pub const SLACK_TOOL_NAME: &str = "getMessagesFromSlack";

#[derive(Debug, Clone)]
pub struct SlackToolOptions {
    pub search: SearchParams,
    /// Page size for thread replies.
    pub replies_limit: u32,
    /// Return a model-written summary instead of the raw message block.
    pub summarize: bool,
    /// Search for model-extracted keywords instead of the literal topic.
    pub expand_topics: bool,
}

impl Default for SlackToolOptions {
    fn default() -> Self {
        Self {
            search: SearchParams::default(),
            replies_limit: DEFAULT_REPLIES_LIMIT,
            summarize: false,
            expand_topics: false,
        }
    }
}

pub struct SlackMessagesTool<C, B> {
    chat: C,
    model: Arc<B>,
    options: SlackToolOptions,
}

impl<C: ChatApi, B: Backend> SlackMessagesTool<C, B> {
    pub fn new(chat: C, model: Arc<B>, options: SlackToolOptions) -> Self {
        Self {
            chat,
            model,
            options,
        }
    }

    /// The tool's answer for `topic`. Never fails: problems become text.
    pub async fn messages_for(&self, topic: &str) -> String {
        let queries = self.search_queries(topic).await;

        let mut matches = Vec::new();
        let mut first_error = None;
        for query in &queries {
            match self.chat.search_messages(query, &self.options.search).await {
                Ok(found) => matches.extend(found),
                Err(e) => {
                    warn!(query = %query, error = %e, "slack search failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error.filter(|_| matches.is_empty()) {
            return prompts::slack_search_failed(e);
        }

        let messages = unique_messages(&self.chat, &matches, self.options.replies_limit).await;
        let bodies: Vec<String> = messages
            .iter()
            .map(|m| sanitize(&m.text))
            .filter(|body| !body.is_empty())
            .collect();
        info!(topic, matches = matches.len(), messages = bodies.len(), "slack search");

        if bodies.is_empty() {
            return prompts::SLACK_NO_RESULTS.to_string();
        }

        if self.options.summarize {
            match summarize_messages(self.model.as_ref(), topic, &bodies).await {
                Ok(summary) => return summary,
                Err(e) => warn!(error = %e, "summary failed, returning messages"),
            }
        }
        prompts::slack_messages_block(&bodies)
    }

    async fn search_queries(&self, topic: &str) -> Vec<String> {
        if !self.options.expand_topics {
            return vec![topic.to_string()];
        }
        match extract_topics(self.model.as_ref(), topic).await {
            Ok(topics) => {
                debug!(?topics, "expanded topic");
                topics
            }
            Err(e) => {
                warn!(error = %e, "topic expansion failed, searching the topic as given");
                vec![topic.to_string()]
            }
        }
    }
}

#[async_trait]
impl<C, B> ToolHandler for SlackMessagesTool<C, B>
where
    C: ChatApi + 'static,
    B: Backend + 'static,
{
    fn definition(&self) -> Tool {
        Tool::new(
            SLACK_TOOL_NAME,
            "Get all relevant Slack messages regarding the user's query.",
        )
        .with_required_string(
            "topic",
            "The specific topic the user is looking to know about, without changing the terminology.",
        )
    }

    async fn call(
        &self,
        _context: ToolContext,
        arguments: Arguments,
    ) -> Result<CallToolResult, ToolError> {
        let topic = arguments.require_str("topic")?;
        Ok(CallToolResult::text(self.messages_for(topic).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeChat, ScriptedModel};
    use mcp::RequestId;
    use serde_json::json;

    const TOPIC: &str = "deploy pipeline";

    fn slack_tool(
        chat: FakeChat,
        model: ScriptedModel,
        options: SlackToolOptions,
    ) -> SlackMessagesTool<FakeChat, ScriptedModel> {
        SlackMessagesTool::new(chat, Arc::new(model), options)
    }

    fn no_model() -> ScriptedModel {
        ScriptedModel::unavailable()
    }

    fn deploy_thread() -> FakeChat {
        let mut chat = FakeChat::default();
        chat.post("C1", "100.1", Some("100.1"), "deploy pipeline is failing on staging");
        chat.post("C1", "100.2", Some("100.1"), "fixed the deploy pipeline cache key");
        chat.index(TOPIC, "C1", "100.1", Some("100.1"), "deploy pipeline is failing on staging");
        chat.index(TOPIC, "C1", "100.2", Some("100.1"), "fixed the deploy pipeline cache key");
        chat
    }

    #[tokio::test]
    async fn thread_hits_yield_each_message_once() {
        let tool = slack_tool(deploy_thread(), no_model(), SlackToolOptions::default());
        let text = tool.messages_for(TOPIC).await;

        assert!(text.starts_with("Summarize ONLY the below messages."));
        assert!(text.ends_with(
            "Messages:\n1. deploy pipeline is failing on staging\n2. fixed the deploy pipeline cache key"
        ));
    }

    #[tokio::test]
    async fn no_matches_yield_sentinel() {
        let tool = slack_tool(FakeChat::default(), no_model(), SlackToolOptions::default());
        assert_eq!(tool.messages_for("nothing here").await, prompts::SLACK_NO_RESULTS);
    }

    #[tokio::test]
    async fn search_failure_is_reported_as_text() {
        let chat = FakeChat {
            search_down: true,
            ..FakeChat::default()
        };
        let tool = slack_tool(chat, no_model(), SlackToolOptions::default());
        assert_eq!(
            tool.messages_for(TOPIC).await,
            "Unable to search Slack messages: Slack API search.messages failed: not_authed"
        );
    }

    #[tokio::test]
    async fn standalone_message_is_returned_alone() {
        let mut chat = FakeChat::default();
        chat.post("C2", "200.0", None, "the &lt;staging&gt; \u{E000}deploy\u{E001} is frozen");
        chat.post("C2", "201.0", None, "unrelated chatter");
        chat.index("freeze", "C2", "200.0", None, "staging deploy is frozen");

        let tool = slack_tool(chat, no_model(), SlackToolOptions::default());
        let text = tool.messages_for("freeze").await;
        assert!(text.ends_with("Messages:\n1. the <staging> deploy is frozen"));
    }

    #[tokio::test]
    async fn expanded_topics_are_each_searched() {
        let mut chat = deploy_thread();
        chat.post("C3", "300.0", None, "staging is back");
        chat.index("staging", "C3", "300.0", None, "staging is back");

        let options = SlackToolOptions {
            expand_topics: true,
            ..SlackToolOptions::default()
        };
        let tool = slack_tool(chat, ScriptedModel::new([Some("deploy pipeline, staging")]), options);
        let text = tool.messages_for("why is staging broken after the deploy pipeline change").await;

        assert_eq!(
            *tool.chat.searched.lock().unwrap(),
            vec!["deploy pipeline".to_string(), "staging".to_string()]
        );
        assert!(text.ends_with("\n3. staging is back"));
    }

    #[tokio::test]
    async fn failed_expansion_searches_raw_topic() {
        let options = SlackToolOptions {
            expand_topics: true,
            ..SlackToolOptions::default()
        };
        let tool = slack_tool(deploy_thread(), no_model(), options);
        let text = tool.messages_for(TOPIC).await;

        assert_eq!(*tool.chat.searched.lock().unwrap(), vec![TOPIC.to_string()]);
        assert!(text.contains("2. fixed the deploy pipeline cache key"));
    }

    #[tokio::test]
    async fn summary_replaces_block_and_falls_back_on_failure() {
        let options = SlackToolOptions {
            summarize: true,
            ..SlackToolOptions::default()
        };
        let tool = slack_tool(deploy_thread(), ScriptedModel::new([Some("Bump the cache key.")]), options.clone());
        assert_eq!(tool.messages_for(TOPIC).await, "Bump the cache key.");

        let tool = slack_tool(deploy_thread(), no_model(), options);
        assert!(tool.messages_for(TOPIC).await.starts_with("Summarize ONLY"));
    }

    #[tokio::test]
    async fn handler_requires_topic() {
        let tool = slack_tool(deploy_thread(), no_model(), SlackToolOptions::default());
        let context = ToolContext {
            request_id: RequestId::from(1),
        };

        let err = tool
            .call(context.clone(), Arguments::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(name) if name == "topic"));

        let args = match json!({"topic": TOPIC}) {
            serde_json::Value::Object(map) => Arguments(map),
            _ => unreachable!(),
        };
        let result = tool.call(context, args).await.unwrap();
        assert!(result.joined_text().contains("deploy pipeline is failing"));
        assert_eq!(tool.definition().required(), vec!["topic"]);
    }
}
