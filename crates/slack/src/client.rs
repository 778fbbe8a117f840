//! Slack Web API client.

use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Channel, ChannelPage, Message, SearchMatch, SearchParams};

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Upper bound on `conversations.replies` pages fetched for one thread.
const MAX_REPLY_PAGES: usize = 10;

/// The chat service operations the tools rely on.
pub trait ChatApi: Send + Sync {
    /// Full-text search over messages.
    fn search_messages(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> impl Future<Output = Result<Vec<SearchMatch>>> + Send;

    /// Channel history ending at `latest`.
    fn conversation_history(
        &self,
        channel: &str,
        latest: &str,
        inclusive: bool,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// Every message of a thread, root first.
    fn conversation_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    /// One page of the channels visible to the token.
    fn conversations(&self, cursor: Option<&str>)
    -> impl Future<Output = Result<ChannelPage>> + Send;
}

/// Slack Web API client authenticated with a user token.
pub struct SlackClient {
    client: Client,
    token: String,
    base_url: String,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: SLACK_API_BASE.to_string(),
        }
    }

    /// Use a different API root (Enterprise Grid hosts, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make an authenticated GET request to the Slack API.
    async fn api_get<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Status {
                method: method.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let envelope: Envelope<T> = resp.json().await?;
        envelope.into_result(method)
    }
}

impl ChatApi for SlackClient {
    async fn search_messages(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchMatch>> {
        let body: SearchBody = self
            .api_get(
                "search.messages",
                &[
                    ("query", query.to_string()),
                    ("sort", params.sort.clone()),
                    ("sort_dir", params.sort_dir.clone()),
                    ("highlight", params.highlight.to_string()),
                    ("count", params.count.to_string()),
                ],
            )
            .await?;

        let matches: Vec<SearchMatch> = body.messages.matches.into_iter().map(Into::into).collect();
        debug!(query, total = body.messages.total, returned = matches.len(), "search.messages");
        Ok(matches)
    }

    async fn conversation_history(
        &self,
        channel: &str,
        latest: &str,
        inclusive: bool,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let body: HistoryBody = self
            .api_get(
                "conversations.history",
                &[
                    ("channel", channel.to_string()),
                    ("latest", latest.to_string()),
                    ("inclusive", inclusive.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(body.into_messages(channel))
    }

    async fn conversation_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: u32,
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        let mut pages = 0;
        loop {
            let mut params = vec![
                ("channel", channel.to_string()),
                ("ts", thread_ts.to_string()),
                ("limit", limit.to_string()),
            ];
            if let Some(c) = cursor.take() {
                params.push(("cursor", c));
            }

            let body: HistoryBody = self.api_get("conversations.replies", &params).await?;
            let next = body.next_cursor();
            messages.extend(body.into_messages(channel));
            pages += 1;

            match next {
                None => break,
                Some(_) if pages >= MAX_REPLY_PAGES => {
                    warn!(
                        channel,
                        thread_ts,
                        pages,
                        fetched = messages.len(),
                        "thread has more replies than the page cap; later replies are left out"
                    );
                    break;
                }
                Some(c) => cursor = Some(c),
            }
        }

        debug!(channel, thread_ts, count = messages.len(), "conversations.replies");
        Ok(messages)
    }

    async fn conversations(&self, cursor: Option<&str>) -> Result<ChannelPage> {
        let mut params = vec![
            ("types", "public_channel,private_channel".to_string()),
            ("exclude_archived", "true".to_string()),
            ("limit", "200".to_string()),
        ];
        if let Some(c) = cursor {
            params.push(("cursor", c.to_string()));
        }

        let body: ChannelsBody = self.api_get("conversations.list", &params).await?;
        Ok(body.into())
    }
}

// -- Slack API response types --

/// Every Web API response carries `ok` and, on failure, `error`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: T,
}

impl<T> Envelope<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(Error::Api {
                method: method.to_string(),
                error: self.error.unwrap_or_else(|| "unknown".into()),
            });
        }
        Ok(self.body)
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchBody {
    messages: SearchMessages,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchMessages {
    total: u32,
    matches: Vec<WireSearchMatch>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireSearchMatch {
    channel: WireChannelRef,
    ts: String,
    user: Option<String>,
    text: String,
    permalink: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireChannelRef {
    id: String,
    name: Option<String>,
}

impl From<WireSearchMatch> for SearchMatch {
    fn from(m: WireSearchMatch) -> Self {
        Self {
            channel_id: m.channel.id,
            channel_name: m.channel.name,
            ts: m.ts,
            user: m.user,
            text: m.text,
            permalink: m.permalink,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct HistoryBody {
    messages: Vec<WireMessage>,
    has_more: bool,
    response_metadata: ResponseMetadata,
}

impl HistoryBody {
    fn next_cursor(&self) -> Option<String> {
        if !self.has_more {
            return None;
        }
        self.response_metadata.cursor()
    }

    fn into_messages(self, channel: &str) -> Vec<Message> {
        self.messages
            .into_iter()
            .map(|m| Message {
                channel: channel.to_string(),
                ts: m.ts,
                thread_ts: m.thread_ts.filter(|ts| !ts.is_empty()),
                user: m.user,
                text: m.text,
                permalink: m.permalink,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireMessage {
    ts: String,
    thread_ts: Option<String>,
    user: Option<String>,
    text: String,
    permalink: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

impl ResponseMetadata {
    fn cursor(&self) -> Option<String> {
        self.next_cursor.clone().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ChannelsBody {
    channels: Vec<WireChannel>,
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct WireChannel {
    id: String,
    name: String,
    is_private: bool,
    num_members: Option<u32>,
}

impl From<ChannelsBody> for ChannelPage {
    fn from(body: ChannelsBody) -> Self {
        let next_cursor = body.response_metadata.cursor();
        Self {
            channels: body
                .channels
                .into_iter()
                .map(|c| Channel {
                    id: c.id,
                    name: c.name,
                    is_private: c.is_private,
                    num_members: c.num_members,
                })
                .collect(),
            next_cursor,
        }
    }
}
