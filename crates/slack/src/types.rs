//! Slack domain types.

use reqwest::Url;

/// Parameters for `search.messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// `score` or `timestamp`.
    pub sort: String,
    /// `asc` or `desc`.
    pub sort_dir: String,
    /// Wrap matched terms in highlight markers.
    pub highlight: bool,
    /// Matches per page.
    pub count: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            sort: "score".to_string(),
            sort_dir: "desc".to_string(),
            highlight: true,
            count: 20,
        }
    }
}

/// One hit returned by `search.messages`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub channel_id: String,
    pub channel_name: Option<String>,
    pub ts: String,
    pub user: Option<String>,
    pub text: String,
    pub permalink: Option<String>,
}

impl SearchMatch {
    /// Thread timestamp carried in the permalink query (`?thread_ts=...`),
    /// present when the hit is a thread reply.
    pub fn permalink_thread_ts(&self) -> Option<String> {
        let url = Url::parse(self.permalink.as_deref()?).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "thread_ts")
            .map(|(_, value)| value.into_owned())
            .filter(|ts| !ts.is_empty())
    }

    /// The hit itself, as a standalone message.
    pub fn to_message(&self) -> Message {
        Message {
            channel: self.channel_id.clone(),
            ts: self.ts.clone(),
            thread_ts: self.permalink_thread_ts(),
            user: self.user.clone(),
            text: self.text.clone(),
            permalink: self.permalink.clone(),
        }
    }
}

/// A message from channel history or a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub user: Option<String>,
    pub text: String,
    pub permalink: Option<String>,
}

impl Message {
    /// Stable identity of this message: the `<channel>/p<ts digits>` tail of
    /// its permalink. History and replies do not carry permalinks, so the same
    /// key is derived from channel and timestamp when none is known.
    pub fn permalink_key(&self) -> String {
        self.permalink
            .as_deref()
            .and_then(permalink_path)
            .unwrap_or_else(|| format!("{}/p{}", self.channel, self.ts.replace('.', "")))
    }

    /// Whether this message belongs to a thread (as root or reply).
    pub fn in_thread(&self) -> bool {
        self.thread_ts.as_deref().is_some_and(|ts| !ts.is_empty())
    }
}

fn permalink_path(permalink: &str) -> Option<String> {
    let url = Url::parse(permalink).ok()?;
    let (_, tail) = url.path().split_once("/archives/")?;
    let tail = tail.trim_end_matches('/');
    (!tail.is_empty()).then(|| tail.to_string())
}

/// A channel visible to the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub num_members: Option<u32>,
}

/// One page of `conversations.list`.
#[derive(Debug, Clone, Default)]
pub struct ChannelPage {
    pub channels: Vec<Channel>,
    pub next_cursor: Option<String>,
}
