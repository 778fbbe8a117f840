//! In-memory collaborators for tool tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use drive::{DocumentStore, DriveFile};
use model::{Backend, ModelError, ModelRequest, ModelResponse, Usage};
use slack::{ChannelPage, ChatApi, Message, SearchMatch, SearchParams};

/// Replays scripted answers in order; `None` (or running out) is a failure.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new<'a>(replies: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model that fails every call.
    pub fn unavailable() -> Self {
        Self::new(Vec::<Option<&str>>::new())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Backend for ScriptedModel {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.prompts
            .lock()
            .unwrap()
            .extend(request.messages.iter().map(|m| m.content.clone()));
        match self.replies.lock().unwrap().pop_front().flatten() {
            Some(text) => Ok(ModelResponse {
                blocks: vec![text],
                usage: Usage::default(),
            }),
            None => Err(ModelError::Api("503: overloaded".into())),
        }
    }
}

/// A workspace with top-level history and threads, searchable by query.
#[derive(Default)]
pub struct FakeChat {
    pub results: HashMap<String, Vec<SearchMatch>>,
    pub history: HashMap<(String, String), Message>,
    pub threads: HashMap<(String, String), Vec<Message>>,
    pub search_down: bool,
    pub searched: Mutex<Vec<String>>,
}

impl FakeChat {
    /// Post a message; replies (thread_ts != ts) stay out of channel history.
    pub fn post(&mut self, channel: &str, ts: &str, thread_ts: Option<&str>, text: &str) {
        let message = Message {
            channel: channel.into(),
            ts: ts.into(),
            thread_ts: thread_ts.map(String::from),
            user: Some("U1".into()),
            text: text.into(),
            permalink: None,
        };
        if let Some(root) = thread_ts {
            self.threads
                .entry((channel.into(), root.into()))
                .or_default()
                .push(message.clone());
        }
        if thread_ts.is_none_or(|root| root == ts) {
            self.history.insert((channel.into(), ts.into()), message);
        }
    }

    /// Make `query` return a hit for an already posted message.
    pub fn index(&mut self, query: &str, channel: &str, ts: &str, thread_ts: Option<&str>, text: &str) {
        let digits = ts.replace('.', "");
        let permalink = match thread_ts {
            Some(root) if root != ts => {
                format!("https://acme.slack.com/archives/{channel}/p{digits}?thread_ts={root}&cid={channel}")
            }
            _ => format!("https://acme.slack.com/archives/{channel}/p{digits}"),
        };
        self.results.entry(query.into()).or_default().push(SearchMatch {
            channel_id: channel.into(),
            channel_name: None,
            ts: ts.into(),
            user: Some("U1".into()),
            text: text.into(),
            permalink: Some(permalink),
        });
    }
}

impl ChatApi for FakeChat {
    async fn search_messages(&self, query: &str, _params: &SearchParams) -> slack::Result<Vec<SearchMatch>> {
        self.searched.lock().unwrap().push(query.to_string());
        if self.search_down {
            return Err(slack::Error::Api {
                method: "search.messages".into(),
                error: "not_authed".into(),
            });
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }

    async fn conversation_history(
        &self,
        channel: &str,
        latest: &str,
        _inclusive: bool,
        _limit: u32,
    ) -> slack::Result<Vec<Message>> {
        Ok(self
            .history
            .get(&(channel.to_string(), latest.to_string()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn conversation_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        _limit: u32,
    ) -> slack::Result<Vec<Message>> {
        Ok(self
            .threads
            .get(&(channel.to_string(), thread_ts.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn conversations(&self, _cursor: Option<&str>) -> slack::Result<ChannelPage> {
        Ok(ChannelPage::default())
    }
}

/// Files with fixed contents; ids listed in `broken` fail to download.
#[derive(Default)]
pub struct FakeDrive {
    pub files: Vec<DriveFile>,
    pub contents: HashMap<String, Vec<u8>>,
    pub broken: Vec<String>,
    pub list_error: Option<fn() -> drive::Error>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeDrive {
    pub fn add(&mut self, id: &str, name: &str, mime: &str, content: &str) {
        self.files.push(DriveFile {
            id: id.into(),
            name: name.into(),
            mime_type: mime.into(),
            web_view_link: Some(format!("https://drive.google.com/file/d/{id}/view")),
        });
        self.contents.insert(id.into(), content.as_bytes().to_vec());
    }

    fn content(&self, file_id: &str) -> drive::Result<Vec<u8>> {
        if self.broken.iter().any(|id| id == file_id) {
            return Err(drive::Error::Api {
                operation: "files.get",
                status: 404,
                body: "File not found".into(),
            });
        }
        Ok(self.contents.get(file_id).cloned().unwrap_or_default())
    }
}

impl DocumentStore for FakeDrive {
    async fn list_files(&self, query: &str, _page_size: u32) -> drive::Result<Vec<DriveFile>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(error) = self.list_error {
            return Err(error());
        }
        Ok(self.files.clone())
    }

    async fn export(&self, file_id: &str, _mime_type: &str) -> drive::Result<Vec<u8>> {
        self.content(file_id)
    }

    async fn download(&self, file_id: &str) -> drive::Result<Vec<u8>> {
        self.content(file_id)
    }
}
