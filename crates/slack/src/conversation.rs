//! Resolving search hits to whole conversations.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::client::ChatApi;
use crate::error::Result;
use crate::types::{Channel, Message, SearchMatch};

/// Default page size for `conversations.replies`.
pub const DEFAULT_REPLIES_LIMIT: u32 = 100;

/// Fetch the conversation a search hit belongs to.
///
/// - A standalone message resolves to itself.
/// - A thread root or reply resolves to the whole thread, root first.
///
/// Channel history only holds top-level messages, so a reply looked up by
/// timestamp comes back as some other message. In that case the thread is
/// found through the `thread_ts` in the hit's permalink, and failing that the
/// hit is returned on its own.
pub async fn resolve_match<C: ChatApi>(
    api: &C,
    hit: &SearchMatch,
    replies_limit: u32,
) -> Result<Vec<Message>> {
    let history = api
        .conversation_history(&hit.channel_id, &hit.ts, true, 1)
        .await?;
    let exact = history.into_iter().find(|m| m.ts == hit.ts);

    match exact {
        Some(message) if message.in_thread() => {
            let thread_ts = message.thread_ts.as_deref().unwrap_or(&message.ts);
            api.conversation_replies(&hit.channel_id, thread_ts, replies_limit)
                .await
        }
        Some(message) => Ok(vec![message]),
        None => match hit.permalink_thread_ts() {
            Some(thread_ts) => {
                debug!(channel = %hit.channel_id, ts = %hit.ts, %thread_ts, "resolving reply via permalink");
                api.conversation_replies(&hit.channel_id, &thread_ts, replies_limit)
                    .await
            }
            None => Ok(vec![hit.to_message()]),
        },
    }
}

/// Keep the first message for every permalink, preserving order.
pub fn dedup_by_permalink(messages: impl IntoIterator<Item = Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.permalink_key()))
        .collect()
}

/// Resolve every hit and return the unique messages in first-seen order.
///
/// A hit that cannot be resolved is logged and skipped.
pub async fn unique_messages<C: ChatApi>(
    api: &C,
    matches: &[SearchMatch],
    replies_limit: u32,
) -> Vec<Message> {
    let mut resolved = Vec::new();
    for hit in matches {
        match resolve_match(api, hit, replies_limit).await {
            Ok(conversation) => resolved.extend(conversation),
            Err(e) => {
                warn!(channel = %hit.channel_id, ts = %hit.ts, error = %e, "skipping unresolved match");
            }
        }
    }

    let unique = dedup_by_permalink(resolved);
    debug!(matches = matches.len(), unique = unique.len(), "resolved conversations");
    unique
}

/// Every channel visible to the token, following pagination.
pub async fn list_channels<C: ChatApi>(api: &C) -> Result<Vec<Channel>> {
    let mut channels = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = api.conversations(cursor.as_deref()).await?;
        channels.extend(page.channels);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(channels)
}
