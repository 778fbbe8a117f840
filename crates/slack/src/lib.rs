//! Slack Web API access for the chat-search tool.
//!
//! - [`ChatApi`] is the seam the tools are written against; [`SlackClient`]
//!   implements it over HTTPS with a user token.
//! - [`resolve_match`] turns a search hit into its whole conversation and
//!   [`unique_messages`] deduplicates the results by permalink.

mod client;
mod conversation;
mod error;
mod text;
mod types;

pub use client::{ChatApi, SlackClient};
pub use conversation::{
    DEFAULT_REPLIES_LIMIT, dedup_by_permalink, list_channels, resolve_match, unique_messages,
};
pub use error::{Error, Result};
pub use text::sanitize;
pub use types::{Channel, ChannelPage, Message, SearchMatch, SearchParams};
