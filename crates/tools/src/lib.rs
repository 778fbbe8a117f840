//! The Beacon MCP tools.
//!
//! Each tool is generic over its collaborators so the same code runs against
//! the live Slack, Drive and Anthropic clients and against in-memory fakes.

mod drive_files;
pub mod prompts;
mod slack_messages;
pub mod summarize;
#[cfg(test)]
mod testing;

pub use drive_files::{DRIVE_TOOL_NAME, DriveFilesTool, DriveToolOptions};
pub use slack_messages::{SLACK_TOOL_NAME, SlackMessagesTool, SlackToolOptions};
