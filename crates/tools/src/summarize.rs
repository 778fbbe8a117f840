//! Completion model helpers for the Slack tool.

use model::{Backend, ModelError, complete};

use crate::prompts;

/// Messages beyond this many are left out of a summary prompt.
pub const MAX_SUMMARY_MESSAGES: usize = 20;

/// Keywords kept from a topic extraction.
pub const MAX_TOPICS: usize = 5;

/// Summarize message bodies with respect to the user's query.
pub async fn summarize_messages<B: Backend>(
    backend: &B,
    query: &str,
    bodies: &[String],
) -> Result<String, ModelError> {
    let bodies = &bodies[..bodies.len().min(MAX_SUMMARY_MESSAGES)];
    let prompt = prompts::summarize_messages(query, prompts::numbered(bodies).trim());
    complete(backend, &prompt).await
}

/// Ask the model for search keywords describing `query`.
pub async fn extract_topics<B: Backend>(backend: &B, query: &str) -> Result<Vec<String>, ModelError> {
    let answer = complete(backend, &prompts::extract_topics(query)).await?;
    let topics = parse_topics(&answer);
    if topics.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(topics)
}

/// Split a comma-separated keyword list, dropping blanks and repeats.
pub fn parse_topics(response: &str) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();
    for part in response.split(',') {
        let topic = part.trim().trim_matches('"').trim();
        if !topic.is_empty() && !topics.iter().any(|t| t.eq_ignore_ascii_case(topic)) {
            topics.push(topic.to_string());
        }
    }
    topics.truncate(MAX_TOPICS);
    topics
}
