//! Fixed tool result texts and model prompts.

use drive::DriveFile;

pub const SLACK_NO_RESULTS: &str = "No information was found for the topic from Slack. \
Ask the user if they would like generic information instead. If they agree, proceed accordingly.";

pub const DRIVE_AUTH_FAILED: &str = "Unable to authorize and connect to Google.";

pub const DRIVE_NO_FILES: &str = "No matching files were found in the Google Drive.";

pub const DRIVE_NO_ANSWER: &str = "Could not extract answer from the completion model.";

const SLACK_BLOCK_HEADER: &str = "Summarize ONLY the below messages. \
Do NOT add any additional information unless specifically requested. \
Summarize it as though you are the one saying it, you dont have to mention where this was obtained from. \
Make sure to say it in a detailed explanatory manner and bold the important parts. Messages:";

const DRIVE_HEADER: &str = "Please explain as though you are the source of information, \
do not have to mention where you obtained the information from or anything. \
Imagine yourself as a member of the team with all the knowledge present in you. \
Now, here are the most relevant file summaries based on your query:\n\n";

pub fn slack_search_failed(error: impl std::fmt::Display) -> String {
    format!("Unable to search Slack messages: {error}")
}

pub fn drive_list_failed(error: impl std::fmt::Display) -> String {
    format!("Unable to retrieve files: {error}")
}

/// `1. first\n2. second` ...
pub fn numbered(bodies: &[String]) -> String {
    bodies
        .iter()
        .enumerate()
        .map(|(i, body)| format!("{}. {body}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The message block handed back to the host for summarizing.
pub fn slack_messages_block(bodies: &[String]) -> String {
    format!("{SLACK_BLOCK_HEADER}\n{}", numbered(bodies))
}

pub fn summarize_messages(query: &str, numbered_messages: &str) -> String {
    format!(
        r#"You are a helpful team member assisting a newcomer.

User's original query:
"{query}"

Slack messages related to the query:
{numbered_messages}

Task:
- Summarize the key information relevant to solving the user's query.
- Give clear, step-by-step guidance if possible.
- Cite messages by their number (e.g., "as seen in message 3").
- Keep it short, focused, and actionable.
- If information is missing or not enough, mention that.
- Do not give additional information, unless specifically requested.
Begin your answer below:"#
    )
}

pub fn extract_topics(query: &str) -> String {
    format!(
        r#"You are a system designed to extract the most relevant keywords for searching Slack messages based on the user's query.
Follow the instructions below to extract keywords:
1. Analyze the user's query carefully and extract up to **5 keywords** that best represent the context of the query.
2. Retain **technical terms** (e.g., error codes, specific tool names, domain jargon) **exactly as they appear** in the user's query.
3. Break down longer phrases into **core meaningful keywords**, but ensure any technical term is preserved **as is**.
4. If the query involves an error message or specific tool/process names (e.g., "ERR: NO ACCESS" or "AMI rotation"), keep those **exactly** as they are.
5. The keywords should be **single words**, but if necessary, include multi-word technical terms, ensuring they are still relevant to the query.
6. Return the keywords as a comma-separated list. No explanations, no extra sentences. Only the keywords.

User query: "{query}""#
    )
}

pub fn extract_from_file(file_name: &str, content: &str, query: &str) -> String {
    format!(
        "File name: {file_name}\nHere is a file's content: ```{content}```. \
Please extract and summarize only what's relevant to the query: {query}"
    )
}

/// One analyzed file in the Drive tool's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub id: String,
    pub link: String,
    pub answer: String,
}

pub fn drive_summaries(summaries: &[FileSummary]) -> String {
    let mut text = DRIVE_HEADER.to_string();
    for s in summaries {
        text.push_str(&format!(
            "📄 *{}* (ID: `{}`)\n🔗 {}\n🧠 {}\n\n",
            s.name, s.id, s.link, s.answer
        ));
    }
    text
}

/// Fallback when files were listed but none yielded an answer. Lists the type
/// of every listed file, readable or not.
pub fn drive_no_readable_content(files: &[DriveFile]) -> String {
    let types: Vec<&str> = files.iter().map(|f| f.mime_type.as_str()).collect();
    format!(
        "Files were found but no readable content could be extracted or analyzed.\n\n\
File types:\n[{}]\n\nTotal Files: {}",
        types.join(", "),
        files.len()
    )
}
