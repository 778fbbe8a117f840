//! Cleaning Slack message text for prompts.

/// Search highlight markers wrapped around matched terms.
const HIGHLIGHT_START: char = '\u{E000}';
const HIGHLIGHT_END: char = '\u{E001}';

/// Make message text prompt-safe: drop highlight markers and control
/// characters (line breaks become spaces), decode Slack's three HTML
/// entities and trim.
pub fn sanitize(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter_map(|c| match c {
            HIGHLIGHT_START | HIGHLIGHT_END => None,
            '\n' | '\r' | '\t' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    cleaned
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
