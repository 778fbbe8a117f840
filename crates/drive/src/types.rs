//! Drive file metadata and search queries.

use serde::Deserialize;

/// A file returned by `files.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

impl DriveFile {
    /// The content type, if it is one we can read.
    pub fn supported_mime(&self) -> Option<SupportedMime> {
        SupportedMime::from_mime(&self.mime_type)
    }
}

/// The file types whose text can be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportedMime {
    GoogleDoc,
    PlainText,
    Pdf,
}

impl SupportedMime {
    pub const GOOGLE_DOC: &'static str = "application/vnd.google-apps.document";
    pub const PLAIN_TEXT: &'static str = "text/plain";
    pub const PDF: &'static str = "application/pdf";

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            Self::GOOGLE_DOC => Some(Self::GoogleDoc),
            Self::PLAIN_TEXT => Some(Self::PlainText),
            Self::PDF => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoogleDoc => Self::GOOGLE_DOC,
            Self::PlainText => Self::PLAIN_TEXT,
            Self::Pdf => Self::PDF,
        }
    }

    /// Native Google formats have no bytes of their own and must be exported.
    pub fn export_as(self) -> Option<&'static str> {
        match self {
            Self::GoogleDoc => Some(Self::PLAIN_TEXT),
            Self::PlainText | Self::Pdf => None,
        }
    }
}

/// Drive search expression matching `topic` in file content or name.
pub fn topic_query(topic: &str) -> String {
    let topic = escape_query_value(topic);
    format!("fullText contains '{topic}' or name contains '{topic}'")
}

/// Escape a value for use inside a single-quoted Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
