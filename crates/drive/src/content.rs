//! Text extraction from downloaded file bytes.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use crate::client::DocumentStore;
use crate::error::{Error, Result};
use crate::types::{DriveFile, SupportedMime};

/// Plain text of a file's bytes. PDFs that cannot be parsed yield an empty
/// string.
pub fn extract_text(mime: SupportedMime, bytes: &[u8]) -> String {
    match mime {
        SupportedMime::Pdf => extract_pdf(bytes),
        SupportedMime::GoogleDoc | SupportedMime::PlainText => {
            let text = String::from_utf8_lossy(bytes);
            text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> String {
    // pdf-extract panics on some malformed documents.
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "unable to parse PDF");
            String::new()
        }
        Err(_) => {
            warn!("PDF parser panicked");
            String::new()
        }
    }
}

/// Fetch a supported file and extract its text.
pub async fn fetch_text<D: DocumentStore>(
    store: &D,
    file: &DriveFile,
    mime: SupportedMime,
) -> Result<String> {
    let bytes = match mime.export_as() {
        Some(export_mime) => store.export(&file.id, export_mime).await?,
        None => store.download(&file.id).await?,
    };
    debug!(file = %file.name, mime = mime.as_str(), bytes = bytes.len(), "fetched file");

    tokio::task::spawn_blocking(move || extract_text(mime, &bytes))
        .await
        .map_err(|e| Error::Extract(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_strips_bom_and_tolerates_bad_utf8() {
        assert_eq!(extract_text(SupportedMime::PlainText, b"\xef\xbb\xbfhello"), "hello");
        assert_eq!(extract_text(SupportedMime::GoogleDoc, b"caf\xff"), "caf\u{fffd}");
    }

    #[test]
    fn garbage_pdf_yields_empty_text() {
        assert_eq!(extract_text(SupportedMime::Pdf, b"definitely not a pdf"), "");
    }

    /// Records which endpoint served each file.
    #[derive(Default)]
    struct FakeStore {
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl DocumentStore for FakeStore {
        async fn list_files(&self, _query: &str, _page_size: u32) -> Result<Vec<DriveFile>> {
            Ok(Vec::new())
        }

        async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("export {file_id} {mime_type}"));
            Ok(b"exported doc".to_vec())
        }

        async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(format!("download {file_id}"));
            Ok(b"raw text".to_vec())
        }
    }

    fn file(id: &str, mime: &str) -> DriveFile {
        DriveFile {
            id: id.into(),
            name: format!("{id}-name"),
            mime_type: mime.into(),
            web_view_link: None,
        }
    }

    #[tokio::test]
    async fn google_docs_are_exported_and_others_downloaded() {
        let store = FakeStore::default();

        let doc = file("d1", SupportedMime::GOOGLE_DOC);
        let text = fetch_text(&store, &doc, SupportedMime::GoogleDoc).await.unwrap();
        assert_eq!(text, "exported doc");

        let plain = file("t1", SupportedMime::PLAIN_TEXT);
        let text = fetch_text(&store, &plain, SupportedMime::PlainText).await.unwrap();
        assert_eq!(text, "raw text");

        assert_eq!(
            *store.calls.lock().unwrap(),
            vec!["export d1 text/plain".to_string(), "download t1".to_string()]
        );
    }
}
