//! Google Drive v3 client.

use std::future::Future;
use std::sync::Arc;

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::authorizer::Authorizer;
use crate::error::{Error, Result};
use crate::types::DriveFile;

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// The file store operations the tools rely on.
pub trait DocumentStore: Send + Sync {
    /// Files matching a Drive query expression, across all drives.
    fn list_files(
        &self,
        query: &str,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<DriveFile>>> + Send;

    /// Contents of a native Google file converted to `mime_type`.
    fn export(&self, file_id: &str, mime_type: &str)
    -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Raw contents of a stored file.
    fn download(&self, file_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Drive API client using tokens from an [`Authorizer`].
pub struct DriveClient {
    client: Client,
    auth: Arc<Authorizer>,
    base_url: String,
}

impl DriveClient {
    pub fn new(auth: Arc<Authorizer>) -> Self {
        Self {
            client: Client::new(),
            auth,
            base_url: DRIVE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Response> {
        let token = self.auth.access_token().await?;
        let resp = self
            .client
            .get(format!("{}/{path}", self.base_url))
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                operation,
                status,
                body,
            });
        }
        Ok(resp)
    }
}

impl DocumentStore for DriveClient {
    async fn list_files(&self, query: &str, page_size: u32) -> Result<Vec<DriveFile>> {
        let page_size = page_size.to_string();
        let list: FileList = self
            .get(
                "files.list",
                "files",
                &[
                    ("q", query),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                    ("fields", "files(id, name, mimeType, webViewLink)"),
                    ("pageSize", page_size.as_str()),
                ],
            )
            .await?
            .json()
            .await?;

        debug!(query, count = list.files.len(), "files.list");
        Ok(list.files)
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let resp = self
            .get(
                "files.export",
                &format!("files/{file_id}/export"),
                &[("mimeType", mime_type)],
            )
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>> {
        let resp = self
            .get(
                "files.get",
                &format!("files/{file_id}"),
                &[("alt", "media"), ("supportsAllDrives", "true")],
            )
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FileList {
    files: Vec<DriveFile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_list_decodes_and_tolerates_missing_files() {
        let list: FileList = serde_json::from_str(
            r#"{"files":[{"id":"1","name":"notes.txt","mimeType":"text/plain"}]}"#,
        )
        .unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].web_view_link, None);

        let empty: FileList = serde_json::from_str("{}").unwrap();
        assert!(empty.files.is_empty());
    }

    #[test]
    fn unauthorized_api_status_counts_as_auth_failure() {
        let err = Error::Api {
            operation: "files.list",
            status: 401,
            body: String::new(),
        };
        assert!(err.is_auth());

        let err = Error::Api {
            operation: "files.list",
            status: 500,
            body: "backend".into(),
        };
        assert!(!err.is_auth());
        assert_eq!(err.to_string(), "Drive API files.list returned 500: backend");
    }
}
