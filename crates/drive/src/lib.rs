//! Google Drive access for Beacon: OAuth2 login and token refresh, file
//! search, and text extraction.
//!
//! ```no_run
//! use std::sync::Arc;
//! use drive::{AuthConfig, Authorizer, DocumentStore, DriveClient, topic_query};
//!
//! # async fn example() -> drive::Result<()> {
//! let auth = Arc::new(Authorizer::new(AuthConfig {
//!     creds_file_path: "credentials.json".into(),
//!     token_path: "token.json".into(),
//!     interactive: true,
//! }));
//! let client = DriveClient::new(auth);
//! let files = client.list_files(&topic_query("roadmap"), 10).await?;
//! # Ok(())
//! # }
//! ```

mod authorizer;
mod client;
mod content;
mod error;
pub mod login;
pub mod oauth;
mod store;
mod types;

pub use authorizer::{AuthConfig, Authorizer};
pub use client::{DocumentStore, DriveClient};
pub use content::{extract_text, fetch_text};
pub use error::{Error, Result};
pub use oauth::{Credentials, DRIVE_READONLY_SCOPE, OAuthConfig, Token};
pub use store::TokenStore;
pub use types::{DriveFile, SupportedMime, topic_query};
