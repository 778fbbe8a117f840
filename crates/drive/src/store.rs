//! On-disk token persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::oauth::Token;

/// A token file at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. A missing file is `Ok(None)`.
    pub async fn load(&self) -> Result<Option<Token>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Write the token, creating parent directories. The file is readable by
    /// the owner only.
    pub async fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::TokenStore {
            path: self.path.clone(),
            source,
        }
    }
}
