//! Google OAuth2 installed-app flow: client credentials, tokens, and the
//! token endpoint.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Read-only access to Drive file metadata and content.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_DELTA_SECS: i64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Client credentials
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth client identity from a Google Cloud client secret file.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

impl Credentials {
    /// Parse a client secret file with an `installed` or `web` section.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile =
            serde_json::from_str(json).map_err(|e| Error::ParseCredentials(e.to_string()))?;
        file.installed.or(file.web).ok_or_else(|| {
            Error::ParseCredentials("expected an \"installed\" or \"web\" section".to_string())
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| Error::ReadCredentials {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

/// An OAuth2 token as stored on disk.
///
/// Field names and the RFC 3339 `expiry` follow the layout written by Go's
/// `golang.org/x/oauth2`, so existing token files keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Token {
    /// The expiry instant, if the token has one. Go writes the zero time
    /// (`0001-01-01T00:00:00Z`) for tokens that never expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|expiry| expiry.timestamp() > 0)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty()
            && self
                .expires_at()
                .is_none_or(|expiry| expiry - Duration::seconds(EXPIRY_DELTA_SECS) > now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    /// Convert to a stored token. Refresh responses usually omit the refresh
    /// token, in which case `previous_refresh` is carried over.
    fn into_token(self, previous_refresh: Option<String>, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(previous_refresh),
            expiry: self
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Token endpoint
// ─────────────────────────────────────────────────────────────────────────────

/// Client credentials bound to a scope, able to run the code exchange and
/// refresh grants.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    credentials: Credentials,
    scope: String,
    client: Client,
}

impl OAuthConfig {
    pub fn new(credentials: Credentials, scope: impl Into<String>) -> Self {
        Self {
            credentials,
            scope: scope.into(),
            client: Client::new(),
        }
    }

    /// Consent page URL. Requests offline access and forces the consent
    /// prompt so Google always returns a refresh token.
    pub fn auth_code_url(&self, redirect_uri: &str, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.credentials.auth_uri,
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| Error::Auth(format!("invalid auth_uri: {e}")))?;
        Ok(url.into())
    }

    /// Trade an authorization code for a token.
    pub async fn exchange(&self, code: &str, redirect_uri: &str) -> Result<Token> {
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .await?;
        Ok(response.into_token(None, Utc::now()))
    }

    /// Obtain a fresh access token using the token's refresh token.
    pub async fn refresh(&self, token: &Token) -> Result<Token> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(Error::NoRefreshToken)?;

        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        debug!("access token refreshed");
        Ok(response.into_token(Some(refresh_token.to_string()), Utc::now()))
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut form = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(e) => match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                },
                Err(_) => body,
            };
            return Err(Error::Auth(format!("token endpoint returned {status}: {reason}")));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INSTALLED: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "project_id": "beacon",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn credentials_from_installed_and_web() {
        let creds = Credentials::from_json(INSTALLED).unwrap();
        assert_eq!(creds.client_id, "123.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "shh");

        let web = Credentials::from_json(r#"{"web":{"client_id":"w","client_secret":"s"}}"#).unwrap();
        assert_eq!(web.client_id, "w");
        assert_eq!(web.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn credentials_without_section_are_rejected() {
        let err = Credentials::from_json(r#"{"client_id":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::ParseCredentials(_)));
        assert!(err.is_auth());
    }

    #[test]
    fn go_token_file_round_trips() {
        let json = r#"{"access_token":"ya29.a0","token_type":"Bearer","refresh_token":"1//0g","expiry":"2025-04-28T18:30:46.787123-07:00"}"#;
        let token: Token = serde_json::from_str(json).unwrap();

        assert_eq!(token.refresh_token.as_deref(), Some("1//0g"));
        let expiry = token.expires_at().unwrap();
        assert_eq!(expiry.timestamp(), Utc.with_ymd_and_hms(2025, 4, 29, 1, 30, 46).unwrap().timestamp());

        let back: Token = serde_json::from_str(&serde_json::to_string(&token).unwrap()).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn zero_expiry_never_expires() {
        let json = r#"{"access_token":"abc","token_type":"Bearer","expiry":"0001-01-01T00:00:00Z"}"#;
        let token: Token = serde_json::from_str(json).unwrap();
        assert_eq!(token.expires_at(), None);
        assert!(token.is_valid());
    }

    #[test]
    fn validity_honours_expiry_delta() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let token = |secs: i64| Token {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: Some(now + Duration::seconds(secs)),
        };

        assert!(token(60).is_valid_at(now));
        assert!(!token(5).is_valid_at(now));
        assert!(!token(-60).is_valid_at(now));

        let blank = Token {
            access_token: String::new(),
            ..token(3600)
        };
        assert!(!blank.is_valid_at(now));
    }

    #[test]
    fn refresh_response_keeps_previous_refresh_token() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"new","token_type":"Bearer","expires_in":3599,"scope":"x"}"#,
        )
        .unwrap();

        let token = response.into_token(Some("old-refresh".into()), now);
        assert_eq!(token.access_token, "new");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expiry, Some(now + Duration::seconds(3599)));
    }

    #[test]
    fn auth_code_url_requests_offline_consent() {
        let oauth = OAuthConfig::new(Credentials::from_json(INSTALLED).unwrap(), DRIVE_READONLY_SCOPE);
        let url = oauth.auth_code_url("http://127.0.0.1:4242", "st4te").unwrap();
        let url = Url::parse(&url).unwrap();
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        assert_eq!(param("client_id").as_deref(), Some("123.apps.googleusercontent.com"));
        assert_eq!(param("redirect_uri").as_deref(), Some("http://127.0.0.1:4242"));
        assert_eq!(param("scope").as_deref(), Some(DRIVE_READONLY_SCOPE));
        assert_eq!(param("state").as_deref(), Some("st4te"));
        assert_eq!(param("access_type").as_deref(), Some("offline"));
        assert_eq!(param("prompt").as_deref(), Some("consent"));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_fast() {
        let oauth = OAuthConfig::new(Credentials::from_json(INSTALLED).unwrap(), DRIVE_READONLY_SCOPE);
        let token = Token {
            access_token: "stale".into(),
            token_type: "Bearer".into(),
            refresh_token: None,
            expiry: None,
        };
        assert!(matches!(oauth.refresh(&token).await, Err(Error::NoRefreshToken)));
    }
}
