//! Lazily authorized, self-refreshing access tokens.

use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::login;
use crate::oauth::{Credentials, DRIVE_READONLY_SCOPE, OAuthConfig, Token};
use crate::store::TokenStore;

/// Where the OAuth client secret and the user's token live.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub creds_file_path: PathBuf,
    pub token_path: PathBuf,
    /// Run the browser login when no token is stored. When false a missing
    /// token is an error.
    pub interactive: bool,
}

struct Session {
    oauth: OAuthConfig,
    token: Token,
}

/// Hands out valid access tokens, refreshing and persisting them as needed.
pub struct Authorizer {
    config: AuthConfig,
    store: TokenStore,
    session: Mutex<Option<Session>>,
}

impl Authorizer {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            store: TokenStore::new(&config.token_path),
            config,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// A currently valid access token.
    ///
    /// The first call loads the client secret and stored token, running the
    /// browser login if there is none. An expired token is refreshed and the
    /// new one written back to the token file.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(self.start().await?);
        }
        let Some(session) = guard.as_mut() else {
            return Err(Error::Auth("authorization session unavailable".to_string()));
        };

        if !session.token.is_valid() {
            info!("refreshing Google access token");
            let result = session.oauth.refresh(&session.token).await;
            let refreshed = match result {
                Ok(token) => token,
                Err(e) => {
                    // Start over from disk next time; the file may be replaced by a login.
                    *guard = None;
                    return Err(e);
                }
            };
            self.store.save(&refreshed).await?;
            session.token = refreshed;
        }

        Ok(session.token.access_token.clone())
    }

    /// Run the browser login unconditionally and store the new token.
    pub async fn login(&self) -> Result<()> {
        let oauth = self.oauth_config().await?;
        let token = login::authorize_interactively(&oauth).await?;
        self.store.save(&token).await?;
        info!(path = %self.store.path().display(), "token saved");

        *self.session.lock().await = Some(Session { oauth, token });
        Ok(())
    }

    async fn oauth_config(&self) -> Result<OAuthConfig> {
        let credentials = Credentials::load(&self.config.creds_file_path).await?;
        Ok(OAuthConfig::new(credentials, DRIVE_READONLY_SCOPE))
    }

    async fn start(&self) -> Result<Session> {
        let oauth = self.oauth_config().await?;

        let stored = match self.store.load().await {
            Ok(token) => token,
            Err(e @ Error::TokenFormat(_)) => {
                warn!(path = %self.store.path().display(), error = %e, "ignoring unreadable token file");
                None
            }
            Err(e) => return Err(e),
        };

        let token = match stored {
            Some(token) => token,
            None if self.config.interactive => {
                let token = login::authorize_interactively(&oauth).await?;
                self.store.save(&token).await?;
                token
            }
            None => {
                return Err(Error::Auth(format!(
                    "no token at {}; run `beacon login`",
                    self.store.path().display()
                )));
            }
        };

        Ok(Session { oauth, token })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex as StdMutex};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::{Value, json};

    use super::*;

    const CLIENT_SECRET: &str = r#"{"installed":{"client_id":"id","client_secret":"secret"}}"#;

    fn authorizer(dir: &tempfile::TempDir, interactive: bool) -> Authorizer {
        let creds = dir.path().join("credentials.json");
        std::fs::write(&creds, CLIENT_SECRET).unwrap();
        Authorizer::new(AuthConfig {
            creds_file_path: creds,
            token_path: dir.path().join("token.json"),
            interactive,
        })
    }

    #[tokio::test]
    async fn valid_stored_token_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let auth = authorizer(&dir, false);
        TokenStore::new(dir.path().join("token.json"))
            .save(&Token {
                access_token: "ya29.stored".into(),
                token_type: "Bearer".into(),
                refresh_token: Some("1//r".into()),
                expiry: None,
            })
            .await
            .unwrap();

        assert_eq!(auth.access_token().await.unwrap(), "ya29.stored");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.stored");
    }

    #[tokio::test]
    async fn missing_token_without_login_is_an_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = authorizer(&dir, false).access_token().await.unwrap_err();
        assert!(err.is_auth());
        assert!(err.to_string().contains("beacon login"));
    }

    #[tokio::test]
    async fn missing_client_secret_is_an_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let auth = Authorizer::new(AuthConfig {
            creds_file_path: dir.path().join("absent.json"),
            token_path: dir.path().join("token.json"),
            interactive: false,
        });
        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, Error::ReadCredentials { .. }));
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let auth = authorizer(&dir, false);
        TokenStore::new(dir.path().join("token.json"))
            .save(&Token {
                access_token: "old".into(),
                token_type: "Bearer".into(),
                refresh_token: None,
                expiry: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
            })
            .await
            .unwrap();

        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
    }

    type Grants = Arc<StdMutex<Vec<HashMap<String, String>>>>;

    async fn issue_fresh_token(
        State(grants): State<Grants>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        let reply = if form.get("refresh_token").map(String::as_str) == Some("r") {
            (
                StatusCode::OK,
                Json(json!({"access_token": "fresh", "token_type": "Bearer", "expires_in": 3600})),
            )
        } else {
            (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid_grant"})))
        };
        grants.lock().unwrap().push(form);
        reply
    }

    /// An authorizer whose client secret points `token_uri` at a local
    /// token endpoint.
    async fn authorizer_with_token_endpoint(dir: &tempfile::TempDir) -> (Authorizer, Grants) {
        let grants = Grants::default();
        let app = Router::new()
            .route("/token", post(issue_fresh_token))
            .with_state(Arc::clone(&grants));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let creds = dir.path().join("credentials.json");
        let secret = json!({"installed": {
            "client_id": "id",
            "client_secret": "secret",
            "token_uri": format!("http://{addr}/token"),
        }});
        std::fs::write(&creds, secret.to_string()).unwrap();

        let auth = Authorizer::new(AuthConfig {
            creds_file_path: creds,
            token_path: dir.path().join("token.json"),
            interactive: false,
        });
        (auth, grants)
    }

    fn expired(refresh_token: &str) -> Token {
        Token {
            access_token: "stale".into(),
            token_type: "Bearer".into(),
            refresh_token: Some(refresh_token.into()),
            expiry: Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        }
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_saved() {
        let dir = tempfile::tempdir().unwrap();
        let (auth, grants) = authorizer_with_token_endpoint(&dir).await;
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&expired("r")).await.unwrap();

        assert_eq!(auth.access_token().await.unwrap(), "fresh");

        let saved = store.load().await.unwrap().unwrap();
        assert_eq!(saved.access_token, "fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("r"));
        assert!(saved.expiry.is_some_and(|at| at > chrono::Utc::now()));

        // The refreshed token is valid, so the endpoint is not asked again.
        assert_eq!(auth.access_token().await.unwrap(), "fresh");
        let grants = grants.lock().unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].get("grant_type").map(String::as_str), Some("refresh_token"));
        assert_eq!(grants[0].get("client_id").map(String::as_str), Some("id"));
    }

    #[tokio::test]
    async fn rejected_refresh_leaves_the_stored_token_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (auth, _grants) = authorizer_with_token_endpoint(&dir).await;
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&expired("revoked")).await.unwrap();

        let err = auth.access_token().await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
        assert_eq!(store.load().await.unwrap().unwrap().access_token, "stale");
    }
}
