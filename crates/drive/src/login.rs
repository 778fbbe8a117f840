//! Interactive browser login with a loopback redirect.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::oauth::{OAuthConfig, Token};

/// How long to wait for the user to finish the consent page.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);

/// How long the redirect listener may take to wind down after the code arrives.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type CallbackOutcome = std::result::Result<String, String>;

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    sender: Arc<Mutex<Option<oneshot::Sender<CallbackOutcome>>>>,
}

/// Run the authorization code flow in the user's browser and exchange the
/// returned code for a token.
pub async fn authorize_interactively(oauth: &OAuthConfig) -> Result<Token> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| Error::Auth(format!("unable to start redirect listener: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| Error::Auth(format!("unable to start redirect listener: {e}")))?
        .port();
    let redirect_uri = format!("http://127.0.0.1:{port}");

    let state = Uuid::new_v4().to_string();
    let auth_url = oauth.auth_code_url(&redirect_uri, &state)?;

    let (code_tx, code_rx) = oneshot::channel();
    let app = Router::new()
        .route("/", get(receive_code))
        .with_state(CallbackState {
            expected_state: state.into(),
            sender: Arc::new(Mutex::new(Some(code_tx))),
        });

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    info!(url = %auth_url, "open this URL in a browser to authorize Google Drive access");
    open_browser(&auth_url);

    let outcome = tokio::time::timeout(LOGIN_TIMEOUT, code_rx).await;
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, server).await.is_err() {
        warn!("redirect listener did not shut down in time");
    }

    let code = match outcome {
        Err(_) => {
            return Err(Error::Auth(format!(
                "no authorization received within {}s",
                LOGIN_TIMEOUT.as_secs()
            )));
        }
        Ok(Err(_)) => return Err(Error::Auth("redirect listener stopped".to_string())),
        Ok(Ok(Err(reason))) => return Err(Error::Auth(reason)),
        Ok(Ok(Ok(code))) => code,
    };

    let token = oauth.exchange(&code, &redirect_uri).await?;
    info!("Google Drive authorization complete");
    Ok(token)
}

async fn receive_code(
    State(callback): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, &'static str) {
    let Some(outcome) = check_callback(&callback.expected_state, &params) else {
        return (StatusCode::BAD_REQUEST, "Missing authorization code.");
    };

    let reply = match outcome {
        Ok(_) => (
            StatusCode::OK,
            "Authorization successful. You can close this window.",
        ),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            "Authorization failed. You can close this window.",
        ),
    };
    if let Some(sender) = callback.sender.lock().await.take() {
        let _ = sender.send(outcome);
    }
    reply
}

/// Interpret redirect query parameters. Requests carrying neither `code` nor
/// `error` are not a redirect and yield `None`.
fn check_callback(
    expected_state: &str,
    params: &HashMap<String, String>,
) -> Option<CallbackOutcome> {
    if let Some(error) = params.get("error") {
        return Some(Err(format!("authorization denied: {error}")));
    }
    let code = params.get("code")?;
    if params.get("state").map(String::as_str) != Some(expected_state) {
        return Some(Err("state mismatch in authorization redirect".to_string()));
    }
    if code.is_empty() {
        return Some(Err("authorization redirect carried an empty code".to_string()));
    }
    Some(Ok(code.clone()))
}

/// Open a URL in the default browser. Failure is logged; the URL has already
/// been logged for manual use.
pub fn open_browser(url: &str) {
    let result;
    #[cfg(target_os = "macos")]
    {
        result = std::process::Command::new("open").arg(url).spawn();
    }
    #[cfg(target_os = "linux")]
    {
        result = std::process::Command::new("xdg-open").arg(url).spawn();
    }
    #[cfg(target_os = "windows")]
    {
        result = std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn();
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        result = Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unsupported platform",
        ));
    }

    if let Err(e) = result {
        warn!(error = %e, "could not open a browser; open the logged URL manually");
    }
}
