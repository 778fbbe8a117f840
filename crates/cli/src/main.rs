mod config;
mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use drive::{AuthConfig, Authorizer, DriveClient};
use mcp::Server;
use slack::SlackClient;
use tools::{DriveFilesTool, SlackMessagesTool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "beacon.toml";
const ANTHROPIC_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
const SLACK_TOKEN_VAR: &str = "SLACK_USER_TOKEN";

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "MCP server that answers from Slack and Google Drive", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./beacon.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Google OAuth client secret file
    #[arg(long, global = true)]
    creds_file_path: Option<PathBuf>,

    /// Google OAuth token file
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tools over stdio (default)
    Serve,
    /// Authorize Google Drive access in the browser and store the token
    Login,
    /// List the Slack channels visible to the token
    Channels,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries the protocol.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let auth = AuthConfig {
        creds_file_path: cli
            .creds_file_path
            .unwrap_or_else(|| config.drive.creds_file_path.clone()),
        token_path: cli
            .token_path
            .unwrap_or_else(|| config.drive.token_path.clone()),
        interactive: true,
    };

    match cli.command {
        Some(Commands::Serve) | None => cmd_serve(&config, auth).await,
        Some(Commands::Login) => cmd_login(auth).await,
        Some(Commands::Channels) => cmd_channels().await,
    }
}

async fn cmd_serve(config: &Config, auth: AuthConfig) -> Result<()> {
    let model = Arc::new(config.anthropic.backend(secret(ANTHROPIC_API_KEY_VAR)?));
    let slack = SlackClient::new(secret(SLACK_TOKEN_VAR)?);

    // The browser login may run here, before any host request is waiting.
    if let Err(e) = Authorizer::new(auth.clone()).access_token().await {
        warn!(error = %e, "Google Drive is not authorized; the Drive tool will report it");
    }
    let authorizer = Arc::new(Authorizer::new(tool_auth(auth)));

    let server = Server::new(&config.server.name, env!("CARGO_PKG_VERSION"))
        .with_tool_timeout(Duration::from_secs(config.server.tool_timeout_secs))
        .tool(SlackMessagesTool::new(
            slack,
            Arc::clone(&model),
            config.slack.tool_options(),
        ))?
        .tool(DriveFilesTool::new(
            DriveClient::new(authorizer),
            Arc::clone(&model),
            config.drive.tool_options(),
        ))?;

    info!(
        name = %config.server.name,
        backend = %model,
        tools = server.tools().len(),
        "serving on stdio"
    );
    server.serve_stdio().await?;
    info!("stdin closed, shutting down");
    Ok(())
}

/// Tool calls never open a browser; a missing token is reported to the host.
fn tool_auth(auth: AuthConfig) -> AuthConfig {
    AuthConfig {
        interactive: false,
        ..auth
    }
}

async fn cmd_login(auth: AuthConfig) -> Result<()> {
    let token_path = auth.token_path.clone();
    Authorizer::new(auth).login().await?;
    println!("Google Drive authorized. Token stored at {}", token_path.display());
    Ok(())
}

async fn cmd_channels() -> Result<()> {
    let slack = SlackClient::new(secret(SLACK_TOKEN_VAR)?);
    let channels = slack::list_channels(&slack).await?;

    println!("Total channels found on Slack: {}", channels.len());
    for channel in channels {
        let visibility = if channel.is_private { "private" } else { "public" };
        match channel.num_members {
            Some(members) => println!("  #{:<32} {visibility:<8} {members} members", channel.name),
            None => println!("  #{:<32} {visibility}", channel.name),
        }
    }
    Ok(())
}

/// An explicit `--config` must exist; the default file is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn secret(var: &'static str) -> Result<String> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(Error::MissingSecret { var })
}
