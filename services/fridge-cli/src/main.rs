//! Fridge API command-line client
//!
//! Thin shell over the authenticated pipeline:
//! 1. Loads config and the on-disk credential store
//! 2. Sends each command through `AuthPipeline`, which renews an expired
//!    session once and replays the request
//! 3. Prints status and body to stdout; logs go to stderr as JSON

mod cli;
mod config;
mod error;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use common::Secret;
use fridge_auth::FileCredentialStore;
use fridge_session::AuthPipeline;
use fridge_transport::{ApiRequest, ApiResponse, ReqwestTransport};
use reqwest::Method;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // stderr only: stdout carries command output.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    debug!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let store = FileCredentialStore::load(config.store.credentials_path.clone())
        .await
        .with_context(|| {
            format!(
                "failed to open credential store at {}",
                config.store.credentials_path.display()
            )
        })?;

    let client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let transport = ReqwestTransport::new(client, config.api.base_url.clone(), config.timeout());

    info!(
        base_url = %config.api.base_url,
        credentials = %config.store.credentials_path.display(),
        "configuration loaded"
    );

    let pipeline = AuthPipeline::new(Arc::new(transport), Arc::new(store))
        .with_no_auth_paths(config.no_auth_paths())
        .with_renewal_timeout(config.renewal_timeout());

    run(&pipeline, cli.command).await
}

async fn run(pipeline: &AuthPipeline, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let password = password_from_env()?;
            let user = pipeline
                .login(&email, password.expose())
                .await
                .context("login failed")?;
            match user {
                Some(user) => println!("signed in as {} <{}>", user.nickname, user.email),
                None => println!("signed in as {email}"),
            }
        }
        Command::Logout => {
            pipeline.logout().await.context("logout failed")?;
            println!("signed out");
        }
        Command::Whoami => {
            let user = pipeline
                .store()
                .user()
                .await
                .context("failed to read credential store")?;
            match user {
                Some(user) => println!("{} <{}> (id {})", user.nickname, user.email, user.id),
                None => anyhow::bail!("not signed in, run `fridge login <email>`"),
            }
        }
        Command::Get { path } => send(pipeline, ApiRequest::get(path)).await?,
        Command::Delete { path } => send(pipeline, ApiRequest::delete(path)).await?,
        Command::Post { path, body } => {
            send(pipeline, with_optional_body(Method::POST, path, body)).await?
        }
        Command::Patch { path, body } => {
            send(pipeline, with_optional_body(Method::PATCH, path, body)).await?
        }
    }
    Ok(())
}

/// Send through the pipeline and print status and body to stdout.
async fn send(pipeline: &AuthPipeline, request: ApiRequest) -> Result<()> {
    let response = pipeline.send(request).await.map_err(with_login_hint)?;
    println!("{}", response.status);
    let body = render_body(&response);
    if !body.is_empty() {
        println!("{body}");
    }
    if !response.status.is_success() {
        anyhow::bail!("server returned {}", response.status);
    }
    Ok(())
}

fn with_optional_body(method: Method, path: String, body: Option<serde_json::Value>) -> ApiRequest {
    let request = ApiRequest::new(method, path);
    match body {
        Some(body) => request.with_body(body),
        None => request,
    }
}

fn password_from_env() -> Result<Secret<String>> {
    std::env::var("FRIDGE_PASSWORD")
        .map(Secret::new)
        .map_err(|_| error::Error::MissingPassword.into())
}

fn with_login_hint(err: fridge_session::Error) -> anyhow::Error {
    if err.is_session_expired() {
        anyhow::Error::new(err).context("session expired, run `fridge login <email>` to sign in again")
    } else {
        anyhow::Error::new(err).context("request failed")
    }
}

/// Pretty-print JSON bodies, pass anything else through as text.
fn render_body(response: &ApiResponse) -> String {
    match serde_json::from_slice::<serde_json::Value>(&response.body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
        Err(_) => response.text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fridge_session::RenewalError;
    use reqwest::StatusCode;

    #[test]
    fn render_body_pretty_prints_json() {
        let response = ApiResponse::new(StatusCode::OK, r#"{"isSuccess":true,"result":[1]}"#);
        let rendered = render_body(&response);
        assert!(rendered.contains("\n"), "got: {rendered}");
        assert!(rendered.contains("\"isSuccess\": true"), "got: {rendered}");
    }

    #[test]
    fn render_body_passes_plain_text_through() {
        let response = ApiResponse::new(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(render_body(&response), "upstream down");

        let empty = ApiResponse::new(StatusCode::NO_CONTENT, "");
        assert_eq!(render_body(&empty), "");
    }

    #[test]
    fn body_is_attached_only_when_given() {
        let request = with_optional_body(Method::POST, "/api/recipes/3/like".into(), None);
        assert_eq!(request.method, Method::POST);
        assert!(request.body.is_none());

        let body = serde_json::json!({ "nickname": "chef" });
        let request = with_optional_body(Method::PATCH, "/api/users/me".into(), Some(body.clone()));
        assert_eq!(request.body, Some(body));
    }

    #[test]
    fn session_expiry_gets_login_hint() {
        let err = with_login_hint(RenewalError::MissingRefreshToken.into());
        assert!(err.to_string().contains("fridge login"), "got: {err}");
        assert!(format!("{err:#}").contains("no refresh token stored"));

        let err = with_login_hint(fridge_session::Error::Auth("bad".into()));
        assert_eq!(err.to_string(), "request failed");
    }
}
