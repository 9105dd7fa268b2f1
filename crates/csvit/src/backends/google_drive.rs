// ai
//! 📡 Google Drive — a CSV, somewhere in someone's Drive, behind OAuth2.
//!
//! COLD OPEN — a shared folder named "final_FINAL_v3". Inside: one CSV.
//! The node has a file id, a bearer token, and a dream.
//!
//! 🧠 Knowledge graph:
//! - Credentials come pre-resolved from the host (`googleDriveOAuth2Api` bundle)
//! - Empty access token + refresh token present → one refresh at `token_url`, then download
//! - Download: `GET {api_base_url}/files/{id}?alt=media` with bearer auth
//! - Body → `bytes_stream()` → `StreamReader` → `ByteStream`. Nothing is buffered up front.
//! - 401/403 → `Auth`, 404 → `NotFound`. No retries. The host owns retry policy.

use std::io;

use anyhow::anyhow;
use futures::TryStreamExt;
use serde::Deserialize;
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::backends::ByteStream;
use crate::error::{AcquisitionFailure, NodeError};

const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// 🔑 The `googleDriveOAuth2Api` credential bundle.
///
/// `api_base_url` / `token_url` default to Google's real endpoints; override them
/// to point at a proxy or a mock server.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct GoogleDriveCredentials {
    #[serde(default, alias = "clientId")]
    pub client_id: String,
    #[serde(default, alias = "clientSecret")]
    pub client_secret: String,
    #[serde(default, alias = "redirectUri")]
    pub redirect_uri: String,
    #[serde(default, alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: String,
    #[serde(default = "default_api_base_url", alias = "apiBaseUrl")]
    pub api_base_url: String,
    #[serde(default = "default_token_url", alias = "tokenUrl")]
    pub token_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

impl Default for GoogleDriveCredentials {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            api_base_url: default_api_base_url(),
            token_url: default_token_url(),
        }
    }
}

// 🔒 secrets stay out of logs. ask the log aggregator how it feels about bearer tokens.
impl std::fmt::Debug for GoogleDriveCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveCredentials")
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("has_access_token", &!self.access_token.is_empty())
            .field("has_refresh_token", &!self.refresh_token.is_empty())
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// 📡 Which Drive file to stream, and who we are when we ask for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleDriveSourceConfig {
    pub file_id: String,
    pub credentials: GoogleDriveCredentials,
}

impl GoogleDriveSourceConfig {
    pub fn label(&self) -> String {
        format!("gdrive://{}", self.file_id)
    }

    fn media_url(&self) -> String {
        format!(
            "{}/files/{}?alt=media",
            self.credentials.api_base_url.trim_end_matches('/'),
            self.file_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn classify(err: &reqwest::Error) -> AcquisitionFailure {
    if err.is_connect() || err.is_timeout() {
        AcquisitionFailure::Network
    } else if let Some(status) = err.status() {
        AcquisitionFailure::from_http_status(status.as_u16())
    } else {
        AcquisitionFailure::Other
    }
}

/// 🔄 Trade the refresh token for a fresh access token. Once. No retry.
async fn refresh_access_token(
    http: &reqwest::Client,
    config: &GoogleDriveSourceConfig,
) -> Result<String, NodeError> {
    let label = config.label();
    let credentials = &config.credentials;
    debug!("🔄 access token missing for {label}, refreshing at {}", credentials.token_url);

    let form = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];
    let response = http
        .post(&credentials.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|err| {
            let kind = classify(&err);
            NodeError::acquisition(
                &label,
                kind,
                anyhow::Error::new(err).context("💀 the token endpoint never picked up"),
            )
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NodeError::acquisition(
            label,
            AcquisitionFailure::Auth,
            anyhow!("💀 token refresh rejected with {status}: {body}"),
        ));
    }

    let token: TokenResponse = response.json().await.map_err(|err| {
        NodeError::acquisition(
            &label,
            AcquisitionFailure::Auth,
            anyhow::Error::new(err).context("💀 token endpoint answered in a dialect we don't speak"),
        )
    })?;
    Ok(token.access_token)
}

/// 🚪 Open the Drive file's content as a byte stream.
pub(crate) async fn open(
    http: &reqwest::Client,
    config: &GoogleDriveSourceConfig,
) -> Result<ByteStream, NodeError> {
    let label = config.label();
    let credentials = &config.credentials;

    let access_token = if !credentials.access_token.is_empty() {
        credentials.access_token.clone()
    } else if !credentials.refresh_token.is_empty() {
        refresh_access_token(http, config).await?
    } else {
        return Err(NodeError::Configuration(
            "googleDriveOAuth2Api credentials carry neither an accessToken nor a refreshToken"
                .to_string(),
        ));
    };

    let response = http
        .get(config.media_url())
        .bearer_auth(&access_token)
        .send()
        .await
        .map_err(|err| {
            let kind = classify(&err);
            NodeError::acquisition(
                &label,
                kind,
                anyhow::Error::new(err).context(format!(
                    "💀 Drive download request for '{}' went nowhere",
                    config.file_id
                )),
            )
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NodeError::acquisition(
            label,
            AcquisitionFailure::from_http_status(status.as_u16()),
            anyhow!(
                "💀 Drive answered {status} for file '{}': {body}",
                config.file_id
            ),
        ));
    }

    debug!("📡 {label} answered {status}, streaming body");
    let body = Box::pin(response.bytes_stream().map_err(io::Error::other));
    Ok(Box::new(StreamReader::new(body)))
}
