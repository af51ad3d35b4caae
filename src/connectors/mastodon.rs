//! REST client for a Mastodon-compatible instance.
//!
//! Covers the two calls the welcome run needs:
//! - Admin API: list accounts (single page)
//! - Statuses API: post a direct-visibility status

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;

use super::auth::ApiCredentials;

const ADMIN_ACCOUNTS_PATH: &str = "/api/v1/admin/accounts";
const STATUSES_PATH: &str = "/api/v1/statuses";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },
}

/// Authenticated client for the instance REST API.
#[derive(Clone)]
pub struct MastodonClient {
    client: Client,
    credentials: ApiCredentials,
}

impl MastodonClient {
    /// Creates a client with the default request timeout.
    pub fn new(credentials: ApiCredentials) -> Result<Self, ApiError> {
        Self::with_timeout(credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(credentials: ApiCredentials, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Fetches one page of accounts from the admin API.
    pub async fn get_admin_accounts(&self) -> Result<Vec<AdminAccount>, ApiError> {
        let url = self.credentials.endpoint(ADMIN_ACCOUNTS_PATH);
        debug!("Fetching admin accounts from {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer())
            .send()
            .await?;
        let response = ensure_success(response).await?;

        response.json().await.map_err(|e| {
            ApiError::ParseError(format!("Failed to parse accounts response: {}", e))
        })
    }

    /// Posts a status. The response body is not inspected beyond the status code.
    pub async fn post_status(&self, request: &StatusRequest) -> Result<(), ApiError> {
        let url = self.credentials.endpoint(STATUSES_PATH);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.credentials.bearer())
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        if let Ok(posted) = response.json::<PostedStatus>().await {
            debug!("Status {} created", posted.id);
        }
        Ok(())
    }

    /// Returns the instance base URL.
    pub fn base_url(&self) -> &str {
        &self.credentials.base_url
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status, message })
}

// ============ Wire Types ============

/// Account entry from `GET /api/v1/admin/accounts`.
///
/// Only the fields the welcome run reads are kept. `created_at` stays a raw
/// string so a malformed value excludes one account instead of failing the
/// whole response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminAccount {
    pub id: String,
    pub username: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created_at: String,
    #[serde(default)]
    pub approved: Option<bool>,
}

impl AdminAccount {
    pub fn is_approved(&self) -> bool {
        self.approved == Some(true)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Direct,
}

/// Body of `POST /api/v1/statuses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRequest {
    pub status: String,
    pub visibility: Visibility,
}

impl StatusRequest {
    pub fn direct(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            visibility: Visibility::Direct,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostedStatus {
    id: String,
}

impl std::fmt::Debug for MastodonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonClient")
            .field("base_url", &self.credentials.base_url)
            .finish()
    }
}
