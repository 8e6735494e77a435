//! Remote record client: one row per user in a `user_records` REST table.
//!
//! The snapshot travels as a serialized JSON string inside the row rather
//! than as structured columns, so the table schema never changes when the
//! local model does.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{parse_api_error, BearerCredential};
use crate::models::Snapshot;
use crate::util::{is_http_url, normalize_text_option};

/// Transient failures are retried this many times before giving up.
pub const RETRY_ATTEMPTS: u32 = 3;

const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(1);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Not authorized: {0}")]
    Auth(String),
    #[error("Remote API error: {message} ({status})")]
    Api { status: u16, message: String },
    #[error("Unusable remote payload: {0}")]
    Payload(String),
}

impl RemoteError {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(error) => error.is_timeout() || error.is_connect() || error.is_request(),
            Self::Api { status, .. } => *status >= 500,
            Self::InvalidConfiguration(_) | Self::Auth(_) | Self::Payload(_) => false,
        }
    }
}

/// Fetch/upsert seam between the scheduler and the actual REST backend.
pub trait RemoteStore: Send + Sync + 'static {
    /// The user's remote snapshot, or `None` when no record exists yet or
    /// the remote is unreachable. Auth failures are errors, never `None`.
    fn fetch(
        &self,
        credential: &BearerCredential,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Snapshot>, RemoteError>> + Send;

    /// Overwrite the user's remote record with `snapshot`.
    fn upsert(
        &self,
        credential: &BearerCredential,
        user_id: &str,
        snapshot: &Snapshot,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Row shape of the `user_records` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    user_id: String,
    /// Serialized [`Snapshot`] JSON.
    data: String,
    updated_at: DateTime<Utc>,
}

/// Supabase-style REST client for the per-user record.
#[derive(Clone)]
pub struct RemoteRecordClient {
    records_url: String,
    anon_key: String,
    client: Client,
    attempts: u32,
}

impl RemoteRecordClient {
    pub fn new(base_url: &str, anon_key: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_timeout(base_url, anon_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        anon_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let base = normalize_text_option(Some(base_url.to_string())).ok_or(
            RemoteError::InvalidConfiguration("Supabase URL must not be empty"),
        )?;
        if !is_http_url(&base) {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase URL must include http:// or https://",
            ));
        }
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            records_url: format!("{}/rest/v1/user_records", base.trim_end_matches('/')),
            anon_key,
            client: Client::builder().timeout(timeout).build()?,
            attempts: RETRY_ATTEMPTS,
        })
    }

    /// Override the per-request attempt count (at least one).
    #[must_use]
    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    async fn fetch_record(
        &self,
        credential: &BearerCredential,
        user_id: &str,
    ) -> Result<Option<UserRecord>, RemoteError> {
        self.with_retry("fetch", || self.try_fetch(credential, user_id))
            .await
    }

    async fn try_fetch(
        &self,
        credential: &BearerCredential,
        user_id: &str,
    ) -> Result<Option<UserRecord>, RemoteError> {
        let response = self
            .client
            .get(&self.records_url)
            .query(&[("user_id", format!("eq.{user_id}")), ("select", "*".to_string())])
            .header("apikey", &self.anon_key)
            .bearer_auth(credential.as_str())
            .send()
            .await?;

        let mut rows: Vec<UserRecord> = check_status(response).await?.json().await?;
        // PostgREST returns an array; user_id is unique so at most one row.
        let first = rows.drain(..).next();
        Ok(first)
    }

    async fn try_upsert(
        &self,
        credential: &BearerCredential,
        record: &UserRecord,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(&self.records_url)
            .query(&[("on_conflict", "user_id")])
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates")
            .bearer_auth(credential.as_str())
            .json(record)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, request: F) -> Result<T, RemoteError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 1;
        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_transient() && attempt < self.attempts => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        "Remote {operation} attempt {attempt}/{} failed, retrying in {delay:?}: {error}",
                        self.attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

impl RemoteStore for RemoteRecordClient {
    async fn fetch(
        &self,
        credential: &BearerCredential,
        user_id: &str,
    ) -> Result<Option<Snapshot>, RemoteError> {
        let record = match self.fetch_record(credential, user_id).await {
            Ok(record) => record,
            Err(error @ (RemoteError::Auth(_) | RemoteError::InvalidConfiguration(_))) => {
                return Err(error);
            }
            // Exhausted retries degrade to "no remote data"; the caller syncs
            // against local state only and tries again later.
            Err(error) => {
                tracing::warn!("Remote fetch gave up, continuing without remote data: {error}");
                return Ok(None);
            }
        };

        let Some(record) = record else {
            return Ok(None);
        };

        match serde_json::from_str::<Snapshot>(&record.data) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                tracing::warn!("Remote record payload is unreadable, ignoring it: {error}");
                Ok(None)
            }
        }
    }

    async fn upsert(
        &self,
        credential: &BearerCredential,
        user_id: &str,
        snapshot: &Snapshot,
    ) -> Result<(), RemoteError> {
        let record = UserRecord {
            user_id: user_id.to_string(),
            data: serde_json::to_string(snapshot)
                .map_err(|error| RemoteError::Payload(error.to_string()))?,
            updated_at: Utc::now(),
        };
        self.with_retry("upsert", || self.try_upsert(credential, &record))
            .await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_api_error(status, &body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RemoteError::Auth(message));
    }
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Linearly increasing delay before retry `attempt + 1`.
fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF_STEP * attempt
}
