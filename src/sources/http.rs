//! Shared HTTP plumbing for the source clients

use std::time::Instant;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::SourceKind;
use crate::config::CollectorConfig;
use crate::error::{CollectorError, SourceFailure};

/// Longest upstream body excerpt kept in an error message
const ERROR_BODY_LIMIT: usize = 200;

/// Build the one HTTP client shared by all sources of a run
pub fn build_client(config: &CollectorConfig) -> Result<Client, CollectorError> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.sources.user_agent.clone())
        .build()
        .map_err(|e| CollectorError::config(format!("Failed to create HTTP client: {e}")))
}

/// Send `request` and decode a JSON body.
///
/// Transport errors, timeouts and non-2xx statuses become
/// `SourceUnavailable`; a body that is not the expected JSON becomes
/// `SourceMalformed`.
pub async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    source: SourceKind,
) -> Result<T, SourceFailure> {
    let start_time = Instant::now();

    let response = request
        .send()
        .await
        .map_err(|e| transport_failure(source, &e))?;

    let status = response.status();
    debug!(%source, %status, "HTTP response received");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceFailure::unavailable(
            source,
            format!("HTTP {status}: {}", excerpt(&body)),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| transport_failure(source, &e))?;

    let elapsed = start_time.elapsed();
    if elapsed.as_secs() > 5 {
        warn!(%source, "Slow API response detected: {:.3}s", elapsed.as_secs_f64());
    }

    serde_json::from_str(&body).map_err(|e| {
        SourceFailure::malformed(source, format!("{e}; body starts: {}", excerpt(&body)))
    })
}

fn transport_failure(source: SourceKind, error: &reqwest::Error) -> SourceFailure {
    let message = if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    };
    SourceFailure::unavailable(source, message)
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
