//! Shared HTTP plumbing for the network providers.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{ReviewError, Result};

/// Bound on connection setup. An accepted request is awaited for as long as
/// the model takes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client used by every network provider.
pub(super) fn client() -> Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| ReviewError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Read a provider API key from the environment.
pub(super) fn api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ReviewError::Config(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

/// Send `body` as JSON and decode the JSON reply.
///
/// Transport failures, non-2xx statuses and undecodable replies all become
/// [`ReviewError::Model`], with the response body kept for non-2xx statuses.
pub(super) async fn post_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
    body: &Value,
) -> Result<T> {
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ReviewError::Model(describe_send_error(provider, &e)))?;

    let status = response.status();
    debug!(provider, %status, "Model API responded");
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ReviewError::Model(format!(
            "{} API error ({}): {}",
            provider, status, error_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ReviewError::Model(format!("Failed to parse {} response: {}", provider, e)))
}

fn describe_send_error(provider: &str, e: &reqwest::Error) -> String {
    if e.is_connect() {
        format!("Could not connect to {}: {}", provider, e)
    } else {
        format!("{} request failed: {}", provider, e)
    }
}

/// Return `text` unless it is empty.
pub(super) fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    text.filter(|t| !t.is_empty())
        .ok_or_else(|| ReviewError::Model(format!("No text in {} response", provider)))
}
