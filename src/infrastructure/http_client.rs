// Shared reqwest plumbing for the source adapters
use crate::application::source_adapter::FetchError;
use crate::domain::source::SourceKind;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Send once; non-success statuses become `FetchError::Status`.
pub async fn send(
    kind: SourceKind,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, FetchError> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!(source = kind.id(), error = %e, "request failed");
        FetchError::transport(kind, e)
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(source = kind.id(), status = status.as_u16(), "upstream returned error status");
        return Err(FetchError::status(kind, status));
    }

    Ok(response)
}

pub async fn json<T: DeserializeOwned>(
    kind: SourceKind,
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::transport(kind, e))?;

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(
            source = kind.id(),
            error = %e,
            body_preview = %body.chars().take(200).collect::<String>(),
            "failed to parse upstream response"
        );
        FetchError::transport(kind, format!("invalid response body: {e}"))
    })
}

pub fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
