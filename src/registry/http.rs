//! Shared HTTP response handling for registry clients.
//!
//! Centralizes status-code checks so each client only builds its request and
//! maps the response body.

use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::error::RegistryError;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Send a request, mapping transport failures to [`RegistryError::Network`].
pub async fn send(request: RequestBuilder, url: &str) -> Result<Response, RegistryError> {
    request
        .send()
        .await
        .map_err(|e| RegistryError::network(url, e))
}

/// GET `url` and decode a JSON body, applying [`check_response`].
pub async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    name: &str,
    version: &str,
) -> Result<T, RegistryError> {
    let resp = send(http.get(url).header("Accept", "application/json"), url).await?;
    let resp = check_response(resp, name, version).await?;
    read_json(resp, url).await
}

/// Check an HTTP response for common error conditions.
///
/// - **404 / 410** → [`RegistryError::NotFound`]
/// - **429**, or **403** with an exhausted quota → [`RegistryError::RateLimited`]
/// - any other non-success status → [`RegistryError::Api`]
pub async fn check_response(
    resp: Response,
    name: &str,
    version: &str,
) -> Result<Response, RegistryError> {
    let status = resp.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(RegistryError::not_found(name, version));
    }

    let remaining = header_u64(resp.headers(), "x-ratelimit-remaining");
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && remaining == Some(0))
    {
        return Err(RegistryError::RateLimited {
            retry_after_secs: parse_retry_after(resp.headers()),
            limit: header_u64(resp.headers(), "x-ratelimit-limit"),
            remaining,
        });
    }

    if !status.is_success() {
        return Err(RegistryError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Read the body and decode it, reporting decode failures as
/// [`RegistryError::Parse`].
pub async fn read_json<T: DeserializeOwned>(resp: Response, url: &str) -> Result<T, RegistryError> {
    let body = resp
        .text()
        .await
        .map_err(|e| RegistryError::network(url, e))?;
    serde_json::from_str(&body).map_err(|e| RegistryError::parse(url, e.to_string()))
}

/// Seconds to wait before retrying.
///
/// `Retry-After` (seconds) wins, then `X-RateLimit-Reset` (epoch seconds),
/// then a 60 s default.
fn parse_retry_after(headers: &HeaderMap) -> u64 {
    if let Some(secs) = header_u64(headers, reqwest::header::RETRY_AFTER.as_str()) {
        return secs;
    }
    if let Some(reset) = header_u64(headers, "x-ratelimit-reset") {
        let now = Utc::now().timestamp().max(0) as u64;
        return reset.saturating_sub(now);
    }
    DEFAULT_RETRY_AFTER_SECS
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}
