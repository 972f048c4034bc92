//! HTTP retry helper for transient provider errors.
//!
//! Provider fetchers call [`send_json`] instead of
//! `reqwest::RequestBuilder::send()` so every request gets exponential
//! backoff on connection failures, timeouts, HTTP 429 and HTTP 5xx.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::ObservationError;

/// Maximum number of retry attempts per request (2s, 4s, 8s, 16s backoff).
const MAX_RETRIES: u32 = 4;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends an HTTP request and parses the response body as JSON.
///
/// `build_request` is called once per attempt because request builders
/// are consumed by `.send()`. HTTP 4xx other than 429 is permanent and
/// not retried.
///
/// # Errors
///
/// Returns [`ObservationError`] if the request still fails after all
/// retries, the server returns a non-retryable status, or the body is not
/// valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, ObservationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_with_retry(&build_request, MAX_RETRIES).await?;
    let url = response.url().to_string();
    let status = response.status();
    let text = response.text().await?;

    parse_body(&text, &url, status)
}

/// Parses a response body, logging a preview of bodies that are not JSON
/// (HTML error pages from proxies, truncated transfers).
fn parse_body(
    text: &str,
    url: &str,
    status: reqwest::StatusCode,
) -> Result<serde_json::Value, ObservationError> {
    serde_json::from_str(text).map_err(|e| {
        log::error!(
            "JSON parse failed\n  url: {url}\n  status: {status}\n  body preview: {}",
            preview(text)
        );
        ObservationError::Json(e)
    })
}

/// Retry loop shared by every request. Returns the first 2xx/3xx
/// response.
#[allow(clippy::future_not_send)]
async fn send_with_retry<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, ObservationError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ObservationError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}");
                        attempt += 1;
                        continue;
                    }
                    return Err(ObservationError::Response {
                        message: format!("HTTP {status} after {max_retries} retries"),
                    });
                }

                if status.is_client_error() {
                    return Err(ObservationError::Response {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
