//! Shared HTTP error mapping for explorer calls.

use chainpay_core::error::GatewayError;

/// Maps a transport-level reqwest failure to the gateway taxonomy.
pub(crate) fn classify_transport(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout(err.to_string())
    } else if err.is_decode() {
        GatewayError::MalformedResponse(err.to_string())
    } else {
        GatewayError::Http(err.to_string())
    }
}

/// Rejects non-2xx responses, distinguishing rate limiting.
pub(crate) fn require_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GatewayError::RateLimited(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(GatewayError::Http(format!("HTTP {status}")));
    }
    Ok(response)
}
