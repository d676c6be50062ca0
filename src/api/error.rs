//! API error taxonomy

use serde::Deserialize;
use thiserror::Error;

/// Failure of a call to the API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API could not be reached (DNS, TLS, connection reset, ...)
    #[error("failed to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected schema
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API answered with a non-2xx status
    #[error("{message}")]
    Remote {
        status: u16,
        message: String,
        kind: Option<String>,
    },

    /// The request body could not be encoded
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Error body returned by the API: `{"message": "...", "type": "..."}`
#[derive(Debug, Default, Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl ApiError {
    /// Build a [`ApiError::Remote`] from a status and raw body.
    /// The API's own message wins over a generic status line.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: RemoteErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("invalid return code, got {}", status));
        let kind = parsed.kind.filter(|k| !k.is_empty());

        tracing::debug!(
            status = status,
            kind = kind.as_deref().unwrap_or(""),
            "API error: {}",
            message
        );

        ApiError::Remote {
            status,
            message,
            kind,
        }
    }

    /// HTTP status for remote errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
