//! HTTP utilities for Scaleway REST API calls

use super::error::ApiError;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a body for logging and drop non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let count = body.chars().count();
    let truncated: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
    let truncated = if count > MAX_LOG_BODY_LENGTH {
        format!("{}... [truncated, {} bytes total]", truncated, body.len())
    } else {
        truncated
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// HTTP client bound to one endpoint and token
#[derive(Clone)]
pub struct ScalewayHttpClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl ScalewayHttpClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(concat!("scw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Transport {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Full URL of a resource path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("X-Auth-Token", &self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    /// GET a resource path and parse the JSON body
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET {} {:?}", url, query);

        let mut request = self.authorized(self.client.get(&url));
        if !query.is_empty() {
            request = request.query(query);
        }

        self.send(&url, request).await
    }

    /// POST a JSON body to a resource path
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value, ApiError> {
        let url = self.url(path);
        let payload = serde_json::to_vec(body).map_err(ApiError::Encode)?;
        tracing::debug!("POST {} payload={}", url, String::from_utf8_lossy(&payload));

        let request = self.authorized(self.client.post(&url)).body(payload);
        self.send(&url, request).await
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Value, ApiError> {
        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            // Only log sanitized/truncated error bodies
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::from_response(status.as_u16(), &body));
        }

        // Actions answer 202 with an empty or irrelevant body
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
