//! Backend API client
//!
//! A thin JSON wrapper over `reqwest`. The bearer token is bound into a
//! client value with [`ApiClient::with_token`], usually from the current
//! request's session, so no process-wide token state exists.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::ApiConfig;

/// Error returned for failed API calls
///
/// `status` is the HTTP status of the response, or 0 when no response was
/// received at all.
#[derive(Debug, Clone, thiserror::Error)]
#[error("API request failed with status {status}: {message}")]
pub struct ApiClientError {
    pub status: u16,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl ApiClientError {
    pub fn new(status: u16, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            status,
            message: message.into(),
            data,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, message, None)
    }

    pub fn is(&self, status: u16) -> bool {
        self.status == status
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_validation_error(&self) -> bool {
        self.status == 422
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_network_error(&self) -> bool {
        self.status == 0
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        if self.is_unauthorized() {
            "Please sign in to continue".to_string()
        } else if self.is_forbidden() {
            "You don't have permission to do this".to_string()
        } else if self.is_not_found() {
            "The requested resource was not found".to_string()
        } else if self.is_network_error() {
            "Unable to connect. Please check your internet connection".to_string()
        } else if self.is_server_error() {
            "Something went wrong. Please try again later".to_string()
        } else {
            self.message.clone()
        }
    }
}

/// Successful API response
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    /// Parsed body; `None` for bodiless or content-type-less responses
    pub data: Option<T>,
    pub status: u16,
}

/// JSON HTTP client bound to a base URL and optionally a bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiClientError::network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiClientError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_seconds))
    }

    /// Copy of this client that sends `token` as a bearer token
    ///
    /// The underlying connection pool is shared.
    pub fn with_token(&self, token: Option<&str>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: token.map(str::to_owned),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse<T>, ApiClientError> {
        self.request::<T, ()>(Method::GET, endpoint, params, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        self.request(Method::POST, endpoint, &[], body).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        self.request(Method::PUT, endpoint, &[], body).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        self.request(Method::PATCH, endpoint, &[], body).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        self.request::<T, ()>(Method::DELETE, endpoint, &[], None).await
    }

    async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiClientError> {
        let url = self.build_url(endpoint);
        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if !params.is_empty() {
            builder = builder.query(params);
        }
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%method, %url, "API request failed: {}", e);
            ApiClientError::network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let error = error_from_response(response).await;
            tracing::debug!(%method, %url, status = error.status, "API error response: {}", error.message);
            return Err(error);
        }

        let data = parse_body(status, response).await?;
        Ok(ApiResponse {
            data,
            status: status.as_u16(),
        })
    }
}

/// Parse a successful response body according to its content type
async fn parse_body<T: DeserializeOwned>(
    status: StatusCode,
    response: reqwest::Response,
) -> Result<Option<T>, ApiClientError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(content_type) = content_type else {
        return Ok(None);
    };

    let text = response
        .text()
        .await
        .map_err(|e| ApiClientError::network(e.to_string()))?;

    if content_type.contains("application/json") {
        if text.trim().is_empty() {
            return Ok(None);
        }
        return serde_json::from_str(&text).map(Some).map_err(|e| {
            ApiClientError::new(status.as_u16(), format!("Invalid JSON response: {}", e), None)
        });
    }

    serde_json::from_value(serde_json::Value::String(text))
        .map(Some)
        .map_err(|e| {
            ApiClientError::new(
                status.as_u16(),
                format!("Unexpected {} response: {}", content_type, e),
                None,
            )
        })
}

/// Build an error from a non-2xx response
///
/// The message is taken from the body's `message` or `error` field (including
/// the `{"error":{"message":..}}` envelope), falling back to the status text.
async fn error_from_response(response: reqwest::Response) -> ApiClientError {
    let status = response.status();
    let mut message = status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();
    let mut data = None;

    if let Ok(body) = response.text().await {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(found) = error_message(&parsed) {
                message = found;
            }
            data = Some(parsed);
        }
    }

    ApiClientError::new(status.as_u16(), message, data)
}

fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    match body.get("error") {
        Some(serde_json::Value::String(error)) => Some(error.clone()),
        Some(nested) => nested
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_owned),
        None => None,
    }
}
