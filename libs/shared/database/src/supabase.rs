use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Typed store errors. Callers need to tell a lost uniqueness race (409)
/// apart from a missing row or a transient outage, so the HTTP status is
/// classified here rather than flattened into a message string.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl DbError {
    fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => DbError::Unauthorized(message),
            404 => DbError::NotFound(message),
            409 => DbError::Conflict(message),
            _ => DbError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            DbError::Unavailable(err.to_string())
        } else {
            DbError::Api {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.db_request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.anon_key) {
            headers.insert("apikey", key);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, bearer);
            }
        }

        headers
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None)
            .await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DbError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(method, path, auth_token, body, extra_headers)
            .await?;

        response
            .json::<T>()
            .await
            .map_err(|e| DbError::Decode(e.to_string()))
    }

    /// Variant for queries that need a total row count alongside the page
    /// of results. Sends `Prefer: count=exact` and reads the total from the
    /// Content-Range header (`items 0-9/25`).
    pub async fn request_with_count<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(Vec<T>, u64), DbError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .send(method, path, auth_token, None, Some(headers))
            .await?;

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let items = response
            .json::<Vec<T>>()
            .await
            .map_err(|e| DbError::Decode(e.to_string()))?;

        Ok((items, total))
    }

    /// Fire a request and discard the body. Used for DELETE, where
    /// PostgREST answers 204 with no content.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(), DbError> {
        self.send(method, path, auth_token, None, None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, DbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await.map_err(DbError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(DbError::from_status(status, error_text));
        }

        Ok(response)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
