//! Typed client for the Medusa Store API.
//!
//! Every call returns [`ApiResult`]: failures are values carrying a message and
//! the upstream HTTP status (absent for transport errors), never panics.

pub mod carts;
pub mod customers;
pub mod orders;
pub mod products;
pub mod types;

use std::fmt;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::config::Config;

pub use carts::CartCompletion;
pub use orders::OrderList;
pub use products::{ProductList, ProductQuery};
pub use types::*;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Uniform `{message, status}` error returned by every client call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// Build from a non-2xx response body; Medusa answers `{"type": .., "message": ..}`.
    fn from_body(status: StatusCode, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "Request failed with status {}",
                    status.as_u16()
                )
            });
        Self::new(message, Some(status.as_u16()))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            "Upstream request timed out".to_string()
        } else if e.is_connect() {
            "Could not connect to the store backend".to_string()
        } else if e.is_decode() {
            format!("Unexpected response from the store backend: {e}")
        } else {
            e.to_string()
        };
        ApiError::new(message, e.status().map(|s| s.as_u16()))
    }
}

#[derive(Clone)]
pub struct MedusaClient {
    http: reqwest::Client,
    base_url: String,
    publishable_key: String,
}

impl MedusaClient {
    pub fn new(base_url: &str, publishable_key: &str, timeout: Duration) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> ApiResult<Self> {
        Self::new(
            &config.medusa_url,
            &config.publishable_key,
            config.request_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`, bounded to five seconds regardless of the client timeout.
    pub async fn health(&self) -> ApiResult<()> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::from_body(status, &body))
        }
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("x-publishable-api-key", &self.publishable_key);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = ApiError::from_body(status, &body);
            log::debug!("Medusa call failed: {err}");
            return Err(err);
        }
        Ok(resp.json::<T>().await?)
    }

    /// For endpoints whose success body carries nothing we need.
    async fn send_empty(&self, req: RequestBuilder) -> ApiResult<()> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::from_body(status, &body))
        }
    }
}
