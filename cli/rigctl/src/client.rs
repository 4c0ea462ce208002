//! HTTP client for the device-hardware service.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::CliError;

/// API client for the device-hardware service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to parse response: {}", e)))
        } else {
            Err(problem(status.as_u16(), response).await)
        }
    }
}

/// Problem details body returned by the service on errors.
#[derive(Debug, Deserialize)]
struct ProblemResponse {
    code: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    request_id: Option<String>,
}

async fn problem(status: u16, response: reqwest::Response) -> CliError {
    let body: ProblemResponse = response.json().await.unwrap_or_else(|_| ProblemResponse {
        code: "unknown".to_string(),
        detail: "Unknown error".to_string(),
        request_id: None,
    });
    CliError::api(status, body.code, body.detail, body.request_id)
}
