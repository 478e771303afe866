/// Shared HTTP plumbing for the GoatSquad backend
///
/// Every adapter talks to the same backend: a GET with query parameters, an
/// optional bearer token, and a JSON body back. Timeouts, connection failures
/// and 5xx answers are retried per the configured [`RetryPolicy`]. Other
/// failures (4xx, undecodable bodies) are returned on the first attempt.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    services::retry::{retry, RetryPolicy},
};

#[derive(Clone)]
pub struct BackendClient {
    http_client: HttpClient,
    api_url: String,
    retry_policy: RetryPolicy,
}

impl BackendClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration, retry_policy: RetryPolicy) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            retry_policy,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.backend_url.clone(),
            config.http_timeout(),
            config.retry_policy(),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GETs `path` and decodes the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        bearer: Option<&str>,
    ) -> AppResult<T> {
        let url = &format!("{}{}", self.api_url, path);

        retry(self.retry_policy, move || async move {
            let mut request = self.http_client.get(url).query(query);
            if let Some(token) = bearer {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::BackendStatus {
                    status,
                    message: format!("{}: {}", path, body),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|e| {
                tracing::debug!(path, response = %body, "Undecodable backend response");
                AppError::ExternalApi(format!("Failed to parse response from {}: {}", path, e))
            })
        })
        .await
    }
}
