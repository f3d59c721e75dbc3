//! HTTP plumbing shared by the service adapters

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Credentials;

/// Non-success HTTP response
#[derive(Debug, thiserror::Error)]
#[error("API error ({status}): {body}")]
pub struct ApiError {
    pub status: StatusCode,
    pub body: String,
}

/// How a request authenticates
#[derive(Debug, Clone)]
pub enum Auth {
    Bearer(String),
    Basic(Credentials),
}

/// HTTP client bound to one base URL
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("bodysync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` against the base URL; an empty path is the base itself
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        if path.is_empty() {
            return Ok(self.base_url.clone());
        }
        self.base_url.join(path).context("Invalid path")
    }

    /// Start a request with authentication applied
    pub fn request(&self, method: reqwest::Method, url: Url, auth: &Auth) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match auth {
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Basic(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
        }
    }

    /// GET `path` with query parameters and decode the JSON body
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<T> {
        let url = self.endpoint(path)?;

        let response = self
            .request(reqwest::Method::GET, url, auth)
            .query(query)
            .send()
            .await
            .context("Failed to send request")?;

        let response = ensure_success(response).await?;
        response.json().await.context("Failed to parse response")
    }
}

/// Turn a non-2xx response into an [`ApiError`]
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError { status, body }.into())
}
