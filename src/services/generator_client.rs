//! HTTP client for the external OpenAPI SDK generator.
//!
//! - `GET  {server}/api/gen/clients`             → language list
//! - `POST {server}/api/gen/clients/{generator}` → `{code, link}`
//! - `GET  {download_url}`                       → archive bytes
//!
//! Every call fails fast with [`GeneratorError::Disabled`] when the feature
//! is switched off. Nothing is retried.

use crate::models::generator::{
    GenerateRequest, GenerateResponse, GeneratorLanguage, LanguageEntry,
};
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("OpenAPI generator is disabled")]
    Disabled,
    #[error("generator service returned status {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("generator request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected generator response: {0}")]
    Decode(String),
}

pub type GeneratorResult<T> = Result<T, GeneratorError>;

#[derive(Clone, Debug)]
pub struct GeneratorClient {
    client: Client,
    server: String,
    enabled: bool,
}

impl GeneratorClient {
    pub fn new(server: impl Into<String>, enabled: bool) -> GeneratorResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, server, enabled))
    }

    pub fn with_client(client: Client, server: impl Into<String>, enabled: bool) -> Self {
        Self {
            client,
            server: server.into().trim_end_matches('/').to_string(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_enabled(&self) -> GeneratorResult<()> {
        if self.enabled {
            Ok(())
        } else {
            Err(GeneratorError::Disabled)
        }
    }

    /// Fetch available generators, normalizing bare names and objects into
    /// one shape.
    pub async fn list_languages(&self) -> GeneratorResult<Vec<GeneratorLanguage>> {
        self.ensure_enabled()?;
        let url = format!("{}/api/gen/clients", self.server);
        debug!("fetching generator list from {}", url);

        let response = ensure_success(self.client.get(&url).send().await?).await?;
        let body = response.bytes().await?;
        let entries: Vec<LanguageEntry> = serde_json::from_slice(&body).map_err(|err| {
            GeneratorError::Decode(format!(
                "expected an array of names or generator objects: {}",
                err
            ))
        })?;
        Ok(entries.into_iter().map(GeneratorLanguage::from).collect())
    }

    /// Ask the generator to build an SDK from the document served at
    /// `openapi_url`.
    pub async fn generate_sdk(
        &self,
        generator: &str,
        openapi_url: &str,
        options: Option<HashMap<String, String>>,
    ) -> GeneratorResult<GenerateResponse> {
        self.ensure_enabled()?;
        let url = format!("{}/api/gen/clients/{}", self.server, generator);
        let request = GenerateRequest {
            openapi_url: openapi_url.to_string(),
            options,
        };
        debug!("requesting {} SDK for {}", generator, openapi_url);

        let response = ensure_success(self.client.post(&url).json(&request).send().await?).await?;
        response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| GeneratorError::Decode(err.to_string()))
    }

    /// Download a generated archive.
    pub async fn download_sdk(&self, download_url: &str) -> GeneratorResult<Bytes> {
        self.ensure_enabled()?;
        let response = ensure_success(self.client.get(download_url).send().await?).await?;
        Ok(response.bytes().await?)
    }
}

async fn ensure_success(response: Response) -> GeneratorResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(GeneratorError::Upstream { status, body })
}
