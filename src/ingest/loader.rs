//! OpenAPI document loaders: HTTP(S) URLs, local files and literal JSON text

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::core::settings::HttpSettings;
use crate::core::{Error, Result};

/// Loads a raw OpenAPI/Swagger document
#[async_trait]
pub trait SpecLoader: Send + Sync {
    async fn load(&self, source: &str) -> Result<JsonValue>;
}

/// Parse literal document text. Only JSON is accepted; the root must be an object.
pub fn parse_spec_text(text: &str) -> Result<JsonValue> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| Error::parse(format!("document is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::parse("document root must be a JSON object"));
    }
    Ok(value)
}

/// Where a document comes from, detected from the raw CLI/caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    Url(String),
    File(PathBuf),
    Text(String),
}

impl SpecSource {
    pub fn detect(input: &str) -> Self {
        let trimmed = input.trim_start();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            SpecSource::Url(trimmed.trim_end().to_string())
        } else if trimmed.starts_with('{') || trimmed.starts_with('[') {
            SpecSource::Text(input.to_string())
        } else {
            SpecSource::File(PathBuf::from(input))
        }
    }
}

/// Loads documents from HTTP(S) URLs with a bounded timeout
pub struct HttpSpecLoader {
    client: Client,
}

impl HttpSpecLoader {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| Error::fetch(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET the URL and parse the body as a JSON document
    pub async fn fetch(&self, url: &str) -> Result<JsonValue> {
        tracing::debug!(url, "fetching OpenAPI document");

        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::fetch(format!("timed out fetching {url}"))
                } else {
                    Error::fetch(format!("failed to fetch {url}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(format!("HTTP {status} when fetching {url}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("failed to read response body from {url}: {e}")))?;

        let document = parse_spec_text(&body)?;
        tracing::info!(url, bytes = body.len(), "fetched OpenAPI document");
        Ok(document)
    }
}

#[async_trait]
impl SpecLoader for HttpSpecLoader {
    async fn load(&self, source: &str) -> Result<JsonValue> {
        if !source.starts_with("http://") && !source.starts_with("https://") {
            return Err(Error::fetch(format!(
                "HttpSpecLoader only handles HTTP(S) URLs, got: {source}"
            )));
        }
        self.fetch(source).await
    }
}

/// Picks the right strategy for a URL, a file path or inline JSON text
pub struct CompositeSpecLoader {
    http: HttpSpecLoader,
}

impl CompositeSpecLoader {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        Ok(Self {
            http: HttpSpecLoader::new(settings)?,
        })
    }
}

#[async_trait]
impl SpecLoader for CompositeSpecLoader {
    async fn load(&self, source: &str) -> Result<JsonValue> {
        match SpecSource::detect(source) {
            SpecSource::Url(url) => self.http.fetch(&url).await,
            SpecSource::Text(text) => parse_spec_text(&text),
            SpecSource::File(path) => {
                tracing::debug!(path = %path.display(), "reading OpenAPI document from file");
                let text = tokio::fs::read_to_string(&path).await?;
                parse_spec_text(&text)
            }
        }
    }
}
