//! Resolves public API catalog entries into OpenAPI documents.
//!
//! Catalog identifiers are colon-delimited (`domain:service:version` or
//! `domain:version`) and map onto the catalog host's directory layout.
//! Resolution is best effort: every failure is logged and the entry is
//! handed back without a document.

use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::core::Result;
use crate::domain::PublicApiSpec;
use crate::ingest::loader::{SpecLoader, parse_spec_text};

/// Build the document URL for a catalog identifier.
///
/// # Examples
/// ```
/// use mcpforge::ingest::catalog::catalog_spec_url;
///
/// assert_eq!(
///     catalog_spec_url("https://api.apis.guru/v2/specs", "googleapis.com:youtube:v3").as_deref(),
///     Some("https://api.apis.guru/v2/specs/googleapis.com/youtube/v3/openapi.json")
/// );
/// assert_eq!(catalog_spec_url("https://api.apis.guru/v2/specs", "plain-id"), None);
/// ```
pub fn catalog_spec_url(base: &str, id: &str) -> Option<String> {
    let parts: Vec<&str> = id.split(':').map(str::trim).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let base = base.trim_end_matches('/');
    match parts.as_slice() {
        [domain, service, version] => {
            Some(format!("{base}/{domain}/{service}/{version}/openapi.json"))
        }
        [domain, version] => Some(format!("{base}/{domain}/{version}/openapi.json")),
        _ => None,
    }
}

/// A catalog entry plus the document it resolved to, if any
#[derive(Debug, Clone)]
pub struct EnrichedEntry {
    pub entry: PublicApiSpec,
    pub document: Option<JsonValue>,
}

pub struct CatalogEnricher {
    loader: Arc<dyn SpecLoader>,
    spec_base_url: String,
}

impl CatalogEnricher {
    pub fn new(loader: Arc<dyn SpecLoader>, spec_base_url: impl Into<String>) -> Self {
        Self {
            loader,
            spec_base_url: spec_base_url.into(),
        }
    }

    /// Attach an OpenAPI document to the entry when one can be found.
    ///
    /// Never fails: enrichment problems fall back to the catalog data alone.
    pub async fn enrich(&self, entry: PublicApiSpec) -> EnrichedEntry {
        let document = match self.resolve(&entry).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    entry = %entry.id,
                    error = %e,
                    "OpenAPI enrichment failed, falling back to catalog data"
                );
                None
            }
        };
        EnrichedEntry { entry, document }
    }

    async fn resolve(&self, entry: &PublicApiSpec) -> Result<Option<JsonValue>> {
        match &entry.open_api_spec {
            Some(JsonValue::Object(_)) => Ok(entry.open_api_spec.clone()),
            Some(JsonValue::String(raw)) if is_url(raw) => {
                self.loader.load(raw.trim()).await.map(Some)
            }
            Some(JsonValue::String(raw)) if !raw.trim().is_empty() => {
                parse_spec_text(raw).map(Some)
            }
            _ => match catalog_spec_url(&self.spec_base_url, &entry.id) {
                Some(url) => {
                    tracing::debug!(entry = %entry.id, %url, "resolved catalog identifier");
                    self.loader.load(&url).await.map(Some)
                }
                None => {
                    tracing::debug!(entry = %entry.id, "no OpenAPI source for catalog entry");
                    Ok(None)
                }
            },
        }
    }
}

fn is_url(raw: &str) -> bool {
    let raw = raw.trim_start();
    raw.starts_with("http://") || raw.starts_with("https://")
}
