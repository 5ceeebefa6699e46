//! OpenAPI and catalog conversion into a normalized [`ServerConfig`].
//!
//! Data flows one way: extractor -> schema mapper / tool names / auth mapper
//! -> assembler.

pub mod assembler;
pub mod auth_mapper;
pub mod base_url;
pub mod catalog_converter;
pub mod extractor;
pub mod schema_mapper;
pub mod synthetic;
pub mod tool_names;

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::core::Result;
use crate::domain::{Authentication, CatalogRateLimit, MetricsFormat, ServerConfig};

pub use assembler::{AssemblyInput, ConfigAssembler, EndpointDraft};
pub use catalog_converter::convert_catalog_entry;
pub use extractor::{OpenApiDocument, RawOperation, extract_endpoints};

const UNTITLED_API: &str = "Untitled API";

/// Caller-supplied knobs for a conversion
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// Used when the document carries no absolute server URL
    pub fallback_base_url: Option<String>,
    pub provider: Option<String>,
    /// Category used to pick synthetic endpoints when the document has none
    pub category: Option<String>,
    pub metrics: Option<MetricsFormat>,
    pub rate_limit: Option<CatalogRateLimit>,
    /// Replaces whatever the document's security schemes map to
    pub authentication: Option<Authentication>,
    pub headers: BTreeMap<String, String>,
}

/// Convert a parsed OpenAPI 3 / Swagger 2 document
pub fn convert_openapi(doc: &JsonValue, options: &ConversionOptions) -> Result<ServerConfig> {
    ConfigAssembler::new().assemble(document_input(doc, options)?)
}

/// Normalize a document into assembler input without assembling it
pub fn document_input(doc: &JsonValue, options: &ConversionOptions) -> Result<AssemblyInput> {
    let document = OpenApiDocument::new(doc);
    if document.is_swagger2() {
        tracing::debug!("converting Swagger 2 document");
    } else if doc.get("openapi").is_none() {
        tracing::warn!("document declares neither 'openapi' nor 'swagger', converting anyway");
    }

    let base_url = base_url::resolve_base_url(doc, options.fallback_base_url.as_deref())?;

    let operations = document.operations();
    tracing::info!(operations = operations.len(), "extracted operations");

    let drafts = if operations.is_empty() {
        let category = options
            .category
            .as_deref()
            .or_else(|| document.category())
            .unwrap_or_default();
        synthetic::synthetic_endpoints(category)
    } else {
        operations.iter().map(EndpointDraft::from_operation).collect()
    };

    let authentication = options
        .authentication
        .clone()
        .unwrap_or_else(|| auth_mapper::map_document_security(doc));

    Ok(AssemblyInput {
        name: document
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED_API)
            .to_string(),
        description: document.description().unwrap_or_default().to_string(),
        version: document.version().unwrap_or_default().to_string(),
        base_url,
        provider: options.provider.clone(),
        drafts,
        authentication,
        headers: options.headers.clone(),
        rate_limit: options.rate_limit.clone(),
        metrics: options.metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::domain::HttpMethod;
    use serde_json::json;

    #[test]
    fn test_petstore_swagger2() {
        let doc = json!({
            "swagger": "2.0",
            "info": {"title": "Swagger Petstore", "version": "1.0.0"},
            "host": "petstore.swagger.io",
            "basePath": "/v2",
            "securityDefinitions": {"api_key": {"type": "apiKey", "name": "api_key", "in": "header"}},
            "paths": {
                "/pet": {"post": {
                    "operationId": "addPet",
                    "parameters": [{"in": "body", "name": "body", "required": true, "schema": {"type": "object"}}],
                    "responses": {"405": {}}
                }},
                "/pet/{petId}": {"get": {
                    "operationId": "getPetById",
                    "parameters": [{"name": "petId", "in": "path", "required": true, "type": "integer"}],
                    "responses": {"200": {}}
                }}
            }
        });
        let config = convert_openapi(&doc, &ConversionOptions::default()).unwrap();
        assert_eq!(config.name, "Swagger Petstore");
        assert_eq!(config.base_url, "https://petstore.swagger.io/v2");
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].method, HttpMethod::Post);
        assert!(config.endpoints[0].request_body.is_some());
        assert!(config.endpoints[0].parameters.is_empty());
        assert_eq!(config.endpoints[1].path, "/pet/:petId");
        assert_eq!(config.authentication, Authentication::api_key_header("api_key"));
        assert!(config.environment_variables.contains_key("SWAGGER_PETSTORE_API_KEY"));
    }

    #[test]
    fn test_empty_paths_fall_back_to_synthetic() {
        let doc = json!({
            "openapi": "3.0.0",
            "info": {"title": "Quotes", "version": "1", "x-apisguru-categories": ["financial"]},
            "servers": [{"url": "https://quotes.example.com"}],
            "paths": {}
        });
        let config = convert_openapi(&doc, &ConversionOptions::default()).unwrap();
        let names: Vec<&str> = config.endpoints.iter().map(|e| e.tool_name.as_str()).collect();
        assert_eq!(names, vec!["getStockPrice", "getExchangeRates"]);
    }

    #[test]
    fn test_options_override() {
        let doc = json!({
            "openapi": "3.1.0",
            "servers": [{"url": "/v1"}],
            "paths": {"/ping": {"get": {}}}
        });
        let options = ConversionOptions {
            fallback_base_url: Some("https://status.example.com".to_string()),
            provider: Some("status".to_string()),
            metrics: Some(MetricsFormat::Prometheus),
            authentication: Some(Authentication::Bearer { token: None }),
            ..ConversionOptions::default()
        };
        let config = convert_openapi(&doc, &options).unwrap();
        assert_eq!(config.name, UNTITLED_API);
        assert_eq!(config.base_url, "https://status.example.com/v1");
        assert_eq!(config.endpoints[0].tool_name, "getPing");
        assert!(config.metrics_enabled());
        assert!(config.environment_variables.contains_key("STATUS_BEARER_TOKEN"));
    }

    #[test]
    fn test_unresolvable_base_url_fails_whole_conversion() {
        let doc = json!({"openapi": "3.0.0", "info": {"title": "X"}, "paths": {"/a": {"get": {}}}});
        let err = convert_openapi(&doc, &ConversionOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
        assert!(err.to_string().starts_with("could not convert"));
    }
}
