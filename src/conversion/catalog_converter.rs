//! Converts curated catalog entries, with or without an attached document

use crate::conversion::assembler::{AssemblyInput, ConfigAssembler, EndpointDraft};
use crate::conversion::auth_mapper::map_catalog_auth;
use crate::conversion::synthetic::synthetic_endpoints;
use crate::conversion::{ConversionOptions, OpenApiDocument, document_input};
use crate::core::Result;
use crate::domain::{
    CatalogEndpoint, CatalogParameter, HttpMethod, ParamType, Parameter, ParameterLocation,
    PublicApiSpec, ServerConfig,
};
use crate::ingest::EnrichedEntry;

/// Convert a catalog entry.
///
/// An attached document drives the conversion, with the entry's name and
/// auth hint layered on top. Without one (or when the document cannot be
/// converted) the entry's own endpoints are used, then synthetic defaults.
/// Declared endpoints also win over synthetic ones when the document lists
/// no operations.
pub fn convert_catalog_entry(
    enriched: &EnrichedEntry,
    options: &ConversionOptions,
) -> Result<ServerConfig> {
    let entry = &enriched.entry;

    if let Some(document) = &enriched.document {
        match document_input(document, &document_options(entry, options)) {
            Ok(mut input) => {
                if !entry.name.trim().is_empty() {
                    input.name = entry.name.clone();
                }
                if input.description.is_empty() {
                    input.description = entry.description.clone().unwrap_or_default();
                }
                if input.authentication.is_none() {
                    if let Some(auth) = &entry.authentication {
                        input.authentication = map_catalog_auth(auth);
                    }
                }
                let declared = declared_drafts(entry);
                if !declared.is_empty() && OpenApiDocument::new(document).operations().is_empty() {
                    tracing::info!(
                        entry = %entry.id,
                        endpoints = declared.len(),
                        "document has no operations, using declared endpoints"
                    );
                    input.drafts = declared;
                }
                return ConfigAssembler::new().assemble(input);
            }
            Err(e) => {
                tracing::warn!(
                    entry = %entry.id,
                    error = %e,
                    "attached document could not be converted, using catalog data"
                );
            }
        }
    }

    ConfigAssembler::new().assemble(catalog_input(entry, options))
}

fn document_options(entry: &PublicApiSpec, options: &ConversionOptions) -> ConversionOptions {
    let mut merged = options.clone();
    if !entry.base_url.trim().is_empty() {
        merged.fallback_base_url = Some(entry.base_url.clone());
    }
    merged.provider = options.provider.clone().or_else(|| non_empty(&entry.provider));
    merged.category = options.category.clone().or_else(|| non_empty(&entry.category));
    merged.rate_limit = options.rate_limit.clone().or_else(|| entry.rate_limit.clone());
    merged
}

fn declared_drafts(entry: &PublicApiSpec) -> Vec<EndpointDraft> {
    entry.endpoints.as_deref().map(catalog_drafts).unwrap_or_default()
}

fn catalog_input(entry: &PublicApiSpec, options: &ConversionOptions) -> AssemblyInput {
    let mut drafts = declared_drafts(entry);
    if drafts.is_empty() {
        drafts = synthetic_endpoints(&entry.category);
    }

    let base_url = non_empty(&entry.base_url)
        .or_else(|| options.fallback_base_url.clone())
        .unwrap_or_default();

    AssemblyInput {
        name: entry.name.clone(),
        description: entry.description.clone().unwrap_or_default(),
        version: entry.version.clone(),
        base_url,
        provider: options.provider.clone().or_else(|| non_empty(&entry.provider)),
        drafts,
        authentication: options.authentication.clone().unwrap_or_else(|| {
            entry
                .authentication
                .as_ref()
                .map(map_catalog_auth)
                .unwrap_or_default()
        }),
        headers: options.headers.clone(),
        rate_limit: options.rate_limit.clone().or_else(|| entry.rate_limit.clone()),
        metrics: options.metrics,
    }
}

/// Map declared catalog endpoints, skipping ones with an unusable method
pub fn catalog_drafts(endpoints: &[CatalogEndpoint]) -> Vec<EndpointDraft> {
    endpoints
        .iter()
        .filter_map(|endpoint| match endpoint.method.parse::<HttpMethod>() {
            Ok(method) => Some(catalog_draft(endpoint, method)),
            Err(e) => {
                tracing::warn!(path = %endpoint.path, error = %e, "skipping catalog endpoint");
                None
            }
        })
        .collect()
}

fn catalog_draft(endpoint: &CatalogEndpoint, method: HttpMethod) -> EndpointDraft {
    let draft = EndpointDraft::new(method, endpoint.path.clone()).described(endpoint.description.trim());
    endpoint
        .parameters
        .iter()
        .map(|param| catalog_parameter(param, &endpoint.path, method))
        .fold(draft, EndpointDraft::with_parameter)
}

fn catalog_parameter(param: &CatalogParameter, path: &str, method: HttpMethod) -> Parameter {
    let in_path = path.contains(&format!("{{{}}}", param.name))
        || path.split('/').any(|segment| segment.strip_prefix(':') == Some(param.name.as_str()));
    let location = if in_path {
        ParameterLocation::Path
    } else if matches!(method, HttpMethod::Get | HttpMethod::Delete) {
        ParameterLocation::Query
    } else {
        ParameterLocation::Body
    };

    let mut mapped = Parameter::new(
        param.name.clone(),
        ParamType::from_schema_type(param.param_type.as_deref()),
        location,
    )
    .required(param.required)
    .described(param.description.clone());
    if let Some(example) = &param.example {
        mapped = mapped.with_example(example.clone());
    }
    mapped
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Authentication, CatalogAuth, CatalogRateLimit};
    use serde_json::json;

    fn entry(category: &str) -> PublicApiSpec {
        serde_json::from_value(json!({
            "id": "example.com:v1",
            "name": "Example Markets",
            "baseUrl": "https://api.markets.example.com/",
            "version": "1.0",
            "category": category,
            "provider": "markets"
        }))
        .unwrap()
    }

    fn enriched(entry: PublicApiSpec, document: Option<serde_json::Value>) -> EnrichedEntry {
        EnrichedEntry { entry, document }
    }

    #[test]
    fn test_finance_entry_without_endpoints() {
        let config =
            convert_catalog_entry(&enriched(entry("finance"), None), &ConversionOptions::default())
                .unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].tool_name, "getStockPrice");
        assert_eq!(config.endpoints[1].tool_name, "getExchangeRates");
        assert!(config.endpoints.iter().all(|e| e.method == HttpMethod::Get));
        assert!(config.endpoints.iter().all(|e| e.caching_enabled()));
        assert_eq!(config.base_url, "https://api.markets.example.com");
        assert_eq!(config.env_prefix, "MARKETS");
    }

    #[test]
    fn test_declared_endpoints_are_used() {
        let mut e = entry("weather");
        e.endpoints = Some(vec![
            serde_json::from_value(json!({
                "path": "/cities/{city}/weather",
                "description": "Weather for a city",
                "parameters": [
                    {"name": "city", "type": "string", "required": false},
                    {"name": "units", "type": "string", "example": "metric"}
                ]
            }))
            .unwrap(),
            serde_json::from_value(json!({"path": "/reports", "method": "post", "parameters": [{"name": "text"}]}))
                .unwrap(),
            serde_json::from_value(json!({"path": "/x", "method": "OPTIONS"})).unwrap(),
        ]);
        e.rate_limit = Some(CatalogRateLimit {
            requests: 60,
            period: Some("hour".to_string()),
        });
        e.authentication = Some(CatalogAuth {
            kind: "apiKey".to_string(),
            header_name: None,
            param_name: Some("appid".to_string()),
            location: Some("query".to_string()),
        });

        let config = convert_catalog_entry(&enriched(e, None), &ConversionOptions::default()).unwrap();
        assert_eq!(config.endpoints.len(), 2);

        let weather = &config.endpoints[0];
        assert_eq!(weather.path, "/cities/:city/weather");
        assert_eq!(weather.tool_name, "weatherForACity");
        assert_eq!(weather.parameters[0].location, ParameterLocation::Path);
        assert!(weather.parameters[0].required);
        assert_eq!(weather.parameters[1].location, ParameterLocation::Query);

        assert_eq!(config.endpoints[1].parameters[0].location, ParameterLocation::Body);
        assert_eq!(config.rate_limit.as_ref().unwrap().window_ms, 3_600_000);
        assert_eq!(config.authentication, Authentication::api_key_query("appid"));
    }

    #[test]
    fn test_document_drives_conversion() {
        let document = json!({
            "openapi": "3.0.0",
            "info": {"title": "Markets OpenAPI", "version": "2.0", "description": "From the doc"},
            "servers": [{"url": "/v2"}],
            "paths": {"/quotes/{symbol}": {"get": {"operationId": "getQuote"}}}
        });
        let mut e = entry("finance");
        e.authentication = Some(CatalogAuth {
            kind: "bearer".to_string(),
            header_name: None,
            param_name: None,
            location: None,
        });
        let config =
            convert_catalog_entry(&enriched(e, Some(document)), &ConversionOptions::default()).unwrap();
        assert_eq!(config.name, "Example Markets");
        assert_eq!(config.description, "From the doc");
        assert_eq!(config.base_url, "https://api.markets.example.com/v2");
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].tool_name, "getQuote");
        assert_eq!(config.authentication.kind(), "bearer");
    }

    #[test]
    fn test_unconvertible_document_falls_back() {
        let document = json!({
            "openapi": "3.0.0",
            "servers": [{"url": "http://"}],
            "paths": {"/a": {"get": {}}}
        });
        let config =
            convert_catalog_entry(&enriched(entry("news"), Some(document)), &ConversionOptions::default())
                .unwrap();
        assert_eq!(config.base_url, "https://api.markets.example.com");
        let names: Vec<&str> = config.endpoints.iter().map(|e| e.tool_name.as_str()).collect();
        assert_eq!(names, vec!["getTopHeadlines", "searchArticles"]);
    }

    #[test]
    fn test_relative_server_joins_caller_fallback() {
        let mut e = entry("news");
        e.base_url = String::new();
        let options = ConversionOptions {
            fallback_base_url: Some("news.example.com".to_string()),
            ..ConversionOptions::default()
        };
        let document = json!({"openapi": "3.0.0", "servers": [{"url": "/api"}], "paths": {}});
        let config = convert_catalog_entry(&enriched(e, Some(document)), &options).unwrap();
        assert_eq!(config.base_url, "https://news.example.com/api");
    }

    #[test]
    fn test_no_base_url_anywhere_is_an_error() {
        let mut e = entry("news");
        e.base_url = String::new();
        let result = convert_catalog_entry(&enriched(e, None), &ConversionOptions::default());
        assert!(matches!(result, Err(crate::core::Error::Conversion(_))));
    }
}
