//! Public API catalog entries, as supplied by the catalog collaborator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicApiSpec {
    /// Colon-delimited catalog identifier, e.g. `googleapis.com:youtube:v3`
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub authentication: Option<CatalogAuth>,
    #[serde(default)]
    pub rate_limit: Option<CatalogRateLimit>,
    #[serde(default)]
    pub endpoints: Option<Vec<CatalogEndpoint>>,
    /// Inline document, inline JSON text, or a URL pointing at one
    #[serde(default)]
    pub open_api_spec: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogAuth {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub header_name: Option<String>,
    #[serde(default)]
    pub param_name: Option<String>,
    #[serde(rename = "in", default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRateLimit {
    pub requests: u32,
    /// Human period such as "per hour" or "day"
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    pub path: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<CatalogParameter>,
}

fn default_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: Option<JsonValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_entry_deserializes() {
        let entry: PublicApiSpec = serde_json::from_value(json!({
            "id": "alphavantage.co:1.0",
            "name": "Alpha Vantage",
            "category": "finance"
        }))
        .unwrap();
        assert!(entry.endpoints.is_none());
        assert!(entry.open_api_spec.is_none());
        assert_eq!(entry.category, "finance");
    }

    #[test]
    fn test_catalog_endpoint_defaults_to_get() {
        let endpoint: CatalogEndpoint =
            serde_json::from_value(json!({"path": "/quotes"})).unwrap();
        assert_eq!(endpoint.method, "GET");
        assert!(endpoint.parameters.is_empty());
    }
}
