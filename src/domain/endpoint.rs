//! Endpoint descriptors: one per exposed tool.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::core::Error;
use crate::domain::policies::{
    CachingPolicy, DEFAULT_HEARTBEAT_INTERVAL_MS, RateLimitPolicy, RetryPolicy,
};

/// Method of an exposed tool. The two non-HTTP variants select the
/// WebSocket and GraphQL handler shapes in the generated server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    WebSocket,
    GraphQl,
}

/// Handler shape selected by an endpoint's method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Rest,
    WebSocket,
    GraphQl,
}

impl HttpMethod {
    /// The verbs recognized while walking OpenAPI `paths`
    pub const OPENAPI_VERBS: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::WebSocket => "WEBSOCKET",
            HttpMethod::GraphQl => "GRAPHQL",
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            HttpMethod::WebSocket => EndpointKind::WebSocket,
            HttpMethod::GraphQl => EndpointKind::GraphQl,
            _ => EndpointKind::Rest,
        }
    }

    /// Lowercase router method name used by the generated server
    pub fn route_fn(&self) -> &'static str {
        match self {
            HttpMethod::Get | HttpMethod::WebSocket => "get",
            HttpMethod::Post | HttpMethod::GraphQl => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "WEBSOCKET" | "WS" => Ok(HttpMethod::WebSocket),
            "GRAPHQL" => Ok(HttpMethod::GraphQl),
            other => Err(Error::conversion(format!("unsupported method '{other}'"))),
        }
    }
}

/// Semantic parameter type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Map a JSON-schema `type` keyword
    pub fn from_schema_type(schema_type: Option<&str>) -> Self {
        match schema_type {
            Some("integer") | Some("number") => ParamType::Number,
            Some("boolean") => ParamType::Boolean,
            Some("array") => ParamType::Array,
            Some("object") => ParamType::Object,
            _ => ParamType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// Where a parameter value is placed on the upstream request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    Header,
    Body,
}

/// Declared constraints checked by the generated server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Format tag such as `email`, `uri`, `date` or `uuid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<JsonValue>>,
}

impl ParameterValidation {
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
            && self.max.is_none()
            && self.pattern.is_none()
            && self.format.is_none()
            && self.enum_values.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "in", default)]
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ParameterValidation>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: ParamType, location: ParameterLocation) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: location == ParameterLocation::Path,
            description: String::new(),
            location,
            example: None,
            validation: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParameterLocation::Path;
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_example(mut self, example: JsonValue) -> Self {
        self.example = Some(example);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBodyDescriptor {
    pub content_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

/// How the generated server reads an upstream response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMapping {
    /// Dot path of the payload inside a successful response; whole body when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,
    pub status_codes: Vec<u16>,
}

impl Default for ResponseMapping {
    fn default() -> Self {
        Self {
            success_path: None,
            error_path: Some("error".to_string()),
            status_codes: vec![200],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketOptions {
    pub heartbeat_interval_ms: u64,
    /// Echo inbound messages back when no custom handler is supplied
    pub echo: bool,
}

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            echo: true,
        }
    }
}

/// One exposed API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub id: String,
    /// Route in `:param` placeholder syntax
    pub path: String,
    pub method: HttpMethod,
    pub tool_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mapping: Option<ResponseMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    #[serde(default)]
    pub retries: RetryPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<WebSocketOptions>,
    pub enabled: bool,
}

impl Endpoint {
    pub fn kind(&self) -> EndpointKind {
        self.method.kind()
    }

    pub fn caching_enabled(&self) -> bool {
        self.caching.as_ref().is_some_and(|c| c.enabled)
    }

    /// Names of the `:param` placeholders in the route, in order
    pub fn path_placeholders(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .filter(|name| !name.is_empty())
            .collect()
    }
}
