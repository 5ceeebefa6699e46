//! Composes a complete [`ServerConfig`] from normalized pieces.
//!
//! Assembly works on a local value and only hands back a finished config, so
//! a failure never leaves a half-built configuration behind.

use std::collections::{BTreeMap, HashSet};

use crate::conversion::base_url::normalize_base_url;
use crate::conversion::extractor::{RawOperation, to_route_path};
use crate::conversion::schema_mapper::{map_parameters, map_request_body, map_response_mapping};
use crate::conversion::tool_names::{ToolNameInput, resolve_tool_name};
use crate::core::utils::to_env_prefix;
use crate::core::{Error, Result};
use crate::domain::policies::{DEFAULT_CACHE_TTL_SECS, DEFAULT_RATE_WINDOW_MS};
use crate::domain::{
    Authentication, CachingPolicy, CatalogRateLimit, Endpoint, HttpMethod, MetricsFormat,
    MonitoringPolicy, Parameter, RateLimitPolicy, RequestBodyDescriptor, ResponseMapping,
    RetryPolicy, ServerConfig, WebSocketOptions,
};

const HOUR_MS: u64 = 3_600_000;
const DAY_MS: u64 = 86_400_000;
const MINUTE_MS: u64 = 60_000;

/// An endpoint before naming, ids and policies are attached
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDraft {
    pub method: HttpMethod,
    /// `{param}` or `:param` syntax; rewritten to `:param` on assembly
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBodyDescriptor>,
    pub response_mapping: ResponseMapping,
}

impl EndpointDraft {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            operation_id: None,
            summary: None,
            description: String::new(),
            parameters: Vec::new(),
            request_body: None,
            response_mapping: ResponseMapping::default(),
        }
    }

    pub fn named(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Map an extracted OpenAPI operation
    pub fn from_operation(operation: &RawOperation) -> Self {
        Self {
            method: operation.method,
            path: operation.path.clone(),
            operation_id: operation.operation_id.clone(),
            summary: operation.summary.clone(),
            description: operation
                .summary
                .clone()
                .or_else(|| operation.description.clone())
                .unwrap_or_default(),
            parameters: map_parameters(operation),
            request_body: map_request_body(operation),
            response_mapping: map_response_mapping(operation.responses.as_ref()),
        }
    }
}

/// Everything the assembler needs, already normalized
#[derive(Debug, Clone, Default)]
pub struct AssemblyInput {
    pub name: String,
    pub description: String,
    pub version: String,
    pub base_url: String,
    /// Source of the environment variable prefix; falls back to `name`
    pub provider: Option<String>,
    pub drafts: Vec<EndpointDraft>,
    pub authentication: Authentication,
    pub headers: BTreeMap<String, String>,
    pub rate_limit: Option<CatalogRateLimit>,
    /// Emit a `/metrics` endpoint in this format
    pub metrics: Option<MetricsFormat>,
}

/// Builds server configurations with the pipeline defaults
#[derive(Debug, Clone)]
pub struct ConfigAssembler {
    retries: RetryPolicy,
    cache_ttl_secs: u64,
}

impl Default for ConfigAssembler {
    fn default() -> Self {
        Self {
            retries: RetryPolicy::default(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ConfigAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assemble(&self, input: AssemblyInput) -> Result<ServerConfig> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::conversion("API name is empty"));
        }
        let base_url = normalize_base_url(&input.base_url)?;

        let rate_limit = input
            .rate_limit
            .as_ref()
            .map(|limit| RateLimitPolicy::new(limit.requests, rate_limit_window_ms(limit.period.as_deref())));

        let mut endpoints: Vec<Endpoint> = input
            .drafts
            .iter()
            .map(|draft| self.build_endpoint(draft, name, rate_limit.as_ref()))
            .collect();
        dedupe_tool_names(&mut endpoints);

        let env_prefix = env_prefix(input.provider.as_deref(), name);

        let mut config = ServerConfig::new(name, base_url);
        config.description = input.description.trim().to_string();
        config.version = input.version.trim().to_string();
        config.headers = input.headers;
        config.caching = endpoints
            .iter()
            .any(Endpoint::caching_enabled)
            .then(|| CachingPolicy::enabled(self.cache_ttl_secs));
        config.rate_limit = rate_limit;
        config.monitoring = Some(MonitoringPolicy::new(input.metrics));
        config.retries = self.retries.count;
        config.environment_variables = env_var_names(&env_prefix, &input.authentication);
        config.env_prefix = env_prefix;
        config.authentication = input.authentication;
        config.endpoints = endpoints;

        tracing::info!(
            name = %config.name,
            base_url = %config.base_url,
            endpoints = config.endpoints.len(),
            auth = %config.authentication,
            "assembled server configuration"
        );
        Ok(config)
    }

    fn build_endpoint(
        &self,
        draft: &EndpointDraft,
        api_name: &str,
        rate_limit: Option<&RateLimitPolicy>,
    ) -> Endpoint {
        let tool_name = resolve_tool_name(&ToolNameInput {
            method: draft.method,
            path: &draft.path,
            operation_id: draft.operation_id.as_deref(),
            summary: draft.summary.as_deref(),
            description: Some(draft.description.as_str()),
            api_name,
        });

        let caching = match draft.method {
            HttpMethod::Get => CachingPolicy::enabled(self.cache_ttl_secs),
            _ => CachingPolicy::disabled(),
        };

        let path = to_route_path(&draft.path);
        let description = match draft.description.trim() {
            "" => format!("{} {}", draft.method, path),
            text => text.to_string(),
        };

        Endpoint {
            id: uuid::Uuid::new_v4().to_string(),
            path,
            method: draft.method,
            tool_name,
            description,
            parameters: draft.parameters.clone(),
            request_body: draft.request_body.clone(),
            response_mapping: Some(draft.response_mapping.clone()),
            caching: Some(caching),
            rate_limit: rate_limit.map(RateLimitPolicy::per_endpoint_share),
            retries: self.retries.clone(),
            websocket: (draft.method == HttpMethod::WebSocket).then(WebSocketOptions::default),
            enabled: true,
        }
    }
}

/// Give every colliding tool name after the first an index suffix.
///
/// The suffix is the endpoint's position in the list, so the result only
/// depends on the endpoint order.
pub fn dedupe_tool_names(endpoints: &mut [Endpoint]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(endpoints.len());
    for (index, endpoint) in endpoints.iter_mut().enumerate() {
        if taken.insert(endpoint.tool_name.clone()) {
            continue;
        }
        let mut candidate = format!("{}_{index}", endpoint.tool_name);
        let mut bump = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}_{index}_{bump}", endpoint.tool_name);
            bump += 1;
        }
        tracing::warn!(original = %endpoint.tool_name, renamed = %candidate, "tool name collision");
        taken.insert(candidate.clone());
        endpoint.tool_name = candidate;
    }
}

/// Window length for a human period string such as "per hour" or "1 day"
///
/// # Examples
/// ```
/// use mcpforge::conversion::assembler::rate_limit_window_ms;
///
/// assert_eq!(rate_limit_window_ms(Some("per hour")), 3_600_000);
/// assert_eq!(rate_limit_window_ms(None), 60_000);
/// ```
pub fn rate_limit_window_ms(period: Option<&str>) -> u64 {
    let Some(period) = period.map(str::to_lowercase) else {
        return DEFAULT_RATE_WINDOW_MS;
    };
    if period.contains("hour") {
        HOUR_MS
    } else if period.contains("day") {
        DAY_MS
    } else if period.contains("minute") {
        MINUTE_MS
    } else {
        DEFAULT_RATE_WINDOW_MS
    }
}

fn env_prefix(provider: Option<&str>, name: &str) -> String {
    let prefix = provider
        .map(to_env_prefix)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| to_env_prefix(name));
    if prefix.is_empty() { "API".to_string() } else { prefix }
}

/// Credential suffixes carried by an authentication variant
pub fn credential_suffixes(auth: &Authentication) -> &'static [&'static str] {
    match auth {
        Authentication::None | Authentication::Custom { .. } => &[],
        Authentication::ApiKey { .. } => &["API_KEY"],
        Authentication::Bearer { .. } => &["BEARER_TOKEN"],
        Authentication::Basic { .. } | Authentication::Digest { .. } => &["USERNAME", "PASSWORD"],
        Authentication::OAuth2 { .. } => &["CLIENT_ID", "CLIENT_SECRET", "ACCESS_TOKEN"],
        Authentication::AwsSignature { .. } => &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"],
        Authentication::MutualTls { .. } => &[
            "CLIENT_CERT",
            "CLIENT_KEY",
            "CA_CERT",
            "SERVER_CERT",
            "SERVER_KEY",
            "CLIENT_CA_CERT",
        ],
    }
}

pub fn env_var_name(prefix: &str, suffix: &str) -> String {
    format!("{prefix}_{suffix}")
}

/// Derived variable names mapped to empty placeholders, `{PREFIX}_BASE_URL` included
///
/// # Examples
/// ```
/// use mcpforge::conversion::assembler::env_var_names;
/// use mcpforge::domain::Authentication;
///
/// let names = env_var_names("WEATHER", &Authentication::api_key_header("X-API-Key"));
/// assert!(names.contains_key("WEATHER_API_KEY"));
/// assert!(names.contains_key("WEATHER_BASE_URL"));
/// ```
pub fn env_var_names(prefix: &str, auth: &Authentication) -> BTreeMap<String, String> {
    credential_suffixes(auth)
        .iter()
        .chain(std::iter::once(&"BASE_URL"))
        .map(|suffix| (env_var_name(prefix, suffix), String::new()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParamType, ParameterLocation};
    use tracing_test::traced_test;

    fn input(drafts: Vec<EndpointDraft>) -> AssemblyInput {
        AssemblyInput {
            name: "Weather API".to_string(),
            base_url: "api.example.com/".to_string(),
            drafts,
            ..AssemblyInput::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ConfigAssembler::new()
            .assemble(input(vec![
                EndpointDraft::new(HttpMethod::Get, "/weather/{city}"),
                EndpointDraft::new(HttpMethod::Post, "/reports"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.retries, 3);
        assert!(config.cors.enabled);
        assert_eq!(config.endpoints[0].path, "/weather/:city");
        assert!(config.endpoints[0].caching_enabled());
        assert!(!config.endpoints[1].caching_enabled());
        assert_eq!(config.caching, Some(CachingPolicy::enabled(300)));
        let monitoring = config.monitoring.as_ref().unwrap();
        assert_eq!(monitoring.health_check_path, "/health");
        assert_eq!(monitoring.health_check_interval_ms, 300_000);
        assert!(!config.metrics_enabled());
        assert!(config.rate_limit.is_none());
        assert!(config.endpoints.iter().all(|e| e.enabled));
    }

    #[test]
    fn test_no_get_endpoints_means_no_global_cache() {
        let config = ConfigAssembler::new()
            .assemble(input(vec![EndpointDraft::new(HttpMethod::Delete, "/x")]))
            .unwrap();
        assert!(config.caching.is_none());
    }

    #[test]
    fn test_rate_limit_share() {
        let mut i = input(vec![EndpointDraft::new(HttpMethod::Get, "/a")]);
        i.rate_limit = Some(CatalogRateLimit {
            requests: 1000,
            period: Some("per day".to_string()),
        });
        let config = ConfigAssembler::new().assemble(i).unwrap();
        let global = config.rate_limit.as_ref().unwrap();
        assert_eq!(global.window_ms, 86_400_000);
        let endpoint = config.endpoints[0].rate_limit.as_ref().unwrap();
        assert_eq!(endpoint.requests, 100);
        assert_eq!(endpoint.window_ms, 86_400_000);
    }

    #[test]
    fn test_rate_limit_windows() {
        assert_eq!(rate_limit_window_ms(Some("Hourly")), 3_600_000);
        assert_eq!(rate_limit_window_ms(Some("per day")), 86_400_000);
        assert_eq!(rate_limit_window_ms(Some("minute")), 60_000);
        assert_eq!(rate_limit_window_ms(Some("fortnight")), 60_000);
        assert_eq!(rate_limit_window_ms(None), 60_000);
    }

    #[test]
    #[traced_test]
    fn test_tool_name_collisions_get_index_suffix() {
        let drafts = vec![
            EndpointDraft::new(HttpMethod::Get, "/v1/users").named("listUsers"),
            EndpointDraft::new(HttpMethod::Get, "/v2/users").named("listUsers"),
            EndpointDraft::new(HttpMethod::Get, "/v3/users").named("listUsers"),
        ];
        let config = ConfigAssembler::new().assemble(input(drafts)).unwrap();
        let names: Vec<&str> = config.endpoints.iter().map(|e| e.tool_name.as_str()).collect();
        assert_eq!(names, vec!["listUsers", "listUsers_1", "listUsers_2"]);
        assert!(logs_contain("WARN"));
        assert!(logs_contain("tool name collision"));
        assert!(logs_contain("renamed=listUsers_2"));
    }

    #[test]
    fn test_dedupe_avoids_existing_suffix() {
        let drafts = vec![
            EndpointDraft::new(HttpMethod::Get, "/a").named("getA"),
            EndpointDraft::new(HttpMethod::Get, "/b").named("getA_2"),
            EndpointDraft::new(HttpMethod::Get, "/c").named("getA"),
            EndpointDraft::new(HttpMethod::Get, "/d").named("getA"),
        ];
        let config = ConfigAssembler::new().assemble(input(drafts)).unwrap();
        let names: HashSet<&str> = config.endpoints.iter().map(|e| e.tool_name.as_str()).collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_env_vars_per_variant() {
        let basic = env_var_names(
            "GITHUB",
            &Authentication::Basic {
                username: None,
                password: None,
            },
        );
        assert_eq!(
            basic.keys().collect::<Vec<_>>(),
            vec!["GITHUB_BASE_URL", "GITHUB_PASSWORD", "GITHUB_USERNAME"]
        );
        assert!(basic.values().all(String::is_empty));

        let oauth = env_var_names("X", &Authentication::empty("oauth2").unwrap());
        assert!(oauth.contains_key("X_CLIENT_ID"));
        assert!(oauth.contains_key("X_CLIENT_SECRET"));

        let none = env_var_names("X", &Authentication::None);
        assert_eq!(none.len(), 1);

        let mtls = env_var_names("X", &Authentication::empty("mutual-tls").unwrap());
        assert!(mtls.contains_key("X_SERVER_CERT"));
        assert!(mtls.contains_key("X_SERVER_KEY"));
        assert!(mtls.contains_key("X_CLIENT_CA_CERT"));
    }

    #[test]
    fn test_env_prefix_prefers_provider() {
        let mut i = input(vec![]);
        i.provider = Some("open-weather".to_string());
        i.authentication = Authentication::Bearer { token: None };
        let config = ConfigAssembler::new().assemble(i).unwrap();
        assert_eq!(config.env_prefix, "OPEN_WEATHER");
        assert!(config.environment_variables.contains_key("OPEN_WEATHER_BEARER_TOKEN"));

        let config = ConfigAssembler::new().assemble(input(vec![])).unwrap();
        assert_eq!(config.env_prefix, "WEATHER_API");
    }

    #[test]
    fn test_failures_are_conversion_errors() {
        let mut blank_name = input(vec![]);
        blank_name.name = "  ".to_string();
        assert!(matches!(ConfigAssembler::new().assemble(blank_name), Err(Error::Conversion(_))));

        let mut blank_url = input(vec![]);
        blank_url.base_url = String::new();
        assert!(matches!(ConfigAssembler::new().assemble(blank_url), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_draft_from_operation() {
        let op = RawOperation {
            path: "/pets/{petId}".to_string(),
            method: HttpMethod::Get,
            operation_id: Some("showPetById".to_string()),
            summary: Some("Info for a specific pet".to_string()),
            description: None,
            parameters: vec![serde_json::json!({"name": "petId", "in": "path", "schema": {"type": "string"}})],
            request_body: None,
            responses: Some(serde_json::json!({"200": {}})),
            consumes: Vec::new(),
            deprecated: false,
        };
        let draft = EndpointDraft::from_operation(&op);
        assert_eq!(draft.description, "Info for a specific pet");
        assert_eq!(draft.parameters.len(), 1);
        assert_eq!(draft.parameters[0].location, ParameterLocation::Path);
        assert_eq!(draft.parameters[0].param_type, ParamType::String);
    }

    #[test]
    fn test_websocket_endpoint_gets_options() {
        let config = ConfigAssembler::new()
            .assemble(input(vec![EndpointDraft::new(HttpMethod::WebSocket, "/stream")]))
            .unwrap();
        assert_eq!(config.endpoints[0].websocket, Some(WebSocketOptions::default()));
        assert!(!config.endpoints[0].caching_enabled());
    }
}
