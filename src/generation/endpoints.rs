//! Template contexts for per-endpoint handlers

use serde::Serialize;

use crate::domain::{Backoff, Endpoint, HttpMethod, ParameterLocation, ResponseMapping};
use crate::generation::sanitizers::{js_identifier, sanitize_comment};

const DEFAULT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Serialize)]
pub struct PathParam {
    pub name: String,
    /// Route segment replaced by the value, `:name`
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateWindow {
    pub requests: u32,
    pub window_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RetryContext {
    pub count: u32,
    pub delay_ms: u64,
    pub backoff: &'static str,
}

/// Flattened view of an [`Endpoint`] for the handler templates
#[derive(Debug, Clone, Serialize)]
pub struct EndpointContext {
    pub tool_name: String,
    /// `tool_name` as a JavaScript identifier
    pub ident: String,
    pub comment: String,
    pub path: String,
    pub method: &'static str,
    pub route_fn: &'static str,
    pub path_params: Vec<PathParam>,
    pub header_params: Vec<String>,
    /// Names routed into the path or headers, kept out of the forwarded query
    pub routed: Vec<String>,
    pub has_body: bool,
    pub content_type: String,
    pub has_validation: bool,
    pub cache_ttl: Option<u64>,
    pub rate_limit: Option<RateWindow>,
    pub retries: RetryContext,
    pub status_codes: Vec<u16>,
    pub success_path: Option<String>,
    pub error_path: Option<String>,
    pub heartbeat_ms: u64,
    pub echo: bool,
}

impl EndpointContext {
    pub fn new(endpoint: &Endpoint) -> Self {
        let path_params: Vec<PathParam> = endpoint
            .path_placeholders()
            .into_iter()
            .map(|name| PathParam {
                name: name.to_string(),
                placeholder: format!(":{name}"),
            })
            .collect();
        let header_params: Vec<String> = endpoint
            .parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Header)
            .map(|p| p.name.clone())
            .collect();
        let routed = path_params
            .iter()
            .map(|p| p.name.clone())
            .chain(header_params.iter().cloned())
            .collect();

        let has_body = !matches!(endpoint.method, HttpMethod::Get | HttpMethod::Delete)
            && (endpoint.request_body.is_some()
                || endpoint
                    .parameters
                    .iter()
                    .any(|p| p.location == ParameterLocation::Body));
        let content_type = endpoint
            .request_body
            .as_ref()
            .map(|b| b.content_type.clone())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let ResponseMapping {
            success_path,
            error_path,
            status_codes,
        } = endpoint.response_mapping.clone().unwrap_or_default();

        let comment = if endpoint.description.trim().is_empty() {
            format!("{} {}", endpoint.method, endpoint.path)
        } else {
            sanitize_comment(&endpoint.description)
        };

        let websocket = endpoint.websocket.clone().unwrap_or_default();

        Self {
            tool_name: endpoint.tool_name.clone(),
            ident: js_identifier(&endpoint.tool_name),
            comment,
            path: endpoint.path.clone(),
            method: endpoint.method.as_str(),
            route_fn: endpoint.method.route_fn(),
            path_params,
            header_params,
            routed,
            has_body,
            content_type,
            has_validation: !endpoint.parameters.is_empty(),
            cache_ttl: endpoint
                .caching
                .as_ref()
                .filter(|c| c.enabled && c.ttl_seconds > 0 && endpoint.method == HttpMethod::Get)
                .map(|c| c.ttl_seconds),
            rate_limit: endpoint
                .rate_limit
                .as_ref()
                .filter(|r| r.enabled)
                .map(|r| RateWindow {
                    requests: r.requests,
                    window_ms: r.window_ms,
                }),
            retries: RetryContext {
                count: endpoint.retries.count,
                delay_ms: endpoint.retries.delay_ms,
                backoff: match endpoint.retries.backoff {
                    Backoff::Fixed => "fixed",
                    Backoff::Exponential => "exponential",
                },
            },
            status_codes,
            success_path,
            error_path,
            heartbeat_ms: websocket.heartbeat_interval_ms,
            echo: websocket.echo,
        }
    }
}
