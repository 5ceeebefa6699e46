//! Renders a [`ServerConfig`] into the generated server's source files

use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::conversion::assembler::{env_var_name, env_var_names};
use crate::core::Result;
use crate::core::settings::GenerationSettings;
use crate::core::utils::to_snake_case;
use crate::domain::{
    Authentication, Endpoint, EndpointKind, LogFormat, MetricsFormat, ParamType,
    ParameterLocation, ServerConfig,
};
use crate::generation::auth::AuthContext;
use crate::generation::endpoints::{EndpointContext, RateWindow};
use crate::generation::sanitizers::{js_identifier, sanitize_comment};
use crate::generation::templates;
use crate::generation::validation::validation_clauses;

pub const SERVER_FILE: &str = "server.js";
pub const PACKAGE_FILE: &str = "package.json";
pub const ENV_EXAMPLE_FILE: &str = ".env.example";

const DEFAULT_VERSION: &str = "1.0.0";
const DEFAULT_HEALTH_PATH: &str = "/health";

const EXPRESS_VERSION: &str = "^4.19.2";
const CORS_VERSION: &str = "^2.8.5";
const RATE_LIMIT_VERSION: &str = "^7.4.0";
const WS_VERSION: &str = "^8.18.0";
const UNDICI_VERSION: &str = "^6.19.8";

/// The three files making up a generated server
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedServer {
    pub server_js: String,
    pub package_json: String,
    pub env_example: String,
}

impl GeneratedServer {
    /// File name and content pairs, in write order
    pub fn files(&self) -> [(&'static str, &str); 3] {
        [
            (SERVER_FILE, self.server_js.as_str()),
            (PACKAGE_FILE, self.package_json.as_str()),
            (ENV_EXAMPLE_FILE, self.env_example.as_str()),
        ]
    }

    /// Write every file under `dir`, creating it when missing
    pub async fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).await?;

        let mut written = Vec::with_capacity(3);
        for (name, content) in self.files() {
            let path = dir.join(name);
            let mut file = fs::File::create(&path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            tracing::debug!(path = %path.display(), bytes = content.len(), "wrote generated file");
            written.push(path);
        }
        Ok(written)
    }
}

#[derive(Debug, Serialize)]
struct LoggingContext<'a> {
    level: &'a str,
    format: &'static str,
    log_requests: bool,
    log_responses: bool,
}

/// Options object handed to the `cors` middleware as is
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorsOptions<'a> {
    origin: JsonValue,
    methods: &'a [String],
    allowed_headers: &'a [String],
    credentials: bool,
}

#[derive(Debug, Serialize)]
struct MetricsContext<'a> {
    path: &'a str,
    format: &'static str,
}

/// Environment variable names for the HTTPS listener of mutual-tls servers
#[derive(Debug, Serialize)]
struct TlsContext {
    cert_env: String,
    key_env: String,
    ca_env: String,
}

#[derive(Debug, Serialize)]
struct ServerContext<'a> {
    name: &'a str,
    description: String,
    version: &'a str,
    base_url: &'a str,
    base_url_env: String,
    port: u16,
    timeout_ms: u64,
    headers: &'a BTreeMap<String, String>,
    logging: LoggingContext<'a>,
    cors: Option<CorsOptions<'a>>,
    rate_limit: Option<RateWindow>,
    uses_rate_limit: bool,
    caching: bool,
    has_websocket: bool,
    tls: Option<TlsContext>,
    health_path: &'a str,
    metrics: Option<MetricsContext<'a>>,
    tools_json: String,
    upstream_auth: String,
    auth_middleware: String,
    endpoints: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EnvVar {
    name: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct EnvExampleContext<'a> {
    name: &'a str,
    port: u16,
    log_level: &'a str,
    variables: Vec<EnvVar>,
}

/// Turns server configurations into a runnable Express proxy.
///
/// Each public render method fills exactly one template, so every block of
/// the output can be checked on its own.
pub struct ServerGenerator {
    tera: Tera,
    port: u16,
}

impl ServerGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self> {
        Ok(Self {
            tera: templates::load()?,
            port: settings.server_port,
        })
    }

    /// Render `server.js`, `package.json` and `.env.example` for a configuration
    pub fn generate(&self, config: &ServerConfig) -> Result<GeneratedServer> {
        let endpoints = config
            .enabled_endpoints()
            .map(|endpoint| self.render_endpoint(endpoint))
            .collect::<Result<Vec<_>>>()?;

        let monitoring = config.monitoring.as_ref().filter(|m| m.enabled);
        let context = ServerContext {
            name: &config.name,
            description: sanitize_comment(&config.description),
            version: non_empty_or(&config.version, DEFAULT_VERSION),
            base_url: &config.base_url,
            base_url_env: format!("{}_BASE_URL", config.env_prefix),
            port: self.port,
            timeout_ms: config.timeout_ms,
            headers: &config.headers,
            logging: LoggingContext {
                level: non_empty_or(&config.logging.level, "info"),
                format: match config.logging.format {
                    LogFormat::Json => "json",
                    LogFormat::Text => "text",
                },
                log_requests: config.logging.log_requests,
                log_responses: config.logging.log_responses,
            },
            cors: config.cors.enabled.then(|| CorsOptions {
                origin: cors_origin(&config.cors.origins),
                methods: &config.cors.methods,
                allowed_headers: &config.cors.allowed_headers,
                credentials: config.cors.credentials,
            }),
            rate_limit: config
                .rate_limit
                .as_ref()
                .filter(|r| r.enabled)
                .map(|r| RateWindow {
                    requests: r.requests,
                    window_ms: r.window_ms,
                }),
            uses_rate_limit: config.rate_limiting_enabled(),
            caching: config.uses_caching(),
            has_websocket: config.has_websocket_endpoints(),
            tls: matches!(config.authentication, Authentication::MutualTls { .. }).then(|| {
                TlsContext {
                    cert_env: env_var_name(&config.env_prefix, "SERVER_CERT"),
                    key_env: env_var_name(&config.env_prefix, "SERVER_KEY"),
                    ca_env: env_var_name(&config.env_prefix, "CLIENT_CA_CERT"),
                }
            }),
            health_path: monitoring
                .map(|m| m.health_check_path.as_str())
                .filter(|p| p.starts_with('/'))
                .unwrap_or(DEFAULT_HEALTH_PATH),
            metrics: monitoring
                .filter(|m| m.metrics_enabled)
                .map(|m| MetricsContext {
                    path: &m.metrics_path,
                    format: match m.metrics_format {
                        MetricsFormat::Json => "json",
                        MetricsFormat::Prometheus => "prometheus",
                    },
                }),
            tools_json: serde_json::to_string_pretty(&tool_listing(config))?,
            upstream_auth: self.generate_auth_header_code(config)?,
            auth_middleware: self.generate_auth_middleware(config)?,
            endpoints,
        };

        let server_js = self
            .tera
            .render(templates::SERVER, &Context::from_serialize(&context)?)?;
        let generated = GeneratedServer {
            server_js,
            package_json: package_json(config)?,
            env_example: self.render_env_example(config)?,
        };

        tracing::info!(
            server = %config.name,
            endpoints = context.endpoints.len(),
            auth = config.authentication.kind(),
            bytes = generated.server_js.len(),
            "generated server"
        );
        Ok(generated)
    }

    /// Render `applyUpstreamAuth`, which attaches the configured credentials
    /// to every upstream request. The `none` variant injects nothing.
    pub fn generate_auth_header_code(&self, config: &ServerConfig) -> Result<String> {
        let context = Context::from_serialize(AuthContext::from_config(config))?;
        Ok(self.tera.render(templates::UPSTREAM_AUTH, &context)?)
    }

    /// Render the inbound `authenticate` middleware shared by every route
    pub fn generate_auth_middleware(&self, config: &ServerConfig) -> Result<String> {
        let context = Context::from_serialize(AuthContext::from_config(config))?;
        Ok(self.tera.render(templates::AUTH_MIDDLEWARE, &context)?)
    }

    /// Render the route handler for one endpoint, shaped by its method kind
    pub fn render_endpoint(&self, endpoint: &Endpoint) -> Result<String> {
        let mut context = Context::new();
        context.insert("endpoint", &EndpointContext::new(endpoint));

        let template = match endpoint.kind() {
            EndpointKind::Rest => {
                context.insert("validation", &self.render_validation(endpoint)?);
                templates::ENDPOINT_REST
            }
            EndpointKind::WebSocket => templates::ENDPOINT_WEBSOCKET,
            EndpointKind::GraphQl => templates::ENDPOINT_GRAPHQL,
        };

        tracing::debug!(tool = %endpoint.tool_name, template, "rendering endpoint");
        Ok(self.tera.render(template, &context)?)
    }

    /// Render `validate_<tool>(input)`, or nothing when the endpoint takes no parameters
    pub fn render_validation(&self, endpoint: &Endpoint) -> Result<String> {
        if endpoint.parameters.is_empty() {
            return Ok(String::new());
        }

        let mut context = Context::new();
        context.insert("ident", &js_identifier(&endpoint.tool_name));
        context.insert("clauses", &validation_clauses(endpoint));
        Ok(self.tera.render(templates::VALIDATION, &context)?)
    }

    fn render_env_example(&self, config: &ServerConfig) -> Result<String> {
        let names = if config.environment_variables.is_empty() {
            env_var_names(&config.env_prefix, &config.authentication)
        } else {
            config.environment_variables.clone()
        };
        let base_url_env = format!("{}_BASE_URL", config.env_prefix);

        let variables = names
            .into_iter()
            .map(|(name, value)| {
                let value = if name == base_url_env && value.is_empty() {
                    config.base_url.clone()
                } else {
                    value
                };
                EnvVar { name, value }
            })
            .collect();

        let context = EnvExampleContext {
            name: &config.name,
            port: self.port,
            log_level: non_empty_or(&config.logging.level, "info"),
            variables,
        };
        Ok(self
            .tera
            .render(templates::ENV_EXAMPLE, &Context::from_serialize(&context)?)?)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

fn cors_origin(origins: &[String]) -> JsonValue {
    match origins {
        [] => json!("*"),
        [single] => json!(single),
        many => json!(many),
    }
}

/// Tool descriptors served from `GET /tools`
fn tool_listing(config: &ServerConfig) -> JsonValue {
    let tools: Vec<JsonValue> = config
        .enabled_endpoints()
        .map(|endpoint| {
            let mut properties = Map::new();
            for param in &endpoint.parameters {
                let mut schema = json!({
                    "type": param.param_type.as_str(),
                    "in": location_name(param.location),
                });
                if !param.description.is_empty() {
                    schema["description"] = json!(sanitize_comment(&param.description));
                }
                if let Some(example) = &param.example {
                    schema["example"] = example.clone();
                }
                properties.insert(param.name.clone(), schema);
            }
            if endpoint.kind() == EndpointKind::GraphQl {
                properties.insert("query".to_string(), json!({"type": ParamType::String.as_str()}));
                properties.insert("variables".to_string(), json!({"type": ParamType::Object.as_str()}));
            }

            let mut required: Vec<&str> = endpoint
                .parameters
                .iter()
                .filter(|p| p.required)
                .map(|p| p.name.as_str())
                .collect();
            if endpoint.kind() == EndpointKind::GraphQl {
                required.push("query");
            }

            json!({
                "name": endpoint.tool_name,
                "description": if endpoint.description.is_empty() {
                    format!("{} {}", endpoint.method, endpoint.path)
                } else {
                    sanitize_comment(&endpoint.description)
                },
                "method": endpoint.method,
                "path": endpoint.path,
                "inputSchema": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                },
            })
        })
        .collect();
    JsonValue::Array(tools)
}

fn location_name(location: ParameterLocation) -> &'static str {
    match location {
        ParameterLocation::Path => "path",
        ParameterLocation::Query => "query",
        ParameterLocation::Header => "header",
        ParameterLocation::Body => "body",
    }
}

fn package_json(config: &ServerConfig) -> Result<String> {
    let mut dependencies = Map::new();
    dependencies.insert("express".to_string(), json!(EXPRESS_VERSION));
    if config.cors.enabled {
        dependencies.insert("cors".to_string(), json!(CORS_VERSION));
    }
    if config.rate_limiting_enabled() {
        dependencies.insert("express-rate-limit".to_string(), json!(RATE_LIMIT_VERSION));
    }
    if config.has_websocket_endpoints() {
        dependencies.insert("ws".to_string(), json!(WS_VERSION));
    }
    if config.authentication.kind() == "mutual-tls" {
        dependencies.insert("undici".to_string(), json!(UNDICI_VERSION));
    }

    let slug = to_snake_case(&config.name).replace('_', "-");
    let package = json!({
        "name": if slug.is_empty() { "mcp-server".to_string() } else { format!("{slug}-mcp-server") },
        "version": non_empty_or(&config.version, DEFAULT_VERSION),
        "description": sanitize_comment(&config.description),
        "private": true,
        "main": SERVER_FILE,
        "scripts": { "start": format!("node {SERVER_FILE}") },
        "engines": { "node": ">=18" },
        "dependencies": dependencies,
    });

    let mut rendered = serde_json::to_string_pretty(&package)?;
    rendered.push('\n');
    Ok(rendered)
}
