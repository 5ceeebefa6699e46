//! The root artifact of the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::conversion::base_url::normalize_base_url;
use crate::core::Result;
use crate::domain::auth::Authentication;
use crate::domain::endpoint::{Endpoint, EndpointKind};
use crate::domain::policies::{
    CachingPolicy, CorsPolicy, LoggingPolicy, MonitoringPolicy, RateLimitPolicy,
};

/// Fully resolved server configuration.
///
/// Serialized as camelCase JSON; this document is what gets stored and
/// reloaded verbatim. The `id` is assigned on construction and has no setter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    /// Always carries a scheme and never a trailing slash
    pub base_url: String,
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub authentication: Authentication,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<CachingPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitoringPolicy>,
    #[serde(default)]
    pub logging: LoggingPolicy,
    pub timeout_ms: u64,
    pub retries: u32,
    #[serde(default)]
    pub cors: CorsPolicy,
    /// Prefix for every derived environment variable name
    pub env_prefix: String,
    /// Derived variable names mapped to empty placeholder values
    #[serde(default)]
    pub environment_variables: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServerConfig {
    /// Start a configuration with a freshly assigned id and the pipeline defaults
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            version: String::new(),
            base_url: base_url.into(),
            endpoints: Vec::new(),
            authentication: Authentication::None,
            headers: BTreeMap::new(),
            rate_limit: None,
            caching: None,
            monitoring: None,
            logging: LoggingPolicy::default(),
            timeout_ms: crate::domain::policies::DEFAULT_TIMEOUT_MS,
            retries: crate::domain::policies::DEFAULT_RETRIES,
            cors: CorsPolicy::default(),
            env_prefix: String::new(),
            environment_variables: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record a modification
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn endpoint(&self, id: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.id == id)
    }

    pub fn enabled_endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(|e| e.enabled)
    }

    pub fn has_websocket_endpoints(&self) -> bool {
        self.enabled_endpoints()
            .any(|e| e.kind() == EndpointKind::WebSocket)
    }

    pub fn uses_caching(&self) -> bool {
        self.enabled_endpoints().any(Endpoint::caching_enabled)
    }

    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit.as_ref().is_some_and(|r| r.enabled)
            || self
                .enabled_endpoints()
                .any(|e| e.rate_limit.as_ref().is_some_and(|r| r.enabled))
    }

    pub fn metrics_enabled(&self) -> bool {
        self.monitoring
            .as_ref()
            .is_some_and(|m| m.enabled && m.metrics_enabled)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a saved configuration. Hand-edited base URLs are normalized
    /// again so the generator and harness never see a trailing slash.
    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(raw).map_err(|e| crate::core::Error::parse(e.to_string()))?;
        config.base_url = normalize_base_url(&config.base_url)?;
        Ok(config)
    }
}
