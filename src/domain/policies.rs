//! Cross-cutting server policies: rate limiting, caching, retries, CORS,
//! monitoring and logging.

use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_HEALTH_INTERVAL_MS: u64 = 300_000;
pub const DEFAULT_RATE_WINDOW_MS: u64 = 60_000;
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 30_000;

/// Request budget over a sliding window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub enabled: bool,
    pub requests: u32,
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub fn new(requests: u32, window_ms: u64) -> Self {
        Self {
            enabled: true,
            requests,
            window_ms,
        }
    }

    /// Conservative per-endpoint share of a global budget: a tenth, never below one.
    pub fn per_endpoint_share(&self) -> Self {
        Self {
            enabled: self.enabled,
            requests: (self.requests / 10).max(1),
            window_ms: self.window_ms,
        }
    }
}

/// Response caching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachingPolicy {
    pub enabled: bool,
    pub ttl_seconds: u64,
}

impl CachingPolicy {
    pub fn enabled(ttl_seconds: u64) -> Self {
        Self {
            enabled: true,
            ttl_seconds,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl_seconds: 0,
        }
    }
}

impl Default for CachingPolicy {
    fn default() -> Self {
        Self::enabled(DEFAULT_CACHE_TTL_SECS)
    }
}

/// Delay growth between failed upstream attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    Fixed,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub count: u32,
    pub delay_ms: u64,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            count: DEFAULT_RETRIES,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
            backoff: Backoff::Exponential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsPolicy {
    pub enabled: bool,
    pub origins: Vec<String>,
    pub methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
            methods: ["GET", "POST", "PUT", "DELETE", "PATCH"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: ["Content-Type", "Authorization"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            credentials: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    #[default]
    Json,
    Prometheus,
}

impl std::str::FromStr for MetricsFormat {
    type Err = crate::core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "prometheus" | "prom" => Ok(Self::Prometheus),
            other => Err(crate::core::Error::conversion(format!(
                "unknown metrics format '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPolicy {
    pub enabled: bool,
    pub health_check_path: String,
    pub health_check_interval_ms: u64,
    pub metrics_enabled: bool,
    pub metrics_path: String,
    pub metrics_format: MetricsFormat,
}

impl MonitoringPolicy {
    pub fn new(metrics: Option<MetricsFormat>) -> Self {
        Self {
            enabled: true,
            health_check_path: "/health".to_string(),
            health_check_interval_ms: DEFAULT_HEALTH_INTERVAL_MS,
            metrics_enabled: metrics.is_some(),
            metrics_path: "/metrics".to_string(),
            metrics_format: metrics.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingPolicy {
    pub level: String,
    pub format: LogFormat,
    pub log_requests: bool,
    pub log_responses: bool,
}

impl Default for LoggingPolicy {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            log_requests: true,
            log_responses: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_endpoint_share() {
        assert_eq!(RateLimitPolicy::new(100, 60_000).per_endpoint_share().requests, 10);
        assert_eq!(RateLimitPolicy::new(5, 60_000).per_endpoint_share().requests, 1);
        assert_eq!(RateLimitPolicy::new(0, 60_000).per_endpoint_share().requests, 1);
    }

    #[test]
    fn test_cors_defaults_cover_standard_verbs() {
        let cors = CorsPolicy::default();
        assert!(cors.enabled);
        assert_eq!(cors.origins, vec!["*"]);
        assert_eq!(cors.methods, vec!["GET", "POST", "PUT", "DELETE", "PATCH"]);
    }

    #[test]
    fn test_monitoring_metrics_gate() {
        let plain = MonitoringPolicy::new(None);
        assert!(plain.enabled);
        assert!(!plain.metrics_enabled);
        assert_eq!(plain.health_check_interval_ms, 300_000);

        let prom = MonitoringPolicy::new(Some(MetricsFormat::Prometheus));
        assert!(prom.metrics_enabled);
        assert_eq!(prom.metrics_format, MetricsFormat::Prometheus);
    }

    #[test]
    fn test_metrics_format_from_str() {
        assert_eq!("JSON".parse::<MetricsFormat>().unwrap(), MetricsFormat::Json);
        assert_eq!("prom".parse::<MetricsFormat>().unwrap(), MetricsFormat::Prometheus);
        assert!("statsd".parse::<MetricsFormat>().is_err());
    }
}
