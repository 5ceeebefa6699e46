//! Runtime settings for the conversion pipeline and the endpoint test harness.
//!
//! Settings come from an optional TOML file; any field left out keeps its
//! default. A couple of environment variables override the file so CI jobs
//! can tweak timeouts without shipping a settings file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{Error, Result};

pub const ENV_HTTP_TIMEOUT: &str = "MCPFORGE_HTTP_TIMEOUT_SECS";
pub const ENV_CATALOG_BASE_URL: &str = "MCPFORGE_CATALOG_BASE_URL";

/// Root settings document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub catalog: CatalogSettings,
    pub harness: HarnessSettings,
    pub generation: GenerationSettings,
}

/// Outbound HTTP client settings used for spec ingestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Public API catalog lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Root under which `{domain}/{service}/{version}/openapi.json` documents live
    pub spec_base_url: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            spec_base_url: "https://api.apis.guru/v2/specs".to_string(),
        }
    }
}

/// Endpoint test harness settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    pub timeout_secs: u64,
    /// Pause between requests when testing every enabled endpoint
    pub inter_request_delay_ms: u64,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            inter_request_delay_ms: 500,
        }
    }
}

impl HarnessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }
}

/// Code generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub server_port: u16,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self { server_port: 3000 }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Settings(e.to_string()))
    }

    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT) {
            self.http.timeout_secs = raw.trim().parse().map_err(|_| {
                Error::Settings(format!("{ENV_HTTP_TIMEOUT} must be a whole number, got '{raw}'"))
            })?;
        }
        if let Some(url) = lookup(ENV_CATALOG_BASE_URL) {
            self.catalog.spec_base_url = url.trim_end_matches('/').to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.http.timeout_secs, 30);
        assert_eq!(settings.harness.inter_request_delay_ms, 500);
        assert_eq!(settings.catalog.spec_base_url, "https://api.apis.guru/v2/specs");
        assert_eq!(settings.generation.server_port, 3000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml("[harness]\ninter_request_delay_ms = 0\n").unwrap();
        assert_eq!(settings.harness.inter_request_delay_ms, 0);
        assert_eq!(settings.harness.timeout_secs, 30);
        assert_eq!(settings.http, HttpSettings::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = Settings::from_toml("[http]\ntimeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[generation]\nserver_port = 8080").unwrap();
        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.generation.server_port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_env_overrides(|key| match key {
                ENV_HTTP_TIMEOUT => Some("5".to_string()),
                ENV_CATALOG_BASE_URL => Some("http://localhost:9000/specs/".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(settings.http.timeout(), Duration::from_secs(5));
        assert_eq!(settings.catalog.spec_base_url, "http://localhost:9000/specs");
    }

    #[test]
    fn test_bad_env_override() {
        let mut settings = Settings::default();
        let result = settings.apply_env_overrides(|key| {
            (key == ENV_HTTP_TIMEOUT).then(|| "never".to_string())
        });
        assert!(result.is_err());
    }
}
