//! Template contexts for the authentication blocks of the generated server

use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;

use crate::conversion::assembler::{credential_suffixes, env_var_name};
use crate::domain::{ApiKeyLocation, Authentication, OAuth2Flow, ServerConfig};

/// Everything the upstream and inbound auth templates read.
///
/// Secrets never land here: credentials are looked up from environment
/// variables by the generated code, so only their names are rendered.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthContext {
    pub kind: &'static str,
    /// Public description of the scheme, emitted as `AUTH_CONFIG`
    pub descriptor: JsonValue,
    /// Credential suffix to full environment variable name
    pub env: BTreeMap<&'static str, String>,
    pub api_key_name: String,
    pub api_key_in: &'static str,
    pub client_credentials: bool,
    pub token_url: Option<String>,
    pub scopes: Vec<String>,
    pub aws_region: String,
    pub aws_service: String,
    pub custom_headers: BTreeMap<String, String>,
    pub pre_request_script: Option<String>,
}

impl AuthContext {
    pub fn from_config(config: &ServerConfig) -> Self {
        let auth = &config.authentication;
        let kind = auth.kind();
        let env = credential_suffixes(auth)
            .iter()
            .map(|suffix| (*suffix, env_var_name(&config.env_prefix, suffix)))
            .collect();

        let mut context = Self {
            kind,
            descriptor: json!({ "type": kind }),
            env,
            ..Self::default()
        };

        match auth {
            Authentication::ApiKey { location, name, .. } => {
                context.api_key_name = name.clone();
                context.api_key_in = match location {
                    ApiKeyLocation::Header => "header",
                    ApiKeyLocation::Query => "query",
                };
                context.descriptor = json!({
                    "type": kind,
                    "in": context.api_key_in,
                    "name": name,
                });
            }
            Authentication::OAuth2 {
                token_url,
                scopes,
                flow,
                ..
            } => {
                context.client_credentials =
                    *flow == OAuth2Flow::ClientCredentials && token_url.is_some();
                context.token_url = token_url.clone();
                context.scopes = scopes.clone();
                context.descriptor = json!({ "type": kind, "flow": flow, "scopes": scopes });
            }
            Authentication::Digest { realm, qop, .. } => {
                context.descriptor = json!({ "type": kind, "realm": realm, "qop": qop });
            }
            Authentication::AwsSignature {
                region, service, ..
            } => {
                context.aws_region = region.clone();
                context.aws_service = service.clone();
                context.descriptor = json!({ "type": kind, "region": region, "service": service });
            }
            Authentication::Custom {
                headers,
                pre_request_script,
            } => {
                context.custom_headers = headers.clone();
                context.descriptor = json!({
                    "type": kind,
                    "headers": headers.keys().collect::<Vec<_>>(),
                });
                context.pre_request_script = pre_request_script
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
            }
            Authentication::None
            | Authentication::Bearer { .. }
            | Authentication::Basic { .. }
            | Authentication::MutualTls { .. } => {}
        }

        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth: Authentication) -> ServerConfig {
        let mut config = ServerConfig::new("Weather API", "https://api.example.com");
        config.env_prefix = "WEATHER".to_string();
        config.authentication = auth;
        config
    }

    #[test]
    fn test_apikey_context() {
        let context = AuthContext::from_config(&config(Authentication::api_key_query("appid")));
        assert_eq!(context.kind, "apikey");
        assert_eq!(context.api_key_in, "query");
        assert_eq!(context.env["API_KEY"], "WEATHER_API_KEY");
        assert_eq!(
            context.descriptor,
            json!({"type": "apikey", "in": "query", "name": "appid"})
        );
    }

    #[test]
    fn test_descriptor_carries_no_secrets() {
        let context = AuthContext::from_config(&config(Authentication::Basic {
            username: Some("alice".to_string()),
            password: Some("hunter2".to_string()),
        }));
        let rendered = serde_json::to_string(&context).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("alice"));
        assert_eq!(context.env["PASSWORD"], "WEATHER_PASSWORD");
    }

    #[test]
    fn test_client_credentials_needs_token_url() {
        let mut auth = Authentication::empty("oauth2").unwrap();
        if let Authentication::OAuth2 { flow, .. } = &mut auth {
            *flow = OAuth2Flow::ClientCredentials;
        }
        assert!(!AuthContext::from_config(&config(auth.clone())).client_credentials);

        if let Authentication::OAuth2 { token_url, .. } = &mut auth {
            *token_url = Some("https://auth.example.com/token".to_string());
        }
        assert!(AuthContext::from_config(&config(auth)).client_credentials);
    }

    #[test]
    fn test_blank_custom_script_is_dropped() {
        let auth = Authentication::Custom {
            headers: BTreeMap::from([("X-Tenant".to_string(), "acme".to_string())]),
            pre_request_script: Some("   ".to_string()),
        };
        let context = AuthContext::from_config(&config(auth));
        assert!(context.pre_request_script.is_none());
        assert_eq!(context.custom_headers["X-Tenant"], "acme");
    }

    #[test]
    fn test_custom_descriptor_names_required_headers() {
        let auth = Authentication::Custom {
            headers: BTreeMap::from([
                ("X-Tenant".to_string(), "acme".to_string()),
                ("X-Api-Secret".to_string(), "s3cret".to_string()),
            ]),
            pre_request_script: None,
        };
        let context = AuthContext::from_config(&config(auth));
        assert_eq!(
            context.descriptor,
            json!({"type": "custom", "headers": ["X-Api-Secret", "X-Tenant"]})
        );
        assert!(!context.descriptor.to_string().contains("s3cret"));
    }
}
