//! Normalized authentication descriptors.
//!
//! Exactly one variant is active per server configuration. Each variant only
//! carries the fields it needs, so switching variants drops every credential
//! that belonged to the previous one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where an API key travels on the upstream request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
}

/// OAuth 2.0 grant flavours, mirroring the OpenAPI `flows` keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OAuth2Flow {
    #[default]
    AuthorizationCode,
    ClientCredentials,
    Implicit,
    Password,
}

impl OAuth2Flow {
    /// Map an OpenAPI 3 `flows` key or a Swagger 2 `flow` value
    pub fn from_openapi(key: &str) -> Option<Self> {
        match key {
            "authorizationCode" | "accessCode" => Some(Self::AuthorizationCode),
            "clientCredentials" | "application" => Some(Self::ClientCredentials),
            "implicit" => Some(Self::Implicit),
            "password" => Some(Self::Password),
            _ => None,
        }
    }
}

/// Authentication applied by the generated server to upstream requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Authentication {
    #[default]
    #[serde(rename = "none")]
    None,

    #[serde(rename = "apikey")]
    ApiKey {
        #[serde(rename = "in", default)]
        location: ApiKeyLocation,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    #[serde(rename = "bearer")]
    Bearer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },

    #[serde(rename = "basic")]
    Basic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },

    #[serde(rename = "oauth2", rename_all = "camelCase")]
    OAuth2 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        authorization_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token_url: Option<String>,
        #[serde(default)]
        scopes: Vec<String>,
        #[serde(default)]
        flow: OAuth2Flow,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_secret: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_token: Option<String>,
    },

    #[serde(rename = "digest")]
    Digest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        realm: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qop: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
    },

    #[serde(rename = "aws-signature", rename_all = "camelCase")]
    AwsSignature {
        region: String,
        service: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        access_key_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secret_access_key: Option<String>,
    },

    #[serde(rename = "mutual-tls", rename_all = "camelCase")]
    MutualTls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cert_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_path: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ca_path: Option<String>,
    },

    #[serde(rename = "custom", rename_all = "camelCase")]
    Custom {
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pre_request_script: Option<String>,
    },
}

impl Authentication {
    /// Every variant tag, in declaration order
    pub const KINDS: [&'static str; 9] = [
        "none",
        "apikey",
        "bearer",
        "basic",
        "oauth2",
        "digest",
        "aws-signature",
        "mutual-tls",
        "custom",
    ];

    /// Serialized tag of the active variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey { .. } => "apikey",
            Self::Bearer { .. } => "bearer",
            Self::Basic { .. } => "basic",
            Self::OAuth2 { .. } => "oauth2",
            Self::Digest { .. } => "digest",
            Self::AwsSignature { .. } => "aws-signature",
            Self::MutualTls { .. } => "mutual-tls",
            Self::Custom { .. } => "custom",
        }
    }

    /// A fresh, credential-free descriptor for the given tag.
    ///
    /// Returns `None` for tags outside the closed variant set.
    pub fn empty(kind: &str) -> Option<Self> {
        let auth = match kind {
            "none" => Self::None,
            "apikey" => Self::api_key_header("X-API-Key"),
            "bearer" => Self::Bearer { token: None },
            "basic" => Self::Basic {
                username: None,
                password: None,
            },
            "oauth2" => Self::OAuth2 {
                authorization_url: None,
                token_url: None,
                scopes: Vec::new(),
                flow: OAuth2Flow::default(),
                client_id: None,
                client_secret: None,
                access_token: None,
            },
            "digest" => Self::Digest {
                realm: None,
                qop: Some("auth".to_string()),
                username: None,
                password: None,
            },
            "aws-signature" => Self::AwsSignature {
                region: "us-east-1".to_string(),
                service: "execute-api".to_string(),
                access_key_id: None,
                secret_access_key: None,
            },
            "mutual-tls" => Self::MutualTls {
                cert_path: None,
                key_path: None,
                ca_path: None,
            },
            "custom" => Self::custom_placeholder(),
            _ => return None,
        };
        Some(auth)
    }

    pub fn api_key_header(name: impl Into<String>) -> Self {
        Self::ApiKey {
            location: ApiKeyLocation::Header,
            name: name.into(),
            value: None,
        }
    }

    pub fn api_key_query(name: impl Into<String>) -> Self {
        Self::ApiKey {
            location: ApiKeyLocation::Query,
            name: name.into(),
            value: None,
        }
    }

    /// Empty custom descriptor whose pre-request hook is left for the caller to fill in
    pub fn custom_placeholder() -> Self {
        Self::Custom {
            headers: BTreeMap::new(),
            pre_request_script: Some(CUSTOM_AUTH_PLACEHOLDER.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Comment left in place of caller-supplied authentication logic
pub const CUSTOM_AUTH_PLACEHOLDER: &str =
    "// Add custom authentication logic here (headers, signing, token refresh)";

impl fmt::Display for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_kind_has_an_empty_variant() {
        for kind in Authentication::KINDS {
            let auth = Authentication::empty(kind).expect("known kind");
            assert_eq!(auth.kind(), kind);
        }
        assert!(Authentication::empty("hawk").is_none());
    }

    #[test]
    fn test_apikey_serializes_with_openapi_field_names() {
        let auth = Authentication::api_key_header("X-API-Key");
        let value = serde_json::to_value(&auth).unwrap();
        assert_eq!(value, json!({"type": "apikey", "in": "header", "name": "X-API-Key"}));
    }

    #[test]
    fn test_tagged_deserialization() {
        let auth: Authentication = serde_json::from_value(json!({
            "type": "aws-signature",
            "region": "eu-west-1",
            "service": "s3"
        }))
        .unwrap();
        assert_eq!(
            auth,
            Authentication::AwsSignature {
                region: "eu-west-1".to_string(),
                service: "s3".to_string(),
                access_key_id: None,
                secret_access_key: None,
            }
        );

        let none: Authentication = serde_json::from_value(json!({"type": "none"})).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_switching_variant_drops_credentials() {
        let basic = Authentication::Basic {
            username: Some("alice".to_string()),
            password: Some("secret".to_string()),
        };
        let switched = Authentication::empty("bearer").unwrap();
        assert_ne!(basic.kind(), switched.kind());
        let value = serde_json::to_value(&switched).unwrap();
        assert_eq!(value, json!({"type": "bearer"}));
    }

    #[test]
    fn test_oauth_flow_mapping() {
        assert_eq!(
            OAuth2Flow::from_openapi("accessCode"),
            Some(OAuth2Flow::AuthorizationCode)
        );
        assert_eq!(
            OAuth2Flow::from_openapi("application"),
            Some(OAuth2Flow::ClientCredentials)
        );
        assert_eq!(OAuth2Flow::from_openapi("device"), None);
    }
}
