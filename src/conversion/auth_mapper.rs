//! Maps OpenAPI security schemes and catalog auth hints onto [`Authentication`]

use serde_json::Value as JsonValue;

use crate::domain::{Authentication, CatalogAuth, OAuth2Flow};

const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_API_KEY_QUERY: &str = "api_key";

/// Preference order when a scheme declares several OAuth 2 flows
const FLOW_PREFERENCE: [&str; 4] = ["authorizationCode", "clientCredentials", "password", "implicit"];

/// Map a single resolved security scheme object.
///
/// Unrecognized schemes become the custom placeholder so the generated server
/// still has a hook to fill in.
pub fn map_security_scheme(scheme: &JsonValue) -> Authentication {
    let field = |key: &str| scheme.get(key).and_then(JsonValue::as_str);

    if field("x-amazon-apigateway-authtype").is_some_and(|t| t.eq_ignore_ascii_case("awsSigv4")) {
        return Authentication::empty("aws-signature").unwrap_or_default();
    }

    match field("type").unwrap_or_default() {
        "apiKey" => {
            let name = field("name").map(str::trim).filter(|n| !n.is_empty());
            match field("in") {
                Some("query") => {
                    Authentication::api_key_query(name.unwrap_or(DEFAULT_API_KEY_QUERY))
                }
                _ => Authentication::api_key_header(name.unwrap_or(DEFAULT_API_KEY_HEADER)),
            }
        }
        "http" => match field("scheme").map(str::to_lowercase).as_deref() {
            Some("bearer") => Authentication::Bearer { token: None },
            Some("basic") => Authentication::Basic {
                username: None,
                password: None,
            },
            Some("digest") => Authentication::empty("digest").unwrap_or_default(),
            other => {
                tracing::warn!(scheme = ?other, "unsupported http auth scheme, using custom placeholder");
                Authentication::custom_placeholder()
            }
        },
        "basic" => Authentication::Basic {
            username: None,
            password: None,
        },
        "oauth2" => map_oauth2(scheme),
        "openIdConnect" => Authentication::OAuth2 {
            authorization_url: field("openIdConnectUrl").map(String::from),
            token_url: None,
            scopes: Vec::new(),
            flow: OAuth2Flow::AuthorizationCode,
            client_id: None,
            client_secret: None,
            access_token: None,
        },
        "mutualTLS" => Authentication::empty("mutual-tls").unwrap_or_default(),
        other => {
            tracing::warn!(scheme_type = other, "unrecognized security scheme, using custom placeholder");
            Authentication::custom_placeholder()
        }
    }
}

fn map_oauth2(scheme: &JsonValue) -> Authentication {
    // OpenAPI 3 nests flows by name; Swagger 2 is flat with a `flow` field
    let (flow, details) = match scheme.get("flows").and_then(JsonValue::as_object) {
        Some(flows) => FLOW_PREFERENCE
            .iter()
            .find_map(|key| flows.get(*key).map(|details| (*key, details)))
            .or_else(|| flows.iter().next().map(|(key, details)| (key.as_str(), details)))
            .unwrap_or(("authorizationCode", scheme)),
        None => (
            scheme
                .get("flow")
                .and_then(JsonValue::as_str)
                .unwrap_or("authorizationCode"),
            scheme,
        ),
    };

    let url = |key: &str| details.get(key).and_then(JsonValue::as_str).map(String::from);

    Authentication::OAuth2 {
        authorization_url: url("authorizationUrl"),
        token_url: url("tokenUrl"),
        scopes: details
            .get("scopes")
            .and_then(JsonValue::as_object)
            .map(|scopes| scopes.keys().cloned().collect())
            .unwrap_or_default(),
        flow: OAuth2Flow::from_openapi(flow).unwrap_or_default(),
        client_id: None,
        client_secret: None,
        access_token: None,
    }
}

/// Pick the document-level authentication.
///
/// The first scheme named by the top-level `security` requirement wins,
/// otherwise the first declared scheme. No declared schemes means `None`.
pub fn map_document_security(doc: &JsonValue) -> Authentication {
    let schemes = doc
        .pointer("/components/securitySchemes")
        .or_else(|| doc.get("securityDefinitions"))
        .and_then(JsonValue::as_object);

    let Some(schemes) = schemes.filter(|s| !s.is_empty()) else {
        return Authentication::None;
    };

    let required = doc
        .get("security")
        .and_then(JsonValue::as_array)
        .and_then(|requirements| {
            requirements
                .iter()
                .filter_map(JsonValue::as_object)
                .flat_map(|requirement| requirement.keys())
                .find_map(|name| schemes.get(name))
        });

    let scheme = match required.or_else(|| schemes.values().next()) {
        Some(scheme) => resolve_local(doc, scheme),
        None => return Authentication::None,
    };
    map_security_scheme(scheme)
}

fn resolve_local<'a>(doc: &'a JsonValue, scheme: &'a JsonValue) -> &'a JsonValue {
    scheme
        .get("$ref")
        .and_then(JsonValue::as_str)
        .and_then(|reference| reference.strip_prefix('#'))
        .and_then(|pointer| doc.pointer(pointer))
        .unwrap_or(scheme)
}

/// Map a catalog auth hint. Unknown kinds become the custom placeholder.
pub fn map_catalog_auth(auth: &CatalogAuth) -> Authentication {
    let kind = auth.kind.trim().to_lowercase();
    match kind.as_str() {
        "" | "none" => Authentication::None,
        "apikey" | "api_key" | "api-key" | "key" => {
            let query = auth
                .location
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case("query"))
                || (auth.header_name.is_none() && auth.param_name.is_some());
            if query {
                Authentication::api_key_query(
                    auth.param_name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_API_KEY_QUERY.to_string()),
                )
            } else {
                Authentication::api_key_header(
                    auth.header_name
                        .clone()
                        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
                )
            }
        }
        "bearer" | "token" | "jwt" => Authentication::Bearer { token: None },
        "basic" => Authentication::Basic {
            username: None,
            password: None,
        },
        "oauth" | "oauth2" => Authentication::empty("oauth2").unwrap_or_default(),
        "digest" => Authentication::empty("digest").unwrap_or_default(),
        "aws" | "aws-signature" | "awssigv4" => {
            Authentication::empty("aws-signature").unwrap_or_default()
        }
        "mtls" | "mutual-tls" | "mutualtls" => {
            Authentication::empty("mutual-tls").unwrap_or_default()
        }
        other => {
            tracing::warn!(kind = other, "unrecognized catalog auth kind, using custom placeholder");
            Authentication::custom_placeholder()
        }
    }
}
