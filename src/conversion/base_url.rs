//! Base URL resolution and normalization

use serde_json::Value as JsonValue;
use url::Url;

use crate::core::{Error, Result};

/// Normalize a base URL: add `https://` when no scheme is present and strip
/// trailing slashes. Normalizing an already normalized URL is a no-op.
///
/// # Examples
/// ```
/// use mcpforge::conversion::base_url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("api.example.com/").unwrap(), "https://api.example.com");
/// assert_eq!(normalize_base_url("http://localhost:8080/v1").unwrap(), "http://localhost:8080/v1");
/// ```
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::conversion("base URL is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        format!("https://{trimmed}")
    };

    let normalized = with_scheme.trim_end_matches('/').to_string();

    let parsed = Url::parse(&normalized)
        .map_err(|e| Error::conversion(format!("invalid base URL '{raw}': {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::conversion(format!("base URL '{raw}' has no host")));
    }

    Ok(normalized)
}

/// Resolve the upstream base URL of a document.
///
/// Preference: `servers[0].url` (with variable defaults substituted), then
/// Swagger 2 `schemes[0]://host+basePath`, then the caller fallback. A
/// relative server URL is joined onto the fallback. Anything unresolvable is
/// a conversion error rather than a guess.
pub fn resolve_base_url(doc: &JsonValue, fallback: Option<&str>) -> Result<String> {
    let fallback = fallback.map(str::trim).filter(|f| !f.is_empty());

    if let Some(server) = doc
        .get("servers")
        .and_then(JsonValue::as_array)
        .and_then(|servers| servers.first())
    {
        if let Some(url) = server.get("url").and_then(JsonValue::as_str) {
            let url = substitute_server_variables(url.trim(), server.get("variables"));
            if is_relative_server_url(&url) {
                return match fallback {
                    Some(base) => {
                        let base = normalize_base_url(base)?;
                        let path = url.trim_start_matches("./").trim_start_matches('/');
                        normalize_base_url(&format!("{base}/{path}"))
                    }
                    None => Err(Error::conversion(format!(
                        "server URL '{url}' is relative and no fallback base URL was given"
                    ))),
                };
            }
            if !url.is_empty() {
                return normalize_base_url(&url);
            }
        }
    }

    if let Some(host) = doc.get("host").and_then(JsonValue::as_str) {
        let scheme = doc
            .get("schemes")
            .and_then(JsonValue::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(JsonValue::as_str)
            .unwrap_or("https");
        let base_path = doc.get("basePath").and_then(JsonValue::as_str).unwrap_or("");
        let base_path = if base_path.is_empty() || base_path.starts_with('/') {
            base_path.to_string()
        } else {
            format!("/{base_path}")
        };
        return normalize_base_url(&format!("{scheme}://{host}{base_path}"));
    }

    match fallback {
        Some(base) => normalize_base_url(base),
        None => Err(Error::conversion(
            "document declares no servers or host and no fallback base URL was given",
        )),
    }
}

/// A server URL with neither a scheme nor something that looks like a host,
/// such as `/v1`, `./v1` or `v1`
fn is_relative_server_url(url: &str) -> bool {
    if url.is_empty() || url.contains("://") || url.starts_with("//") {
        return false;
    }
    if url.starts_with('/') {
        return true;
    }
    let first = url.split('/').next().unwrap_or_default();
    first == "." || !(first.contains('.') || first.contains(':') || first == "localhost")
}

fn substitute_server_variables(url: &str, variables: Option<&JsonValue>) -> String {
    let Some(variables) = variables.and_then(JsonValue::as_object) else {
        return url.to_string();
    };
    variables.iter().fold(url.to_string(), |acc, (name, variable)| {
        match variable.get("default").and_then(JsonValue::as_str) {
            Some(default) => acc.replace(&format!("{{{name}}}"), default),
            None => acc,
        }
    })
}
