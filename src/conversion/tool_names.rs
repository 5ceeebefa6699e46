//! Deterministic tool naming

use crate::core::utils::to_camel_case;
use crate::domain::HttpMethod;

/// Everything the resolver looks at to name one operation
#[derive(Debug, Clone, Copy)]
pub struct ToolNameInput<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub operation_id: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub description: Option<&'a str>,
    pub api_name: &'a str,
}

/// Pick a tool name, first match wins:
///
/// 1. the operation id, unless it is a generic `{method}-{path}` form
/// 2. the summary (or description), camel-cased
/// 3. method + last literal path segment, e.g. `GET /weather` -> `getWeather`
/// 4. method + API name
///
/// # Examples
/// ```
/// use mcpforge::conversion::tool_names::{ToolNameInput, resolve_tool_name};
/// use mcpforge::domain::HttpMethod;
///
/// let input = ToolNameInput {
///     method: HttpMethod::Get,
///     path: "/weather",
///     operation_id: None,
///     summary: None,
///     description: None,
///     api_name: "Weather API",
/// };
/// assert_eq!(resolve_tool_name(&input), "getWeather");
/// ```
pub fn resolve_tool_name(input: &ToolNameInput<'_>) -> String {
    let verb = input.method.as_str().to_lowercase();

    if let Some(operation_id) = non_blank(input.operation_id) {
        if !is_generic_operation_id(operation_id, &verb, input.path) {
            let name = to_camel_case(operation_id);
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Some(text) = non_blank(input.summary).or_else(|| non_blank(input.description)) {
        let name = to_camel_case(text);
        if !name.is_empty() {
            return name;
        }
    }

    if let Some(segment) = last_literal_segment(input.path) {
        return to_camel_case(&format!("{verb} {segment}"));
    }

    to_camel_case(&format!("{verb} {}", input.api_name))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `get-/users/{id}` or `get_users_id`: the method followed by the path with
/// its separators replaced, which carries no more meaning than the route
fn is_generic_operation_id(operation_id: &str, verb: &str, path: &str) -> bool {
    let lower = operation_id.to_lowercase();
    let Some(rest) = lower.strip_prefix(verb) else {
        return false;
    };
    if !rest.starts_with(['-', '_', ' ', '/']) {
        return false;
    }
    alphanumeric(rest) == alphanumeric(&path.to_lowercase())
}

fn alphanumeric(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphanumeric).collect()
}

fn last_literal_segment(path: &str) -> Option<&str> {
    path.split('/')
        .rev()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .find(|segment| !segment.starts_with('{') && !segment.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        method: HttpMethod,
        path: &'a str,
        operation_id: Option<&'a str>,
        summary: Option<&'a str>,
    ) -> ToolNameInput<'a> {
        ToolNameInput {
            method,
            path,
            operation_id,
            summary,
            description: None,
            api_name: "Pet Store",
        }
    }

    #[test]
    fn test_operation_id_wins() {
        let i = input(HttpMethod::Get, "/pets", Some("listPets"), Some("List all pets"));
        assert_eq!(resolve_tool_name(&i), "listPets");
        let snake = input(HttpMethod::Get, "/pets", Some("find_pets_by_status"), None);
        assert_eq!(resolve_tool_name(&snake), "findPetsByStatus");
    }

    #[test]
    fn test_generic_operation_id_is_skipped() {
        let i = input(HttpMethod::Get, "/pets/{id}", Some("get-/pets/{id}"), Some("Fetch a pet"));
        assert_eq!(resolve_tool_name(&i), "fetchAPet");
        let underscored = input(HttpMethod::Post, "/pets", Some("post_pets"), None);
        assert_eq!(resolve_tool_name(&underscored), "postPets");
    }

    #[test]
    fn test_camel_operation_id_is_not_generic() {
        let i = input(HttpMethod::Get, "/weather", Some("getWeather"), Some("Current conditions"));
        assert_eq!(resolve_tool_name(&i), "getWeather");
    }

    #[test]
    fn test_description_fallback() {
        let mut i = input(HttpMethod::Delete, "/pets/{id}", None, None);
        i.description = Some("Remove pet");
        assert_eq!(resolve_tool_name(&i), "removePet");
    }

    #[test]
    fn test_path_segment_fallback_skips_placeholders() {
        let i = input(HttpMethod::Get, "/users/{id}/", None, Some("   "));
        assert_eq!(resolve_tool_name(&i), "getUsers");
        let colon = input(HttpMethod::Put, "/orders/:orderId", None, None);
        assert_eq!(resolve_tool_name(&colon), "putOrders");
    }

    #[test]
    fn test_api_name_fallback() {
        let i = input(HttpMethod::Get, "/", None, None);
        assert_eq!(resolve_tool_name(&i), "getPetStore");
        let templated = input(HttpMethod::Patch, "/{id}", None, None);
        assert_eq!(resolve_tool_name(&templated), "patchPetStore");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let i = input(HttpMethod::Get, "/forecast/daily", None, Some("Daily forecast"));
        assert_eq!(resolve_tool_name(&i), resolve_tool_name(&i));
    }
}
