//! Walks the `paths` of an OpenAPI 3 or Swagger 2 document and yields one raw
//! operation per supported verb.
//!
//! The walk is tolerant: missing sections yield nothing, unknown verbs are
//! skipped and unresolvable `$ref`s are left in place.

use serde_json::{Map, Value as JsonValue};

use crate::domain::HttpMethod;

/// Maximum `$ref` chain depth followed before giving up on a reference
pub const MAX_REF_DEPTH: usize = 16;

/// An operation lifted out of the document with its references resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RawOperation {
    /// Path as written in the document, `{param}` placeholders included
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Path-level and operation-level parameters merged; operation wins on name collision
    pub parameters: Vec<JsonValue>,
    pub request_body: Option<JsonValue>,
    pub responses: Option<JsonValue>,
    /// Media types from an operation or document level `consumes` (Swagger 2)
    pub consumes: Vec<String>,
    pub deprecated: bool,
}

/// Read-only view over a parsed document
pub struct OpenApiDocument<'a> {
    json: &'a JsonValue,
}

impl<'a> OpenApiDocument<'a> {
    pub fn new(json: &'a JsonValue) -> Self {
        Self { json }
    }

    pub fn title(&self) -> Option<&'a str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    pub fn version(&self) -> Option<&'a str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    pub fn description(&self) -> Option<&'a str> {
        self.json.get("info")?.get("description")?.as_str()
    }

    pub fn is_swagger2(&self) -> bool {
        self.json.get("swagger").is_some()
    }

    /// First category from the catalog `x-apisguru-categories` extension
    pub fn category(&self) -> Option<&'a str> {
        self.json
            .get("info")?
            .get("x-apisguru-categories")?
            .as_array()?
            .first()?
            .as_str()
    }

    /// Resolve a local JSON pointer reference such as `#/components/schemas/Pet`
    pub fn lookup_ref(&self, reference: &str) -> Option<&'a JsonValue> {
        let pointer = reference.strip_prefix('#')?;
        self.json.pointer(pointer)
    }

    /// Recursively replace `$ref` objects with their targets.
    ///
    /// Chains deeper than [`MAX_REF_DEPTH`] (including cycles) and references
    /// that do not resolve are left as the original `$ref` object.
    pub fn resolve(&self, value: &JsonValue) -> JsonValue {
        self.resolve_at_depth(value, 0)
    }

    fn resolve_at_depth(&self, value: &JsonValue, depth: usize) -> JsonValue {
        match value {
            JsonValue::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(JsonValue::as_str) {
                    if depth >= MAX_REF_DEPTH {
                        tracing::debug!(reference, "reference chain too deep, leaving unresolved");
                        return value.clone();
                    }
                    return match self.lookup_ref(reference) {
                        Some(target) => self.resolve_at_depth(target, depth + 1),
                        None => {
                            tracing::debug!(reference, "unresolvable reference left in place");
                            value.clone()
                        }
                    };
                }
                let resolved: Map<String, JsonValue> = obj
                    .iter()
                    .map(|(key, val)| (key.clone(), self.resolve_at_depth(val, depth)))
                    .collect();
                JsonValue::Object(resolved)
            }
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.resolve_at_depth(item, depth))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    /// Every operation under `paths`, in document order
    pub fn operations(&self) -> Vec<RawOperation> {
        let Some(paths) = self.json.get("paths").and_then(JsonValue::as_object) else {
            tracing::debug!("document has no paths object");
            return Vec::new();
        };

        let document_consumes = string_list(self.json.get("consumes"));

        paths
            .iter()
            .flat_map(|(path, path_item)| {
                let path_item = self.resolve(path_item);
                let shared = self.parameters_of(&path_item);
                path_item
                    .as_object()
                    .map(|item| {
                        item.iter()
                            .filter_map(|(key, operation)| {
                                let method = verb(key)?;
                                let operation = operation.as_object()?;
                                Some(self.build_operation(
                                    path,
                                    method,
                                    &shared,
                                    operation,
                                    &document_consumes,
                                ))
                            })
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }

    fn build_operation(
        &self,
        path: &str,
        method: HttpMethod,
        shared: &[JsonValue],
        operation: &Map<String, JsonValue>,
        document_consumes: &[String],
    ) -> RawOperation {
        let text = |key: &str| {
            operation
                .get(key)
                .and_then(JsonValue::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let own = self.parameters_of(&JsonValue::Object(operation.clone()));
        let mut parameters: Vec<JsonValue> = shared
            .iter()
            .filter(|param| {
                let name = param_name(param);
                !own.iter().any(|o| param_name(o) == name)
            })
            .cloned()
            .collect();
        parameters.extend(own);

        let consumes = match string_list(operation.get("consumes")) {
            list if list.is_empty() => document_consumes.to_vec(),
            list => list,
        };

        RawOperation {
            path: path.to_string(),
            method,
            operation_id: text("operationId"),
            summary: text("summary"),
            description: text("description"),
            parameters,
            request_body: operation.get("requestBody").map(|body| self.resolve(body)),
            responses: operation.get("responses").map(|r| self.resolve(r)),
            consumes,
            deprecated: operation
                .get("deprecated")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
        }
    }

    fn parameters_of(&self, item: &JsonValue) -> Vec<JsonValue> {
        item.get("parameters")
            .and_then(JsonValue::as_array)
            .map(|params| {
                params
                    .iter()
                    .map(|param| self.resolve(param))
                    .filter(|param| param_name(param).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Convenience wrapper over [`OpenApiDocument::operations`]
pub fn extract_endpoints(doc: &JsonValue) -> Vec<RawOperation> {
    OpenApiDocument::new(doc).operations()
}

/// Rewrite `{param}` placeholders into `:param` route syntax
///
/// # Examples
/// ```
/// use mcpforge::conversion::extractor::to_route_path;
///
/// assert_eq!(to_route_path("/users/{userId}/posts/{postId}"), "/users/:userId/posts/:postId");
/// assert_eq!(to_route_path("/users/:id"), "/users/:id");
/// ```
pub fn to_route_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        match rest[start..].find('}') {
            Some(len) => {
                out.push_str(&rest[..start]);
                out.push(':');
                out.push_str(&rest[start + 1..start + len]);
                rest = &rest[start + len + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn verb(key: &str) -> Option<HttpMethod> {
    HttpMethod::OPENAPI_VERBS
        .into_iter()
        .find(|method| method.as_str().eq_ignore_ascii_case(key))
}

fn param_name(param: &JsonValue) -> Option<&str> {
    param.get("name").and_then(JsonValue::as_str)
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(JsonValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
