//! Maps resolved OpenAPI parameter, body and response objects onto the
//! normalized endpoint model.

use serde_json::Value as JsonValue;

use crate::conversion::extractor::RawOperation;
use crate::domain::{
    ParamType, Parameter, ParameterLocation, ParameterValidation, RequestBodyDescriptor,
    ResponseMapping,
};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Map one resolved parameter object.
///
/// Returns `None` for Swagger 2 `in: body` parameters (those become the
/// request body), cookie parameters and anything without a name.
pub fn map_parameter(param: &JsonValue) -> Option<Parameter> {
    let name = param.get("name").and_then(JsonValue::as_str)?.trim();
    if name.is_empty() {
        return None;
    }

    let location = match param.get("in").and_then(JsonValue::as_str).unwrap_or("query") {
        "path" => ParameterLocation::Path,
        "query" => ParameterLocation::Query,
        "header" => ParameterLocation::Header,
        "formData" => ParameterLocation::Body,
        "body" => return None,
        other => {
            tracing::debug!(parameter = name, location = other, "skipping unsupported parameter location");
            return None;
        }
    };

    // OpenAPI 3 nests the schema; Swagger 2 puts schema keywords on the parameter itself
    let schema = param.get("schema").unwrap_or(param);
    let param_type = ParamType::from_schema_type(schema.get("type").and_then(JsonValue::as_str));

    let mut mapped = Parameter::new(name, param_type, location).required(
        param
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false),
    );

    if let Some(description) = param.get("description").and_then(JsonValue::as_str) {
        mapped = mapped.described(description.trim());
    }

    let example = param
        .get("example")
        .or_else(|| schema.get("example"))
        .or_else(|| first_example(param.get("examples")))
        .or_else(|| schema.get("default"));
    if let Some(example) = example {
        mapped = mapped.with_example(example.clone());
    }

    let validation = map_validation(schema, param_type);
    if !validation.is_empty() {
        mapped.validation = Some(validation);
    }

    Some(mapped)
}

/// Constraints worth enforcing before forwarding a call upstream
fn map_validation(schema: &JsonValue, param_type: ParamType) -> ParameterValidation {
    let number = |key: &str| schema.get(key).and_then(JsonValue::as_f64);
    let (min, max) = match param_type {
        ParamType::Number => (number("minimum"), number("maximum")),
        ParamType::Array => (number("minItems"), number("maxItems")),
        _ => (number("minLength"), number("maxLength")),
    };

    ParameterValidation {
        min,
        max,
        pattern: schema
            .get("pattern")
            .and_then(JsonValue::as_str)
            .map(String::from),
        format: schema
            .get("format")
            .and_then(JsonValue::as_str)
            .map(String::from),
        enum_values: schema
            .get("enum")
            .and_then(JsonValue::as_array)
            .filter(|values| !values.is_empty())
            .cloned(),
    }
}

fn first_example(examples: Option<&JsonValue>) -> Option<&JsonValue> {
    let (_, example) = examples?.as_object()?.iter().next()?;
    example.get("value")
}

/// Build the request body descriptor for an operation.
///
/// OpenAPI 3 `requestBody` prefers the JSON media type and otherwise takes
/// the first declared one. Swagger 2 `in: body` parameters use the
/// operation's `consumes` list.
pub fn map_request_body(operation: &RawOperation) -> Option<RequestBodyDescriptor> {
    if let Some(body) = &operation.request_body {
        let content = body.get("content").and_then(JsonValue::as_object);
        let (content_type, media) = match content {
            Some(content) => content
                .get_key_value(JSON_MEDIA_TYPE)
                .or_else(|| content.iter().next())
                .map(|(key, media)| (key.clone(), Some(media)))
                .unwrap_or_else(|| (JSON_MEDIA_TYPE.to_string(), None)),
            None => (JSON_MEDIA_TYPE.to_string(), None),
        };
        return Some(RequestBodyDescriptor {
            content_type,
            required: body.get("required").and_then(JsonValue::as_bool).unwrap_or(false),
            description: body
                .get("description")
                .and_then(JsonValue::as_str)
                .map(String::from),
            schema: media.and_then(|m| m.get("schema")).cloned(),
        });
    }

    let body_param = operation
        .parameters
        .iter()
        .find(|param| param.get("in").and_then(JsonValue::as_str) == Some("body"))?;

    let content_type = operation
        .consumes
        .iter()
        .find(|media| media.as_str() == JSON_MEDIA_TYPE)
        .or_else(|| operation.consumes.first())
        .cloned()
        .unwrap_or_else(|| JSON_MEDIA_TYPE.to_string());

    Some(RequestBodyDescriptor {
        content_type,
        required: body_param
            .get("required")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false),
        description: body_param
            .get("description")
            .and_then(JsonValue::as_str)
            .map(String::from),
        schema: body_param.get("schema").cloned(),
    })
}

/// Accepted success codes come from the declared 2xx responses; `2XX` ranges
/// count as 200. No 2xx declaration means `[200]`.
pub fn map_response_mapping(responses: Option<&JsonValue>) -> ResponseMapping {
    let mut status_codes: Vec<u16> = responses
        .and_then(JsonValue::as_object)
        .map(|responses| {
            responses
                .keys()
                .filter_map(|code| {
                    if code.eq_ignore_ascii_case("2XX") {
                        return Some(200);
                    }
                    code.parse::<u16>().ok().filter(|c| (200..300).contains(c))
                })
                .collect()
        })
        .unwrap_or_default();
    status_codes.sort_unstable();
    status_codes.dedup();
    if status_codes.is_empty() {
        status_codes.push(200);
    }

    ResponseMapping {
        status_codes,
        ..ResponseMapping::default()
    }
}

/// All non-body parameters of an operation, in merged order
pub fn map_parameters(operation: &RawOperation) -> Vec<Parameter> {
    operation.parameters.iter().filter_map(map_parameter).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HttpMethod;
    use serde_json::json;

    fn operation(parameters: Vec<JsonValue>, request_body: Option<JsonValue>) -> RawOperation {
        RawOperation {
            path: "/x".to_string(),
            method: HttpMethod::Post,
            operation_id: None,
            summary: None,
            description: None,
            parameters,
            request_body,
            responses: None,
            consumes: Vec::new(),
            deprecated: false,
        }
    }

    #[test]
    fn test_openapi3_parameter() {
        let param = map_parameter(&json!({
            "name": "units",
            "in": "query",
            "description": " Units of measure ",
            "schema": {"type": "string", "enum": ["metric", "imperial"], "default": "metric"}
        }))
        .unwrap();
        assert_eq!(param.name, "units");
        assert_eq!(param.location, ParameterLocation::Query);
        assert_eq!(param.description, "Units of measure");
        assert!(!param.required);
        assert_eq!(param.example, Some(json!("metric")));
        assert_eq!(
            param.validation.unwrap().enum_values,
            Some(vec![json!("metric"), json!("imperial")])
        );
    }

    #[test]
    fn test_swagger2_parameter_keywords_inline() {
        let param = map_parameter(&json!({
            "name": "limit",
            "in": "query",
            "type": "integer",
            "minimum": 1,
            "maximum": 100,
            "required": true
        }))
        .unwrap();
        assert_eq!(param.param_type, ParamType::Number);
        assert!(param.required);
        let validation = param.validation.unwrap();
        assert_eq!(validation.min, Some(1.0));
        assert_eq!(validation.max, Some(100.0));
    }

    #[test]
    fn test_string_length_and_pattern() {
        let param = map_parameter(&json!({
            "name": "code",
            "in": "path",
            "schema": {"type": "string", "minLength": 2, "maxLength": 3, "pattern": "^[A-Z]+$", "format": "iso"}
        }))
        .unwrap();
        assert!(param.required);
        let validation = param.validation.unwrap();
        assert_eq!(validation.min, Some(2.0));
        assert_eq!(validation.pattern.as_deref(), Some("^[A-Z]+$"));
        assert_eq!(validation.format.as_deref(), Some("iso"));
    }

    #[test]
    fn test_skipped_parameters() {
        assert!(map_parameter(&json!({"name": "payload", "in": "body"})).is_none());
        assert!(map_parameter(&json!({"name": "session", "in": "cookie"})).is_none());
        assert!(map_parameter(&json!({"in": "query"})).is_none());
        let form = map_parameter(&json!({"name": "file", "in": "formData"})).unwrap();
        assert_eq!(form.location, ParameterLocation::Body);
    }

    #[test]
    fn test_examples_map_value() {
        let param = map_parameter(&json!({
            "name": "city",
            "in": "query",
            "examples": {"london": {"value": "London"}}
        }))
        .unwrap();
        assert_eq!(param.example, Some(json!("London")));
        assert!(param.validation.is_none());
    }

    #[test]
    fn test_openapi3_request_body_prefers_json() {
        let op = operation(
            vec![],
            Some(json!({
                "required": true,
                "content": {
                    "application/xml": {"schema": {"type": "string"}},
                    "application/json": {"schema": {"type": "object"}}
                }
            })),
        );
        let body = map_request_body(&op).unwrap();
        assert_eq!(body.content_type, "application/json");
        assert!(body.required);
        assert_eq!(body.schema, Some(json!({"type": "object"})));
    }

    #[test]
    fn test_swagger2_body_parameter() {
        let mut op = operation(
            vec![json!({"name": "body", "in": "body", "required": true, "schema": {"type": "object"}})],
            None,
        );
        op.consumes = vec!["application/xml".to_string()];
        let body = map_request_body(&op).unwrap();
        assert_eq!(body.content_type, "application/xml");
        assert!(map_parameters(&op).is_empty());
    }

    #[test]
    fn test_no_body() {
        assert!(map_request_body(&operation(vec![], None)).is_none());
    }

    #[test]
    fn test_response_mapping_codes() {
        let mapping = map_response_mapping(Some(&json!({
            "201": {}, "200": {}, "404": {}, "default": {}
        })));
        assert_eq!(mapping.status_codes, vec![200, 201]);
        assert_eq!(mapping.error_path.as_deref(), Some("error"));
        assert!(mapping.success_path.is_none());

        assert_eq!(map_response_mapping(Some(&json!({"2XX": {}}))).status_codes, vec![200]);
        assert_eq!(map_response_mapping(None).status_codes, vec![200]);
        assert_eq!(map_response_mapping(Some(&json!({"500": {}}))).status_codes, vec![200]);
    }
}
