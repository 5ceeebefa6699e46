//! Per-endpoint parameter validation clauses

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::{Endpoint, ParamType, Parameter};

/// Format tags the generated server knows how to check
pub const CHECKED_FORMATS: [&str; 6] = ["email", "uri", "url", "date", "date-time", "uuid"];

/// One generated `if (...) errors.push(...)` statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationClause {
    pub kind: ClauseKind,
    /// Parameter name as a JS string literal
    pub key: String,
    /// JS expression measured against `limit` for min/max clauses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<String>,
    /// JS literal the clause compares with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    /// Error message as a JS string literal
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseKind {
    Required,
    Type,
    Min,
    Max,
    Pattern,
    Format,
    Enum,
}

/// Clauses for every declared rule of an endpoint, in parameter order
pub fn validation_clauses(endpoint: &Endpoint) -> Vec<ValidationClause> {
    endpoint.parameters.iter().flat_map(parameter_clauses).collect()
}

fn parameter_clauses(param: &Parameter) -> Vec<ValidationClause> {
    let key = js_literal(&JsonValue::String(param.name.clone()));
    let value = format!("input[{key}]");
    let clause = |kind: ClauseKind, measure: Option<String>, limit: Option<String>, message: String| {
        ValidationClause {
            kind,
            key: key.clone(),
            measure,
            limit,
            message: js_literal(&JsonValue::String(message)),
        }
    };

    let mut clauses = Vec::new();
    let name = &param.name;

    if param.required {
        clauses.push(clause(
            ClauseKind::Required,
            None,
            None,
            format!("Parameter '{name}' is required"),
        ));
    }

    match param.param_type {
        ParamType::Number => clauses.push(clause(
            ClauseKind::Type,
            Some(format!("Number.isNaN(Number({value}))")),
            None,
            format!("Parameter '{name}' must be a number"),
        )),
        ParamType::Boolean => clauses.push(clause(
            ClauseKind::Type,
            Some(format!("!['true', 'false', true, false].includes({value})")),
            None,
            format!("Parameter '{name}' must be a boolean"),
        )),
        _ => {}
    }

    let Some(validation) = &param.validation else {
        return clauses;
    };

    let (measure, unit) = match param.param_type {
        ParamType::Number => (format!("Number({value})"), ""),
        ParamType::Array => (
            format!("(Array.isArray({value}) ? {value} : String({value}).split(',')).length"),
            " items",
        ),
        _ => (format!("String({value}).length"), " characters"),
    };

    if let Some(min) = validation.min {
        clauses.push(clause(
            ClauseKind::Min,
            Some(measure.clone()),
            Some(number_literal(min)),
            format!("Parameter '{name}' must be at least {}{unit}", number_literal(min)),
        ));
    }
    if let Some(max) = validation.max {
        clauses.push(clause(
            ClauseKind::Max,
            Some(measure),
            Some(number_literal(max)),
            format!("Parameter '{name}' must be at most {}{unit}", number_literal(max)),
        ));
    }
    if let Some(pattern) = &validation.pattern {
        clauses.push(clause(
            ClauseKind::Pattern,
            None,
            Some(js_literal(&JsonValue::String(pattern.clone()))),
            format!("Parameter '{name}' must match pattern {pattern}"),
        ));
    }
    if let Some(format) = validation
        .format
        .as_deref()
        .filter(|f| CHECKED_FORMATS.contains(f))
    {
        clauses.push(clause(
            ClauseKind::Format,
            None,
            Some(js_literal(&JsonValue::String(format.to_string()))),
            format!("Parameter '{name}' must be a valid {format}"),
        ));
    }
    if let Some(values) = &validation.enum_values {
        let allowed: Vec<JsonValue> = values
            .iter()
            .map(|v| match v {
                JsonValue::String(_) => v.clone(),
                other => JsonValue::String(other.to_string()),
            })
            .collect();
        clauses.push(clause(
            ClauseKind::Enum,
            None,
            Some(js_literal(&JsonValue::Array(allowed.clone()))),
            format!(
                "Parameter '{name}' must be one of: {}",
                allowed
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }

    clauses
}

fn js_literal(value: &JsonValue) -> String {
    value.to_string()
}

fn number_literal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParameterLocation, ParameterValidation};
    use serde_json::json;

    fn endpoint(parameters: Vec<Parameter>) -> Endpoint {
        let mut endpoint: Endpoint = serde_json::from_value(json!({
            "id": "e1",
            "path": "/search",
            "method": "GET",
            "toolName": "search",
            "enabled": true
        }))
        .unwrap();
        endpoint.parameters = parameters;
        endpoint
    }

    #[test]
    fn test_one_clause_per_rule() {
        let mut q = Parameter::new("q", ParamType::String, ParameterLocation::Query).required(true);
        q.validation = Some(ParameterValidation {
            min: Some(2.0),
            max: Some(50.0),
            pattern: Some("^[a-z ]+$".to_string()),
            ..ParameterValidation::default()
        });
        let clauses = validation_clauses(&endpoint(vec![q]));
        let kinds: Vec<ClauseKind> = clauses.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![ClauseKind::Required, ClauseKind::Min, ClauseKind::Max, ClauseKind::Pattern]
        );
        assert_eq!(clauses[0].key, "\"q\"");
        assert_eq!(clauses[1].measure.as_deref(), Some("String(input[\"q\"]).length"));
        assert_eq!(clauses[1].limit.as_deref(), Some("2"));
        assert!(clauses[2].message.contains("at most 50 characters"));
    }

    #[test]
    fn test_no_parameters_no_clauses() {
        assert!(validation_clauses(&endpoint(vec![])).is_empty());
    }

    #[test]
    fn test_number_type_and_bounds() {
        let mut days = Parameter::new("days", ParamType::Number, ParameterLocation::Query);
        days.validation = Some(ParameterValidation {
            min: Some(1.0),
            max: Some(14.5),
            ..ParameterValidation::default()
        });
        let clauses = validation_clauses(&endpoint(vec![days]));
        assert_eq!(clauses[0].kind, ClauseKind::Type);
        assert_eq!(clauses[1].measure.as_deref(), Some("Number(input[\"days\"])"));
        assert_eq!(clauses[2].limit.as_deref(), Some("14.5"));
    }

    #[test]
    fn test_format_and_enum() {
        let mut email = Parameter::new("email", ParamType::String, ParameterLocation::Query);
        email.validation = Some(ParameterValidation {
            format: Some("email".to_string()),
            ..ParameterValidation::default()
        });
        let mut level = Parameter::new("level", ParamType::String, ParameterLocation::Query);
        level.validation = Some(ParameterValidation {
            format: Some("binary".to_string()),
            enum_values: Some(vec![json!("low"), json!(2)]),
            ..ParameterValidation::default()
        });
        let clauses = validation_clauses(&endpoint(vec![email, level]));
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].kind, ClauseKind::Format);
        assert_eq!(clauses[1].kind, ClauseKind::Enum);
        assert_eq!(clauses[1].limit.as_deref(), Some("[\"low\",\"2\"]"));
    }

    #[test]
    fn test_messages_escape_quotes() {
        let param = Parameter::new("say \"hi\"", ParamType::String, ParameterLocation::Query).required(true);
        let clauses = validation_clauses(&endpoint(vec![param]));
        assert_eq!(clauses[0].key, "\"say \\\"hi\\\"\"");
        assert!(clauses[0].message.starts_with('"'));
    }
}
