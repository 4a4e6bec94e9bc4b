//! Validation of model-supplied tool arguments against the object schema
//! a tool declares. Intentionally small: required-property checks, basic
//! type checks, and numeric coercion for values models tend to quote.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("missing required parameter '{0}'")]
    MissingRequired(String),

    #[error("parameter '{name}' expected {expected}, got {actual}")]
    WrongType {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Checks `args` against `schema` and returns the (possibly coerced)
/// argument object. Unknown properties pass through untouched.
pub fn validate_arguments(schema: &Value, args: &Value) -> Result<Value, SchemaError> {
    let mut object = match args {
        Value::Object(map) => map.clone(),
        // Models sometimes send no arguments at all for nullary tools.
        Value::Null => Map::new(),
        other => return Err(SchemaError::NotAnObject(type_name(other).to_string())),
    };

    let properties = schema.get("properties").and_then(|p| p.as_object());

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|v| v.as_str()) {
            if !object.contains_key(name) {
                return Err(SchemaError::MissingRequired(name.to_string()));
            }
        }
    }

    if let Some(properties) = properties {
        for (name, prop_schema) in properties {
            let Some(expected) = prop_schema.get("type").and_then(|t| t.as_str()) else {
                continue;
            };
            let Some(value) = object.get(name) else {
                continue;
            };

            if matches(expected, value) {
                continue;
            }

            if let Some(coerced) = coerce(expected, value) {
                object.insert(name.clone(), coerced);
                continue;
            }

            return Err(SchemaError::WrongType {
                name: name.clone(),
                expected: expected.to_string(),
                actual: type_name(value).to_string(),
            });
        }
    }

    Ok(Value::Object(object))
}

fn matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        // Unrecognized schema types are not enforced.
        _ => true,
    }
}

fn coerce(expected: &str, value: &Value) -> Option<Value> {
    match (expected, value) {
        ("number", Value::String(s)) => s.trim().parse::<f64>().ok().and_then(|n| {
            serde_json::Number::from_f64(n).map(Value::Number)
        }),
        ("integer", Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        ("integer", Value::Number(n)) => {
            let f = n.as_f64()?;
            // `i64::MAX as f64` rounds up to 2^63, which `as i64` would
            // silently saturate; exclude it.
            let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
            (f.fract() == 0.0 && in_range).then(|| Value::from(f as i64))
        }
        ("boolean", Value::String(s)) => match s.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn city_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": { "type": "string" },
                "days": { "type": "integer" }
            },
            "required": ["city"]
        })
    }

    #[test]
    fn accepts_matching_arguments() {
        let args = json!({ "city": "Paris", "days": 3 });
        let validated = validate_arguments(&city_schema(), &args).unwrap();
        assert_eq!(validated, args);
    }

    #[test]
    fn rejects_missing_required() {
        let err = validate_arguments(&city_schema(), &json!({ "days": 3 })).unwrap_err();
        assert_eq!(err, SchemaError::MissingRequired("city".to_string()));
    }

    #[test]
    fn rejects_wrong_type() {
        let err = validate_arguments(&city_schema(), &json!({ "city": ["Paris"] })).unwrap_err();
        assert!(matches!(err, SchemaError::WrongType { .. }));
    }

    #[test]
    fn coerces_quoted_integer() {
        let validated =
            validate_arguments(&city_schema(), &json!({ "city": "Paris", "days": "3" })).unwrap();
        assert_eq!(validated["days"], json!(3));
    }

    #[test]
    fn coerces_whole_float_to_integer() {
        let validated =
            validate_arguments(&city_schema(), &json!({ "city": "Paris", "days": 3.0 })).unwrap();
        assert_eq!(validated["days"], json!(3));
    }

    #[test]
    fn rejects_whole_float_outside_integer_range() {
        let err = validate_arguments(&city_schema(), &json!({ "city": "Paris", "days": 1e19 }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::WrongType { .. }));

        let err = validate_arguments(&city_schema(), &json!({ "city": "Paris", "days": -1e19 }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::WrongType { .. }));
    }

    #[test]
    fn null_arguments_pass_when_nothing_required() {
        let schema = json!({ "type": "object", "properties": {} });
        let validated = validate_arguments(&schema, &Value::Null).unwrap();
        assert_eq!(validated, json!({}));
    }

    #[test]
    fn non_object_arguments_rejected() {
        let err = validate_arguments(&city_schema(), &json!("Paris")).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject("string".to_string()));
    }

    #[test]
    fn unknown_properties_pass_through() {
        let args = json!({ "city": "Paris", "units": "metric" });
        let validated = validate_arguments(&city_schema(), &args).unwrap();
        assert_eq!(validated["units"], json!("metric"));
    }
}
