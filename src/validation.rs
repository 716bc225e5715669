//! Configuration validation against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use aidbox_provider::schema::{Schema, Attribute};
//! use aidbox_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("id", Attribute::computed_string());
//!
//! assert!(validate(&schema, &json!({"name": "license-one"})).is_empty());
//!
//! // Computed attributes are set by the provider, never by configuration.
//! let diagnostics = validate(&schema, &json!({"name": "license-one", "id": "x"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("id".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Mode, Schema};
use serde_json::Value;

/// Validate a configuration value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - The value must be an object (null is treated as empty)
/// - Required attributes must be present and non-null
/// - Computed-only attributes must not be set
/// - Attributes not in the schema are rejected
/// - Attribute types must match the schema
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let empty = serde_json::Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        },
    };

    for name in schema.attribute_names() {
        let attr = &schema.attributes[name];
        validate_attribute(name, attr, obj.get(name), &mut diagnostics);
    }

    for name in obj.keys() {
        if !schema.attributes.contains_key(name) {
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", name))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(name.as_str()),
            );
        }
    }

    diagnostics
}

/// Validate a value, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    name: &str,
    attr: &Attribute,
    value: Option<&Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if attr.mode == Mode::Required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", name))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(name),
                );
            }
        },
        Some(_) if !attr.mode.is_configurable() => {
            diagnostics.push(
                Diagnostic::error(format!("Invalid configuration for '{}'", name))
                    .with_detail("This attribute is computed by the provider and cannot be set")
                    .with_attribute(name),
            );
        },
        Some(v) => {
            if !type_matches(attr.attr_type, v) {
                diagnostics.push(type_error(name, attr.attr_type, v));
            }
        },
    }
}

fn type_matches(attr_type: AttributeType, value: &Value) -> bool {
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    // JSON hosts may send whole numbers as floats.
    value.as_i64().is_some()
        || value
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
}

fn type_error(path: &str, expected: AttributeType, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected.name(),
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn license_like() -> Schema {
        Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("product", Attribute::optional_computed_string())
            .with_attribute("max_instances", Attribute::computed(AttributeType::Int64))
    }

    #[test]
    fn test_validate_required_string() {
        let schema = license_like();

        assert!(validate(&schema, &json!({"name": "test"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
        assert_eq!(
            diagnostics[0].detail.as_deref(),
            Some("Expected string, got number")
        );
    }

    #[test]
    fn test_validate_optional_computed_may_be_set() {
        let schema = license_like();
        assert!(validate(&schema, &json!({"name": "a", "product": "aidbox"})).is_empty());
        assert!(validate(&schema, &json!({"name": "a", "product": null})).is_empty());
    }

    #[test]
    fn test_validate_computed_only_rejected() {
        let schema = license_like();
        let diagnostics = validate(&schema, &json!({"name": "a", "max_instances": 3}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("max_instances".to_string()));
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("computed"));
    }

    #[test]
    fn test_validate_unknown_attribute() {
        let schema = license_like();
        let diagnostics = validate(&schema, &json!({"name": "a", "color": "red"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Unsupported attribute 'color'"));
    }

    #[test]
    fn test_validate_int64_and_bool() {
        let schema = Schema::v0()
            .with_attribute("count", Attribute::new(AttributeType::Int64, Mode::Optional))
            .with_attribute("flag", Attribute::new(AttributeType::Bool, Mode::Optional));

        assert!(is_valid(&schema, &json!({"count": 42, "flag": true})));
        assert!(is_valid(&schema, &json!({"count": 42.0})));
        assert!(!is_valid(&schema, &json!({"count": 42.5})));
        assert!(!is_valid(&schema, &json!({"flag": "yes"})));
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = license_like();
        let diagnostics = validate(&schema, &json!("just a string"));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_null_config_checks_required() {
        let schema = license_like();
        let diagnostics = validate(&schema, &Value::Null);
        assert_eq!(diagnostics.len(), 1);
        assert!(validate_result(&Schema::v0(), &Value::Null).is_ok());
    }
}
