//! Schema validation helpers.
//!
//! This module validates `serde_json::Value` configuration against a
//! [`Schema`] before any API call is issued, producing detailed diagnostics.
//!
//! # Example
//!
//! ```
//! use m3ter_provider::schema::{Attribute, AttributeType, Schema};
//! use m3ter_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required(AttributeType::String))
//!     .with_attribute("quantity", Attribute::optional(AttributeType::Int64));
//!
//! let diagnostics = validate(&schema, &json!({"name": "Storage", "quantity": 2}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "Storage", "quantity": "two"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("quantity".to_string()));
//! ```

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::schema::{Attribute, AttributeType, Constraint, Diagnostic, Schema};

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema, recursively through lists,
///   maps, and objects
/// - Constraints are enforced on present values
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return diagnostics,
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(attr, obj.get(name.as_str()), name, &mut diagnostics);
    }
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with
/// the diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
///
/// Use [`validate`] to get detailed error information.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Computed-only attributes are filled in by the provider.
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            // Constraints only make sense on values of the right type.
            if diagnostics.len() == before {
                for constraint in &attr.constraints {
                    validate_constraint(constraint, v, path, diagnostics);
                }
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int32 => {
            let in_range = value
                .as_f64()
                .map_or(false, |f| f >= i32::MIN as f64 && f <= i32::MAX as f64);
            if !is_integer(value) || !in_range {
                diagnostics.push(type_error(path, "int32", value));
            }
        }
        AttributeType::Int64 => {
            if !is_integer(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "list", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
        AttributeType::Object(attrs) => {
            if let Some(obj) = value.as_object() {
                validate_object(attrs, obj, path, diagnostics);
            } else {
                diagnostics.push(type_error(path, "object", value));
            }
        }
        AttributeType::Dynamic => {
            // Dynamic accepts any value; the mapper rejects unsupported
            // custom-field scalars with its own diagnostics.
        }
    }
}

fn validate_object(
    attrs: &HashMap<String, Attribute>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, attr) in attrs {
        let attr_path = format!("{}.{}", path, name);
        validate_attribute(attr, obj.get(name.as_str()), &attr_path, diagnostics);
    }
}

fn validate_constraint(
    constraint: &Constraint,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match constraint {
        Constraint::LengthBetween(min, max) => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len < *min || len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!(
                                "Length must be between {} and {}, got {}",
                                min, max, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::LengthAtLeast(min) => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len < *min {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!("Length must be at least {}, got {}", min, len))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::LengthAtMost(max) => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count();
                if len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid length for attribute '{}'", path))
                            .with_detail(format!("Length must be at most {}, got {}", max, len))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::OneOf(allowed) => {
            if let Some(s) = value.as_str() {
                if !allowed.iter().any(|a| a == s) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!("Value must be one of: {}", allowed.join(", ")))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::Matches { pattern, message } => {
            if let Some(s) = value.as_str() {
                match Regex::new(pattern) {
                    Ok(re) => {
                        if !re.is_match(s) {
                            diagnostics.push(
                                Diagnostic::error(format!(
                                    "Invalid value for attribute '{}'",
                                    path
                                ))
                                .with_detail(message.clone())
                                .with_attribute(path),
                            );
                        }
                    }
                    Err(e) => {
                        diagnostics.push(
                            Diagnostic::error(format!(
                                "Invalid constraint pattern on attribute '{}'",
                                path
                            ))
                            .with_detail(e.to_string())
                            .with_attribute(path),
                        );
                    }
                }
            }
        }
        Constraint::NumberOneOf(allowed) => {
            if let Some(n) = value.as_f64() {
                if !allowed.iter().any(|a| *a == n) {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!(
                                "Value must be one of: {}",
                                allowed
                                    .iter()
                                    .map(|a| a.to_string())
                                    .collect::<Vec<_>>()
                                    .join(", ")
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::ElementsOneOf(allowed) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    if let Some(s) = elem.as_str() {
                        if !allowed.iter().any(|a| a == s) {
                            diagnostics.push(
                                Diagnostic::error(format!(
                                    "Invalid value for attribute '{}.{}'",
                                    path, i
                                ))
                                .with_detail(format!(
                                    "Value must be one of: {}",
                                    allowed.join(", ")
                                ))
                                .with_attribute(format!("{}.{}", path, i)),
                            );
                        }
                    }
                }
            }
        }
        Constraint::AtLeast(min) => {
            if let Some(n) = value.as_f64() {
                if n < *min {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                            .with_detail(format!("Value must be at least {}, got {}", min, n))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::SizeBetween(min, max) => {
            if let Some(arr) = value.as_array() {
                let len = arr.len();
                if len < *min || len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid size for attribute '{}'", path))
                            .with_detail(format!(
                                "List must contain between {} and {} items, got {}",
                                min, max, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
        Constraint::SizeAtMost(max) => {
            if let Some(arr) = value.as_array() {
                let len = arr.len();
                if len > *max {
                    diagnostics.push(
                        Diagnostic::error(format!("Invalid size for attribute '{}'", path))
                            .with_detail(format!(
                                "List must contain at most {} items, got {}",
                                max, len
                            ))
                            .with_attribute(path),
                    );
                }
            }
        }
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

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            if n.as_i64().is_some() {
                true
            } else if let Some(f) = n.as_f64() {
                f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
            } else {
                false
            }
        }
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}
