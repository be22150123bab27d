//! Configuration validation against a [`Schema`].
//!
//! Values arrive from the host as JSON. Validation walks the schema, not the
//! value, so unexpected keys are ignored and every attribute the schema
//! names is checked exactly once. A value equal to the unknown sentinel is
//! accepted for any type: it will only be known after apply.
//!
//! # Example
//!
//! ```
//! use onos_provider::schema::{Attribute, Schema};
//! use onos_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("appid", Attribute::required_string())
//!     .with_attribute("priority", Attribute::required_int64());
//!
//! let valid = json!({"appid": "org.onosproject.cli", "priority": 100});
//! assert!(validate(&schema, &valid).is_empty());
//!
//! let invalid = json!({"appid": "org.onosproject.cli", "priority": "high"});
//! let diagnostics = validate(&schema, &invalid);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("priority".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};
use crate::value::is_unknown;
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns one diagnostic per problem found; an empty list means the value
/// is valid. Computed-only attributes are skipped.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], returning `Err` with the diagnostics when invalid.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Whether `value` has the JSON shape of `attr_type`, element-wise for sets.
pub(crate) fn matches_type(attr_type: &AttributeType, value: &Value) -> bool {
    if is_unknown(value) {
        return true;
    }
    match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => is_int64(value),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::Set(element_type) => value
            .as_array()
            .is_some_and(|items| items.iter().all(|item| matches_type(element_type, item))),
    }
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let diagnostic = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            diagnostics.push(if path.is_empty() {
                diagnostic
            } else {
                diagnostic.with_attribute(path)
            });
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
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
        },
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if is_unknown(value) {
        return;
    }
    match attr_type {
        AttributeType::Set(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, item, &item_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, attr_type, value)),
        },
        scalar => {
            if !matches_type(scalar, value) {
                diagnostics.push(type_error(path, scalar, value));
            }
        },
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (nested.nesting_mode, value) {
        (_, None | Some(Value::Null)) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail(format!("At least {} block(s) required", nested.min_items))
                        .with_attribute(path),
                );
            }
        },
        (BlockNestingMode::Single, Some(v)) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List, Some(Value::Array(items))) => {
            let len = u32::try_from(items.len()).unwrap_or(u32::MAX);
            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
        (BlockNestingMode::List, Some(v)) => diagnostics.push(
            Diagnostic::error(format!("Expected list for block '{}'", path))
                .with_detail(format!("Got {}", value_type_name(v)))
                .with_attribute(path),
        ),
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
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
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64),
        _ => false,
    }
}

fn type_error(path: &str, expected: &AttributeType, got: &Value) -> Diagnostic {
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
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use crate::value::UNKNOWN_VALUE;
    use serde_json::json;

    fn intent_schema() -> Schema {
        Schema::v0().with_attribute("id", Attribute::computed_string()).with_block(
            "intent",
            NestedBlock::required_single(
                Block::new()
                    .with_attribute("id", Attribute::computed_string())
                    .with_attribute("appid", Attribute::required_string())
                    .with_attribute("key", Attribute::required_string())
                    .with_attribute("priority", Attribute::required_int64())
                    .with_attribute("one", Attribute::optional_string()),
            ),
        )
    }

    #[test]
    fn test_validate_intent_config() {
        let config = json!({
            "intent": {
                "appid": "org.onosproject.cli",
                "key": "0x99999",
                "priority": 100,
                "one": "00:00:00:00:00:99/None"
            }
        });
        assert!(validate(&intent_schema(), &config).is_empty());
    }

    #[test]
    fn test_missing_required_block() {
        let diagnostics = validate(&intent_schema(), &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("intent".to_string()));
    }

    #[test]
    fn test_nested_errors_carry_paths() {
        let diagnostics = validate(
            &intent_schema(),
            &json!({"intent": {"appid": 7, "priority": "high"}}),
        );
        let mut paths: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.clone())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["intent.appid", "intent.key", "intent.priority"]);
    }

    #[test]
    fn test_computed_attribute_skipped() {
        let config = json!({
            "id": 123,
            "intent": {"id": false, "appid": "a", "key": "k", "priority": 1}
        });
        assert!(validate(&intent_schema(), &config).is_empty());
    }

    #[test]
    fn test_unknown_values_accepted() {
        let config = json!({
            "intent": {"appid": UNKNOWN_VALUE, "key": "k", "priority": UNKNOWN_VALUE}
        });
        assert!(validate(&intent_schema(), &config).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("priority", Attribute::required_int64());

        assert!(is_valid(&schema, &json!({"priority": 42})));
        assert!(is_valid(&schema, &json!({"priority": 42.0})));
        assert!(!is_valid(&schema, &json!({"priority": 42.5})));
        assert!(!is_valid(&schema, &json!({"priority": "42"})));
    }

    #[test]
    fn test_set_element_paths() {
        let schema = Schema::v0().with_attribute(
            "ipaddresses",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                crate::schema::AttributeFlags::optional(),
            ),
        );

        assert!(is_valid(&schema, &json!({"ipaddresses": ["10.0.0.3"]})));

        let diagnostics = validate(&schema, &json!({"ipaddresses": ["10.0.0.3", 4]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("ipaddresses.1".to_string()));

        let diagnostics = validate(&schema, &json!({"ipaddresses": "10.0.0.3"}));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_list_block_constraints() {
        let schema = Schema::v0().with_block(
            "locations",
            NestedBlock::list(Block::new().with_attribute("port", Attribute::required_string()))
                .with_min_items(1),
        );

        assert!(is_valid(&schema, &json!({"locations": [{"port": "1"}]})));

        let diagnostics = validate(&schema, &json!({"locations": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(&schema, &json!({"locations": [{"port": 1}]}));
        assert_eq!(diagnostics[0].attribute, Some("locations.0.port".to_string()));

        let diagnostics = validate(&schema, &json!({"locations": {"port": "1"}}));
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_matches_type() {
        let set = AttributeType::set(AttributeType::String);
        assert!(matches_type(&set, &json!(["a", "b"])));
        assert!(!matches_type(&set, &json!(["a", 1])));
        assert!(matches_type(&AttributeType::Bool, &json!(true)));
        assert!(!matches_type(&AttributeType::String, &json!(null)));
    }

    #[test]
    fn test_validate_result_and_root_shape() {
        let schema = Schema::v0().with_attribute("host", Attribute::required_string());

        assert!(validate_result(&schema, &json!({"host": "http://onos:8181"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert_eq!(diagnostics[0].attribute, None);
    }
}
