//! Shape Module
//!
//! Compiles a JSON shape descriptor into a structural validator.
//!
//! The descriptor vocabulary is a small subset of JSON-Schema:
//! `type` (a name or a list of names), `items`, `properties`, `required`,
//! `additionalProperties` and `enum`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{CacheError, Result};

// == Value Type ==
/// JSON value categories a shape can accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ValueType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(ValueType::Null),
            "boolean" => Some(ValueType::Boolean),
            "integer" => Some(ValueType::Integer),
            "number" => Some(ValueType::Number),
            "string" => Some(ValueType::String),
            "array" => Some(ValueType::Array),
            "object" => Some(ValueType::Object),
            _ => None,
        }
    }

    /// Reports whether `value` belongs to this category.
    ///
    /// Integers are numbers, and a float with no fractional part counts as an
    /// integer.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueType::Null => value.is_null(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
                }
                _ => false,
            },
            ValueType::Number => value.is_number(),
            ValueType::String => value.is_string(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueType::Integer,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Object(_) => ValueType::Object,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "null",
            ValueType::Boolean => "boolean",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

// == Shape Mismatch ==
/// First structural violation found while checking a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// JSON path to the offending node, `$` for the root
    pub path: String,
    pub reason: String,
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

// == Shape ==
/// A compiled shape descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Accepted categories, `None` accepts anything
    types: Option<Vec<ValueType>>,
    items: Option<Box<Shape>>,
    properties: BTreeMap<String, Shape>,
    required: BTreeSet<String>,
    additional_properties: bool,
    allowed: Option<Vec<Value>>,
}

impl Shape {
    // == Compile ==
    /// Compiles a root descriptor. The root must describe an object, since
    /// only objects are storable.
    pub fn compile(descriptor: &Value) -> Result<Self> {
        let shape = Self::compile_node(descriptor, "$")?;
        match &shape.types {
            Some(types) if types.as_slice() == [ValueType::Object] => Ok(shape),
            _ => Err(CacheError::Configuration(
                "shape descriptor root must have type \"object\"".to_string(),
            )),
        }
    }

    fn compile_node(descriptor: &Value, path: &str) -> Result<Self> {
        let spec = descriptor.as_object().ok_or_else(|| {
            CacheError::Configuration(format!("{path}: shape descriptor must be an object"))
        })?;

        let types = compile_types(spec, path)?;

        let items = match spec.get("items") {
            Some(items) => Some(Box::new(Self::compile_node(items, &format!("{path}[]"))?)),
            None => None,
        };

        let mut properties = BTreeMap::new();
        if let Some(props) = spec.get("properties") {
            let props = props.as_object().ok_or_else(|| {
                CacheError::Configuration(format!("{path}: \"properties\" must be an object"))
            })?;
            for (name, child) in props {
                let child_path = format!("{path}.{name}");
                properties.insert(name.clone(), Self::compile_node(child, &child_path)?);
            }
        }

        let mut required = BTreeSet::new();
        if let Some(names) = spec.get("required") {
            let names = names.as_array().ok_or_else(|| {
                CacheError::Configuration(format!("{path}: \"required\" must be an array"))
            })?;
            for name in names {
                let name = name.as_str().ok_or_else(|| {
                    CacheError::Configuration(format!(
                        "{path}: \"required\" entries must be strings"
                    ))
                })?;
                if !properties.contains_key(name) {
                    return Err(CacheError::Configuration(format!(
                        "{path}: required field \"{name}\" is not listed in \"properties\""
                    )));
                }
                required.insert(name.to_string());
            }
        }

        let additional_properties = match spec.get("additionalProperties") {
            None => true,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => {
                return Err(CacheError::Configuration(format!(
                    "{path}: \"additionalProperties\" must be a boolean"
                )))
            }
        };

        let allowed = match spec.get("enum") {
            None => None,
            Some(Value::Array(values)) if !values.is_empty() => Some(values.clone()),
            Some(_) => {
                return Err(CacheError::Configuration(format!(
                    "{path}: \"enum\" must be a non-empty array"
                )))
            }
        };

        Ok(Self {
            types,
            items,
            properties,
            required,
            additional_properties,
            allowed,
        })
    }

    // == Check ==
    /// Checks `value` against the shape, returning the first mismatch.
    pub fn check(&self, value: &Value) -> std::result::Result<(), ShapeMismatch> {
        self.check_at(value, "$")
    }

    /// Returns true when `value` conforms to the shape.
    pub fn is_valid(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    fn check_at(&self, value: &Value, path: &str) -> std::result::Result<(), ShapeMismatch> {
        if let Some(types) = &self.types {
            if !types.iter().any(|t| t.accepts(value)) {
                let expected = types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" | ");
                return Err(mismatch(
                    path,
                    format!("expected {expected}, found {}", ValueType::of(value)),
                ));
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                return Err(mismatch(path, "value is not one of the allowed values"));
            }
        }

        match value {
            Value::Array(elements) => {
                if let Some(items) = &self.items {
                    for (index, element) in elements.iter().enumerate() {
                        items.check_at(element, &format!("{path}[{index}]"))?;
                    }
                }
            }
            Value::Object(fields) => self.check_fields(fields, path)?,
            _ => {}
        }

        Ok(())
    }

    fn check_fields(
        &self,
        fields: &Map<String, Value>,
        path: &str,
    ) -> std::result::Result<(), ShapeMismatch> {
        for name in &self.required {
            if !fields.contains_key(name) {
                return Err(mismatch(path, format!("missing required field \"{name}\"")));
            }
        }

        for (name, field) in fields {
            let child_path = format!("{path}.{name}");
            match self.properties.get(name) {
                Some(shape) => shape.check_at(field, &child_path)?,
                None if !self.additional_properties => {
                    return Err(mismatch(&child_path, "unexpected field"));
                }
                None => {}
            }
        }

        Ok(())
    }
}

fn compile_types(spec: &Map<String, Value>, path: &str) -> Result<Option<Vec<ValueType>>> {
    let names: Vec<&str> = match spec.get("type") {
        None => return Ok(None),
        Some(Value::String(name)) if name == "any" => return Ok(None),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) if !names.is_empty() => names
            .iter()
            .map(|n| {
                n.as_str().ok_or_else(|| {
                    CacheError::Configuration(format!("{path}: type names must be strings"))
                })
            })
            .collect::<Result<_>>()?,
        Some(_) => {
            return Err(CacheError::Configuration(format!(
                "{path}: \"type\" must be a name or a non-empty list of names"
            )))
        }
    };

    names
        .into_iter()
        .map(|name| {
            ValueType::from_name(name).ok_or_else(|| {
                CacheError::Configuration(format!("{path}: unknown type \"{name}\""))
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn mismatch(path: &str, reason: impl Into<String>) -> ShapeMismatch {
    ShapeMismatch {
        path: path.to_string(),
        reason: reason.into(),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_shape() -> Shape {
        Shape::compile(&json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" },
                "email": { "type": ["string", "null"] },
                "tags": { "type": "array", "items": { "type": "string" } },
                "role": { "type": "string", "enum": ["admin", "member"] }
            },
            "required": ["name", "age"]
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_document() {
        let shape = user_shape();
        let value = json!({
            "name": "ada",
            "age": 36,
            "email": null,
            "tags": ["math", "engines"],
            "role": "admin"
        });
        assert!(shape.is_valid(&value));
    }

    #[test]
    fn test_optional_fields_may_be_absent() {
        let shape = user_shape();
        assert!(shape.is_valid(&json!({ "name": "ada", "age": 36 })));
    }

    #[test]
    fn test_missing_required_field() {
        let shape = user_shape();
        let err = shape.check(&json!({ "name": "ada" })).unwrap_err();
        assert_eq!(err.path, "$");
        assert!(err.reason.contains("age"));
    }

    #[test]
    fn test_wrong_field_type() {
        let shape = user_shape();
        let err = shape
            .check(&json!({ "name": "ada", "age": "thirty-six" }))
            .unwrap_err();
        assert_eq!(err.path, "$.age");
        assert_eq!(err.reason, "expected integer, found string");
    }

    #[test]
    fn test_nested_array_item_mismatch() {
        let shape = user_shape();
        let err = shape
            .check(&json!({ "name": "ada", "age": 36, "tags": ["ok", 7] }))
            .unwrap_err();
        assert_eq!(err.path, "$.tags[1]");
    }

    #[test]
    fn test_enum_restriction() {
        let shape = user_shape();
        assert!(!shape.is_valid(&json!({ "name": "ada", "age": 36, "role": "owner" })));
    }

    #[test]
    fn test_integer_accepts_whole_float() {
        assert!(ValueType::Integer.accepts(&json!(3.0)));
        assert!(!ValueType::Integer.accepts(&json!(3.5)));
        assert!(ValueType::Number.accepts(&json!(3)));
    }

    #[test]
    fn test_additional_properties_rejected() {
        let shape = Shape::compile(&json!({
            "type": "object",
            "properties": { "id": { "type": "integer" } },
            "additionalProperties": false
        }))
        .unwrap();
        assert!(shape.is_valid(&json!({ "id": 1 })));
        let err = shape.check(&json!({ "id": 1, "extra": true })).unwrap_err();
        assert_eq!(err.path, "$.extra");
    }

    #[test]
    fn test_check_does_not_mutate_input() {
        let shape = user_shape();
        let value = json!({ "name": "ada", "age": 36 });
        let before = value.clone();
        let _ = shape.check(&value);
        assert_eq!(value, before);
    }

    #[test]
    fn test_compile_rejects_non_object_root() {
        let err = Shape::compile(&json!({ "type": "string" })).unwrap_err();
        assert!(matches!(err, CacheError::Configuration(_)));
        assert!(Shape::compile(&json!({})).is_err());
        assert!(Shape::compile(&json!("object")).is_err());
    }

    #[test]
    fn test_compile_rejects_malformed_descriptors() {
        let cases = vec![
            json!({ "type": "object", "properties": { "x": { "type": "float" } } }),
            json!({ "type": "object", "required": ["missing"] }),
            json!({ "type": "object", "additionalProperties": "no" }),
            json!({ "type": "object", "properties": [] }),
            json!({ "type": [] }),
            json!({ "type": "object", "properties": { "x": { "enum": [] } } }),
        ];
        for descriptor in cases {
            assert!(
                matches!(Shape::compile(&descriptor), Err(CacheError::Configuration(_))),
                "descriptor should be rejected: {descriptor}"
            );
        }
    }

    #[test]
    fn test_any_field_accepts_everything() {
        let shape = Shape::compile(&json!({
            "type": "object",
            "properties": { "payload": {} }
        }))
        .unwrap();
        assert!(shape.is_valid(&json!({ "payload": [1, "two", null] })));
        assert!(shape.is_valid(&json!({ "payload": { "deep": true } })));
    }
}
