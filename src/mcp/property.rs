//! Tool argument schema and binding
//!
//! A [`PropertyList`] is both the declared parameter schema of a tool and,
//! once cloned and bound against caller input, the argument set handed to
//! the tool handler. The canonical schema held by the registry is never
//! mutated; every call binds into a fresh clone.

use serde_json::{json, Map, Value};

use crate::error::McpError;

/// Property value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Boolean,
    Integer,
    String,
}

impl PropertyKind {
    fn schema_name(self) -> &'static str {
        match self {
            PropertyKind::Boolean => "boolean",
            PropertyKind::Integer => "integer",
            PropertyKind::String => "string",
        }
    }
}

/// A typed property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl PropertyValue {
    fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Boolean,
            PropertyValue::Int(_) => PropertyKind::Integer,
            PropertyValue::Text(_) => PropertyKind::String,
        }
    }
}

/// One declared tool parameter
///
/// A property without a default is mandatory in a call. Integer properties
/// may declare an inclusive `[min, max]` range; caller values outside the
/// range are rejected during binding, never clamped.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    kind: PropertyKind,
    value: Option<PropertyValue>,
    has_default: bool,
    min: Option<i64>,
    max: Option<i64>,
}

impl Property {
    fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
            has_default: false,
            min: None,
            max: None,
        }
    }

    /// Required boolean property
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Boolean)
    }

    /// Boolean property with a default value
    pub fn boolean_with_default(name: impl Into<String>, default: bool) -> Self {
        let mut p = Self::new(name, PropertyKind::Boolean);
        p.value = Some(PropertyValue::Bool(default));
        p.has_default = true;
        p
    }

    /// Required integer property
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Integer)
    }

    /// Integer property with a default value
    pub fn integer_with_default(name: impl Into<String>, default: i64) -> Self {
        let mut p = Self::new(name, PropertyKind::Integer);
        p.value = Some(PropertyValue::Int(default));
        p.has_default = true;
        p
    }

    /// Required integer property with an inclusive range
    pub fn bounded_integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        debug_assert!(min <= max);
        let mut p = Self::new(name, PropertyKind::Integer);
        p.min = Some(min);
        p.max = Some(max);
        p
    }

    /// Ranged integer property with a default value
    pub fn bounded_integer_with_default(
        name: impl Into<String>,
        default: i64,
        min: i64,
        max: i64,
    ) -> Self {
        debug_assert!(min <= default && default <= max);
        let mut p = Self::bounded_integer(name, min, max);
        p.value = Some(PropertyValue::Int(default));
        p.has_default = true;
        p
    }

    /// Required string property
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    /// String property with a default value
    pub fn string_with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        let mut p = Self::new(name, PropertyKind::String);
        p.value = Some(PropertyValue::Text(default.into()));
        p.has_default = true;
        p
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    /// Try to assign a caller-supplied value
    ///
    /// Returns false when the value is missing, of the wrong type, or out of
    /// range; the property then keeps whatever it already holds. The caller
    /// decides whether an unassigned property is acceptable.
    fn try_assign(&mut self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match (self.kind, value) {
            (PropertyKind::Boolean, Value::Bool(b)) => {
                self.value = Some(PropertyValue::Bool(*b));
                true
            }
            (PropertyKind::Integer, Value::Number(n)) => match n.as_i64() {
                Some(i) if self.in_range(i) => {
                    self.value = Some(PropertyValue::Int(i));
                    true
                }
                _ => false,
            },
            (PropertyKind::String, Value::String(s)) => {
                self.value = Some(PropertyValue::Text(s.clone()));
                true
            }
            _ => false,
        }
    }

    fn in_range(&self, value: i64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// JSON Schema fragment for this property
    fn schema_entry(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("type".to_string(), json!(self.kind.schema_name()));
        if self.has_default {
            match &self.value {
                Some(PropertyValue::Bool(b)) => entry.insert("default".to_string(), json!(b)),
                Some(PropertyValue::Int(i)) => entry.insert("default".to_string(), json!(i)),
                Some(PropertyValue::Text(s)) => entry.insert("default".to_string(), json!(s)),
                None => None,
            };
        }
        if let Some(min) = self.min {
            entry.insert("minimum".to_string(), json!(min));
        }
        if let Some(max) = self.max {
            entry.insert("maximum".to_string(), json!(max));
        }
        Value::Object(entry)
    }
}

/// Ordered, name-unique collection of properties
///
/// Order is meaningful for schema export; lookup is by name.
#[derive(Debug, Clone, Default)]
pub struct PropertyList {
    properties: Vec<Property>,
}

impl PropertyList {
    /// Empty schema (tool takes no arguments)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from a list of properties; names must be unique
    pub fn from_properties(properties: Vec<Property>) -> Self {
        debug_assert!(
            properties
                .iter()
                .enumerate()
                .all(|(i, p)| properties[..i].iter().all(|q| q.name != p.name)),
            "duplicate property name in schema"
        );
        Self { properties }
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Read a bound boolean value
    pub fn boolean(&self, name: &str) -> Result<bool, McpError> {
        match self.bound_value(name, PropertyKind::Boolean)? {
            PropertyValue::Bool(b) => Ok(*b),
            _ => unreachable!(),
        }
    }

    /// Read a bound integer value
    pub fn integer(&self, name: &str) -> Result<i64, McpError> {
        match self.bound_value(name, PropertyKind::Integer)? {
            PropertyValue::Int(i) => Ok(*i),
            _ => unreachable!(),
        }
    }

    /// Read a bound string value
    pub fn string(&self, name: &str) -> Result<&str, McpError> {
        match self.bound_value(name, PropertyKind::String)? {
            PropertyValue::Text(s) => Ok(s.as_str()),
            _ => unreachable!(),
        }
    }

    fn bound_value(&self, name: &str, requested: PropertyKind) -> Result<&PropertyValue, McpError> {
        let property = self.get(name).ok_or_else(|| McpError::UnknownProperty {
            name: name.to_string(),
        })?;
        let value = property
            .value
            .as_ref()
            .ok_or_else(|| McpError::UnboundProperty {
                name: name.to_string(),
            })?;
        if value.kind() != requested {
            return Err(McpError::PropertyTypeMismatch {
                name: name.to_string(),
                expected: value.kind().schema_name(),
                requested: requested.schema_name(),
            });
        }
        Ok(value)
    }

    /// Bind caller-supplied arguments against this schema
    ///
    /// Clones the schema and overwrites values from `arguments` in schema
    /// order. A caller value of the wrong type or outside a declared range
    /// is treated as not supplied, so the default (if any) stands. A
    /// property left with neither default nor caller value aborts the bind.
    pub fn bind(&self, arguments: Option<&Map<String, Value>>) -> Result<PropertyList, McpError> {
        let mut bound = self.clone();
        for property in &mut bound.properties {
            let supplied = arguments.and_then(|args| args.get(property.name.as_str()));
            let assigned = property.try_assign(supplied);
            if !assigned && !property.has_default {
                return Err(McpError::MissingArgument {
                    name: property.name.clone(),
                });
            }
        }
        Ok(bound)
    }

    /// JSON Schema for the whole parameter list
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for property in &self.properties {
            properties.insert(property.name.clone(), property.schema_entry());
        }

        let required: Vec<&str> = self
            .properties
            .iter()
            .filter(|p| !p.has_default)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = Map::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        Value::Object(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_bind_uses_caller_values_and_defaults() {
        let schema = PropertyList::from_properties(vec![
            Property::string("question"),
            Property::bounded_integer_with_default("quality", 80, 1, 100),
        ]);

        let supplied = args(json!({"question": "what is this?"}));
        let bound = schema.bind(Some(&supplied)).unwrap();

        assert_eq!(bound.string("question").unwrap(), "what is this?");
        assert_eq!(bound.integer("quality").unwrap(), 80);
    }

    #[test]
    fn test_bind_missing_required_property() {
        let schema = PropertyList::from_properties(vec![Property::string("msg")]);

        let err = schema.bind(None).unwrap_err();
        assert_eq!(err.to_string(), "Missing valid argument: msg");
    }

    #[test]
    fn test_bind_rejects_out_of_range_integer() {
        let schema =
            PropertyList::from_properties(vec![Property::bounded_integer("volume", 0, 100)]);

        let supplied = args(json!({"volume": 150}));
        let err = schema.bind(Some(&supplied)).unwrap_err();
        assert_eq!(err.to_string(), "Missing valid argument: volume");
    }

    #[test]
    fn test_bind_wrong_type_falls_back_to_default() {
        let schema = PropertyList::from_properties(vec![Property::string_with_default(
            "theme", "light",
        )]);

        let supplied = args(json!({"theme": 3}));
        let bound = schema.bind(Some(&supplied)).unwrap();
        assert_eq!(bound.string("theme").unwrap(), "light");
    }

    #[test]
    fn test_bind_out_of_range_falls_back_to_default() {
        let schema = PropertyList::from_properties(vec![
            Property::bounded_integer_with_default("brightness", 50, 0, 100),
        ]);

        let supplied = args(json!({"brightness": 400}));
        let bound = schema.bind(Some(&supplied)).unwrap();
        assert_eq!(bound.integer("brightness").unwrap(), 50);
    }

    #[test]
    fn test_bind_does_not_mutate_schema() {
        let schema = PropertyList::from_properties(vec![Property::string("msg")]);

        let supplied = args(json!({"msg": "hi"}));
        let _ = schema.bind(Some(&supplied)).unwrap();

        assert!(!schema.get("msg").unwrap().is_bound());
    }

    #[test]
    fn test_bind_boolean() {
        let schema = PropertyList::from_properties(vec![Property::boolean("enabled")]);

        let supplied = args(json!({"enabled": true}));
        let bound = schema.bind(Some(&supplied)).unwrap();
        assert!(bound.boolean("enabled").unwrap());
    }

    #[test]
    fn test_typed_accessor_mismatch() {
        let schema = PropertyList::from_properties(vec![Property::string_with_default("s", "x")]);
        let bound = schema.bind(None).unwrap();

        let err = bound.integer("s").unwrap_err();
        assert!(matches!(err, McpError::PropertyTypeMismatch { .. }));
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = PropertyList::from_properties(vec![
            Property::string("url"),
            Property::bounded_integer_with_default("quality", 80, 1, 100),
        ]);

        let json = schema.input_schema();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["url"]["type"], "string");
        assert_eq!(json["properties"]["quality"]["type"], "integer");
        assert_eq!(json["properties"]["quality"]["default"], 80);
        assert_eq!(json["properties"]["quality"]["minimum"], 1);
        assert_eq!(json["properties"]["quality"]["maximum"], 100);
        assert_eq!(json["required"], json!(["url"]));
    }

    #[test]
    fn test_input_schema_empty() {
        let schema = PropertyList::new();
        let json = schema.input_schema();
        assert_eq!(json["type"], "object");
        assert!(json["properties"].as_object().unwrap().is_empty());
        assert!(json.get("required").is_none());
    }
}
