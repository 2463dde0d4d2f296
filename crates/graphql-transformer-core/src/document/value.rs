use std::fmt;

use async_graphql_value::ConstValue;
use indexmap::IndexMap;

/// A constant GraphQL value, as found in directive arguments and default values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) | Value::Enum(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// JSON view of the value. Enum values become strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(value) => serde_json::Value::from(*value),
            Value::Float(value) => serde_json::Number::from_f64(*value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(value) | Value::Enum(value) => serde_json::Value::String(value.clone()),
            Value::Boolean(value) => serde_json::Value::Bool(*value),
            Value::List(values) => serde_json::Value::Array(values.iter().map(Value::to_json).collect()),
            Value::Object(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<ConstValue> for Value {
    fn from(value: ConstValue) -> Self {
        match value {
            ConstValue::Null => Value::Null,
            ConstValue::Number(number) => number
                .as_i64()
                .map(Value::Int)
                .or_else(|| number.as_f64().map(Value::Float))
                .unwrap_or(Value::Null),
            ConstValue::String(value) => Value::String(value),
            ConstValue::Boolean(value) => Value::Boolean(value),
            ConstValue::Binary(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            ConstValue::Enum(name) => Value::Enum(name.to_string()),
            ConstValue::List(values) => Value::List(values.into_iter().map(Value::from).collect()),
            ConstValue::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::String(value) => write_quoted(value, f),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Enum(value) => f.write_str(value),
            Value::List(values) => {
                f.write_str("[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (idx, (name, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

pub(crate) fn write_quoted(s: &str, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\r' => f.write_str("\\r"),
            '\n' => f.write_str("\\n"),
            '\t' => f.write_str("\\t"),
            '"' => f.write_str("\\\""),
            '\\' => f.write_str("\\\\"),
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32),
            c => write!(f, "{c}"),
        }?;
    }
    f.write_str("\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals() {
        let value = Value::Object(IndexMap::from([
            ("allow".to_owned(), Value::Enum("owner".into())),
            ("operations".to_owned(), Value::from(vec!["read", "update"])),
            ("ttl".to_owned(), Value::Int(300)),
            ("ratio".to_owned(), Value::Float(1.0)),
            ("note".to_owned(), Value::from("say \"hi\"\n")),
        ]));

        insta::assert_snapshot!(value, @r###"{allow: owner, operations: ["read", "update"], ttl: 300, ratio: 1.0, note: "say \"hi\"\n"}"###);
    }

    #[test]
    fn enums_become_json_strings() {
        let value = Value::List(vec![Value::Enum("groups".into()), Value::Null]);

        assert_eq!(value.to_json(), serde_json::json!(["groups", null]));
    }
}
