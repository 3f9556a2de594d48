//! Dynamic values exchanged with the daemon and the records decoded from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One decoded entity: logical field name mapped to its (transformed) value.
pub type Record = IndexMap<String, Value>;

/// Wire-level value as carried by an XML-RPC request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Absent value (`<nil/>`), also used for "no target entity".
    #[default]
    Nil,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer (`i4`, `i8`, or `int`).
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// Text value.
    Str(String),
    /// Raw bytes (`base64`).
    Bytes(Vec<u8>),
    /// ISO-8601 timestamp kept in its wire form.
    DateTime(String),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Ordered name/value members.
    Struct(IndexMap<String, Value>),
}

/// Fault indicator extracted from a response element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Remote fault code.
    pub code: i64,
    /// Remote fault message.
    pub message: String,
}

impl Value {
    /// Convenience constructor for text values.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Integer payload, if any.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric payload widened to a float.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// Borrow the array items, if any.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the struct members, if any.
    #[must_use]
    pub const fn as_struct(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Whether this is the absent value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Interpret the value as a fault element (`{faultCode, faultString}`).
    #[must_use]
    pub fn as_fault(&self) -> Option<Fault> {
        let members = self.as_struct()?;
        let code = members.get("faultCode")?;
        let code = match code {
            Self::Int(code) => *code,
            Self::Str(code) => code.trim().parse().unwrap_or_default(),
            _ => 0,
        };
        let message = members
            .get("faultString")
            .and_then(Self::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Fault { code, message })
    }

    /// Render a primitive as it appears inside a batched call fragment.
    ///
    /// Composite values have no fragment form and render empty.
    #[must_use]
    pub fn fragment(&self) -> String {
        match self {
            Self::Bool(flag) => String::from(if *flag { "1" } else { "0" }),
            Self::Int(value) => value.to_string(),
            Self::Double(value) => value.to_string(),
            Self::Str(value) | Self::DateTime(value) => value.clone(),
            Self::Nil | Self::Bytes(_) | Self::Array(_) | Self::Struct(_) => String::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::Array(items)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Nil,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Self::Int)
                .or_else(|| number.as_f64().map(Self::Double))
                .unwrap_or(Self::Nil),
            serde_json::Value::String(text) => Self::Str(text),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(members) => Self::Struct(
                members
                    .into_iter()
                    .map(|(name, value)| (name, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fault_elements_are_recognised() {
        let mut members = IndexMap::new();
        members.insert("faultCode".to_string(), Value::Int(-501));
        members.insert("faultString".to_string(), Value::str("Unsupported target type"));
        let fault = Value::Struct(members).as_fault().expect("fault expected");
        assert_eq!(fault.code, -501);
        assert_eq!(fault.message, "Unsupported target type");

        assert!(Value::Array(vec![Value::Int(1)]).as_fault().is_none());
        assert!(Value::Struct(IndexMap::new()).as_fault().is_none());
    }

    #[test]
    fn fragments_render_primitives_only() {
        assert_eq!(Value::Nil.fragment(), "");
        assert_eq!(Value::Int(42).fragment(), "42");
        assert_eq!(Value::Bool(true).fragment(), "1");
        assert_eq!(Value::str("seedingtime").fragment(), "seedingtime");
        assert_eq!(Value::Array(vec![Value::Int(1)]).fragment(), "");
    }

    #[test]
    fn json_values_convert_and_serialize_back() -> anyhow::Result<()> {
        let value = Value::from(json!({"max_peers": 50, "ratio": 1.5, "dir": null}));
        let members = value.as_struct().expect("struct expected");
        assert_eq!(members.get("max_peers"), Some(&Value::Int(50)));
        assert_eq!(members.get("ratio"), Some(&Value::Double(1.5)));
        assert_eq!(members.get("dir"), Some(&Value::Nil));

        let rendered = serde_json::to_value(&value)?;
        assert_eq!(rendered, json!({"max_peers": 50, "ratio": 1.5, "dir": null}));
        Ok(())
    }
}
