use std::fmt;

use serde::{Deserialize, Serialize};

/// A single scalar simulator parameter.
///
/// Deserializes from bare JSON scalars: `5` becomes `Int`, `5.0` becomes `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Identity used when values are compared for grouping.
    ///
    /// Carries the variant so `Int(5)` and `Float(5.0)` never collapse, and
    /// compares floats bitwise so the key is usable in hash maps.
    pub fn canonical_key(&self) -> String {
        match self {
            Self::Bool(value) => format!("b:{value}"),
            Self::Int(value) => format!("i:{value}"),
            Self::Float(value) => format!("f:{:016x}", value.to_bits()),
            Self::Text(value) => format!("s:{value}"),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json_scalars() {
        let values: Vec<ParameterValue> =
            serde_json::from_str(r#"[true, 3, 2.5, "noshiro"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ParameterValue::Bool(true),
                ParameterValue::Int(3),
                ParameterValue::Float(2.5),
                ParameterValue::Text("noshiro".to_string()),
            ]
        );
    }

    #[test]
    fn test_canonical_key_separates_int_and_float() {
        let int = ParameterValue::Int(5);
        let float = ParameterValue::Float(5.0);
        assert_eq!(int.to_string(), float.to_string());
        assert_ne!(int.canonical_key(), float.canonical_key());
        assert_eq!(float.canonical_key(), ParameterValue::from(5.0).canonical_key());
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(ParameterValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(ParameterValue::Float(0.5).as_f64(), Some(0.5));
        assert_eq!(ParameterValue::from("x").as_f64(), None);
    }
}
