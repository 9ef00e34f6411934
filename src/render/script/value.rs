use std::collections::BTreeMap;
use std::fmt;

use super::ScriptError;

/// Runtime value of the page-body language
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Map(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Str(s) => !(s.is_empty() || s == "0"),
            Value::Map(m) => !m.is_empty(),
        }
    }

    /// String form used by `echo` and `.`; maps have none
    pub fn to_output(&self) -> Result<String, ScriptError> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(true) => Ok("1".to_string()),
            Value::Bool(false) => Ok(String::new()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Str(s) => Ok(s.clone()),
            Value::Map(_) => Err(ScriptError::Type("array to string conversion".to_string())),
        }
    }

    /// `==` compares string forms
    pub fn loose_eq(&self, other: &Value) -> Result<bool, ScriptError> {
        match (self, other) {
            (Value::Map(a), Value::Map(b)) => Ok(a == b),
            _ => Ok(self.to_output()? == other.to_output()?),
        }
    }

    /// Integer coercion for helper arguments: ints, bools and numeric strings
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Null | Value::Map(_) => None,
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Str(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::Map(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Value::from_json(v)))
                    .collect(),
            ),
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Map(m) => write!(f, "array({})", m.len()),
            other => write!(f, "{}", other.to_output().unwrap_or_default()),
        }
    }
}
