//! WebAssembly value representation

use crate::module::ValueType;
use fhex::ToHex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime representation of WebAssembly values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Get the WebAssembly type of this value
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The zero value of the given type, used to fill pure locals
    pub fn zero(typ: ValueType) -> Value {
        match typ {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    /// Convert to i32, returning None if wrong type
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64, returning None if wrong type
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f32, returning None if wrong type
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64, returning None if wrong type
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a textual command-line argument against a declared type
    pub fn from_text(typ: ValueType, text: &str) -> Result<Self, String> {
        match typ {
            ValueType::I32 => text
                .parse::<i32>()
                .map(Value::I32)
                .map_err(|e| format!("failed to parse i32 {text:?}: {e}")),
            ValueType::I64 => text
                .parse::<i64>()
                .map(Value::I64)
                .map_err(|e| format!("failed to parse i64 {text:?}: {e}")),
            ValueType::F32 => text
                .parse::<f32>()
                .map(Value::F32)
                .map_err(|e| format!("failed to parse f32 {text:?}: {e}")),
            ValueType::F64 => text
                .parse::<f64>()
                .map(Value::F64)
                .map_err(|e| format!("failed to parse f64 {text:?}: {e}")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
        }
    }
}
