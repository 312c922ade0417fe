//! Cell data types and typed values.
//!
//! XMLA responses declare cell types per statement (`xsi:type` on the
//! `<Value>` element); when a cell carries no declared type the measure's
//! static type applies. Coercion is explicit: [`Value::parse`] returns
//! `None` for unparseable text and the caller decides null-vs-fail.

use serde::{Deserialize, Serialize};

/// Declared data type of a measure or cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    String,
    Int,
    Float,
    Decimal,
    Bool,
    Date,
}

impl DataType {
    /// Map an `xsi:type` attribute to a data type.
    ///
    /// Unknown types fall back to `String`, which keeps the raw text.
    pub fn from_xsd(name: &str) -> Self {
        let name = name.strip_prefix("xsd:").unwrap_or(name);
        match name {
            "int" | "integer" | "long" | "short" | "unsignedInt" | "unsignedLong" => DataType::Int,
            "double" | "float" => DataType::Float,
            "decimal" => DataType::Decimal,
            "boolean" => DataType::Bool,
            "date" | "dateTime" => DataType::Date,
            _ => DataType::String,
        }
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date or datetime text, kept verbatim.
    Date(String),
}

impl Value {
    /// Parse text into a value of the given type.
    ///
    /// Returns `None` when the text does not parse as the declared type.
    /// Non-finite floats parse to `Value::Null`: OLAP servers emit INF/NaN
    /// for divide-by-zero cells and those render as empty.
    pub fn parse(text: &str, ty: DataType) -> Option<Value> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Value::Null);
        }

        match ty {
            DataType::String => Some(Value::String(text.to_string())),
            DataType::Int => text.parse::<i64>().ok().map(Value::Int),
            DataType::Float | DataType::Decimal => {
                let f: f64 = text.parse().ok()?;
                if f.is_finite() {
                    Some(Value::Float(f))
                } else {
                    Some(Value::Null)
                }
            }
            DataType::Bool => match text {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            DataType::Date => Some(Value::Date(text.to_string())),
        }
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Display text for the value, as a report cell would show it.
    pub fn as_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Date(d) => d.clone(),
        }
    }
}
