//! Typed values carried in snapshot records

use std::fmt;

use super::ValueType;

#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Int(i64),
    UInt(u64),
    Double(f64),
    Bool(bool),
    Str(String),
    Type(ValueType),
}

impl Variant {
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => Ok(()),
            Variant::Int(v) => write!(f, "{}", v),
            Variant::UInt(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::Bool(v) => write!(f, "{}", v),
            Variant::Str(v) => f.write_str(v),
            Variant::Type(v) => f.write_str(v.name()),
        }
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<u64> for Variant {
    fn from(v: u64) -> Self {
        Variant::UInt(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Double(v)
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_string())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}
