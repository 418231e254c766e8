//! Caller-side values.
//!
//! The engine only inspects a value's category (and, for containers, the
//! categories of its elements). Values are never marshaled here.

use dynbind_reflect::ForeignObject;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Seq(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// A value that already lives in the foreign runtime.
    Foreign(ForeignObject),
    Bool(bool),
    Null,
    /// Any other caller object, by its caller-side type name.
    Host(String),
}

impl Value {
    /// Short category name, used in log events.
    pub fn category(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Foreign(_) => "foreign",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::Host(_) => "host",
        }
    }
}

impl From<ForeignObject> for Value {
    fn from(obj: ForeignObject) -> Self {
        Value::Foreign(obj)
    }
}
