use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use graft_core::intrinsics::{INT_ARRAY_SPLITERATOR_ARRAY, INT_PIPELINE};
use graft_core::ir::{Constant, FieldRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Boolean(bool),
    IntArray(Arc<[i32]>),
    Object(Arc<Object>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub type_name: String,
    pub fields: HashMap<FieldRef, Value>,
}

impl Object {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldRef, value: Value) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn field(&self, field: &FieldRef) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl Value {
    pub fn object(object: Object) -> Self {
        Value::Object(Arc::new(object))
    }

    /// An int stream whose source is an in-memory array.
    pub fn int_array_stream(values: &[i32]) -> Self {
        Value::object(
            Object::new(INT_PIPELINE)
                .with_field(INT_ARRAY_SPLITERATOR_ARRAY, Value::IntArray(values.into())),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Int(value) => Value::Int(value),
            Constant::Boolean(value) => Value::Boolean(value),
            Constant::Null => Value::Null,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(value) => write!(f, "{}", value),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::IntArray(values) => write!(f, "int[{}]", values.len()),
            Value::Object(object) => write!(f, "{}@{:p}", object.type_name, Arc::as_ptr(object)),
        }
    }
}
