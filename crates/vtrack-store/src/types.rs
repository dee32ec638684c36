//! Document-store REST protocol types (a Firestore-shaped `Value`/`Document` pair).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: Option<String>,
    pub fields: Option<HashMap<String, Value>>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }
}

pub trait ToValue {
    fn to_value(&self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Option<Self>;
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::StringValue(self.clone())
    }
}
impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::StringValue(self.to_string())
    }
}
impl ToValue for u32 {
    fn to_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}
impl ToValue for u64 {
    fn to_value(&self) -> Value {
        Value::IntegerValue(self.to_string())
    }
}
impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::DoubleValue(*self as f64)
    }
}
impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::DoubleValue(*self)
    }
}
impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::BooleanValue(*self)
    }
}
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::NullValue(()),
        }
    }
}
impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::ArrayValue(ArrayValue {
            values: Some(self.iter().map(|v| v.to_value()).collect()),
        })
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    }
}
impl FromValue for u32 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(d) => Some(*d as u32),
            _ => None,
        }
    }
}
impl FromValue for u64 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::IntegerValue(s) => s.parse().ok(),
            Value::DoubleValue(d) => Some(*d as u64),
            _ => None,
        }
    }
}
impl FromValue for f32 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::DoubleValue(d) => Some(*d as f32),
            Value::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }
}
impl FromValue for f64 {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::DoubleValue(d) => Some(*d),
            Value::IntegerValue(s) => s.parse().ok(),
            _ => None,
        }
    }
}
impl FromValue for bool {
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::BooleanValue(b) => Some(*b),
            _ => None,
        }
    }
}
