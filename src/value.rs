// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;

use core::any::Any;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Access to a host object as [`Any`] so that testers can downcast receivers.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An opaque object owned by the host application.
///
/// The engine only needs its runtime type name; everything else is
/// interpreted by property testers and adapter factories.
pub trait HostObject: AsAny + fmt::Debug + Send + Sync {
    /// Runtime type of the object. Supertypes come from the platform's type hierarchy.
    fn type_name(&self) -> &str;
}

/// Shared handle to a host object. Two handles are equal when they point to
/// the same object.
#[derive(Clone)]
pub struct HostRef(Arc<dyn HostObject>);

impl HostRef {
    pub fn new<T: HostObject + 'static>(object: T) -> Self {
        Self(Arc::new(object))
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        <dyn HostObject as AsAny>::as_any(&*self.0).downcast_ref::<T>()
    }

    fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl From<Arc<dyn HostObject>> for HostRef {
    fn from(object: Arc<dyn HostObject>) -> Self {
        Self(object)
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for HostRef {}

impl Ord for HostRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name()
            .cmp(other.type_name())
            .then_with(|| self.address().cmp(&other.address()))
    }
}

impl PartialOrd for HostRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for HostRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state)
    }
}

// Variables, literals and receivers all share this representation.
// BTree collections keep iteration order deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    // Json data types. serde will automatically map json to these variants.
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Set(Arc<BTreeSet<Value>>),
    Object(Arc<BTreeMap<Value, Value>>),

    // A type used as a receiver in its own right (static properties).
    Type(Arc<str>),

    // An object owned by the host.
    Host(HostRef),

    // A variable that is defined but carries no value.
    Undefined,
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::Number(n) => n.serialize(serializer),
            Value::Array(a) => a.serialize(serializer),
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    match k {
                        Value::String(_) => map.serialize_entry(k, v)?,
                        _ => {
                            let key_str = serde_json::to_string(k).map_err(Error::custom)?;
                            map.serialize_entry(&key_str, v)?
                        }
                    }
                }
                map.end()
            }

            // display set as an array
            Value::Set(s) => s.serialize(serializer),

            Value::Type(t) => serializer.serialize_str(&format!("<type {t}>")),
            Value::Host(h) => serializer.serialize_str(&format!("<{}>", h.type_name())),
            Value::Undefined => serializer.serialize_str("<undefined>"),
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut arr = vec![];
        while let Some(v) = visitor.next_element()? {
            arr.push(v);
        }
        Ok(Value::from(arr))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = visitor.next_entry()? {
            map.insert(key, value);
        }
        Ok(Value::from(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => write!(f, "{s}"),
            Err(_e) => Err(fmt::Error),
        }
    }
}

impl Value {
    pub fn new_array() -> Value {
        Value::from(vec![])
    }

    pub fn new_type(name: &str) -> Value {
        Value::Type(name.into())
    }

    pub fn from_host<T: HostObject + 'static>(object: T) -> Value {
        Value::Host(HostRef::new(object))
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    /// Runtime type name of the value, as seen by `instanceof` checks.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::Object(_) => "object",
            Value::Type(t) => t,
            Value::Host(h) => h.type_name(),
            Value::Undefined => "undefined",
        }
    }

    /// Elements of a natively iterable value. Objects yield their keys.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(a) => Some(a.as_ref().clone()),
            Value::Set(s) => Some(s.iter().cloned().collect()),
            Value::Object(o) => Some(o.keys().cloned().collect()),
            _ => None,
        }
    }

    /// Size of a natively countable value.
    pub fn count(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.len()),
            Value::Set(s) => Some(s.len()),
            Value::Object(o) => Some(o.len()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(Arc::new(a))
    }
}

impl From<BTreeSet<Value>> for Value {
    fn from(s: BTreeSet<Value>) -> Self {
        Value::Set(Arc::new(s))
    }
}

impl From<BTreeMap<Value, Value>> for Value {
    fn from(s: BTreeMap<Value, Value>) -> Self {
        Value::Object(Arc::new(s))
    }
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_string(&self) -> Result<&Arc<str>> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(anyhow!("not a string")),
        }
    }

    pub fn as_number(&self) -> Result<&Number> {
        match self {
            Value::Number(n) => Ok(n),
            _ => Err(anyhow!("not a number")),
        }
    }

    pub fn as_host(&self) -> Option<&HostRef> {
        match self {
            Value::Host(h) => Some(h),
            _ => None,
        }
    }
}
