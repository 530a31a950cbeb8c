//! JSON object mapping used for execution contexts, node data and envelope payloads.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// An ordered `string -> json` mapping.
///
/// `Vars` dereferences to [`serde_json::Map`], so the usual map methods
/// (`insert`, `get`, `iter`, ...) are available directly.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Vars {
    inner: Map<String, Value>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set<V: Into<Value>>(
        &mut self,
        key: &str,
        value: V,
    ) {
        self.inner.insert(key.to_string(), value.into());
    }

    /// Builder-style [`Vars::set`].
    pub fn with<V: Into<Value>>(
        mut self,
        key: &str,
        value: V,
    ) -> Self {
        self.set(key, value);
        self
    }

    /// Get the value of `key` deserialized as `T`.
    ///
    /// Returns `None` when the key is absent or the value does not fit `T`.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Option<T> {
        self.inner.get(key).cloned().and_then(|v| serde_json::from_value(v).ok())
    }

    /// Get the value of `key` as a string slice, if it is a JSON string.
    pub fn get_str(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.inner.get(key).and_then(Value::as_str)
    }

    /// Follow a dotted path (`user.address.city`) through nested objects.
    pub fn lookup(
        &self,
        path: &str,
    ) -> Option<&Value> {
        let mut keys = path.split('.');
        let mut current = self.inner.get(keys.next()?)?;
        for key in keys {
            current = current.as_object()?.get(key)?;
        }
        Some(current)
    }
}

impl Deref for Vars {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Vars {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<Map<String, Value>> for Vars {
    fn from(inner: Map<String, Value>) -> Self {
        Self {
            inner,
        }
    }
}

/// Non-object values become an empty mapping.
impl From<Value> for Vars {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(inner) => Self {
                inner,
            },
            _ => Self::new(),
        }
    }
}

impl From<Vars> for Value {
    fn from(vars: Vars) -> Self {
        Value::Object(vars.inner)
    }
}
