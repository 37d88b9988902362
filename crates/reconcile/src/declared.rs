//! Settings values that remember which fields the user wrote.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ops::Deref;

/// Fields explicitly declared in local configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSet {
    /// Every field is declared.
    All,
    /// Only these fields are declared.
    Only(BTreeSet<String>),
}

impl FieldSet {
    /// Whether `field` is declared.
    pub fn contains(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.contains(field),
        }
    }
}

/// A settings object plus the set of fields the user declared.
///
/// Deserializing records the keys present in the input, so a config section
/// that sets only `log_level` leaves every other field unmanaged. Fields that
/// were not declared still hold the type's default.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared<T> {
    value: T,
    fields: FieldSet,
}

impl<T> Declared<T> {
    /// Declare only the named fields.
    pub fn new<I, S>(value: T, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value,
            fields: FieldSet::Only(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Declare every field.
    pub fn all(value: T) -> Self {
        Self {
            value,
            fields: FieldSet::All,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn is_declared(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// Whether nothing at all was declared.
    pub fn is_empty(&self) -> bool {
        matches!(&self.fields, FieldSet::Only(fields) if fields.is_empty())
    }
}

impl<T: Default> Default for Declared<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
            fields: FieldSet::Only(BTreeSet::new()),
        }
    }
}

impl<T> Deref for Declared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Serialize> Serialize for Declared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Declared<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let fields = FieldSet::Only(map.keys().cloned().collect());
        let value = serde_json::from_value(Value::Object(map)).map_err(D::Error::custom)?;
        Ok(Self { value, fields })
    }
}
