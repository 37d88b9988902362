//! Field mapping tables and the attribute codec.
//!
//! A settings group describes each of its remote resources as a static slice
//! of [`FieldMapping`] entries. [`decode`] turns a fetched JSON object into
//! local fields and [`encode`] does the reverse; both are pure.

use crate::codec::{Codec, Fields, Formatter, RootEncoder, format_value};
use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;

/// One local field paired with one remote JSON attribute.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub local: &'static str,
    pub remote: &'static str,
    pub codec: Codec,
    /// Absent remote attribute falls back to the local default.
    pub optional: bool,
    /// Computes the remote value from the whole local object.
    pub root_encoder: Option<RootEncoder>,
    pub formatter: Option<Formatter>,
}

impl FieldMapping {
    pub const fn new(local: &'static str, remote: &'static str) -> Self {
        Self {
            local,
            remote,
            codec: Codec::Identity,
            optional: false,
            root_encoder: None,
            formatter: None,
        }
    }

    #[must_use]
    pub const fn codec(self, codec: Codec) -> Self {
        Self { codec, ..self }
    }

    #[must_use]
    pub const fn optional(self) -> Self {
        Self {
            optional: true,
            ..self
        }
    }

    #[must_use]
    pub const fn root_encoder(self, encoder: RootEncoder) -> Self {
        Self {
            root_encoder: Some(encoder),
            ..self
        }
    }

    #[must_use]
    pub const fn formatter(self, formatter: Formatter) -> Self {
        Self {
            formatter: Some(formatter),
            ..self
        }
    }

    /// Render a local value for logs.
    pub fn format(&self, value: &Value) -> String {
        self.formatter
            .map_or_else(|| format_value(value), |formatter| formatter(value))
    }

    /// Local value of this field, `Null` when absent.
    pub fn local_value(&self, fields: &Fields) -> Value {
        fields.get(self.local).cloned().unwrap_or(Value::Null)
    }

    /// Decode one remote attribute value.
    pub fn decode_value(&self, remote: &Value) -> Result<Value> {
        self.codec.decode(remote).map_err(|message| self.codec_error(message))
    }

    /// The local value as it reads back after a write.
    ///
    /// Declared values with more than one spelling (`Some("")` for an
    /// empty-string optional, unsorted or padded list items) collapse to the
    /// form [`decode`] produces, so they compare equal to the decoded remote.
    /// Root-encoded fields are returned unchanged.
    pub fn canonical(&self, local: &Value) -> Result<Value> {
        if self.root_encoder.is_some() {
            return Ok(local.clone());
        }
        self.codec
            .encode(local)
            .and_then(|remote| self.codec.decode(&remote))
            .map_err(|message| self.codec_error(message))
    }

    /// Encode this field's remote value from the full local object.
    pub fn encode_from(&self, fields: &Fields) -> Result<Value> {
        let encoded = match self.root_encoder {
            Some(encoder) => encoder(fields),
            None => self.codec.encode(&self.local_value(fields)),
        };
        encoded.map_err(|message| self.codec_error(message))
    }

    fn codec_error(&self, message: String) -> Error {
        Error::Codec {
            field: self.local.to_string(),
            message,
        }
    }
}

/// Check that local and remote names are each unique within the table.
pub fn validate_table(table: &[FieldMapping]) -> Result<()> {
    let mut locals = BTreeSet::new();
    let mut remotes = BTreeSet::new();
    for entry in table {
        if !locals.insert(entry.local) {
            return Err(Error::invariant(format!(
                "local field '{}' is mapped more than once",
                entry.local
            )));
        }
        if !remotes.insert(entry.remote) {
            return Err(Error::invariant(format!(
                "remote field '{}' is mapped more than once",
                entry.remote
            )));
        }
    }
    Ok(())
}

/// Decode a remote JSON object into local fields.
///
/// Optional entries whose remote attribute is absent are left out so the
/// local type's default applies.
pub fn decode(table: &[FieldMapping], remote: &Value) -> Result<Fields> {
    let object = remote
        .as_object()
        .ok_or_else(|| Error::InvalidResponse(format!("expected a JSON object, got {remote}")))?;

    let mut fields = Fields::new();
    for entry in table {
        match object.get(entry.remote) {
            Some(value) => {
                fields.insert(entry.local.to_string(), entry.decode_value(value)?);
            }
            None if entry.optional => {}
            None => {
                return Err(Error::MissingRemoteField {
                    local: entry.local.to_string(),
                    remote: entry.remote.to_string(),
                });
            }
        }
    }
    Ok(fields)
}

/// Decode a remote JSON object straight into a typed settings object.
pub fn decode_into<T: DeserializeOwned>(table: &[FieldMapping], remote: &Value) -> Result<T> {
    from_fields(decode(table, remote)?)
}

/// Encode local fields into remote attributes, keyed by remote name.
pub fn encode(table: &[FieldMapping], fields: &Fields) -> Result<Fields> {
    table
        .iter()
        .map(|entry| Ok((entry.remote.to_string(), entry.encode_from(fields)?)))
        .collect()
}

/// Serialize a settings object into its local fields.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::invariant(format!(
            "settings must serialize to an object, got {other}"
        ))),
    }
}

/// Build a settings object from local fields.
pub fn from_fields<T: DeserializeOwned>(fields: Fields) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}
