//! Value codecs between local settings fields and remote JSON attributes.
//!
//! Local field values are handled as the `serde_json::Value` their Rust type
//! serializes to, so one codec works for any settings struct.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Local field values of one settings object, keyed by local field name.
pub type Fields = Map<String, Value>;

/// Conversion of a single value. Errors are plain messages; the caller adds
/// the field name.
pub type ValueFn = fn(&Value) -> Result<Value, String>;

/// Encoder that sees the whole local object instead of one field.
pub type RootEncoder = fn(&Fields) -> Result<Value, String>;

/// Renders a local value for change logs.
pub type Formatter = fn(&Value) -> String;

/// How a field is translated between local and remote form.
#[derive(Debug, Clone, Copy)]
pub enum Codec {
    /// Same value on both sides.
    Identity,
    /// The remote side represents "unset" as `""`; locally it is `None`.
    OptionalEmptyString,
    /// Named conversion functions.
    Custom { decode: ValueFn, encode: ValueFn },
}

impl Codec {
    /// Remote value to local value.
    pub fn decode(&self, remote: &Value) -> Result<Value, String> {
        match self {
            Self::Identity => Ok(remote.clone()),
            Self::OptionalEmptyString => Ok(match remote {
                Value::String(s) if s.is_empty() => Value::Null,
                other => other.clone(),
            }),
            Self::Custom { decode, .. } => decode(remote),
        }
    }

    /// Local value to remote value.
    pub fn encode(&self, local: &Value) -> Result<Value, String> {
        match self {
            Self::Identity => Ok(local.clone()),
            Self::OptionalEmptyString => Ok(match local {
                Value::Null => Value::String(String::new()),
                other => other.clone(),
            }),
            Self::Custom { encode, .. } => encode(local),
        }
    }
}

/// An enum whose variants have fixed wire strings on the remote API.
///
/// The local (config file) spelling is whatever the type's `Serialize`
/// produces; the remote spelling comes from [`RemoteEnum::remote_value`].
pub trait RemoteEnum: Copy + Serialize + DeserializeOwned + 'static {
    /// Every variant.
    const ALL: &'static [Self];

    /// Wire string for this variant.
    fn remote_value(self) -> &'static str;

    /// Variant whose wire string is `value`.
    fn from_remote_value(value: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.remote_value() == value)
    }
}

/// Codec translating a [`RemoteEnum`] between its local and wire spellings.
pub const fn enum_codec<E: RemoteEnum>() -> Codec {
    Codec::Custom {
        decode: decode_enum::<E>,
        encode: encode_enum::<E>,
    }
}

fn decode_enum<E: RemoteEnum>(remote: &Value) -> Result<Value, String> {
    let wire = remote
        .as_str()
        .ok_or_else(|| format!("expected a string, got {remote}"))?;
    let variant = E::from_remote_value(wire).ok_or_else(|| format!("unknown value '{wire}'"))?;
    serde_json::to_value(variant).map_err(|e| e.to_string())
}

fn encode_enum<E: RemoteEnum>(local: &Value) -> Result<Value, String> {
    let variant: E = serde_json::from_value(local.clone()).map_err(|e| e.to_string())?;
    Ok(Value::String(variant.remote_value().to_string()))
}

/// Default rendering: strings single-quoted, null as `None`.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}

/// Rendering for secrets: shows whether a value is set, never the value.
pub fn mask_secret(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        _ => "'********'".to_string(),
    }
}
