//! Conversion between in-memory setting values and their stored payloads.

use serde_json::Value;

use super::{error::DomainError, types::SettingFormat};

/// A value ready to be written to the `value`/`format` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedValue {
    pub value: Option<String>,
    pub format: SettingFormat,
}

/// Strings are stored verbatim; `null` becomes a missing payload; every other
/// value is stored as JSON text.
pub fn encode(value: &Value) -> EncodedValue {
    match value {
        Value::String(text) => EncodedValue {
            value: Some(text.clone()),
            format: SettingFormat::String,
        },
        Value::Null => EncodedValue {
            value: None,
            format: SettingFormat::String,
        },
        other => EncodedValue {
            value: Some(other.to_string()),
            format: SettingFormat::Json,
        },
    }
}

/// Decode a stored payload; `name` is only used to label errors.
pub fn decode(
    name: &str,
    raw: Option<&str>,
    format: SettingFormat,
) -> Result<Value, DomainError> {
    let Some(raw) = raw else {
        return Ok(Value::Null);
    };

    match format {
        SettingFormat::String => Ok(Value::String(raw.to_string())),
        SettingFormat::Json => {
            serde_json::from_str(raw).map_err(|err| DomainError::decode(name, err))
        }
    }
}

/// Whether an overlay value counts as unset for fallback lookups.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
