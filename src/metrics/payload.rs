use std::collections::BTreeMap;

use serde_json::Value;
use spdlog::trace;

use crate::error::DecodeError;
use crate::metrics::metric_types::TIMESTAMP_FIELD;

/// A decoded queue message: named readings plus the optional shared timestamp.
#[derive(Debug, Default, PartialEq)]
pub struct Payload {
    pub timestamp: Option<i64>,
    pub fields: BTreeMap<String, Option<f64>>,
}

pub fn decode(raw: &[u8]) -> Result<Payload, DecodeError> {
    let value: Value = serde_json::from_slice(raw)?;
    let Value::Object(object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    let mut payload = Payload::default();
    for (key, value) in object {
        if key == TIMESTAMP_FIELD {
            payload.timestamp = as_timestamp(&value);
            continue;
        }

        match value {
            Value::Null => {
                payload.fields.insert(key, None);
            }
            Value::Number(n) => {
                payload.fields.insert(key, n.as_f64());
            }
            other => trace!("Ignoring non numeric field {}={}", key, other),
        }
    }

    Ok(payload)
}

fn as_timestamp(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|t| t as i64))
}
