//! Structured payload extraction from free-form model output.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Pull the JSON payload out of a model response.
///
/// The payload starts at the first `{` or `[`, whichever comes first, and
/// ends at the last occurrence of the matching closer. Prose and code fences
/// around it are ignored.
pub fn extract_json(raw: &str) -> Result<Value> {
    let start = raw
        .find(['{', '['])
        .ok_or_else(|| Error::malformed("no JSON object or array in response", raw))?;

    let closer = if raw.as_bytes()[start] == b'{' { '}' } else { ']' };
    let end = raw
        .rfind(closer)
        .filter(|&end| end > start)
        .ok_or_else(|| Error::malformed(format!("unterminated payload, missing '{}'", closer), raw))?;

    serde_json::from_str(&raw[start..=end])
        .map_err(|e| Error::malformed(format!("invalid JSON payload: {}", e), raw))
}

/// Extract the payload and deserialize it into `T`.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value = extract_json(raw)?;
    serde_json::from_value(value)
        .map_err(|e| Error::malformed(format!("unexpected payload shape: {}", e), raw))
}
