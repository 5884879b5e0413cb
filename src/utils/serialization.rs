// src/utils/serialization.rs
//! Serialization utilities for signed envelopes and remote documents.
//!
//! Provides:
//! - JSON serialization and deserialization helpers
//! - Base64 wrapping of JSON documents, the storage format used for
//!   `proofValue` and `jwt` fields
//! - Base64url helpers for JWS segments

use serde::{de::DeserializeOwned, Serialize};
use serde_json;
use thiserror::Error;

/// Errors raised while unwrapping a base64-encoded JSON document.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded bytes are not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("decoded document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes a value to a JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to JSON and wraps it in standard base64.
pub fn to_base64_json<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    Ok(base64::encode(serialize(data)?))
}

/// Reverses [`to_base64_json`].
pub fn from_base64_json<T: DeserializeOwned>(data: &str) -> Result<T, EncodingError> {
    let bytes = base64::decode(data.trim())?;
    let json = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&json)?)
}

/// Base64url without padding, as used by JWS segments.
pub fn base64url(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

pub fn from_base64url(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode_config(data, base64::URL_SAFE_NO_PAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn base64_json_wraps_documents() {
        let doc = json!({ "recipient": "did:pkh:eip155:1:0xabc", "trusted": true });
        let encoded = to_base64_json(&doc).unwrap();
        assert!(!encoded.contains('{'));
        let decoded: Value = from_base64_json(&encoded).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn rejects_garbage() {
        let err = from_base64_json::<Value>("not base64!").unwrap_err();
        assert!(matches!(err, EncodingError::Base64(_)));

        let not_json = base64::encode("plain text");
        let err = from_base64_json::<Value>(&not_json).unwrap_err();
        assert!(matches!(err, EncodingError::Json(_)));
    }

    #[test]
    fn base64url_has_no_padding() {
        let encoded = base64url(b"ab");
        assert_eq!(encoded, "YWI");
        assert_eq!(from_base64url(&encoded).unwrap(), b"ab");
    }
}
