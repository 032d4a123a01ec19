//! Best-effort decoding of the bearer credential's payload segment.
//!
//! The signature is never checked. Anything read here is for display only
//! and must not influence an authorization decision.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenDecodeError {
    #[error("token has no payload segment")]
    Malformed,

    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("payload has no usable `sub` claim")]
    MissingSubject,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<serde_json::Value>,
}

/// Extract the `sub` claim from the second dot-separated segment of a
/// compact token. Segments after the second are ignored.
pub fn decode_subject(token: &str) -> Result<String, TokenDecodeError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or(TokenDecodeError::Malformed)?
        .trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))?;
    let claims: Claims = serde_json::from_slice(&bytes)?;

    match claims.sub {
        Some(serde_json::Value::String(sub)) if !sub.is_empty() => Ok(sub),
        Some(serde_json::Value::Number(sub)) => Ok(sub.to_string()),
        _ => Err(TokenDecodeError::MissingSubject),
    }
}
