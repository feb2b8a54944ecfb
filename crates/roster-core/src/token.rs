//! Token clock — the one place a bearer token is ever inspected.
//!
//! Tokens are three dot-separated segments. The second segment is a
//! base64-url JSON object carrying at least an `exp` claim in epoch seconds.
//! The signature is never checked here; the server remains the authority.
//! This module only answers "how long until the server stops accepting it".

use base64::{
  Engine as _,
  alphabet,
  engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use thiserror::Error;

/// URL-safe alphabet; servers disagree on whether to pad, so accept both.
const B64URL: GeneralPurpose = GeneralPurpose::new(
  &alphabet::URL_SAFE,
  GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum DecodeError {
  #[error("expected 3 token segments, found {0}")]
  SegmentCount(usize),

  #[error("claims segment is not base64-url: {0}")]
  Base64(#[from] base64::DecodeError),

  #[error("claims segment is not a JSON claims object: {0}")]
  Json(#[from] serde_json::Error),

  #[error("expiry claim out of range: {0}")]
  ExpiryOutOfRange(i64),
}

/// The claims the client cares about. Anything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
  /// Expiry, epoch seconds.
  pub exp:      i64,
  #[serde(default)]
  pub iat:      Option<i64>,
  #[serde(default)]
  pub sub:      Option<String>,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub role:     Option<String>,
}

impl Claims {
  /// The expiry claim as an instant.
  pub fn expires_at(&self) -> Result<DateTime<Utc>, DecodeError> {
    DateTime::from_timestamp(self.exp, 0).ok_or(DecodeError::ExpiryOutOfRange(self.exp))
  }
}

/// Decode the claims segment of `token`.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
  let segments: Vec<&str> = token.split('.').collect();
  let [_, payload, _] = segments.as_slice() else {
    return Err(DecodeError::SegmentCount(segments.len()));
  };
  let raw = B64URL.decode(payload)?;
  Ok(serde_json::from_slice(&raw)?)
}

/// Time remaining before `token` expires, measured from `now`.
///
/// Negative once the token has expired. Callers must treat an `Err` exactly
/// like a negative result.
pub fn time_until_expiry_at(token: &str, now: DateTime<Utc>) -> Result<TimeDelta, DecodeError> {
  let expires_at = decode_claims(token)?.expires_at()?;
  Ok(expires_at - now)
}

/// Time remaining before `token` expires, measured from the wall clock.
pub fn time_until_expiry(token: &str) -> Result<TimeDelta, DecodeError> {
  time_until_expiry_at(token, Utc::now())
}

/// Build an unsigned token carrying `claims`. Test helper shared across crates.
#[doc(hidden)]
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
  let header = B64URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
  let payload = B64URL.encode(claims.to_string());
  format!("{header}.{payload}.signature")
}
