//! Error types for `roster-core`.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::token::DecodeError;

/// Field-level validation messages keyed by field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Why an authentication call was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("invalid credentials: {0}")]
  InvalidCredentials(String),

  #[error("account already exists: {0}")]
  AlreadyExists(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("session expired")]
  Expired,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication failed: {0}")]
  Auth(#[from] AuthError),

  /// The server answered 401. Never retried within the same session.
  #[error("unauthorized")]
  Unauthorized,

  /// No credential is held, so the request was never sent.
  #[error("not authenticated")]
  NotAuthenticated,

  #[error("network error: {0}")]
  Network(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("malformed token: {0}")]
  Decode(#[from] DecodeError),

  #[error("validation failed: {}", display_fields(.0))]
  Validation(FieldErrors),

  #[error("server error ({status}): {message}")]
  Server { status: u16, message: String },

  #[error("credential store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Whether this error means the session must end.
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, Self::Unauthorized | Self::Decode(_) | Self::Auth(AuthError::Expired))
  }
}

fn display_fields(fields: &FieldErrors) -> String {
  fields
    .iter()
    .map(|(field, msg)| format!("{field}: {msg}"))
    .collect::<Vec<_>>()
    .join(" | ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validation_message_joins_fields() {
    let mut fields = FieldErrors::new();
    fields.insert("first_name".into(), "required".into());
    fields.insert("email_address".into(), "invalid".into());
    let err = Error::Validation(fields);
    assert_eq!(
      err.to_string(),
      "validation failed: email_address: invalid | first_name: required"
    );
  }

  #[test]
  fn only_session_ending_errors_are_auth_failures() {
    assert!(Error::Unauthorized.is_auth_failure());
    assert!(Error::Auth(AuthError::Expired).is_auth_failure());
    assert!(!Error::Auth(AuthError::InvalidCredentials("x".into())).is_auth_failure());
    assert!(!Error::Validation(FieldErrors::new()).is_auth_failure());
    assert!(!Error::Server { status: 500, message: "boom".into() }.is_auth_failure());
  }
}
