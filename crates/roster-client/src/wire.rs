//! JSON bodies exchanged with the contacts server.

use roster_core::{FieldErrors, contact::Contact};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct LoginBody<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

/// Returned by `/login` and `/refresh`.
#[derive(Deserialize)]
pub(crate) struct TokenBody {
  pub token:    String,
  #[serde(default)]
  pub username: String,
  #[serde(default = "default_role")]
  pub role:     String,
}

fn default_role() -> String { "user".into() }

#[derive(Deserialize)]
pub(crate) struct ContactsBody {
  pub contacts: Vec<Contact>,
  pub total:    u64,
}

#[derive(Deserialize)]
pub(crate) struct MessageBody {
  #[serde(default)]
  pub message: String,
}

/// Error payloads: either `{error}` or, for validation, `{errors: {field: msg}}`.
#[derive(Deserialize, Default)]
pub(crate) struct ErrorBody {
  pub error:  Option<String>,
  pub errors: Option<FieldErrors>,
}
