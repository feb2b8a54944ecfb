//! The bearer token and the identity it speaks for.

use serde::{Deserialize, Serialize};

use crate::token::{self, DecodeError};

/// Who a token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub username: String,
  pub role:     String,
}

/// A bearer token paired with the identity encoded in it.
///
/// Fields are private: token and identity are only ever replaced together,
/// by building a whole new `Credential`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
  token:    String,
  identity: Identity,
}

impl Credential {
  /// Build a credential from a freshly issued token.
  ///
  /// The token must decode. Identity claims inside the token win over the
  /// `username`/`role` the server sent alongside it.
  pub fn issue(
    token: impl Into<String>,
    username: impl Into<String>,
    role: impl Into<String>,
  ) -> Result<Self, DecodeError> {
    let token = token.into();
    let claims = token::decode_claims(&token)?;
    let identity = Identity {
      username: claims.username.unwrap_or_else(|| username.into()),
      role:     claims.role.unwrap_or_else(|| role.into()),
    };
    Ok(Self { token, identity })
  }

  /// Reassemble a credential from persisted parts without inspecting it.
  ///
  /// Used by credential stores on load; the session manager validates the
  /// result before trusting it.
  pub fn from_parts(token: String, identity: Identity) -> Self {
    Self { token, identity }
  }

  pub fn token(&self) -> &str { &self.token }

  pub fn identity(&self) -> &Identity { &self.identity }

  pub fn username(&self) -> &str { &self.identity.username }

  pub fn role(&self) -> &str { &self.identity.role }
}

// Keep the token out of logs and panic messages.
impl std::fmt::Debug for Credential {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credential")
      .field("token", &"<redacted>")
      .field("identity", &self.identity)
      .finish()
  }
}
