//! The `CredentialStore` trait.
//!
//! Implemented by storage backends (e.g. `roster-store-sqlite`). The session
//! manager depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::credential::Credential;

/// Durable key-value home for the current credential.
///
/// Token, username and role are written and cleared together; a backend must
/// never expose a partially written credential. No validation happens here:
/// whatever was saved is handed back verbatim.
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `credential`, replacing any previous one.
  fn save<'a>(
    &'a self,
    credential: &'a Credential,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Load the persisted credential, if a complete one exists.
  fn load(&self) -> impl Future<Output = Result<Option<Credential>, Self::Error>> + Send + '_;

  /// Remove every persisted credential key.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
