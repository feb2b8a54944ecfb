//! Remote API traits.
//!
//! The HTTP gateway in `roster-client` implements both; tests substitute
//! in-memory fakes. All futures are `Send` so fetches can be spawned onto a
//! multi-threaded runtime.

use std::future::Future;

use serde::Serialize;

use crate::{
  Result,
  contact::{ContactDraft, ContactId, ContactPage, EmailMessage, ShareRequest},
  credential::Credential,
  query::ViewQuery,
};

/// Registration payload. The server calls the contact address `gmail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signup {
  pub username: String,
  pub password: String,
  #[serde(rename = "gmail")]
  pub contact_email: String,
}

/// Login, registration and token refresh.
pub trait AuthApi: Send + Sync {
  /// Exchange a username and password for a credential.
  fn login<'a>(
    &'a self,
    username: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a;

  /// Create an account. Does not log in.
  fn register<'a>(&'a self, signup: &'a Signup) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Trade a still-valid credential for a fresh one.
  fn refresh<'a>(
    &'a self,
    current: &'a Credential,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a;
}

/// Contact listing and mutation.
///
/// Each call takes the credential to attach, if any. An implementation must
/// send no `Authorization` header when given `None`.
pub trait ContactsApi: Send + Sync {
  /// Fetch one page (1-based) of the listing described by `query`.
  fn fetch_page<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    query: &'a ViewQuery,
    page: u32,
  ) -> impl Future<Output = Result<ContactPage>> + Send + 'a;

  fn create_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn update_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn delete_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Ask the server to email one contact. Returns the server's message.
  fn send_email<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    email: &'a EmailMessage,
  ) -> impl Future<Output = Result<String>> + Send + 'a;

  /// Ask the server to mail a set of contacts to a recipient.
  fn share_contacts<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    request: &'a ShareRequest,
  ) -> impl Future<Output = Result<String>> + Send + 'a;
}
