//! Request gateway: the async HTTP client for the contacts JSON API.
//!
//! Attaches `Authorization: Bearer <token>` whenever a credential is supplied
//! and turns every `401` into [`Error::Unauthorized`], which callers must not
//! retry within the same session.

use std::{future::Future, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use roster_core::{
  AuthError, Error, Result,
  api::{AuthApi, ContactsApi, Signup},
  contact::{ContactDraft, ContactId, ContactPage, EmailMessage, ShareRequest},
  credential::Credential,
  query::ViewQuery,
};
use tracing::{debug, warn};

use crate::{
  config::ClientConfig,
  wire::{ContactsBody, ErrorBody, LoginBody, MessageBody, TokenBody},
};

/// Async HTTP client for the contacts REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct Gateway {
  client:   Client,
  base_url: String,
}

impl Gateway {
  /// Build a gateway whose every request is bounded by `timeout`.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(network)?;
    Ok(Self { client, base_url: base_url.into() })
  }

  pub fn from_config(config: &ClientConfig) -> Result<Self> {
    Self::new(config.base_url.clone(), config.request_timeout())
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  fn authorize(req: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
    match credential {
      Some(c) => req.bearer_auth(c.token()),
      None => req,
    }
  }

  /// Send an authenticated-path request and screen the status.
  async fn send(
    &self,
    req: RequestBuilder,
    credential: Option<&Credential>,
    what: &str,
  ) -> Result<Response> {
    let resp = Self::authorize(req, credential)
      .send()
      .await
      .map_err(network)?;
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
      warn!(request = what, "server rejected credential");
      return Err(Error::Unauthorized);
    }
    if !status.is_success() {
      return Err(server_error(resp, what).await);
    }
    Ok(resp)
  }

  /// `GET /api/health`. No credential involved.
  pub async fn health(&self) -> Result<()> {
    self.send(self.client.get(self.url("/health")), None, "GET /health").await?;
    Ok(())
  }
}

// ─── Auth ────────────────────────────────────────────────────────────────────

impl AuthApi for Gateway {
  /// `POST /api/login`
  fn login<'a>(
    &'a self,
    username: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a {
    async move {
      let resp = self
        .client
        .post(self.url("/login"))
        .json(&LoginBody { username, password })
        .send()
        .await
        .map_err(network)?;

      let status = resp.status();
      if !status.is_success() {
        let message = error_body(resp).await.error.unwrap_or_else(|| "Login failed".into());
        return Err(match status {
          StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials(message).into(),
          StatusCode::BAD_REQUEST => AuthError::InvalidInput(message).into(),
          _ => Error::Server { status: status.as_u16(), message },
        });
      }
      issue(resp).await
    }
  }

  /// `POST /api/register`
  fn register<'a>(&'a self, signup: &'a Signup) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      let resp = self
        .client
        .post(self.url("/register"))
        .json(signup)
        .send()
        .await
        .map_err(network)?;

      let status = resp.status();
      if !status.is_success() {
        let message = error_body(resp).await.error.unwrap_or_else(|| "Signup failed".into());
        return Err(match status {
          StatusCode::BAD_REQUEST | StatusCode::CONFLICT
            if message.to_lowercase().contains("already exists") =>
          {
            AuthError::AlreadyExists(message).into()
          }
          StatusCode::BAD_REQUEST => AuthError::InvalidInput(message).into(),
          _ => Error::Server { status: status.as_u16(), message },
        });
      }
      Ok(())
    }
  }

  /// `POST /api/refresh` with the current credential attached.
  fn refresh<'a>(
    &'a self,
    current: &'a Credential,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a {
    async move {
      let resp = self
        .send(self.client.post(self.url("/refresh")), Some(current), "POST /refresh")
        .await?;
      issue(resp).await
    }
  }
}

// ─── Contacts ────────────────────────────────────────────────────────────────

impl ContactsApi for Gateway {
  /// `GET /api/contacts?page&limit&q&sort_by&sort_order&<filters>`
  fn fetch_page<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    query: &'a ViewQuery,
    page: u32,
  ) -> impl Future<Output = Result<ContactPage>> + Send + 'a {
    async move {
      debug!(page, "fetching contacts");
      let req = self.client.get(self.url("/contacts")).query(&query.to_params(page));
      let body: ContactsBody = self
        .send(req, credential, "GET /contacts")
        .await?
        .json()
        .await
        .map_err(network)?;
      Ok(ContactPage { records: body.contacts, page_number: page, total_count: body.total })
    }
  }

  /// `POST /api/contacts`
  fn create_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      let req = self.client.post(self.url("/contacts")).json(draft);
      self.send(req, credential, "POST /contacts").await?;
      Ok(())
    }
  }

  /// `PUT /api/contacts/{id}`
  fn update_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      let req = self.client.put(self.url(&format!("/contacts/{id}"))).json(draft);
      self.send(req, credential, "PUT /contacts/{id}").await?;
      Ok(())
    }
  }

  /// `DELETE /api/contacts/{id}`
  fn delete_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      let req = self.client.delete(self.url(&format!("/contacts/{id}")));
      self.send(req, credential, "DELETE /contacts/{id}").await?;
      Ok(())
    }
  }

  /// `POST /api/contacts/{id}/send_email`
  fn send_email<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    email: &'a EmailMessage,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    async move {
      let req = self.client.post(self.url(&format!("/contacts/{id}/send_email"))).json(email);
      message(self.send(req, credential, "POST /contacts/{id}/send_email").await?).await
    }
  }

  /// `POST /api/contacts/share`
  fn share_contacts<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    request: &'a ShareRequest,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    async move {
      let req = self.client.post(self.url("/contacts/share")).json(request);
      message(self.send(req, credential, "POST /contacts/share").await?).await
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn network(e: reqwest::Error) -> Error { Error::Network(Box::new(e)) }

/// Parse a token response into a credential. An undecodable token fails here.
async fn issue(resp: Response) -> Result<Credential> {
  let body: TokenBody = resp.json().await.map_err(network)?;
  Ok(Credential::issue(body.token, body.username, body.role)?)
}

async fn message(resp: Response) -> Result<String> {
  let body: MessageBody = resp.json().await.map_err(network)?;
  Ok(body.message)
}

/// Best-effort parse of an error payload; a missing or odd body is not itself
/// an error.
async fn error_body(resp: Response) -> ErrorBody {
  resp.json().await.unwrap_or_default()
}

async fn server_error(resp: Response, what: &str) -> Error {
  let status = resp.status();
  let body = error_body(resp).await;
  match body.errors {
    Some(fields) if !fields.is_empty() => Error::Validation(fields),
    _ => Error::Server {
      status:  status.as_u16(),
      message: body.error.unwrap_or_else(|| format!("{what} → {status}")),
    },
  }
}
