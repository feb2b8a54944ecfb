//! In-memory fakes shared by the unit tests.

use std::{
  future::Future,
  sync::{Arc, Mutex},
};

use chrono::Utc;
use roster_core::{
  AuthError, Error, FieldErrors, Result,
  api::{AuthApi, ContactsApi, Signup},
  contact::{Contact, ContactDraft, ContactId, ContactPage, EmailMessage, ShareRequest},
  credential::Credential,
  query::ViewQuery,
  token::encode_unsigned,
};
use serde_json::json;

/// An unsigned token for `username` expiring `secs` from now.
pub fn token_expiring_in(username: &str, secs: i64) -> String {
  encode_unsigned(&json!({
    "exp": Utc::now().timestamp() + secs,
    "sub": "1",
    "username": username,
    "role": "user",
  }))
}

pub fn contact(id: i64) -> Contact {
  Contact {
    contact_id:    ContactId(id),
    first_name:    format!("First{id}"),
    last_name:     format!("Last{id:03}"),
    phone_number:  String::new(),
    email_address: format!("c{id}@example.com"),
    address:       String::new(),
  }
}

/// One recorded `fetch_page` call.
#[derive(Debug, Clone)]
pub struct FetchCall {
  pub token: Option<String>,
  pub page:  u32,
}

struct State {
  login_lifetime: i64,
  refresh_ok:     bool,
  refresh_calls:  usize,
  contacts:       Vec<Contact>,
  next_id:        i64,
  reject_fetch:   bool,
  fetches:        Vec<FetchCall>,
  issued:         u64,
}

/// Scriptable stand-in for the HTTP gateway.
///
/// Accepts any login except password `"wrong"`; username `"alice"` is taken
/// for signup.
#[derive(Clone)]
pub struct FakeApi {
  state: Arc<Mutex<State>>,
}

impl Default for FakeApi {
  fn default() -> Self {
    Self {
      state: Arc::new(Mutex::new(State {
        login_lifetime: 12 * 3600,
        refresh_ok:     true,
        refresh_calls:  0,
        contacts:       Vec::new(),
        next_id:        1,
        reject_fetch:   false,
        fetches:        Vec::new(),
        issued:         0,
      })),
    }
  }
}

impl FakeApi {
  pub fn with_login_lifetime(self, secs: i64) -> Self {
    self.state.lock().unwrap().login_lifetime = secs;
    self
  }

  pub fn failing_refresh(self) -> Self {
    self.state.lock().unwrap().refresh_ok = false;
    self
  }

  /// Seed `n` contacts with ids `1..=n`.
  pub fn with_contacts(self, n: i64) -> Self {
    {
      let mut state = self.state.lock().unwrap();
      state.contacts = (1..=n).map(contact).collect();
      state.next_id = n + 1;
    }
    self
  }

  /// Make every subsequent fetch answer 401.
  pub fn reject_fetches(&self) { self.state.lock().unwrap().reject_fetch = true; }

  pub fn refresh_calls(&self) -> usize { self.state.lock().unwrap().refresh_calls }

  pub fn fetches(&self) -> Vec<FetchCall> { self.state.lock().unwrap().fetches.clone() }

  pub fn contact_count(&self) -> usize { self.state.lock().unwrap().contacts.len() }

  /// Every issued token is distinct, even within the same second.
  fn issue(&self, username: &str) -> Credential {
    let (lifetime, serial) = {
      let mut state = self.state.lock().unwrap();
      state.issued += 1;
      (state.login_lifetime, state.issued)
    };
    let token = encode_unsigned(&json!({
      "exp": Utc::now().timestamp() + lifetime,
      "sub": "1",
      "jti": serial,
      "username": username,
      "role": "user",
    }));
    Credential::issue(token, username, "user").unwrap()
  }

  fn check(credential: Option<&Credential>) -> Result<()> {
    if credential.is_some() { Ok(()) } else { Err(Error::Unauthorized) }
  }
}

impl AuthApi for FakeApi {
  fn login<'a>(
    &'a self,
    username: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a {
    async move {
      if password == "wrong" {
        return Err(AuthError::InvalidCredentials("Invalid username or password".into()).into());
      }
      Ok(self.issue(username))
    }
  }

  fn register<'a>(&'a self, signup: &'a Signup) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      if signup.username == "alice" {
        return Err(AuthError::AlreadyExists("Username already exists".into()).into());
      }
      Ok(())
    }
  }

  fn refresh<'a>(
    &'a self,
    current: &'a Credential,
  ) -> impl Future<Output = Result<Credential>> + Send + 'a {
    async move {
      let ok = {
        let mut state = self.state.lock().unwrap();
        state.refresh_calls += 1;
        state.refresh_ok
      };
      if ok { Ok(self.issue(current.username())) } else { Err(Error::Unauthorized) }
    }
  }
}

impl ContactsApi for FakeApi {
  fn fetch_page<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    query: &'a ViewQuery,
    page: u32,
  ) -> impl Future<Output = Result<ContactPage>> + Send + 'a {
    async move {
      let mut state = self.state.lock().unwrap();
      state.fetches.push(FetchCall { token: credential.map(|c| c.token().to_owned()), page });
      if state.reject_fetch {
        return Err(Error::Unauthorized);
      }
      Self::check(credential)?;
      let size = query.page_size as usize;
      let start = (page.saturating_sub(1) as usize) * size;
      let records = state.contacts.iter().skip(start).take(size).cloned().collect();
      Ok(ContactPage { records, page_number: page, total_count: state.contacts.len() as u64 })
    }
  }

  fn create_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      Self::check(credential)?;
      if draft.first_name.is_empty() {
        let mut fields = FieldErrors::new();
        fields.insert("first_name".into(), "First name is required".into());
        return Err(Error::Validation(fields));
      }
      let mut state = self.state.lock().unwrap();
      let id = state.next_id;
      state.next_id += 1;
      state.contacts.push(Contact {
        contact_id:    ContactId(id),
        first_name:    draft.first_name.clone(),
        last_name:     draft.last_name.clone(),
        phone_number:  draft.phone_number.clone(),
        email_address: draft.email_address.clone(),
        address:       draft.address.clone(),
      });
      Ok(())
    }
  }

  fn update_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    draft: &'a ContactDraft,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      Self::check(credential)?;
      let mut state = self.state.lock().unwrap();
      if let Some(c) = state.contacts.iter_mut().find(|c| c.contact_id == id) {
        c.first_name = draft.first_name.clone();
        c.last_name = draft.last_name.clone();
      }
      Ok(())
    }
  }

  fn delete_contact<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    async move {
      Self::check(credential)?;
      self.state.lock().unwrap().contacts.retain(|c| c.contact_id != id);
      Ok(())
    }
  }

  fn send_email<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    id: ContactId,
    _email: &'a EmailMessage,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    async move {
      Self::check(credential)?;
      Ok(format!("Email sent to contact {id}"))
    }
  }

  fn share_contacts<'a>(
    &'a self,
    credential: Option<&'a Credential>,
    request: &'a ShareRequest,
  ) -> impl Future<Output = Result<String>> + Send + 'a {
    async move {
      Self::check(credential)?;
      Ok(format!("Shared {} contacts", request.contact_ids.len()))
    }
  }
}
