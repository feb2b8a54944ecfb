//! Contact records as the server hands them out, and the payloads sent back.
//!
//! Beyond `contact_id`, the record fields are only carried for display and
//! editing; the synchronisation logic never looks at them.

use serde::{Deserialize, Serialize};

/// Server-assigned contact identifier; unique and stable.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl std::fmt::Display for ContactId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

/// A contact row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:    ContactId,
  #[serde(default)]
  pub first_name:    String,
  #[serde(default)]
  pub last_name:     String,
  #[serde(default)]
  pub phone_number:  String,
  #[serde(default)]
  pub email_address: String,
  #[serde(default)]
  pub address:       String,
}

impl Contact {
  pub fn display_name(&self) -> String {
    match (self.first_name.is_empty(), self.last_name.is_empty()) {
      (false, false) => format!("{} {}", self.first_name, self.last_name),
      (false, true) => self.first_name.clone(),
      (true, false) => self.last_name.clone(),
      (true, true) => format!("#{}", self.contact_id),
    }
  }
}

/// One page of a listing, in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactPage {
  pub records:     Vec<Contact>,
  /// 1-based.
  pub page_number: u32,
  /// Matching records across all pages.
  pub total_count: u64,
}

/// Body of a create or update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
  pub first_name:    String,
  pub last_name:     String,
  pub phone_number:  String,
  pub email_address: String,
  pub address:       String,
}

impl From<&Contact> for ContactDraft {
  fn from(c: &Contact) -> Self {
    Self {
      first_name:    c.first_name.clone(),
      last_name:     c.last_name.clone(),
      phone_number:  c.phone_number.clone(),
      email_address: c.email_address.clone(),
      address:       c.address.clone(),
    }
  }
}

/// An email the server should send to one contact on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
  pub subject: String,
  pub message: String,
}

/// A request to mail a set of contacts to someone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRequest {
  pub contact_ids:     Vec<ContactId>,
  pub recipient_email: String,
  pub subject:         String,
  pub message:         String,
}

impl ShareRequest {
  pub fn new(recipient_email: impl Into<String>, contact_ids: Vec<ContactId>) -> Self {
    Self {
      contact_ids,
      recipient_email: recipient_email.into(),
      subject: "Shared Contacts".into(),
      message: String::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn missing_display_fields_default_to_empty() {
    let c: Contact = serde_json::from_value(json!({ "contact_id": 3, "first_name": "Ada" })).unwrap();
    assert_eq!(c.contact_id, ContactId(3));
    assert_eq!(c.last_name, "");
    assert_eq!(c.display_name(), "Ada");
  }

  #[test]
  fn ignores_unknown_server_columns() {
    let c: Contact = serde_json::from_value(json!({
      "contact_id": 9,
      "user_id": 1,
      "first_name": "Grace",
      "last_name": "Hopper",
    }))
    .unwrap();
    assert_eq!(c.display_name(), "Grace Hopper");
  }

  #[test]
  fn share_request_serialises_plain_ids() {
    let req = ShareRequest::new("bob@example.com", vec![ContactId(1), ContactId(2)]);
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["contact_ids"], json!([1, 2]));
    assert_eq!(v["subject"], "Shared Contacts");
  }
}
