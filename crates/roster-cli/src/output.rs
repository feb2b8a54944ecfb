//! Plain-text rendering of the session and the contact view.

use roster_client::{SessionState, ViewSync};
use roster_core::{contact::Contact, token};

use crate::App;

pub fn print_status(roster: &App) {
  let session = roster.session();
  match session.state() {
    SessionState::Unauthenticated => {
      println!("Not logged in");
      if let Some(notice) = session.notice() {
        println!("{notice}");
      }
    }
    SessionState::Authenticated(credential) | SessionState::Expiring(credential) => {
      println!("Logged in as {} ({})", credential.username(), credential.role());
      if let Ok(left) = token::time_until_expiry(credential.token()) {
        println!("Session valid for another {}h {:02}m", left.num_hours(), left.num_minutes() % 60);
      }
    }
  }
  if let Some(warning) = session.expiry_warning() {
    println!("{}", expiry_line(warning.minutes, warning.urgent));
  }
}

pub fn expiry_line(minutes: i64, urgent: bool) -> String {
  let marker = if urgent { "!!" } else { "!" };
  format!("{marker} Session expires in {minutes} minute(s)")
}

pub fn print_view(view: &ViewSync) {
  if view.records().is_empty() {
    println!("No contacts");
  }
  for contact in view.records() {
    println!("{}", row(contact));
  }
  if let Some(total) = view.total_count() {
    let more = if view.has_more() { " (more available)" } else { "" };
    println!("-- {} of {total}{more}", view.records().len());
  }
  if let Some(error) = view.error() {
    println!("{error}");
  }
}

fn row(c: &Contact) -> String {
  format!(
    "{:>6}  {:<28}  {:<16}  {}",
    c.contact_id.to_string(),
    c.display_name(),
    c.phone_number,
    c.email_address
  )
}

#[cfg(test)]
mod tests {
  use roster_core::contact::ContactId;

  use super::*;

  #[test]
  fn row_pads_columns() {
    let c = Contact {
      contact_id:    ContactId(7),
      first_name:    "Ada".into(),
      last_name:     "Lovelace".into(),
      phone_number:  "555".into(),
      email_address: "ada@example.com".into(),
      address:       String::new(),
    };
    let line = row(&c);
    assert!(line.starts_with("     7  Ada Lovelace"));
    assert!(line.ends_with("ada@example.com"));
  }

  #[test]
  fn urgent_expiry_is_marked() {
    assert_eq!(expiry_line(9, true), "!! Session expires in 9 minute(s)");
    assert_eq!(expiry_line(25, false), "! Session expires in 25 minute(s)");
  }
}
