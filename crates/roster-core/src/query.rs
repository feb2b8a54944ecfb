//! The view query: what the user is currently looking at.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A contact column the server can sort or filter on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
  FirstName,
  #[default]
  LastName,
  PhoneNumber,
  EmailAddress,
  Address,
}

impl ContactField {
  pub const ALL: [ContactField; 5] = [
    Self::FirstName,
    Self::LastName,
    Self::PhoneNumber,
    Self::EmailAddress,
    Self::Address,
  ];

  /// The wire name, used both as `sort_by` value and as filter parameter.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::FirstName => "first_name",
      Self::LastName => "last_name",
      Self::PhoneNumber => "phone_number",
      Self::EmailAddress => "email_address",
      Self::Address => "address",
    }
  }
}

impl fmt::Display for ContactField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ContactField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|f| f.as_str() == s)
      .ok_or_else(|| format!("unknown contact field: {s:?}"))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

impl SortDirection {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Asc => "asc",
      Self::Desc => "desc",
    }
  }
}

impl FromStr for SortDirection {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "asc" => Ok(Self::Asc),
      "desc" => Ok(Self::Desc),
      other => Err(format!("unknown sort direction: {other:?}")),
    }
  }
}

// ─── ViewQuery ───────────────────────────────────────────────────────────────

/// Search text, per-field substring filters, and ordering.
///
/// `page_size` is fixed for the life of a session; [`QueryPatch`] cannot
/// change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
  pub search_text:    String,
  pub filters:        BTreeMap<ContactField, String>,
  pub sort_field:     ContactField,
  pub sort_direction: SortDirection,
  pub page_size:      u32,
}

impl Default for ViewQuery {
  fn default() -> Self { Self::with_page_size(DEFAULT_PAGE_SIZE) }
}

impl ViewQuery {
  pub fn with_page_size(page_size: u32) -> Self {
    Self {
      search_text:    String::new(),
      filters:        BTreeMap::new(),
      sort_field:     ContactField::default(),
      sort_direction: SortDirection::default(),
      page_size:      page_size.max(1),
    }
  }

  /// Merge `patch` in place. Returns whether anything changed.
  pub fn apply(&mut self, patch: QueryPatch) -> bool {
    let before = self.clone();
    if let Some(text) = patch.search_text {
      self.search_text = text;
    }
    for (field, value) in patch.filters {
      if value.is_empty() {
        self.filters.remove(&field);
      } else {
        self.filters.insert(field, value);
      }
    }
    if let Some(field) = patch.sort_field {
      self.sort_field = field;
    }
    if let Some(direction) = patch.sort_direction {
      self.sort_direction = direction;
    }
    *self != before
  }

  /// Query-string parameters for fetching `page` (1-based).
  ///
  /// Empty search text and empty filters are omitted.
  pub fn to_params(&self, page: u32) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", page.to_string()), ("limit", self.page_size.to_string())];
    if !self.search_text.is_empty() {
      params.push(("q", self.search_text.clone()));
    }
    for (field, value) in &self.filters {
      if !value.is_empty() {
        params.push((field.as_str(), value.clone()));
      }
    }
    params.push(("sort_by", self.sort_field.as_str().to_owned()));
    params.push(("sort_order", self.sort_direction.as_str().to_owned()));
    params
  }
}

// ─── QueryPatch ──────────────────────────────────────────────────────────────

/// A partial [`ViewQuery`]. `None` leaves a field untouched; an empty filter
/// value removes that filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
  pub search_text:    Option<String>,
  pub filters:        BTreeMap<ContactField, String>,
  pub sort_field:     Option<ContactField>,
  pub sort_direction: Option<SortDirection>,
}

impl QueryPatch {
  pub fn search(text: impl Into<String>) -> Self {
    Self { search_text: Some(text.into()), ..Self::default() }
  }

  pub fn sort_by(field: ContactField) -> Self {
    Self { sort_field: Some(field), ..Self::default() }
  }

  pub fn direction(mut self, direction: SortDirection) -> Self {
    self.sort_direction = Some(direction);
    self
  }

  pub fn filter(mut self, field: ContactField, value: impl Into<String>) -> Self {
    self.filters.insert(field, value.into());
    self
  }
}
