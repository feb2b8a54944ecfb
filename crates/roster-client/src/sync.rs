//! The visible contact collection and the rules for refreshing it.
//!
//! [`ViewSync`] is a plain state machine with no I/O. Each trigger either
//! returns a [`FetchRequest`] for the caller to run, or `None` when the
//! trigger is dropped. The caller hands the result back to
//! [`ViewSync::complete`] together with the request's [`FetchTag`].
//!
//! Every query change or reload starts a new generation. A result is applied
//! only when its tag is the one fetch currently outstanding for the current
//! generation; anything else is stale and discarded.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use roster_core::{
  Result,
  contact::{Contact, ContactId, ContactPage},
  query::{QueryPatch, ViewQuery},
};
use tracing::{debug, warn};

/// Shown when a listing fetch fails. The existing collection stays visible.
pub const FETCH_FAILED: &str = "Failed to fetch contacts";

// ─── Requests and results ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Page 1; the result becomes the whole collection.
  Replace,
  /// The next page; the result is added to the end.
  Append,
}

/// Identifies one fetch: which generation asked for which page, and how the
/// result is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTag {
  pub generation: u64,
  pub page:       u32,
  pub mode:       FetchMode,
}

/// A fetch the caller should start.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub tag:   FetchTag,
  pub query: ViewQuery,
}

/// What [`ViewSync::complete`] did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  Replaced { count: usize },
  Appended { added: usize },
  /// From an older generation or no longer outstanding; dropped.
  Stale,
  Failed,
}

// ─── ViewSync ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ViewSync {
  query:        ViewQuery,
  generation:   u64,
  /// False while signed out. No fetch is begun while inactive.
  active:       bool,
  records:      Vec<Contact>,
  /// Last page applied for the current generation; 0 before the first.
  page_number:  u32,
  total_count:  Option<u64>,
  in_flight:    Option<FetchTag>,
  editing:      Option<ContactId>,
  composing:    bool,
  polling:      bool,
  last_refresh: Option<DateTime<Utc>>,
  error:        Option<String>,
}

impl ViewSync {
  /// An inactive, empty view.
  pub fn new(page_size: u32, polling: bool) -> Self {
    Self {
      query: ViewQuery::with_page_size(page_size),
      generation: 0,
      active: false,
      records: Vec::new(),
      page_number: 0,
      total_count: None,
      in_flight: None,
      editing: None,
      composing: false,
      polling,
      last_refresh: None,
      error: None,
    }
  }

  // ── Accessors ───────────────────────────────────────────────────────────

  pub fn query(&self) -> &ViewQuery { &self.query }

  pub fn generation(&self) -> u64 { self.generation }

  pub fn is_active(&self) -> bool { self.active }

  pub fn records(&self) -> &[Contact] { &self.records }

  pub fn page_number(&self) -> u32 { self.page_number }

  pub fn total_count(&self) -> Option<u64> { self.total_count }

  pub fn is_loading(&self) -> bool { self.in_flight.is_some() }

  pub fn in_flight(&self) -> Option<FetchTag> { self.in_flight }

  pub fn editing(&self) -> Option<ContactId> { self.editing }

  pub fn is_composing(&self) -> bool { self.composing }

  pub fn polling(&self) -> bool { self.polling }

  pub fn last_refresh(&self) -> Option<DateTime<Utc>> { self.last_refresh }

  pub fn error(&self) -> Option<&str> { self.error.as_deref() }

  /// False until a page has been applied, and once every record is loaded.
  pub fn has_more(&self) -> bool {
    match self.total_count {
      Some(total) => u64::from(self.page_number) * u64::from(self.query.page_size) < total,
      None => false,
    }
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────

  /// Signed in: start showing contacts.
  pub fn activate(&mut self) -> Option<FetchRequest> {
    self.active = true;
    self.restart()
  }

  /// Signed out: drop everything and refuse further fetches. Outstanding
  /// results become stale.
  pub fn clear(&mut self) {
    self.generation += 1;
    self.active = false;
    self.records.clear();
    self.page_number = 0;
    self.total_count = None;
    self.in_flight = None;
    self.editing = None;
    self.composing = false;
    self.last_refresh = None;
    self.error = None;
  }

  // ── Triggers ────────────────────────────────────────────────────────────

  /// Merge `patch` into the query and fetch page 1 under a new generation.
  pub fn set_query(&mut self, patch: QueryPatch) -> Option<FetchRequest> {
    self.query.apply(patch);
    self.restart()
  }

  /// Fetch page 1 again under a new generation, query unchanged.
  pub fn reload(&mut self) -> Option<FetchRequest> { self.restart() }

  /// The next page, unless one is already outstanding or nothing is left.
  pub fn load_more(&mut self) -> Option<FetchRequest> {
    if !self.active || self.in_flight.is_some() || !self.has_more() {
      return None;
    }
    self.begin(self.page_number + 1, FetchMode::Append)
  }

  /// Periodic page-1 refresh. Skipped while anything is outstanding or the
  /// user is editing or composing.
  pub fn poll(&mut self) -> Option<FetchRequest> {
    if !self.active
      || !self.polling
      || self.in_flight.is_some()
      || self.editing.is_some()
      || self.composing
    {
      return None;
    }
    self.begin(1, FetchMode::Replace)
  }

  fn restart(&mut self) -> Option<FetchRequest> {
    self.generation += 1;
    self.in_flight = None;
    if !self.active {
      return None;
    }
    self.begin(1, FetchMode::Replace)
  }

  fn begin(&mut self, page: u32, mode: FetchMode) -> Option<FetchRequest> {
    let tag = FetchTag { generation: self.generation, page, mode };
    self.in_flight = Some(tag);
    debug!(generation = tag.generation, page, ?mode, "fetch started");
    Some(FetchRequest { tag, query: self.query.clone() })
  }

  // ── Results ─────────────────────────────────────────────────────────────

  pub fn complete(&mut self, tag: FetchTag, result: Result<ContactPage>) -> Applied {
    if tag.generation != self.generation || self.in_flight != Some(tag) {
      debug!(generation = tag.generation, current = self.generation, page = tag.page, "stale result dropped");
      return Applied::Stale;
    }
    self.in_flight = None;

    let page = match result {
      Ok(page) => page,
      Err(e) => {
        warn!(error = %e, page = tag.page, "contact fetch failed");
        self.error = Some(FETCH_FAILED.to_owned());
        return Applied::Failed;
      }
    };

    self.error = None;
    self.page_number = tag.page;
    self.total_count = Some(page.total_count);

    match tag.mode {
      FetchMode::Replace => {
        let mut seen = HashSet::new();
        self.records = page.records.into_iter().filter(|c| seen.insert(c.contact_id)).collect();
        self.last_refresh = Some(Utc::now());
        Applied::Replaced { count: self.records.len() }
      }
      FetchMode::Append => {
        let mut seen: HashSet<ContactId> = self.records.iter().map(|c| c.contact_id).collect();
        let before = self.records.len();
        self.records.extend(page.records.into_iter().filter(|c| seen.insert(c.contact_id)));
        Applied::Appended { added: self.records.len() - before }
      }
    }
  }

  // ── Interactive state ───────────────────────────────────────────────────

  pub fn begin_edit(&mut self, id: ContactId) { self.editing = Some(id); }

  pub fn end_edit(&mut self) { self.editing = None; }

  /// An email or share dialog is open.
  pub fn set_composing(&mut self, composing: bool) { self.composing = composing; }

  pub fn set_polling(&mut self, polling: bool) { self.polling = polling; }
}

#[cfg(test)]
mod tests {
  use roster_core::{Error, query::ContactField};

  use super::*;
  use crate::testing::contact;

  fn page(ids: std::ops::RangeInclusive<i64>, number: u32, total: u64) -> Result<ContactPage> {
    Ok(ContactPage { records: ids.map(contact).collect(), page_number: number, total_count: total })
  }

  fn ids(view: &ViewSync) -> Vec<i64> { view.records().iter().map(|c| c.contact_id.0).collect() }

  fn active() -> (ViewSync, FetchTag) {
    let mut view = ViewSync::new(10, true);
    let first = view.activate().unwrap();
    (view, first.tag)
  }

  #[test]
  fn inactive_view_never_fetches() {
    let mut view = ViewSync::new(10, true);
    assert!(view.reload().is_none());
    assert!(view.poll().is_none());
    assert!(view.load_more().is_none());
    assert!(view.set_query(QueryPatch::search("bob")).is_none());
    assert_eq!(view.query().search_text, "bob");
  }

  #[test]
  fn stale_generation_never_lands() {
    let (mut view, _) = active();
    let g1 = view.set_query(QueryPatch::search("a")).unwrap().tag;
    let g2 = view.set_query(QueryPatch::search("ab")).unwrap().tag;
    assert!(g2.generation > g1.generation);

    assert!(matches!(view.complete(g2, page(11..=12, 1, 2)), Applied::Replaced { count: 2 }));
    assert_eq!(view.complete(g1, page(1..=10, 1, 40)), Applied::Stale);
    assert_eq!(ids(&view), vec![11, 12]);
    assert_eq!(view.total_count(), Some(2));
  }

  #[test]
  fn double_load_more_is_one_fetch() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));

    let more = view.load_more().unwrap();
    assert_eq!(more.tag.page, 2);
    assert!(view.load_more().is_none());
    assert_eq!(view.in_flight(), Some(more.tag));
  }

  #[test]
  fn twenty_five_records_in_three_pages() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    assert!(view.has_more());

    let second = view.load_more().unwrap().tag;
    assert!(view.load_more().is_none());
    view.complete(second, page(11..=20, 2, 25));
    assert_eq!(view.records().len(), 20);
    assert!(view.has_more());

    let third = view.load_more().unwrap().tag;
    assert_eq!(third.page, 3);
    view.complete(third, page(21..=25, 3, 25));
    assert_eq!(view.records().len(), 25);
    assert!(!view.has_more());
    assert!(view.load_more().is_none());
    assert_eq!(ids(&view), (1..=25).collect::<Vec<_>>());
  }

  #[test]
  fn sort_change_discards_old_page_two() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    let old_page_two = view.load_more().unwrap().tag;

    let sorted = view.set_query(QueryPatch::sort_by(ContactField::FirstName)).unwrap();
    assert_eq!(sorted.query.sort_field, ContactField::FirstName);
    assert_eq!(sorted.tag.page, 1);

    assert_eq!(view.complete(old_page_two, page(11..=20, 2, 25)), Applied::Stale);
    view.complete(sorted.tag, page(1..=10, 1, 25));
    assert_eq!(view.records().len(), 10);
    assert_eq!(view.page_number(), 1);
  }

  #[test]
  fn load_more_before_first_page_is_noop() {
    let (mut view, _) = active();
    assert!(!view.has_more());
    assert!(view.load_more().is_none());
  }

  #[test]
  fn poll_replaces_without_duplicates() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    let second = view.load_more().unwrap().tag;
    view.complete(second, page(11..=20, 2, 25));

    let poll = view.poll().unwrap().tag;
    assert_eq!(poll.page, 1);
    assert_eq!(poll.mode, FetchMode::Replace);

    // The server briefly repeats a row across the boundary.
    let mut refreshed = page(1..=10, 1, 25).unwrap();
    refreshed.records.push(contact(3));
    assert_eq!(view.complete(poll, Ok(refreshed)), Applied::Replaced { count: 10 });
    assert_eq!(ids(&view), (1..=10).collect::<Vec<_>>());
    assert!(view.last_refresh().is_some());
    assert!(view.has_more());
  }

  #[test]
  fn append_skips_known_ids() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    let second = view.load_more().unwrap().tag;
    // A record inserted upstream shifts page two by one.
    assert_eq!(view.complete(second, page(10..=19, 2, 26)), Applied::Appended { added: 9 });
    assert_eq!(ids(&view), (1..=19).collect::<Vec<_>>());
  }

  #[test]
  fn poll_waits_for_edit_compose_and_in_flight() {
    let (mut view, first) = active();
    assert!(view.poll().is_none());
    view.complete(first, page(1..=3, 1, 3));

    view.begin_edit(ContactId(2));
    assert!(view.poll().is_none());
    view.end_edit();

    view.set_composing(true);
    assert!(view.poll().is_none());
    view.set_composing(false);

    view.set_polling(false);
    assert!(view.poll().is_none());
    view.set_polling(true);

    assert!(view.poll().is_some());
  }

  #[test]
  fn failure_keeps_collection_and_sets_error() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    let poll = view.poll().unwrap().tag;

    assert_eq!(view.complete(poll, Err(Error::Server { status: 500, message: "boom".into() })), Applied::Failed);
    assert_eq!(view.records().len(), 10);
    assert_eq!(view.error(), Some(FETCH_FAILED));
    assert!(!view.is_loading());

    let again = view.poll().unwrap().tag;
    view.complete(again, page(1..=10, 1, 25));
    assert!(view.error().is_none());
  }

  #[test]
  fn reload_supersedes_outstanding_fetch() {
    let (mut view, first) = active();
    let reload = view.reload().unwrap().tag;
    assert_eq!(view.complete(first, page(1..=10, 1, 25)), Applied::Stale);
    assert!(matches!(view.complete(reload, page(1..=5, 1, 5)), Applied::Replaced { count: 5 }));
  }

  #[test]
  fn clear_resets_and_deactivates() {
    let (mut view, first) = active();
    view.complete(first, page(1..=10, 1, 25));
    let outstanding = view.load_more().unwrap().tag;
    view.begin_edit(ContactId(1));

    view.clear();
    assert!(!view.is_active());
    assert!(view.records().is_empty());
    assert_eq!(view.total_count(), None);
    assert_eq!(view.editing(), None);
    assert_eq!(view.complete(outstanding, page(11..=20, 2, 25)), Applied::Stale);
    assert!(view.poll().is_none());
  }
}
