//! The controller: one session, one view, two timers.
//!
//! `Roster` is the only place a gateway result is inspected for a 401. Such
//! a result signs the user out and empties the view before the error reaches
//! the caller, so no further request goes out with the rejected credential.

use std::time::Duration;

use roster_core::{
  Error, Result,
  api::{AuthApi, ContactsApi},
  contact::{ContactDraft, ContactId, ContactPage, EmailMessage, ShareRequest},
  credential::Credential,
  query::QueryPatch,
  store::CredentialStore,
};
use tokio::{
  sync::mpsc,
  time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
  config::ClientConfig,
  session::{LogoutReason, SessionManager, TickOutcome},
  sync::{Applied, FetchRequest, FetchTag, ViewSync},
};

/// A finished fetch, with the token it was sent with.
struct Completion {
  tag:    FetchTag,
  token:  String,
  result: Result<ContactPage>,
}

/// Requests the front end feeds into [`Roster::run`].
#[derive(Debug, Clone)]
pub enum Command {
  SetQuery(QueryPatch),
  LoadMore,
  Reload,
  SetPolling(bool),
  BeginEdit(ContactId),
  EndEdit,
  SetComposing(bool),
  Logout,
}

pub struct Roster<A, S> {
  session:        SessionManager<A, S>,
  view:           ViewSync,
  completions_tx: mpsc::UnboundedSender<Completion>,
  completions_rx: mpsc::UnboundedReceiver<Completion>,
  tick_interval:  Duration,
  poll_interval:  Duration,
}

impl<A, S> Roster<A, S>
where
  A: AuthApi + ContactsApi + Clone + 'static,
  S: CredentialStore,
{
  pub fn new(api: A, store: S, config: &ClientConfig) -> Self {
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    Self {
      session: SessionManager::new(api, store, config.session_policy()),
      view: ViewSync::new(config.page_size, config.polling_enabled),
      completions_tx,
      completions_rx,
      tick_interval: config.tick_interval(),
      poll_interval: config.poll_interval(),
    }
  }

  pub fn session(&self) -> &SessionManager<A, S> { &self.session }

  pub fn view(&self) -> &ViewSync { &self.view }

  // ── Session ─────────────────────────────────────────────────────────────

  /// Restore the persisted session, judge it, and start loading contacts if
  /// it survived.
  pub async fn start(&mut self) -> TickOutcome {
    let outcome = self.session.restore().await;
    if self.session.is_authenticated() {
      let req = self.view.activate();
      self.dispatch(req);
    }
    outcome
  }

  pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
    self.session.login(username, password).await?;
    self.view.clear();
    let req = self.view.activate();
    self.dispatch(req);
    Ok(())
  }

  /// Log in without loading any contacts. The view stays inactive until
  /// [`Self::start`].
  pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
    self.session.login(username, password).await?;
    self.view.clear();
    Ok(())
  }

  pub async fn signup(&self, username: &str, password: &str, contact_email: &str) -> Result<()> {
    self.session.signup(username, password, contact_email).await
  }

  pub async fn logout(&mut self) {
    self.session.logout().await;
    self.view.clear();
  }

  /// Session expiry check; a forced logout also empties the view.
  pub async fn tick(&mut self) -> TickOutcome {
    let outcome = self.session.tick().await;
    if matches!(outcome, TickOutcome::LoggedOut(_)) {
      self.view.clear();
    }
    outcome
  }

  // ── View triggers ───────────────────────────────────────────────────────

  pub fn poll(&mut self) {
    let req = self.view.poll();
    self.dispatch(req);
  }

  pub fn load_more(&mut self) {
    let req = self.view.load_more();
    self.dispatch(req);
  }

  pub fn set_query(&mut self, patch: QueryPatch) {
    let req = self.view.set_query(patch);
    self.dispatch(req);
  }

  pub fn reload(&mut self) {
    let req = self.view.reload();
    self.dispatch(req);
  }

  pub fn begin_edit(&mut self, id: ContactId) { self.view.begin_edit(id); }

  pub fn end_edit(&mut self) { self.view.end_edit(); }

  pub fn set_composing(&mut self, composing: bool) { self.view.set_composing(composing); }

  pub fn set_polling(&mut self, polling: bool) { self.view.set_polling(polling); }

  fn dispatch(&mut self, req: Option<FetchRequest>) {
    let Some(FetchRequest { tag, query }) = req else { return };
    let Some(credential) = self.session.credential().cloned() else {
      warn!(generation = tag.generation, "fetch requested while signed out");
      self.view.clear();
      return;
    };
    let api = self.session.api().clone();
    let tx = self.completions_tx.clone();
    tokio::spawn(async move {
      let result = api.fetch_page(Some(&credential), &query, tag.page).await;
      let token = credential.token().to_owned();
      // The receiver lives as long as the controller.
      let _ = tx.send(Completion { tag, token, result });
    });
  }

  // ── Results ─────────────────────────────────────────────────────────────

  /// Wait for the next fetch to finish and apply it.
  pub async fn next_completion(&mut self) -> Applied {
    match self.completions_rx.recv().await {
      Some(completion) => self.apply(completion).await,
      None => Applied::Stale,
    }
  }

  /// A 401 for the credential still held ends the session whatever the
  /// generation; a 401 for an older credential is only a stale result.
  async fn apply(&mut self, Completion { tag, token, result }: Completion) -> Applied {
    let held = self.session.credential().is_some_and(|c| c.token() == token);
    if held && matches!(result, Err(Error::Unauthorized)) {
      self.reject().await;
      return Applied::Failed;
    }
    let applied = self.view.complete(tag, result);
    debug!(?applied, records = self.view.records().len(), "fetch applied");
    applied
  }

  async fn reject(&mut self) {
    self.session.force_logout(LogoutReason::Rejected).await;
    self.view.clear();
  }

  async fn intercept<T>(&mut self, result: Result<T>) -> Result<T> {
    if matches!(result, Err(Error::Unauthorized)) {
      self.reject().await;
    }
    result
  }

  fn require(&self) -> Result<Credential> {
    self.session.credential().cloned().ok_or(Error::NotAuthenticated)
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  pub async fn create_contact(&mut self, draft: &ContactDraft) -> Result<()> {
    let credential = self.require()?;
    let result = self.session.api().create_contact(Some(&credential), draft).await;
    self.intercept(result).await?;
    info!("contact created");
    self.after_mutation();
    Ok(())
  }

  pub async fn update_contact(&mut self, id: ContactId, draft: &ContactDraft) -> Result<()> {
    let credential = self.require()?;
    let result = self.session.api().update_contact(Some(&credential), id, draft).await;
    self.intercept(result).await?;
    info!(%id, "contact updated");
    self.after_mutation();
    Ok(())
  }

  pub async fn delete_contact(&mut self, id: ContactId) -> Result<()> {
    let credential = self.require()?;
    let result = self.session.api().delete_contact(Some(&credential), id).await;
    self.intercept(result).await?;
    info!(%id, "contact deleted");
    self.after_mutation();
    Ok(())
  }

  /// Returns the server's confirmation message.
  pub async fn send_email(&mut self, id: ContactId, email: &EmailMessage) -> Result<String> {
    let credential = self.require()?;
    let result = self.session.api().send_email(Some(&credential), id, email).await;
    self.intercept(result).await
  }

  pub async fn share_contacts(&mut self, request: &ShareRequest) -> Result<String> {
    let credential = self.require()?;
    let result = self.session.api().share_contacts(Some(&credential), request).await;
    self.intercept(result).await
  }

  fn after_mutation(&mut self) {
    self.view.end_edit();
    let req = self.view.reload();
    self.dispatch(req);
  }

  // ── Event loop ──────────────────────────────────────────────────────────

  pub async fn handle(&mut self, command: Command) {
    match command {
      Command::SetQuery(patch) => self.set_query(patch),
      Command::LoadMore => self.load_more(),
      Command::Reload => self.reload(),
      Command::SetPolling(on) => self.set_polling(on),
      Command::BeginEdit(id) => self.begin_edit(id),
      Command::EndEdit => self.end_edit(),
      Command::SetComposing(on) => self.set_composing(on),
      Command::Logout => self.logout().await,
    }
  }

  /// Drive both timers, apply fetch results and handle commands until the
  /// command channel closes. `on_update` runs after every event.
  pub async fn run<F>(&mut self, mut commands: mpsc::Receiver<Command>, mut on_update: F)
  where
    F: FnMut(&Self),
  {
    let mut tick = time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
    let mut poll = time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
      tokio::select! {
        _ = tick.tick() => {
          self.tick().await;
        }
        _ = poll.tick() => self.poll(),
        Some(completion) = self.completions_rx.recv() => {
          self.apply(completion).await;
        }
        command = commands.recv() => match command {
          Some(command) => self.handle(command).await,
          None => break,
        },
      }
      on_update(self);
    }
    debug!("command channel closed; controller stopped");
  }
}
