//! Session lifecycle: login, proactive refresh, and forced logout.
//!
//! The manager is the only writer of the current credential. It owns the
//! credential store and re-evaluates the held token on every tick:
//!
//! | time until expiry         | action                          |
//! |---------------------------|---------------------------------|
//! | undecodable or `< 0`      | forced logout                   |
//! | `< refresh_threshold`     | one refresh; failure → logout   |
//! | otherwise                 | nothing                         |

use chrono::TimeDelta;
use roster_core::{
  AuthError, Error, Result,
  api::{AuthApi, Signup},
  credential::Credential,
  store::CredentialStore,
  token,
};
use tracing::{info, warn};

/// Shown to the user after any forced logout.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

// ─── Policy and outcomes ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
  /// Refresh once fewer than this much time remains.
  pub refresh_threshold: TimeDelta,
  /// Warn the user once fewer than this much time remains.
  pub warning_threshold: TimeDelta,
}

impl Default for SessionPolicy {
  fn default() -> Self {
    Self {
      refresh_threshold: TimeDelta::minutes(5),
      warning_threshold: TimeDelta::minutes(30),
    }
  }
}

/// Derived authentication state. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  Unauthenticated,
  Authenticated(Credential),
  /// Authenticated, but inside the warning window.
  Expiring(Credential),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
  /// The token's expiry has passed.
  Expired,
  /// The token could not be decoded.
  Undecodable,
  /// A refresh was attempted and did not succeed.
  RefreshFailed,
  /// The server answered 401.
  Rejected,
}

/// Informational countdown; never changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWarning {
  /// Whole minutes left, rounded down.
  pub minutes: i64,
  /// Ten minutes or fewer.
  pub urgent:  bool,
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
  /// No credential held.
  Idle,
  /// Credential is comfortably valid.
  Valid(TimeDelta),
  /// Credential was close to expiry and has been replaced.
  Refreshed,
  LoggedOut(LogoutReason),
}

// ─── SessionManager ──────────────────────────────────────────────────────────

pub struct SessionManager<A, S> {
  api:        A,
  store:      S,
  policy:     SessionPolicy,
  credential: Option<Credential>,
  notice:     Option<String>,
}

impl<A, S> SessionManager<A, S>
where
  A: AuthApi,
  S: CredentialStore,
{
  /// A manager with no credential. Call [`Self::restore`] to pick up a
  /// persisted one.
  pub fn new(api: A, store: S, policy: SessionPolicy) -> Self {
    Self { api, store, policy, credential: None, notice: None }
  }

  pub fn api(&self) -> &A { &self.api }

  pub fn credential(&self) -> Option<&Credential> { self.credential.as_ref() }

  pub fn is_authenticated(&self) -> bool { self.credential.is_some() }

  /// The last user-facing session message, e.g. after a forced logout.
  pub fn notice(&self) -> Option<&str> { self.notice.as_deref() }

  pub fn state(&self) -> SessionState {
    match &self.credential {
      None => SessionState::Unauthenticated,
      Some(c) if self.expiry_warning().is_some() => SessionState::Expiring(c.clone()),
      Some(c) => SessionState::Authenticated(c.clone()),
    }
  }

  /// `Some` while authenticated and strictly inside the warning window.
  pub fn expiry_warning(&self) -> Option<ExpiryWarning> {
    let remaining = token::time_until_expiry(self.credential.as_ref()?.token()).ok()?;
    if remaining <= TimeDelta::zero() || remaining >= self.policy.warning_threshold {
      return None;
    }
    let minutes = remaining.num_minutes();
    Some(ExpiryWarning { minutes, urgent: minutes <= 10 })
  }

  // ── Transitions ─────────────────────────────────────────────────────────

  /// Application start: load the persisted credential and judge it at once,
  /// so a reload never silently resurrects an expired session.
  pub async fn restore(&mut self) -> TickOutcome {
    self.credential = match self.store.load().await {
      Ok(found) => found,
      Err(e) => {
        warn!(error = %e, "could not read stored credential; starting signed out");
        None
      }
    };
    self.tick().await
  }

  pub async fn login(&mut self, username: &str, password: &str) -> Result<&Credential> {
    let credential = self.api.login(username, password).await?;
    self.persist(&credential).await;
    self.notice = None;
    info!(username = credential.username(), role = credential.role(), "logged in");
    Ok(&*self.credential.insert(credential))
  }

  /// Create an account. The caller must log in separately.
  pub async fn signup(&self, username: &str, password: &str, contact_email: &str) -> Result<()> {
    let signup = Signup {
      username:      username.to_owned(),
      password:      password.to_owned(),
      contact_email: contact_email.to_owned(),
    };
    self.api.register(&signup).await?;
    info!(username, "account created");
    Ok(())
  }

  /// Periodic expiry check. Attempts at most one refresh.
  pub async fn tick(&mut self) -> TickOutcome {
    let Some(credential) = &self.credential else {
      return TickOutcome::Idle;
    };

    let remaining = match token::time_until_expiry(credential.token()) {
      Ok(remaining) => remaining,
      Err(e) => {
        warn!(error = %e, "held token does not decode");
        return self.expire(LogoutReason::Undecodable).await;
      }
    };

    if remaining < TimeDelta::zero() {
      self.expire(LogoutReason::Expired).await
    } else if remaining < self.policy.refresh_threshold {
      info!(seconds_left = remaining.num_seconds(), "token expiring soon; refreshing");
      match self.refresh().await {
        Ok(_) => TickOutcome::Refreshed,
        Err(_) => TickOutcome::LoggedOut(LogoutReason::RefreshFailed),
      }
    } else {
      TickOutcome::Valid(remaining)
    }
  }

  /// Swap the current credential for a fresh one. Any failure logs out.
  pub async fn refresh(&mut self) -> Result<&Credential> {
    let Some(current) = &self.credential else {
      return Err(Error::NotAuthenticated);
    };

    match self.api.refresh(current).await {
      Ok(fresh) => {
        self.persist(&fresh).await;
        info!(username = fresh.username(), "session refreshed");
        Ok(&*self.credential.insert(fresh))
      }
      Err(e) => {
        warn!(error = %e, "refresh failed");
        self.force_logout(LogoutReason::RefreshFailed).await;
        Err(AuthError::Expired.into())
      }
    }
  }

  /// User-initiated logout. Always succeeds.
  pub async fn logout(&mut self) {
    self.discard().await;
    self.notice = None;
    info!("logged out");
  }

  /// Logout on expiry, decode failure, refresh failure or a server 401.
  /// A no-op when already signed out.
  pub async fn force_logout(&mut self, reason: LogoutReason) {
    if self.credential.is_none() {
      return;
    }
    self.discard().await;
    self.notice = Some(SESSION_EXPIRED.to_owned());
    warn!(?reason, "session ended");
  }

  async fn expire(&mut self, reason: LogoutReason) -> TickOutcome {
    self.force_logout(reason).await;
    TickOutcome::LoggedOut(reason)
  }

  async fn persist(&self, credential: &Credential) {
    if let Err(e) = self.store.save(credential).await {
      warn!(error = %e, "could not persist credential; session will not survive a restart");
    }
  }

  async fn discard(&mut self) {
    self.credential = None;
    if let Err(e) = self.store.clear().await {
      warn!(error = %e, "could not clear stored credential");
    }
  }
}
