//! Client configuration.

use std::{path::PathBuf, time::Duration};

use chrono::TimeDelta;
use serde::Deserialize;

use crate::session::SessionPolicy;

/// Runtime client configuration, deserialised from `roster.toml` and
/// `ROSTER_*` environment variables. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
  pub base_url:               String,
  pub page_size:              u32,
  pub poll_interval_secs:     u64,
  pub tick_interval_secs:     u64,
  pub refresh_threshold_secs: i64,
  pub warning_threshold_secs: i64,
  pub request_timeout_secs:   u64,
  pub polling_enabled:        bool,
  /// Where the credential store lives. A leading `~/` is expanded by the CLI.
  pub state_path:             PathBuf,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url:               "http://localhost:5000".into(),
      page_size:              10,
      poll_interval_secs:     5,
      tick_interval_secs:     60,
      refresh_threshold_secs: 300,
      warning_threshold_secs: 1800,
      request_timeout_secs:   30,
      polling_enabled:        true,
      state_path:             PathBuf::from("~/.local/share/roster/session.db"),
    }
  }
}

impl ClientConfig {
  pub fn session_policy(&self) -> SessionPolicy {
    SessionPolicy {
      refresh_threshold: TimeDelta::seconds(self.refresh_threshold_secs),
      warning_threshold: TimeDelta::seconds(self.warning_threshold_secs),
    }
  }

  pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs.max(1)) }

  pub fn tick_interval(&self) -> Duration { Duration::from_secs(self.tick_interval_secs.max(1)) }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_config_keeps_defaults() {
    let cfg: ClientConfig =
      serde_json::from_value(serde_json::json!({ "base_url": "https://contacts.example", "page_size": 25 }))
        .unwrap();
    assert_eq!(cfg.base_url, "https://contacts.example");
    assert_eq!(cfg.page_size, 25);
    assert_eq!(cfg.poll_interval(), Duration::from_secs(5));
    assert_eq!(cfg.tick_interval(), Duration::from_secs(60));
    assert_eq!(cfg.session_policy(), SessionPolicy::default());
  }
}
