//! `roster` — command-line client for a contacts server.
//!
//! # Usage
//!
//! ```
//! roster login alice
//! roster list --q smith --sort first_name --pages 2
//! roster watch
//! roster --config ~/.config/roster/roster.toml status
//! ```

mod output;
mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use roster_client::{ClientConfig, Gateway, Roster, SessionState};
use roster_core::{
  contact::{ContactDraft, ContactId, EmailMessage, ShareRequest},
  query::{ContactField, QueryPatch, SortDirection},
};
use roster_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub(crate) type App = Roster<Gateway, SqliteStore>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Command-line client for a contacts server")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", default_value = "roster.toml")]
  config: PathBuf,

  /// Base URL of the contacts server (default: http://localhost:5000).
  #[arg(long, env = "ROSTER_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Sign in and remember the session.
  Login {
    username: String,
    /// Read from stdin when not given.
    #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Create an account. Log in separately afterwards.
  Signup {
    username: String,
    email:    String,
    #[arg(long, env = "ROSTER_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Forget the stored session.
  Logout,
  /// Show who is signed in and how long the session has left.
  Status,
  /// Print contacts.
  List(ListArgs),
  /// Keep the listing live, refreshing in the background.
  Watch(ListArgs),
  /// Create a contact.
  Add(ContactArgs),
  /// Change a contact. Fields not given keep their current value.
  Edit {
    id: i64,
    #[command(flatten)]
    fields: ContactArgs,
  },
  /// Delete a contact.
  Delete { id: i64 },
  /// Ask the server to email one contact.
  Email { id: i64, subject: String, message: String },
  /// Send a set of contacts to someone.
  Share {
    recipient: String,
    #[arg(required = true)]
    ids:       Vec<i64>,
    #[arg(long)]
    subject:   Option<String>,
    #[arg(long, default_value = "")]
    message:   String,
  },
  /// Check that the server is reachable.
  Health,
}

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct ListArgs {
  /// Free-text search.
  #[arg(long)]
  q:       Option<String>,
  /// Sort column, e.g. `first_name`.
  #[arg(long)]
  sort:    Option<ContactField>,
  /// Sort descending.
  #[arg(long)]
  desc:    bool,
  /// Substring filter, `field=value`. Repeatable.
  #[arg(long = "filter", value_parser = parse_filter)]
  filters: Vec<(ContactField, String)>,
  /// How many pages to load.
  #[arg(long, default_value_t = 1)]
  pages:   u32,
}

impl ListArgs {
  fn patch(&self) -> QueryPatch {
    QueryPatch {
      search_text:    self.q.clone(),
      filters:        self.filters.iter().cloned().collect(),
      sort_field:     self.sort,
      sort_direction: self.desc.then_some(SortDirection::Desc),
    }
  }
}

#[derive(Args, Debug, Clone, Default)]
struct ContactArgs {
  #[arg(long)]
  first:   Option<String>,
  #[arg(long)]
  last:    Option<String>,
  #[arg(long)]
  phone:   Option<String>,
  #[arg(long)]
  email:   Option<String>,
  #[arg(long)]
  address: Option<String>,
}

impl ContactArgs {
  fn apply_to(self, draft: &mut ContactDraft) {
    let fields = [
      (self.first, &mut draft.first_name),
      (self.last, &mut draft.last_name),
      (self.phone, &mut draft.phone_number),
      (self.email, &mut draft.email_address),
      (self.address, &mut draft.address),
    ];
    for (value, slot) in fields {
      if let Some(value) = value {
        *slot = value;
      }
    }
  }
}

fn parse_filter(s: &str) -> Result<(ContactField, String), String> {
  let (field, value) = s.split_once('=').ok_or_else(|| format!("expected field=value, got {s:?}"))?;
  Ok((field.trim().parse()?, value.to_owned()))
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(log_filter(&std::env::var("RUST_LOG").unwrap_or_default()))
    .init();

  let cli = Cli::parse();
  let config = load_config(&cli)?;
  let gateway = Gateway::from_config(&config).context("failed to build HTTP client")?;

  let state_path = expand_tilde(&config.state_path);
  if let Some(parent) = state_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&state_path)
    .await
    .with_context(|| format!("failed to open session store at {state_path:?}"))?;

  let mut roster = Roster::new(gateway, store, &config);

  match cli.command {
    Cmd::Login { username, password } => {
      let password = password_or_stdin(password)?;
      roster.authenticate(&username, &password).await?;
      if let Some(credential) = roster.session().credential() {
        println!("Logged in as {} ({})", credential.username(), credential.role());
      }
    }
    Cmd::Signup { username, email, password } => {
      let password = password_or_stdin(password)?;
      roster.signup(&username, &password, &email).await?;
      println!("Account {username} created. Run `roster login {username}` to sign in.");
    }
    Cmd::Logout => {
      roster.logout().await;
      println!("Logged out");
    }
    Cmd::Status => {
      roster.start().await;
      output::print_status(&roster);
    }
    Cmd::List(args) => {
      roster.set_query(args.patch());
      signed_in(&mut roster).await?;
      settle(&mut roster).await;
      for _ in 1..args.pages {
        if !roster.view().has_more() {
          break;
        }
        roster.load_more();
        settle(&mut roster).await;
      }
      still_signed_in(&roster)?;
      output::print_view(roster.view());
    }
    Cmd::Watch(args) => {
      roster.set_query(args.patch());
      signed_in(&mut roster).await?;
      watch::run(&mut roster).await?;
    }
    Cmd::Add(fields) => {
      signed_in(&mut roster).await?;
      let mut draft = ContactDraft::default();
      fields.apply_to(&mut draft);
      roster.create_contact(&draft).await?;
      println!("Contact created");
    }
    Cmd::Edit { id, fields } => {
      signed_in(&mut roster).await?;
      let id = ContactId(id);
      let mut draft = find(&mut roster, id).await?;
      fields.apply_to(&mut draft);
      roster.begin_edit(id);
      roster.update_contact(id, &draft).await?;
      println!("Contact {id} updated");
    }
    Cmd::Delete { id } => {
      signed_in(&mut roster).await?;
      roster.delete_contact(ContactId(id)).await?;
      println!("Contact {id} deleted");
    }
    Cmd::Email { id, subject, message } => {
      signed_in(&mut roster).await?;
      roster.set_composing(true);
      let reply = roster.send_email(ContactId(id), &EmailMessage { subject, message }).await;
      roster.set_composing(false);
      println!("{}", reply?);
    }
    Cmd::Share { recipient, ids, subject, message } => {
      signed_in(&mut roster).await?;
      let mut request = ShareRequest::new(recipient, ids.into_iter().map(ContactId).collect());
      if let Some(subject) = subject {
        request.subject = subject;
      }
      request.message = message;
      roster.set_composing(true);
      let reply = roster.share_contacts(&request).await;
      roster.set_composing(false);
      println!("{}", reply?);
    }
    Cmd::Health => {
      roster
        .session()
        .api()
        .health()
        .await
        .with_context(|| format!("{} is not reachable", config.base_url))?;
      println!("{} is up", config.base_url);
    }
  }

  Ok(())
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// `RUST_LOG` directives over an `INFO` default.
fn log_filter(directives: &str) -> EnvFilter {
  EnvFilter::builder()
    .with_default_directive(LevelFilter::INFO.into())
    .parse_lossy(directives)
}

/// Config file, then `ROSTER_*` environment variables, then `--url`.
fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(config::Environment::with_prefix("ROSTER"))
    .build()
    .context("failed to read config file")?;

  let mut config: ClientConfig = settings
    .try_deserialize()
    .context("failed to deserialise ClientConfig")?;
  if let Some(url) = &cli.url {
    config.base_url = url.clone();
  }
  Ok(config)
}

/// Restore the stored session, or fail with the reason there is none.
async fn signed_in(roster: &mut App) -> anyhow::Result<()> {
  roster.start().await;
  still_signed_in(roster)
}

fn still_signed_in(roster: &App) -> anyhow::Result<()> {
  if let SessionState::Unauthenticated = roster.session().state() {
    match roster.session().notice() {
      Some(notice) => bail!("{notice}"),
      None => bail!("Not logged in. Run `roster login <username>` first."),
    }
  }
  Ok(())
}

/// Apply fetch results until nothing is outstanding.
async fn settle(roster: &mut App) {
  while roster.view().is_loading() {
    roster.next_completion().await;
  }
}

/// Page through the listing until `id` turns up.
async fn find(roster: &mut App, id: ContactId) -> anyhow::Result<ContactDraft> {
  settle(roster).await;
  loop {
    if let Some(contact) = roster.view().records().iter().find(|c| c.contact_id == id) {
      return Ok(ContactDraft::from(contact));
    }
    if !roster.view().has_more() {
      still_signed_in(roster)?;
      bail!("no contact with id {id}");
    }
    roster.load_more();
    settle(roster).await;
  }
}

/// Read a password from stdin when it was not passed in.
fn password_or_stdin(given: Option<String>) -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  if let Some(password) = given {
    return Ok(password);
  }
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
