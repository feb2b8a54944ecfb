//! `roster watch`: the live listing.
//!
//! Lines typed on stdin become controller commands:
//!
//! ```text
//! more | reload | search <text> | sort <field> [asc|desc]
//! filter <field> [value] | edit <id> | done | pause | resume | logout | quit
//! ```

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use roster_client::Command;
use roster_core::{
  contact::ContactId,
  query::{QueryPatch, SortDirection},
};
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  sync::mpsc,
};

use crate::{App, output};

/// What the last render showed; redraw only when it changes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Shown {
  generation:   u64,
  page:         u32,
  len:          usize,
  last_refresh: Option<DateTime<Utc>>,
  error:        bool,
  signed_in:    bool,
  warning:      Option<i64>,
}

impl Shown {
  fn of(roster: &App) -> Self {
    let view = roster.view();
    Self {
      generation:   view.generation(),
      page:         view.page_number(),
      len:          view.records().len(),
      last_refresh: view.last_refresh(),
      error:        view.error().is_some(),
      signed_in:    roster.session().is_authenticated(),
      warning:      roster.session().expiry_warning().map(|w| w.minutes),
    }
  }
}

pub async fn run(roster: &mut App) -> anyhow::Result<()> {
  let (tx, rx) = mpsc::channel(16);
  let reader = tokio::spawn(read_commands(tx));

  let mut shown = Shown::default();
  roster
    .run(rx, |roster| {
      let now = Shown::of(roster);
      if now == shown || roster.view().is_loading() {
        return;
      }
      render(roster);
      shown = now;
    })
    .await;

  reader.await.context("stdin reader panicked")?
}

fn render(roster: &App) {
  println!();
  match roster.session().notice() {
    Some(notice) if !roster.session().is_authenticated() => println!("{notice}"),
    _ => output::print_view(roster.view()),
  }
  if let Some(warning) = roster.session().expiry_warning() {
    println!("{}", output::expiry_line(warning.minutes, warning.urgent));
  }
}

async fn read_commands(tx: mpsc::Sender<Command>) -> anyhow::Result<()> {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await.context("reading stdin")? {
    match parse_line(&line) {
      Ok(Some(command)) => {
        if tx.send(command).await.is_err() {
          break;
        }
      }
      Ok(None) => break,
      Err(e) => eprintln!("{e}"),
    }
  }
  Ok(())
}

/// `Ok(None)` means quit.
fn parse_line(line: &str) -> Result<Option<Command>, String> {
  let mut words = line.split_whitespace();
  let Some(verb) = words.next() else {
    return Err("type a command, or `quit`".into());
  };
  let rest: Vec<&str> = words.collect();
  let command = match (verb, rest.as_slice()) {
    ("quit" | "q", _) => return Ok(None),
    ("more", []) => Command::LoadMore,
    ("reload", []) => Command::Reload,
    ("pause", []) => Command::SetPolling(false),
    ("resume", []) => Command::SetPolling(true),
    ("done", []) => Command::EndEdit,
    ("logout", []) => Command::Logout,
    ("search", words) => Command::SetQuery(QueryPatch::search(words.join(" "))),
    ("sort", [field]) => Command::SetQuery(QueryPatch::sort_by(field.parse()?)),
    ("sort", [field, dir]) => {
      let direction: SortDirection = dir.parse()?;
      Command::SetQuery(QueryPatch::sort_by(field.parse()?).direction(direction))
    }
    ("filter", [field, value @ ..]) => {
      Command::SetQuery(QueryPatch::default().filter(field.parse()?, value.join(" ")))
    }
    ("edit", [id]) => {
      let id = id.parse().map_err(|_| format!("not a contact id: {id:?}"))?;
      Command::BeginEdit(ContactId(id))
    }
    _ => return Err(format!("unknown command: {line:?}")),
  };
  Ok(Some(command))
}
