//! [`SqliteStore`] — the SQLite implementation of [`CredentialStore`].

use std::{collections::HashMap, future::Future, path::Path};

use roster_core::{
  credential::{Credential, Identity},
  store::CredentialStore,
};

use crate::{
  Result,
  schema::{KEY_ROLE, KEY_TOKEN, KEY_USERNAME, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A credential store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write a raw key. Only used by tests to simulate a torn write.
  #[cfg(test)]
  pub(crate) async fn put_raw(&self, key: &'static str, value: &str) -> Result<()> {
    let value = value.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO credential (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          rusqlite::params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = crate::Error;

  fn save<'a>(
    &'a self,
    credential: &'a Credential,
  ) -> impl Future<Output = Result<()>> + Send + 'a {
    let rows = [
      (KEY_TOKEN, credential.token().to_owned()),
      (KEY_USERNAME, credential.username().to_owned()),
      (KEY_ROLE, credential.role().to_owned()),
    ];
    async move {
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          {
            let mut stmt = tx.prepare(
              "INSERT INTO credential (key, value) VALUES (?1, ?2)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )?;
            for (key, value) in &rows {
              stmt.execute(rusqlite::params![key, value])?;
            }
          }
          tx.commit()?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }

  fn load(&self) -> impl Future<Output = Result<Option<Credential>>> + Send + '_ {
    async move {
      let mut rows: HashMap<String, String> = self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT key, value FROM credential")?;
          let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
          Ok(rows)
        })
        .await?;

      // A partial set of keys is treated as no credential at all.
      let (Some(token), Some(username), Some(role)) = (
        rows.remove(KEY_TOKEN),
        rows.remove(KEY_USERNAME),
        rows.remove(KEY_ROLE),
      ) else {
        return Ok(None);
      };
      Ok(Some(Credential::from_parts(token, Identity { username, role })))
    }
  }

  fn clear(&self) -> impl Future<Output = Result<()>> + Send + '_ {
    async move {
      self
        .conn
        .call(|conn| {
          conn.execute(
            "DELETE FROM credential WHERE key IN (?1, ?2, ?3)",
            rusqlite::params![KEY_TOKEN, KEY_USERNAME, KEY_ROLE],
          )?;
          Ok(())
        })
        .await?;
      Ok(())
    }
  }
}
