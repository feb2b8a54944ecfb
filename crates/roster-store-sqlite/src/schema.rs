//! SQL schema for the Roster credential store.

/// Key names. Always written and deleted as a set.
pub const KEY_TOKEN: &str = "token";
pub const KEY_USERNAME: &str = "username";
pub const KEY_ROLE: &str = "role";

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per credential key: token, username, role.
CREATE TABLE IF NOT EXISTS credential (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
