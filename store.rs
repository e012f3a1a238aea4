// Copyright 2018-2026 the Deno authors. MIT license.

//! Ordered store adapter (C4): a thin wrapper around a single SQLite
//! connection exposing the six CRUD/range primitives spec.md §4.4 names,
//! grounded on the teacher's `cli/cache/cache_db.rs` connection-management
//! pattern (WAL pragmas, prepared statement reuse, transaction helper).

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;

use crate::error::Error;

const TABLE_SQL: &str = "
  CREATE TABLE IF NOT EXISTS kv_store (
    key_hash     TEXT PRIMARY KEY,
    value        BLOB NOT NULL,
    versionstamp TEXT NOT NULL,
    expires_at   INTEGER
  );
  CREATE INDEX IF NOT EXISTS idx_kv_expires
    ON kv_store (expires_at) WHERE expires_at IS NOT NULL;
";

fn run_pragmas(conn: &Connection) -> Result<(), Error> {
  conn.execute_batch(
    "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;",
  )?;
  Ok(())
}

/// A decoded row of the backing table.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
  pub key_hash: String,
  pub value: Vec<u8>,
  pub versionstamp: String,
  pub expires_at: Option<i64>,
}

/// Owns the single SQLite connection backing a [`crate::engine::Kv`]
/// handle. Concurrent access from multiple threads is serialized by the
/// mutex, matching spec.md §5's "single shared mutable resource" model.
pub struct Store {
  conn: Mutex<Connection>,
}

impl Store {
  pub fn open(path: Option<&Path>) -> Result<Self, Error> {
    let conn = match path {
      Some(path) => {
        log::debug!("opening kv store at {}", path.display());
        Connection::open(path)?
      }
      None => {
        log::debug!("opening in-memory kv store");
        Connection::open_in_memory()?
      }
    };
    run_pragmas(&conn)?;
    conn.execute_batch(TABLE_SQL)?;
    Ok(Store { conn: Mutex::new(conn) })
  }

  pub fn with_connection<T>(
    &self,
    f: impl FnOnce(&Connection) -> Result<T, Error>,
  ) -> Result<T, Error> {
    let conn = self.conn.lock();
    f(&conn)
  }

  /// Runs `f` inside a SQLite transaction. On `Ok`, commits; on `Err`,
  /// rolls back and propagates the error.
  pub fn with_transaction<T>(
    &self,
    f: impl FnOnce(&Transaction) -> Result<T, Error>,
  ) -> Result<T, Error> {
    let mut conn = self.conn.lock();
    let tx = conn.transaction()?;
    match f(&tx) {
      Ok(value) => {
        tx.commit()?;
        Ok(value)
      }
      Err(err) => {
        log::trace!("rolling back kv transaction: {err}");
        // `tx` drops here, which rolls back implicitly; explicit for clarity.
        drop(tx);
        Err(err)
      }
    }
  }
}

pub fn get(
  conn: &Connection,
  key_hash: &str,
  now: i64,
) -> Result<Option<StoredEntry>, Error> {
  conn
    .query_row(
      "SELECT key_hash, value, versionstamp, expires_at FROM kv_store
       WHERE key_hash = ?1 AND (expires_at IS NULL OR expires_at > ?2)",
      params![key_hash, now],
      row_to_entry,
    )
    .optional()
    .map_err(Error::from)
}

pub fn put(
  conn: &Connection,
  key_hash: &str,
  value: &[u8],
  versionstamp: &str,
  expires_at: Option<i64>,
) -> Result<(), Error> {
  conn.execute(
    "INSERT INTO kv_store (key_hash, value, versionstamp, expires_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(key_hash) DO UPDATE SET
       value = excluded.value,
       versionstamp = excluded.versionstamp,
       expires_at = excluded.expires_at",
    params![key_hash, value, versionstamp, expires_at],
  )?;
  Ok(())
}

pub fn delete(conn: &Connection, key_hash: &str) -> Result<(), Error> {
  conn.execute("DELETE FROM kv_store WHERE key_hash = ?1", params![key_hash])?;
  Ok(())
}

/// Half-open range scan: `start_hash <= key_hash < end_hash`, excluding the
/// bare prefix row and expired rows. `reverse` flips sort order, keeping
/// the same bounds.
#[allow(clippy::too_many_arguments)]
pub fn range(
  conn: &Connection,
  start_hash: &str,
  end_hash: &str,
  prefix_hash: &str,
  now: i64,
  limit: usize,
  reverse: bool,
) -> Result<Vec<StoredEntry>, Error> {
  let order = if reverse { "DESC" } else { "ASC" };
  let sql = format!(
    "SELECT key_hash, value, versionstamp, expires_at FROM kv_store
     WHERE key_hash >= ?1 AND key_hash < ?2
       AND key_hash != ?3
       AND (expires_at IS NULL OR expires_at > ?4)
     ORDER BY key_hash {order}
     LIMIT ?5"
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt.query_map(
    params![start_hash, end_hash, prefix_hash, now, limit as i64],
    row_to_entry,
  )?;
  let mut out = Vec::new();
  for row in rows {
    out.push(row?);
  }
  Ok(out)
}

/// Deletes every row past its expiry and returns how many were removed.
pub fn delete_expired(conn: &Connection, now: i64) -> Result<usize, Error> {
  let removed = conn.execute(
    "DELETE FROM kv_store WHERE expires_at IS NOT NULL AND expires_at <= ?1",
    params![now],
  )?;
  Ok(removed)
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<StoredEntry> {
  Ok(StoredEntry {
    key_hash: row.get(0)?,
    value: row.get(1)?,
    versionstamp: row.get(2)?,
    expires_at: row.get(3)?,
  })
}
