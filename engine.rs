// Copyright 2018-2026 the Deno authors. MIT license.

//! Engine façade (C5): the public `get`/`getMany`/`set`/`delete`/`list`/
//! `cleanup`/`atomic` surface, plus lifecycle (`open`/`close`).

use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::atomic::AtomicBatch;
use crate::atomic::Check;
use crate::atomic::CommitOutcome;
use crate::atomic::Mutation;
use crate::error::Error;
use crate::key::encode_key;
use crate::key::key_hash;
use crate::key::KeyMode;
use crate::key::KeyPart;
use crate::range;
use crate::range::Cursor;
use crate::range::RangePlan;
use crate::range::Selector;
use crate::store;
use crate::store::Store;
use crate::value::encode_checked;
use crate::value::KvU64;
use crate::value::KvValue;
use crate::value::ValueCodec;
use crate::versionstamp::VersionstampClock;

fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// A single stored (or absent) entry as returned by `get`/`list`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub key: Vec<KeyPart>,
  pub value: Option<KvValue>,
  pub versionstamp: Option<String>,
}

/// Outcome of [`Kv::set`].
#[derive(Debug, Clone, PartialEq)]
pub struct SetResult {
  pub versionstamp: String,
}

/// Configuration accepted by [`Kv::open`].
pub struct KvConfig {
  pub path: Option<PathBuf>,
  pub codec: Box<dyn ValueCodec>,
  pub default_batch_size: usize,
}

impl Default for KvConfig {
  fn default() -> Self {
    KvConfig {
      path: None,
      codec: Box::new(crate::value::msgpack::MsgpackCodec),
      default_batch_size: 500,
    }
  }
}

/// Options accepted by [`Kv::list`].
#[derive(Default)]
pub struct ListOptions {
  /// `None` means "until exhausted" (spec.md's `limit = +inf`).
  pub limit: Option<u64>,
  pub batch_size: Option<usize>,
  pub cursor: Option<String>,
  pub reverse: bool,
}

/// The embeddable key-value store handle. Acquired with [`Kv::open`],
/// released with [`Kv::close`]. `close` is idempotent and every operation
/// fails [`Error::DatabaseClosed`] afterwards.
pub struct Kv {
  store: Store,
  codec: Box<dyn ValueCodec>,
  clock: VersionstampClock,
  default_batch_size: usize,
  closed: AtomicBool,
}

impl Kv {
  pub fn open(config: KvConfig) -> Result<Self, Error> {
    let store = Store::open(config.path.as_deref())?;
    Ok(Kv {
      store,
      codec: config.codec,
      clock: VersionstampClock::new(),
      default_batch_size: config.default_batch_size,
      closed: AtomicBool::new(false),
    })
  }

  /// Convenience for opening an on-disk store with the default codec.
  pub fn open_path(path: &Path) -> Result<Self, Error> {
    Kv::open(KvConfig { path: Some(path.to_path_buf()), ..Default::default() })
  }

  /// Convenience for opening an in-memory store with the default codec.
  pub fn open_in_memory() -> Result<Self, Error> {
    Kv::open(KvConfig::default())
  }

  /// Idempotent: every operation after the first call fails with
  /// [`Error::DatabaseClosed`].
  pub fn close(&self) {
    if self.closed.swap(true, Ordering::AcqRel) {
      log::warn!("Kv::close called on an already-closed store");
    } else {
      log::debug!("closing kv store");
    }
  }

  fn check_open(&self) -> Result<(), Error> {
    if self.closed.load(Ordering::Acquire) {
      Err(Error::DatabaseClosed)
    } else {
      Ok(())
    }
  }

  pub(crate) fn codec(&self) -> &dyn ValueCodec {
    self.codec.as_ref()
  }

  pub fn get(&self, key: &[KeyPart]) -> Result<Entry, Error> {
    self.check_open()?;
    if key.is_empty() {
      return Err(Error::EmptyKey);
    }
    let hash = key_hash(key, KeyMode::Read)?;
    let now = now_millis();
    let stored =
      self.store.with_connection(|conn| store::get(conn, &hash, now))?;
    Ok(match stored {
      None => {
        Entry { key: key.to_vec(), value: None, versionstamp: None }
      }
      Some(row) => Entry {
        key: key.to_vec(),
        value: Some(self.codec.decode(&row.value)?),
        versionstamp: Some(row.versionstamp),
      },
    })
  }

  pub fn get_many(&self, keys: &[&[KeyPart]]) -> Result<Vec<Entry>, Error> {
    self.check_open()?;
    if keys.len() > 10 {
      return Err(Error::TooManyRanges);
    }
    keys.iter().map(|k| self.get(k)).collect()
  }

  pub fn set(
    &self,
    key: &[KeyPart],
    value: KvValue,
    expire_in_ms: Option<i64>,
  ) -> Result<SetResult, Error> {
    self.check_open()?;
    if key.is_empty() {
      return Err(Error::EmptyKey);
    }
    let hash = key_hash(key, KeyMode::Write)?;
    let encoded = encode_checked(self.codec.as_ref(), &value)?;
    let versionstamp = self.clock.next();
    let expires_at = expire_in_ms.map(|ms| now_millis() + ms);
    self.store.with_connection(|conn| {
      store::put(conn, &hash, &encoded, &versionstamp, expires_at)
    })?;
    Ok(SetResult { versionstamp })
  }

  pub fn delete(&self, key: &[KeyPart]) -> Result<(), Error> {
    self.check_open()?;
    if key.is_empty() {
      return Err(Error::EmptyKey);
    }
    let hash = key_hash(key, KeyMode::Write)?;
    self.store.with_connection(|conn| store::delete(conn, &hash))
  }

  pub fn cleanup(&self) -> Result<(), Error> {
    self.check_open()?;
    let now = now_millis();
    let removed =
      self.store.with_connection(|conn| store::delete_expired(conn, now))?;
    log::debug!("cleanup removed {removed} expired rows");
    Ok(())
  }

  pub fn atomic(&self) -> AtomicBatch<'_> {
    AtomicBatch::new(self)
  }

  pub fn list(
    &self,
    selector: Selector,
    options: ListOptions,
  ) -> Result<ListIter<'_>, Error> {
    self.check_open()?;
    let batch_size = options.batch_size.unwrap_or(self.default_batch_size);
    if batch_size > 1000 {
      return Err(Error::TooManyEntries);
    }
    let mut plan = range::plan(&selector)?;
    if let Some(cursor_str) = options.cursor.as_deref() {
      if !cursor_str.is_empty() {
        let last_part = Cursor::decode(cursor_str)?;
        let resumed = range::resumed_key_parts(&selector, &last_part);
        let resumed_hash = key_hash(&resumed, KeyMode::Read)?;
        plan = range::resume(&plan, &resumed_hash, options.reverse);
      }
    }
    Ok(ListIter {
      kv: self,
      plan,
      batch_size,
      remaining: options.limit,
      reverse: options.reverse,
      buffer: VecDeque::new(),
      exhausted: false,
      cursor: Cursor::empty(),
    })
  }

  /// Executes an atomic batch's checks then mutations inside one
  /// transaction, per spec.md §4.7's state machine. Intercepts the
  /// internal [`Error::CheckFailed`] signal and turns it into a soft
  /// `{ ok: false }`; any other error (notably a counter type error)
  /// propagates to the caller after the transaction rolls back.
  pub(crate) fn execute_atomic(
    &self,
    checks: Vec<Check>,
    mutations: Vec<Mutation>,
  ) -> Result<CommitOutcome, Error> {
    self.check_open()?;
    let now = now_millis();
    let result = self.store.with_transaction(|tx| {
      let versionstamp = self.clock.next();

      for check in &checks {
        let hash = key_hash(&check.key, KeyMode::Read)?;
        let actual = store::get(tx, &hash, now)?;
        let actual_vs = actual.map(|e| e.versionstamp);
        if actual_vs != check.expected_versionstamp {
          return Err(Error::CheckFailed);
        }
      }

      for mutation in &mutations {
        self.apply_mutation(tx, mutation, &versionstamp, now)?;
      }

      Ok(versionstamp)
    });

    match result {
      Ok(versionstamp) => Ok(CommitOutcome::Ok { versionstamp }),
      Err(Error::CheckFailed) => Ok(CommitOutcome::Fail),
      Err(e) => Err(e),
    }
  }

  fn apply_mutation(
    &self,
    tx: &rusqlite::Transaction,
    mutation: &Mutation,
    versionstamp: &str,
    now: i64,
  ) -> Result<(), Error> {
    match mutation {
      Mutation::Set { key, value, expire_in_ms } => {
        let hash = key_hash(key, KeyMode::Write)?;
        let encoded = encode_checked(self.codec.as_ref(), value)?;
        let expires_at = expire_in_ms.map(|ms| now + ms);
        store::put(tx, &hash, &encoded, versionstamp, expires_at)
      }
      Mutation::Delete { key } => {
        let hash = key_hash(key, KeyMode::Write)?;
        store::delete(tx, &hash)
      }
      Mutation::Sum { key, value } => {
        self.apply_counter_mutation(tx, key, *value, versionstamp, now, "sum", |cur, op| {
          cur.wrapping_add(op)
        })
      }
      Mutation::Min { key, value } => {
        self.apply_counter_mutation(tx, key, *value, versionstamp, now, "min", |cur, op| {
          KvU64::new(cur.value().min(op.value()))
        })
      }
      Mutation::Max { key, value } => {
        self.apply_counter_mutation(tx, key, *value, versionstamp, now, "max", |cur, op| {
          KvU64::new(cur.value().max(op.value()))
        })
      }
    }
  }

  #[allow(clippy::too_many_arguments)]
  fn apply_counter_mutation(
    &self,
    tx: &rusqlite::Transaction,
    key: &[KeyPart],
    operand: KvU64,
    versionstamp: &str,
    now: i64,
    op: &'static str,
    combine: impl FnOnce(KvU64, KvU64) -> KvU64,
  ) -> Result<(), Error> {
    let hash = key_hash(key, KeyMode::Write)?;
    let current = store::get(tx, &hash, now)?;
    let result = match current {
      None => operand,
      Some(row) => {
        let decoded = self.codec.decode(&row.value)?;
        let counter =
          decoded.as_counter().ok_or(Error::NotACounter { op })?;
        combine(counter, operand)
      }
    };
    let encoded = encode_checked(self.codec.as_ref(), &KvValue::U64(result))?;
    store::put(tx, &hash, &encoded, versionstamp, None)
  }
}

/// A lazy, batch-fetched iterator produced by [`Kv::list`]. Call
/// [`ListIter::cursor`] after each `next()` to get a resume token for a
/// later `list()` call with the same selector and direction.
pub struct ListIter<'a> {
  kv: &'a Kv,
  plan: RangePlan,
  batch_size: usize,
  remaining: Option<u64>,
  reverse: bool,
  buffer: VecDeque<store::StoredEntry>,
  exhausted: bool,
  cursor: Cursor,
}

impl<'a> ListIter<'a> {
  pub fn cursor(&self) -> &Cursor {
    &self.cursor
  }

  fn fetch_next_batch(&mut self) -> Result<(), Error> {
    let fetch_n = match self.remaining {
      Some(n) => (n as usize).min(self.batch_size),
      None => self.batch_size,
    };
    if fetch_n == 0 {
      self.exhausted = true;
      return Ok(());
    }
    let now = now_millis();
    let rows = self.kv.store.with_connection(|conn| {
      store::range(
        conn,
        &self.plan.start_hash,
        &self.plan.end_hash,
        &self.plan.prefix_hash,
        now,
        fetch_n,
        self.reverse,
      )
    })?;
    if rows.len() < fetch_n {
      self.exhausted = true;
    }
    if let Some(last) = rows.last() {
      self.plan = range::resume(&self.plan, &last.key_hash, self.reverse);
    }
    self.buffer = rows.into();
    Ok(())
  }
}

impl<'a> Iterator for ListIter<'a> {
  type Item = Result<Entry, Error>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(row) = self.buffer.pop_front() {
        if let Some(n) = self.remaining {
          if n == 0 {
            self.exhausted = true;
            return None;
          }
          self.remaining = Some(n - 1);
        }
        return Some(self.decode_row(row));
      }
      if self.exhausted {
        return None;
      }
      if let Err(e) = self.fetch_next_batch() {
        self.exhausted = true;
        return Some(Err(e));
      }
    }
  }
}

impl<'a> ListIter<'a> {
  fn decode_row(&mut self, row: store::StoredEntry) -> Result<Entry, Error> {
    let mut raw = vec![0u8; row.key_hash.len() / 2];
    faster_hex::hex_decode(row.key_hash.as_bytes(), &mut raw)
      .map_err(|_| Error::InvalidKeyHash)?;
    let parts = crate::key::decode_key(&raw)?;
    if let Some(last) = parts.last() {
      self.cursor = Cursor::encode(last);
    }
    let value = self.kv.codec.decode(&row.value)?;
    Ok(Entry {
      key: parts,
      value: Some(value),
      versionstamp: Some(row.versionstamp),
    })
  }
}
