// Copyright 2018-2026 the Deno authors. MIT license.

use thiserror::Error;

/// Every way an `ordinal_kv` operation can fail.
///
/// Variants group into the taxonomy the crate documents publicly: input
/// validation, quota limits, type errors on counter mutations, lifecycle
/// state, and codec/storage failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
  #[error("key must be a non-empty tuple")]
  EmptyKey,

  #[error("key hash is not a valid encoded key")]
  InvalidKeyHash,

  #[error("encoded key size exceeds the limit for this operation")]
  KeySizeExceeded,

  #[error("versionstamp must be null or a 20-character lowercase hex string")]
  InvalidVersionstamp,

  #[error("invalid selector: {0}")]
  InvalidSelector(&'static str),

  #[error("start/end must be a strict extension of prefix")]
  PrefixBoundsViolation,

  #[error("start key sorts after end key")]
  StartAfterEnd,

  #[error("getMany() accepts at most 10 keys")]
  TooManyRanges,

  #[error("list() batchSize may not exceed 1000 entries")]
  TooManyEntries,

  #[error("an atomic batch may hold at most 100 checks")]
  TooManyChecks,

  #[error("an atomic batch may hold at most 1000 mutations")]
  TooManyMutations,

  #[error("total key size of an atomic batch exceeds 81920 bytes")]
  TotalKeySizeExceeded,

  #[error("total mutation size of an atomic batch exceeds 819200 bytes")]
  TotalMutationSizeExceeded,

  #[error("serialized value exceeds the 65536 byte limit")]
  ValueTooLarge,

  #[error("Failed to perform '{op}' mutation on a non-U64 value in the database")]
  NotACounter { op: &'static str },

  #[error("Cannot sum KvU64 with Number")]
  OperandNotCounter,

  #[error("counter value is out of range for a 64-bit unsigned integer")]
  CounterOutOfRange,

  #[error("database is closed")]
  DatabaseClosed,

  #[error("store must be created through `Kv::open`")]
  ConstructorMisuse,

  #[error("value serialization failed: {0}")]
  SerializationFailure(String),

  #[error(transparent)]
  Storage(#[from] rusqlite::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// Internal control-flow signal raised inside a transaction when an
  /// optimistic check fails. [`crate::engine::Kv::execute_atomic`]
  /// intercepts this before it can reach a caller; it is never returned
  /// from a public API function.
  #[error("optimistic check failed")]
  CheckFailed,
}
