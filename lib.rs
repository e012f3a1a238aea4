// Copyright 2018-2026 the Deno authors. MIT license.

//! `ordinal_kv`: an embeddable, ordered key-value store with hierarchical
//! composite keys, multi-version optimistic concurrency, time-bounded
//! entries, prefix/range iteration with cursors, and pluggable value
//! encodings, backed by SQLite as a durable ordered map.

pub mod atomic;
pub mod engine;
pub mod error;
pub mod key;
pub mod range;
mod store;
pub mod value;
mod versionstamp;

pub use atomic::AtomicBatch;
pub use atomic::CommitOutcome;
pub use atomic::Mutation;
pub use engine::Entry;
pub use engine::Kv;
pub use engine::KvConfig;
pub use engine::ListIter;
pub use engine::ListOptions;
pub use engine::SetResult;
pub use error::Error;
pub use key::Key;
pub use key::KeyPart;
pub use range::Cursor;
pub use range::Selector;
pub use value::KvU64;
pub use value::KvValue;
pub use value::ValueCodec;
