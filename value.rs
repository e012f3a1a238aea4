// Copyright 2018-2026 the Deno authors. MIT license.

//! Value codec interface (C3): the boundary the engine uses to turn a
//! [`KvValue`] into bytes and back, plus the concrete codec families
//! documented in SPEC_FULL.md §4.3 and §9.

pub mod json;
pub mod msgpack;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;

/// The serialized-size budget a single value must fit within, including a
/// small allowance for codec framing.
pub const MAX_VALUE_SIZE: usize = 65536 + 40;

/// A 64-bit unsigned counter -- the only value type that participates in
/// `sum`/`min`/`max` atomic mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KvU64(u64);

impl KvU64 {
  pub fn new(value: u64) -> Self {
    KvU64(value)
  }

  pub fn value(&self) -> u64 {
    self.0
  }

  pub fn wrapping_add(self, rhs: KvU64) -> KvU64 {
    KvU64(self.0.wrapping_add(rhs.0))
  }
}

/// An opaque-to-the-engine value, with one sentinel variant ([`KvValue::U64`])
/// that the atomic engine recognizes for counter mutations.
///
/// This enum *is* the self-describing wire shape the msgpack codec uses
/// directly: because `U64` is a distinct variant from `Int`, a counter can
/// never silently decode back as a plain integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KvValue {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
  Bytes(Vec<u8>),
  Array(Vec<KvValue>),
  Map(Vec<(String, KvValue)>),
  U64(KvU64),
}

impl KvValue {
  pub fn is_counter(&self) -> bool {
    matches!(self, KvValue::U64(_))
  }

  pub fn as_counter(&self) -> Option<KvU64> {
    match self {
      KvValue::U64(v) => Some(*v),
      _ => None,
    }
  }
}

impl From<KvU64> for KvValue {
  fn from(v: KvU64) -> Self {
    KvValue::U64(v)
  }
}

/// Contract every value codec implements. The engine never inspects the
/// encoded bytes directly; it only asks `decode` for the `KvValue` back and
/// checks `is_counter()` on it.
pub trait ValueCodec: Send + Sync {
  fn encode(&self, value: &KvValue) -> Result<Vec<u8>, Error>;
  fn decode(&self, bytes: &[u8]) -> Result<KvValue, Error>;
}

/// Sums the raw (pre-codec) byte payload a value carries: string/byte
/// contents and map keys, recursively. This is what the 65536-byte limit
/// actually bounds -- checking it directly means the limit holds regardless
/// of how much per-codec framing overhead a given encoding adds.
fn raw_payload_len(value: &KvValue) -> usize {
  match value {
    KvValue::Null | KvValue::Bool(_) | KvValue::Int(_) | KvValue::Float(_) | KvValue::U64(_) => 0,
    KvValue::Text(s) => s.len(),
    KvValue::Bytes(b) => b.len(),
    KvValue::Array(items) => items.iter().map(raw_payload_len).sum(),
    KvValue::Map(entries) => {
      entries.iter().map(|(k, v)| k.len() + raw_payload_len(v)).sum()
    }
  }
}

/// Encodes `value` through `codec`, enforcing the shared size limit that
/// applies regardless of which codec family is in use.
pub fn encode_checked(
  codec: &dyn ValueCodec,
  value: &KvValue,
) -> Result<Vec<u8>, Error> {
  if raw_payload_len(value) > 65536 {
    return Err(Error::ValueTooLarge);
  }
  let bytes = codec.encode(value)?;
  if bytes.len() > MAX_VALUE_SIZE {
    return Err(Error::ValueTooLarge);
  }
  Ok(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::msgpack::MsgpackCodec;

  #[test]
  fn oversized_bytes_rejected_despite_codec_overhead() {
    let codec = MsgpackCodec;
    let big = KvValue::Bytes(vec![0u8; 65537]);
    assert!(matches!(
      encode_checked(&codec, &big),
      Err(Error::ValueTooLarge)
    ));
  }

  #[test]
  fn value_at_the_limit_is_accepted() {
    let codec = MsgpackCodec;
    let at_limit = KvValue::Bytes(vec![0u8; 65536]);
    assert!(encode_checked(&codec, &at_limit).is_ok());
  }

  #[test]
  fn oversized_text_rejected() {
    let codec = MsgpackCodec;
    let big = KvValue::Text("a".repeat(65537));
    assert!(matches!(
      encode_checked(&codec, &big),
      Err(Error::ValueTooLarge)
    ));
  }
}
