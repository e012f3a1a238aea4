// Copyright 2018-2026 the Deno authors. MIT license.

//! Tagged-binary codec family (SPEC_FULL.md §4.3, "MessagePack-style").

use crate::error::Error;
use crate::value::KvValue;
use crate::value::ValueCodec;

/// Serializes [`KvValue`] directly with MessagePack via `rmp-serde`. The
/// enum's own variant tag is what makes counters self-identifying on the
/// wire -- no separate "is this a counter" column is needed.
#[derive(Debug, Default)]
pub struct MsgpackCodec;

impl ValueCodec for MsgpackCodec {
  fn encode(&self, value: &KvValue) -> Result<Vec<u8>, Error> {
    rmp_serde::to_vec(value)
      .map_err(|e| Error::SerializationFailure(e.to_string()))
  }

  fn decode(&self, bytes: &[u8]) -> Result<KvValue, Error> {
    rmp_serde::from_slice(bytes)
      .map_err(|e| Error::SerializationFailure(e.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::value::KvU64;

  #[test]
  fn round_trips_plain_values() {
    let codec = MsgpackCodec;
    for v in [
      KvValue::Null,
      KvValue::Bool(true),
      KvValue::Int(-7),
      KvValue::Float(2.5),
      KvValue::Text("hi".into()),
      KvValue::Bytes(vec![1, 2, 3]),
      KvValue::Array(vec![KvValue::Int(1), KvValue::Int(2)]),
    ] {
      let encoded = codec.encode(&v).unwrap();
      assert_eq!(codec.decode(&encoded).unwrap(), v);
    }
  }

  #[test]
  fn counter_round_trips_as_counter_not_integer() {
    let codec = MsgpackCodec;
    let v = KvValue::U64(KvU64::new(42));
    let encoded = codec.encode(&v).unwrap();
    let decoded = codec.decode(&encoded).unwrap();
    assert!(decoded.is_counter());
    assert_eq!(decoded.as_counter().unwrap().value(), 42);
  }
}
