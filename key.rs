// Copyright 2018-2026 the Deno authors. MIT license.

//! The ordered binary key codec (C1): encodes a tuple of typed key parts
//! into a lexicographically sortable byte string, and decodes it back.

use crate::error::Error;

/// One element of a composite key.
///
/// Cross-type ordering falls directly out of the tag byte each part is
/// encoded with: bytes < strings < integers < doubles < booleans.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyPart {
  Bytes(Vec<u8>),
  Str(String),
  /// Stored as the lower 64 bits, big-endian. Negative integers therefore
  /// sort after all non-negative ones -- see SPEC_FULL.md's note on this
  /// being a resolved Open Question rather than signed-with-bias ordering.
  Int(i64),
  Float(f64),
  Bool(bool),
}

const TAG_BYTES: u8 = 0x01;
const TAG_STR: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_BOOL: u8 = 0x05;

fn is_valid_tag(b: u8) -> bool {
  (TAG_BYTES..=TAG_BOOL).contains(&b)
}

/// A full composite key: one or more [`KeyPart`]s in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Key(pub Vec<KeyPart>);

impl Key {
  pub fn new(parts: Vec<KeyPart>) -> Self {
    Key(parts)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.0
  }

  /// `true` if `self` has `other` as a strict prefix (more parts, same
  /// leading parts). Used by the range planner to validate
  /// `{prefix, start}` / `{prefix, end}` selectors.
  pub fn is_strict_extension_of(&self, other: &Key) -> bool {
    self.0.len() > other.0.len() && self.0[..other.0.len()] == other.0[..]
  }
}

impl From<Vec<KeyPart>> for Key {
  fn from(parts: Vec<KeyPart>) -> Self {
    Key(parts)
  }
}

/// Which size limit applies: writes cap at 2048 bytes, reads at 2049 so
/// that `end_hash = start_hash + "\xff"` sentinel lookups stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
  Write,
  Read,
}

impl KeyMode {
  fn max_len(self) -> usize {
    match self {
      KeyMode::Write => 2048,
      KeyMode::Read => 2049,
    }
  }
}

/// Encodes `parts` into a lexicographically sortable byte string.
pub fn encode_key(parts: &[KeyPart], mode: KeyMode) -> Result<Vec<u8>, Error> {
  if parts.is_empty() {
    return Err(Error::EmptyKey);
  }
  let mut out = Vec::new();
  for part in parts {
    encode_part(part, &mut out);
  }
  if out.len() > mode.max_len() {
    return Err(Error::KeySizeExceeded);
  }
  Ok(out)
}

pub(crate) fn encode_part(part: &KeyPart, out: &mut Vec<u8>) {
  match part {
    KeyPart::Bytes(b) => {
      out.push(TAG_BYTES);
      out.extend_from_slice(b);
      out.push(0x00);
    }
    KeyPart::Str(s) => {
      out.push(TAG_STR);
      out.extend_from_slice(s.as_bytes());
      out.push(0x00);
    }
    KeyPart::Int(i) => {
      out.push(TAG_INT);
      out.extend_from_slice(&(*i as u64).to_be_bytes());
      out.push(0x00);
    }
    KeyPart::Float(f) => {
      out.push(TAG_FLOAT);
      out.extend_from_slice(&f.to_be_bytes());
      out.push(0x00);
    }
    KeyPart::Bool(b) => {
      out.push(TAG_BOOL);
      out.push(if *b { 0x01 } else { 0x00 });
      out.push(0x00);
    }
  }
}

/// Decodes a byte string produced by [`encode_key`] back into its parts.
pub fn decode_key(bytes: &[u8]) -> Result<Vec<KeyPart>, Error> {
  let mut parts = Vec::new();
  let mut i = 0usize;
  while i < bytes.len() {
    let tag = bytes[i];
    i += 1;
    match tag {
      TAG_BYTES => {
        let start = i;
        loop {
          if i >= bytes.len() {
            return Err(Error::InvalidKeyHash);
          }
          if bytes[i] == 0x00 {
            let next = i + 1;
            if next == bytes.len() || is_valid_tag(bytes[next]) {
              parts.push(KeyPart::Bytes(bytes[start..i].to_vec()));
              i += 1;
              break;
            }
          }
          i += 1;
        }
      }
      TAG_STR => {
        let start = i;
        while i < bytes.len() && bytes[i] != 0x00 {
          i += 1;
        }
        if i >= bytes.len() {
          return Err(Error::InvalidKeyHash);
        }
        let s = std::str::from_utf8(&bytes[start..i])
          .map_err(|_| Error::InvalidKeyHash)?;
        parts.push(KeyPart::Str(s.to_string()));
        i += 1;
      }
      TAG_INT => {
        if i + 9 > bytes.len() || bytes[i + 8] != 0x00 {
          return Err(Error::InvalidKeyHash);
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[i..i + 8]);
        parts.push(KeyPart::Int(u64::from_be_bytes(buf) as i64));
        i += 9;
      }
      TAG_FLOAT => {
        if i + 9 > bytes.len() || bytes[i + 8] != 0x00 {
          return Err(Error::InvalidKeyHash);
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[i..i + 8]);
        parts.push(KeyPart::Float(f64::from_be_bytes(buf)));
        i += 9;
      }
      TAG_BOOL => {
        if i + 2 > bytes.len() || bytes[i + 1] != 0x00 {
          return Err(Error::InvalidKeyHash);
        }
        parts.push(KeyPart::Bool(bytes[i] != 0x00));
        i += 2;
      }
      _ => return Err(Error::InvalidKeyHash),
    }
  }
  Ok(parts)
}

/// The hex rendering of the encoded key, used as the store's row key.
pub fn key_hash(parts: &[KeyPart], mode: KeyMode) -> Result<String, Error> {
  let bytes = encode_key(parts, mode)?;
  Ok(faster_hex::hex_string(&bytes))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn enc(parts: Vec<KeyPart>) -> Vec<u8> {
    encode_key(&parts, KeyMode::Write).unwrap()
  }

  #[test]
  fn round_trip_each_part_type() {
    let parts = vec![
      KeyPart::Bytes(vec![1, 2, 3]),
      KeyPart::Str("hello".into()),
      KeyPart::Int(-42),
      KeyPart::Float(3.14),
      KeyPart::Bool(true),
    ];
    let encoded = enc(parts.clone());
    assert_eq!(decode_key(&encoded).unwrap(), parts);
  }

  #[test]
  fn empty_key_is_invalid() {
    assert!(matches!(
      encode_key(&[], KeyMode::Write),
      Err(Error::EmptyKey)
    ));
  }

  #[test]
  fn byte_string_inner_zero_is_not_a_terminator() {
    // 0x00 followed by a non-tag byte must stay inside the payload.
    let parts = vec![KeyPart::Bytes(vec![0x00, 0x00, 0x09, 0x00])];
    let encoded = enc(parts.clone());
    assert_eq!(decode_key(&encoded).unwrap(), parts);
  }

  #[test]
  fn byte_string_followed_by_another_part() {
    let parts =
      vec![KeyPart::Bytes(vec![9, 0x00, 9]), KeyPart::Str("x".into())];
    let encoded = enc(parts.clone());
    assert_eq!(decode_key(&encoded).unwrap(), parts);
  }

  #[test]
  fn cross_type_ordering_matches_tag_order() {
    // bytes < strings < integers < doubles < booleans
    let samples: Vec<Vec<u8>> = vec![
      enc(vec![KeyPart::Bytes(vec![0xff])]),
      enc(vec![KeyPart::Str("a".into())]),
      enc(vec![KeyPart::Int(1)]),
      enc(vec![KeyPart::Float(1.0)]),
      enc(vec![KeyPart::Bool(false)]),
    ];
    for w in samples.windows(2) {
      assert!(w[0] < w[1], "{:?} should sort before {:?}", w[0], w[1]);
    }
  }

  #[test]
  fn order_preservation_for_strings() {
    let a = enc(vec![KeyPart::Str("aa".into())]);
    let b = enc(vec![KeyPart::Str("ab".into())]);
    assert!(a < b);
  }

  #[test]
  fn write_vs_read_size_limits() {
    let big = vec![KeyPart::Bytes(vec![0u8; 2100])];
    assert!(matches!(
      encode_key(&big, KeyMode::Write),
      Err(Error::KeySizeExceeded)
    ));
    let exactly_2049 = vec![KeyPart::Bytes(vec![0u8; 2046])];
    // tag(1) + 2046 payload + terminator(1) = 2048 bytes, fits both modes.
    assert!(encode_key(&exactly_2049, KeyMode::Write).is_ok());
    assert!(encode_key(&exactly_2049, KeyMode::Read).is_ok());
  }

  #[test]
  fn invalid_tag_is_rejected() {
    assert!(matches!(decode_key(&[0xaa]), Err(Error::InvalidKeyHash)));
  }

  #[test]
  fn strict_extension() {
    let prefix = Key::new(vec![KeyPart::Str("a".into())]);
    let extended =
      Key::new(vec![KeyPart::Str("a".into()), KeyPart::Str("b".into())]);
    assert!(extended.is_strict_extension_of(&prefix));
    assert!(!prefix.is_strict_extension_of(&prefix));
  }
}
