// Copyright 2018-2026 the Deno authors. MIT license.

//! Range planner (C6): maps a high-level [`Selector`] to the half-open
//! byte range the store adapter scans, plus cursor encode/decode for
//! resuming a `list()` at a later point.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::Error;
use crate::key::decode_key;
use crate::key::encode_part;
use crate::key::key_hash;
use crate::key::KeyMode;
use crate::key::KeyPart;

/// Selects a range of keys for `list()`. Exactly one of the four shapes
/// spec.md §4.6 documents.
#[derive(Debug, Clone)]
pub enum Selector {
  Prefix(Vec<KeyPart>),
  PrefixStart(Vec<KeyPart>, Vec<KeyPart>),
  PrefixEnd(Vec<KeyPart>, Vec<KeyPart>),
  StartEnd(Vec<KeyPart>, Vec<KeyPart>),
}

/// The byte-range bounds a selector compiles down to.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePlan {
  pub start_hash: String,
  pub end_hash: String,
  pub prefix_hash: String,
}

fn hash(parts: &[KeyPart]) -> Result<String, Error> {
  key_hash(parts, KeyMode::Read)
}

fn strict_extension(candidate: &[KeyPart], prefix: &[KeyPart]) -> bool {
  candidate.len() > prefix.len() && candidate[..prefix.len()] == prefix[..]
}

/// Compiles a [`Selector`] into a [`RangePlan`], per the table in
/// spec.md §4.6.
pub fn plan(selector: &Selector) -> Result<RangePlan, Error> {
  match selector {
    Selector::Prefix(prefix) => {
      if prefix.is_empty() {
        return Ok(RangePlan {
          start_hash: String::new(),
          end_hash: "ffff".to_string(),
          prefix_hash: String::new(),
        });
      }
      let p = hash(prefix)?;
      Ok(RangePlan {
        start_hash: p.clone(),
        end_hash: format!("{p}ff"),
        prefix_hash: p,
      })
    }
    Selector::PrefixStart(prefix, start) => {
      if !prefix.is_empty() && !strict_extension(start, prefix) {
        return Err(Error::PrefixBoundsViolation);
      }
      let p = hash(prefix)?;
      let s = hash(start)?;
      Ok(RangePlan { start_hash: s, end_hash: format!("{p}ff"), prefix_hash: p })
    }
    Selector::PrefixEnd(prefix, end) => {
      if !prefix.is_empty() && !strict_extension(end, prefix) {
        return Err(Error::PrefixBoundsViolation);
      }
      let p = hash(prefix)?;
      let e = hash(end)?;
      Ok(RangePlan { start_hash: p.clone(), end_hash: e, prefix_hash: p })
    }
    Selector::StartEnd(start, end) => {
      let s = hash(start)?;
      let e = hash(end)?;
      if s > e {
        return Err(Error::StartAfterEnd);
      }
      Ok(RangePlan { start_hash: s, end_hash: e, prefix_hash: String::new() })
    }
  }
}

/// Narrows `plan` to resume strictly after/before the row that produced
/// `last_hash`, depending on iteration direction.
pub fn resume(plan: &RangePlan, last_hash: &str, reverse: bool) -> RangePlan {
  let mut next = plan.clone();
  if reverse {
    next.end_hash = last_hash.to_string();
  } else {
    next.start_hash = format!("{last_hash}\0");
  }
  next
}

/// Reconstructs the resumed key for a cursor continuation: `[...prefix,
/// lastPart]` for prefix-shaped selectors, `[...start[:-1], lastPart]` for
/// the bare `{start, end}` form (spec.md §4.6).
pub fn resumed_key_parts(
  selector: &Selector,
  last_part: &KeyPart,
) -> Vec<KeyPart> {
  let mut parts = match selector {
    Selector::Prefix(prefix) => prefix.clone(),
    Selector::PrefixStart(prefix, _) => prefix.clone(),
    Selector::PrefixEnd(prefix, _) => prefix.clone(),
    Selector::StartEnd(start, _) => {
      if start.is_empty() {
        Vec::new()
      } else {
        start[..start.len() - 1].to_vec()
      }
    }
  };
  parts.push(last_part.clone());
  parts
}

/// An opaque, compact resume token: the last-yielded key's last part,
/// tag-encoded and rendered as URL-safe base64 without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
  pub fn empty() -> Self {
    Cursor(String::new())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn encode(last_part: &KeyPart) -> Self {
    let mut buf = Vec::new();
    encode_part(last_part, &mut buf);
    Cursor(URL_SAFE_NO_PAD.encode(buf))
  }

  pub fn decode(s: &str) -> Result<KeyPart, Error> {
    let bytes = URL_SAFE_NO_PAD
      .decode(s)
      .map_err(|_| Error::InvalidSelector("cursor is not valid base64url"))?;
    let mut parts = decode_key(&bytes)?;
    if parts.len() != 1 {
      return Err(Error::InvalidSelector("cursor must encode exactly one key part"));
    }
    Ok(parts.remove(0))
  }
}

impl std::fmt::Display for Cursor {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}
