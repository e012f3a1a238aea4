// Copyright 2018-2026 the Deno authors. MIT license.

//! Versionstamp clock (C2): a monotone, microsecond-resolution logical
//! clock producing 20-character lowercase hex stamps.

use parking_lot::Mutex;

/// 20 lowercase hex zeroes -- "before any write".
pub const ZERO_VERSIONSTAMP: &str = "00000000000000000000";

/// A strictly monotone clock shared by a single [`crate::engine::Kv`]
/// handle. `next()` draws one versionstamp per `set`/commit.
#[derive(Debug)]
pub struct VersionstampClock {
  last: Mutex<u128>,
}

impl Default for VersionstampClock {
  fn default() -> Self {
    Self::new()
  }
}

impl VersionstampClock {
  pub fn new() -> Self {
    VersionstampClock { last: Mutex::new(0) }
  }

  /// Draws the next versionstamp, guaranteed to be strictly greater than
  /// every previously-drawn value from this clock.
  pub fn next(&self) -> String {
    let now = now_micros();
    let mut last = self.last.lock();
    *last = if *last < now { now } else { *last + 1 };
    format!("{:020x}", *last)
  }
}

fn now_micros() -> u128 {
  let now = chrono::Utc::now();
  now.timestamp_micros().max(0) as u128
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strictly_monotone_under_rapid_calls() {
    let clock = VersionstampClock::new();
    let mut prev = clock.next();
    for _ in 0..1000 {
      let next = clock.next();
      assert!(next > prev, "{next} should be > {prev}");
      prev = next;
    }
  }

  #[test]
  fn formatted_as_twenty_lowercase_hex_chars() {
    let clock = VersionstampClock::new();
    let vs = clock.next();
    assert_eq!(vs.len(), 20);
    assert!(vs.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
  }

  #[test]
  fn zero_versionstamp_sorts_before_any_drawn_stamp() {
    let clock = VersionstampClock::new();
    let vs = clock.next();
    assert!(ZERO_VERSIONSTAMP < vs.as_str());
  }
}
