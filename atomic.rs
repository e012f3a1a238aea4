// Copyright 2018-2026 the Deno authors. MIT license.

//! Atomic transaction (C7): a value-accumulator builder for checks and
//! mutations, committed as a single transaction with one versionstamp.

use crate::engine::Kv;
use crate::error::Error;
use crate::key::KeyPart;
use crate::value::KvU64;
use crate::value::KvValue;

pub const MAX_CHECKS: usize = 100;
pub const MAX_MUTATIONS: usize = 1000;
pub const MAX_TOTAL_KEY_SIZE: usize = 81920;
pub const MAX_TOTAL_MUTATION_SIZE: usize = 819200;

#[derive(Debug, Clone)]
pub struct Check {
  pub key: Vec<KeyPart>,
  pub expected_versionstamp: Option<String>,
}

/// One mutation within an atomic batch.
#[derive(Debug, Clone)]
pub enum Mutation {
  Set { key: Vec<KeyPart>, value: KvValue, expire_in_ms: Option<i64> },
  Delete { key: Vec<KeyPart> },
  Sum { key: Vec<KeyPart>, value: KvU64 },
  Min { key: Vec<KeyPart>, value: KvU64 },
  Max { key: Vec<KeyPart>, value: KvU64 },
}

impl Mutation {
  pub(crate) fn key(&self) -> &[KeyPart] {
    match self {
      Mutation::Set { key, .. }
      | Mutation::Delete { key }
      | Mutation::Sum { key, .. }
      | Mutation::Min { key, .. }
      | Mutation::Max { key, .. } => key,
    }
  }

  pub(crate) fn op_name(&self) -> &'static str {
    match self {
      Mutation::Set { .. } => "set",
      Mutation::Delete { .. } => "delete",
      Mutation::Sum { .. } => "sum",
      Mutation::Min { .. } => "min",
      Mutation::Max { .. } => "max",
    }
  }
}

/// The outcome of a [`AtomicBatch::commit`].
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
  Ok { versionstamp: String },
  Fail,
}

fn is_valid_versionstamp(vs: &str) -> bool {
  vs.len() == 20 && vs.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// A value-accumulator for checks and mutations. Builder methods return
/// `Self` by value so calls can be chained fluently; a validation failure
/// is latched internally and surfaces from [`commit`](Self::commit) rather
/// than aborting the chain mid-build.
pub struct AtomicBatch<'a> {
  kv: &'a Kv,
  checks: Vec<Check>,
  mutations: Vec<Mutation>,
  total_key_size: usize,
  total_mutation_size: usize,
  error: Option<Error>,
}

impl<'a> AtomicBatch<'a> {
  pub(crate) fn new(kv: &'a Kv) -> Self {
    AtomicBatch {
      kv,
      checks: Vec::new(),
      mutations: Vec::new(),
      total_key_size: 0,
      total_mutation_size: 0,
      error: None,
    }
  }

  pub fn check(
    mut self,
    key: &[KeyPart],
    expected_versionstamp: Option<&str>,
  ) -> Self {
    if self.error.is_some() {
      return self;
    }
    if self.checks.len() >= MAX_CHECKS {
      self.error = Some(Error::TooManyChecks);
      return self;
    }
    if let Some(vs) = expected_versionstamp {
      if !is_valid_versionstamp(vs) {
        self.error = Some(Error::InvalidVersionstamp);
        return self;
      }
    }
    self.checks.push(Check {
      key: key.to_vec(),
      expected_versionstamp: expected_versionstamp.map(String::from),
    });
    self
  }

  pub fn set(self, key: &[KeyPart], value: KvValue, expire_in_ms: Option<i64>) -> Self {
    self.mutate(Mutation::Set { key: key.to_vec(), value, expire_in_ms })
  }

  pub fn delete(self, key: &[KeyPart]) -> Self {
    self.mutate(Mutation::Delete { key: key.to_vec() })
  }

  pub fn sum(self, key: &[KeyPart], value: KvU64) -> Self {
    self.mutate(Mutation::Sum { key: key.to_vec(), value })
  }

  pub fn min(self, key: &[KeyPart], value: KvU64) -> Self {
    self.mutate(Mutation::Min { key: key.to_vec(), value })
  }

  pub fn max(self, key: &[KeyPart], value: KvU64) -> Self {
    self.mutate(Mutation::Max { key: key.to_vec(), value })
  }

  pub fn mutate(mut self, mutation: Mutation) -> Self {
    if self.error.is_some() {
      return self;
    }
    if self.mutations.len() >= MAX_MUTATIONS {
      self.error = Some(Error::TooManyMutations);
      return self;
    }
    let encoded_key =
      match crate::key::encode_key(mutation.key(), crate::key::KeyMode::Write) {
        Ok(bytes) => bytes,
        Err(e) => {
          self.error = Some(e);
          return self;
        }
      };
    let extra = match &mutation {
      Mutation::Set { value, .. } => {
        match crate::value::encode_checked(self.kv.codec(), value) {
          Ok(bytes) => bytes.len(),
          Err(e) => {
            self.error = Some(e);
            return self;
          }
        }
      }
      Mutation::Delete { .. } => 0,
      Mutation::Sum { .. } | Mutation::Min { .. } | Mutation::Max { .. } => 8,
    };
    self.total_key_size += encoded_key.len();
    self.total_mutation_size += encoded_key.len() + extra;
    self.mutations.push(mutation);
    self
  }

  /// Preflights the accumulated quotas and executes the batch as a single
  /// transaction with one versionstamp (spec.md §4.7).
  pub fn commit(self) -> Result<CommitOutcome, Error> {
    if let Some(e) = self.error {
      return Err(e);
    }
    if self.total_key_size > MAX_TOTAL_KEY_SIZE {
      return Err(Error::TotalKeySizeExceeded);
    }
    if self.total_mutation_size > MAX_TOTAL_MUTATION_SIZE {
      return Err(Error::TotalMutationSizeExceeded);
    }
    self.kv.execute_atomic(self.checks, self.mutations)
  }
}
