// Copyright 2018-2026 the Deno authors. MIT license.

//! Literal end-to-end scenarios from SPEC_FULL.md §8 (S1-S7).

use ordinal_kv::atomic::CommitOutcome;
use ordinal_kv::error::Error;
use ordinal_kv::key::KeyPart;
use ordinal_kv::value::KvU64;
use ordinal_kv::value::KvValue;
use ordinal_kv::Kv;
use ordinal_kv::ListOptions;
use ordinal_kv::Selector;
use pretty_assertions::assert_eq;

fn s(s: &str) -> KeyPart {
  KeyPart::Str(s.to_string())
}

fn text(s: &str) -> KvValue {
  KvValue::Text(s.to_string())
}

#[test]
fn s1_basic_lifecycle() {
  let kv = Kv::open_in_memory().unwrap();
  let key = [s("a")];

  let entry = kv.get(&key).unwrap();
  assert_eq!(entry.value, None);
  assert_eq!(entry.versionstamp, None);

  let r1 = kv.set(&key, text("b"), None).unwrap();
  assert!(r1.versionstamp.as_str() > "00000000000000000000");

  let entry = kv.get(&key).unwrap();
  assert_eq!(entry.value, Some(text("b")));
  assert_eq!(entry.versionstamp, Some(r1.versionstamp.clone()));

  let r2 = kv.set(&key, text("c"), None).unwrap();
  assert!(r2.versionstamp > r1.versionstamp);

  kv.delete(&key).unwrap();
  let entry = kv.get(&key).unwrap();
  assert_eq!(entry.value, None);
  assert_eq!(entry.versionstamp, None);
}

#[test]
fn s2_counter_wrap() {
  let kv = Kv::open_in_memory().unwrap();
  let key = [s("a")];
  kv.set(&key, KvValue::U64(KvU64::new(u64::MAX)), None).unwrap();

  let outcome = kv.atomic().sum(&key, KvU64::new(10)).commit().unwrap();
  assert!(matches!(outcome, CommitOutcome::Ok { .. }));

  let entry = kv.get(&key).unwrap();
  assert_eq!(entry.value.unwrap().as_counter().unwrap().value(), 9);
}

#[test]
fn s3_optimistic_failure() {
  let kv = Kv::open_in_memory().unwrap();
  let key = [s("t")];
  let vs_a = kv.set(&key, text("1"), None).unwrap().versionstamp;
  let vs_b = kv.set(&key, text("2"), None).unwrap().versionstamp;
  assert!(vs_b > vs_a);

  let outcome = kv
    .atomic()
    .check(&key, Some(&vs_a))
    .set(&key, text("3"), None)
    .commit()
    .unwrap();
  assert_eq!(outcome, CommitOutcome::Fail);

  let entry = kv.get(&key).unwrap();
  assert_eq!(entry.value, Some(text("2")));
}

#[test]
fn s4_cross_type_key_ordering() {
  let kv = Kv::open_in_memory().unwrap();
  kv.set(&[KeyPart::Bytes(vec![0x01])], KvValue::Int(0), None).unwrap();
  kv.set(&[s("a")], KvValue::Int(0), None).unwrap();
  kv.set(&[KeyPart::Int(1)], KvValue::Int(0), None).unwrap();
  kv.set(&[KeyPart::Float(3.14)], KvValue::Int(0), None).unwrap();
  kv.set(&[KeyPart::Bool(false)], KvValue::Int(0), None).unwrap();
  kv.set(&[KeyPart::Bool(true)], KvValue::Int(0), None).unwrap();

  let iter = kv.list(Selector::Prefix(vec![]), ListOptions::default()).unwrap();
  let keys: Vec<Vec<KeyPart>> =
    iter.map(|e| e.unwrap().key).collect();

  assert_eq!(
    keys,
    vec![
      vec![KeyPart::Bytes(vec![0x01])],
      vec![s("a")],
      vec![KeyPart::Int(1)],
      vec![KeyPart::Float(3.14)],
      vec![KeyPart::Bool(false)],
      vec![KeyPart::Bool(true)],
    ]
  );
}

#[test]
fn s5_prefix_list_with_cursor() {
  let kv = Kv::open_in_memory().unwrap();
  for (i, letter) in ["a", "b", "c", "d", "e"].iter().enumerate() {
    kv.set(&[s("a"), s(letter)], KvValue::Int(i as i64), None).unwrap();
  }

  let mut first = kv
    .list(
      Selector::Prefix(vec![s("a")]),
      ListOptions { limit: Some(2), ..Default::default() },
    )
    .unwrap();
  let page1: Vec<_> = (&mut first).map(|e| e.unwrap()).collect();
  assert_eq!(page1.len(), 2);
  assert_eq!(page1[0].key, vec![s("a"), s("a")]);
  assert_eq!(page1[1].key, vec![s("a"), s("b")]);
  let cursor = first.cursor().to_string();
  assert!(!cursor.is_empty());

  let second = kv
    .list(
      Selector::Prefix(vec![s("a")]),
      ListOptions { cursor: Some(cursor), ..Default::default() },
    )
    .unwrap();
  let page2: Vec<_> = second.map(|e| e.unwrap()).collect();
  let page2_keys: Vec<_> = page2.iter().map(|e| e.key.clone()).collect();
  assert_eq!(
    page2_keys,
    vec![
      vec![s("a"), s("c")],
      vec![s("a"), s("d")],
      vec![s("a"), s("e")],
    ]
  );
}

#[test]
fn s6_quota_errors() {
  let kv = Kv::open_in_memory().unwrap();

  let keys: Vec<[KeyPart; 1]> = (0..11).map(|i| [s(&i.to_string())]).collect();
  let key_refs: Vec<&[KeyPart]> = keys.iter().map(|k| k.as_slice()).collect();
  assert!(matches!(kv.get_many(&key_refs), Err(Error::TooManyRanges)));

  let mut batch = kv.atomic();
  for i in 0..1001 {
    batch = batch.set(&[s(&i.to_string())], KvValue::Int(i), None);
  }
  assert!(matches!(batch.commit(), Err(Error::TooManyMutations)));

  let big = KvValue::Bytes(vec![0u8; 65537]);
  assert!(matches!(kv.set(&[s("x")], big, None), Err(Error::ValueTooLarge)));
}

#[test]
fn s7_counter_type_guard() {
  let kv = Kv::open_in_memory().unwrap();
  let key = [s("a")];
  kv.set(&key, KvValue::Int(1), None).unwrap();

  let err = kv.atomic().sum(&key, KvU64::new(1)).commit().unwrap_err();
  assert!(matches!(err, Error::NotACounter { op: "sum" }));
}
