// Copyright 2018-2026 the Deno authors. MIT license.

//! Textual JSON-like codec family (SPEC_FULL.md §4.3). Binary payloads are
//! base64-encoded; a counter is stored as a marked object so it round-trips
//! distinctly from a plain number.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Map;
use serde_json::Value as Json;

use crate::error::Error;
use crate::value::KvU64;
use crate::value::KvValue;
use crate::value::ValueCodec;

const COUNTER_MARKER: &str = "$kvu64";
const BYTES_MARKER: &str = "$bytes";

#[derive(Debug, Default)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
  fn encode(&self, value: &KvValue) -> Result<Vec<u8>, Error> {
    let json = to_json(value);
    serde_json::to_vec(&json)
      .map_err(|e| Error::SerializationFailure(e.to_string()))
  }

  fn decode(&self, bytes: &[u8]) -> Result<KvValue, Error> {
    let json: Json = serde_json::from_slice(bytes)
      .map_err(|e| Error::SerializationFailure(e.to_string()))?;
    from_json(&json)
  }
}

fn to_json(value: &KvValue) -> Json {
  match value {
    KvValue::Null => Json::Null,
    KvValue::Bool(b) => Json::Bool(*b),
    KvValue::Int(i) => Json::Number((*i).into()),
    KvValue::Float(f) => {
      serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null)
    }
    KvValue::Text(s) => Json::String(s.clone()),
    KvValue::Bytes(b) => {
      let mut obj = Map::new();
      obj.insert(BYTES_MARKER.into(), Json::String(BASE64.encode(b)));
      Json::Object(obj)
    }
    KvValue::Array(items) => Json::Array(items.iter().map(to_json).collect()),
    KvValue::Map(entries) => {
      let mut obj = Map::new();
      for (k, v) in entries {
        obj.insert(k.clone(), to_json(v));
      }
      Json::Object(obj)
    }
    KvValue::U64(counter) => {
      let mut obj = Map::new();
      obj.insert(COUNTER_MARKER.into(), Json::String(counter.value().to_string()));
      Json::Object(obj)
    }
  }
}

fn from_json(json: &Json) -> Result<KvValue, Error> {
  Ok(match json {
    Json::Null => KvValue::Null,
    Json::Bool(b) => KvValue::Bool(*b),
    Json::Number(n) => {
      if let Some(i) = n.as_i64() {
        KvValue::Int(i)
      } else if let Some(f) = n.as_f64() {
        KvValue::Float(f)
      } else {
        return Err(Error::SerializationFailure(
          "number out of range".to_string(),
        ));
      }
    }
    Json::String(s) => KvValue::Text(s.clone()),
    Json::Array(items) => {
      let parts: Result<Vec<_>, _> = items.iter().map(from_json).collect();
      KvValue::Array(parts?)
    }
    Json::Object(obj) => {
      if let Some(Json::String(s)) = obj.get(COUNTER_MARKER) {
        let v: u64 = s
          .parse()
          .map_err(|_| Error::SerializationFailure("bad counter".into()))?;
        return Ok(KvValue::U64(KvU64::new(v)));
      }
      if let Some(Json::String(s)) = obj.get(BYTES_MARKER) {
        let bytes = BASE64
          .decode(s)
          .map_err(|e| Error::SerializationFailure(e.to_string()))?;
        return Ok(KvValue::Bytes(bytes));
      }
      let mut entries = Vec::with_capacity(obj.len());
      for (k, v) in obj {
        entries.push((k.clone(), from_json(v)?));
      }
      KvValue::Map(entries)
    }
  })
}
