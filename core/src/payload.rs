//! Mutable JSON object tree used for outgoing request bodies and parsed
//! responses.
//!
//! # Design
//! The Game API answers with loosely typed JSON: booleans arrive as `"true"`,
//! ids as `"42"`, and optional fields are simply absent. `Payload` therefore
//! exposes lenient accessors that coerce between scalar kinds and fall back
//! to a documented default (empty string, `false`, `0`, empty list) when a
//! key is missing. Every fallback is logged at `error` level so missing data
//! stays visible without aborting the caller. The `*_or_default` variants
//! skip the log for fields the API legitimately omits.
//!
//! Serialization walks the tree recursively instead of delegating to
//! `serde_json::to_string`, so the emitted layout (keyed inside objects,
//! bare inside arrays) is explicit and stable.

use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::ApiError;

/// A JSON object tree. Always object-shaped at the root.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    data: Map<String, Value>,
    content: String,
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Payload {
    /// An empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON value. Non-object values are rejected.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        match value {
            Value::Object(data) => Ok(Self {
                data,
                content: String::new(),
            }),
            other => Err(ApiError::DeserializationError(format!(
                "expected a JSON object, found {}",
                kind(&other)
            ))),
        }
    }

    /// Parse `text` into a new tree. The raw text is kept as `content()`.
    /// Invalid input is logged before the error is returned.
    pub fn parse(text: &str) -> Result<Self, ApiError> {
        let parsed = serde_json::from_str(text)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
            .and_then(Self::from_value);
        match parsed {
            Ok(mut payload) => {
                payload.content = text.to_string();
                Ok(payload)
            }
            Err(e) => {
                error!(input = %text, "JSON data is invalid: {e}");
                Err(e)
            }
        }
    }

    /// Like `parse`, but never fails: invalid input yields an empty tree
    /// that still carries the raw text.
    pub fn parse_lenient(text: &str) -> Self {
        Self::parse(text).unwrap_or_else(|_| Self::unparsed(text))
    }

    /// Empty tree carrying `text` as its raw content.
    pub(crate) fn unparsed(text: &str) -> Self {
        Self {
            data: Map::new(),
            content: text.to_string(),
        }
    }

    /// The raw text this tree was parsed from, empty for built trees.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    // -----------------------------------------------------------------------
    // Lenient accessors
    // -----------------------------------------------------------------------

    /// Nested object under `key`, or `None` if absent or not an object.
    pub fn get_object(&self, key: &str) -> Option<Payload> {
        match self.data.get(key) {
            Some(Value::Object(map)) => Some(Payload {
                data: map.clone(),
                content: String::new(),
            }),
            Some(other) => {
                error!(key, "entry is a {}, not an object", kind(other));
                None
            }
            None => {
                error!(key, "entry not found in the field data");
                None
            }
        }
    }

    /// String under `key`. Numbers and booleans are rendered as text.
    /// Defaults to `""`.
    pub fn get_string(&self, key: &str) -> String {
        self.string_field(key).unwrap_or_else(|| {
            error!(key, "entry not found in the field data");
            String::new()
        })
    }

    /// Same as `get_string`, without logging a missing key.
    pub fn get_string_or_default(&self, key: &str) -> String {
        self.string_field(key).unwrap_or_default()
    }

    /// Boolean under `key`. Accepts `true`/`false`, the strings `"true"`,
    /// `"false"`, `"1"`, `"0"` and numbers. Defaults to `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.bool_field(key).unwrap_or_else(|| {
            error!(key, "entry not found in the field data");
            false
        })
    }

    /// Integer under `key`. Numeric strings are parsed and floats truncated.
    /// Defaults to `0`.
    pub fn get_int(&self, key: &str) -> i64 {
        self.int_field(key).unwrap_or_else(|| {
            error!(key, "entry not found in the field data");
            0
        })
    }

    /// Same as `get_int`, without logging a missing key.
    pub fn get_int_or_default(&self, key: &str) -> i64 {
        self.int_field(key).unwrap_or_default()
    }

    /// All keys of this object.
    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    /// Every object element of the array under `key`. Non-object elements
    /// are skipped; a missing array yields an empty list.
    pub fn get_object_array(&self, key: &str) -> Vec<Payload> {
        let Some(Value::Array(items)) = self.data.get(key) else {
            error!(key, "array entry not found in the field data");
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(Payload {
                    data: map.clone(),
                    content: String::new(),
                }),
                other => {
                    warn!(key, "skipping {} element in object array", kind(other));
                    None
                }
            })
            .collect()
    }

    fn string_field(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn bool_field(&self, key: &str) -> Option<bool> {
        match self.data.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" | "" => Some(false),
                _ => None,
            },
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            _ => None,
        }
    }

    fn int_field(&self, key: &str) -> Option<i64> {
        match self.data.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
            }
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    /// Insert or replace a scalar or arbitrary JSON value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn set_object(&mut self, key: impl Into<String>, value: Payload) -> &mut Self {
        self.data.insert(key.into(), Value::Object(value.data));
        self
    }

    pub fn set_array(&mut self, key: impl Into<String>, items: Vec<Payload>) -> &mut Self {
        let items = items.into_iter().map(|p| Value::Object(p.data)).collect();
        self.data.insert(key.into(), Value::Array(items));
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.content.clear();
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Serialize the tree to compact JSON by walking it recursively.
    pub fn to_json_string(&self) -> String {
        let mut out = String::new();
        write_object(&mut out, &self.data);
        out
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl FromStr for Payload {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Write `value`, prefixed by `"key":` when a key is given. Array elements
/// and the root are written without a key.
fn write_value(out: &mut String, key: Option<&str>, value: &Value) {
    if let Some(key) = key {
        write_string(out, key);
        out.push(':');
    }
    match value {
        Value::String(s) => write_string(out, s),
        Value::Object(map) => write_object(out, map),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, None, item);
            }
            out.push(']');
        }
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(out, Some(key), value);
    }
    out.push('}');
}

/// Quote and escape through `Value`'s `Display`, which cannot fail.
fn write_string(out: &mut String, s: &str) {
    out.push_str(&Value::String(s.to_owned()).to_string());
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RESPONSE: &str = r#"{
        "response": {
            "success": "true",
            "users": [
                {"id": "1", "username": "alice"},
                {"id": 2, "username": "bob"}
            ],
            "nested": {"deep": {"list": ["a", "b\"quoted\""], "n": 1.5, "flag": false, "none": null}}
        }
    }"#;

    #[test]
    fn well_formed_json_round_trips() {
        let parsed = Payload::parse(RESPONSE).unwrap();
        let written = parsed.to_json_string();
        let reparsed = Payload::parse(&written).unwrap();
        assert_eq!(parsed, reparsed);

        let original: Value = serde_json::from_str(RESPONSE).unwrap();
        let emitted: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(original, emitted);
    }

    #[test]
    fn writer_emits_keys_only_inside_objects() {
        let mut p = Payload::new();
        p.set("list", json!(["x", {"k": "v"}]));
        assert_eq!(p.to_json_string(), r#"{"list":["x",{"k":"v"}]}"#);
    }

    #[test]
    fn empty_payload_writes_empty_object() {
        assert_eq!(Payload::new().to_json_string(), "{}");
    }

    #[test]
    fn missing_keys_return_defaults() {
        let p = Payload::new();
        assert_eq!(p.get_string("nope"), "");
        assert!(!p.get_bool("nope"));
        assert_eq!(p.get_int("nope"), 0);
        assert!(p.get_object("nope").is_none());
        assert!(p.get_object_array("nope").is_empty());
        assert!(p.keys().is_empty());
    }

    #[test]
    fn accessors_coerce_string_scalars() {
        let p = Payload::parse(
            r#"{"t":"true","f":"FALSE","one":"1","n":"42","float":3.9,"num_str":7,"b":true}"#,
        )
        .unwrap();
        assert!(p.get_bool("t"));
        assert!(!p.get_bool("f"));
        assert!(p.get_bool("one"));
        assert_eq!(p.get_int("n"), 42);
        assert_eq!(p.get_int("float"), 3);
        assert_eq!(p.get_string("num_str"), "7");
        assert_eq!(p.get_string("b"), "true");
    }

    #[test]
    fn unparseable_bool_string_defaults_to_false() {
        let p = Payload::parse(r#"{"x":"maybe"}"#).unwrap();
        assert!(!p.get_bool("x"));
    }

    #[test]
    fn object_array_skips_non_objects() {
        let p = Payload::parse(r#"{"items":[{"a":1},"str",{"a":2}]}"#).unwrap();
        let items = p.get_object_array("items");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].get_int("a"), 2);
    }

    #[test]
    fn get_object_on_scalar_is_none() {
        let p = Payload::parse(r#"{"response":"oops"}"#).unwrap();
        assert!(p.get_object("response").is_none());
    }

    #[test]
    fn parse_rejects_non_object_root() {
        assert!(matches!(
            Payload::parse("[1,2]"),
            Err(ApiError::DeserializationError(_))
        ));
    }

    /// Collects formatted log output from a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_of(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn parse_failure_is_logged_once() {
        let logs = logs_of(|| {
            assert!("{oops".parse::<Payload>().is_err());
        });
        assert_eq!(logs.matches("JSON data is invalid").count(), 1, "{logs}");
        assert!(logs.contains("{oops"));

        let logs = logs_of(|| {
            Payload::parse_lenient("not json");
        });
        assert_eq!(logs.matches("JSON data is invalid").count(), 1, "{logs}");
    }

    #[test]
    fn parse_lenient_keeps_content_on_bad_input() {
        let p = Payload::parse_lenient("not json");
        assert!(p.is_empty());
        assert_eq!(p.content(), "not json");
        assert_eq!(p.get_string("anything"), "");
    }

    #[test]
    fn builders_nest_payloads() {
        let mut inner = Payload::new();
        inner.set("score", 10);
        let mut p = Payload::new();
        p.set("name", "run").set_object("meta", inner.clone()).set_array("runs", vec![inner]);
        assert_eq!(p.get_object("meta").unwrap().get_int("score"), 10);
        assert_eq!(p.get_object_array("runs").len(), 1);
        assert_eq!(p.remove("name"), Some(json!("run")));
        assert!(!p.contains("name"));
    }

    #[test]
    fn from_str_trait_matches_parse() {
        let p: Payload = r#"{"a":"b"}"#.parse().unwrap();
        assert_eq!(p.get_string("a"), "b");
    }
}
