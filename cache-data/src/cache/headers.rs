//! Header values and the no-value boundary
//!
//! Persisted header maps may contain anything a previous writer put there:
//! JSON `null`, the `"undefined"` token, empty strings, booleans. This module
//! is the single place where such values are turned into "no value". Once a
//! value is a [`HeaderValue`] it is safe to put on the wire.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Textual token that means "no value" and must never be sent as one
pub const NO_VALUE_TOKEN: &str = "undefined";

/// Returns true only for values that may be written into an outbound header:
/// non-empty strings other than [`NO_VALUE_TOKEN`], and finite numbers.
pub fn is_valid_outgoing_header_value(value: &Value) -> bool {
    match value {
        Value::String(text) => is_valid_text(text),
        Value::Number(number) => number.as_f64().is_some_and(f64::is_finite),
        _ => false,
    }
}

fn is_valid_text(text: &str) -> bool {
    !text.is_empty() && text != NO_VALUE_TOKEN
}

/// Case-insensitive lookup in a raw (persisted) header map.
///
/// A missing key, a sentinel and any other unusable value all come back as `None`.
pub fn get_header(headers: &BTreeMap<String, Value>, key: &str) -> Option<HeaderValue> {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(key))
        .find_map(|(_, value)| HeaderValue::from_json(value))
}

/// A header value that passed [`is_valid_outgoing_header_value`]
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderValue(Repr);

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Text(String),
    Number(f64),
}

impl HeaderValue {
    /// Wrap a string, or `None` if it is empty or the no-value token
    pub fn text(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        is_valid_text(&text).then_some(HeaderValue(Repr::Text(text)))
    }

    /// Wrap a number, or `None` if it is NaN or infinite
    pub fn number(number: f64) -> Option<Self> {
        number.is_finite().then_some(HeaderValue(Repr::Number(number)))
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Self::text(text.as_str()),
            Value::Number(number) => number.as_f64().and_then(Self::number),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match &self.0 {
            Repr::Text(text) => Value::String(text.clone()),
            Repr::Number(number) => serde_json::Number::from_f64(*number)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Repr::Text(text) => Some(text),
            Repr::Number(_) => None,
        }
    }

    /// Numeric view; text values are parsed when they hold a number
    pub fn as_f64(&self) -> Option<f64> {
        match &self.0 {
            Repr::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Repr::Number(number) => Some(*number),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Text(text) => write!(f, "{}", text),
            Repr::Number(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Repr::Number(number) => write!(f, "{}", number),
        }
    }
}

impl Serialize for HeaderValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.0 {
            Repr::Text(text) => serializer.serialize_str(text),
            Repr::Number(number) => serializer.serialize_f64(*number),
        }
    }
}

/// Lower-cased header map holding only valid values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct Headers(BTreeMap<String, HeaderValue>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitize a raw header map: keys are lower-cased, unusable values dropped
    pub fn from_raw(raw: &BTreeMap<String, Value>) -> Self {
        let mut headers = Headers::new();
        for (name, value) in raw {
            if let Some(value) = HeaderValue::from_json(value) {
                headers.insert(name, value);
            }
        }
        headers
    }

    /// Normalize upstream response headers
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Headers::new();
        for (name, value) in pairs {
            headers.insert_text(name.as_ref(), value.as_ref());
        }
        headers
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: &str, value: HeaderValue) {
        self.0.insert(name.to_ascii_lowercase(), value);
    }

    /// Insert a text value if it is valid; returns whether it was stored
    pub fn insert_text(&mut self, name: &str, value: &str) -> bool {
        match HeaderValue::text(value) {
            Some(value) => {
                self.insert(name, value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// Overlay `other` on top of these headers
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    /// Keep only the headers named in the allow-list
    pub fn retain_allowed(&self, allowed: &[String]) -> Headers {
        let allowed: Vec<String> = allowed.iter().map(|h| h.to_ascii_lowercase()).collect();
        Headers(
            self.0
                .iter()
                .filter(|(name, _)| allowed.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_raw(&self) -> BTreeMap<String, Value> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }

    /// Approximate in-memory footprint
    pub fn approximate_size(&self) -> usize {
        self.0
            .iter()
            .map(|(name, value)| name.len() + value.to_string().len())
            .sum()
    }
}

impl From<BTreeMap<String, Value>> for Headers {
    fn from(raw: BTreeMap<String, Value>) -> Self {
        Headers::from_raw(&raw)
    }
}

impl From<Headers> for BTreeMap<String, Value> {
    fn from(headers: Headers) -> Self {
        headers.to_raw()
    }
}
