//! Open attribute storage for features and sequences, and plugin options.
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use linked_hash_map::{self, LinkedHashMap};
use serde::{Deserialize, Serialize};


/// A metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Meta),
}

impl Value {

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value; strings are parsed when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(vs) => Some(vs.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Meta> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Meta> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::List(vs) => write!(f, "{}", vs.iter().join(",")),
            Value::Map(m) => write!(f, "{{{}}}",
                                    m.iter().map(|(k, v)| format!("{}: {}", k, v)).join(", ")),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Value {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    /// Values beyond `i64::MAX` become floats.
    fn from(v: u64) -> Value {
        i64::try_from(v).map_or(Value::Float(v as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(vs: Vec<Value>) -> Value {
        Value::List(vs)
    }
}

impl From<Meta> for Value {
    fn from(m: Meta) -> Value {
        Value::Map(m)
    }
}

/// Insertion-ordered, string-keyed attribute map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Meta(LinkedHashMap<String, Value>);

impl Meta {

    pub fn new() -> Meta {
        Meta::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// String value under the key, if the key exists and holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Sets a value, returning the previous one.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
        where K: Into<String>, V: Into<Value>
    {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Nested map under the key, created empty when missing or not a map.
    pub fn entry_map(&mut self, key: &str) -> &mut Meta {
        let is_map = matches!(self.0.get(key), Some(Value::Map(_)));
        if !is_map {
            let _ = self.0.insert(key.to_owned(), Value::Map(Meta::new()));
        }
        match self.0.get_mut(key) {
            Some(Value::Map(m)) => m,
            _ => unreachable!("map entry was just inserted"),
        }
    }

    pub fn iter(&self) -> linked_hash_map::Iter<String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> linked_hash_map::Keys<String, Value> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Meta {
        Meta(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Meta {
    type Item = (&'a String, &'a Value);
    type IntoIter = linked_hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// String options passed on to format plugins, e.g. `exclude=translation`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options(LinkedHashMap<String, String>);

impl Options {

    pub fn new() -> Options {
        Options::default()
    }

    /// Returns the options with the given key set.
    pub fn with<K, V>(mut self, key: K, value: V) -> Options
        where K: Into<String>, V: Into<String>
    {
        let _ = self.0.insert(key.into(), value.into());
        self
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
        where K: Into<String>, V: Into<String>
    {
        let _ = self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    /// Boolean option; `true`, `yes`, `1` and `on` are truthy, a missing key gives the default.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on"),
            None => default,
        }
    }

    /// Parses the option value; `Ok(None)` when the key is missing.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, T::Err> {
        self.get(key).map(str::parse::<T>).transpose()
    }

    /// Comma-separated list option.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    /// Parses `key=value` pairs as given on a command line.
    pub fn from_pairs<'a, I>(pairs: I) -> Option<Options>
        where I: IntoIterator<Item = &'a str>
    {
        pairs.into_iter()
            .map(|pair| pair.split_once('=').map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned())))
            .collect::<Option<LinkedHashMap<_, _>>>()
            .map(Options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_keeps_insertion_order() {
        let mut meta = Meta::new();
        let _ = meta.insert("b", 1);
        let _ = meta.insert("a", "x");
        let _ = meta.insert("b", 2);
        assert_eq!(meta.keys().cloned().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(meta.get("b"), Some(&Value::Int(2)));
        assert_eq!(meta.get_str("a"), Some("x"));
    }

    #[test]
    fn meta_nested_entry() {
        let mut meta = Meta::new();
        let _ = meta.insert("_genbank", "not a map");
        let _ = meta.entry_map("_genbank").insert("note", "hi");
        let inner = meta.get("_genbank").and_then(Value::as_map).unwrap();
        assert_eq!(inner.get_str("note"), Some("hi"));
    }

    #[test]
    fn value_json_shapes() {
        let meta: Meta = vec![("n", Value::Int(3)), ("tags", Value::List(vec!["a".into()]))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&meta).unwrap();
        assert_eq!(json, r#"{"n":3,"tags":["a"]}"#);
        let back: Meta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn unsigned_values() {
        assert_eq!(Value::from(7u64), Value::Int(7));
        assert_eq!(Value::from(u64::MAX), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn options_accessors() {
        let opts = Options::from_pairs(vec!["exclude=translation,seq", "indent=2", "header=no"])
            .unwrap();
        assert_eq!(opts.list("exclude"), vec!["translation", "seq"]);
        assert_eq!(opts.parse::<usize>("indent"), Ok(Some(2)));
        assert_eq!(opts.parse::<usize>("width"), Ok(None));
        assert!(!opts.flag("header", true));
        assert!(opts.flag("missing", true));
        assert!(Options::from_pairs(vec!["novalue"]).is_none());
    }
}
