//! Query-string decoding and encoding.
//!
//! # Responsibilities
//! - Decode `a=1&b=2` into a [`Params`] map, flat or nested
//! - Coerce repeated keys (and `key[]`) into ordered lists
//! - Encode a [`Params`] map back into a query string
//!
//! # Design Decisions
//! - Percent-decoding and `+` handling are delegated to `form_urlencoded`
//! - Flat mode keeps bracketed keys verbatim: `a[b]=1` → `{"a[b]": "1"}`
//! - Nested mode builds maps: `a[b]=1` → `{"a": {"b": "1"}}`
//! - When nested mode hits a shape conflict (`a=1&a[b]=2`) the conflicting
//!   pair is stored under its verbatim key instead of failing

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Ordered parameter map shared by query and path parameters.
pub type Params = BTreeMap<String, ParamValue>;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    List(Vec<String>),
    Map(Params),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            ParamValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

/// How bracketed keys are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    Flat,
    #[default]
    Nested,
}

/// Decode `query` (with or without a leading `?`) using `mode`.
pub fn decode(query: &str, mode: QueryMode) -> Params {
    match mode {
        QueryMode::Flat => decode_flat(query),
        QueryMode::Nested => decode_nested(query),
    }
}

/// Decode keeping bracketed keys verbatim.
///
/// `color=blue&color=red` → `{"color": ["blue", "red"]}`
pub fn decode_flat(query: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in pairs(query) {
        let key = strip_array_suffix(&key);
        if insert_leaf(&mut params, key, value).is_err() {
            tracing::trace!(key, "dropping query value that conflicts with a nested key");
        }
    }
    params
}

/// Decode building nested maps from bracket notation.
///
/// `post[author][name]=Luiz` → `{"post": {"author": {"name": "Luiz"}}}`
pub fn decode_nested(query: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in pairs(query) {
        let key = strip_array_suffix(&key);
        let path: Vec<String> = key.split('[').map(|part| part.replacen(']', "", 1)).collect();

        if let Err(value) = insert_path(&mut params, &path, value) {
            // Shape conflict: keep the pair as an independent, verbatim key.
            if insert_leaf(&mut params, key, value).is_err() {
                tracing::trace!(key, "dropping query value that conflicts with a nested key");
            }
        }
    }
    params
}

/// Encode `params` as `application/x-www-form-urlencoded`.
///
/// Lists become repeated `key[]` pairs and maps become `key[sub]` pairs.
pub fn encode(params: &Params) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        append(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &ParamValue) {
    match value {
        ParamValue::Str(s) => {
            serializer.append_pair(key, s);
        }
        ParamValue::List(items) => {
            let key = format!("{}[]", key);
            for item in items {
                serializer.append_pair(&key, item);
            }
        }
        ParamValue::Map(map) => {
            for (sub, value) in map {
                append(serializer, &format!("{}[{}]", key, sub), value);
            }
        }
    }
}

fn pairs(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
}

fn strip_array_suffix(key: &str) -> &str {
    match key.strip_suffix("[]") {
        Some(base) if !base.is_empty() => base,
        _ => key,
    }
}

/// Insert a scalar under `key`, turning repeats into a list.
/// Hands the value back if `key` already holds a map.
fn insert_leaf(params: &mut Params, key: &str, value: String) -> Result<(), String> {
    let Some(existing) = params.get_mut(key) else {
        params.insert(key.to_string(), ParamValue::Str(value));
        return Ok(());
    };
    match existing {
        ParamValue::List(items) => items.push(value),
        ParamValue::Str(first) => {
            let first = std::mem::take(first);
            *existing = ParamValue::List(vec![first, value]);
        }
        ParamValue::Map(_) => return Err(value),
    }
    Ok(())
}

fn insert_path(params: &mut Params, path: &[String], value: String) -> Result<(), String> {
    match path {
        [] => Err(value),
        [leaf] => insert_leaf(params, leaf, value),
        [head, rest @ ..] => {
            let entry = params
                .entry(head.clone())
                .or_insert_with(|| ParamValue::Map(Params::new()));
            match entry {
                ParamValue::Map(inner) => insert_path(inner, rest, value),
                _ => Err(value),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> ParamValue {
        ParamValue::Str(v.to_string())
    }

    fn list(items: &[&str]) -> ParamValue {
        ParamValue::List(items.iter().map(|i| i.to_string()).collect())
    }

    #[test]
    fn test_flat_simple() {
        let params = decode_flat("?name=luiz&opt=on");
        assert_eq!(params.len(), 2);
        assert_eq!(params["name"], s("luiz"));
        assert_eq!(params["opt"], s("on"));
        assert!(decode_flat("").is_empty());
    }

    #[test]
    fn test_flat_keeps_brackets() {
        let params = decode_flat("person[name]=luiz&person[age]=10");
        assert_eq!(params["person[name]"], s("luiz"));
        assert_eq!(params["person[age]"], s("10"));
    }

    #[test]
    fn test_repeated_keys_become_list() {
        let params = decode_flat("color=blue&color=red&color=green");
        assert_eq!(params["color"], list(&["blue", "red", "green"]));

        let params = decode_flat("a[]=x&a[]=y");
        assert_eq!(params["a"], list(&["x", "y"]));
    }

    #[test]
    fn test_nested_maps() {
        let params = decode_nested("post[author][name]=Luiz&post[title]=Hi&page=2");
        let post = params["post"].as_map().unwrap();
        assert_eq!(post["title"], s("Hi"));
        assert_eq!(post["author"].as_map().unwrap()["name"], s("Luiz"));
        assert_eq!(params["page"], s("2"));
    }

    #[test]
    fn test_nested_arrays() {
        let params = decode_nested("colors[cold][]=blue&colors[cold][]=white");
        let colors = params["colors"].as_map().unwrap();
        assert_eq!(colors["cold"], list(&["blue", "white"]));
    }

    #[test]
    fn test_nested_conflict_kept_verbatim() {
        let params = decode_nested("a=1&a[b]=2");
        assert_eq!(params["a"], s("1"));
        assert_eq!(params["a[b]"], s("2"));
    }

    #[test]
    fn test_percent_decoding() {
        let params = decode_flat("q=hello%20world&tag=a+b");
        assert_eq!(params["q"], s("hello world"));
        assert_eq!(params["tag"], s("a b"));
    }

    #[test]
    fn test_encode_shapes() {
        let mut author = Params::new();
        author.insert("name".into(), s("Luiz"));
        let mut params = Params::new();
        params.insert("author".into(), ParamValue::Map(author));
        params.insert("foo".into(), s("bar"));
        params.insert("test".into(), list(&["1", "2"]));

        let encoded = encode(&params);
        assert_eq!(encoded, "author%5Bname%5D=Luiz&foo=bar&test%5B%5D=1&test%5B%5D=2");
        assert_eq!(decode_nested(&encoded), params);
    }

    #[test]
    fn test_flat_round_trip_without_brackets() {
        let query = "alpha=1&beta=two&gamma=3";
        assert_eq!(encode(&decode_flat(query)), query);
    }
}
