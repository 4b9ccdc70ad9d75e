use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The uniform dynamic value the pipeline passes around wherever the
/// payload shape is caller-defined: meta mappings, transformation options,
/// callback inputs and outputs, and adapter-private repository state.
///
/// Maps are ordered so the canonical encoding is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    List(Vec<Term>),
    Map(BTreeMap<String, Term>),
}

impl Term {
    pub fn map() -> BTreeMap<String, Term> {
        BTreeMap::new()
    }

    pub fn empty_map() -> Term {
        Term::Map(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Term::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Term::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Term::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Term::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Term::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Term::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Term>> {
        match self {
            Term::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Fetch a key out of a map term; `None` for non-maps and misses.
    pub fn get(&self, key: &str) -> Option<&Term> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<bool> for Term {
    fn from(v: bool) -> Self {
        Term::Bool(v)
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Self {
        Term::Int(v)
    }
}

impl From<&str> for Term {
    fn from(v: &str) -> Self {
        Term::Text(v.to_string())
    }
}

impl From<String> for Term {
    fn from(v: String) -> Self {
        Term::Text(v)
    }
}

impl From<Vec<u8>> for Term {
    fn from(v: Vec<u8>) -> Self {
        Term::Bytes(v)
    }
}

impl From<&[u8]> for Term {
    fn from(v: &[u8]) -> Self {
        Term::Bytes(v.to_vec())
    }
}

impl From<Vec<Term>> for Term {
    fn from(v: Vec<Term>) -> Self {
        Term::List(v)
    }
}

impl From<BTreeMap<String, Term>> for Term {
    fn from(v: BTreeMap<String, Term>) -> Self {
        Term::Map(v)
    }
}

impl<T: Into<Term>> From<Option<T>> for Term {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Term::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_walks_maps() {
        let mut m = Term::map();
        m.insert("a".to_string(), Term::Int(1));
        let t = Term::Map(m);
        assert_eq!(t.get("a"), Some(&Term::Int(1)));
        assert_eq!(t.get("b"), None);
        assert_eq!(Term::Int(1).get("a"), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(Term::from("x"), Term::Text("x".to_string()));
        assert_eq!(Term::from(Some(3i64)), Term::Int(3));
        assert_eq!(Term::from(None::<i64>), Term::Null);
    }
}
