//! Dynamic value model shared by the field accessor (C1) and value extractor
//! (C2). Collectors outside this crate are expected to already have shaped
//! their output into this tagged union; the engine never reflects over
//! language-native structs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str(""),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => f.write_str(s),
            Value::List(_) | Value::Map(_) => match serde_json::to_string(self) {
                Ok(s) => f.write_str(&s),
                Err(_) => f.write_str("<unrepresentable>"),
            },
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// True when `v` is a 2-element list of strings — the wire shape of a single
/// `(string, string)` pair in a "list of pairs" value (C2's third case).
fn is_string_pair(v: &Value) -> bool {
    matches!(v, Value::List(pair) if pair.len() == 2 && pair.iter().all(|i| matches!(i, Value::Str(_))))
}

/// C1 — Field Accessor.
///
/// Resolves a dotted field path against a dynamic object graph. Missing
/// members, out-of-range indices and type mismatches all collapse to
/// `Value::Null`; nothing here ever panics or propagates an error, matching
/// spec.md §4.1 ("Never throws to the caller").
pub fn resolve_path(root: &Value, path: &str) -> Value {
    if path.is_empty() {
        return root.clone();
    }
    let mut current = root;
    for segment in path.split('.') {
        match current {
            Value::Null => return Value::Null,
            Value::Map(map) => match map.get(segment) {
                Some(v) => current = v,
                None => return Value::Null,
            },
            Value::List(items) => match segment.parse::<usize>() {
                Ok(idx) => match items.get(idx) {
                    Some(v) => current = v,
                    None => return Value::Null,
                },
                Err(_) => {
                    tracing::debug!(
                        field = %path,
                        segment = %segment,
                        "field accessor: non-numeric index into a list"
                    );
                    return Value::Null;
                }
            },
            _ => {
                tracing::debug!(
                    field = %path,
                    segment = %segment,
                    "field accessor: path continues past a scalar value"
                );
                return Value::Null;
            }
        }
    }
    current.clone()
}

/// C2 — Value Extractor.
///
/// Normalizes a resolved value into two parallel views used by C3: a flat
/// multiset of scalars (`None` standing in for a null scalar) and a flat
/// multiset of `(key, value)` pairs.
pub fn extract(value: &Value) -> (Vec<Option<String>>, Vec<(String, String)>) {
    match value {
        Value::Null => (vec![None], vec![]),
        Value::List(items) if items.iter().all(|i| matches!(i, Value::Str(_))) => {
            let scalars = items
                .iter()
                .map(|i| i.as_str().map(|s| s.to_string()))
                .collect();
            (scalars, vec![])
        }
        Value::List(items) if !items.is_empty() && items.iter().all(is_string_pair) => {
            let pairs = items
                .iter()
                .map(|item| match item {
                    Value::List(pair) => match (&pair[0], &pair[1]) {
                        (Value::Str(k), Value::Str(v)) => (k.clone(), v.clone()),
                        _ => unreachable!("checked by is_string_pair"),
                    },
                    _ => unreachable!("checked by is_string_pair"),
                })
                .collect();
            (vec![], pairs)
        }
        Value::Map(map) if map.values().all(|v| matches!(v, Value::Str(_))) => {
            let pairs = map
                .iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect();
            (vec![], pairs)
        }
        Value::Map(map)
            if map
                .values()
                .all(|v| matches!(v, Value::List(l) if l.iter().all(|i| matches!(i, Value::Str(_))))) =>
        {
            let mut pairs = Vec::new();
            for (k, v) in map.iter() {
                if let Value::List(items) = v {
                    for item in items {
                        if let Value::Str(s) = item {
                            pairs.push((k.clone(), s.clone()));
                        }
                    }
                }
            }
            (vec![], pairs)
        }
        other => {
            let rendered = other.to_string();
            if rendered.is_empty() && !matches!(other, Value::Str(_)) {
                (vec![], vec![])
            } else {
                (vec![Some(rendered)], vec![])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    fn map(entries: &[(&str, Value)]) -> Value {
        let mut m = IndexMap::new();
        for (k, v) in entries {
            m.insert((*k).to_string(), v.clone());
        }
        Value::Map(m)
    }

    #[test]
    fn resolves_nested_map_path() {
        let inner = map(&[("name", Value::Str("bar".into()))]);
        let root = map(&[("a", inner)]);
        assert_eq!(resolve_path(&root, "a.name"), Value::Str("bar".into()));
    }

    #[test]
    fn resolves_list_index() {
        let root = Value::List(vec![Value::Str("x".into()), Value::Str("y".into())]);
        assert_eq!(resolve_path(&root, "1"), Value::Str("y".into()));
        assert_eq!(resolve_path(&root, "5"), Value::Null);
    }

    #[test]
    fn missing_member_is_null() {
        let root = map(&[("a", Value::Str("1".into()))]);
        assert_eq!(resolve_path(&root, "b"), Value::Null);
    }

    #[test]
    fn path_past_scalar_is_null() {
        let root = map(&[("a", Value::Int(1))]);
        assert_eq!(resolve_path(&root, "a.b"), Value::Null);
    }

    #[test]
    fn extract_null_is_single_none_scalar() {
        let (scalars, pairs) = extract(&Value::Null);
        assert_eq!(scalars, vec![None]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn extract_list_of_strings() {
        let v = Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]);
        let (scalars, pairs) = extract(&v);
        assert_eq!(scalars, vec![Some("a".to_string()), Some("b".to_string())]);
        assert!(pairs.is_empty());
    }

    #[test]
    fn extract_string_map() {
        let v = map(&[("x", Value::Str("1".into())), ("y", Value::Str("2".into()))]);
        let (scalars, pairs) = extract(&v);
        assert!(scalars.is_empty());
        assert_eq!(
            pairs,
            vec![("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn extract_map_of_lists_flattens_to_pairs() {
        let v = map(&[(
            "x",
            Value::List(vec![Value::Str("1".into()), Value::Str("2".into())]),
        )]);
        let (scalars, pairs) = extract(&v);
        assert!(scalars.is_empty());
        assert_eq!(
            pairs,
            vec![("x".to_string(), "1".to_string()), ("x".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn extract_scalar_falls_back_to_string() {
        let (scalars, _) = extract(&Value::Int(42));
        assert_eq!(scalars, vec![Some("42".to_string())]);
    }

    #[test]
    fn extract_list_of_pairs() {
        let v = Value::List(vec![
            Value::List(vec![Value::Str("x".into()), Value::Str("1".into())]),
            Value::List(vec![Value::Str("y".into()), Value::Str("3".into())]),
        ]);
        let (scalars, pairs) = extract(&v);
        assert!(scalars.is_empty());
        assert_eq!(
            pairs,
            vec![("x".to_string(), "1".to_string()), ("y".to_string(), "3".to_string())]
        );
    }
}
