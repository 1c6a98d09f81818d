//! C3 — Clause Evaluator. Applies a single predicate clause to a compare
//! result's before/after values (spec.md §4.3).

use crate::model::{ChangeType, Clause, CompareResult, Operation};
use crate::regex_cache;
use crate::value::{self, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Collation used by `STARTS_WITH`/`ENDS_WITH`. spec.md §9 calls out that the
/// source compares "culture-sensitively" under the current locale; rather
/// than silently switching to ordinal, this is an explicit choice the caller
/// makes through the analyzer constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// Byte-for-byte comparison.
    Ordinal,
    /// Case-insensitive, Unicode-aware uppercase comparison — the
    /// locale-independent approximation of "current culture" comparison.
    CaseInsensitive,
}

impl Default for Collation {
    fn default() -> Self {
        Collation::Ordinal
    }
}

/// Evaluates `clause` against `result`. Total: any internal fault (a bad
/// integer/date parse, an unsupported operator) yields `false` rather than
/// propagating, per spec.md §4.3 "Any uncaught exception during evaluation
/// yields false" and §7's totality requirement.
pub fn analyze_clause(clause: &Clause, result: &CompareResult, collation: Collation) -> bool {
    let after_applies = matches!(result.change_type, ChangeType::Created | ChangeType::Modified);
    let before_applies = matches!(result.change_type, ChangeType::Deleted | ChangeType::Modified);

    let after = if after_applies {
        result
            .compare
            .as_ref()
            .map(|v| value::resolve_path(v, &clause.field))
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    };
    let before = if before_applies {
        result
            .base
            .as_ref()
            .map(|v| value::resolve_path(v, &clause.field))
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    // The side that doesn't apply to this change type contributes nothing to
    // S/P at all (rather than a synthetic null scalar) so that single-sided
    // change types (CREATED, DELETED) don't pollute S[0]-style lookups used
    // by the CONTAINS substring case below.
    let (scalars_b, pairs_b) = if before_applies { value::extract(&before) } else { (vec![], vec![]) };
    let (scalars_a, pairs_a) = if after_applies { value::extract(&after) } else { (vec![], vec![]) };
    let scalars: Vec<Option<String>> = scalars_b.into_iter().chain(scalars_a.into_iter()).collect();
    let pairs: Vec<(String, String)> = pairs_b.into_iter().chain(pairs_a.into_iter()).collect();
    let type_holder = if before.is_null() { &after } else { &before };

    match clause.operation {
        Operation::Eq => data_of(clause).map_or(false, |data| {
            data.iter().any(|d| scalars.iter().any(|s| s.as_deref() == Some(d.as_str())))
        }),
        Operation::Neq => data_of(clause).map_or(false, |data| {
            !data.iter().any(|d| scalars.iter().any(|s| s.as_deref() == Some(d.as_str())))
        }),
        Operation::Contains => eval_contains(clause, &scalars, &pairs, type_holder, false),
        Operation::ContainsAny => eval_contains(clause, &scalars, &pairs, type_holder, true),
        Operation::StartsWith => eval_affix(clause, &scalars, collation, true),
        Operation::EndsWith => eval_affix(clause, &scalars, collation, false),
        Operation::Gt => eval_numeric(clause, &scalars, |s, n| s > n),
        Operation::Lt => eval_numeric(clause, &scalars, |s, n| s < n),
        Operation::Regex => eval_regex(clause, &scalars),
        Operation::IsNull => scalars.iter().all(|s| s.is_none()),
        Operation::IsTrue => scalars.iter().any(|s| parse_bool(s.as_deref())),
        Operation::IsBefore => eval_date(clause, &scalars, |s, d| s < d),
        Operation::IsAfter => eval_date(clause, &scalars, |s, d| s > d),
        Operation::IsExpired => {
            let now = Utc::now();
            scalars
                .iter()
                .filter_map(|s| s.as_deref())
                .filter_map(parse_timestamp)
                .any(|dt| dt < now)
        }
        Operation::WasModified => {
            result.change_type == ChangeType::Modified && before != after
        }
        Operation::DoesNotContain | Operation::DoesNotContainAll => {
            tracing::warn!(
                field = %clause.field,
                operation = ?clause.operation,
                "unsupported reserved operator reached the evaluator; rejecting"
            );
            false
        }
    }
}

fn data_of(clause: &Clause) -> Option<&Vec<String>> {
    clause.data.as_ref().filter(|d| !d.is_empty())
}

fn eval_contains(
    clause: &Clause,
    scalars: &[Option<String>],
    pairs: &[(String, String)],
    type_holder: &Value,
    any: bool,
) -> bool {
    if !pairs.is_empty() {
        let dict_data = match &clause.dict_data {
            Some(d) if !d.is_empty() => d,
            _ => return false,
        };
        if any {
            dict_data.iter().any(|entry| pairs.contains(entry))
        } else {
            dict_data.iter().all(|entry| pairs.contains(entry))
        }
    } else {
        let data = match data_of(clause) {
            Some(d) => d,
            None => return false,
        };
        match type_holder {
            Value::List(_) => {
                let present = |d: &String| scalars.iter().any(|s| s.as_deref() == Some(d.as_str()));
                if any { data.iter().any(present) } else { data.iter().all(present) }
            }
            Value::Str(_) => {
                let haystack = match scalars.first().and_then(|s| s.as_deref()) {
                    Some(s) => s,
                    None => return false,
                };
                if any {
                    data.iter().any(|d| haystack.contains(d.as_str()))
                } else {
                    data.iter().all(|d| haystack.contains(d.as_str()))
                }
            }
            _ => false,
        }
    }
}

fn eval_affix(clause: &Clause, scalars: &[Option<String>], collation: Collation, prefix: bool) -> bool {
    let data = match data_of(clause) {
        Some(d) => d,
        None => return false,
    };
    let matches = |s: &str, d: &str| match collation {
        Collation::Ordinal => {
            if prefix { s.starts_with(d) } else { s.ends_with(d) }
        }
        Collation::CaseInsensitive => {
            let (s, d) = (s.to_uppercase(), d.to_uppercase());
            if prefix { s.starts_with(&d) } else { s.ends_with(&d) }
        }
    };
    scalars
        .iter()
        .filter_map(|s| s.as_deref())
        .any(|s| data.iter().any(|d| matches(s, d)))
}

fn eval_numeric(clause: &Clause, scalars: &[Option<String>], cmp: impl Fn(i64, i64) -> bool) -> bool {
    let data = match data_of(clause) {
        Some(d) if d.len() == 1 => d,
        _ => return false,
    };
    let n: i64 = match data[0].parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    scalars
        .iter()
        .filter_map(|s| s.as_deref())
        .filter_map(|s| s.parse::<i64>().ok())
        .any(|s| cmp(s, n))
}

fn eval_regex(clause: &Clause, scalars: &[Option<String>]) -> bool {
    let data = match data_of(clause) {
        Some(d) => d,
        None => return false,
    };
    let pattern = data.join("|");
    let re = match regex_cache::compiled(&pattern) {
        Some(re) => re,
        None => return false,
    };
    scalars
        .iter()
        .filter_map(|s| s.as_deref())
        .any(|s| re.is_match(s).unwrap_or(false))
}

fn eval_date(clause: &Clause, scalars: &[Option<String>], cmp: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool) -> bool {
    let data = match data_of(clause) {
        Some(d) => d,
        None => return false,
    };
    let parsed_data: Vec<DateTime<Utc>> = data.iter().filter_map(|d| parse_timestamp(d)).collect();
    if parsed_data.is_empty() {
        return false;
    }
    scalars
        .iter()
        .filter_map(|s| s.as_deref())
        .filter_map(parse_timestamp)
        .any(|s| parsed_data.iter().any(|d| cmp(s, *d)))
}

fn parse_bool(s: Option<&str>) -> bool {
    matches!(s, Some(s) if s.eq_ignore_ascii_case("true"))
}

/// Accepts RFC 3339 timestamps and bare dates (`YYYY-MM-DD`), the two shapes
/// a compare-result collector realistically emits for timestamp fields.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(
            d.and_hms_opt(0, 0, 0).unwrap(),
            Utc,
        ));
    }
    None
}

#[cfg(test)]
#[path = "clause_tests.rs"]
mod clause_tests;
