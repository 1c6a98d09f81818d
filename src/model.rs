//! The rule/clause data model, spec.md §3.

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
}

/// The kind of collected object a rule applies to (file, registry key,
/// service, ...). Left open rather than a closed enum — spec.md §3 gives no
/// fixed list and rule files name arbitrary result types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultType(pub String);

impl From<&str> for ResultType {
    fn from(s: &str) -> Self {
        ResultType(s.to_string())
    }
}

impl From<String> for ResultType {
    fn from(s: String) -> Self {
        ResultType(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    None,
    Information,
    Verbose,
    Warning,
    Error,
}

impl Default for Verdict {
    fn default() -> Self {
        Verdict::None
    }
}

/// The closed operator set from spec.md §3. `DoesNotContain` /
/// `DoesNotContainAll` exist as tagged variants because rule files may name
/// them, but the validator rejects every clause that uses one and the
/// evaluator never matches on supported behavior for them (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Eq,
    Neq,
    Contains,
    ContainsAny,
    EndsWith,
    StartsWith,
    Gt,
    Lt,
    Regex,
    IsNull,
    IsTrue,
    IsBefore,
    IsAfter,
    IsExpired,
    WasModified,
    DoesNotContain,
    DoesNotContainAll,
}

/// Opaque, process-wide unique identity for a `CompareResult`, used as the
/// first component of the clause cache key (spec.md §9 "Cache keying by
/// object identity"). Issued once per `CompareResult::new` rather than
/// derived from a pointer, so it stays stable even if the value is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompareResultId(u64);

static NEXT_COMPARE_RESULT_ID: AtomicU64 = AtomicU64::new(1);

impl CompareResultId {
    fn next() -> Self {
        CompareResultId(NEXT_COMPARE_RESULT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A clause's identity, used as the second component of the clause cache key.
/// `rule_index` is the rule's position within its (immutable, load-once)
/// `RuleFile`; labels aren't always present, so identity is positional
/// rather than label-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClauseId {
    pub rule_index: usize,
    pub clause_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "Operation")]
    pub operation: Operation,
    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
    #[serde(rename = "DictData", default, skip_serializing_if = "Option::is_none")]
    pub dict_data: Option<Vec<(String, String)>>,
    #[serde(rename = "Label", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Desc", default)]
    pub description: String,
    #[serde(rename = "Flag")]
    pub verdict: Verdict,
    #[serde(rename = "ResultType")]
    pub result_type: ResultType,
    #[serde(rename = "Platforms", default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<HashSet<Platform>>,
    #[serde(rename = "ChangeTypes", default, skip_serializing_if = "Option::is_none")]
    pub change_types: Option<HashSet<ChangeType>>,
    #[serde(rename = "Clauses", default)]
    pub clauses: Vec<Clause>,
    #[serde(rename = "Expression", default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(rename = "DefaultLevels", default)]
    pub default_verdicts: IndexMap<ResultType, Verdict>,
    #[serde(rename = "Rules", default)]
    pub rules: Vec<Rule>,
}

/// A rule that matched a compare result, carried for reporting (SPEC_FULL.md
/// §B "Supplemented features" — rule name, verdict, and the matched rule's
/// clause labels for a human-readable report of which clauses were in play).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedRule {
    pub rule_name: String,
    pub verdict: Verdict,
    pub matched_clause_labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CompareResult {
    pub id: CompareResultId,
    pub result_type: ResultType,
    pub change_type: ChangeType,
    pub base: Option<Value>,
    pub compare: Option<Value>,
    pub analysis: Verdict,
    pub matched_rules: Vec<MatchedRule>,
}

impl CompareResult {
    pub fn new(
        result_type: impl Into<ResultType>,
        change_type: ChangeType,
        base: Option<Value>,
        compare: Option<Value>,
    ) -> Self {
        CompareResult {
            id: CompareResultId::next(),
            result_type: result_type.into(),
            change_type,
            base,
            compare,
            analysis: Verdict::None,
            matched_rules: Vec::new(),
        }
    }
}
