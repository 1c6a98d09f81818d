//! Rule Analyzer: classifies compare-result diffs against a catalog of
//! security-analysis rules. See each module for the spec component it
//! implements (C1 field access, C2 value extraction, C3 clause evaluation,
//! C4 expression evaluation, C5 validation, C6 the analyzer facade).

pub mod analyzer;
pub mod clause;
pub mod errors;
pub mod expr;
pub mod model;
pub mod regex_cache;
pub mod validate;
pub mod value;

pub use analyzer::{Analyzer, RuleSource};
pub use errors::{Error, ErrorKind, Result};
pub use model::{
    ChangeType, Clause, ClauseId, CompareResult, CompareResultId, MatchedRule, Operation,
    Platform, ResultType, Rule, RuleFile, Verdict,
};
pub use value::Value;

/// The rule file baked into the binary, used when no `--rules` path is given
/// on the CLI (spec.md §6 "Loading ... from an embedded resource (default)").
pub const EMBEDDED_DEFAULT_RULES: &str = include_str!("../resources/default_rules.json");
