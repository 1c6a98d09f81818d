//! C4 — Expression Evaluator. A flat, precedence-free, left-to-right
//! boolean evaluator over clause labels (spec.md §4.4/§6). Precedence is
//! intentionally absent — rule authors group with parentheses instead.

use crate::clause::{self, Collation};
use crate::model::{ClauseId, CompareResult, Rule};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

impl BoolOp {
    fn from_token(tok: &str) -> Option<BoolOp> {
        match tok {
            "AND" => Some(BoolOp::And),
            "OR" => Some(BoolOp::Or),
            "XOR" => Some(BoolOp::Xor),
            "NAND" => Some(BoolOp::Nand),
            "NOR" => Some(BoolOp::Nor),
            _ => None,
        }
    }
}

fn operate(op: BoolOp, a: bool, b: bool) -> bool {
    match op {
        BoolOp::And => a && b,
        BoolOp::Or => a || b,
        BoolOp::Xor => a != b,
        BoolOp::Nand => !(a && b),
        BoolOp::Nor => !(a || b),
    }
}

/// Per-`(compare result, clause)` memoization, shared process-wide across all
/// expression evaluations (spec.md §5 shared-state item 1). Entries for a
/// given compare result are best-effort cleared at the end of `Analyze`.
#[derive(Default)]
pub struct ClauseCache {
    inner: RwLock<HashMap<(crate::model::CompareResultId, ClauseId), bool>>,
}

impl ClauseCache {
    pub fn new() -> Self {
        ClauseCache::default()
    }

    pub fn evict(&self, id: crate::model::CompareResultId) {
        self.inner.write().unwrap().retain(|key, _| key.0 != id);
    }

    fn get_or_insert(
        &self,
        key: (crate::model::CompareResultId, ClauseId),
        compute: impl FnOnce() -> bool,
    ) -> bool {
        if let Some(v) = self.inner.read().unwrap().get(&key) {
            return *v;
        }
        let value = compute();
        // Lost updates under concurrent first-evaluation are acceptable: the
        // predicate is pure over its inputs, so a redundant recompute is
        // idempotent (spec.md §5).
        self.inner.write().unwrap().insert(key, value);
        value
    }
}

fn tokenize(expression: &str) -> Vec<String> {
    expression.split_whitespace().map(String::from).collect()
}

/// Evaluates `rule.expression` (must be `Some`) against `result`. Returns
/// `false` if any referenced label fails to resolve to exactly one clause —
/// per spec.md §4.4 this fails the *whole* expression, not just the local
/// group the unresolved atom appears in, so a shared flag short-circuits
/// every enclosing level the moment it is set.
pub fn evaluate(
    rule: &Rule,
    rule_index: usize,
    result: &CompareResult,
    collation: Collation,
    cache: &ClauseCache,
) -> bool {
    let expression = rule.expression.as_deref().unwrap_or_default();
    let tokens = tokenize(expression);
    let failed = Cell::new(false);
    eval_tokens(&tokens, rule, rule_index, result, collation, cache, &failed)
}

fn eval_tokens(
    tokens: &[String],
    rule: &Rule,
    rule_index: usize,
    result: &CompareResult,
    collation: Collation,
    cache: &ClauseCache,
    failed: &Cell<bool>,
) -> bool {
    let mut current = false;
    let mut pending_op = BoolOp::Or; // first atom binds as `false OR atom`
    let mut invert_next = false;
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i].as_str();

        if let Some(op) = BoolOp::from_token(tok) {
            pending_op = op;
            i += 1;
            continue;
        }
        if tok == "NOT" {
            invert_next = true;
            i += 1;
            continue;
        }

        let short_circuit = match pending_op {
            BoolOp::And if !current => Some(false),
            BoolOp::Nor if current => Some(false),
            BoolOp::Or if current => Some(true),
            BoolOp::Nand if !current => Some(true),
            _ => None,
        };

        if let Some(result_value) = short_circuit {
            i = skip_atom(tokens, i);
            current = result_value;
            invert_next = false;
            continue;
        }

        let (atom_value, next_i) =
            eval_atom(tokens, i, rule, rule_index, result, collation, cache, failed);
        if failed.get() {
            return false;
        }
        let value = if invert_next { !atom_value } else { atom_value };
        invert_next = false;
        current = operate(pending_op, current, value);
        i = next_i;
    }

    current
}

/// Locates the token span `[start, end]` of the group opening at `start`
/// (which must begin with `(`), counting parenthesis characters across
/// tokens until the running close count reaches the running open count.
fn group_span(tokens: &[String], start: usize) -> usize {
    let mut opens = 0i32;
    let mut closes = 0i32;
    let mut j = start;
    loop {
        opens += tokens[j].matches('(').count() as i32;
        closes += tokens[j].matches(')').count() as i32;
        if closes >= opens || j + 1 >= tokens.len() {
            break;
        }
        j += 1;
    }
    j
}

fn eval_atom(
    tokens: &[String],
    i: usize,
    rule: &Rule,
    rule_index: usize,
    result: &CompareResult,
    collation: Collation,
    cache: &ClauseCache,
    failed: &Cell<bool>,
) -> (bool, usize) {
    let tok = tokens[i].as_str();
    if tok.starts_with('(') {
        let j = group_span(tokens, i);
        let mut sub: Vec<String> = tokens[i..=j].to_vec();
        if let Some(first) = sub.first_mut() {
            if let Some(stripped) = first.strip_prefix('(') {
                *first = stripped.to_string();
            }
        }
        if let Some(last) = sub.last_mut() {
            if let Some(stripped) = last.strip_suffix(')') {
                *last = stripped.to_string();
            }
        }
        let value = eval_tokens(&sub, rule, rule_index, result, collation, cache, failed);
        (value, j + 1)
    } else {
        let label = tok.trim_matches(|c| c == '(' || c == ')');
        let matches: Vec<usize> = rule
            .clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| c.label.as_deref() == Some(label))
            .map(|(idx, _)| idx)
            .collect();
        if matches.len() != 1 {
            tracing::debug!(
                rule = %rule.name,
                label = %label,
                candidates = matches.len(),
                "expression label did not resolve to exactly one clause"
            );
            failed.set(true);
            return (false, i + 1);
        }
        let clause_index = matches[0];
        let key = (
            result.id,
            ClauseId { rule_index, clause_index },
        );
        let value = cache.get_or_insert(key, || {
            clause::analyze_clause(&rule.clauses[clause_index], result, collation)
        });
        (value, i + 1)
    }
}

/// Skips an atom (NOT prefix, then either a parenthesized group or a bare
/// variable) without evaluating its clause(s) — preserves the "short
/// circuited atoms are not evaluated" guarantee (spec.md §4.4).
fn skip_atom(tokens: &[String], mut i: usize) -> usize {
    if i < tokens.len() && tokens[i] == "NOT" {
        i += 1;
    }
    if i >= tokens.len() {
        return i;
    }
    if tokens[i].starts_with('(') {
        group_span(tokens, i) + 1
    } else {
        i + 1
    }
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod expr_tests;
