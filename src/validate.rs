//! C5 — Rule Validator. A static checker over a rule file; in effect a small
//! parser for the expression sub-language (spec.md §4.5). Never panics —
//! violations accumulate as human-readable strings for the caller to act on.

use crate::model::{Clause, Operation, Rule, RuleFile};
use std::collections::HashSet;

/// Runs every check in spec.md §4.5 over every rule in `rule_file`.
pub fn verify_rules(rule_file: &RuleFile) -> Vec<String> {
    let mut violations = Vec::new();
    for rule in &rule_file.rules {
        verify_rule(rule, &mut violations);
    }
    violations
}

fn verify_rule(rule: &Rule, violations: &mut Vec<String>) {
    verify_labels(rule, violations);
    for clause in &rule.clauses {
        verify_clause_shape(rule, clause, violations);
    }
    if let Some(expression) = &rule.expression {
        verify_expression(rule, expression, violations);
    }
}

fn verify_labels(rule: &Rule, violations: &mut Vec<String>) {
    let mut seen = HashSet::new();
    let mut any_labeled = false;
    let mut any_unlabeled = false;
    for clause in &rule.clauses {
        match &clause.label {
            Some(label) => {
                any_labeled = true;
                if label.contains(' ') || label.contains('(') || label.contains(')') {
                    violations.push(format!(
                        "rule '{}': label '{}' contains an illegal character (space, '(' or ')')",
                        rule.name, label
                    ));
                }
                if !seen.insert(label.clone()) {
                    violations.push(format!(
                        "rule '{}': duplicate clause label '{}'",
                        rule.name, label
                    ));
                }
            }
            None => any_unlabeled = true,
        }
    }
    if any_labeled && any_unlabeled {
        violations.push(format!(
            "rule '{}': clause labels must be either all present or all absent",
            rule.name
        ));
    }
    if rule.expression.is_some() && any_unlabeled {
        violations.push(format!(
            "rule '{}': every clause must carry a label when an expression is present",
            rule.name
        ));
    }
}

fn verify_clause_shape(rule: &Rule, clause: &Clause, violations: &mut Vec<String>) {
    let has_data = clause.data.as_ref().is_some_and(|d| !d.is_empty());
    let has_dict = clause.dict_data.as_ref().is_some_and(|d| !d.is_empty());

    let err = |msg: &str| format!("rule '{}', clause on field '{}': {}", rule.name, clause.field, msg);

    match clause.operation {
        Operation::Eq | Operation::Neq | Operation::EndsWith | Operation::StartsWith => {
            if !has_data {
                violations.push(err("requires a non-empty Data list"));
            }
            if has_dict {
                violations.push(err("DictData is not permitted for this operation"));
            }
        }
        Operation::Regex => {
            if !has_data {
                violations.push(err("requires a non-empty Data list"));
            }
            if has_dict {
                violations.push(err("DictData is not permitted for this operation"));
            }
            if let Some(data) = &clause.data {
                for pattern in data {
                    if let Err(e) = fancy_regex::Regex::new(pattern) {
                        violations.push(err(&format!("invalid regex '{}': {}", pattern, e)));
                    }
                }
            }
        }
        Operation::Contains | Operation::ContainsAny => {
            if has_data == has_dict {
                violations.push(err("requires exactly one of Data or DictData, non-empty"));
            }
        }
        Operation::Gt | Operation::Lt => {
            if has_dict {
                violations.push(err("DictData is not permitted for this operation"));
            }
            match &clause.data {
                Some(data) if data.len() == 1 && data[0].parse::<i64>().is_ok() => {}
                _ => violations.push(err("requires Data to be a single parseable integer")),
            }
        }
        Operation::IsBefore | Operation::IsAfter => {
            if has_dict {
                violations.push(err("DictData is not permitted for this operation"));
            }
            match &clause.data {
                Some(data) if data.len() == 1 && crate::clause::parse_timestamp(&data[0]).is_some() => {}
                _ => violations.push(err("requires Data to be a single parseable timestamp")),
            }
        }
        Operation::IsNull | Operation::IsTrue | Operation::IsExpired | Operation::WasModified => {
            if has_data {
                violations.push(err("Data is not permitted for this operation"));
            }
            if has_dict {
                violations.push(err("DictData is not permitted for this operation"));
            }
        }
        Operation::DoesNotContain | Operation::DoesNotContainAll => {
            violations.push(err(&format!("{:?} is reserved and unsupported", clause.operation)));
        }
    }
}

/// Tokens alternate `variable operator variable operator ... variable`,
/// starting and ending on a variable. Parentheses may open/close mid-token;
/// `NOT` is a unary prefix and never appears as the binary operator slot.
fn verify_expression(rule: &Rule, expression: &str, violations: &mut Vec<String>) {
    let open = expression.matches('(').count();
    let close = expression.matches(')').count();
    if open != close {
        violations.push(format!(
            "rule '{}': expression has unbalanced parentheses ('{}')",
            rule.name, expression
        ));
        return;
    }

    let tokens: Vec<&str> = expression.split_whitespace().collect();
    if tokens.is_empty() {
        violations.push(format!("rule '{}': expression is empty", rule.name));
        return;
    }

    for tok in &tokens {
        if let Some(violation) = check_token_paren_shape(rule, tok) {
            violations.push(violation);
        }
    }

    let labels: HashSet<&str> = rule
        .clauses
        .iter()
        .filter_map(|c| c.label.as_deref())
        .collect();
    let mut referenced: HashSet<String> = HashSet::new();

    let mut expect_variable = true;
    let mut prev_was_not = false;
    for tok in &tokens {
        let stripped = tok.trim_matches(|c| c == '(' || c == ')');
        if stripped == "NOT" {
            if tok.contains(')') {
                violations.push(format!(
                    "rule '{}': NOT may not carry a trailing ')'",
                    rule.name
                ));
            }
            if prev_was_not {
                violations.push(format!(
                    "rule '{}': consecutive NOT tokens are not allowed",
                    rule.name
                ));
            }
            prev_was_not = true;
            continue;
        }
        prev_was_not = false;

        if expect_variable {
            if !labels.contains(stripped) {
                violations.push(format!(
                    "rule '{}': expression references undeclared label '{}'",
                    rule.name, stripped
                ));
            } else {
                referenced.insert(stripped.to_string());
            }
            expect_variable = false;
        } else {
            match stripped {
                "AND" | "OR" | "XOR" | "NAND" | "NOR" => {}
                "NOT" => violations.push(format!(
                    "rule '{}': NOT may not appear as a binary operator",
                    rule.name
                )),
                other => violations.push(format!(
                    "rule '{}': expected a boolean operator, found '{}'",
                    rule.name, other
                )),
            }
            expect_variable = true;
        }
    }
    if expect_variable {
        violations.push(format!(
            "rule '{}': expression must end with a variable, not an operator",
            rule.name
        ));
    }

    for label in &labels {
        if !referenced.contains(*label) {
            violations.push(format!(
                "rule '{}': clause label '{}' is never referenced by the expression",
                rule.name, label
            ));
        }
    }
}

/// `(` may appear only as a contiguous prefix and `)` only as a contiguous
/// suffix within a single token, with no stray characters between them.
fn check_token_paren_shape(rule: &Rule, tok: &str) -> Option<String> {
    let prefix_len = tok.chars().take_while(|&c| c == '(').count();
    let suffix_len = tok.chars().rev().take_while(|&c| c == ')').count();
    let middle = &tok[prefix_len..tok.len() - suffix_len];
    if middle.contains('(') || middle.contains(')') {
        return Some(format!(
            "rule '{}': token '{}' has parentheses outside a contiguous prefix/suffix",
            rule.name, tok
        ));
    }
    None
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod validate_tests;
