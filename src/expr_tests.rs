use super::*;
use crate::model::{ChangeType, Clause, CompareResult, Operation};
use crate::value::Value;
use indexmap::IndexMap;

fn scalar_clause(label: &str, field: &str, expect: &str) -> Clause {
    Clause {
        field: field.to_string(),
        operation: Operation::Eq,
        data: Some(vec![expect.to_string()]),
        dict_data: None,
        label: Some(label.to_string()),
    }
}

/// Builds a rule whose clause `A` is true, `B` is false, `C` is false — the
/// fixture used by spec.md §8 scenario S4/S5.
fn abc_rule(expression: &str) -> Rule {
    Rule {
        name: "abc".to_string(),
        description: String::new(),
        verdict: crate::model::Verdict::Warning,
        result_type: "File".into(),
        platforms: None,
        change_types: None,
        clauses: vec![
            scalar_clause("A", "a", "yes"),
            scalar_clause("B", "b", "yes"),
            scalar_clause("C", "c", "yes"),
        ],
        expression: Some(expression.to_string()),
    }
}

fn abc_result() -> CompareResult {
    let mut m = IndexMap::new();
    m.insert("a".to_string(), Value::Str("yes".into()));
    m.insert("b".to_string(), Value::Str("no".into()));
    m.insert("c".to_string(), Value::Str("no".into()));
    CompareResult::new("File", ChangeType::Created, None, Some(Value::Map(m)))
}

#[test]
fn s4_expression_combinations() {
    let result = abc_result();
    let cache = ClauseCache::new();

    let rule = abc_rule("A AND (B OR NOT C)");
    assert!(evaluate(&rule, 0, &result, Collation::Ordinal, &cache));

    let rule = abc_rule("A AND B");
    assert!(!evaluate(&rule, 1, &result, Collation::Ordinal, &cache));

    let rule = abc_rule("NOT A OR B");
    assert!(!evaluate(&rule, 2, &result, Collation::Ordinal, &cache));
}

#[test]
fn s5_short_circuit_skips_clause_evaluation() {
    let result = abc_result();
    let cache = ClauseCache::new();
    // A is false here (field "a" does not equal "nope"), so "A AND B" must
    // short-circuit without ever looking at B.
    let mut rule = abc_rule("A AND B");
    rule.clauses[0] = scalar_clause("A", "a", "nope");
    assert!(!evaluate(&rule, 3, &result, Collation::Ordinal, &cache));
    // The cache should hold an entry for A (evaluated) but not for B (skipped).
    let a_key = (result.id, ClauseId { rule_index: 3, clause_index: 0 });
    let b_key = (result.id, ClauseId { rule_index: 3, clause_index: 1 });
    assert!(cache.inner.read().unwrap().contains_key(&a_key));
    assert!(!cache.inner.read().unwrap().contains_key(&b_key));
}

#[test]
fn unresolvable_label_short_circuits_whole_expression_to_false() {
    let result = abc_result();
    let cache = ClauseCache::new();
    let rule = abc_rule("A AND Z");
    assert!(!evaluate(&rule, 4, &result, Collation::Ordinal, &cache));
}

#[test]
fn unresolvable_label_fails_whole_expression_even_when_a_later_atom_would_be_true() {
    // "Z OR A" with A=true: a naive local-scope falsification of Z would
    // combine as `false OR true = true`. spec.md §4.4 requires the
    // unresolved label to fail the *entire* expression, so this must be
    // false regardless of A's value or where Z sits in the token stream.
    let result = abc_result();
    let cache = ClauseCache::new();
    let rule = abc_rule("Z OR A");
    assert!(!evaluate(&rule, 8, &result, Collation::Ordinal, &cache));

    let rule = abc_rule("A OR (B OR Z)");
    assert!(!evaluate(&rule, 9, &result, Collation::Ordinal, &cache));
}

#[test]
fn memoization_is_stable_across_repeated_calls() {
    let result = abc_result();
    let cache = ClauseCache::new();
    let rule = abc_rule("A AND (B OR NOT C)");
    let first = evaluate(&rule, 5, &result, Collation::Ordinal, &cache);
    let second = evaluate(&rule, 5, &result, Collation::Ordinal, &cache);
    assert_eq!(first, second);
}

#[test]
fn clear_cache_for_result_does_not_change_future_results() {
    let result = abc_result();
    let cache = ClauseCache::new();
    let rule = abc_rule("A AND (B OR NOT C)");
    let before = evaluate(&rule, 6, &result, Collation::Ordinal, &cache);
    cache.evict(result.id);
    let after = evaluate(&rule, 6, &result, Collation::Ordinal, &cache);
    assert_eq!(before, after);
}

#[test]
fn deeply_nested_groups_evaluate_left_to_right_flat() {
    let result = abc_result();
    let cache = ClauseCache::new();
    // ((A AND B) OR C) with A=true,B=false,C=false -> (true AND false) OR false -> false
    let rule = abc_rule("((A AND B) OR C)");
    assert!(!evaluate(&rule, 7, &result, Collation::Ordinal, &cache));
}

#[test]
fn xor_nand_nor_truth_table() {
    assert!(operate(BoolOp::Xor, true, false));
    assert!(!operate(BoolOp::Xor, true, true));
    assert!(!operate(BoolOp::Nand, true, true));
    assert!(operate(BoolOp::Nand, true, false));
    assert!(operate(BoolOp::Nor, false, false));
    assert!(!operate(BoolOp::Nor, true, false));
}
