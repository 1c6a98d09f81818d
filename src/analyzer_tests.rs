use super::*;
use crate::model::{ChangeType, Clause, Operation, Rule, Verdict};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;

fn file_map(name: &str) -> Value {
    let mut m = IndexMap::new();
    m.insert("name".to_string(), Value::Str(name.to_string()));
    Value::Map(m)
}

fn rule_file_with(rules: Vec<Rule>) -> RuleFile {
    RuleFile {
        default_verdicts: IndexMap::new(),
        rules,
    }
}

fn empty_clause_rule(name: &str, result_type: &str) -> Rule {
    Rule {
        name: name.to_string(),
        description: String::new(),
        verdict: Verdict::Information,
        result_type: result_type.into(),
        platforms: None,
        change_types: None,
        clauses: vec![],
        expression: None,
    }
}

#[test]
fn empty_clause_list_matches_every_candidate() {
    let json = serde_json::to_string(&rule_file_with(vec![empty_clause_rule("always", "File")])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    let matched = analyzer.analyze(&mut result).unwrap();
    assert_eq!(matched.len(), 1);
    // spec.md §3: the engine never combines verdicts into `analysis` — it
    // stays NONE regardless of which rules matched; per-rule verdicts live
    // on each `MatchedRule` instead.
    assert_eq!(result.analysis, Verdict::None);
}

#[test]
fn candidate_filtering_excludes_wrong_result_type() {
    let json =
        serde_json::to_string(&rule_file_with(vec![empty_clause_rule("only-service", "Service")])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    let matched = analyzer.analyze(&mut result).unwrap();
    assert!(matched.is_empty());
}

#[test]
fn candidate_filtering_excludes_wrong_platform() {
    let mut rule = empty_clause_rule("windows-only", "File");
    rule.platforms = Some(HashSet::from([Platform::Windows]));
    let json = serde_json::to_string(&rule_file_with(vec![rule])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    assert!(analyzer.analyze(&mut result).unwrap().is_empty());
}

#[test]
fn candidate_filtering_excludes_wrong_change_type() {
    let mut rule = empty_clause_rule("created-only", "File");
    rule.change_types = Some(HashSet::from([ChangeType::Created]));
    let json = serde_json::to_string(&rule_file_with(vec![rule])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Deleted, Some(file_map("x")), None);
    assert!(analyzer.analyze(&mut result).unwrap().is_empty());
}

#[test]
fn implicit_and_requires_every_clause() {
    let mut rule = empty_clause_rule("implicit-and", "File");
    rule.clauses = vec![
        Clause {
            field: "name".to_string(),
            operation: Operation::Eq,
            data: Some(vec!["x".to_string()]),
            dict_data: None,
            label: None,
        },
        Clause {
            field: "name".to_string(),
            operation: Operation::Eq,
            data: Some(vec!["y".to_string()]),
            dict_data: None,
            label: None,
        },
    ];
    let json = serde_json::to_string(&rule_file_with(vec![rule])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    assert!(analyzer.analyze(&mut result).unwrap().is_empty());
}

#[test]
fn analyze_resets_analysis_and_matched_rules_each_call() {
    let json = serde_json::to_string(&rule_file_with(vec![empty_clause_rule("always", "File")])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    analyzer.analyze(&mut result).unwrap();
    assert_eq!(result.matched_rules.len(), 1);
    analyzer.analyze(&mut result).unwrap();
    assert_eq!(result.matched_rules.len(), 1, "re-analyzing must not accumulate matches");
}

#[test]
fn malformed_rule_file_degrades_to_empty_ruleset() {
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded("not json"));
    assert!(analyzer.rule_file().rules.is_empty());
    let mut result = CompareResult::new("File", ChangeType::Created, None, Some(file_map("x")));
    assert!(analyzer.analyze(&mut result).unwrap().is_empty());
}

#[test]
fn verify_rules_reports_validator_violations() {
    let mut rule = empty_clause_rule("bad", "File");
    rule.clauses = vec![Clause {
        field: "name".to_string(),
        operation: Operation::DoesNotContain,
        data: Some(vec!["x".to_string()]),
        dict_data: None,
        label: None,
    }];
    let json = serde_json::to_string(&rule_file_with(vec![rule])).unwrap();
    let analyzer = Analyzer::new(Platform::Linux, RuleSource::Embedded(&json));
    let violations = analyzer.verify_rules();
    assert!(!violations.is_empty());
}
