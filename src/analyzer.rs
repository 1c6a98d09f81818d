//! C6 — Analyzer Facade. Selects candidate rules by platform/change-type/
//! result-type, invokes the expression (or implicit-AND) evaluator per rule,
//! and reports matches (spec.md §4.6).

use crate::clause::{self, Collation};
use crate::errors::{Error, ErrorKind};
use crate::expr::{self, ClauseCache};
use crate::model::{CompareResult, MatchedRule, Platform, Rule, RuleFile};
use crate::validate;
use std::path::Path;
use std::sync::Arc;

/// Where a rule file comes from. I/O or parse failures degrade to an empty
/// rule file rather than failing construction (spec.md §6 "Loading").
pub enum RuleSource<'a> {
    /// Bundled default ruleset, baked into the binary via `include_str!`.
    Embedded(&'a str),
    Path(&'a Path),
}

pub struct Analyzer {
    platform: Platform,
    rules: Arc<RuleFile>,
    cache: ClauseCache,
    collation: Collation,
}

impl Analyzer {
    pub fn new(platform: Platform, source: RuleSource<'_>) -> Self {
        let rules = match load_rule_file(source) {
            Ok(rules) => rules,
            Err(err) => {
                tracing::error!(error = %err, "failed to load rule file; continuing with an empty rule set");
                RuleFile::default()
            }
        };
        Analyzer {
            platform,
            rules: Arc::new(rules),
            cache: ClauseCache::new(),
            collation: Collation::default(),
        }
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }

    /// Step-by-step per spec.md §4.6. `result.analysis` is reset to `NONE` in
    /// step 1 and never reassigned afterward — spec.md §3 is explicit that
    /// "the engine never combines verdicts, it only reports which rules
    /// matched"; per-rule verdicts live only on each `MatchedRule`.
    pub fn analyze(&self, result: &mut CompareResult) -> Result<Vec<MatchedRule>, Error> {
        result.analysis = crate::model::Verdict::None;
        result.matched_rules.clear();

        let candidates: Vec<(usize, &Rule)> = self
            .rules
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| self.is_candidate(rule, result))
            .collect();

        for (rule_index, rule) in candidates {
            let matched = if let Some(_expr) = &rule.expression {
                expr::evaluate(rule, rule_index, result, self.collation, &self.cache)
            } else {
                rule.clauses
                    .iter()
                    .all(|c| clause::analyze_clause(c, result, self.collation))
            };
            if matched {
                result.matched_rules.push(MatchedRule {
                    rule_name: rule.name.clone(),
                    verdict: rule.verdict,
                    matched_clause_labels: rule
                        .clauses
                        .iter()
                        .filter_map(|c| c.label.clone())
                        .collect(),
                });
            }
        }

        self.cache.evict(result.id);
        Ok(result.matched_rules.clone())
    }

    fn is_candidate(&self, rule: &Rule, result: &CompareResult) -> bool {
        rule.result_type == result.result_type
            && rule
                .platforms
                .as_ref()
                .map_or(true, |p| p.contains(&self.platform))
            && rule
                .change_types
                .as_ref()
                .map_or(true, |c| c.contains(&result.change_type))
    }

    pub fn verify_rules(&self) -> Vec<String> {
        validate::verify_rules(&self.rules)
    }

    pub fn rule_file(&self) -> &RuleFile {
        &self.rules
    }
}

fn load_rule_file(source: RuleSource<'_>) -> Result<RuleFile, Error> {
    let content = match source {
        RuleSource::Embedded(s) => s.to_string(),
        RuleSource::Path(path) => std::fs::read_to_string(path)?,
    };
    parse_rule_file(&content)
}

pub fn parse_rule_file(content: &str) -> Result<RuleFile, Error> {
    serde_json::from_str(content).map_err(|e| Error::new(ErrorKind::JsonError(e)))
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod analyzer_tests;
