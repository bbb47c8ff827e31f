//! Rule Evaluator
//!
//! Input: rules + engagement + targets (+ optional selected target)
//! Output: flat list of EvaluatedSuggestion, rules in input order and
//! suggestions in authored order. No re-ranking happens here.

use super::matcher::{ConditionMatcher, DefaultMatcher, Scope};
use super::types::*;

// ============================================================================
// EVALUATOR
// ============================================================================

/// Rule evaluator over a pluggable condition matcher
#[derive(Debug, Clone, Default)]
pub struct Evaluator<M = DefaultMatcher> {
    matcher: M,
}

impl<M: ConditionMatcher> Evaluator<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Gate on enabled + phase, then require every condition (AND).
    /// Conditions are not looked at when a gate fails.
    pub fn evaluate_rule(&self, rule: &Rule, scope: &Scope<'_>) -> bool {
        if !rule.enabled {
            return false;
        }
        if rule.phase.is_empty() || rule.phase != scope.engagement.phase {
            return false;
        }

        rule.conditions
            .iter()
            .all(|condition| self.matcher.matches(condition, scope))
    }

    /// Suggestions of every firing rule, stamped with provenance
    pub fn evaluate_all(&self, rules: &[Rule], scope: &Scope<'_>) -> Vec<EvaluatedSuggestion> {
        let mut suggestions = Vec::new();
        let mut fired = 0usize;

        for rule in rules {
            if !self.evaluate_rule(rule, scope) {
                continue;
            }
            fired += 1;

            let service = inferred_service(rule);
            suggestions.extend(rule.suggestions.iter().map(|suggestion| EvaluatedSuggestion {
                suggestion: suggestion.clone(),
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                service: service.clone(),
            }));
        }

        tracing::debug!(
            rules = rules.len(),
            fired,
            suggestions = suggestions.len(),
            phase = %scope.engagement.phase,
            "Rule evaluation complete"
        );

        suggestions
    }
}

/// Service of the first `service_detected` condition, case-folded
fn inferred_service(rule: &Rule) -> Option<String> {
    rule.conditions
        .iter()
        .find(|c| c.kind == ConditionKind::ServiceDetected)
        .map(|c| c.value.to_lowercase())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// FREE FUNCTIONS (default matcher)
// ============================================================================

/// Does `rule` fire for this engagement state?
pub fn evaluate_rule(
    rule: &Rule,
    engagement: &Engagement,
    targets: &[Target],
    selected: Option<&Target>,
) -> bool {
    Evaluator::<DefaultMatcher>::default().evaluate_rule(rule, &Scope::new(engagement, targets, selected))
}

/// Evaluate a rule library against an engagement
pub fn evaluate_all(
    rules: &[Rule],
    engagement: &Engagement,
    targets: &[Target],
    selected: Option<&Target>,
) -> Vec<EvaluatedSuggestion> {
    Evaluator::<DefaultMatcher>::default().evaluate_all(rules, &Scope::new(engagement, targets, selected))
}

// ============================================================================
// TESTS
// ============================================================================
