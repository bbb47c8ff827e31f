//! Condition Matcher
//!
//! Decides whether one condition holds for an engagement and its targets.
//! Never fails: a bad pattern or a value with no leading number is just "no match",
//! so one broken condition cannot abort a whole rule library.

use super::pattern::compile_pattern;
use super::types::*;

// ============================================================================
// SCOPE
// ============================================================================

/// Engagement state a condition is evaluated against.
///
/// With a selected target only that target's ports are considered;
/// otherwise every target in the engagement is.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub engagement: &'a Engagement,
    pub targets: &'a [Target],
    pub selected: Option<&'a Target>,
}

impl<'a> Scope<'a> {
    pub fn new(engagement: &'a Engagement, targets: &'a [Target], selected: Option<&'a Target>) -> Self {
        Self {
            engagement,
            targets,
            selected,
        }
    }

    /// Targets under consideration
    pub fn targets(&self) -> &'a [Target] {
        match self.selected {
            Some(target) => std::slice::from_ref(target),
            None => self.targets,
        }
    }

    /// Ports across the targets under consideration
    pub fn ports(&self) -> impl Iterator<Item = &'a Port> {
        self.targets().iter().flat_map(|t| t.ports.iter())
    }
}

// ============================================================================
// MATCHER TRAIT
// ============================================================================

/// Pluggable condition matching used by the evaluator
pub trait ConditionMatcher: Send + Sync {
    fn matches(&self, condition: &Condition, scope: &Scope<'_>) -> bool;
}

/// Built-in matcher for the five condition kinds
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMatcher;

impl ConditionMatcher for DefaultMatcher {
    fn matches(&self, condition: &Condition, scope: &Scope<'_>) -> bool {
        match condition.kind {
            ConditionKind::ServiceDetected => {
                text_matches(condition, scope, |port| port.service.as_str())
            }
            ConditionKind::VersionMatch => {
                text_matches(condition, scope, |port| port.version.as_str())
            }
            ConditionKind::PortOpen => port_open(condition, scope),
            ConditionKind::PhaseActive => phase_active(condition, scope.engagement),
            ConditionKind::TagPresent => tag_present(condition, scope),
        }
    }
}

/// Evaluate one condition with the default matcher
pub fn condition_matches(
    condition: &Condition,
    engagement: &Engagement,
    targets: &[Target],
    selected: Option<&Target>,
) -> bool {
    DefaultMatcher.matches(condition, &Scope::new(engagement, targets, selected))
}

// ============================================================================
// PER-KIND LOGIC
// ============================================================================

/// service_detected / version_match: compare a text attribute of each port
fn text_matches<F>(condition: &Condition, scope: &Scope<'_>, attribute: F) -> bool
where
    F: Fn(&Port) -> &str,
{
    match condition.operator {
        Operator::Equals => {
            let wanted = condition.value.to_lowercase();
            scope.ports().any(|port| attribute(port).to_lowercase() == wanted)
        }
        Operator::Contains => {
            let wanted = condition.value.to_lowercase();
            scope.ports().any(|port| attribute(port).to_lowercase().contains(&wanted))
        }
        Operator::Matches => {
            // compiled once per evaluation, not per port
            let Some(regex) = compile_pattern(&condition.value) else {
                return false;
            };
            scope.ports().any(|port| regex.is_match(&attribute(port).to_lowercase()))
        }
        Operator::GreaterThan | Operator::LessThan => false,
    }
}

fn port_open(condition: &Condition, scope: &Scope<'_>) -> bool {
    let Some(wanted) = leading_integer(&condition.value) else {
        return false;
    };

    scope
        .ports()
        .filter(|port| port.status.is_open())
        .any(|port| {
            let number = i64::from(port.port);
            match condition.operator {
                Operator::Equals => number == wanted,
                Operator::GreaterThan => number > wanted,
                Operator::LessThan => number < wanted,
                Operator::Contains | Operator::Matches => false,
            }
        })
}

/// Leading base-10 integer after optional whitespace and sign, so `"22/tcp"`
/// reads as 22. `None` when no digit follows.
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let magnitude = rest[..end].bytes().fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
    });
    Some(if negative { -magnitude } else { magnitude })
}

/// Only `equals` is meaningful; this repeats the rule-level phase gate
fn phase_active(condition: &Condition, engagement: &Engagement) -> bool {
    match condition.operator {
        Operator::Equals => engagement.phase == condition.value,
        _ => false,
    }
}

/// No tag field exists on ports, so this probes service and version text
fn tag_present(condition: &Condition, scope: &Scope<'_>) -> bool {
    match condition.operator {
        Operator::Equals | Operator::Contains => {
            let tag = condition.value.to_lowercase();
            scope.ports().any(|port| {
                port.service.to_lowercase().contains(&tag)
                    || port.version.to_lowercase().contains(&tag)
            })
        }
        _ => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn engagement(phase: &str) -> Engagement {
        Engagement {
            id: "e1".to_string(),
            name: "ACME external".to_string(),
            phase: phase.to_string(),
            status: EngagementStatus::Active,
        }
    }

    fn target(id: &str, ports: Vec<Port>) -> Target {
        let mut target = Target::new(id, "10.0.0.1");
        for port in ports {
            target.add_port(port);
        }
        target
    }

    fn lab() -> Vec<Target> {
        vec![
            target("web", vec![
                Port::new(80, "HTTP", "Apache httpd 2.4.41", PortStatus::Open),
                Port::new(8443, "https-alt", "Jetty 9.4", PortStatus::Filtered),
            ]),
            target("jump", vec![
                Port::new(22, "ssh", "OpenSSH 8.2p1 Ubuntu", PortStatus::Open),
            ]),
        ]
    }

    fn check(condition: Condition, targets: &[Target], selected: Option<&Target>) -> bool {
        condition_matches(&condition, &engagement("enumeration"), targets, selected)
    }

    #[test]
    fn test_service_equals_is_case_folded() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::ServiceDetected, Operator::Equals, "http"), &targets, None));
        assert!(check(Condition::new(ConditionKind::ServiceDetected, Operator::Equals, "SSH"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::Equals, "htt"), &targets, None));
    }

    #[test]
    fn test_service_contains_and_matches() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::ServiceDetected, Operator::Contains, "alt"), &targets, None));
        assert!(check(Condition::new(ConditionKind::ServiceDetected, Operator::Matches, "^HTTPS?-"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::Matches, "^ftp"), &targets, None));
    }

    #[test]
    fn test_service_numeric_operators_never_match() {
        let targets = lab();
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::GreaterThan, "a"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::VersionMatch, Operator::LessThan, "z"), &targets, None));
    }

    #[test]
    fn test_selected_target_narrows_scope() {
        let targets = lab();
        let ssh = Condition::new(ConditionKind::ServiceDetected, Operator::Equals, "ssh");
        assert!(check(ssh.clone(), &targets, None));
        assert!(check(ssh.clone(), &targets, Some(&targets[1])));
        assert!(!check(ssh, &targets, Some(&targets[0])));
    }

    #[test]
    fn test_port_open_requires_open_status() {
        let targets = vec![target("t", vec![Port::new(22, "ssh", "OpenSSH 8.2p1", PortStatus::Filtered)])];
        assert!(!check(Condition::new(ConditionKind::PortOpen, Operator::Equals, "22"), &targets, None));
    }

    #[test]
    fn test_port_open_comparisons() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::PortOpen, Operator::Equals, " 80 "), &targets, None));
        assert!(check(Condition::new(ConditionKind::PortOpen, Operator::GreaterThan, "79"), &targets, None));
        assert!(check(Condition::new(ConditionKind::PortOpen, Operator::LessThan, "23"), &targets, None));
        // 8443 is filtered, so nothing open sits above 1024
        assert!(!check(Condition::new(ConditionKind::PortOpen, Operator::GreaterThan, "1024"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::PortOpen, Operator::Contains, "80"), &targets, None));
    }

    #[test]
    fn test_port_open_reads_leading_integer() {
        let targets = lab();
        for value in ["22/tcp", "22abc", "22.0", " +22 ", "022"] {
            assert!(
                check(Condition::new(ConditionKind::PortOpen, Operator::Equals, value), &targets, None),
                "{value:?} should read as 22"
            );
        }
        assert!(check(Condition::new(ConditionKind::PortOpen, Operator::GreaterThan, "79.9"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::PortOpen, Operator::LessThan, "-1"), &targets, None));
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("443/tcp"), Some(443));
        assert_eq!(leading_integer("  -7x"), Some(-7));
        assert_eq!(leading_integer("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(leading_integer("x22"), None);
        assert_eq!(leading_integer("+"), None);
    }

    #[test]
    fn test_port_open_unparsable_value() {
        let targets = lab();
        for value in ["", "  ", "http", "-", "+tcp", "/22"] {
            for operator in [Operator::Equals, Operator::GreaterThan, Operator::LessThan] {
                assert!(!check(Condition::new(ConditionKind::PortOpen, operator, value), &targets, None));
            }
        }
    }

    #[test]
    fn test_version_match() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::VersionMatch, Operator::Equals, "openssh 8.2p1 ubuntu"), &targets, None));
        assert!(check(Condition::new(ConditionKind::VersionMatch, Operator::Contains, "2.4.41"), &targets, None));
        assert!(check(Condition::new(ConditionKind::VersionMatch, Operator::Matches, r"openssh [0-7]\.|openssh 8\.[0-2]"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::VersionMatch, Operator::Equals, "openssh"), &targets, None));
    }

    #[test]
    fn test_phase_active_only_equals() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::PhaseActive, Operator::Equals, "enumeration"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::PhaseActive, Operator::Equals, "Enumeration"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::PhaseActive, Operator::Contains, "enum"), &targets, None));
    }

    #[test]
    fn test_tag_present_probes_service_and_version() {
        let targets = lab();
        assert!(check(Condition::new(ConditionKind::TagPresent, Operator::Equals, "ubuntu"), &targets, None));
        assert!(check(Condition::new(ConditionKind::TagPresent, Operator::Contains, "APACHE"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::TagPresent, Operator::Matches, "apache"), &targets, None));
        assert!(!check(Condition::new(ConditionKind::TagPresent, Operator::Equals, "windows"), &targets, None));
    }

    #[test]
    fn test_matches_rejects_oversized_and_catastrophic_patterns() {
        let targets = vec![target("t", vec![Port::new(80, "aaaaaaaaaaaaaaaaaaaaaaaaaaaa", "", PortStatus::Open)])];
        let long = "a".repeat(101);
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::Matches, &long), &targets, None));
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::Matches, "(a+)+$"), &targets, None));
    }

    #[test]
    fn test_no_targets_never_matches_port_conditions() {
        let targets: Vec<Target> = Vec::new();
        assert!(!check(Condition::new(ConditionKind::ServiceDetected, Operator::Contains, ""), &targets, None));
        assert!(!check(Condition::new(ConditionKind::TagPresent, Operator::Contains, ""), &targets, None));
    }
}
