//! Engine Types
//!
//! Data model shared by the matcher, evaluator and grouper.
//! No evaluation logic here - only data structures and small accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// ENGAGEMENT
// ============================================================================

/// Lifecycle status of an engagement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    Active,
    Completed,
    Paused,
}

/// A penetration-testing project. `phase` is free-form and gates every rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub id: String,
    pub name: String,
    pub phase: String,
    pub status: EngagementStatus,
}

// ============================================================================
// PORTS & TARGETS
// ============================================================================

/// Observed state of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortStatus {
    Open,
    Closed,
    Filtered,
}

impl PortStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortStatus::Open => "open",
            PortStatus::Closed => "closed",
            PortStatus::Filtered => "filtered",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PortStatus::Open)
    }
}

/// One network service observation on a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub port: u16,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub version: String,
    pub status: PortStatus,
}

impl Port {
    pub fn new(port: u16, service: &str, version: &str, status: PortStatus) -> Self {
        Self {
            port,
            service: service.to_string(),
            version: version.to_string(),
            status,
        }
    }
}

/// A scoped host under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub in_scope: bool,
    #[serde(default)]
    pub discovered_during_recon: bool,
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Target {
    pub fn new(id: &str, ip: &str) -> Self {
        Self {
            id: id.to_string(),
            ip: ip.to_string(),
            label: None,
            in_scope: true,
            discovered_during_recon: false,
            ports: Vec::new(),
        }
    }

    pub fn has_port(&self, number: u16) -> bool {
        self.ports.iter().any(|p| p.port == number)
    }

    /// Append a port. Port numbers are unique per target, so a duplicate
    /// number leaves the target untouched and returns `false`.
    pub fn add_port(&mut self, port: Port) -> bool {
        if self.has_port(port.port) {
            return false;
        }
        self.ports.push(port);
        true
    }

    pub fn open_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.status.is_open())
    }
}

// ============================================================================
// CONDITIONS
// ============================================================================

/// What a condition inspects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    ServiceDetected,
    PortOpen,
    VersionMatch,
    PhaseActive,
    TagPresent,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::ServiceDetected => "service_detected",
            ConditionKind::PortOpen => "port_open",
            ConditionKind::VersionMatch => "version_match",
            ConditionKind::PhaseActive => "phase_active",
            ConditionKind::TagPresent => "tag_present",
        }
    }
}

/// Comparison applied to `Condition::value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    Contains,
    Matches,
    GreaterThan,
    LessThan,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::Contains => "contains",
            Operator::Matches => "matches",
            Operator::GreaterThan => "greater_than",
            Operator::LessThan => "less_than",
        }
    }
}

/// One predicate over engagement/target state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// Informational only, never interpreted
    #[serde(default)]
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(kind: ConditionKind, operator: Operator, value: &str) -> Self {
        Self {
            kind,
            field: String::new(),
            operator,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// SUGGESTIONS
// ============================================================================

/// Ordinal confidence of a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Fixed ranking used when ordering a service group
    pub fn rank(&self) -> u8 {
        match self {
            Confidence::High => 3,
            Confidence::Medium => 2,
            Confidence::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Authored next action attached to a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owasp_tag: Option<String>,
    /// Command templates; placeholders are substituted by the consumer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
}

/// Suggestion stamped with the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedSuggestion {
    #[serde(flatten)]
    pub suggestion: Suggestion,
    pub rule_id: String,
    pub rule_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl EvaluatedSuggestion {
    pub fn confidence(&self) -> Confidence {
        self.suggestion.confidence
    }
}

// ============================================================================
// RULES
// ============================================================================

/// Declarative, phase-gated trigger. All conditions must hold (AND).
///
/// Missing or null `phase`, `enabled` or collections deserialize to
/// empty/false so a half-authored rule reaches the evaluator and simply never
/// fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phase: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Enabled rule with no conditions and no suggestions
    pub fn new(id: &str, name: &str, phase: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            phase: phase.to_string(),
            enabled: true,
            tags: Vec::new(),
            conditions: Vec::new(),
            suggestions: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

/// Stored drafts carry explicit nulls; treat them like absent fields
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// TESTS
// ============================================================================
