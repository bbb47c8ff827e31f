//! Rule Engine
//!
//! Decides which rules of a library fire for an engagement and what they
//! suggest. Pure and synchronous: no I/O, no shared state, no caching.
//!
//! ## Structure
//! - `types`: Data model (Engagement, Target, Rule, Condition, ...)
//! - `pattern`: Hardened regex for the `matches` operator
//! - `matcher`: Condition matching
//! - `evaluator`: Phase/enabled gates + AND of conditions
//! - `grouping`: Service grouping and confidence ordering
//!
//! ## Usage
//! ```ignore
//! use rules_core::engine::{evaluate_all, group_by_service};
//!
//! let suggestions = evaluate_all(&rules, &engagement, &targets, None);
//! for (service, group) in group_by_service(&suggestions) {
//!     println!("{service}: {} suggestions", group.len());
//! }
//! ```

pub mod types;
pub mod pattern;
pub mod matcher;
pub mod evaluator;
pub mod grouping;

// Re-export main types for convenience
pub use types::{
    Condition,
    ConditionKind,
    Confidence,
    Engagement,
    EngagementStatus,
    EvaluatedSuggestion,
    Operator,
    Port,
    PortStatus,
    Rule,
    Suggestion,
    Target,
};

pub use pattern::{check_pattern, compile_pattern, safe_regex_test, PatternRejection};

pub use matcher::{condition_matches, ConditionMatcher, DefaultMatcher, Scope};

pub use evaluator::{evaluate_all, evaluate_rule, Evaluator};

pub use grouping::{group_by_service, GroupedSuggestions};
