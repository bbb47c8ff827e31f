//! Engagement Notebook - Rule Core
//!
//! Rule evaluation engine for the penetration-testing notebook: given an
//! engagement's phase and its discovered targets/ports, decide which rules
//! fire and what they suggest.
//!
//! # Architecture
//!
//! ```text
//! rules + engagement + targets (+ selected target)
//!            │
//!            ▼
//!   ┌──────────────────┐     ┌───────────────┐
//!   │ Condition Matcher│────▶│ Pattern Guard │
//!   └────────┬─────────┘     └───────────────┘
//!            ▼
//!   ┌──────────────────┐
//!   │  Rule Evaluator  │──▶ Vec<EvaluatedSuggestion>
//!   └──────────────────┘            │
//!                                   ▼
//!                        ┌────────────────────┐
//!                        │ Suggestion Grouper │──▶ by service
//!                        └────────────────────┘
//! ```

pub mod constants;
pub mod engine;

#[cfg(feature = "client")]
pub mod client;

pub use engine::{evaluate_all, evaluate_rule, group_by_service};
