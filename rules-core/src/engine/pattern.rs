//! Pattern Guard
//!
//! Compilation and matching for the `matches` operator.
//!
//! Patterns come from user-authored rules, so every compile goes through
//! three gates: a length cap, a reject-list of backtracking shapes, and a
//! size-bounded `RegexBuilder`. The `regex` engine itself never backtracks
//! and matches in time linear in the haystack, so a pattern that gets past
//! the gates still cannot stall the evaluator.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::constants::{MAX_PATTERN_LENGTH, REGEX_DFA_SIZE_LIMIT, REGEX_SIZE_LIMIT};

/// Characters of a rejected pattern echoed into the log
const LOG_PREVIEW_CHARS: usize = 50;

/// Shapes that blow up backtracking engines. Rules carrying them are
/// rejected so they behave the same wherever the rule library is evaluated.
static DANGEROUS_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // quantifier directly followed by `+` (`a++`, `a*+`, `a+ +`)
        r"[+*{]\s*\+",
        // `(++` / `++)`
        r"\(\+\+|\+\+\)",
        // open-ended repetition followed by `+`
        r"\{\d+,\}\s*\+",
        // quantified group that itself ends in a quantifier: `(a+)+`, `(\w*){2,}`
        r"\([^()]*[+*}]\)\s*[+*{]",
    ]
    .iter()
    .map(|shape| Regex::new(shape).expect("static pattern guard shape"))
    .collect()
});

// ============================================================================
// PUBLIC API
// ============================================================================

/// Why a pattern was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternRejection {
    TooLong,
    DangerousShape,
    Invalid,
}

/// Run the gates and compile `pattern` case-insensitively
pub fn check_pattern(pattern: &str) -> Result<Regex, PatternRejection> {
    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return Err(PatternRejection::TooLong);
    }

    if DANGEROUS_SHAPES.iter().any(|shape| shape.is_match(pattern)) {
        return Err(PatternRejection::DangerousShape);
    }

    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_DFA_SIZE_LIMIT)
        .build()
        .map_err(|_| PatternRejection::Invalid)
}

/// Compile a rule pattern, logging and swallowing any rejection
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    match check_pattern(pattern) {
        Ok(regex) => Some(regex),
        Err(reason) => {
            tracing::warn!(
                ?reason,
                pattern = %preview(pattern),
                "Rejected rule pattern"
            );
            None
        }
    }
}

/// One-shot test of `text` against a rule pattern. Rejected patterns never match.
pub fn safe_regex_test(pattern: &str, text: &str) -> bool {
    compile_pattern(pattern)
        .map(|regex| regex.is_match(text))
        .unwrap_or(false)
}

fn preview(pattern: &str) -> String {
    pattern.chars().take(LOG_PREVIEW_CHARS).collect()
}

// ============================================================================
// TESTS
// ============================================================================
