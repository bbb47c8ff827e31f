//! Suggestion Grouper
//!
//! Partitions evaluated suggestions by inferred service for display.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::types::EvaluatedSuggestion;
use crate::constants::OTHER_SERVICE;

/// Suggestions keyed by case-folded service
pub type GroupedSuggestions = BTreeMap<String, Vec<EvaluatedSuggestion>>;

/// Group by service (missing service goes to `"other"`), then order each
/// group high -> medium -> low. Equal confidence keeps input order.
pub fn group_by_service(suggestions: &[EvaluatedSuggestion]) -> GroupedSuggestions {
    let mut grouped = GroupedSuggestions::new();

    for suggestion in suggestions {
        let key = suggestion
            .service
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| OTHER_SERVICE.to_string());
        grouped.entry(key).or_default().push(suggestion.clone());
    }

    for group in grouped.values_mut() {
        // sort_by_key is stable
        group.sort_by_key(|s| Reverse(s.confidence().rank()));
    }

    grouped
}

// ============================================================================
// TESTS
// ============================================================================
