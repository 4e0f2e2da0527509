//! Topic normalisation.
//!
//! A topic maps to a variant name by classifying it (singular, class-cased)
//! and appending the base type's suffix: `"businesses"` and `"business"`
//! both become `BusinessConversation`.

use inflector::cases::pascalcase::to_pascal_case;
use inflector::cases::snakecase::to_snake_case;
use inflector::string::singularize::to_singular;

/// Returns true if the topic is absent, empty or whitespace only.
#[must_use]
pub fn is_blank(topic: Option<&str>) -> bool {
    topic.is_none_or(|t| t.trim().is_empty())
}

/// Converts a name to singular class case.
///
/// Anything up to the last `.` is dropped, words are split on separators
/// and case boundaries, and the final word is singularised.
#[must_use]
pub fn classify(name: &str) -> String {
    let name = name.rsplit('.').next().unwrap_or(name);
    // Singular rules only match lowercase words.
    let words = to_snake_case(name.trim());
    let singular = match words.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", to_singular(last)),
        None => to_singular(&words),
    };
    to_pascal_case(&singular)
}

/// Derives the variant name that owns `topic`.
#[must_use]
pub fn derive_key(topic: &str, suffix: &str) -> String {
    format!("{}{suffix}", classify(topic))
}
