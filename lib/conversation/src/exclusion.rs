//! Exclusion rules.
//!
//! An exclusion keeps a registered variant from being picked when a topic
//! is resolved, unless the caller explicitly asks for excluded variants.
//! Rules can be given as a variant, a name pattern, a symbolic name, or a
//! flat list of those.

use crate::error::RegistryError;
use crate::topic::{classify, derive_key};
use crate::variant::{HandlerCatalog, HandlerVariant};
use parley_core::Result;
use regex::Regex;
use serde_json::Value as JsonValue;

/// A predicate over handler variants.
#[derive(Debug, Clone)]
pub enum ExclusionRule {
    /// Matches exactly this variant.
    Variant(HandlerVariant),
    /// Matches variants whose name matches the pattern.
    Pattern(Regex),
    /// Matches the variant this name resolves to in the catalog.
    Name(String),
    /// Matches if any member matches. Members cannot be lists themselves.
    AnyOf(Vec<ExclusionRule>),
}

impl ExclusionRule {
    /// Creates a pattern rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the pattern does not compile.
    pub fn pattern(pattern: &str) -> Result<Self, RegistryError> {
        Regex::new(pattern).map(Self::Pattern).map_err(|e| {
            RegistryError::InvalidConfiguration {
                reason: format!("exclusion pattern {pattern:?} is invalid: {e}"),
            }
            .into()
        })
    }

    /// Creates a symbolic name rule, e.g. `"abstract"` or `"abstract_conversation"`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Creates a list rule.
    #[must_use]
    pub fn any_of(rules: impl IntoIterator<Item = ExclusionRule>) -> Self {
        Self::AnyOf(rules.into_iter().collect())
    }

    /// Parses a rule from a configuration value.
    ///
    /// Accepted shapes are a name string, `{ "pattern": "..." }`, a list of
    /// those, or null to clear the exclusion.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for any other shape.
    pub fn from_value(value: &JsonValue) -> Result<Option<Self>, RegistryError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Array(items) => items
                .iter()
                .map(Self::member_from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(|rules| Some(Self::AnyOf(rules))),
            other => Self::member_from_value(other).map(Some),
        }
    }

    fn member_from_value(value: &JsonValue) -> Result<Self, RegistryError> {
        match value {
            JsonValue::String(name) => Ok(Self::name(name.clone())),
            JsonValue::Object(map) if map.len() == 1 => match map.get("pattern") {
                Some(JsonValue::String(pattern)) => Self::pattern(pattern),
                _ => Err(invalid_shape(value)),
            },
            _ => Err(invalid_shape(value)),
        }
    }

    /// Checks the rule's shape.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if a list contains another list.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if let Self::AnyOf(rules) = self {
            if rules.iter().any(|rule| matches!(rule, Self::AnyOf(_))) {
                return Err(RegistryError::InvalidConfiguration {
                    reason: "exclusion lists cannot contain other lists".to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Returns true if the rule matches `variant`.
    ///
    /// Names are looked up in `catalog`, first as given (class-cased) and
    /// then as a topic with `suffix` appended. A name that resolves to
    /// nothing matches nothing.
    #[must_use]
    pub fn matches(&self, variant: &HandlerVariant, catalog: &HandlerCatalog, suffix: &str) -> bool {
        match self {
            Self::Variant(excluded) => excluded == variant,
            Self::Pattern(pattern) => pattern.is_match(variant.name()),
            Self::Name(name) => [classify(name), derive_key(name, suffix)]
                .iter()
                .any(|candidate| catalog.get(candidate) == Some(variant)),
            Self::AnyOf(rules) => rules
                .iter()
                .any(|rule| rule.matches(variant, catalog, suffix)),
        }
    }
}

impl From<HandlerVariant> for ExclusionRule {
    fn from(variant: HandlerVariant) -> Self {
        Self::Variant(variant)
    }
}

impl From<Regex> for ExclusionRule {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

impl From<Vec<HandlerVariant>> for ExclusionRule {
    fn from(variants: Vec<HandlerVariant>) -> Self {
        Self::any_of(variants.into_iter().map(Self::Variant))
    }
}

fn invalid_shape(value: &JsonValue) -> rootcause::Report<RegistryError> {
    let kind = match value {
        JsonValue::Null => "null inside a list",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a nested list",
        JsonValue::Object(_) => "a map",
    };
    RegistryError::InvalidConfiguration {
        reason: format!(
            "exclusion must be a variant name, a {{ pattern }} map, a list of those, or null; got {kind}"
        ),
    }
    .into()
}
