//! Handler variants and the catalog they are registered in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named specialisation of a base conversation type.
///
/// Two descriptors are the same variant when both the name and the base
/// match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerVariant {
    name: Arc<str>,
    base: Arc<str>,
}

impl HandlerVariant {
    /// Creates a variant descriptor.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, base: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
        }
    }

    /// The variant name, which doubles as its topic key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base type this variant specialises.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Returns true if this variant declares `base` as its base type.
    #[must_use]
    pub fn is_specialization_of(&self, base: &str) -> bool {
        &*self.base == base
    }
}

impl fmt::Display for HandlerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registered variants keyed by name.
#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    variants: HashMap<Arc<str>, HandlerVariant>,
}

impl HandlerCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variants: HashMap::new(),
        }
    }

    /// Adds a variant. Returns false if the name is already taken.
    pub fn register(&mut self, variant: HandlerVariant) -> bool {
        if self.variants.contains_key(&variant.name) {
            return false;
        }
        self.variants.insert(variant.name.clone(), variant);
        true
    }

    /// Gets a variant by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HandlerVariant> {
        self.variants.get(name)
    }

    /// Returns all registered variants.
    pub fn all(&self) -> impl Iterator<Item = &HandlerVariant> {
        self.variants.values()
    }

    /// Returns the variants that specialise `base`.
    pub fn specializations_of<'a>(
        &'a self,
        base: &'a str,
    ) -> impl Iterator<Item = &'a HandlerVariant> {
        self.variants
            .values()
            .filter(move |v| v.is_specialization_of(base))
    }

    /// Returns the number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specialisation_is_by_base_name() {
        let drinking = HandlerVariant::new("DrinkingConversation", "Conversation");
        let flying = HandlerVariant::new("FlyingConversation", "Aircraft");

        assert!(drinking.is_specialization_of("Conversation"));
        assert!(!flying.is_specialization_of("Conversation"));

        let named_after_base = HandlerVariant::new("Conversation", "Aircraft");
        assert!(!named_after_base.is_specialization_of("Conversation"));
    }

    #[test]
    fn catalog_rejects_duplicate_names() {
        let mut catalog = HandlerCatalog::new();

        assert!(catalog.register(HandlerVariant::new("HelloConversation", "Conversation")));
        assert!(!catalog.register(HandlerVariant::new("HelloConversation", "Other")));
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.get("HelloConversation").map(HandlerVariant::base),
            Some("Conversation")
        );
    }

    #[test]
    fn catalog_filters_by_base() {
        let mut catalog = HandlerCatalog::new();
        catalog.register(HandlerVariant::new("HelloConversation", "Conversation"));
        catalog.register(HandlerVariant::new("FlyingConversation", "Aircraft"));

        let names: Vec<_> = catalog
            .specializations_of("Conversation")
            .map(HandlerVariant::name)
            .collect();
        assert_eq!(names, vec!["HelloConversation"]);
    }
}
