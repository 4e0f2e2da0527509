//! Topic to handler-variant resolution.
//!
//! The registry holds the variant catalog plus the fallback and exclusion
//! settings for one base conversation type. Every change builds a new
//! state and swaps it in whole, so a resolution in flight always works on
//! one consistent snapshot.

use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::exclusion::ExclusionRule;
use crate::topic::{derive_key, is_blank};
use crate::variant::{HandlerCatalog, HandlerVariant};
use parley_core::Result;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Options for [`HandlerRegistry::resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Treat excluded variants as valid resolution targets.
    pub include_excluded: bool,
    /// Never fall back to the blank-topic or unknown-topic variant.
    pub exclude_fallbacks: bool,
}

impl ResolveOptions {
    /// Options that also consider excluded variants.
    #[must_use]
    pub fn including_excluded() -> Self {
        Self {
            include_excluded: true,
            exclude_fallbacks: false,
        }
    }

    /// Options that only return a real, topic-owning variant.
    #[must_use]
    pub fn without_fallbacks() -> Self {
        Self {
            include_excluded: false,
            exclude_fallbacks: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct RegistryState {
    catalog: HandlerCatalog,
    suffix: Option<String>,
    unknown: Option<HandlerVariant>,
    blank: Option<HandlerVariant>,
    exclusion: Option<ExclusionRule>,
}

impl RegistryState {
    fn suffix<'a>(&'a self, base: &'a str) -> &'a str {
        self.suffix.as_deref().unwrap_or(base)
    }

    fn is_excluded(&self, base: &str, variant: &HandlerVariant) -> bool {
        self.exclusion
            .as_ref()
            .is_some_and(|rule| rule.matches(variant, &self.catalog, self.suffix(base)))
    }

    fn resolve(
        &self,
        base: &str,
        topic: Option<&str>,
        options: ResolveOptions,
    ) -> Option<HandlerVariant> {
        let fallback = |variant: &Option<HandlerVariant>| {
            if options.exclude_fallbacks {
                None
            } else {
                variant.clone()
            }
        };

        let Some(topic) = topic.filter(|_| !is_blank(topic)) else {
            return fallback(&self.blank);
        };

        let key = derive_key(topic, self.suffix(base));
        match self.catalog.get(&key) {
            Some(variant)
                if variant.is_specialization_of(base)
                    && (options.include_excluded || !self.is_excluded(base, variant)) =>
            {
                Some(variant.clone())
            }
            _ => fallback(&self.unknown),
        }
    }
}

/// Resolves topics to the handler variants of one base conversation type.
#[derive(Debug)]
pub struct HandlerRegistry {
    base: Arc<str>,
    state: RwLock<Arc<RegistryState>>,
}

impl HandlerRegistry {
    /// Creates an empty registry for `base`, e.g. `"Conversation"`.
    #[must_use]
    pub fn new(base: impl Into<Arc<str>>) -> Self {
        Self {
            base: base.into(),
            state: RwLock::new(Arc::new(RegistryState::default())),
        }
    }

    /// The base conversation type name.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn snapshot(&self) -> Arc<RegistryState> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(
        &self,
        change: impl FnOnce(&mut RegistryState) -> Result<(), RegistryError>,
    ) -> Result<(), RegistryError> {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = RegistryState::clone(&current);
        change(&mut next)?;
        *current = Arc::new(next);
        Ok(())
    }

    /// Adds a variant to the catalog.
    ///
    /// Variants of other base types may be registered; they are known to
    /// the catalog but never resolve for this registry.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateVariant` if the name is already registered.
    pub fn register_variant(&self, variant: HandlerVariant) -> Result<(), RegistryError> {
        self.update(|state| {
            if state.catalog.register(variant.clone()) {
                debug!(variant = %variant, base = variant.base(), "registered handler variant");
                Ok(())
            } else {
                Err(RegistryError::DuplicateVariant {
                    name: variant.name().to_string(),
                }
                .into())
            }
        })
    }

    /// Registers a variant of this registry's base type owning `topic`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateVariant` if another variant owns the topic key.
    pub fn register_topic(&self, topic: &str) -> Result<HandlerVariant, RegistryError> {
        let variant = HandlerVariant::new(self.derive_key(topic), self.base.clone());
        self.register_variant(variant.clone())?;
        Ok(variant)
    }

    /// Gets a registered variant by name.
    #[must_use]
    pub fn variant(&self, name: &str) -> Option<HandlerVariant> {
        self.snapshot().catalog.get(name).cloned()
    }

    /// Returns every registered variant.
    #[must_use]
    pub fn variants(&self) -> Vec<HandlerVariant> {
        self.snapshot().catalog.all().cloned().collect()
    }

    /// Sets the variant used when a topic has no valid variant.
    pub fn set_unknown_variant(&self, variant: Option<HandlerVariant>) {
        self.set(|state| state.unknown = variant);
    }

    /// Sets the variant used when the topic is blank.
    pub fn set_blank_variant(&self, variant: Option<HandlerVariant>) {
        self.set(|state| state.blank = variant);
    }

    /// Overrides the suffix appended to topic keys. `None` restores the
    /// base type name.
    pub fn set_suffix(&self, suffix: Option<String>) {
        self.set(|state| state.suffix = suffix);
    }

    fn set(&self, change: impl FnOnce(&mut RegistryState)) {
        let mut current = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = RegistryState::clone(&current);
        change(&mut next);
        *current = Arc::new(next);
    }

    /// Replaces the whole exclusion configuration. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the rule has an unsupported shape.
    pub fn set_exclusion(&self, rule: Option<ExclusionRule>) -> Result<(), RegistryError> {
        if let Some(rule) = &rule {
            rule.validate()?;
        }
        self.update(|state| {
            state.exclusion = rule;
            Ok(())
        })
    }

    /// Applies registry settings from configuration in one step.
    ///
    /// The configuration replaces the fallbacks, suffix and exclusion
    /// outright: a setting it leaves out is cleared, including one made
    /// earlier through the `set_*` methods. The catalog is kept.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if a fallback names an unregistered
    /// variant or the exclusion has an unsupported shape. Nothing is
    /// applied on error.
    pub fn apply_config(&self, config: &RegistryConfig) -> Result<(), RegistryError> {
        let exclusion = match &config.exclude {
            Some(value) => ExclusionRule::from_value(value)?,
            None => None,
        };
        if let Some(rule) = &exclusion {
            rule.validate()?;
        }

        self.update(|state| {
            let lookup = |name: &Option<String>, role: &str| {
                name.as_deref()
                    .map(|name| {
                        state.catalog.get(name).cloned().ok_or_else(|| {
                            RegistryError::InvalidConfiguration {
                                reason: format!("{role} handler {name} is not registered"),
                            }
                        })
                    })
                    .transpose()
            };
            let unknown = lookup(&config.unknown_topic_variant, "unknown-topic")?;
            let blank = lookup(&config.blank_topic_variant, "blank-topic")?;

            state.unknown = unknown;
            state.blank = blank;
            state.suffix = config.variant_suffix.clone();
            state.exclusion = exclusion;
            Ok(())
        })?;

        info!(base = %self.base, "applied handler registry configuration");
        Ok(())
    }

    /// Derives the topic key for `topic` under the current suffix.
    #[must_use]
    pub fn derive_key(&self, topic: &str) -> String {
        derive_key(topic, self.snapshot().suffix(&self.base))
    }

    /// Resolves a topic to a handler variant.
    ///
    /// Blank topics resolve to the blank-topic fallback. A non-blank topic
    /// resolves to the variant named by its key if that variant specialises
    /// the base type and is not excluded (unless
    /// `options.include_excluded`); otherwise to the unknown-topic fallback.
    /// Fallbacks are skipped when `options.exclude_fallbacks` is set.
    #[must_use]
    pub fn resolve(&self, topic: Option<&str>, options: ResolveOptions) -> Option<HandlerVariant> {
        let resolved = self.snapshot().resolve(&self.base, topic, options);
        debug!(
            topic = topic.unwrap_or_default(),
            variant = resolved.as_ref().map(HandlerVariant::name),
            "resolved topic"
        );
        resolved
    }

    /// Returns true if the current exclusion rule matches `variant`.
    #[must_use]
    pub fn is_excluded(&self, variant: &HandlerVariant) -> bool {
        self.snapshot().is_excluded(&self.base, variant)
    }

    /// Returns true if a real, non-excluded variant owns `topic`.
    #[must_use]
    pub fn is_topic_resolvable(&self, topic: Option<&str>) -> bool {
        self.resolve(topic, ResolveOptions::without_fallbacks())
            .is_some()
    }
}
