//! Conversation engine configuration.
//!
//! Loaded via the `config` crate from `PARLEY__`-prefixed environment
//! variables or from a file.

use crate::error::RegistryError;
use chrono::Duration;
use parley_core::Result;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// How long, in hours, an unfinished conversation stays eligible for
    /// find-or-create matching after its last update.
    #[serde(default = "default_recency_window_hours")]
    pub recency_window_hours: i64,

    /// Messages that finish a conversation when passed to `advance`.
    /// Matched exactly, case-sensitive.
    #[serde(default)]
    pub finishing_keywords: Vec<String>,

    /// Handler registry settings.
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Handler registry settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    /// Variant name used for topics with no valid variant.
    #[serde(default)]
    pub unknown_topic_variant: Option<String>,

    /// Variant name used for blank topics.
    #[serde(default)]
    pub blank_topic_variant: Option<String>,

    /// Suffix appended to topic keys. Defaults to the base type name.
    #[serde(default)]
    pub variant_suffix: Option<String>,

    /// Exclusion rule: a name, `{ pattern = "..." }`, or a list of those.
    #[serde(default)]
    pub exclude: Option<JsonValue>,
}

pub(crate) fn default_recency_window_hours() -> i64 {
    24
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            recency_window_hours: default_recency_window_hours(),
            finishing_keywords: Vec::new(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ConversationConfig {
    /// Loads configuration from environment variables.
    ///
    /// `PARLEY__RECENCY_WINDOW_HOURS=12`,
    /// `PARLEY__FINISHING_KEYWORDS=stop,cancel` and
    /// `PARLEY__REGISTRY__UNKNOWN_TOPIC_VARIANT=UnknownConversation` are
    /// all recognised.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn from_env() -> std::result::Result<Self, config::ConfigError> {
        Self::from_env_source(None)
    }

    /// Loads from `vars` instead of the process environment when given.
    fn from_env_source(
        vars: Option<config::Map<String, String>>,
    ) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("PARLEY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("finishing_keywords")
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from a file. The format is taken from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    /// The recency window as a duration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless the window is a positive number
    /// of hours that fits in a duration.
    pub fn recency_window(&self) -> Result<Duration, RegistryError> {
        let hours = self.recency_window_hours;
        if hours <= 0 {
            return Err(RegistryError::InvalidConfiguration {
                reason: format!("recency window must be positive, got {hours} hours"),
            }
            .into());
        }
        Duration::try_hours(hours).ok_or_else(|| {
            RegistryError::InvalidConfiguration {
                reason: format!("recency window of {hours} hours is out of range"),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ConversationConfig::default();
        assert_eq!(config.recency_window().unwrap(), Duration::hours(24));
        assert!(config.finishing_keywords.is_empty());
        assert!(config.registry.exclude.is_none());
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
recency_window_hours = 12
finishing_keywords = ["stop", "cancel"]

[registry]
unknown_topic_variant = "UnknownTopicConversation"
exclude = {{ pattern = "^Abstract" }}
"#
        )
        .expect("write config");

        let config = ConversationConfig::from_file(file.path()).expect("load config");

        assert_eq!(config.recency_window().unwrap(), Duration::hours(12));
        assert_eq!(config.finishing_keywords, vec!["stop", "cancel"]);
        assert_eq!(
            config.registry.unknown_topic_variant.as_deref(),
            Some("UnknownTopicConversation")
        );
        assert_eq!(
            config.registry.exclude,
            Some(serde_json::json!({ "pattern": "^Abstract" }))
        );
        assert!(config.registry.blank_topic_variant.is_none());
    }

    #[test]
    fn loads_from_environment() {
        let vars = [
            ("PARLEY__RECENCY_WINDOW_HOURS", "6"),
            ("PARLEY__FINISHING_KEYWORDS", "stop,cancel"),
            ("PARLEY__REGISTRY__UNKNOWN_TOPIC_VARIANT", "UnknownTopicConversation"),
            ("PARLEY__REGISTRY__VARIANT_SUFFIX", "Chat"),
            ("UNRELATED__RECENCY_WINDOW_HOURS", "99"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let config = ConversationConfig::from_env_source(Some(vars)).expect("load config");

        assert_eq!(config.recency_window_hours, 6);
        assert_eq!(config.finishing_keywords, vec!["stop", "cancel"]);
        assert_eq!(
            config.registry.unknown_topic_variant.as_deref(),
            Some("UnknownTopicConversation")
        );
        assert_eq!(config.registry.variant_suffix.as_deref(), Some("Chat"));
        assert!(config.registry.blank_topic_variant.is_none());
    }

    #[test]
    fn recency_window_must_be_positive_and_in_range() {
        for hours in [0, -3, 10_000_000_000_000] {
            let config = ConversationConfig {
                recency_window_hours: hours,
                ..ConversationConfig::default()
            };
            let err = config.recency_window().unwrap_err();
            assert!(
                err.to_string().contains("recency window"),
                "{hours} hours should be rejected"
            );
        }

        let config = ConversationConfig {
            recency_window_hours: 10_000_000_000,
            ..ConversationConfig::default()
        };
        assert_eq!(config.recency_window().unwrap(), Duration::hours(10_000_000_000));
    }

    #[test]
    fn missing_sections_take_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "finishing_keywords = [\"bye\"]").expect("write config");

        let config = ConversationConfig::from_file(file.path()).expect("load config");

        assert_eq!(config.recency_window_hours, 24);
        assert!(config.registry.unknown_topic_variant.is_none());
    }
}
