//! Serialization settings for an endpoint.

use std::collections::BTreeSet;

use pipewright_types::ValidationResult;

/// Content type used when none is configured.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Source label for serialization validation results.
pub const SERIALIZATION_SOURCE: &str = "serialization";

/// Which content type outbound messages use and which inbound content
/// types can be read.
///
/// Each endpoint owns its own copy. Seeding from a bus or a parent endpoint
/// goes through [`create_serialization_configuration`], so changes on one
/// side never reach the other.
///
/// [`create_serialization_configuration`]: SerializationConfiguration::create_serialization_configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationConfiguration {
    content_type: String,
    deserializers: BTreeSet<String>,
}

impl SerializationConfiguration {
    /// Create a configuration using JSON both ways.
    pub fn new() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            deserializers: BTreeSet::from([DEFAULT_CONTENT_TYPE.to_string()]),
        }
    }

    /// Create an independent configuration starting from this one.
    pub fn create_serialization_configuration(&self) -> Self {
        self.clone()
    }

    /// The outbound content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Set the outbound content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Accept an additional inbound content type.
    pub fn add_deserializer(&mut self, content_type: impl Into<String>) {
        self.deserializers.insert(content_type.into());
    }

    /// Inbound content types, sorted.
    pub fn deserializers(&self) -> impl Iterator<Item = &str> {
        self.deserializers.iter().map(String::as_str)
    }

    /// Returns true if `content_type` can be read.
    pub fn supports(&self, content_type: &str) -> bool {
        self.deserializers.contains(content_type)
    }

    /// Report problems with these settings.
    pub fn validate(&self) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        if self.content_type.trim().is_empty() {
            results.push(
                ValidationResult::error("content_type", "content type must not be empty")
                    .with_source(SERIALIZATION_SOURCE),
            );
        } else if !self.supports(&self.content_type) {
            results.push(
                ValidationResult::warning(
                    "content_type",
                    format!(
                        "endpoint sends {} but cannot deserialize it",
                        self.content_type
                    ),
                )
                .with_source(SERIALIZATION_SOURCE),
            );
        }
        if self.deserializers.is_empty() {
            results.push(
                ValidationResult::error("deserializers", "no inbound content type is accepted")
                    .with_source(SERIALIZATION_SOURCE),
            );
        }
        results
    }
}

impl Default for SerializationConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
