//! The addressing collaborator.
//!
//! Topology maps message types to destinations and is shared bus-wide: every
//! endpoint holds the same instance. The engine only reads it, to validate
//! and to seed the send and publish pipes with topology-level conventions.

use std::collections::BTreeMap;
use std::fmt;

use pipewright_types::{MessageType, ValidationResult};

use crate::context::{PublishContext, SendContext};
use crate::specification::SharedSpecification;

/// Source label for topology validation results.
pub const TOPOLOGY_SOURCE: &str = "topology";

/// Bus-wide addressing.
pub trait Topology: Send + Sync + fmt::Debug {
    /// Report problems with the addressing configuration.
    fn validate(&self) -> Vec<ValidationResult>;

    /// Specifications every send pipe starts with.
    fn send_specifications(&self) -> Vec<SharedSpecification<SendContext>> {
        Vec::new()
    }

    /// Specifications every publish pipe starts with.
    fn publish_specifications(&self) -> Vec<SharedSpecification<PublishContext>> {
        Vec::new()
    }

    /// The destination messages of `message_type` are addressed to.
    fn destination(&self, message_type: &MessageType) -> Option<&str>;
}

/// A topology backed by a fixed message-type to destination map.
///
/// # Example
///
/// ```rust
/// use pipewright_sdk::{MessageType, StaticTopology, Topology};
///
/// let topology = StaticTopology::new()
///     .entity(MessageType::named("orders.submitted"), "exchange:orders");
///
/// assert!(topology.validate().is_empty());
/// assert_eq!(
///     topology.destination(&MessageType::named("orders.submitted")),
///     Some("exchange:orders")
/// );
/// ```
#[derive(Debug, Default, Clone)]
pub struct StaticTopology {
    entities: BTreeMap<MessageType, String>,
    send: Vec<SharedSpecification<SendContext>>,
    publish: Vec<SharedSpecification<PublishContext>>,
}

impl StaticTopology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a message type to a destination.
    pub fn entity(mut self, message_type: MessageType, destination: impl Into<String>) -> Self {
        self.entities.insert(message_type, destination.into());
        self
    }

    /// Add a specification every send pipe starts with.
    pub fn send_specification(mut self, spec: SharedSpecification<SendContext>) -> Self {
        self.send.push(spec);
        self
    }

    /// Add a specification every publish pipe starts with.
    pub fn publish_specification(mut self, spec: SharedSpecification<PublishContext>) -> Self {
        self.publish.push(spec);
        self
    }

    /// Number of mapped message types.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no message types are mapped.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn is_valid_destination_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '/' | '-')
}

impl Topology for StaticTopology {
    fn validate(&self) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        if self.entities.is_empty() {
            results.push(
                ValidationResult::warning("entities", "no message types are mapped to a destination")
                    .with_source(TOPOLOGY_SOURCE),
            );
        }

        for (message_type, destination) in &self.entities {
            if destination.trim().is_empty() {
                results.push(
                    ValidationResult::error(message_type.name(), "destination must not be empty")
                        .with_source(TOPOLOGY_SOURCE),
                );
            } else if let Some(bad) = destination.chars().find(|c| !is_valid_destination_char(*c)) {
                results.push(
                    ValidationResult::error(
                        message_type.name(),
                        format!("destination {:?} contains invalid character {:?}", destination, bad),
                    )
                    .with_source(TOPOLOGY_SOURCE),
                );
            }
        }

        results
    }

    fn send_specifications(&self) -> Vec<SharedSpecification<SendContext>> {
        self.send.clone()
    }

    fn publish_specifications(&self) -> Vec<SharedSpecification<PublishContext>> {
        self.publish.clone()
    }

    fn destination(&self, message_type: &MessageType) -> Option<&str> {
        self.entities.get(message_type).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewright_types::Severity;

    #[test]
    fn empty_topology_warns() {
        let results = StaticTopology::new().validate();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Warning);
        assert_eq!(results[0].source.as_deref(), Some(TOPOLOGY_SOURCE));
    }

    #[test]
    fn invalid_destinations_are_errors() {
        let topology = StaticTopology::new()
            .entity(MessageType::named("a"), "")
            .entity(MessageType::named("b"), "queue with spaces")
            .entity(MessageType::named("c"), "queue:fine");

        let results = topology.validate();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.severity == Severity::Error));
        assert_eq!(results[0].key, "a");
        assert_eq!(results[1].key, "b");
    }

    #[test]
    fn unknown_message_has_no_destination() {
        let topology = StaticTopology::new().entity(MessageType::named("a"), "queue:a");
        assert_eq!(topology.destination(&MessageType::named("missing")), None);
    }
}
