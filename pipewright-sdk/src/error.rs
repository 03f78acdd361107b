//! Error types for configuration and pipe execution.
//!
//! Validation problems are not errors: they are reported as
//! [`ValidationResult`](pipewright_types::ValidationResult) values. The types
//! here cover contract violations that fail at the call site.

use pipewright_types::{EntityDescriptor, EntityKind, MessageType, PipeKind, ValidationReport};
use thiserror::Error;

/// Boxed error returned by observers and caller-supplied filters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while configuring or materializing pipelines.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required argument was not supplied.
    #[error("Invalid argument: {name} must be set")]
    InvalidArgument {
        /// Name of the missing argument.
        name: &'static str,
    },

    /// The aggregator was already materialized into a pipe.
    #[error("The {kind} pipe has already been built")]
    AlreadyBuilt {
        /// The aggregator's pipe kind.
        kind: PipeKind,
    },

    /// A specification was added after the aggregator was materialized.
    #[error("The {kind} pipe has been built and no longer accepts specifications")]
    Frozen {
        /// The aggregator's pipe kind.
        kind: PipeKind,
    },

    /// The aggregated validation pass reported errors.
    #[error("Configuration is invalid: {} error(s) reported", .0.errors().count())]
    Validation(ValidationReport),

    /// An observer failed while being notified.
    #[error(transparent)]
    Observer(#[from] ObserverError),
}

/// Errors raised by an observer notification pass.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// An observer returned an error; the remaining observers were skipped.
    #[error("Observer failed while configuring {entity}: {source}")]
    Failed {
        /// The entity being configured.
        entity: EntityDescriptor,
        /// The observer's error.
        #[source]
        source: BoxError,
    },

    /// An observer returned an error while being told about one of the
    /// entity's message types.
    #[error("Observer failed while configuring {entity} for {message}: {source}")]
    MessageFailed {
        /// The entity being configured.
        entity: EntityDescriptor,
        /// The message type named by the notification.
        message: MessageType,
        /// The observer's error.
        #[source]
        source: BoxError,
    },

    /// A message-level notification arrived before the entity-level one.
    #[error("{entity} was not configured before its {message} message")]
    OutOfOrder {
        /// The entity named by the notification.
        entity: EntityDescriptor,
        /// The message type named by the notification.
        message: MessageType,
    },

    /// The descriptor was routed to the registry of another entity kind.
    #[error("Expected a {expected} descriptor, got a {actual} descriptor")]
    KindMismatch {
        /// The registry's entity kind.
        expected: EntityKind,
        /// The descriptor's entity kind.
        actual: EntityKind,
    },
}

/// Errors raised by filters while a context moves through a built pipe.
#[derive(Debug, Error)]
pub enum PipeError {
    /// A filter failed.
    #[error("Filter {filter} failed: {message}")]
    Filter {
        /// Name of the failing filter.
        filter: String,
        /// Description of the failure.
        message: String,
    },

    /// A retry filter ran out of attempts.
    #[error("Retry limit of {attempts} attempt(s) exceeded")]
    RetriesExhausted {
        /// How many attempts were made.
        attempts: u32,
        /// The final attempt's error.
        #[source]
        last: Box<PipeError>,
    },
}

impl PipeError {
    /// Shorthand for a filter failure.
    pub fn filter(filter: impl Into<String>, message: impl Into<String>) -> Self {
        PipeError::Filter {
            filter: filter.into(),
            message: message.into(),
        }
    }
}
