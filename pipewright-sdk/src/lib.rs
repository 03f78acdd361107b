//! # pipewright-sdk
//!
//! Composition and validation engine for message pipeline configuration.
//!
//! Each endpoint of a message bus runs four pipelines: consume, send,
//! publish and receive (the last with nested dead-letter and error pipes).
//! This crate accumulates the behavior of those pipelines as ordered
//! specifications, lets child endpoints inherit a copy of a parent's
//! configuration, notifies observers as consumers, sagas and handlers are
//! configured, and validates everything before any pipe is built.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use pipewright_sdk::builtin::{LogSpecification, RetrySpecification};
//! use pipewright_sdk::{
//!     ConsumeContext, EndpointConfiguration, MessageType, Pipe, PipeConfigurator,
//!     PipeTargets, SendContext, StaticTopology,
//! };
//!
//! struct SubmitOrder;
//!
//! let topology = StaticTopology::new().entity(MessageType::of::<SubmitOrder>(), "queue:orders");
//! let mut endpoint = EndpointConfiguration::new(Arc::new(topology));
//!
//! // Contribute behavior
//! endpoint.add_pipe_specification(RetrySpecification::immediate(3)).unwrap();
//! endpoint
//!     .configure_send(Some(|send: &mut PipeConfigurator<'_, SendContext>| {
//!         send.add_pipe_specification(LogSpecification::new("outbound"))
//!     }))
//!     .unwrap();
//!
//! // Validate and build
//! assert!(endpoint.validation_report().is_valid());
//! let pipes = endpoint.build(PipeTargets::default()).unwrap();
//!
//! let mut ctx = ConsumeContext::of::<SubmitOrder>();
//! pipes.consume.send(&mut ctx).unwrap();
//! ```
//!
//! ## Features
//!
//! - **Ordered contributions**: pre-pipe and regular specifications, applied outermost-first
//! - **Copy-on-fork**: children start from a snapshot of their parent
//! - **Typed routing**: specifications bound to a single message type
//! - **Thread-safe observers**: connect, disconnect and notify from any thread
//! - **Validation as data**: every problem is reported, none are raised

mod aggregator;
pub mod builtin;
mod bus;
mod context;
mod endpoint;
mod error;
mod observer;
mod pipe;
mod scope;
mod serialization;
mod specification;
mod topology;

pub use aggregator::{PipeConfigurator, SpecificationAggregator, SpecificationSnapshot};
pub use bus::BusConfiguration;
pub use context::{
    ConsumeContext, ExceptionReceiveContext, Headers, MessageContext, PublishContext,
    ReceiveContext, SendContext,
};
pub use endpoint::{EndpointConfiguration, EndpointPipes, PipeTargets};
pub use error::{BoxError, ConfigurationError, ObserverError, PipeError};
pub use observer::{
    ConfigurationObserver, ConnectGuard, ConnectHandle, ObserverRegistries, ObserverRegistry,
};
pub use pipe::{BuiltPipe, EmptyPipe, Filter, Pipe, PipeBuilder};
pub use scope::{
    ConsumePipeScope, PipeScope, PublishPipeScope, ReceivePipeScope, ReceivePipes, SendPipeScope,
};
pub use serialization::{SerializationConfiguration, DEFAULT_CONTENT_TYPE, SERIALIZATION_SOURCE};
pub use specification::{MessageTypeSpecification, PipeSpecification, SharedSpecification};
pub use topology::{StaticTopology, Topology, TOPOLOGY_SOURCE};

// Re-export types for convenience
pub use pipewright_types::{
    EntityDescriptor, EntityKind, MessageType, PipeKind, Severity, ValidationReport,
    ValidationResult,
};
