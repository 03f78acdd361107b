//! The per-endpoint composition root.

use std::sync::Arc;

use pipewright_types::{
    EntityDescriptor, EntityKind, MessageType, PipeKind, ValidationReport, ValidationResult,
};
use tracing::{debug, info, warn};

use crate::aggregator::{PipeConfigurator, SpecificationSnapshot};
use crate::bus::BusConfiguration;
use crate::context::{
    ConsumeContext, ExceptionReceiveContext, PublishContext, ReceiveContext, SendContext,
};
use crate::error::{ConfigurationError, ObserverError};
use crate::observer::{ConfigurationObserver, ConnectHandle};
use crate::pipe::{BuiltPipe, EmptyPipe, Pipe};
use crate::scope::{ConsumePipeScope, PublishPipeScope, ReceivePipeScope, ReceivePipes, SendPipeScope};
use crate::serialization::SerializationConfiguration;
use crate::specification::{PipeSpecification, SharedSpecification};
use crate::topology::{Topology, TOPOLOGY_SOURCE};

/// The innermost pipe each built pipe hands contexts to.
pub struct PipeTargets {
    /// Target of the consume pipe.
    pub consume: Arc<dyn Pipe<ConsumeContext>>,
    /// Target of the send pipe.
    pub send: Arc<dyn Pipe<SendContext>>,
    /// Target of the publish pipe.
    pub publish: Arc<dyn Pipe<PublishContext>>,
    /// Target of the receive pipe.
    pub receive: Arc<dyn Pipe<ReceiveContext>>,
    /// Target of the dead-letter pipe.
    pub dead_letter: Arc<dyn Pipe<ReceiveContext>>,
    /// Target of the error pipe.
    pub error: Arc<dyn Pipe<ExceptionReceiveContext>>,
}

impl Default for PipeTargets {
    fn default() -> Self {
        Self {
            consume: Arc::new(EmptyPipe),
            send: Arc::new(EmptyPipe),
            publish: Arc::new(EmptyPipe),
            receive: Arc::new(EmptyPipe),
            dead_letter: Arc::new(EmptyPipe),
            error: Arc::new(EmptyPipe),
        }
    }
}

/// The pipes materialized from an endpoint configuration.
#[derive(Debug, Clone)]
pub struct EndpointPipes {
    /// The consume pipe.
    pub consume: BuiltPipe<ConsumeContext>,
    /// The send pipe.
    pub send: BuiltPipe<SendContext>,
    /// The publish pipe.
    pub publish: BuiltPipe<PublishContext>,
    /// The receive pipe with its dead-letter and error pipes.
    pub receive: ReceivePipes,
}

/// Everything one endpoint needs to build its pipes.
///
/// An endpoint configuration is created in one of three ways:
///
/// - [`new`](Self::new): fresh, with send and publish starting from the
///   topology's specifications.
/// - [`from_bus`](Self::from_bus): send and publish start from a copy of the
///   bus configuration's specifications.
/// - [`fork`](Self::fork): consume, send and publish start from a copy of a
///   parent endpoint's specifications.
///
/// In every mode receive starts empty, the topology is shared with its
/// source, and serialization settings are an independent copy.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use pipewright_sdk::builtin::{HeaderSpecification, RetrySpecification};
/// use pipewright_sdk::{EndpointConfiguration, MessageType, StaticTopology};
///
/// let topology = StaticTopology::new().entity(MessageType::named("orders"), "queue:orders");
/// let mut endpoint = EndpointConfiguration::new(Arc::new(topology));
/// endpoint.add_pipe_specification(RetrySpecification::immediate(3)).unwrap();
///
/// let mut child = endpoint.fork();
/// child.add_pipe_specification(HeaderSpecification::new("tenant", "eu")).unwrap();
///
/// assert_eq!(endpoint.consume().specification().len(), 1);
/// assert_eq!(child.consume().specification().len(), 2);
/// assert_eq!(child.validate().count(), 0);
/// ```
#[derive(Debug)]
pub struct EndpointConfiguration {
    consume: ConsumePipeScope,
    send: SendPipeScope,
    publish: PublishPipeScope,
    receive: ReceivePipeScope,
    topology: Arc<dyn Topology>,
    serialization: SerializationConfiguration,
}

impl EndpointConfiguration {
    /// Create a standalone endpoint configuration.
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        let send = SendPipeScope::seeded(
            PipeKind::Send,
            SpecificationSnapshot::from_specifications(topology.send_specifications()),
        );
        let publish = PublishPipeScope::seeded(
            PipeKind::Publish,
            SpecificationSnapshot::from_specifications(topology.publish_specifications()),
        );
        debug!("endpoint configuration created");

        Self {
            consume: ConsumePipeScope::new(),
            send,
            publish,
            receive: ReceivePipeScope::new(),
            topology,
            serialization: SerializationConfiguration::new(),
        }
    }

    /// Create an endpoint configuration seeded from bus-wide defaults.
    pub fn from_bus(bus: &BusConfiguration) -> Self {
        debug!(
            send = bus.send().specification().len(),
            publish = bus.publish().specification().len(),
            "endpoint configuration seeded from bus"
        );

        Self {
            consume: ConsumePipeScope::new(),
            send: SendPipeScope::seeded(PipeKind::Send, bus.send().specification().snapshot()),
            publish: PublishPipeScope::seeded(
                PipeKind::Publish,
                bus.publish().specification().snapshot(),
            ),
            receive: ReceivePipeScope::new(),
            topology: Arc::clone(bus.topology()),
            serialization: bus.serialization().create_serialization_configuration(),
        }
    }

    /// Create a child configuration from this one.
    ///
    /// The child copies consume, send and publish specifications as they are
    /// now; later additions on either side stay on that side. Receive
    /// specifications and connected observers are not copied.
    pub fn fork(&self) -> Self {
        debug!(
            consume = self.consume.specification().len(),
            send = self.send.specification().len(),
            publish = self.publish.specification().len(),
            "endpoint configuration forked"
        );

        Self {
            consume: ConsumePipeScope::seeded(self.consume.specification().snapshot()),
            send: SendPipeScope::seeded(PipeKind::Send, self.send.specification().snapshot()),
            publish: PublishPipeScope::seeded(
                PipeKind::Publish,
                self.publish.specification().snapshot(),
            ),
            receive: ReceivePipeScope::new(),
            topology: Arc::clone(&self.topology),
            serialization: self.serialization.create_serialization_configuration(),
        }
    }

    // Consume contributions

    /// Append a consume specification.
    pub fn add_pipe_specification<S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        S: PipeSpecification<ConsumeContext> + 'static,
    {
        self.consume.configurator().add_pipe_specification(spec)
    }

    /// Append an already shared consume specification.
    pub fn add_shared_pipe_specification(
        &mut self,
        spec: SharedSpecification<ConsumeContext>,
    ) -> Result<(), ConfigurationError> {
        self.consume.configurator().add_shared_pipe_specification(spec)
    }

    /// Append a consume specification applied only to `message_type`.
    pub fn add_message_pipe_specification(
        &mut self,
        message_type: MessageType,
        spec: SharedSpecification<ConsumeContext>,
    ) -> Result<(), ConfigurationError> {
        self.consume
            .configurator()
            .add_message_pipe_specification(message_type, spec)
    }

    /// Append a consume specification applied only to messages of type `M`.
    pub fn add_pipe_specification_for<M, S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        M: ?Sized + 'static,
        S: PipeSpecification<ConsumeContext> + 'static,
    {
        self.consume
            .configurator()
            .add_pipe_specification_for::<M, S>(spec)
    }

    /// Insert a consume specification ahead of every regular one.
    pub fn add_pre_pipe_specification<S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        S: PipeSpecification<ConsumeContext> + 'static,
    {
        self.consume.configurator().add_pre_pipe_specification(spec)
    }

    // Observers

    /// Connect an observer notified as consumers are configured.
    pub fn connect_consumer_configuration_observer<O>(&self, observer: O) -> ConnectHandle
    where
        O: ConfigurationObserver + 'static,
    {
        self.consume
            .observers()
            .registry(EntityKind::Consumer)
            .connect(observer)
    }

    /// Connect an observer notified as sagas are configured.
    pub fn connect_saga_configuration_observer<O>(&self, observer: O) -> ConnectHandle
    where
        O: ConfigurationObserver + 'static,
    {
        self.consume
            .observers()
            .registry(EntityKind::Saga)
            .connect(observer)
    }

    /// Connect an observer notified as handlers are configured.
    pub fn connect_handler_configuration_observer<O>(&self, observer: O) -> ConnectHandle
    where
        O: ConfigurationObserver + 'static,
    {
        self.consume
            .observers()
            .registry(EntityKind::Handler)
            .connect(observer)
    }

    /// Notify the observers of `entity`'s kind that it was configured.
    pub fn entity_configured(&self, entity: &EntityDescriptor) -> Result<(), ObserverError> {
        self.consume.observers().notify_entity_configured(entity)
    }

    /// Notify the observers of `entity`'s kind that it consumes `message`.
    pub fn entity_message_configured(
        &self,
        entity: &EntityDescriptor,
        message: &MessageType,
    ) -> Result<(), ObserverError> {
        self.consume
            .observers()
            .notify_entity_message_configured(entity, message)
    }

    // Configure callbacks

    /// Contribute to the consume pipe.
    pub fn configure_consume<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, ConsumeContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.consume.configurator())
    }

    /// Contribute to the send pipe.
    pub fn configure_send<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, SendContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.send.configurator())
    }

    /// Contribute to the publish pipe.
    pub fn configure_publish<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, PublishContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.publish.configurator())
    }

    /// Contribute to the receive pipe.
    pub fn configure_receive<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, ReceiveContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.receive.configurator())
    }

    /// Contribute to the dead-letter pipe.
    pub fn configure_dead_letter<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, ReceiveContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.receive.dead_letter_configurator())
    }

    /// Contribute to the error pipe.
    pub fn configure_error<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, ExceptionReceiveContext>) -> Result<(), ConfigurationError>,
    {
        let callback = require(callback)?;
        callback(&mut self.receive.error_configurator())
    }

    // Validation and build

    /// Validate send, publish, consume, receive and then the topology.
    ///
    /// Every collaborator is checked; problems are reported, never raised.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        self.send
            .validate()
            .chain(self.publish.validate())
            .chain(self.consume.validate())
            .chain(self.receive.validate())
            .chain(
                self.topology
                    .validate()
                    .into_iter()
                    .map(|result| result.or_source(TOPOLOGY_SOURCE)),
            )
    }

    /// Collect [`validate`](Self::validate) into a report.
    pub fn validation_report(&self) -> ValidationReport {
        self.validate().collect()
    }

    /// Validate, then materialize every pipe.
    ///
    /// Refuses with [`ConfigurationError::Validation`] when the report holds
    /// any error; warnings do not block the build.
    pub fn build(&mut self, targets: PipeTargets) -> Result<EndpointPipes, ConfigurationError> {
        let report = self.validation_report();
        if report.has_errors() {
            warn!(
                errors = report.errors().count(),
                warnings = report.warnings().count(),
                "endpoint build refused"
            );
            return Err(ConfigurationError::Validation(report));
        }

        let pipes = EndpointPipes {
            consume: self.consume.build(targets.consume)?,
            send: self.send.build(targets.send)?,
            publish: self.publish.build(targets.publish)?,
            receive: self
                .receive
                .build(targets.receive, targets.dead_letter, targets.error)?,
        };
        info!(
            consume = pipes.consume.len(),
            send = pipes.send.len(),
            publish = pipes.publish.len(),
            receive = pipes.receive.receive.len(),
            warnings = report.warnings().count(),
            "endpoint pipes built"
        );
        Ok(pipes)
    }

    // Accessors

    /// The consume scope.
    pub fn consume(&self) -> &ConsumePipeScope {
        &self.consume
    }

    /// The send scope.
    pub fn send(&self) -> &SendPipeScope {
        &self.send
    }

    /// The publish scope.
    pub fn publish(&self) -> &PublishPipeScope {
        &self.publish
    }

    /// The receive scope.
    pub fn receive(&self) -> &ReceivePipeScope {
        &self.receive
    }

    /// The shared topology.
    pub fn topology(&self) -> &Arc<dyn Topology> {
        &self.topology
    }

    /// This endpoint's serialization settings.
    pub fn serialization(&self) -> &SerializationConfiguration {
        &self.serialization
    }

    /// Mutable access to this endpoint's serialization settings.
    pub fn serialization_mut(&mut self) -> &mut SerializationConfiguration {
        &mut self.serialization
    }
}

fn require<F>(callback: Option<F>) -> Result<F, ConfigurationError> {
    callback.ok_or(ConfigurationError::InvalidArgument { name: "callback" })
}
