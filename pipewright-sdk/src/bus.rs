//! Bus-wide defaults that endpoints are seeded from.

use std::sync::Arc;

use pipewright_types::{PipeKind, ValidationResult};
use tracing::debug;

use crate::aggregator::{PipeConfigurator, SpecificationSnapshot};
use crate::context::{PublishContext, SendContext};
use crate::error::ConfigurationError;
use crate::scope::{PublishPipeScope, SendPipeScope};
use crate::serialization::SerializationConfiguration;
use crate::topology::{Topology, TOPOLOGY_SOURCE};

/// Bus-level send and publish configuration.
///
/// Endpoints created with
/// [`EndpointConfiguration::from_bus`](crate::EndpointConfiguration::from_bus)
/// start from a copy of these specifications and of the serialization
/// settings, and share the topology.
#[derive(Debug)]
pub struct BusConfiguration {
    topology: Arc<dyn Topology>,
    send: SendPipeScope,
    publish: PublishPipeScope,
    serialization: SerializationConfiguration,
}

impl BusConfiguration {
    /// Create a bus configuration. Send and publish start with the
    /// topology's specifications.
    pub fn new(topology: Arc<dyn Topology>) -> Self {
        let send = SendPipeScope::seeded(
            PipeKind::Send,
            SpecificationSnapshot::from_specifications(topology.send_specifications()),
        );
        let publish = PublishPipeScope::seeded(
            PipeKind::Publish,
            SpecificationSnapshot::from_specifications(topology.publish_specifications()),
        );
        debug!(
            send = send.specification().len(),
            publish = publish.specification().len(),
            "bus configuration created"
        );

        Self {
            topology,
            send,
            publish,
            serialization: SerializationConfiguration::new(),
        }
    }

    /// Contribute to the bus-wide send pipe.
    pub fn configure_send<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, SendContext>) -> Result<(), ConfigurationError>,
    {
        let callback = callback.ok_or(ConfigurationError::InvalidArgument { name: "callback" })?;
        callback(&mut self.send.configurator())
    }

    /// Contribute to the bus-wide publish pipe.
    pub fn configure_publish<F>(&mut self, callback: Option<F>) -> Result<(), ConfigurationError>
    where
        F: FnOnce(&mut PipeConfigurator<'_, PublishContext>) -> Result<(), ConfigurationError>,
    {
        let callback = callback.ok_or(ConfigurationError::InvalidArgument { name: "callback" })?;
        callback(&mut self.publish.configurator())
    }

    /// The bus-wide send scope.
    pub fn send(&self) -> &SendPipeScope {
        &self.send
    }

    /// The bus-wide publish scope.
    pub fn publish(&self) -> &PublishPipeScope {
        &self.publish
    }

    /// The bus serialization settings.
    pub fn serialization(&self) -> &SerializationConfiguration {
        &self.serialization
    }

    /// Mutable access to the bus serialization settings.
    pub fn serialization_mut(&mut self) -> &mut SerializationConfiguration {
        &mut self.serialization
    }

    /// The shared topology.
    pub fn topology(&self) -> &Arc<dyn Topology> {
        &self.topology
    }

    /// Validate send, then publish, then topology.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        self.send
            .validate()
            .chain(self.publish.validate())
            .chain(
                self.topology
                    .validate()
                    .into_iter()
                    .map(|result| result.or_source(TOPOLOGY_SOURCE)),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{HeaderSpecification, LogSpecification, RetrySpecification};
    use crate::topology::StaticTopology;
    use pipewright_types::MessageType;

    fn topology() -> Arc<dyn Topology> {
        Arc::new(
            StaticTopology::new()
                .entity(MessageType::named("orders"), "exchange:orders")
                .send_specification(Arc::new(HeaderSpecification::new("x-bus", "main"))),
        )
    }

    #[test]
    fn send_is_seeded_from_topology() {
        let bus = BusConfiguration::new(topology());
        assert_eq!(bus.send().specification().names(), ["header"]);
        assert!(bus.publish().specification().is_empty());
    }

    #[test]
    fn missing_callback_is_rejected() {
        let mut bus = BusConfiguration::new(topology());
        let err = bus
            .configure_publish(
                None::<fn(&mut PipeConfigurator<'_, PublishContext>) -> Result<(), ConfigurationError>>,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::InvalidArgument { name: "callback" }
        ));
    }

    #[test]
    fn validation_runs_send_then_publish_then_topology() {
        let mut bus = BusConfiguration::new(Arc::new(StaticTopology::new()));
        bus.configure_publish(Some(|p: &mut PipeConfigurator<'_, PublishContext>| {
            p.add_pipe_specification(RetrySpecification::immediate(0))
        }))
        .unwrap();
        bus.configure_send(Some(|s: &mut PipeConfigurator<'_, SendContext>| {
            s.add_pipe_specification(LogSpecification::new("out"))?;
            s.add_pipe_specification(HeaderSpecification::new("", "x"))
        }))
        .unwrap();

        let sources: Vec<_> = bus
            .validate()
            .map(|r| r.source.unwrap_or_default())
            .collect();
        assert_eq!(sources, ["send", "publish", "topology"]);
    }
}
