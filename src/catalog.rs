//! Turns a manifest into bus and endpoint configurations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use pipewright_sdk::builtin::{HeaderSpecification, LogSpecification, RetrySpecification};
use pipewright_sdk::{
    BusConfiguration, ConsumeContext, EndpointConfiguration, ExceptionReceiveContext,
    MessageContext, MessageType, PipeConfigurator, PublishContext, ReceiveContext, SendContext,
    SerializationConfiguration, SharedSpecification, StaticTopology,
};
use tracing::debug;

use crate::manifest::{BusManifest, EndpointManifest, SerializationManifest, SpecManifest};

/// Create the specification a manifest entry describes.
pub fn specification<C: MessageContext>(manifest: &SpecManifest) -> SharedSpecification<C> {
    match manifest {
        SpecManifest::Log { label } => Arc::new(LogSpecification::new(label.clone())),
        SpecManifest::Retry {
            attempts,
            interval_ms,
        } => Arc::new(RetrySpecification::new(
            *attempts,
            Duration::from_millis(*interval_ms),
        )),
        SpecManifest::Header { name, value } => {
            Arc::new(HeaderSpecification::new(name.clone(), value.clone()))
        }
    }
}

fn add_all<C: MessageContext>(
    configurator: &mut PipeConfigurator<'_, C>,
    specs: &[SpecManifest],
) -> Result<(), pipewright_sdk::ConfigurationError> {
    for spec in specs {
        configurator.add_shared_pipe_specification(specification(spec))?;
    }
    Ok(())
}

fn apply_serialization(target: &mut SerializationConfiguration, manifest: &SerializationManifest) {
    if let Some(content_type) = &manifest.content_type {
        target.set_content_type(content_type.clone());
    }
    for deserializer in &manifest.deserializers {
        target.add_deserializer(deserializer.clone());
    }
}

/// An endpoint configuration and where it came from.
#[derive(Debug)]
pub struct NamedEndpoint {
    /// The endpoint name.
    pub name: String,
    /// The endpoint it was forked from, if any.
    pub parent: Option<String>,
    /// The assembled configuration.
    pub configuration: EndpointConfiguration,
}

/// A bus and its endpoints, assembled from a manifest.
#[derive(Debug)]
pub struct Assembly {
    /// Bus-wide defaults.
    pub bus: BusConfiguration,
    /// Endpoints in declaration order.
    pub endpoints: Vec<NamedEndpoint>,
}

impl Assembly {
    /// Assemble every endpoint in `manifest`.
    ///
    /// Endpoints naming a parent are forked from it; the parent must be
    /// declared earlier. Other endpoints start from the bus defaults.
    pub fn from_manifest(manifest: &BusManifest) -> Result<Self> {
        let mut topology = StaticTopology::new();
        for entity in &manifest.topology.entities {
            topology = topology.entity(
                MessageType::named(entity.message.clone()),
                entity.destination.clone(),
            );
        }

        let mut bus = BusConfiguration::new(Arc::new(topology));
        apply_serialization(bus.serialization_mut(), &manifest.serialization);
        bus.configure_send(Some(|s: &mut PipeConfigurator<'_, SendContext>| {
            add_all(s, &manifest.send)
        }))
        .context("Failed to configure bus send pipe")?;
        bus.configure_publish(Some(|p: &mut PipeConfigurator<'_, PublishContext>| {
            add_all(p, &manifest.publish)
        }))
        .context("Failed to configure bus publish pipe")?;

        let mut endpoints: Vec<NamedEndpoint> = Vec::with_capacity(manifest.endpoints.len());
        for endpoint in &manifest.endpoints {
            if endpoints.iter().any(|e| e.name == endpoint.name) {
                bail!("Endpoint {:?} is declared more than once", endpoint.name);
            }

            let mut configuration = match &endpoint.parent {
                Some(parent) => match endpoints.iter().find(|e| &e.name == parent) {
                    Some(parent) => parent.configuration.fork(),
                    None => bail!(
                        "Endpoint {:?} names parent {:?}, which is not declared before it",
                        endpoint.name,
                        parent
                    ),
                },
                None => EndpointConfiguration::from_bus(&bus),
            };

            configure(&mut configuration, endpoint)
                .with_context(|| format!("Failed to configure endpoint {:?}", endpoint.name))?;
            debug!(endpoint = %endpoint.name, parent = ?endpoint.parent, "endpoint assembled");

            endpoints.push(NamedEndpoint {
                name: endpoint.name.clone(),
                parent: endpoint.parent.clone(),
                configuration,
            });
        }

        Ok(Self { bus, endpoints })
    }

    /// Look up an assembled endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&NamedEndpoint> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

fn configure(
    configuration: &mut EndpointConfiguration,
    manifest: &EndpointManifest,
) -> Result<(), pipewright_sdk::ConfigurationError> {
    for spec in &manifest.pre_consume {
        configuration.configure_consume(Some(|c: &mut PipeConfigurator<'_, ConsumeContext>| {
            c.add_shared_pre_pipe_specification(specification(spec))
        }))?;
    }
    for spec in &manifest.consume {
        configuration.add_shared_pipe_specification(specification(spec))?;
    }
    for message in &manifest.messages {
        for spec in &message.specs {
            configuration.add_message_pipe_specification(
                MessageType::named(message.message.clone()),
                specification(spec),
            )?;
        }
    }

    configuration.configure_send(Some(|s: &mut PipeConfigurator<'_, SendContext>| {
        add_all(s, &manifest.send)
    }))?;
    configuration.configure_publish(Some(|p: &mut PipeConfigurator<'_, PublishContext>| {
        add_all(p, &manifest.publish)
    }))?;
    configuration.configure_receive(Some(|r: &mut PipeConfigurator<'_, ReceiveContext>| {
        add_all(r, &manifest.receive)
    }))?;
    configuration.configure_dead_letter(Some(|r: &mut PipeConfigurator<'_, ReceiveContext>| {
        add_all(r, &manifest.dead_letter)
    }))?;
    configuration.configure_error(Some(
        |e: &mut PipeConfigurator<'_, ExceptionReceiveContext>| add_all(e, &manifest.error),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{EntityManifest, MessageManifest};
    use pipewright_sdk::{Pipe, PipeTargets};

    fn retry(attempts: u32) -> SpecManifest {
        SpecManifest::Retry {
            attempts,
            interval_ms: 0,
        }
    }

    fn log(label: &str) -> SpecManifest {
        SpecManifest::Log {
            label: label.into(),
        }
    }

    fn manifest() -> BusManifest {
        BusManifest {
            send: vec![SpecManifest::Header {
                name: "x-origin".into(),
                value: "bus".into(),
            }],
            topology: crate::manifest::TopologyManifest {
                entities: vec![EntityManifest {
                    message: "orders.submitted".into(),
                    destination: "exchange:orders".into(),
                }],
            },
            endpoints: vec![
                EndpointManifest {
                    name: "orders".into(),
                    consume: vec![retry(3)],
                    receive: vec![log("raw")],
                    ..Default::default()
                },
                EndpointManifest {
                    name: "orders-priority".into(),
                    parent: Some("orders".into()),
                    pre_consume: vec![log("priority")],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_root_endpoints_start_from_bus() {
        let assembly = Assembly::from_manifest(&manifest()).unwrap();
        let orders = &assembly.endpoint("orders").unwrap().configuration;

        assert_eq!(orders.send().specification().names(), ["header"]);
        assert_eq!(orders.consume().specification().names(), ["retry"]);
        assert_eq!(orders.receive().specification().names(), ["log"]);
    }

    #[test]
    fn test_child_endpoints_fork_from_parent() {
        let assembly = Assembly::from_manifest(&manifest()).unwrap();
        let child = &assembly.endpoint("orders-priority").unwrap().configuration;
        let parent = &assembly.endpoint("orders").unwrap().configuration;

        assert_eq!(child.consume().specification().names(), ["log", "retry"]);
        assert_eq!(child.send().specification().names(), ["header"]);
        assert!(child.receive().is_empty());
        assert_eq!(parent.consume().specification().names(), ["retry"]);
    }

    #[test]
    fn test_parent_must_be_declared_first() {
        let mut manifest = manifest();
        manifest.endpoints.reverse();

        let err = Assembly::from_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("not declared before it"));
    }

    #[test]
    fn test_duplicate_endpoint_names_are_rejected() {
        let mut manifest = manifest();
        manifest.endpoints[1].name = "orders".into();
        manifest.endpoints[1].parent = None;

        let err = Assembly::from_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_message_specifications_only_apply_to_their_message() {
        let mut manifest = manifest();
        manifest.endpoints[0].messages = vec![MessageManifest {
            message: "orders.submitted".into(),
            specs: vec![SpecManifest::Header {
                name: "submitted".into(),
                value: "yes".into(),
            }],
        }];

        let mut assembly = Assembly::from_manifest(&manifest).unwrap();
        let orders = &mut assembly.endpoints[0].configuration;
        let pipes = orders.build(PipeTargets::default()).unwrap();

        let mut submitted = ConsumeContext::new(MessageType::named("orders.submitted"));
        pipes.consume.send(&mut submitted).unwrap();
        assert_eq!(submitted.headers["submitted"], "yes");

        let mut cancelled = ConsumeContext::new(MessageType::named("orders.cancelled"));
        pipes.consume.send(&mut cancelled).unwrap();
        assert!(!cancelled.headers.contains_key("submitted"));
    }

    #[test]
    fn test_serialization_settings_reach_endpoints() {
        let mut manifest = manifest();
        manifest.serialization = SerializationManifest {
            content_type: Some("application/xml".into()),
            deserializers: vec!["application/xml".into()],
        };

        let assembly = Assembly::from_manifest(&manifest).unwrap();
        let child = &assembly.endpoint("orders-priority").unwrap().configuration;
        assert_eq!(child.serialization().content_type(), "application/xml");
        assert!(child.serialization().supports("application/json"));
    }
}
