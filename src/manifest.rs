//! Manifest files describing a bus and its endpoints.
//!
//! A manifest is read with the `config` crate, so TOML, JSON and YAML all
//! work. Any key can be overridden from the environment: the variable name
//! is `PIPEWRIGHT`, then the key path, joined by double underscores. For
//! example `PIPEWRIGHT__SERIALIZATION__CONTENT_TYPE=application/xml` sets
//! `serialization.content_type`.
//!
//! ```toml
//! [serialization]
//! content_type = "application/json"
//!
//! [[send]]
//! kind = "header"
//! name = "x-origin"
//! value = "orders-service"
//!
//! [[topology.entities]]
//! message = "orders.submitted"
//! destination = "exchange:orders"
//!
//! [[endpoints]]
//! name = "orders"
//! consume = [{ kind = "retry", attempts = 3, interval_ms = 200 }]
//!
//! [[endpoints]]
//! name = "orders-priority"
//! parent = "orders"
//! pre_consume = [{ kind = "log", label = "priority" }]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// A whole bus: defaults, topology and endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusManifest {
    /// Bus-wide serialization settings.
    pub serialization: SerializationManifest,
    /// Bus-wide send specifications.
    pub send: Vec<SpecManifest>,
    /// Bus-wide publish specifications.
    pub publish: Vec<SpecManifest>,
    /// Message addressing.
    pub topology: TopologyManifest,
    /// Endpoints, in declaration order.
    pub endpoints: Vec<EndpointManifest>,
}

/// Serialization settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationManifest {
    /// Outbound content type; the bus default when unset.
    pub content_type: Option<String>,
    /// Additional inbound content types.
    pub deserializers: Vec<String>,
}

/// Message-type to destination mappings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyManifest {
    /// Mapped message types.
    pub entities: Vec<EntityManifest>,
}

/// One message-type mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityManifest {
    /// The message type name.
    pub message: String,
    /// Where messages of that type are addressed.
    pub destination: String,
}

/// One endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointManifest {
    /// Unique endpoint name.
    pub name: String,
    /// An earlier endpoint to fork from. Without one the endpoint starts
    /// from the bus defaults.
    pub parent: Option<String>,
    /// Consume specifications.
    pub consume: Vec<SpecManifest>,
    /// Consume specifications placed ahead of every other consume entry.
    pub pre_consume: Vec<SpecManifest>,
    /// Send specifications.
    pub send: Vec<SpecManifest>,
    /// Publish specifications.
    pub publish: Vec<SpecManifest>,
    /// Receive specifications.
    pub receive: Vec<SpecManifest>,
    /// Dead-letter specifications.
    pub dead_letter: Vec<SpecManifest>,
    /// Error specifications.
    pub error: Vec<SpecManifest>,
    /// Consume specifications bound to a single message type.
    pub messages: Vec<MessageManifest>,
}

/// Consume specifications for one message type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageManifest {
    /// The message type name.
    pub message: String,
    /// Specifications applied only to that message type.
    #[serde(default)]
    pub specs: Vec<SpecManifest>,
}

/// A built-in specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpecManifest {
    /// Log every context.
    Log {
        /// Label attached to each event.
        label: String,
    },
    /// Retry the rest of the pipe.
    Retry {
        /// Maximum attempts.
        attempts: u32,
        /// Delay between attempts.
        #[serde(default)]
        interval_ms: u64,
    },
    /// Set a header.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
}

impl BusManifest {
    /// Load a manifest, applying `PIPEWRIGHT__*` environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_environment(path, Self::environment())
    }

    /// The environment source used by [`load`](Self::load).
    pub fn environment() -> Environment {
        Environment::with_prefix("PIPEWRIGHT").separator("__")
    }

    /// Load a manifest with an explicit environment source layered on top.
    pub fn load_with_environment(path: &Path, environment: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;

        config
            .try_deserialize()
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Look up an endpoint by name.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointManifest> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_manifest() {
        let file = write(
            ".toml",
            r#"
[[send]]
kind = "header"
name = "x-origin"
value = "orders"

[[topology.entities]]
message = "orders.submitted"
destination = "exchange:orders"

[[endpoints]]
name = "orders"
consume = [{ kind = "retry", attempts = 3, interval_ms = 200 }]

[[endpoints.messages]]
message = "orders.submitted"
specs = [{ kind = "log", label = "submitted" }]

[[endpoints]]
name = "orders-priority"
parent = "orders"
"#,
        );

        let manifest = BusManifest::load(file.path()).unwrap();

        assert_eq!(
            manifest.send,
            [SpecManifest::Header {
                name: "x-origin".into(),
                value: "orders".into()
            }]
        );
        assert_eq!(manifest.topology.entities.len(), 1);
        assert_eq!(manifest.endpoints.len(), 2);

        let orders = manifest.endpoint("orders").unwrap();
        assert_eq!(
            orders.consume,
            [SpecManifest::Retry {
                attempts: 3,
                interval_ms: 200
            }]
        );
        assert_eq!(orders.messages[0].message, "orders.submitted");

        let priority = manifest.endpoint("orders-priority").unwrap();
        assert_eq!(priority.parent.as_deref(), Some("orders"));
        assert!(priority.consume.is_empty());
    }

    #[test]
    fn test_load_json_manifest() {
        let file = write(
            ".json",
            r#"{
  "serialization": { "content_type": "application/xml", "deserializers": ["application/xml"] },
  "endpoints": [{ "name": "audit", "receive": [{ "kind": "log", "label": "raw" }] }]
}"#,
        );

        let manifest = BusManifest::load(file.path()).unwrap();
        assert_eq!(
            manifest.serialization.content_type.as_deref(),
            Some("application/xml")
        );
        assert_eq!(manifest.endpoints[0].receive.len(), 1);
    }

    #[test]
    fn test_environment_overrides_nested_keys() {
        let file = write(
            ".toml",
            r#"
[serialization]
content_type = "application/json"

[[endpoints]]
name = "orders"
"#,
        );
        let vars = config::Map::from([(
            "PIPEWRIGHT__SERIALIZATION__CONTENT_TYPE".to_string(),
            "application/xml".to_string(),
        )]);

        let manifest = BusManifest::load_with_environment(
            file.path(),
            BusManifest::environment().source(Some(vars)),
        )
        .unwrap();

        assert_eq!(
            manifest.serialization.content_type.as_deref(),
            Some("application/xml")
        );
        assert_eq!(manifest.endpoints[0].name, "orders");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BusManifest::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read manifest"));
    }

    #[test]
    fn test_unknown_spec_kind_is_an_error() {
        let file = write(
            ".toml",
            r#"
[[endpoints]]
name = "orders"
consume = [{ kind = "teleport" }]
"#,
        );
        let err = BusManifest::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid manifest"));
    }
}
