//! # pipewright
//!
//! Check message pipeline manifests before an endpoint goes live.
//!
//! A manifest describes a bus (serialization defaults, send and publish
//! specifications, topology) and its endpoints. This crate assembles every
//! endpoint with [`pipewright_sdk`], forking children from their parents,
//! and runs the aggregated validation pass over each one.
//!
//! ## Architecture
//!
//! ```text
//! manifest file ──▶ manifest ──▶ catalog ──▶ report ──▶ text | JSON
//!  (TOML/JSON/YAML)  (serde)    (assemble)   (check)
//! ```
//!
//! - **[`manifest`]**: serde model of the file, loaded with `config`
//! - **[`catalog`]**: maps manifest entries to built-in specifications and
//!   assembles the bus and endpoint configurations
//! - **[`report`]**: validates assembled endpoints and renders the results
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Validate every endpoint; exits non-zero on errors
//! pipewright check bus.toml
//!
//! # Machine-readable output
//! pipewright check bus.toml --format json
//!
//! # Show the resolved specifications per scope
//! pipewright describe bus.toml
//! ```
//!
//! ### As a library
//!
//! ```
//! use pipewright::{check, Assembly, BusManifest, EndpointManifest, SpecManifest};
//!
//! let manifest = BusManifest {
//!     endpoints: vec![EndpointManifest {
//!         name: "orders".into(),
//!         consume: vec![SpecManifest::Retry { attempts: 3, interval_ms: 100 }],
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let assembly = Assembly::from_manifest(&manifest).unwrap();
//! let reports = check(&assembly);
//! assert!(!reports[0].has_errors());
//! ```

pub mod catalog;
pub mod manifest;
pub mod report;

// Re-export main types for convenience
pub use catalog::{Assembly, NamedEndpoint};
pub use manifest::{BusManifest, EndpointManifest, SpecManifest};
pub use report::{check, describe, render_json, render_text, EndpointReport};
