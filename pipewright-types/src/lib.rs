//! # pipewright-types
//!
//! Core types shared by every layer of pipewright. This crate defines the
//! plain data that flows out of the configuration engine: validation results
//! and reports, the pipeline and entity kinds, and the runtime type tokens
//! used to route message-specific configuration.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to emit reports as JSON
//! - **Validation is data**: Problems are values, never panics or errors
//! - **Versioned reports**: Reports carry a schema version for forward compatibility
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON/YAML/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use pipewright_types::{ValidationReport, ValidationResult};
//!
//! let report: ValidationReport = vec![
//!     ValidationResult::error("retry", "attempts must be greater than zero").with_source("consume"),
//!     ValidationResult::warning("topology", "no message types are mapped"),
//! ]
//! .into_iter()
//! .collect();
//!
//! assert!(report.has_errors());
//! assert_eq!(report.errors().count(), 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod descriptor;
mod kind;
mod validation;
mod version;

pub use descriptor::*;
pub use kind::*;
pub use validation::*;
pub use version::*;

/// Current report schema version.
///
/// Increment this when making breaking changes to the serialized report format.
pub const SCHEMA_VERSION: u32 = 1;
