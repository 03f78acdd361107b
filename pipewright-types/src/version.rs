//! Report format versioning.

use core::fmt;

use crate::SCHEMA_VERSION;

/// Version of the serialized [`ValidationReport`](crate::ValidationReport)
/// format.
///
/// Readers accept any report with their own major version. A newer minor
/// version only adds optional fields, which older readers ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaVersion {
    /// Incremented on breaking format changes.
    pub major: u32,
    /// Incremented when optional fields are added.
    pub minor: u32,
}

impl SchemaVersion {
    /// The version this library writes.
    pub const CURRENT: SchemaVersion = SchemaVersion {
        major: SCHEMA_VERSION,
        minor: 0,
    };

    /// Create a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The version this library writes.
    pub const fn current() -> Self {
        Self::CURRENT
    }

    /// Returns true if a reader at this version can read a report written
    /// at `written`.
    pub fn can_read(&self, written: &SchemaVersion) -> bool {
        self.major == written.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
