//! Validation results - problems reported as data rather than errors.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::SchemaVersion;

/// Whether a validation result blocks a pipeline from being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    /// Suspicious but buildable configuration.
    Warning,
    /// Configuration that must not go live.
    Error,
}

impl Severity {
    /// Lowercase label used in rendered reports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found while validating a configuration.
///
/// `key` names the thing that was validated (a specification, a setting, a
/// destination), `message` describes the problem, and `source` names the
/// collaborator that reported it. Aggregators stamp a missing source with
/// their pipe kind, so results coming out of an endpoint always say where
/// they were found.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationResult {
    /// How serious the problem is.
    pub severity: Severity,

    /// What was validated.
    pub key: String,

    /// Human-readable description of the problem.
    pub message: String,

    /// Which collaborator reported the problem.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub source: Option<String>,
}

impl ValidationResult {
    /// Create a result with an explicit severity.
    pub fn new(severity: Severity, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an error-severity result.
    pub fn error(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, key, message)
    }

    /// Create a warning-severity result.
    pub fn warning(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, key, message)
    }

    /// Set the reporting source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the source only if none was recorded yet.
    pub fn or_source(mut self, source: &str) -> Self {
        if self.source.is_none() {
            self.source = Some(source.into());
        }
        self
    }

    /// Returns true for error-severity results.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(
                f,
                "[{}] {} {}: {}",
                source, self.severity, self.key, self.message
            ),
            None => write!(f, "{} {}: {}", self.severity, self.key, self.message),
        }
    }
}

/// Collected results of a validation pass, in reporting order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationReport {
    /// Schema version for forward compatibility.
    #[cfg_attr(feature = "serde", serde(default))]
    pub version: SchemaVersion,

    /// Every result, in the order the collaborators reported them.
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over error-severity results.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.severity == Severity::Error)
    }

    /// Iterate over warning-severity results.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.severity == Severity::Warning)
    }

    /// Returns `true` if any result is an error.
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(ValidationResult::is_error)
    }

    /// Returns `true` if there are no errors (warnings are acceptable).
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Total number of results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterate over all results.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter()
    }
}

impl FromIterator<ValidationResult> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = ValidationResult>>(iter: I) -> Self {
        Self {
            version: SchemaVersion::current(),
            results: iter.into_iter().collect(),
        }
    }
}

impl Extend<ValidationResult> for ValidationReport {
    fn extend<I: IntoIterator<Item = ValidationResult>>(&mut self, iter: I) {
        self.results.extend(iter);
    }
}

impl IntoIterator for ValidationReport {
    type Item = ValidationResult;
    type IntoIter = alloc::vec::IntoIter<ValidationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.results.is_empty() {
            return f.write_str("no problems found");
        }
        for (i, result) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", result)?;
        }
        Ok(())
    }
}
