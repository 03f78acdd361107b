//! Checking assembled endpoints and rendering the results.

use std::fmt::Write as _;

use anyhow::Result;
use pipewright_sdk::{EndpointConfiguration, SpecificationAggregator};
use pipewright_types::ValidationReport;
use serde::Serialize;

use crate::catalog::Assembly;

/// The validation outcome for one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointReport {
    /// The endpoint name.
    pub endpoint: String,
    /// Everything the validation pass reported.
    pub report: ValidationReport,
}

impl EndpointReport {
    /// Returns true if the endpoint would refuse to build.
    pub fn has_errors(&self) -> bool {
        self.report.has_errors()
    }
}

/// Validate one endpoint, including its serialization settings.
pub fn check_endpoint(name: &str, configuration: &EndpointConfiguration) -> EndpointReport {
    let mut report = configuration.validation_report();
    report.extend(configuration.serialization().validate());
    EndpointReport {
        endpoint: name.to_string(),
        report,
    }
}

/// Validate every endpoint in declaration order.
pub fn check(assembly: &Assembly) -> Vec<EndpointReport> {
    assembly
        .endpoints
        .iter()
        .map(|e| check_endpoint(&e.name, &e.configuration))
        .collect()
}

/// Render reports for a terminal.
pub fn render_text(reports: &[EndpointReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(
            out,
            "{}: {} error(s), {} warning(s)",
            report.endpoint,
            report.report.errors().count(),
            report.report.warnings().count()
        );
        for result in report.report.iter() {
            let _ = writeln!(out, "  {}", result);
        }
    }
    if reports.is_empty() {
        out.push_str("no endpoints declared\n");
    }
    out
}

/// Render reports as pretty-printed JSON.
pub fn render_json(reports: &[EndpointReport]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

fn names<C: 'static>(aggregator: &SpecificationAggregator<C>) -> String {
    let names = aggregator.names();
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

/// Describe the resolved specifications of every endpoint, scope by scope.
pub fn describe(assembly: &Assembly) -> String {
    let mut out = String::new();
    for endpoint in &assembly.endpoints {
        let origin = match &endpoint.parent {
            Some(parent) => format!("forked from {}", parent),
            None => "from bus".to_string(),
        };
        let config = &endpoint.configuration;
        let _ = writeln!(out, "{} ({})", endpoint.name, origin);
        let _ = writeln!(out, "  consume:     {}", names(config.consume().specification()));
        let _ = writeln!(out, "  send:        {}", names(config.send().specification()));
        let _ = writeln!(out, "  publish:     {}", names(config.publish().specification()));
        let _ = writeln!(out, "  receive:     {}", names(config.receive().specification()));
        let _ = writeln!(
            out,
            "  dead-letter: {}",
            names(config.receive().dead_letter_specification())
        );
        let _ = writeln!(
            out,
            "  error:       {}",
            names(config.receive().error_specification())
        );
        let _ = writeln!(
            out,
            "  content-type: {}",
            config.serialization().content_type()
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{BusManifest, EndpointManifest, SpecManifest};

    fn assembly(consume: Vec<SpecManifest>) -> Assembly {
        let manifest = BusManifest {
            endpoints: vec![EndpointManifest {
                name: "orders".into(),
                consume,
                ..Default::default()
            }],
            ..Default::default()
        };
        Assembly::from_manifest(&manifest).unwrap()
    }

    #[test]
    fn test_check_reports_errors_and_topology_warning() {
        let reports = check(&assembly(vec![SpecManifest::Retry {
            attempts: 0,
            interval_ms: 0,
        }]));

        assert_eq!(reports.len(), 1);
        assert!(reports[0].has_errors());
        // An empty topology always warns.
        assert_eq!(reports[0].report.warnings().count(), 1);
        assert_eq!(
            reports[0].report.results[0].source.as_deref(),
            Some("consume")
        );
    }

    #[test]
    fn test_render_text_lists_every_result() {
        let reports = check(&assembly(vec![SpecManifest::Header {
            name: String::new(),
            value: "x".into(),
        }]));
        let text = render_text(&reports);

        assert!(text.starts_with("orders: 1 error(s), 1 warning(s)"));
        assert!(text.contains("[consume] error header: header name must not be empty"));
    }

    #[test]
    fn test_render_json_round_trips_through_serde_json() {
        let reports = check(&assembly(Vec::new()));
        let json = render_json(&reports).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["endpoint"], "orders");
        assert_eq!(value[0]["report"]["results"][0]["severity"], "warning");
    }

    #[test]
    fn test_describe_shows_each_scope() {
        let text = describe(&assembly(vec![SpecManifest::Log {
            label: "in".into(),
        }]));

        assert!(text.contains("orders (from bus)"));
        assert!(text.contains("consume:     log"));
        assert!(text.contains("receive:     -"));
        assert!(text.contains("content-type: application/json"));
    }
}
