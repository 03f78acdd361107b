//! Pipeline scopes: one per pipe kind.
//!
//! A scope pairs a specification aggregator with the configurator surface
//! for its kind. Callers contribute through [`PipeConfigurator`]; only the
//! owning configuration builds.

use std::sync::Arc;

use pipewright_types::{PipeKind, ValidationResult};

use crate::aggregator::{PipeConfigurator, SpecificationAggregator, SpecificationSnapshot};
use crate::context::{
    ConsumeContext, ExceptionReceiveContext, PublishContext, ReceiveContext, SendContext,
};
use crate::error::ConfigurationError;
use crate::observer::ObserverRegistries;
use crate::pipe::{BuiltPipe, Pipe};

/// A scope holding a single aggregator.
#[derive(Debug)]
pub struct PipeScope<C> {
    specification: SpecificationAggregator<C>,
}

/// The outbound send scope.
pub type SendPipeScope = PipeScope<SendContext>;

/// The outbound publish scope.
pub type PublishPipeScope = PipeScope<PublishContext>;

impl<C: 'static> PipeScope<C> {
    /// Create an empty scope.
    pub fn new(kind: PipeKind) -> Self {
        Self {
            specification: SpecificationAggregator::new(kind),
        }
    }

    /// Create a scope seeded with a copy of another scope's specifications.
    pub fn seeded(kind: PipeKind, snapshot: SpecificationSnapshot<C>) -> Self {
        Self {
            specification: SpecificationAggregator::from_snapshot(kind, snapshot),
        }
    }

    /// The contribution surface.
    pub fn configurator(&mut self) -> PipeConfigurator<'_, C> {
        self.specification.configurator()
    }

    /// Read-only access to the specifications.
    pub fn specification(&self) -> &SpecificationAggregator<C> {
        &self.specification
    }

    /// Validate every specification.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        self.specification.validate()
    }

    pub(crate) fn build(&mut self, target: Arc<dyn Pipe<C>>) -> Result<BuiltPipe<C>, ConfigurationError> {
        self.specification.build(target)
    }
}

/// The inbound consume scope, which also owns the configuration observers.
#[derive(Debug)]
pub struct ConsumePipeScope {
    specification: SpecificationAggregator<ConsumeContext>,
    observers: ObserverRegistries,
}

impl ConsumePipeScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::seeded(SpecificationSnapshot::default())
    }

    /// Create a scope seeded with a copy of a parent's specifications.
    ///
    /// Observers are not part of the snapshot; the new scope starts with
    /// empty registries.
    pub fn seeded(snapshot: SpecificationSnapshot<ConsumeContext>) -> Self {
        Self {
            specification: SpecificationAggregator::from_snapshot(PipeKind::Consume, snapshot),
            observers: ObserverRegistries::new(),
        }
    }

    /// The contribution surface.
    pub fn configurator(&mut self) -> PipeConfigurator<'_, ConsumeContext> {
        self.specification.configurator()
    }

    /// Read-only access to the specifications.
    pub fn specification(&self) -> &SpecificationAggregator<ConsumeContext> {
        &self.specification
    }

    /// The consumer, saga and handler observer registries.
    pub fn observers(&self) -> &ObserverRegistries {
        &self.observers
    }

    /// Validate every specification.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        self.specification.validate()
    }

    pub(crate) fn build(
        &mut self,
        target: Arc<dyn Pipe<ConsumeContext>>,
    ) -> Result<BuiltPipe<ConsumeContext>, ConfigurationError> {
        self.specification.build(target)
    }
}

impl Default for ConsumePipeScope {
    fn default() -> Self {
        Self::new()
    }
}

/// The raw receive scope, with nested dead-letter and error scopes.
///
/// Receive configuration is endpoint-local: it is never seeded from a
/// parent.
#[derive(Debug)]
pub struct ReceivePipeScope {
    specification: SpecificationAggregator<ReceiveContext>,
    dead_letter: SpecificationAggregator<ReceiveContext>,
    error: SpecificationAggregator<ExceptionReceiveContext>,
}

/// The three pipes materialized from a receive scope.
#[derive(Debug, Clone)]
pub struct ReceivePipes {
    /// The main receive pipe.
    pub receive: BuiltPipe<ReceiveContext>,
    /// Invoked for messages no consumer matched.
    pub dead_letter: BuiltPipe<ReceiveContext>,
    /// Invoked for messages whose consumption faulted.
    pub error: BuiltPipe<ExceptionReceiveContext>,
}

impl ReceivePipeScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self {
            specification: SpecificationAggregator::new(PipeKind::Receive),
            dead_letter: SpecificationAggregator::new(PipeKind::DeadLetter),
            error: SpecificationAggregator::new(PipeKind::Error),
        }
    }

    /// The receive contribution surface.
    pub fn configurator(&mut self) -> PipeConfigurator<'_, ReceiveContext> {
        self.specification.configurator()
    }

    /// The dead-letter contribution surface.
    pub fn dead_letter_configurator(&mut self) -> PipeConfigurator<'_, ReceiveContext> {
        self.dead_letter.configurator()
    }

    /// The error contribution surface.
    pub fn error_configurator(&mut self) -> PipeConfigurator<'_, ExceptionReceiveContext> {
        self.error.configurator()
    }

    /// Read-only access to the receive specifications.
    pub fn specification(&self) -> &SpecificationAggregator<ReceiveContext> {
        &self.specification
    }

    /// Read-only access to the dead-letter specifications.
    pub fn dead_letter_specification(&self) -> &SpecificationAggregator<ReceiveContext> {
        &self.dead_letter
    }

    /// Read-only access to the error specifications.
    pub fn error_specification(&self) -> &SpecificationAggregator<ExceptionReceiveContext> {
        &self.error
    }

    /// Total specifications across the three pipes.
    pub fn len(&self) -> usize {
        self.specification.len() + self.dead_letter.len() + self.error.len()
    }

    /// Returns true if none of the three pipes has specifications.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate receive, then dead-letter, then error specifications.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        self.specification
            .validate()
            .chain(self.dead_letter.validate())
            .chain(self.error.validate())
    }

    pub(crate) fn build(
        &mut self,
        receive: Arc<dyn Pipe<ReceiveContext>>,
        dead_letter: Arc<dyn Pipe<ReceiveContext>>,
        error: Arc<dyn Pipe<ExceptionReceiveContext>>,
    ) -> Result<ReceivePipes, ConfigurationError> {
        Ok(ReceivePipes {
            receive: self.specification.build(receive)?,
            dead_letter: self.dead_letter.build(dead_letter)?,
            error: self.error.build(error)?,
        })
    }
}

impl Default for ReceivePipeScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{HeaderSpecification, RetrySpecification};
    use crate::pipe::EmptyPipe;

    #[test]
    fn receive_validation_covers_nested_scopes() {
        let mut scope = ReceivePipeScope::new();
        scope
            .configurator()
            .add_pipe_specification(RetrySpecification::immediate(0))
            .unwrap();
        scope
            .dead_letter_configurator()
            .add_pipe_specification(HeaderSpecification::new("", "x"))
            .unwrap();
        scope
            .error_configurator()
            .add_pipe_specification(RetrySpecification::immediate(0))
            .unwrap();

        let sources: Vec<_> = scope
            .validate()
            .map(|r| r.source.unwrap_or_default())
            .collect();
        assert_eq!(sources, ["receive", "dead-letter", "error"]);
    }

    #[test]
    fn receive_build_materializes_all_three_pipes() {
        let mut scope = ReceivePipeScope::new();
        scope
            .error_configurator()
            .add_pipe_specification(HeaderSpecification::new("faulted", "true"))
            .unwrap();

        let pipes = scope
            .build(Arc::new(EmptyPipe), Arc::new(EmptyPipe), Arc::new(EmptyPipe))
            .unwrap();
        assert!(pipes.receive.is_empty());
        assert!(pipes.dead_letter.is_empty());
        assert_eq!(pipes.error.filter_names(), ["header"]);

        let mut ctx = ExceptionReceiveContext::new(ReceiveContext::new("queue:orders"), "boom");
        pipes.error.send(&mut ctx).unwrap();
        assert_eq!(ctx.receive.headers["faulted"], "true");
    }

    #[test]
    fn seeded_scope_copies_specifications() {
        let mut parent = SendPipeScope::new(PipeKind::Send);
        parent
            .configurator()
            .add_pipe_specification(HeaderSpecification::new("a", "1"))
            .unwrap();

        let child = SendPipeScope::seeded(PipeKind::Send, parent.specification().snapshot());
        assert_eq!(child.specification().names(), ["header"]);
    }
}
