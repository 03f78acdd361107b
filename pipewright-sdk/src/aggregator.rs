//! Ordered specification lists and the narrow configurator over them.

use std::fmt;
use std::sync::Arc;

use pipewright_types::{MessageType, PipeKind, ValidationResult};
use tracing::debug;

use crate::context::MessageContext;
use crate::error::ConfigurationError;
use crate::pipe::{BuiltPipe, Pipe, PipeBuilder};
use crate::specification::{MessageTypeSpecification, PipeSpecification, SharedSpecification};

/// An owned copy of an aggregator's specifications, taken at fork time.
///
/// The copy holds references to the same immutable specifications, in the
/// same two tiers, but later additions to either side never reach the other.
pub struct SpecificationSnapshot<C> {
    pre: Vec<SharedSpecification<C>>,
    regular: Vec<SharedSpecification<C>>,
}

impl<C> SpecificationSnapshot<C> {
    /// A snapshot with only regular specifications.
    pub fn from_specifications(regular: Vec<SharedSpecification<C>>) -> Self {
        Self {
            pre: Vec::new(),
            regular,
        }
    }
}

impl<C> Clone for SpecificationSnapshot<C> {
    fn clone(&self) -> Self {
        Self {
            pre: self.pre.clone(),
            regular: self.regular.clone(),
        }
    }
}

impl<C> Default for SpecificationSnapshot<C> {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            regular: Vec::new(),
        }
    }
}

impl<C> fmt::Debug for SpecificationSnapshot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationSnapshot")
            .field("pre", &self.pre.len())
            .field("regular", &self.regular.len())
            .finish()
    }
}

/// The ordered specifications for one pipe kind.
///
/// Specifications are kept in two tiers: pre-pipe entries, then regular
/// entries, each in insertion order. Building applies them in that order,
/// so the first pre-pipe entry (or, without any, the first regular entry)
/// becomes the outermost filter.
///
/// Building is a one-way transition. Once built, the aggregator rejects
/// further additions with [`ConfigurationError::Frozen`] and a second build
/// with [`ConfigurationError::AlreadyBuilt`].
pub struct SpecificationAggregator<C> {
    kind: PipeKind,
    pre: Vec<SharedSpecification<C>>,
    regular: Vec<SharedSpecification<C>>,
    built: bool,
}

impl<C: 'static> SpecificationAggregator<C> {
    /// Create an empty aggregator.
    pub fn new(kind: PipeKind) -> Self {
        Self::from_snapshot(kind, SpecificationSnapshot::default())
    }

    /// Create an aggregator pre-populated from a snapshot.
    pub fn from_snapshot(kind: PipeKind, snapshot: SpecificationSnapshot<C>) -> Self {
        Self {
            kind,
            pre: snapshot.pre,
            regular: snapshot.regular,
            built: false,
        }
    }

    /// The pipe kind this aggregator builds.
    pub fn kind(&self) -> PipeKind {
        self.kind
    }

    /// Append a specification after all regular entries.
    pub fn add(&mut self, spec: SharedSpecification<C>) -> Result<(), ConfigurationError> {
        self.ensure_open()?;
        debug!(kind = %self.kind, spec = spec.name(), "specification added");
        self.regular.push(spec);
        Ok(())
    }

    /// Insert a specification after earlier pre-pipe entries and ahead of
    /// every regular entry.
    pub fn add_first(&mut self, spec: SharedSpecification<C>) -> Result<(), ConfigurationError> {
        self.ensure_open()?;
        debug!(kind = %self.kind, spec = spec.name(), "pre-pipe specification added");
        self.pre.push(spec);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ConfigurationError> {
        if self.built {
            Err(ConfigurationError::Frozen { kind: self.kind })
        } else {
            Ok(())
        }
    }

    /// Every specification in build order.
    pub fn specifications(&self) -> impl Iterator<Item = &SharedSpecification<C>> + '_ {
        self.pre.iter().chain(self.regular.iter())
    }

    /// Specification names in build order.
    pub fn names(&self) -> Vec<String> {
        self.specifications().map(|s| s.name().to_string()).collect()
    }

    /// Number of specifications.
    pub fn len(&self) -> usize {
        self.pre.len() + self.regular.len()
    }

    /// Returns true if no specifications were added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the aggregator has been built.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Copy the current specifications for a forked configuration.
    pub fn snapshot(&self) -> SpecificationSnapshot<C> {
        SpecificationSnapshot {
            pre: self.pre.clone(),
            regular: self.regular.clone(),
        }
    }

    /// Validate every specification, in build order.
    ///
    /// The iterator is lazy and does not stop at the first problem. Each
    /// call starts a fresh pass. Results without a source are attributed to
    /// this aggregator's pipe kind.
    pub fn validate(&self) -> impl Iterator<Item = ValidationResult> + '_ {
        let source = self.kind.as_str();
        self.specifications()
            .flat_map(|spec| spec.validate())
            .map(move |result| result.or_source(source))
    }

    /// Compose every specification's filters around `target`.
    pub fn build(&mut self, target: Arc<dyn Pipe<C>>) -> Result<BuiltPipe<C>, ConfigurationError> {
        if self.built {
            return Err(ConfigurationError::AlreadyBuilt { kind: self.kind });
        }
        self.built = true;

        let mut builder = PipeBuilder::new();
        for spec in self.specifications() {
            spec.apply(&mut builder);
        }
        let pipe = builder.build(target);

        debug!(kind = %self.kind, filters = pipe.len(), "pipe built");
        Ok(pipe)
    }

    /// Borrow the contribution-only surface of this aggregator.
    pub fn configurator(&mut self) -> PipeConfigurator<'_, C> {
        PipeConfigurator { aggregator: self }
    }
}

impl<C> fmt::Debug for SpecificationAggregator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationAggregator")
            .field("kind", &self.kind)
            .field("pre", &self.pre)
            .field("regular", &self.regular)
            .field("built", &self.built)
            .finish()
    }
}

/// The contribution-only view of a pipe's specifications.
///
/// This is what configure callbacks receive: it can add specifications but
/// cannot validate or build.
pub struct PipeConfigurator<'a, C> {
    aggregator: &'a mut SpecificationAggregator<C>,
}

impl<'a, C: 'static> PipeConfigurator<'a, C> {
    /// The pipe kind being configured.
    pub fn kind(&self) -> PipeKind {
        self.aggregator.kind
    }

    /// Append a specification.
    pub fn add_pipe_specification<S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        S: PipeSpecification<C> + 'static,
    {
        self.aggregator.add(Arc::new(spec))
    }

    /// Append an already shared specification.
    pub fn add_shared_pipe_specification(
        &mut self,
        spec: SharedSpecification<C>,
    ) -> Result<(), ConfigurationError> {
        self.aggregator.add(spec)
    }

    /// Insert a specification ahead of every regular specification.
    pub fn add_pre_pipe_specification<S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        S: PipeSpecification<C> + 'static,
    {
        self.aggregator.add_first(Arc::new(spec))
    }

    /// Insert an already shared specification ahead of every regular specification.
    pub fn add_shared_pre_pipe_specification(
        &mut self,
        spec: SharedSpecification<C>,
    ) -> Result<(), ConfigurationError> {
        self.aggregator.add_first(spec)
    }
}

impl<'a, C> PipeConfigurator<'a, C>
where
    C: MessageContext + fmt::Debug,
{
    /// Append a specification that only applies to `message_type`.
    pub fn add_message_pipe_specification(
        &mut self,
        message_type: MessageType,
        spec: SharedSpecification<C>,
    ) -> Result<(), ConfigurationError> {
        self.aggregator
            .add(Arc::new(MessageTypeSpecification::new(message_type, spec)))
    }

    /// Append a specification that only applies to messages of type `M`.
    pub fn add_pipe_specification_for<M, S>(&mut self, spec: S) -> Result<(), ConfigurationError>
    where
        M: ?Sized + 'static,
        S: PipeSpecification<C> + 'static,
    {
        self.add_message_pipe_specification(MessageType::of::<M>(), Arc::new(spec))
    }
}
