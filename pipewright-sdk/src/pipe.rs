//! Filters, pipes and the builder specifications apply themselves to.
//!
//! A built pipe is a chain of filters ending in a target pipe. Each filter
//! decides whether and how to pass the context on to the rest of the chain.

use std::fmt;
use std::sync::Arc;

use crate::error::PipeError;

/// Something a context can be sent into.
pub trait Pipe<C>: Send + Sync {
    /// Send a context through this pipe.
    fn send(&self, ctx: &mut C) -> Result<(), PipeError>;
}

impl<C, F> Pipe<C> for F
where
    F: Fn(&mut C) -> Result<(), PipeError> + Send + Sync,
{
    fn send(&self, ctx: &mut C) -> Result<(), PipeError> {
        self(ctx)
    }
}

/// A single step of a built pipe.
///
/// A filter receives the context and the remainder of the pipe; it calls
/// `next.send(ctx)` to continue, or returns without doing so to stop.
pub trait Filter<C>: Send + Sync + fmt::Debug {
    /// Name used for introspection and diagnostics.
    fn name(&self) -> &str;

    /// Process the context, passing it on to `next` as appropriate.
    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError>;
}

/// A terminal pipe that accepts every context and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPipe;

impl<C> Pipe<C> for EmptyPipe {
    fn send(&self, _ctx: &mut C) -> Result<(), PipeError> {
        Ok(())
    }
}

struct FilterPipe<C> {
    filter: Arc<dyn Filter<C>>,
    next: Arc<dyn Pipe<C>>,
}

impl<C> Pipe<C> for FilterPipe<C> {
    fn send(&self, ctx: &mut C) -> Result<(), PipeError> {
        self.filter.send(ctx, self.next.as_ref())
    }
}

/// Collects the filters contributed by specifications, in order.
pub struct PipeBuilder<C> {
    filters: Vec<Arc<dyn Filter<C>>>,
}

impl<C: 'static> PipeBuilder<C> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Append a filter. Earlier filters see a context first.
    pub fn add_filter<F>(&mut self, filter: F)
    where
        F: Filter<C> + 'static,
    {
        self.filters.push(Arc::new(filter));
    }

    /// Append an already shared filter.
    pub fn add_shared_filter(&mut self, filter: Arc<dyn Filter<C>>) {
        self.filters.push(filter);
    }

    /// Number of filters added so far.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if no filters were added.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub(crate) fn into_filters(self) -> Vec<Arc<dyn Filter<C>>> {
        self.filters
    }

    /// Compose the filters around `target`, first-added outermost.
    pub fn build(self, target: Arc<dyn Pipe<C>>) -> BuiltPipe<C> {
        let filter_names = self.filters.iter().map(|f| f.name().to_string()).collect();

        let mut head = target;
        for filter in self.filters.into_iter().rev() {
            head = Arc::new(FilterPipe { filter, next: head });
        }

        BuiltPipe { head, filter_names }
    }
}

impl<C: 'static> Default for PipeBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// A materialized pipe.
pub struct BuiltPipe<C> {
    head: Arc<dyn Pipe<C>>,
    filter_names: Vec<String>,
}

impl<C> BuiltPipe<C> {
    /// Filter names, outermost first.
    pub fn filter_names(&self) -> &[String] {
        &self.filter_names
    }

    /// Number of filters in front of the target.
    pub fn len(&self) -> usize {
        self.filter_names.len()
    }

    /// Returns true if the pipe sends straight to its target.
    pub fn is_empty(&self) -> bool {
        self.filter_names.is_empty()
    }
}

impl<C> Pipe<C> for BuiltPipe<C> {
    fn send(&self, ctx: &mut C) -> Result<(), PipeError> {
        self.head.send(ctx)
    }
}

impl<C> Clone for BuiltPipe<C> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            filter_names: self.filter_names.clone(),
        }
    }
}

impl<C> fmt::Debug for BuiltPipe<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltPipe")
            .field("filters", &self.filter_names)
            .finish()
    }
}
