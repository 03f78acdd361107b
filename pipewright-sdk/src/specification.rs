//! The specification contract and message-type routing.

use std::fmt;
use std::sync::Arc;

use pipewright_types::{MessageType, ValidationResult};

use crate::context::MessageContext;
use crate::error::PipeError;
use crate::pipe::{Filter, Pipe, PipeBuilder};

/// A caller-supplied unit of pipe behavior.
///
/// Specifications are the only extension point of the engine. Each one
/// contributes zero or more filters when a pipe is built, and reports its
/// own configuration problems when validated. Nothing here interprets what
/// the filters do.
///
/// # Example
///
/// ```rust
/// use pipewright_sdk::{ConsumeContext, PipeBuilder, PipeSpecification};
/// use pipewright_sdk::builtin::HeaderSpecification;
///
/// let spec = HeaderSpecification::new("x-origin", "billing");
/// assert!(PipeSpecification::<ConsumeContext>::validate(&spec).is_empty());
///
/// let mut builder = PipeBuilder::<ConsumeContext>::new();
/// spec.apply(&mut builder);
/// assert_eq!(builder.len(), 1);
/// ```
pub trait PipeSpecification<C>: Send + Sync + fmt::Debug {
    /// Short name, used when describing a configuration.
    fn name(&self) -> &str;

    /// Contribute filters to the pipe being built.
    fn apply(&self, builder: &mut PipeBuilder<C>);

    /// Report problems with this specification. Empty when valid.
    fn validate(&self) -> Vec<ValidationResult>;
}

/// A specification shared between aggregators.
///
/// Forked configurations copy the sequence of references, so a
/// specification is never rebuilt or mutated by being inherited.
pub type SharedSpecification<C> = Arc<dyn PipeSpecification<C>>;

/// Restricts a specification's filters to contexts of one message type.
///
/// The specification is applied as usual, then every filter it contributes
/// is wrapped so that contexts of any other message type bypass it. The
/// check happens inside the built pipe, per context.
#[derive(Debug)]
pub struct MessageTypeSpecification<C> {
    message_type: MessageType,
    inner: SharedSpecification<C>,
    name: String,
}

impl<C> MessageTypeSpecification<C> {
    /// Wrap `inner` so it only applies to `message_type`.
    pub fn new(message_type: MessageType, inner: SharedSpecification<C>) -> Self {
        let name = format!("{}<{}>", inner.name(), message_type.short_name());
        Self {
            message_type,
            inner,
            name,
        }
    }

    /// The message type this specification is bound to.
    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }
}

impl<C> PipeSpecification<C> for MessageTypeSpecification<C>
where
    C: MessageContext + fmt::Debug,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, builder: &mut PipeBuilder<C>) {
        let mut inner = PipeBuilder::new();
        self.inner.apply(&mut inner);

        for filter in inner.into_filters() {
            builder.add_filter(MessageTypeFilter {
                message_type: self.message_type.clone(),
                inner: filter,
            });
        }
    }

    fn validate(&self) -> Vec<ValidationResult> {
        self.inner.validate()
    }
}

#[derive(Debug)]
struct MessageTypeFilter<C> {
    message_type: MessageType,
    inner: Arc<dyn Filter<C>>,
}

impl<C> Filter<C> for MessageTypeFilter<C>
where
    C: MessageContext + fmt::Debug,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError> {
        if ctx.message_type() == Some(&self.message_type) {
            self.inner.send(ctx, next)
        } else {
            next.send(ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::HeaderSpecification;
    use crate::context::ConsumeContext;
    use crate::pipe::EmptyPipe;

    struct OrderSubmitted;
    struct OrderCancelled;

    fn routed() -> MessageTypeSpecification<ConsumeContext> {
        MessageTypeSpecification::new(
            MessageType::of::<OrderSubmitted>(),
            Arc::new(HeaderSpecification::new("routed", "yes")),
        )
    }

    #[test]
    fn filters_run_only_for_matching_message_type() {
        let mut builder = PipeBuilder::new();
        routed().apply(&mut builder);
        let pipe = builder.build(Arc::new(EmptyPipe));

        let mut matching = ConsumeContext::of::<OrderSubmitted>();
        pipe.send(&mut matching).unwrap();
        assert_eq!(matching.headers.get("routed").map(String::as_str), Some("yes"));

        let mut other = ConsumeContext::of::<OrderCancelled>();
        pipe.send(&mut other).unwrap();
        assert!(other.headers.get("routed").is_none());

        let mut untyped = ConsumeContext::default();
        pipe.send(&mut untyped).unwrap();
        assert!(untyped.headers.is_empty());
    }

    #[test]
    fn name_mentions_message_type() {
        assert_eq!(routed().name(), "header<OrderSubmitted>");
    }

    #[test]
    fn validation_passes_through_inner_results() {
        let spec = MessageTypeSpecification::<ConsumeContext>::new(
            MessageType::of::<OrderSubmitted>(),
            Arc::new(HeaderSpecification::new("", "yes")),
        );
        assert_eq!(spec.validate().len(), 1);
    }
}
