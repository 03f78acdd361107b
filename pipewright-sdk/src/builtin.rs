//! Built-in specifications.
//!
//! These cover the common cross-cutting concerns; anything else is
//! contributed by implementing [`PipeSpecification`] directly.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pipewright_types::ValidationResult;
use tracing::{debug, info};

use crate::context::MessageContext;
use crate::error::PipeError;
use crate::pipe::{Filter, Pipe, PipeBuilder};
use crate::specification::PipeSpecification;

/// Retry intervals above this produce a validation warning.
pub const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(60);

/// Emits a tracing event for every context entering the pipe.
#[derive(Debug, Clone)]
pub struct LogSpecification {
    label: String,
}

impl LogSpecification {
    /// Create a log specification with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl<C: MessageContext> PipeSpecification<C> for LogSpecification {
    fn name(&self) -> &str {
        "log"
    }

    fn apply(&self, builder: &mut PipeBuilder<C>) {
        builder.add_filter(LogFilter {
            label: self.label.clone(),
        });
    }

    fn validate(&self) -> Vec<ValidationResult> {
        Vec::new()
    }
}

#[derive(Debug)]
struct LogFilter {
    label: String,
}

impl<C: MessageContext> Filter<C> for LogFilter {
    fn name(&self) -> &str {
        "log"
    }

    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError> {
        match ctx.message_type() {
            Some(message_type) => {
                info!(label = %self.label, message_type = %message_type, "context entering pipe")
            }
            None => info!(label = %self.label, "context entering pipe"),
        }
        next.send(ctx)
    }
}

/// Re-sends the remainder of the pipe when it fails.
#[derive(Debug, Clone)]
pub struct RetrySpecification {
    attempts: u32,
    interval: Duration,
}

impl RetrySpecification {
    /// Retry up to `attempts` times, waiting `interval` between attempts.
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Retry immediately, up to `attempts` times.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

impl<C: MessageContext> PipeSpecification<C> for RetrySpecification {
    fn name(&self) -> &str {
        "retry"
    }

    fn apply(&self, builder: &mut PipeBuilder<C>) {
        builder.add_filter(RetryFilter {
            attempts: self.attempts.max(1),
            interval: self.interval,
        });
    }

    fn validate(&self) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        if self.attempts == 0 {
            results.push(ValidationResult::error(
                "retry",
                "attempts must be greater than zero",
            ));
        }
        if self.interval > MAX_RETRY_INTERVAL {
            results.push(ValidationResult::warning(
                "retry",
                format!(
                    "interval of {}s holds the context for a long time",
                    self.interval.as_secs()
                ),
            ));
        }
        results
    }
}

#[derive(Debug)]
struct RetryFilter {
    attempts: u32,
    interval: Duration,
}

impl<C: MessageContext> Filter<C> for RetryFilter {
    fn name(&self) -> &str {
        "retry"
    }

    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError> {
        let mut attempt = 1;
        loop {
            match next.send(ctx) {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.attempts => {
                    return Err(PipeError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    debug!(attempt, error = %err, "retrying pipe");
                    attempt += 1;
                    if !self.interval.is_zero() {
                        std::thread::sleep(self.interval);
                    }
                }
            }
        }
    }
}

/// Sets a header on every context.
#[derive(Debug, Clone)]
pub struct HeaderSpecification {
    name: String,
    value: String,
}

impl HeaderSpecification {
    /// Set header `name` to `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<C: MessageContext> PipeSpecification<C> for HeaderSpecification {
    fn name(&self) -> &str {
        "header"
    }

    fn apply(&self, builder: &mut PipeBuilder<C>) {
        builder.add_filter(HeaderFilter {
            name: self.name.clone(),
            value: self.value.clone(),
        });
    }

    fn validate(&self) -> Vec<ValidationResult> {
        if self.name.trim().is_empty() {
            vec![ValidationResult::error("header", "header name must not be empty")]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug)]
struct HeaderFilter {
    name: String,
    value: String,
}

impl<C: MessageContext> Filter<C> for HeaderFilter {
    fn name(&self) -> &str {
        "header"
    }

    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError> {
        ctx.headers_mut().insert(self.name.clone(), self.value.clone());
        next.send(ctx)
    }
}

type DelegateFn<C> = dyn Fn(&mut C) -> Result<(), PipeError> + Send + Sync;

/// Runs a closure against every context before passing it on.
pub struct DelegateSpecification<C> {
    name: String,
    callback: Arc<DelegateFn<C>>,
}

impl<C> DelegateSpecification<C> {
    /// Create a delegate specification named `name`.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&mut C) -> Result<(), PipeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callback: Arc::new(callback),
        }
    }
}

impl<C> fmt::Debug for DelegateSpecification<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateSpecification")
            .field("name", &self.name)
            .finish()
    }
}

impl<C: 'static> PipeSpecification<C> for DelegateSpecification<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, builder: &mut PipeBuilder<C>) {
        builder.add_filter(DelegateFilter {
            name: self.name.clone(),
            callback: self.callback.clone(),
        });
    }

    fn validate(&self) -> Vec<ValidationResult> {
        if self.name.is_empty() {
            vec![ValidationResult::warning("delegate", "delegate has no name")]
        } else {
            Vec::new()
        }
    }
}

struct DelegateFilter<C> {
    name: String,
    callback: Arc<DelegateFn<C>>,
}

impl<C> fmt::Debug for DelegateFilter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateFilter")
            .field("name", &self.name)
            .finish()
    }
}

impl<C> Filter<C> for DelegateFilter<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, ctx: &mut C, next: &dyn Pipe<C>) -> Result<(), PipeError> {
        (self.callback)(ctx)?;
        next.send(ctx)
    }
}
