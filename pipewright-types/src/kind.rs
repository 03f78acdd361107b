//! Pipeline and entity kinds.

use core::fmt;

/// A named category of message processing with its own specification list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PipeKind {
    /// Inbound consumption of typed messages.
    Consume,
    /// Outbound point-to-point sends.
    Send,
    /// Outbound publishing.
    Publish,
    /// Raw receipt, before deserialization.
    Receive,
    /// Messages received that no consumer matched.
    DeadLetter,
    /// Messages whose consumption raised a fault.
    Error,
}

impl PipeKind {
    /// Label used as the validation source and in rendered output.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PipeKind::Consume => "consume",
            PipeKind::Send => "send",
            PipeKind::Publish => "publish",
            PipeKind::Receive => "receive",
            PipeKind::DeadLetter => "dead-letter",
            PipeKind::Error => "error",
        }
    }
}

impl fmt::Display for PipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kinds of entity whose configuration can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntityKind {
    /// A message consumer.
    Consumer,
    /// A long-lived saga (process manager).
    Saga,
    /// A single-message handler.
    Handler,
}

impl EntityKind {
    /// Lowercase label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Consumer => "consumer",
            EntityKind::Saga => "saga",
            EntityKind::Handler => "handler",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
