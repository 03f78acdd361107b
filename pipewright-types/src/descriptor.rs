//! Runtime type tokens and entity descriptors.
//!
//! Message-specific configuration is keyed by a [`MessageType`] token rather
//! than by compile-time generics, so the same routing works for types known
//! to the compiler and for types named in a configuration file.

use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

use crate::EntityKind;

/// A runtime token identifying a message (or entity) type.
///
/// Two tokens are equal when their names are equal. Tokens created with
/// [`MessageType::of`] use the fully qualified Rust type name.
///
/// # Example
///
/// ```rust
/// use pipewright_types::MessageType;
///
/// struct OrderSubmitted;
///
/// let token = MessageType::of::<OrderSubmitted>();
/// assert!(token.name().ends_with("OrderSubmitted"));
/// assert_eq!(MessageType::named("orders.submitted").name(), "orders.submitted");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MessageType(Cow<'static, str>);

impl MessageType {
    /// Token for a Rust type.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Cow::Borrowed(core::any::type_name::<T>()))
    }

    /// Token for a type known only by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The token's name.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The last path segment of the name, for display.
    pub fn short_name(&self) -> &str {
        let name = self.name();
        let base = name.split('<').next().unwrap_or(name);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&'static str> for MessageType {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

/// Identifies a configured consumer, saga or handler.
///
/// Handlers are identified by the message type they handle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityDescriptor {
    /// Which registry this entity belongs to.
    pub kind: EntityKind,

    /// The entity's type token.
    pub entity_type: MessageType,
}

impl EntityDescriptor {
    /// Create a descriptor from parts.
    pub fn new(kind: EntityKind, entity_type: MessageType) -> Self {
        Self { kind, entity_type }
    }

    /// Descriptor for a consumer type.
    pub fn consumer<T: ?Sized + 'static>() -> Self {
        Self::new(EntityKind::Consumer, MessageType::of::<T>())
    }

    /// Descriptor for a saga type.
    pub fn saga<T: ?Sized + 'static>() -> Self {
        Self::new(EntityKind::Saga, MessageType::of::<T>())
    }

    /// Descriptor for a handler of message type `M`.
    pub fn handler<M: ?Sized + 'static>() -> Self {
        Self::new(EntityKind::Handler, MessageType::of::<M>())
    }
}

impl fmt::Display for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.entity_type.short_name())
    }
}
