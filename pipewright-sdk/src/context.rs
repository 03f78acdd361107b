//! Context types that flow through each kind of pipe.

use std::collections::BTreeMap;

use pipewright_types::MessageType;

/// Message headers, ordered by name.
pub type Headers = BTreeMap<String, String>;

/// Common surface shared by every pipe context.
///
/// Message-type routing and header specifications are written against this
/// trait so they work for any pipe kind.
pub trait MessageContext: Send + 'static {
    /// The message type, once known. Raw receive contexts have none.
    fn message_type(&self) -> Option<&MessageType>;

    /// Message headers.
    fn headers(&self) -> &Headers;

    /// Mutable message headers.
    fn headers_mut(&mut self) -> &mut Headers;
}

macro_rules! typed_context {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            /// The message type carried by this context.
            pub message_type: Option<MessageType>,
            /// Message headers.
            pub headers: Headers,
            /// Serialized message body.
            pub body: Vec<u8>,
        }

        impl $name {
            /// Create a context for a message of the given type.
            pub fn new(message_type: MessageType) -> Self {
                Self {
                    message_type: Some(message_type),
                    ..Default::default()
                }
            }

            /// Create a context for a message of Rust type `T`.
            pub fn of<T: ?Sized + 'static>() -> Self {
                Self::new(MessageType::of::<T>())
            }
        }

        impl MessageContext for $name {
            fn message_type(&self) -> Option<&MessageType> {
                self.message_type.as_ref()
            }

            fn headers(&self) -> &Headers {
                &self.headers
            }

            fn headers_mut(&mut self) -> &mut Headers {
                &mut self.headers
            }
        }
    };
}

typed_context! {
    /// Context for a message being consumed.
    ConsumeContext
}

typed_context! {
    /// Context for a message being sent to a specific destination.
    SendContext
}

typed_context! {
    /// Context for a message being published.
    PublishContext
}

/// Context for a raw message received from a transport, before deserialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiveContext {
    /// Address the message was received from.
    pub input_address: String,
    /// Transport headers.
    pub headers: Headers,
    /// Raw body.
    pub body: Vec<u8>,
}

impl ReceiveContext {
    /// Create a receive context for the given input address.
    pub fn new(input_address: impl Into<String>) -> Self {
        Self {
            input_address: input_address.into(),
            ..Default::default()
        }
    }
}

impl MessageContext for ReceiveContext {
    fn message_type(&self) -> Option<&MessageType> {
        None
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }
}

/// A receive context whose consumption raised a fault.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionReceiveContext {
    /// The original receive context.
    pub receive: ReceiveContext,
    /// Description of the fault.
    pub fault: String,
}

impl ExceptionReceiveContext {
    /// Wrap a receive context with a fault description.
    pub fn new(receive: ReceiveContext, fault: impl Into<String>) -> Self {
        Self {
            receive,
            fault: fault.into(),
        }
    }
}

impl MessageContext for ExceptionReceiveContext {
    fn message_type(&self) -> Option<&MessageType> {
        None
    }

    fn headers(&self) -> &Headers {
        &self.receive.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.receive.headers
    }
}
