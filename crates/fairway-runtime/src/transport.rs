#![forbid(unsafe_code)]

//! The outbound seam to the authority.

use std::fmt;

use fairway_core::wire::ActionMessage;

/// Sends action messages over the persistent channel.
///
/// Implementations encode with [`ActionMessage::encode`] and write one text
/// frame. Delivery is fire-and-forget: the authority answers with a snapshot,
/// an `action-confirmed`, or an `error` frame, all of which arrive through
/// the session's inbound path.
pub trait Transport {
    fn send(&mut self, action: &ActionMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, action: &ActionMessage) -> Result<(), TransportError> {
        (**self).send(action)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, action: &ActionMessage) -> Result<(), TransportError> {
        (**self).send(action)
    }
}

/// Why an action could not be handed to the channel.
#[derive(Debug)]
pub enum TransportError {
    /// The channel is down.
    Closed,
    /// The message could not be encoded.
    Encode(serde_json::Error),
    /// The channel refused the frame.
    Io(std::io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("channel closed"),
            Self::Encode(e) => write!(f, "encode error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Closed => None,
            Self::Encode(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
