#![forbid(unsafe_code)]

//! A transport that records what it is asked to send.

use fairway_core::wire::ActionMessage;
use fairway_runtime::transport::{Transport, TransportError};

/// Records every sent action and its encoded frame.
///
/// [`close`](Self::close) makes further sends fail with
/// [`TransportError::Closed`], as a dropped channel would.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Vec<ActionMessage>,
    frames: Vec<String>,
    closed: bool,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn reopen(&mut self) {
        self.closed = false;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Every action sent so far.
    #[must_use]
    pub fn sent(&self) -> &[ActionMessage] {
        &self.sent
    }

    /// Encoded text frames, in send order.
    #[must_use]
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Take the actions not yet taken, oldest first.
    pub fn drain(&mut self) -> Vec<ActionMessage> {
        self.frames.clear();
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, action: &ActionMessage) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let frame = action.encode()?;
        self.frames.push(frame);
        self.sent.push(action.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway_core::movement::DrawSource;

    #[test]
    fn records_frames_until_closed() {
        let mut t = RecordingTransport::new();
        t.send(&ActionMessage::Draw {
            source: DrawSource::Deck,
        })
        .unwrap();
        assert_eq!(t.frames(), [r#"{"type":"draw","source":"deck"}"#.to_string()]);
        t.close();
        assert!(matches!(
            t.send(&ActionMessage::Discard),
            Err(TransportError::Closed)
        ));
        assert_eq!(t.drain().len(), 1);
        assert!(t.sent().is_empty());
    }
}
