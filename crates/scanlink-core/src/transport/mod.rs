//! Transport abstractions for scanlink.
//!
//! The protocol only needs a duplex, message-oriented channel that
//! distinguishes text from binary frames. `Channel` abstracts over the real
//! WebSocket transport and the in-memory mock used in tests; `Dialer`
//! abstracts connection establishment so the upload engine can open its
//! dedicated data connection through the same seam.

mod ws;

pub use ws::{WsChannel, WsDialer};

use async_trait::async_trait;

use crate::error::Result;

/// One message on a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON command/response frame.
    Text(String),
    /// Bulk binary payload (compressed image, upload slice).
    Binary(Vec<u8>),
}

impl Frame {
    /// Byte length of the frame payload.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    /// True if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A duplex message-oriented channel.
///
/// Within one channel, frames are delivered in arrival order. No ordering
/// holds across two channels.
#[async_trait]
pub trait Channel: Send {
    /// Send a frame.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Receive the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<Frame>>;

    /// Close the channel. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

/// Opens channels to an endpoint.
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Establish a channel to `url`.
    async fn dial(&self, url: &str) -> Result<Box<dyn Channel>>;
}
