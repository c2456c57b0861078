//! Mock channels for testing without real network.
//!
//! `channel_pair` wires two `MockChannel` halves together; what one half
//! sends, the other receives, in order. `MockDialer` hands out prepared
//! halves so code that dials a data endpoint can be tested end to end.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use scanlink_core::error::{Error, Result};
use scanlink_core::transport::{Channel, Dialer, Frame};

/// One half of an in-memory duplex channel.
pub struct MockChannel {
    tx: Option<mpsc::Sender<Frame>>,
    rx: mpsc::Receiver<Frame>,
}

impl MockChannel {
    /// True once this half has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

/// Create a connected pair of mock channels.
pub fn channel_pair() -> (MockChannel, MockChannel) {
    let (tx_a, rx_a) = mpsc::channel(64);
    let (tx_b, rx_b) = mpsc::channel(64);
    (
        MockChannel {
            tx: Some(tx_a),
            rx: rx_b,
        },
        MockChannel {
            tx: Some(tx_b),
            rx: rx_a,
        },
    )
}

#[async_trait]
impl Channel for MockChannel {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::ConnectionClosed)?;
        tx.send(frame).await.map_err(|_| Error::ConnectionClosed)
    }

    async fn recv(&mut self) -> Result<Option<Frame>> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the sender makes the peer's recv return None.
        self.tx = None;
        Ok(())
    }
}

/// Dialer that hands out prepared channels in order.
#[derive(Default)]
pub struct MockDialer {
    channels: Mutex<VecDeque<MockChannel>>,
    dialed: Mutex<Vec<String>>,
}

impl MockDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a channel for the next `dial` call.
    pub fn push(&self, channel: MockChannel) {
        self.channels.lock().unwrap().push_back(channel);
    }

    /// URLs dialed so far, in order.
    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }

    /// Number of `dial` calls so far.
    pub fn dial_count(&self) -> usize {
        self.dialed.lock().unwrap().len()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, url: &str) -> Result<Box<dyn Channel>> {
        self.dialed.lock().unwrap().push(url.to_string());
        let channel = self
            .channels
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport {
                message: format!("no scripted channel for {url}"),
            })?;
        Ok(Box::new(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_delivers_frames_in_order() {
        let (mut client, mut server) = channel_pair();

        client.send(Frame::Text("one".into())).await.unwrap();
        client.send(Frame::Binary(vec![1, 2, 3])).await.unwrap();

        assert_eq!(server.recv().await.unwrap(), Some(Frame::Text("one".into())));
        assert_eq!(
            server.recv().await.unwrap(),
            Some(Frame::Binary(vec![1, 2, 3]))
        );
    }

    #[tokio::test]
    async fn close_signals_peer() {
        let (mut client, mut server) = channel_pair();
        client.close().await.unwrap();

        assert!(client.is_closed());
        assert_eq!(server.recv().await.unwrap(), None);
        assert!(client.send(Frame::Text("late".into())).await.is_err());
    }

    #[tokio::test]
    async fn dialer_hands_out_scripted_channels() {
        let dialer = MockDialer::new();
        let (half, mut peer) = channel_pair();
        dialer.push(half);

        let mut dialed = dialer.dial("ws://localhost:8082").await.unwrap();
        dialed.send(Frame::Text("hello".into())).await.unwrap();

        assert_eq!(peer.recv().await.unwrap(), Some(Frame::Text("hello".into())));
        assert_eq!(dialer.dialed(), vec!["ws://localhost:8082".to_string()]);
        assert!(dialer.dial("ws://localhost:8082").await.is_err());
    }
}
