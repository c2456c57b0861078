//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::trace;

use super::{Channel, Dialer, Frame};
use crate::error::{Error, Result};

/// A WebSocket-backed channel.
pub struct WsChannel {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

impl WsChannel {
    /// Connect to a WebSocket endpoint.
    pub async fn connect(url: &str) -> Result<Self> {
        let (inner, response) = connect_async(url).await.map_err(|e| Error::Transport {
            message: format!("connect to {url} failed: {e}"),
        })?;
        trace!(url, status = %response.status(), "websocket connected");
        Ok(Self {
            inner,
            closed: false,
        })
    }
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.closed {
            return Err(Error::ConnectionClosed);
        }
        let msg = match frame {
            Frame::Text(s) => WsMessage::Text(s),
            Frame::Binary(b) => WsMessage::Binary(b),
        };
        self.inner.send(msg).await.map_err(|e| Error::Transport {
            message: format!("send failed: {e}"),
        })
    }

    async fn recv(&mut self) -> Result<Option<Frame>> {
        if self.closed {
            return Ok(None);
        }
        loop {
            match self.inner.next().await {
                Some(Ok(WsMessage::Text(s))) => return Ok(Some(Frame::Text(s))),
                Some(Ok(WsMessage::Binary(b))) => return Ok(Some(Frame::Binary(b))),
                // Control frames are handled by tungstenite; skip them.
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => continue,
                Some(Ok(WsMessage::Close(_))) | None => {
                    self.closed = true;
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.closed = true;
                    return Err(Error::Transport {
                        message: format!("recv failed: {e}"),
                    });
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close(None).await.map_err(|e| Error::Transport {
            message: format!("close failed: {e}"),
        })
    }
}

/// Dialer that opens WebSocket channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsDialer;

#[async_trait]
impl Dialer for WsDialer {
    async fn dial(&self, url: &str) -> Result<Box<dyn Channel>> {
        Ok(Box::new(WsChannel::connect(url).await?))
    }
}
