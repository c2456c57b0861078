//! Chunked upload engine.
//!
//! Uploads run over a dedicated data connection negotiated on the control
//! channel: the client announces the transfer with `uploadimage`, waits for
//! `datasocketready`, then dials the data endpoint and streams the payload
//! as fixed-size binary slices. Flow control is stop-and-wait: one slice in
//! flight, the next sent only after the server's `nextpacket`. The server's
//! `uploadcomplete` ends the session.
//!
//! The data connection is owned by the session and closed on success and on
//! failure. No timeout guards the ack loop; a silent server stalls the
//! upload (callers may wrap `upload` in `tokio::time::timeout`).

use tracing::{debug, info, trace, warn};

use scanlink_core::constants::DEFAULT_PACKET_SIZE;
use scanlink_core::protocol::{Codec, DataReply, UploadMetadata};
use scanlink_core::transport::{Channel, Dialer, Frame};
use scanlink_core::{Error, Result};

use crate::control::ControlClient;

/// An upload to hand to the engine.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Serialized image bytes.
    pub payload: Vec<u8>,
    /// Name the server stores the file under.
    pub filename: String,
    /// Serialized image header, passed through opaquely.
    pub header: serde_json::Value,
    /// Bytes per image element.
    pub storage_size: u32,
    /// Slice size for the data channel.
    pub packet_size: usize,
}

impl UploadRequest {
    /// Build a request with the default packet size and an empty header.
    pub fn new(payload: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            payload,
            filename: filename.into(),
            header: serde_json::Value::Null,
            storage_size: 1,
            packet_size: DEFAULT_PACKET_SIZE,
        }
    }

    /// The control channel announcement for this request.
    pub fn metadata(&self) -> UploadMetadata {
        UploadMetadata {
            total_size: self.payload.len() as u64,
            packet_size: self.packet_size as u64,
            storage_size: self.storage_size,
            header: self.header.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStats {
    /// Bytes sent on the data channel.
    pub bytes_sent: u64,
    /// Number of slices sent.
    pub slices: u64,
}

/// Number of slices a payload splits into.
pub fn slice_count(total_size: usize, packet_size: usize) -> u64 {
    (total_size as u64).div_ceil(packet_size as u64)
}

/// Upload a payload to the server.
///
/// Negotiates the data connection over `control`, dials `data_url`, and
/// drives the slice/acknowledge loop to completion. If the handshake is
/// refused the data endpoint is never dialed; if the transfer fails midway
/// the data connection is still closed before the error surfaces. The
/// control channel stays ready in both failure cases.
pub async fn upload(
    control: &mut ControlClient,
    dialer: &dyn Dialer,
    data_url: &str,
    request: UploadRequest,
) -> Result<UploadStats> {
    if request.packet_size == 0 {
        return Err(Error::Protocol {
            message: "upload packet size must be non-zero".into(),
        });
    }

    info!(
        filename = %request.filename,
        total_size = request.payload.len(),
        packet_size = request.packet_size,
        "starting upload"
    );

    control.request_data_channel(request.metadata()).await?;

    debug!(data_url, "dialing data channel");
    let channel = dialer.dial(data_url).await?;

    let session = UploadSession {
        channel,
        payload: request.payload,
        packet_size: request.packet_size,
        cursor: 0,
        slices: 0,
    };
    let stats = session.run().await?;

    info!(bytes = stats.bytes_sent, slices = stats.slices, "upload complete");
    Ok(stats)
}

/// One in-flight upload over its dedicated data connection.
struct UploadSession {
    channel: Box<dyn Channel>,
    payload: Vec<u8>,
    packet_size: usize,
    cursor: usize,
    slices: u64,
}

impl UploadSession {
    /// Drive the transfer and close the data connection on either outcome.
    async fn run(mut self) -> Result<UploadStats> {
        let result = self.drive().await;
        if let Err(e) = self.channel.close().await {
            debug!(error = %e, "closing data channel after transfer");
        }
        result
    }

    async fn drive(&mut self) -> Result<UploadStats> {
        self.send_slice().await?;

        loop {
            let frame = match self.channel.recv().await? {
                Some(frame) => frame,
                None => return Err(Error::ConnectionClosed),
            };

            let text = match frame {
                Frame::Text(text) => text,
                Frame::Binary(_) => {
                    return Err(Error::Protocol {
                        message: "binary frame on data channel during upload".into(),
                    });
                }
            };

            match Codec::decode_data_reply(&text) {
                Ok(DataReply::Nextpacket) => {
                    if self.remaining() == 0 {
                        return Err(Error::Protocol {
                            message: "nextpacket received after final slice".into(),
                        });
                    }
                    self.send_slice().await?;
                }
                Ok(DataReply::Uploadcomplete) => {
                    if self.remaining() > 0 {
                        return Err(Error::Protocol {
                            message: format!(
                                "uploadcomplete with {} bytes unsent",
                                self.remaining()
                            ),
                        });
                    }
                    return Ok(UploadStats {
                        bytes_sent: self.cursor as u64,
                        slices: self.slices,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "unexpected reply on data channel");
                    return Err(Error::Protocol {
                        message: format!("unexpected data channel reply: {e}"),
                    });
                }
            }
        }
    }

    fn remaining(&self) -> usize {
        self.payload.len() - self.cursor
    }

    /// Send the next slice: `min(packet_size, remaining)` bytes, cursor
    /// advanced by exactly the slice length.
    async fn send_slice(&mut self) -> Result<()> {
        let len = self.remaining().min(self.packet_size);
        let slice = self.payload[self.cursor..self.cursor + len].to_vec();
        self.channel.send(Frame::Binary(slice)).await?;
        self.cursor += len;
        self.slices += 1;
        trace!(cursor = self.cursor, slice = len, "slice sent");
        Ok(())
    }
}
