//! Wire codec for control and data channel frames.
//!
//! Text frames are plain JSON. The codec ensures:
//! - Outbound commands serialize with the server's exact field names
//! - Malformed inbound frames are distinguishable from frames carrying an
//!   unrecognized `type` tag (the latter exist for forward compatibility
//!   with newer servers and are dropped, never fatal)
//! - Binary payloads inflate through gzip with a size ceiling

use std::io::Read;

use flate2::read::GzDecoder;

use crate::constants::MAX_DECOMPRESSED_SIZE;
use crate::error::{DecodeError, Error, Result};
use crate::protocol::{ClientCommand, DataReply, ServerMessage};

/// Message types the control channel understands. Anything else decodes to
/// `DecodeError::UnknownType`.
const CONTROL_TYPES: &[&str] = &["filelist", "supplementalfiles", "error", "datasocketready"];

/// Message types the data channel understands.
const DATA_TYPES: &[&str] = &["nextpacket", "uploadcomplete"];

/// Codec for JSON text frames and compressed binary payloads.
pub struct Codec;

impl Codec {
    /// Encode an outbound command as a JSON text frame.
    pub fn encode_command(cmd: &ClientCommand) -> Result<String> {
        serde_json::to_string(cmd).map_err(|e| Error::Codec {
            message: format!("command serialization failed: {e}"),
        })
    }

    /// Decode a control channel text frame.
    pub fn decode_server(frame: &str) -> std::result::Result<ServerMessage, DecodeError> {
        decode_tagged(frame, CONTROL_TYPES)
    }

    /// Decode a data channel text frame.
    pub fn decode_data_reply(frame: &str) -> std::result::Result<DataReply, DecodeError> {
        decode_tagged(frame, DATA_TYPES)
    }

    /// Inflate a gzip-compressed binary payload.
    ///
    /// Output is capped at [`MAX_DECOMPRESSED_SIZE`]; corrupt input or an
    /// oversized result yields `DecodeError::DecompressionFailed` and the
    /// caller must not construct an image from it.
    pub fn decompress(bytes: &[u8]) -> std::result::Result<Vec<u8>, DecodeError> {
        Self::decompress_with_limit(bytes, MAX_DECOMPRESSED_SIZE)
    }

    /// Inflate with an explicit output size limit.
    pub fn decompress_with_limit(
        bytes: &[u8],
        max_size: usize,
    ) -> std::result::Result<Vec<u8>, DecodeError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut output = Vec::new();
        let mut buf = [0u8; 8192];

        loop {
            let n = decoder
                .read(&mut buf)
                .map_err(|e| DecodeError::DecompressionFailed {
                    detail: e.to_string(),
                })?;

            if n == 0 {
                break;
            }

            if output.len() + n > max_size {
                return Err(DecodeError::DecompressionFailed {
                    detail: format!(
                        "decompressed size exceeds limit: {} > {}",
                        output.len() + n,
                        max_size
                    ),
                });
            }

            output.extend_from_slice(&buf[..n]);
        }

        Ok(output)
    }
}

/// Decode a `type`-tagged JSON frame, classifying failures.
fn decode_tagged<T: serde::de::DeserializeOwned>(
    frame: &str,
    known_types: &[&str],
) -> std::result::Result<T, DecodeError> {
    match serde_json::from_str::<T>(frame) {
        Ok(msg) => Ok(msg),
        Err(typed_err) => {
            // Distinguish "newer server sent a type we don't know" from
            // plain garbage by re-reading the frame as untyped JSON.
            let value: serde_json::Value =
                serde_json::from_str(frame).map_err(|e| DecodeError::MalformedPayload {
                    detail: e.to_string(),
                })?;

            match value.get("type").and_then(|t| t.as_str()) {
                Some(t) if !known_types.contains(&t) => Err(DecodeError::UnknownType {
                    message_type: t.to_string(),
                }),
                _ => Err(DecodeError::MalformedPayload {
                    detail: typed_err.to_string(),
                }),
            }
        }
    }
}
