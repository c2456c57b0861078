//! Binary download handling for the control channel.
//!
//! The server sends requested files as gzip-compressed binary frames on the
//! control channel. Each frame is inflated and handed to the image
//! construction collaborator; a frame that fails inflation is dropped and
//! nothing reaches the collaborator.

use std::sync::Arc;

use scanlink_core::error::DecodeError;
use scanlink_core::protocol::Codec;

/// Decompressed image bytes, ready for the image-construction collaborator.
///
/// Parsing the serialized image format is the collaborator's concern; the
/// protocol layer only guarantees the bytes inflated cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
}

/// Collaborator that turns decompressed bytes into a displayable image.
pub trait ImageSink: Send + Sync {
    fn image_received(&self, image: ImagePayload);
}

/// Sink that discards images. Useful for commands that never download.
#[derive(Debug, Default)]
pub struct NullImageSink;

impl ImageSink for NullImageSink {
    fn image_received(&self, _image: ImagePayload) {}
}

/// Handles binary frames received on the control channel.
pub struct DownloadHandler {
    sink: Arc<dyn ImageSink>,
}

impl DownloadHandler {
    pub fn new(sink: Arc<dyn ImageSink>) -> Self {
        Self { sink }
    }

    /// Inflate a binary frame and deliver it to the sink.
    ///
    /// Returns the decompressed byte count, or the decode error without
    /// having delivered anything.
    pub fn handle(&self, bytes: &[u8]) -> Result<usize, DecodeError> {
        let inflated = Codec::decompress(bytes)?;
        let len = inflated.len();
        self.sink.image_received(ImagePayload { bytes: inflated });
        Ok(len)
    }
}
