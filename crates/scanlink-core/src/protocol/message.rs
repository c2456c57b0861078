//! Control and data channel message types.
//!
//! Field names follow the server's JSON vocabulary exactly (`totalSize`,
//! `packetSize`, `payload`, ...) — any renaming here breaks interop.

use serde::{Deserialize, Serialize};

use crate::tree::DirectoryEntry;

// =============================================================================
// Client Commands (control channel, client -> server)
// =============================================================================

/// Parameters for a remote module invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleParams {
    /// Name of the module to run on the server.
    pub modulename: String,
    /// Absolute remote paths of the module inputs.
    pub inputs: Vec<String>,
    /// Module-specific arguments, passed through opaquely.
    pub args: serde_json::Value,
}

/// Metadata announced before an upload, carried by `uploadimage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    /// Total payload length in bytes.
    pub total_size: u64,
    /// Slice size the client will use on the data channel.
    pub packet_size: u64,
    /// Bytes per image element in the serialized payload.
    pub storage_size: u32,
    /// Serialized image header, passed through opaquely.
    pub header: serde_json::Value,
    /// Name the file should be stored under on the server.
    pub filename: String,
}

/// Commands sent on the control channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ClientCommand {
    /// Request a directory listing. `None` lists the server's root.
    Show { directory: Option<String> },
    /// Request one or more files; each arrives as a compressed binary frame.
    Getfile { files: Vec<String> },
    /// Invoke a processing module on the server.
    Runmodule { params: ModuleParams },
    /// Announce an upload and ask the server to open the data endpoint.
    Uploadimage(UploadMetadata),
}

// =============================================================================
// Server Messages (control channel, server -> client)
// =============================================================================

/// Payload of a `supplementalfiles` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplementalPayload {
    /// Absolute remote path of the node whose children were fetched.
    pub path: String,
    /// The fetched children.
    pub list: Vec<DirectoryEntry>,
}

/// Typed messages received on the control channel.
///
/// This is a closed set. Frames with an unrecognized `type` never reach this
/// enum; the codec reports them as `DecodeError::UnknownType` so callers can
/// log and drop them without touching state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full directory listing; replaces the cached tree.
    Filelist { payload: Vec<DirectoryEntry> },
    /// Lazily fetched subtree; merged into the cached tree.
    Supplementalfiles { payload: SupplementalPayload },
    /// Server-side error report. Logged, never fatal.
    Error { payload: serde_json::Value },
    /// The data endpoint is ready for an upload. Consumed exclusively by the
    /// upload handshake, never by the generic dispatcher.
    Datasocketready,
}

// =============================================================================
// Data Replies (data channel, server -> client)
// =============================================================================

/// Acknowledgements received on the data channel during an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataReply {
    /// The server consumed the previous slice; send the next one.
    Nextpacket,
    /// All slices received and stored; the client closes the data channel.
    Uploadcomplete,
}
