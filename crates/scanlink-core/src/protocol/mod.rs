//! Wire protocol for the scanlink file server.
//!
//! Two vocabularies share the control channel: `ClientCommand` (outbound,
//! tagged by `command`) and `ServerMessage` (inbound, tagged by `type`).
//! The data channel carries raw binary slices outbound and small tagged
//! `DataReply` acknowledgements inbound.

pub mod codec;
pub mod message;

pub use codec::Codec;
pub use message::{
    ClientCommand, DataReply, ModuleParams, ServerMessage, SupplementalPayload, UploadMetadata,
};
