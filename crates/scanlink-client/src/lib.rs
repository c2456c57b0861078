//! scanlink-client: control-channel client, chunked upload engine, and
//! binary download handling for the scanlink file server.

pub mod cli;
pub mod control;
pub mod download;
pub mod upload;

pub use control::{
    ClientState, ControlClient, ControlConfig, ControlEvent, DropReason, NullTreeView, TreeView,
};
pub use download::{DownloadHandler, ImagePayload, ImageSink, NullImageSink};
pub use upload::{upload, UploadRequest, UploadStats};
