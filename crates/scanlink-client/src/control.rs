//! Control channel client.
//!
//! Owns the persistent connection to the file server, sends typed commands,
//! and dispatches inbound frames: directory listings into the cache, binary
//! image frames into the download handler, server errors into the log.
//!
//! The `datasocketready` handshake reply is deliberately excluded from
//! generic dispatch. The upload engine consumes it through
//! [`ControlClient::request_data_channel`], which reads exactly one reply
//! while it holds the client — an explicit sub-state rather than the ad-hoc
//! one-shot listener the wire protocol was designed around. A
//! `datasocketready` that reaches the generic dispatcher anyway is stale and
//! gets dropped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use scanlink_core::error::DecodeError;
use scanlink_core::protocol::{
    ClientCommand, Codec, ModuleParams, ServerMessage, SupplementalPayload, UploadMetadata,
};
use scanlink_core::transport::{Channel, Dialer, Frame};
use scanlink_core::tree::{DirectoryCache, DirectoryEntry, MergeOutcome};
use scanlink_core::{Error, Result};

use crate::download::{DownloadHandler, ImageSink, NullImageSink};

/// Collaborator that renders the directory tree.
///
/// Called with a fresh snapshot after every replace and every successful
/// merge. Node objects inside the cache keep their identity across merges,
/// so an incremental renderer may diff against its previous snapshot.
pub trait TreeView: Send + Sync {
    fn tree_updated(&self, entries: &[DirectoryEntry]);
}

/// View that ignores tree updates.
#[derive(Debug, Default)]
pub struct NullTreeView;

impl TreeView for NullTreeView {
    fn tree_updated(&self, _entries: &[DirectoryEntry]) {}
}

/// Control channel lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    Ready,
    /// Peer closed cleanly.
    Disconnected,
    /// Transport error; unusable until a new client is connected.
    Faulted,
}

/// Why an inbound frame was dropped without a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Text frame was not valid JSON for any known message.
    MalformedPayload,
    /// Valid JSON with an unrecognized `type`; likely a newer server.
    UnknownType,
    /// Binary frame failed gzip inflation.
    DecompressionFailed,
    /// `datasocketready` with no upload handshake pending.
    StrayHandshake,
}

/// One dispatched control channel event, for callers that want to observe
/// the dispatch loop (tests, CLI progress).
#[derive(Debug)]
pub enum ControlEvent {
    /// `filelist` replaced the cached tree.
    FileList { entries: usize },
    /// `supplementalfiles` merge attempt and its outcome.
    Supplemental { path: String, outcome: MergeOutcome },
    /// Server-side error report. The channel stays ready.
    ServerError { payload: serde_json::Value },
    /// Binary frame inflated and delivered to the image sink.
    Image { bytes: usize },
    /// Frame dropped; no state changed.
    Dropped { reason: DropReason },
    /// Peer closed the channel.
    Closed,
}

/// Configuration for a control client.
pub struct ControlConfig {
    /// Leading path components the directory tree is rooted below.
    pub root_prefix: String,
    /// Tree rendering collaborator.
    pub view: Arc<dyn TreeView>,
    /// Image construction collaborator.
    pub sink: Arc<dyn ImageSink>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            root_prefix: String::new(),
            view: Arc::new(NullTreeView),
            sink: Arc::new(NullImageSink),
        }
    }
}

/// Client for the control channel.
pub struct ControlClient {
    channel: Box<dyn Channel>,
    state: ClientState,
    cache: DirectoryCache,
    view: Arc<dyn TreeView>,
    download: DownloadHandler,
}

impl ControlClient {
    /// Connect to the control endpoint.
    pub async fn connect(dialer: &dyn Dialer, url: &str, config: ControlConfig) -> Result<Self> {
        debug!(url, "connecting control channel");
        let channel = dialer.dial(url).await?;
        info!(url, "control channel ready");
        Ok(Self::from_channel(channel, config))
    }

    /// Build a client over an already-open channel.
    pub fn from_channel(channel: Box<dyn Channel>, config: ControlConfig) -> Self {
        Self {
            channel,
            state: ClientState::Ready,
            cache: DirectoryCache::new(&config.root_prefix),
            view: config.view,
            download: DownloadHandler::new(config.sink),
        }
    }

    /// Current channel state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The cached directory tree.
    pub fn cache(&self) -> &DirectoryCache {
        &self.cache
    }

    /// Request a directory listing. `None` lists the server's root.
    pub async fn show(&mut self, directory: Option<String>) -> Result<()> {
        self.send_command(&ClientCommand::Show { directory }).await
    }

    /// Request files; each arrives later as a compressed binary frame.
    pub async fn get_files(&mut self, files: Vec<String>) -> Result<()> {
        self.send_command(&ClientCommand::Getfile { files }).await
    }

    /// Invoke a processing module on the server.
    pub async fn run_module(&mut self, params: ModuleParams) -> Result<()> {
        self.send_command(&ClientCommand::Runmodule { params }).await
    }

    /// Send a command on the control channel.
    pub async fn send_command(&mut self, cmd: &ClientCommand) -> Result<()> {
        self.ensure_ready()?;
        let frame = Codec::encode_command(cmd)?;
        match self.channel.send(Frame::Text(frame)).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Announce an upload and consume exactly one handshake reply.
    ///
    /// `Ok(())` means the server answered `datasocketready` and the data
    /// endpoint may be dialed. Any other reply, or a reply that fails to
    /// parse, is a protocol error scoped to this upload; the control
    /// channel stays ready.
    pub async fn request_data_channel(&mut self, metadata: UploadMetadata) -> Result<()> {
        self.send_command(&ClientCommand::Uploadimage(metadata)).await?;

        match self.channel.recv().await {
            Err(e) => Err(self.fault(e)),
            Ok(None) => {
                self.state = ClientState::Disconnected;
                Err(Error::ConnectionClosed)
            }
            Ok(Some(Frame::Binary(_))) => Err(Error::Protocol {
                message: "binary frame while awaiting upload handshake".into(),
            }),
            Ok(Some(Frame::Text(text))) => match Codec::decode_server(&text) {
                Ok(ServerMessage::Datasocketready) => {
                    debug!("data socket ready");
                    Ok(())
                }
                Ok(other) => Err(Error::Protocol {
                    message: format!("expected datasocketready, got {other:?}"),
                }),
                Err(e) => Err(Error::Protocol {
                    message: format!("unparseable upload handshake reply: {e}"),
                }),
            },
        }
    }

    /// Receive and dispatch the next inbound frame.
    ///
    /// Dropped frames (malformed, unknown type, corrupt compression, stray
    /// handshake) are logged and reported as [`ControlEvent::Dropped`]; the
    /// channel stays ready after all of them.
    pub async fn next_event(&mut self) -> Result<ControlEvent> {
        self.ensure_ready()?;

        let frame = match self.channel.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("control channel closed by peer");
                self.state = ClientState::Disconnected;
                return Ok(ControlEvent::Closed);
            }
            Err(e) => return Err(self.fault(e)),
        };

        match frame {
            Frame::Binary(bytes) => match self.download.handle(&bytes) {
                Ok(len) => {
                    info!(compressed = bytes.len(), bytes = len, "image received");
                    Ok(ControlEvent::Image { bytes: len })
                }
                Err(e) => {
                    warn!(error = %e, "dropping undecodable binary frame");
                    Ok(ControlEvent::Dropped {
                        reason: DropReason::DecompressionFailed,
                    })
                }
            },
            Frame::Text(text) => self.dispatch_text(&text),
        }
    }

    fn dispatch_text(&mut self, text: &str) -> Result<ControlEvent> {
        let msg = match Codec::decode_server(text) {
            Ok(msg) => msg,
            Err(e @ DecodeError::UnknownType { .. }) => {
                warn!(error = %e, "dropping frame with unknown type");
                return Ok(ControlEvent::Dropped {
                    reason: DropReason::UnknownType,
                });
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return Ok(ControlEvent::Dropped {
                    reason: DropReason::MalformedPayload,
                });
            }
        };

        match msg {
            ServerMessage::Filelist { payload } => {
                let entries = payload.len();
                self.cache.replace(payload);
                self.view.tree_updated(self.cache.entries());
                debug!(entries, "file list replaced");
                Ok(ControlEvent::FileList { entries })
            }
            ServerMessage::Supplementalfiles {
                payload: SupplementalPayload { path, list },
            } => {
                let outcome = self.cache.merge(&path, list);
                match outcome {
                    MergeOutcome::Merged => {
                        self.view.tree_updated(self.cache.entries());
                        debug!(path, "supplemental files merged");
                    }
                    MergeOutcome::PathNotFound => {
                        warn!(path, "stale supplemental response ignored");
                    }
                }
                Ok(ControlEvent::Supplemental { path, outcome })
            }
            ServerMessage::Error { payload } => {
                warn!(%payload, "server reported an error");
                Ok(ControlEvent::ServerError { payload })
            }
            ServerMessage::Datasocketready => {
                // Belongs to request_data_channel; seeing it here means no
                // upload handshake is pending.
                warn!("datasocketready with no pending upload, dropping");
                Ok(ControlEvent::Dropped {
                    reason: DropReason::StrayHandshake,
                })
            }
        }
    }

    /// Close the control channel.
    pub async fn close(&mut self) -> Result<()> {
        self.state = ClientState::Disconnected;
        self.channel.close().await
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state == ClientState::Ready {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: "Ready".into(),
                actual: format!("{:?}", self.state),
            })
        }
    }

    fn fault(&mut self, e: Error) -> Error {
        warn!(error = %e, "control channel faulted");
        self.state = ClientState::Faulted;
        e
    }
}
