//! scanlink binary: exercises the control channel, directory listing,
//! download, and upload paths against a running file server.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{error, warn};

use scanlink_client::cli::{Cli, Command};
use scanlink_client::{
    upload, ControlClient, ControlConfig, ControlEvent, ImagePayload, ImageSink, UploadRequest,
};
use scanlink_core::protocol::ModuleParams;
use scanlink_core::transport::WsDialer;
use scanlink_core::tree::DirectoryEntry;
use scanlink_core::{init_logging, Error, LogFormat, Result};

/// Sink that writes each downloaded image to disk.
struct FileSink {
    dir: PathBuf,
    written: AtomicUsize,
}

impl FileSink {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            written: AtomicUsize::new(0),
        }
    }
}

impl ImageSink for FileSink {
    fn image_received(&self, image: ImagePayload) {
        let n = self.written.fetch_add(1, Ordering::SeqCst);
        let path = self.dir.join(format!("image-{n}.nii"));
        match std::fs::write(&path, &image.bytes) {
            Ok(()) => println!("wrote {} ({} bytes)", path.display(), image.bytes.len()),
            Err(e) => error!(path = %path.display(), error = %e, "failed to write image"),
        }
    }
}

fn print_tree(entries: &[DirectoryEntry], depth: usize) {
    for entry in entries {
        let marker = if entry.kind.is_container() { "/" } else { "" };
        let pending = if entry.expand { " …" } else { "" };
        println!("{:indent$}{}{marker}{pending}", "", entry.text, indent = depth * 2);
        if let Some(children) = &entry.children {
            print_tree(children, depth + 1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_logging(cli.verbose, None, format)?;

    let dialer = WsDialer;

    match cli.command {
        Command::List { directory } => {
            let config = ControlConfig {
                root_prefix: cli.root_prefix.clone(),
                ..ControlConfig::default()
            };
            let mut client = ControlClient::connect(&dialer, &cli.server, config).await?;
            client.show(directory).await?;

            loop {
                match client.next_event().await? {
                    ControlEvent::FileList { .. } => {
                        print_tree(client.cache().entries(), 0);
                        break;
                    }
                    ControlEvent::Closed => {
                        return Err(Error::ConnectionClosed);
                    }
                    other => warn!(event = ?other, "waiting for file list"),
                }
            }
            client.close().await
        }

        Command::Get { files, output } => {
            let dir = output.unwrap_or_else(|| PathBuf::from("."));
            let sink = Arc::new(FileSink::new(dir));
            let config = ControlConfig {
                root_prefix: cli.root_prefix.clone(),
                sink: sink.clone(),
                ..ControlConfig::default()
            };
            let mut client = ControlClient::connect(&dialer, &cli.server, config).await?;

            let expected = files.len();
            client.get_files(files).await?;

            let mut received = 0;
            while received < expected {
                match client.next_event().await? {
                    ControlEvent::Image { .. } => received += 1,
                    ControlEvent::ServerError { payload } => {
                        error!(%payload, "server refused a file request");
                        received += 1;
                    }
                    ControlEvent::Closed => break,
                    _ => {}
                }
            }
            client.close().await
        }

        Command::Upload {
            file,
            name,
            packet_size,
            storage_size,
        } => {
            let payload = tokio::fs::read(&file).await?;
            let name = name.unwrap_or_else(|| default_name(&file));

            let mut client =
                ControlClient::connect(&dialer, &cli.server, ControlConfig::default()).await?;

            let mut request = UploadRequest::new(payload, name);
            request.packet_size = packet_size;
            request.storage_size = storage_size;

            let stats = upload(&mut client, &dialer, &cli.data_server, request).await?;
            println!("uploaded {} bytes in {} slices", stats.bytes_sent, stats.slices);
            client.close().await
        }

        Command::Run {
            module,
            inputs,
            args,
        } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).map_err(|e| Error::Codec {
                    message: format!("--args is not valid JSON: {e}"),
                })?;

            let mut client =
                ControlClient::connect(&dialer, &cli.server, ControlConfig::default()).await?;
            client
                .run_module(ModuleParams {
                    modulename: module,
                    inputs,
                    args,
                })
                .await?;
            client.close().await
        }
    }
}

fn default_name(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
