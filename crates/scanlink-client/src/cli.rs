//! Command-line interface for the scanlink client.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use scanlink_core::constants::{DEFAULT_CONTROL_URL, DEFAULT_DATA_URL, DEFAULT_PACKET_SIZE};

/// Client for the scanlink medical-image file server.
#[derive(Debug, Parser)]
#[command(name = "scanlink", version, about)]
pub struct Cli {
    /// Control channel endpoint.
    #[arg(long, default_value = DEFAULT_CONTROL_URL)]
    pub server: String,

    /// Data channel endpoint (dialed only during uploads).
    #[arg(long, default_value = DEFAULT_DATA_URL)]
    pub data_server: String,

    /// Leading path the server's directory tree is rooted below
    /// (e.g. /home/alice).
    #[arg(long, default_value = "")]
    pub root_prefix: String,

    /// Increase verbosity (-v warn, -vv info, -vvv debug, -vvvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List files on the server.
    List {
        /// Directory to expand; the server's root when omitted.
        #[arg(long)]
        directory: Option<String>,
    },
    /// Download files. Each arrives gzip-compressed and is inflated locally.
    Get {
        /// Absolute remote paths.
        #[arg(required = true)]
        files: Vec<String>,
        /// Directory to write downloaded images into (default: cwd).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload a local file to the server.
    Upload {
        /// Local file to upload.
        file: PathBuf,
        /// Remote name; defaults to the local file name.
        #[arg(long)]
        name: Option<String>,
        /// Slice size for the data channel.
        #[arg(long, default_value_t = DEFAULT_PACKET_SIZE)]
        packet_size: usize,
        /// Bytes per image element.
        #[arg(long, default_value_t = 1)]
        storage_size: u32,
    },
    /// Invoke a processing module on the server.
    Run {
        /// Module name.
        module: String,
        /// Remote input paths (repeatable).
        #[arg(long = "input")]
        inputs: Vec<String>,
        /// Module arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },
}
