//! scanlink-core: Shared library for the scanlink file-server protocol.
//!
//! This crate provides:
//! - Control and data channel message definitions and the JSON wire codec
//! - Gzip decompression for binary image payloads
//! - The lazily-deepened directory-tree cache
//! - Transport abstractions (WebSocket and mockable channel traits)
//! - Error taxonomy and logging setup

pub mod constants;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod transport;
pub mod tree;

pub use error::{DecodeError, Error, Result};
pub use logging::{init_logging, LogFormat};
