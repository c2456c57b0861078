//! Test utilities for scanlink: in-memory channels that stand in for the
//! WebSocket transport.

pub mod mock_channel;

pub use mock_channel::{channel_pair, MockChannel, MockDialer};
