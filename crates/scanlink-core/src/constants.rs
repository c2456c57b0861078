//! Protocol and configuration constants for scanlink.

// =============================================================================
// Endpoints
// =============================================================================

/// Default control channel address (commands and JSON replies).
pub const DEFAULT_CONTROL_URL: &str = "ws://localhost:8081";

/// Default data channel address (opened only during an active upload).
pub const DEFAULT_DATA_URL: &str = "ws://localhost:8082";

// =============================================================================
// Transfer Constants
// =============================================================================

/// Default upload slice size in bytes.
pub const DEFAULT_PACKET_SIZE: usize = 50_000;

/// Maximum accepted size for a text control frame (16 MiB).
pub const MAX_TEXT_FRAME: usize = 16 * 1024 * 1024;

/// Maximum decompressed image size (1 GiB). Guards against gzip bombs on
/// the control channel's binary path.
pub const MAX_DECOMPRESSED_SIZE: usize = 1024 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_websocket_urls() {
        assert!(DEFAULT_CONTROL_URL.starts_with("ws://"));
        assert!(DEFAULT_DATA_URL.starts_with("ws://"));
        assert_ne!(DEFAULT_CONTROL_URL, DEFAULT_DATA_URL);
    }

    #[test]
    fn packet_size_fits_in_a_frame() {
        assert!(DEFAULT_PACKET_SIZE < MAX_TEXT_FRAME);
    }
}
