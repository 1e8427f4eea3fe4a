//! X11 protocol implementation
//!
//! This module implements the X11 wire format for the font and extension
//! request families: identifiers, packet cursors, requests, replies and errors.

pub mod types;
pub mod wire;
pub mod font;
pub mod errors;
pub mod requests;
pub mod setup;
pub mod encoder;

pub use types::*;
pub use wire::*;
pub use font::*;
pub use errors::*;
pub use requests::*;
pub use setup::*;
pub use encoder::*;

/// X11 protocol version
pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// Maximum request length, in 4-byte units, before BIG-REQUESTS is enabled
pub const DEFAULT_MAX_REQUEST_LENGTH: u32 = 65535;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad() {
        assert_eq!(pad(0), 0);
        assert_eq!(pad(1), 3);
        assert_eq!(pad(4), 0);
        assert_eq!(pad(7), 1);
        assert_eq!(padded_len(5), 8);
        assert_eq!(padded_len(8), 8);
    }
}
