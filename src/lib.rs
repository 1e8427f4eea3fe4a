//! xwire - X11 wire-protocol core
//!
//! Request framing and dispatch, packet encoding, the font request family,
//! BIG-REQUESTS negotiation and pooled reply buffers.

pub mod connection;
pub mod error;
pub mod pool;
pub mod protocol;
pub mod resources;
pub mod server;

pub use connection::Connection;
pub use error::{ConfigError, ServerError};
pub use protocol::{ByteOrder, PacketReader, PacketWriter};
pub use server::{Server, ServerConfig};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
