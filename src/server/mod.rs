//! Server core
//!
//! `ServerState` holds everything shared between client workers: the font
//! and GC tables, the font catalog, the text measurer, the extension list and
//! the reply writer pool. It is built once at startup and handed to every
//! handler by reference. `Server` pairs it with the dispatcher.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod extensions;
pub mod fonts;
pub mod listener;

pub use client::Client;
pub use config::ServerConfig;
pub use dispatcher::{Dispatcher, Outcome, RequestContext, RequestHandler};
pub use extensions::{BigRequests, Extension, ExtensionInfo, ExtensionQueries, ExtensionRegistry};
pub use fonts::FontHandler;

use crate::error::ConfigError;
use crate::pool::{ObjectPool, PoolError, Pooled, WriterRequest};
use crate::protocol::*;
use crate::resources::{BuiltinCatalog, CellMeasurer, FontCatalog, FontTable, GcTable, TextMeasurer};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Process-wide state shared by all clients
pub struct ServerState {
    pub config: ServerConfig,
    pub fonts: FontTable,
    pub gcs: GcTable,
    pub catalog: Arc<dyn FontCatalog>,
    pub measurer: Arc<dyn TextMeasurer>,
    pub extensions: ExtensionRegistry,
    pub writers: ObjectPool<PacketWriter>,
}

impl ServerState {
    fn new(
        config: ServerConfig,
        catalog: Arc<dyn FontCatalog>,
        measurer: Arc<dyn TextMeasurer>,
        extensions: ExtensionRegistry,
    ) -> Self {
        let writers = ObjectPool::new("reply-writers", config.max_idle_writers);
        ServerState {
            config,
            fonts: FontTable::new(),
            gcs: GcTable::new(),
            catalog,
            measurer,
            extensions,
            writers,
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(config: ServerConfig) -> Self {
        ServerState::new(
            config,
            Arc::new(BuiltinCatalog::new().unwrap()),
            Arc::new(CellMeasurer),
            ExtensionRegistry::new(),
        )
    }
}

/// The X server
pub struct Server {
    state: ServerState,
    dispatcher: Dispatcher,
    next_client_id: AtomicU32,
}

impl Server {
    /// Server with the built-in font catalog and cell measurer
    pub fn new(config: ServerConfig) -> Result<Self, ConfigError> {
        Self::with_collaborators(config, Arc::new(BuiltinCatalog::new()?), Arc::new(CellMeasurer))
    }

    pub fn with_collaborators(
        config: ServerConfig,
        catalog: Arc<dyn FontCatalog>,
        measurer: Arc<dyn TextMeasurer>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let core: Vec<Arc<dyn RequestHandler>> =
            vec![Arc::new(FontHandler), Arc::new(ExtensionQueries)];
        let mut dispatcher = Dispatcher::with_handlers(core)?;
        let mut registry = ExtensionRegistry::new();
        if config.big_requests {
            registry.register(
                BigRequests::new(extensions::BIG_REQUESTS_OPCODE, config.big_request_length),
                &mut dispatcher,
            )?;
        }
        log::info!(
            "Server ready with {} extension(s): {:?}",
            registry.len(),
            registry.names()
        );

        Ok(Server {
            state: ServerState::new(config, catalog, measurer, registry),
            dispatcher,
            next_client_id: AtomicU32::new(1),
        })
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register a new client and return its session
    pub fn register_client(&self, byte_order: ByteOrder) -> Client {
        let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("Registered client {}", client_id);
        Client::new(client_id, byte_order)
    }

    /// Release everything a departing client still holds
    pub fn unregister_client(&self, client: &Client) {
        let closed = self.state.fonts.close_client(client.client_id);
        if closed > 0 {
            log::debug!(
                "Closed {} font(s) left open by client {}",
                closed,
                client.client_id
            );
        }
    }

    /// Pooled writer in the client's byte order
    pub fn acquire_writer(&self, client: &Client) -> Result<Pooled<PacketWriter>, PoolError> {
        self.state.writers.acquire(&WriterRequest {
            byte_order: client.byte_order(),
            capacity: self.state.config.writer_capacity,
        })
    }

    /// Serve one complete request into `out`
    ///
    /// Error packets for failed or unsupported requests are appended to
    /// `out` as well, so `out` always holds exactly what goes to the client.
    pub fn process_request(&self, client: &mut Client, request: &[u8], out: &mut PacketWriter) {
        let mut reader = PacketReader::new(request, client.byte_order());
        let outcome = self
            .dispatcher
            .dispatch(client, &self.state, &mut reader, out);
        if let Some(error) = outcome.error() {
            log::debug!("Client {}: {}", client.client_id, error);
            error.encode(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_font(fid: u32, name: &str) -> Vec<u8> {
        let mut w = PacketWriter::new(ByteOrder::LSBFirst);
        w.write_u8(RequestOpcode::OpenFont as u8);
        w.write_u8(0);
        w.write_u16(((12 + padded_len(name.len())) / 4) as u16);
        w.write_u32(fid);
        w.write_u16(name.len() as u16);
        w.write_pad(2);
        w.write_padded_string(name);
        w.into_bytes()
    }

    fn fid_request(opcode: RequestOpcode, fid: u32) -> Vec<u8> {
        let mut w = PacketWriter::new(ByteOrder::LSBFirst);
        w.write_u8(opcode as u8);
        w.write_u8(0);
        w.write_u16(2);
        w.write_u32(fid);
        w.into_bytes()
    }

    fn run(server: &Server, client: &mut Client, request: &[u8]) -> Vec<u8> {
        let mut out = PacketWriter::new(client.byte_order());
        server.process_request(client, request, &mut out);
        out.into_bytes()
    }

    #[test]
    fn test_builtin_dispatch_table() {
        let server = Server::new(ServerConfig::default()).unwrap();
        assert_eq!(server.dispatcher().handler_name(45), Some("fonts"));
        assert_eq!(server.dispatcher().handler_name(98), Some("extension-queries"));
        assert_eq!(server.dispatcher().handler_name(133), Some("BIG-REQUESTS"));
        assert_eq!(server.dispatcher().handler_name(1), None);
    }

    #[test]
    fn test_without_big_requests() {
        let config = ServerConfig {
            big_requests: false,
            ..ServerConfig::default()
        };
        let server = Server::new(config).unwrap();
        assert!(server.state().extensions.is_empty());
        assert_eq!(server.dispatcher().handler_name(133), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ServerConfig {
            max_idle_writers: 0,
            ..ServerConfig::default()
        };
        assert!(Server::new(config).is_err());
    }

    #[test]
    fn test_open_errors() {
        let server = Server::new(ServerConfig::default()).unwrap();
        let mut client = server.register_client(ByteOrder::LSBFirst);

        assert!(run(&server, &mut client, &open_font(5, "fixed")).is_empty());

        let reply = run(&server, &mut client, &open_font(5, "6x13"));
        assert_eq!(reply.len(), 32);
        assert_eq!(reply[1], ErrorCode::IDChoice as u8);
        assert_eq!(&reply[2..4], &[2, 0]);

        let reply = run(&server, &mut client, &open_font(6, "no-such-font"));
        assert_eq!(reply[1], ErrorCode::Name as u8);

        let reply = run(&server, &mut client, &fid_request(RequestOpcode::CloseFont, 6));
        assert_eq!(reply[1], ErrorCode::Font as u8);
        assert_eq!(&reply[4..8], &[6, 0, 0, 0]);
        assert_eq!(reply[10], RequestOpcode::CloseFont as u8);
    }

    #[test]
    fn test_unregister_closes_fonts() {
        let server = Server::new(ServerConfig::default()).unwrap();
        let mut first = server.register_client(ByteOrder::LSBFirst);
        let mut second = server.register_client(ByteOrder::LSBFirst);
        assert_ne!(first.client_id, second.client_id);

        run(&server, &mut first, &open_font(1, "fixed"));
        run(&server, &mut second, &open_font(2, "fixed"));
        assert_eq!(server.state().fonts.len(), 2);

        server.unregister_client(&first);
        assert_eq!(server.state().fonts.len(), 1);
        assert!(server.state().fonts.get(FontId::new(2)).is_some());
    }

    #[test]
    fn test_text_extents_through_gc() {
        let server = Server::new(ServerConfig::default()).unwrap();
        let mut client = server.register_client(ByteOrder::LSBFirst);
        run(&server, &mut client, &open_font(5, "fixed"));

        let gc = GContext::new(0x40);
        server.state().gcs.bind_font(gc, FontId::new(5));
        let mut w = PacketWriter::new(ByteOrder::LSBFirst);
        w.write_u8(RequestOpcode::QueryTextExtents as u8);
        w.write_u8(0);
        w.write_u16(3);
        w.write_u32(0x40);
        w.write_bytes(&[0, b'h', 0, b'i']);
        let reply = run(&server, &mut client, &w.into_bytes());
        assert_eq!(reply.len(), 32);
        assert_eq!(reply[0], 1);
        // overall width: two 6-pixel cells
        assert_eq!(&reply[16..20], &[12, 0, 0, 0]);

        // GC bound to a font that is not open
        server.state().gcs.bind_font(gc, FontId::new(9));
        let mut w = PacketWriter::new(ByteOrder::LSBFirst);
        w.write_u8(RequestOpcode::QueryTextExtents as u8);
        w.write_u8(0);
        w.write_u16(2);
        w.write_u32(0x40);
        let reply = run(&server, &mut client, &w.into_bytes());
        assert_eq!(reply[0], 0);
        assert_eq!(reply[1], ErrorCode::Font as u8);

        // neither a font nor a GC
        let mut w = PacketWriter::new(ByteOrder::LSBFirst);
        w.write_u8(RequestOpcode::QueryTextExtents as u8);
        w.write_u8(0);
        w.write_u16(2);
        w.write_u32(0x77);
        let reply = run(&server, &mut client, &w.into_bytes());
        assert_eq!(reply[1], ErrorCode::GContext as u8);
    }

    #[test]
    fn test_get_font_path_is_empty() {
        let server = Server::new(ServerConfig::default()).unwrap();
        let mut client = server.register_client(ByteOrder::MSBFirst);
        let reply = run(&server, &mut client, &[52, 0, 0, 1]);
        assert_eq!(reply.len(), 32);
        assert_eq!(reply[0], 1);
        // length and path count are zero
        assert_eq!(&reply[4..10], &[0, 0, 0, 0, 0, 0]);
    }
}
