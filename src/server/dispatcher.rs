//! Opcode dispatch
//!
//! The `Dispatcher` owns an opcode table built once at startup. Each request
//! is routed to the single handler registered for its major opcode; failures
//! come back as an `Outcome` for the connection layer to put on the wire.

use super::{Client, ServerState};
use crate::error::ConfigError;
use crate::protocol::{PacketReader, PacketWriter, RequestError, RequestHeader, X11Error};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Everything a handler may look at while serving one request
pub struct RequestContext<'a> {
    pub header: RequestHeader,
    pub client: &'a mut Client,
    pub state: &'a ServerState,
}

impl RequestContext<'_> {
    pub fn sequence(&self) -> u16 {
        self.header.sequence
    }
}

/// A family of requests served by one component
pub trait RequestHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Major opcodes routed to this handler
    fn owned_opcodes(&self) -> &[u8];

    /// Serve one request; `body` starts after the header and ends at the
    /// declared length. Replies are appended to `out`.
    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError>;
}

/// Result of dispatching one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// No handler owns the opcode
    Unsupported(X11Error),
    /// The handler, or the framing, rejected the request
    Failed(X11Error),
}

impl Outcome {
    /// Error packet to send back, if any
    pub fn error(&self) -> Option<&X11Error> {
        match self {
            Outcome::Handled => None,
            Outcome::Unsupported(error) | Outcome::Failed(error) => Some(error),
        }
    }
}

pub struct Dispatcher {
    handlers: Vec<Arc<dyn RequestHandler>>,
    routes: [Option<usize>; 256],
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            handlers: Vec::new(),
            routes: [None; 256],
        }
    }

    /// Build a dispatcher from a handler set, refusing overlapping opcodes
    pub fn with_handlers(handlers: Vec<Arc<dyn RequestHandler>>) -> Result<Self, ConfigError> {
        let mut dispatcher = Dispatcher::new();
        for handler in handlers {
            dispatcher.register(handler)?;
        }
        Ok(dispatcher)
    }

    /// Route the handler's opcodes to it
    ///
    /// Nothing is registered when any of its opcodes is already taken.
    pub fn register(&mut self, handler: Arc<dyn RequestHandler>) -> Result<(), ConfigError> {
        for &opcode in handler.owned_opcodes() {
            if let Some(index) = self.routes[opcode as usize] {
                return Err(ConfigError::DuplicateOpcode {
                    opcode,
                    first: self.handlers[index].name(),
                    second: handler.name(),
                });
            }
        }

        let index = self.handlers.len();
        for &opcode in handler.owned_opcodes() {
            self.routes[opcode as usize] = Some(index);
        }
        log::debug!(
            "Registered handler {} for opcodes {:?}",
            handler.name(),
            handler.owned_opcodes()
        );
        self.handlers.push(handler);
        Ok(())
    }

    /// Name of the handler owning `opcode`
    pub fn handler_name(&self, opcode: u8) -> Option<&'static str> {
        self.routes[opcode as usize].map(|index| self.handlers[index].name())
    }

    /// Serve the request at the start of `reader`
    ///
    /// Consumes one sequence number. On failure nothing the handler wrote
    /// stays in `writer`.
    pub fn dispatch(
        &self,
        client: &mut Client,
        state: &ServerState,
        reader: &mut PacketReader<'_>,
        writer: &mut PacketWriter,
    ) -> Outcome {
        let sequence = client.next_sequence();

        let header = match RequestHeader::read(reader, sequence, client.big_requests_enabled()) {
            Ok(header) => header,
            Err(e) => {
                log::debug!("Truncated request header (seq {}): {}", sequence, e);
                return Outcome::Failed(X11Error::bad_length(sequence, 0));
            }
        };
        let minor_opcode = if header.major_opcode >= 128 {
            header.minor_opcode()
        } else {
            0
        };

        if let Err(e) = client
            .check_length(&header)
            .and_then(|_| reader.restrict(header.total_len()).map_err(RequestError::from))
        {
            log::debug!(
                "Bad length for opcode {} (seq {}): {}",
                header.major_opcode,
                sequence,
                e
            );
            return Outcome::Failed(e.to_x11(sequence, header.major_opcode, minor_opcode));
        }

        let Some(index) = self.routes[header.major_opcode as usize] else {
            log::debug!("Unhandled opcode: {}", header.major_opcode);
            return Outcome::Unsupported(X11Error::bad_request(sequence, header.major_opcode));
        };
        let handler = &self.handlers[index];

        log::debug!(
            "Received opcode {} (length {}, seq {}) -> {}",
            header.major_opcode,
            header.length,
            sequence,
            handler.name()
        );

        let mark = writer.len();
        let mut ctx = RequestContext {
            header,
            client,
            state,
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handler.handle(&mut ctx, reader, writer)
        }));

        match result {
            Ok(Ok(())) => Outcome::Handled,
            Ok(Err(e)) => {
                writer.truncate(mark);
                log::debug!(
                    "{} rejected opcode {} (seq {}): {}",
                    handler.name(),
                    header.major_opcode,
                    sequence,
                    e
                );
                Outcome::Failed(e.to_x11(sequence, header.major_opcode, minor_opcode))
            }
            Err(_) => {
                writer.truncate(mark);
                log::error!(
                    "{} panicked on opcode {} (seq {})",
                    handler.name(),
                    header.major_opcode,
                    sequence
                );
                let mut error = X11Error::implementation_error(sequence, header.major_opcode);
                error.minor_opcode = minor_opcode;
                Outcome::Failed(error)
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ByteOrder, ErrorCode};
    use crate::server::ServerConfig;

    struct Echo {
        opcodes: Vec<u8>,
    }

    impl RequestHandler for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn owned_opcodes(&self) -> &[u8] {
            &self.opcodes
        }

        fn handle(
            &self,
            ctx: &mut RequestContext<'_>,
            body: &mut PacketReader<'_>,
            out: &mut PacketWriter,
        ) -> Result<(), RequestError> {
            let value = body.read_u32()?;
            out.begin_reply(0, ctx.sequence());
            out.write_u32(value);
            out.finish_reply();
            if value == 0xdead {
                panic!("echo handler panic");
            }
            if value == 0xbad {
                return Err(RequestError::bad_value(value));
            }
            Ok(())
        }
    }

    fn echo(opcodes: &[u8]) -> Arc<dyn RequestHandler> {
        Arc::new(Echo {
            opcodes: opcodes.to_vec(),
        })
    }

    fn request(opcode: u8, value: u32) -> Vec<u8> {
        let mut writer = PacketWriter::new(ByteOrder::LSBFirst);
        writer.write_u8(opcode);
        writer.write_u8(0);
        writer.write_u16(2);
        writer.write_u32(value);
        writer.into_bytes()
    }

    fn run(dispatcher: &Dispatcher, client: &mut Client, bytes: &[u8]) -> (Outcome, Vec<u8>) {
        let state = ServerState::for_tests(ServerConfig::default());
        let mut reader = PacketReader::new(bytes, client.byte_order());
        let mut writer = PacketWriter::new(client.byte_order());
        let outcome = dispatcher.dispatch(client, &state, &mut reader, &mut writer);
        (outcome, writer.into_bytes())
    }

    #[test]
    fn test_duplicate_opcode_rejected() {
        let result = Dispatcher::with_handlers(vec![echo(&[1, 2]), echo(&[2, 3])]);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicateOpcode { opcode: 2, .. })
        ));
    }

    #[test]
    fn test_routes_and_sequences() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);

        let (outcome, reply) = run(&dispatcher, &mut client, &request(10, 7));
        assert_eq!(outcome, Outcome::Handled);
        assert_eq!(reply.len(), 32);
        assert_eq!(&reply[2..4], &[1, 0]);
        assert_eq!(&reply[8..12], &[7, 0, 0, 0]);

        let (_, reply) = run(&dispatcher, &mut client, &request(10, 8));
        assert_eq!(&reply[2..4], &[2, 0]);
    }

    #[test]
    fn test_unsupported_opcode() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        let (outcome, reply) = run(&dispatcher, &mut client, &request(11, 0));
        let error = outcome.error().unwrap();
        assert!(matches!(outcome, Outcome::Unsupported(_)));
        assert_eq!(error.code, ErrorCode::Request);
        assert_eq!(error.major_opcode, 11);
        assert!(reply.is_empty());
    }

    #[test]
    fn test_handler_error_discards_partial_reply() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        let (outcome, reply) = run(&dispatcher, &mut client, &request(10, 0xbad));
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::Value));
        assert!(reply.is_empty());
    }

    #[test]
    fn test_handler_panic_becomes_implementation_error() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        let (outcome, reply) = run(&dispatcher, &mut client, &request(10, 0xdead));
        assert_eq!(
            outcome.error().map(|e| e.code),
            Some(ErrorCode::Implementation)
        );
        assert!(reply.is_empty());

        // the dispatcher keeps serving
        let (outcome, _) = run(&dispatcher, &mut client, &request(10, 1));
        assert_eq!(outcome, Outcome::Handled);
    }

    #[test]
    fn test_short_body_is_length_error() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        // declares one unit, so the handler's u32 read runs past the end
        let (outcome, _) = run(&dispatcher, &mut client, &[10, 0, 1, 0, 9, 9, 9, 9]);
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::Length));
    }

    #[test]
    fn test_declared_length_beyond_buffer() {
        let dispatcher = Dispatcher::with_handlers(vec![echo(&[10])]).unwrap();
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        let (outcome, _) = run(&dispatcher, &mut client, &[10, 0, 3, 0, 1, 0, 0, 0]);
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::Length));
    }
}
