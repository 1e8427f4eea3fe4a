//! Connection layer
//!
//! One `Connection` per client: it performs the setup handshake, frames
//! requests off the stream, hands them to the server and writes back
//! whatever the request produced. All output of one request leaves in a
//! single write, so multi-reply sequences are never interleaved.

use crate::error::ServerError;
use crate::protocol::*;
use crate::server::client::RESOURCE_ID_MASK;
use crate::server::{Client, Server};
use std::io::{self, Read, Write};
use std::sync::Arc;

enum Frame {
    Request(Vec<u8>),
    /// Length check failed; the body was skipped
    Rejected(X11Error),
    Closed,
}

/// A client connection over any byte stream
pub struct Connection<S: Read + Write> {
    stream: S,
    client: Client,
    server: Arc<Server>,
}

impl<S: Read + Write> Connection<S> {
    /// Run the connection setup handshake
    pub fn accept(mut stream: S, server: Arc<Server>) -> Result<Self, ServerError> {
        let setup = match SetupRequest::parse(&mut stream) {
            Ok(setup) => setup,
            Err(SetupError::ByteOrder(byte)) => {
                let reason = format!("invalid byte order 0x{:02x}", byte);
                refuse(&mut stream, ByteOrder::LSBFirst, &reason)?;
                return Err(SetupError::ByteOrder(byte).into());
            }
            Err(e) => return Err(e.into()),
        };
        log::debug!("Setup request: {:?}", setup);

        if setup.protocol_major_version != PROTOCOL_MAJOR_VERSION {
            let reason = format!(
                "protocol version {}.{} not supported",
                setup.protocol_major_version, setup.protocol_minor_version
            );
            refuse(&mut stream, setup.byte_order, &reason)?;
            return Err(ServerError::Refused(reason));
        }

        let client = server.register_client(setup.byte_order);
        let config = server.config();
        let response = SetupResponse::Success(SetupSuccess {
            protocol_major_version: PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: PROTOCOL_MINOR_VERSION,
            release_number: config.release_number,
            resource_id_base: client.resource_id_base(),
            resource_id_mask: RESOURCE_ID_MASK,
            motion_buffer_size: 256,
            maximum_request_length: DEFAULT_MAX_REQUEST_LENGTH as u16,
            image_byte_order: ByteOrder::LSBFirst,
            bitmap_format_bit_order: ByteOrder::LSBFirst,
            bitmap_format_scanline_unit: 32,
            bitmap_format_scanline_pad: 32,
            min_keycode: 8,
            max_keycode: 255,
            vendor: config.vendor.clone(),
        });
        response.encode(&mut stream, client.byte_order())?;
        stream.flush()?;
        log::info!("Client {} connected", client.client_id);

        Ok(Connection {
            stream,
            client,
            server,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Serve requests until the client goes away, then release its resources
    pub fn run(mut self) -> Result<(), ServerError> {
        let result = self.serve();
        self.server.unregister_client(&self.client);
        log::info!("Client {} disconnected", self.client.client_id);
        result
    }

    fn serve(&mut self) -> Result<(), ServerError> {
        loop {
            let frame = self.read_frame()?;
            if let Frame::Closed = frame {
                return Ok(());
            }

            let mut writer = self.server.acquire_writer(&self.client)?;
            match frame {
                Frame::Request(bytes) => {
                    self.server
                        .process_request(&mut self.client, &bytes, &mut writer)
                }
                Frame::Rejected(error) => error.encode(&mut writer),
                Frame::Closed => {}
            }

            let sent = self.send(writer.as_bytes());
            if let Err(e) = self.server.state().writers.release(writer) {
                log::error!("Client {}: {}", self.client.client_id, e);
                return Err(e.into());
            }
            sent?;
        }
    }

    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }

    /// Read the next request, or skip it if its declared length is refused
    fn read_frame(&mut self) -> Result<Frame, ServerError> {
        let mut header = [0u8; 8];
        if !read_or_eof(&mut self.stream, &mut header[..4])? {
            return Ok(Frame::Closed);
        }

        let extended = self.client.big_requests_enabled() && header[2] == 0 && header[3] == 0;
        let header_len = if extended {
            if !read_or_eof(&mut self.stream, &mut header[4..])? {
                return Ok(Frame::Closed);
            }
            8
        } else {
            4
        };

        let mut reader = PacketReader::new(&header[..header_len], self.client.byte_order());
        let parsed = RequestHeader::read(&mut reader, self.client.sequence_number(), extended)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Err(e) = self.client.check_length(&parsed) {
            let sequence = self.client.next_sequence();
            log::debug!(
                "Client {}: opcode {} (seq {}) {}, skipping {} bytes",
                self.client.client_id,
                parsed.major_opcode,
                sequence,
                e,
                parsed.body_len()
            );
            let mut body = (&mut self.stream).take(parsed.body_len() as u64);
            io::copy(&mut body, &mut io::sink())?;
            return Ok(Frame::Rejected(X11Error::bad_length(
                sequence,
                parsed.major_opcode,
            )));
        }

        let mut bytes = vec![0u8; parsed.total_len()];
        bytes[..header_len].copy_from_slice(&header[..header_len]);
        self.stream.read_exact(&mut bytes[header_len..])?;
        Ok(Frame::Request(bytes))
    }
}

/// Fill `buf`, or report `false` if the stream ends first
fn read_or_eof<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn refuse<W: Write>(stream: &mut W, byte_order: ByteOrder, reason: &str) -> io::Result<()> {
    log::warn!("Refusing connection: {}", reason);
    let response = SetupResponse::Failed(SetupFailed {
        protocol_major_version: PROTOCOL_MAJOR_VERSION,
        protocol_minor_version: PROTOCOL_MINOR_VERSION,
        reason: reason.to_string(),
    });
    response.encode(stream, byte_order)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ServerConfig;
    use std::io::Cursor;

    /// Scripted input, captured output
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn preamble(order: u8, major: u16) -> Vec<u8> {
        let mut bytes = vec![order, 0];
        let encode = |v: u16| {
            if order == b'B' {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            }
        };
        bytes.extend_from_slice(&encode(major));
        bytes.extend_from_slice(&encode(0));
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
        bytes
    }

    fn server() -> Arc<Server> {
        Arc::new(Server::new(ServerConfig::default()).unwrap())
    }

    #[test]
    fn test_setup_success() {
        let stream = Duplex {
            input: Cursor::new(preamble(b'l', 11)),
            output: Vec::new(),
        };
        let connection = Connection::accept(stream, server()).unwrap();
        let out = &connection.stream.output;
        assert_eq!(out[0], 1);
        assert_eq!(&out[2..4], &[11, 0]);
        // maximum request length
        assert_eq!(&out[26..28], &[0xff, 0xff]);
        // no screens, no formats
        assert_eq!(&out[28..30], &[0, 0]);
        assert_eq!(out.len() % 4, 0);
    }

    #[test]
    fn test_setup_bad_byte_order() {
        let stream = Duplex {
            input: Cursor::new(preamble(b'x', 11)),
            output: Vec::new(),
        };
        let result = Connection::accept(stream, server());
        assert!(matches!(
            result,
            Err(ServerError::Setup(SetupError::ByteOrder(b'x')))
        ));
    }

    #[test]
    fn test_setup_wrong_version() {
        let stream = Duplex {
            input: Cursor::new(preamble(b'B', 10)),
            output: Vec::new(),
        };
        assert!(matches!(
            Connection::accept(stream, server()),
            Err(ServerError::Refused(_))
        ));
    }

    #[test]
    fn test_zero_length_request_is_skipped() {
        let mut input = preamble(b'l', 11);
        // declared length 0 without BIG-REQUESTS, then GetFontPath
        input.extend_from_slice(&[47, 0, 0, 0]);
        input.extend_from_slice(&[52, 0, 1, 0]);
        let stream = Duplex {
            input: Cursor::new(input),
            output: Vec::new(),
        };
        let mut connection = Connection::accept(stream, server()).unwrap();
        let setup_len = connection.stream.output.len();
        connection.serve().unwrap();

        let out = &connection.stream.output[setup_len..];
        assert_eq!(out.len(), 64);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], ErrorCode::Length as u8);
        assert_eq!(&out[2..4], &[1, 0]);
        assert_eq!(out[32], 1);
        assert_eq!(&out[34..36], &[2, 0]);
    }

    #[test]
    fn test_eof_inside_extended_header_closes() {
        let mut input = preamble(b'l', 11);
        // BigReqEnable, then a header announcing the 32-bit length that never comes
        input.extend_from_slice(&[133, 0, 1, 0]);
        input.extend_from_slice(&[52, 0, 0, 0]);
        let stream = Duplex {
            input: Cursor::new(input),
            output: Vec::new(),
        };
        let mut connection = Connection::accept(stream, server()).unwrap();
        let setup_len = connection.stream.output.len();
        connection.serve().unwrap();

        let out = &connection.stream.output[setup_len..];
        assert_eq!(out.len(), 32);
        assert_eq!(out[0], 1);
        assert!(connection.client.big_requests_enabled());
    }
}
