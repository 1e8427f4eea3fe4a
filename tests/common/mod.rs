//! Shared helpers for the integration tests
//!
//! A scripted in-memory stream for driving `Connection`, request builders and
//! a splitter that cuts the server's output back into packets.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use xwire::protocol::CharInfo;
use xwire::{ByteOrder, PacketReader, PacketWriter};

/// Scripted client input; everything the server writes is captured
pub struct Duplex {
    input: Cursor<Vec<u8>>,
    output: Arc<Mutex<Vec<u8>>>,
}

impl Duplex {
    pub fn new(input: Vec<u8>) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let output = Arc::new(Mutex::new(Vec::new()));
        let duplex = Duplex {
            input: Cursor::new(input),
            output: Arc::clone(&output),
        };
        (duplex, output)
    }
}

impl Read for Duplex {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for Duplex {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds a client byte stream: preamble followed by requests
pub struct Script {
    writer: PacketWriter,
}

impl Script {
    pub fn new(order: ByteOrder) -> Self {
        let mut writer = PacketWriter::new(order);
        writer.write_u8(match order {
            ByteOrder::LSBFirst => b'l',
            ByteOrder::MSBFirst => b'B',
        });
        writer.write_pad(1);
        writer.write_u16(11);
        writer.write_u16(0);
        writer.write_u16(0);
        writer.write_u16(0);
        writer.write_pad(2);
        Script { writer }
    }

    /// Append a request whose body is built by `body`
    pub fn request(mut self, opcode: u8, data: u8, body: impl FnOnce(&mut PacketWriter)) -> Self {
        let mut payload = PacketWriter::new(self.writer.byte_order());
        body(&mut payload);
        payload.align();
        self.writer.write_u8(opcode);
        self.writer.write_u8(data);
        self.writer.write_u16((1 + payload.len() / 4) as u16);
        self.writer.write_bytes(payload.as_bytes());
        self
    }

    /// Append bytes verbatim
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.writer.write_bytes(bytes);
        self
    }

    pub fn open_font(self, fid: u32, name: &str) -> Self {
        self.request(45, 0, |w| {
            w.write_u32(fid);
            w.write_u16(name.len() as u16);
            w.write_pad(2);
            w.write_padded_string(name);
        })
    }

    pub fn close_font(self, fid: u32) -> Self {
        self.request(46, 0, |w| w.write_u32(fid))
    }

    pub fn query_font(self, fid: u32) -> Self {
        self.request(47, 0, |w| w.write_u32(fid))
    }

    /// QueryTextExtents over 8-bit text sent as CHAR2B units
    pub fn query_text_extents(self, fontable: u32, text: &str) -> Self {
        let odd = text.len() % 2 == 1;
        self.request(48, odd as u8, |w| {
            w.write_u32(fontable);
            for byte in text.bytes() {
                w.write_u8(0);
                w.write_u8(byte);
            }
        })
    }

    pub fn list_fonts(self, max_names: u16, pattern: &str) -> Self {
        self.list_request(49, max_names, pattern)
    }

    pub fn list_fonts_with_info(self, max_names: u16, pattern: &str) -> Self {
        self.list_request(50, max_names, pattern)
    }

    fn list_request(self, opcode: u8, max_names: u16, pattern: &str) -> Self {
        self.request(opcode, 0, |w| {
            w.write_u16(max_names);
            w.write_u16(pattern.len() as u16);
            w.write_padded_string(pattern);
        })
    }

    pub fn get_font_path(self) -> Self {
        self.request(52, 0, |_| {})
    }

    pub fn query_extension(self, name: &str) -> Self {
        self.request(98, 0, |w| {
            w.write_u16(name.len() as u16);
            w.write_pad(2);
            w.write_padded_string(name);
        })
    }

    pub fn list_extensions(self) -> Self {
        self.request(99, 0, |_| {})
    }

    pub fn big_req_enable(self, major_opcode: u8) -> Self {
        self.request(major_opcode, 0, |_| {})
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

/// One packet sent by the server after the setup block
#[derive(Debug, Clone)]
pub struct Packet {
    pub bytes: Vec<u8>,
    order: ByteOrder,
}

impl Packet {
    pub fn is_reply(&self) -> bool {
        self.bytes[0] == 1
    }

    pub fn is_error(&self) -> bool {
        self.bytes[0] == 0
    }

    /// Error code, or the data byte of a reply
    pub fn code(&self) -> u8 {
        self.bytes[1]
    }

    pub fn sequence(&self) -> u16 {
        self.u16_at(2)
    }

    pub fn length(&self) -> u32 {
        self.u32_at(4)
    }

    pub fn u16_at(&self, offset: usize) -> u16 {
        PacketReader::new(&self.bytes[offset..], self.order)
            .read_u16()
            .unwrap()
    }

    pub fn i16_at(&self, offset: usize) -> i16 {
        self.u16_at(offset) as i16
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        PacketReader::new(&self.bytes[offset..], self.order)
            .read_u32()
            .unwrap()
    }

    pub fn i32_at(&self, offset: usize) -> i32 {
        self.u32_at(offset) as i32
    }

    pub fn char_info_at(&self, offset: usize) -> CharInfo {
        CharInfo::read(&mut PacketReader::new(&self.bytes[offset..], self.order)).unwrap()
    }
}

/// Split server output into the setup block and the packets after it
pub fn split_output(output: &[u8], order: ByteOrder) -> (Vec<u8>, Vec<Packet>) {
    let setup_extra = PacketReader::new(&output[6..8], order).read_u16().unwrap() as usize;
    let setup_len = 8 + setup_extra * 4;
    let setup = output[..setup_len].to_vec();

    let mut packets = Vec::new();
    let mut rest = &output[setup_len..];
    while !rest.is_empty() {
        let len = if rest[0] == 1 {
            32 + PacketReader::new(&rest[4..8], order).read_u32().unwrap() as usize * 4
        } else {
            32
        };
        packets.push(Packet {
            bytes: rest[..len].to_vec(),
            order,
        });
        rest = &rest[len..];
    }
    (setup, packets)
}
