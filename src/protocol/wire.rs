//! Packet cursors
//!
//! `PacketReader` and `PacketWriter` implement the primitive encodings of the
//! wire format: CARD8/16/32 in the connection's byte order, pure padding, and
//! byte strings followed by the padding that reaches the next 4-byte boundary.
//! All padding arithmetic for requests and replies lives here.

use super::{pad, padded_len, ByteOrder};
use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian};

/// Size of the fixed part of every reply, event and error
pub const REPLY_HEADER_LEN: usize = 32;

/// A read went past the declared length of the packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("read of {requested} bytes at offset {offset} exceeds declared length {limit}")]
pub struct LengthError {
    pub offset: usize,
    pub requested: usize,
    pub limit: usize,
}

/// Read cursor over one packet
///
/// The reader never hands out a byte beyond its declared length, even when the
/// underlying buffer is longer.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
    limit: usize,
    byte_order: ByteOrder,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        PacketReader {
            data,
            pos: 0,
            limit: data.len(),
            byte_order,
        }
    }

    /// Reader bounded by a declared length in bytes
    pub fn with_limit(data: &'a [u8], declared_len: usize, byte_order: ByteOrder) -> Self {
        PacketReader {
            data,
            pos: 0,
            limit: declared_len.min(data.len()),
            byte_order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Current offset from the start of the packet
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Declared length of the packet
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes left before the declared length
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Narrow the declared length to `declared_len` bytes from the start
    ///
    /// Fails when the new bound lies beyond the current one or behind the cursor.
    pub fn restrict(&mut self, declared_len: usize) -> Result<(), LengthError> {
        if declared_len > self.limit || declared_len < self.pos {
            return Err(LengthError {
                offset: self.pos,
                requested: declared_len.saturating_sub(self.pos),
                limit: self.limit,
            });
        }
        self.limit = declared_len;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LengthError> {
        if n > self.remaining() {
            return Err(LengthError {
                offset: self.pos,
                requested: n,
                limit: self.limit,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, LengthError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, LengthError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, LengthError> {
        let bytes = self.take(2)?;
        Ok(match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::read_u16(bytes),
            ByteOrder::LSBFirst => LittleEndian::read_u16(bytes),
        })
    }

    pub fn read_i16(&mut self) -> Result<i16, LengthError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, LengthError> {
        let bytes = self.take(4)?;
        Ok(match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::read_u32(bytes),
            ByteOrder::LSBFirst => LittleEndian::read_u32(bytes),
        })
    }

    pub fn read_i32(&mut self) -> Result<i32, LengthError> {
        Ok(self.read_u32()? as i32)
    }

    /// Skip `n` bytes of padding
    pub fn skip(&mut self, n: usize) -> Result<(), LengthError> {
        self.take(n).map(|_| ())
    }

    /// Skip whatever is left of the declared length
    pub fn skip_rest(&mut self) {
        self.pos = self.limit;
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], LengthError> {
        self.take(n)
    }

    /// Read `n` bytes and consume the padding up to the next 4-byte boundary
    pub fn read_padded_bytes(&mut self, n: usize) -> Result<&'a [u8], LengthError> {
        let bytes = self.take(padded_len(n))?;
        Ok(&bytes[..n])
    }

    /// Read an `n`-byte string followed by its alignment padding
    pub fn read_padded_string(&mut self, n: usize) -> Result<String, LengthError> {
        let bytes = self.read_padded_bytes(n)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read `count` CHAR2B units. CHAR2B is (byte1, byte2) in every byte order.
    pub fn read_char2b(&mut self, count: usize) -> Result<Vec<u16>, LengthError> {
        let bytes = self.take(count * 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|unit| BigEndian::read_u16(unit))
            .collect())
    }
}

/// Growable output buffer mirroring `PacketReader`'s encodings
#[derive(Debug, Clone)]
pub struct PacketWriter {
    buf: Vec<u8>,
    byte_order: ByteOrder,
    reply_start: Option<usize>,
}

impl PacketWriter {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self::with_capacity(byte_order, 0)
    }

    pub fn with_capacity(byte_order: ByteOrder, capacity: usize) -> Self {
        PacketWriter {
            buf: Vec::with_capacity(capacity),
            byte_order,
            reply_start: None,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Drop all output, keeping the allocation
    pub fn clear(&mut self) {
        self.buf.clear();
        self.reply_start = None;
    }

    /// Discard output past `len`, e.g. a reply abandoned halfway
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
        self.reply_start = None;
    }

    /// Reader over everything written so far
    pub fn reader(&self) -> PacketReader<'_> {
        PacketReader::new(&self.buf, self.byte_order)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u16(&mut bytes, value),
            ByteOrder::LSBFirst => LittleEndian::write_u16(&mut bytes, value),
        }
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u32(&mut bytes, value),
            ByteOrder::LSBFirst => LittleEndian::write_u32(&mut bytes, value),
        }
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    /// Write `n` zero bytes
    pub fn write_pad(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write `bytes` followed by the padding up to the next 4-byte boundary
    pub fn write_padded_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        self.write_pad(pad(bytes.len()));
    }

    pub fn write_padded_string(&mut self, value: &str) {
        self.write_padded_bytes(value.as_bytes());
    }

    /// Write a STR: one length byte then the bytes, unpadded
    pub fn write_str8(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.buf.push(len as u8);
        self.buf.extend_from_slice(&bytes[..len]);
    }

    /// Pad the buffer to a 4-byte boundary
    pub fn align(&mut self) {
        self.write_pad(pad(self.buf.len()));
    }

    /// Overwrite a CARD32 already written at `offset`
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        let slot = &mut self.buf[offset..offset + 4];
        match self.byte_order {
            ByteOrder::MSBFirst => BigEndian::write_u32(slot, value),
            ByteOrder::LSBFirst => LittleEndian::write_u32(slot, value),
        }
    }

    /// Start a reply: type byte, data byte, sequence and a length placeholder
    pub fn begin_reply(&mut self, data: u8, sequence: u16) {
        self.reply_start = Some(self.buf.len());
        self.write_u8(1);
        self.write_u8(data);
        self.write_u16(sequence);
        self.write_u32(0);
    }

    /// Close the reply opened by `begin_reply`
    ///
    /// Fills the reply to its 32-byte minimum, pads it to a 4-byte boundary and
    /// writes the reply length (4-byte units beyond the first 32 bytes).
    pub fn finish_reply(&mut self) {
        let Some(start) = self.reply_start.take() else {
            log::warn!("finish_reply without begin_reply");
            return;
        };
        let used = self.buf.len() - start;
        if used < REPLY_HEADER_LEN {
            self.write_pad(REPLY_HEADER_LEN - used);
        }
        self.align();
        let extra = (self.buf.len() - start - REPLY_HEADER_LEN) / 4;
        self.patch_u32(start + 4, extra as u32);
    }
}
