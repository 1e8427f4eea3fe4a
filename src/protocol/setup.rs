//! X11 connection setup protocol
//!
//! This module handles the initial connection handshake between client and server.

use super::*;
use std::io::{self, Read, Write};

/// Failure while reading the connection preamble
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("setup read failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid byte-order byte 0x{0:02x}")]
    ByteOrder(u8),
}

/// Connection setup request from client
#[derive(Debug, Clone)]
pub struct SetupRequest {
    pub byte_order: ByteOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub authorization_protocol_name: String,
    pub authorization_protocol_data: Vec<u8>,
}

impl SetupRequest {
    /// Parse setup request from stream
    pub fn parse<R: Read>(stream: &mut R) -> Result<Self, SetupError> {
        let mut header = [0u8; 12];
        stream.read_exact(&mut header)?;

        // Byte 0: byte order ('B' = MSB, 'l' = LSB)
        let byte_order = ByteOrder::from_preamble(header[0]).ok_or(SetupError::ByteOrder(header[0]))?;

        let mut fixed = PacketReader::new(&header, byte_order);
        fixed.skip(2).map_err(invalid_data)?;
        let protocol_major_version = fixed.read_u16().map_err(invalid_data)?;
        let protocol_minor_version = fixed.read_u16().map_err(invalid_data)?;
        let auth_name_len = fixed.read_u16().map_err(invalid_data)? as usize;
        let auth_data_len = fixed.read_u16().map_err(invalid_data)? as usize;

        // Authorization name and data, each padded to 4 bytes
        let mut auth = vec![0u8; padded_len(auth_name_len) + padded_len(auth_data_len)];
        stream.read_exact(&mut auth)?;
        let mut reader = PacketReader::new(&auth, byte_order);
        let authorization_protocol_name =
            reader.read_padded_string(auth_name_len).map_err(invalid_data)?;
        let authorization_protocol_data = reader
            .read_padded_bytes(auth_data_len)
            .map_err(invalid_data)?
            .to_vec();

        Ok(SetupRequest {
            byte_order,
            protocol_major_version,
            protocol_minor_version,
            authorization_protocol_name,
            authorization_protocol_data,
        })
    }
}

fn invalid_data(err: LengthError) -> SetupError {
    SetupError::Io(io::Error::new(io::ErrorKind::InvalidData, err))
}

/// Setup response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Failed = 0,
    Success = 1,
    Authenticate = 2,
}

/// Setup reply (success case)
///
/// Screens and pixmap formats belong to the window layer, so both lists are
/// sent empty.
#[derive(Debug, Clone)]
pub struct SetupSuccess {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub release_number: u32,
    pub resource_id_base: u32,
    pub resource_id_mask: u32,
    pub motion_buffer_size: u32,
    pub maximum_request_length: u16,
    pub image_byte_order: ByteOrder,
    pub bitmap_format_bit_order: ByteOrder,
    pub bitmap_format_scanline_unit: u8,
    pub bitmap_format_scanline_pad: u8,
    pub min_keycode: u8,
    pub max_keycode: u8,
    pub vendor: String,
}

impl SetupSuccess {
    pub fn encode<W: Write>(&self, stream: &mut W, byte_order: ByteOrder) -> io::Result<()> {
        let mut writer = PacketWriter::new(byte_order);

        writer.write_u8(SetupStatus::Success as u8);
        writer.write_pad(1);
        writer.write_u16(self.protocol_major_version);
        writer.write_u16(self.protocol_minor_version);
        let length_pos = writer.len();
        writer.write_u16(0); // Filled in below

        writer.write_u32(self.release_number);
        writer.write_u32(self.resource_id_base);
        writer.write_u32(self.resource_id_mask);
        writer.write_u32(self.motion_buffer_size);
        writer.write_u16(self.vendor.len() as u16);
        writer.write_u16(self.maximum_request_length);
        writer.write_u8(0); // screens
        writer.write_u8(0); // pixmap formats
        writer.write_u8(self.image_byte_order as u8);
        writer.write_u8(self.bitmap_format_bit_order as u8);
        writer.write_u8(self.bitmap_format_scanline_unit);
        writer.write_u8(self.bitmap_format_scanline_pad);
        writer.write_u8(self.min_keycode);
        writer.write_u8(self.max_keycode);
        writer.write_pad(4);
        writer.write_padded_string(&self.vendor);

        // Length in 4-byte units, excluding the first 8 bytes
        let mut bytes = writer.into_bytes();
        let length = ((bytes.len() - 8) / 4) as u16;
        let length_bytes = match byte_order {
            ByteOrder::MSBFirst => length.to_be_bytes(),
            ByteOrder::LSBFirst => length.to_le_bytes(),
        };
        bytes[length_pos..length_pos + 2].copy_from_slice(&length_bytes);

        stream.write_all(&bytes)
    }
}

/// Setup failed response
#[derive(Debug, Clone)]
pub struct SetupFailed {
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub reason: String,
}

impl SetupFailed {
    pub fn encode<W: Write>(&self, stream: &mut W, byte_order: ByteOrder) -> io::Result<()> {
        let mut writer = PacketWriter::new(byte_order);
        let reason = &self.reason.as_bytes()[..self.reason.len().min(u8::MAX as usize)];

        writer.write_u8(SetupStatus::Failed as u8);
        writer.write_u8(reason.len() as u8);
        writer.write_u16(self.protocol_major_version);
        writer.write_u16(self.protocol_minor_version);
        writer.write_u16((padded_len(reason.len()) / 4) as u16);
        writer.write_padded_bytes(reason);

        stream.write_all(writer.as_bytes())
    }
}

/// Setup response
#[derive(Debug, Clone)]
pub enum SetupResponse {
    Success(SetupSuccess),
    Failed(SetupFailed),
}

impl SetupResponse {
    pub fn encode<W: Write>(&self, stream: &mut W, byte_order: ByteOrder) -> io::Result<()> {
        match self {
            SetupResponse::Success(success) => success.encode(stream, byte_order),
            SetupResponse::Failed(failed) => failed.encode(stream, byte_order),
        }
    }
}
