//! X11 protocol requests
//!
//! Opcodes, the common request header, and the request bodies of the font and
//! extension families. Bodies are decoded straight from a `PacketReader`
//! positioned after the header.

use super::types::*;
use super::wire::{LengthError, PacketReader};

/// X11 request opcodes handled by this server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestOpcode {
    OpenFont = 45,
    CloseFont = 46,
    QueryFont = 47,
    QueryTextExtents = 48,
    ListFonts = 49,
    ListFontsWithInfo = 50,
    GetFontPath = 52,
    QueryExtension = 98,
    ListExtensions = 99,
}

impl RequestOpcode {
    pub fn from_u8(opcode: u8) -> Option<Self> {
        match opcode {
            45 => Some(RequestOpcode::OpenFont),
            46 => Some(RequestOpcode::CloseFont),
            47 => Some(RequestOpcode::QueryFont),
            48 => Some(RequestOpcode::QueryTextExtents),
            49 => Some(RequestOpcode::ListFonts),
            50 => Some(RequestOpcode::ListFontsWithInfo),
            52 => Some(RequestOpcode::GetFontPath),
            98 => Some(RequestOpcode::QueryExtension),
            99 => Some(RequestOpcode::ListExtensions),
            _ => None,
        }
    }
}

/// Fixed part of every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub major_opcode: u8,
    /// Second byte: minor opcode for extensions, a request-specific flag otherwise
    pub data: u8,
    /// Total request length in 4-byte units, header included
    pub length: u32,
    /// Whether the length used the BIG-REQUESTS 32-bit encoding
    pub extended: bool,
    pub sequence: u16,
}

impl RequestHeader {
    /// Decode the header at the reader's cursor
    ///
    /// A zero 16-bit length introduces a 32-bit length only when the client
    /// negotiated extended lengths; otherwise it is taken literally.
    pub fn read(
        reader: &mut PacketReader<'_>,
        sequence: u16,
        extended_enabled: bool,
    ) -> Result<Self, LengthError> {
        let major_opcode = reader.read_u8()?;
        let data = reader.read_u8()?;
        let short_length = reader.read_u16()?;
        let (length, extended) = if short_length == 0 && extended_enabled {
            (reader.read_u32()?, true)
        } else {
            (short_length as u32, false)
        };
        Ok(RequestHeader {
            major_opcode,
            data,
            length,
            extended,
            sequence,
        })
    }

    /// Bytes taken by the header itself
    pub fn header_len(&self) -> usize {
        if self.extended {
            8
        } else {
            4
        }
    }

    /// Declared size of the whole request in bytes
    pub fn total_len(&self) -> usize {
        self.length as usize * 4
    }

    /// Declared size of the request body in bytes
    pub fn body_len(&self) -> usize {
        self.total_len().saturating_sub(self.header_len())
    }

    /// Minor opcode as reported in error packets
    pub fn minor_opcode(&self) -> u16 {
        self.data as u16
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFontRequest {
    pub fid: FontId,
    pub name: String,
}

impl OpenFontRequest {
    pub fn read(body: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        let fid = FontId::new(body.read_u32()?);
        let name_len = body.read_u16()? as usize;
        body.skip(2)?;
        let name = body.read_padded_string(name_len)?;
        Ok(OpenFontRequest { fid, name })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseFontRequest {
    pub font: FontId,
}

impl CloseFontRequest {
    pub fn read(body: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        Ok(CloseFontRequest {
            font: FontId::new(body.read_u32()?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFontRequest {
    pub font: FontId,
}

impl QueryFontRequest {
    pub fn read(body: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        Ok(QueryFontRequest {
            font: FontId::new(body.read_u32()?),
        })
    }
}

/// QueryTextExtents body
///
/// `fontable` is a font ID or a graphics context ID; the handler decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTextExtentsRequest {
    pub fontable: XID,
    pub text: Vec<u16>,
}

impl QueryTextExtentsRequest {
    /// Decode the body; `odd_length` is the request's data byte
    ///
    /// The string occupies the rest of the request. Half its byte count is the
    /// number of CHAR2B units, less one when `odd_length` is set, in which case
    /// the final unit is padding.
    pub fn read(body: &mut PacketReader<'_>, odd_length: bool) -> Result<Self, LengthError> {
        let fontable = XID::new(body.read_u32()?);
        let payload = body.remaining();
        let units = (payload / 2)
            .checked_sub(odd_length as usize)
            .ok_or(LengthError {
                offset: body.position(),
                requested: 2,
                limit: body.limit(),
            })?;
        let text = body.read_char2b(units)?;
        body.skip_rest();
        Ok(QueryTextExtentsRequest { fontable, text })
    }
}

/// ListFonts and ListFontsWithInfo body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFontsRequest {
    pub max_names: u16,
    pub pattern: String,
}

impl ListFontsRequest {
    pub fn read(body: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        let max_names = body.read_u16()?;
        let pattern_len = body.read_u16()? as usize;
        let pattern = body.read_padded_string(pattern_len)?;
        Ok(ListFontsRequest { max_names, pattern })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExtensionRequest {
    pub name: String,
}

impl QueryExtensionRequest {
    pub fn read(body: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        let name_len = body.read_u16()? as usize;
        body.skip(2)?;
        let name = body.read_padded_string(name_len)?;
        Ok(QueryExtensionRequest { name })
    }
}
