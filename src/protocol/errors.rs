//! X11 protocol error codes and error handling

use super::types::*;
use super::wire::{LengthError, PacketWriter};
use std::fmt;

/// X11 error codes as defined in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Request = 1,
    Value = 2,
    Window = 3,
    Pixmap = 4,
    Atom = 5,
    Cursor = 6,
    Font = 7,
    Match = 8,
    Drawable = 9,
    Access = 10,
    Alloc = 11,
    Colormap = 12,
    GContext = 13,
    IDChoice = 14,
    Name = 15,
    Length = 16,
    Implementation = 17,
}

impl ErrorCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(ErrorCode::Request),
            2 => Some(ErrorCode::Value),
            3 => Some(ErrorCode::Window),
            4 => Some(ErrorCode::Pixmap),
            5 => Some(ErrorCode::Atom),
            6 => Some(ErrorCode::Cursor),
            7 => Some(ErrorCode::Font),
            8 => Some(ErrorCode::Match),
            9 => Some(ErrorCode::Drawable),
            10 => Some(ErrorCode::Access),
            11 => Some(ErrorCode::Alloc),
            12 => Some(ErrorCode::Colormap),
            13 => Some(ErrorCode::GContext),
            14 => Some(ErrorCode::IDChoice),
            15 => Some(ErrorCode::Name),
            16 => Some(ErrorCode::Length),
            17 => Some(ErrorCode::Implementation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Request => "Request: bad request code",
            ErrorCode::Value => "Value: integer parameter out of range",
            ErrorCode::Window => "Window: invalid Window parameter",
            ErrorCode::Pixmap => "Pixmap: invalid Pixmap parameter",
            ErrorCode::Atom => "Atom: invalid Atom parameter",
            ErrorCode::Cursor => "Cursor: invalid Cursor parameter",
            ErrorCode::Font => "Font: invalid Font parameter",
            ErrorCode::Match => "Match: parameter mismatch",
            ErrorCode::Drawable => "Drawable: invalid Drawable parameter",
            ErrorCode::Access => "Access: attempt to access private resource",
            ErrorCode::Alloc => "Alloc: insufficient resources",
            ErrorCode::Colormap => "Colormap: invalid Colormap parameter",
            ErrorCode::GContext => "GContext: invalid GC parameter",
            ErrorCode::IDChoice => "IDChoice: invalid resource ID for this connection",
            ErrorCode::Name => "Name: font or color name doesn't exist",
            ErrorCode::Length => "Length: request length incorrect",
            ErrorCode::Implementation => "Implementation: server implementation error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// X11 error packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct X11Error {
    pub code: ErrorCode,
    pub sequence: u16,
    pub bad_value: u32,
    pub minor_opcode: u16,
    pub major_opcode: u8,
}

impl X11Error {
    pub fn new(
        code: ErrorCode,
        sequence: u16,
        bad_value: u32,
        minor_opcode: u16,
        major_opcode: u8,
    ) -> Self {
        X11Error {
            code,
            sequence,
            bad_value,
            minor_opcode,
            major_opcode,
        }
    }

    /// Encode error to wire format (32 bytes)
    pub fn encode(&self, writer: &mut PacketWriter) {
        writer.write_u8(0); // Error reply type
        writer.write_u8(self.code as u8);
        writer.write_u16(self.sequence);
        writer.write_u32(self.bad_value);
        writer.write_u16(self.minor_opcode);
        writer.write_u8(self.major_opcode);
        writer.write_pad(21);
    }
}

impl fmt::Display for X11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X11 Error: {} (sequence: {}, value: 0x{:08x}, major: {}, minor: {})",
            self.code, self.sequence, self.bad_value, self.major_opcode, self.minor_opcode
        )
    }
}

impl std::error::Error for X11Error {}

/// Helper functions to create common errors
impl X11Error {
    pub fn bad_request(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Request, sequence, 0, 0, major_opcode)
    }

    pub fn bad_length(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Length, sequence, 0, 0, major_opcode)
    }

    pub fn implementation_error(sequence: u16, major_opcode: u8) -> Self {
        X11Error::new(ErrorCode::Implementation, sequence, 0, 0, major_opcode)
    }
}

/// Typed failure of a single request
///
/// Handlers return these; only the dispatcher turns them into error packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// The request named a resource or value the server does not accept
    #[error("{code} (value 0x{bad_value:08x})")]
    Protocol { code: ErrorCode, bad_value: u32 },

    /// The request body is shorter than its fields
    #[error("request too short: {0}")]
    Length(#[from] LengthError),

    /// Internal failure not attributable to the client
    #[error("implementation failure: {0}")]
    Implementation(String),
}

impl RequestError {
    pub fn bad_font(font: FontId) -> Self {
        RequestError::Protocol {
            code: ErrorCode::Font,
            bad_value: font.id().get(),
        }
    }

    pub fn bad_gc(gc: GContext) -> Self {
        RequestError::Protocol {
            code: ErrorCode::GContext,
            bad_value: gc.id().get(),
        }
    }

    pub fn bad_id_choice(id: XID) -> Self {
        RequestError::Protocol {
            code: ErrorCode::IDChoice,
            bad_value: id.get(),
        }
    }

    pub fn bad_name() -> Self {
        RequestError::Protocol {
            code: ErrorCode::Name,
            bad_value: 0,
        }
    }

    pub fn bad_request() -> Self {
        RequestError::Protocol {
            code: ErrorCode::Request,
            bad_value: 0,
        }
    }

    pub fn bad_value(value: u32) -> Self {
        RequestError::Protocol {
            code: ErrorCode::Value,
            bad_value: value,
        }
    }

    /// Wire error for this failure on the given request
    pub fn to_x11(&self, sequence: u16, major_opcode: u8, minor_opcode: u16) -> X11Error {
        match self {
            RequestError::Protocol { code, bad_value } => {
                X11Error::new(*code, sequence, *bad_value, minor_opcode, major_opcode)
            }
            RequestError::Length(_) => X11Error::new(
                ErrorCode::Length,
                sequence,
                0,
                minor_opcode,
                major_opcode,
            ),
            RequestError::Implementation(_) => X11Error::new(
                ErrorCode::Implementation,
                sequence,
                0,
                minor_opcode,
                major_opcode,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ByteOrder;

    #[test]
    fn test_error_packet_layout() {
        let error = X11Error::new(ErrorCode::Font, 0x0102, 0xcafe, 0, 47);
        let mut writer = PacketWriter::new(ByteOrder::LSBFirst);
        error.encode(&mut writer);

        let bytes = writer.as_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[1], 7);
        assert_eq!(&bytes[2..4], &[0x02, 0x01]);
        assert_eq!(&bytes[4..8], &[0xfe, 0xca, 0, 0]);
        assert_eq!(bytes[10], 47);
    }

    #[test]
    fn test_error_code_round_trip() {
        for code in 1..=17 {
            assert_eq!(ErrorCode::from_u8(code).map(|c| c as u8), Some(code));
        }
        assert!(ErrorCode::from_u8(0).is_none());
        assert!(ErrorCode::from_u8(18).is_none());
    }

    #[test]
    fn test_request_error_conversion() {
        let err = RequestError::bad_gc(GContext::new(0x400001));
        let wire = err.to_x11(5, 48, 0);
        assert_eq!(wire.code, ErrorCode::GContext);
        assert_eq!(wire.bad_value, 0x400001);
        assert_eq!(wire.sequence, 5);

        let short = RequestError::from(LengthError {
            offset: 4,
            requested: 4,
            limit: 6,
        });
        assert_eq!(short.to_x11(6, 45, 0).code, ErrorCode::Length);
    }
}
