//! Core X11 protocol types
//!
//! These types represent the fundamental identifiers exchanged by the font
//! and extension requests. They are kept minimal and close to the wire.

use std::fmt;

/// X11 resource ID. All server resources are identified by 29-bit IDs.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XID(pub u32);

impl XID {
    pub fn new(id: u32) -> Self {
        XID(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for XID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Font ID, chosen by the client in OpenFont
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontId(pub XID);

impl FontId {
    pub fn new(id: u32) -> Self {
        FontId(XID::new(id))
    }

    pub fn id(&self) -> XID {
        self.0
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Graphics Context ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GContext(pub XID);

impl GContext {
    pub fn new(id: u32) -> Self {
        GContext(XID::new(id))
    }

    pub fn id(&self) -> XID {
        self.0
    }
}

/// Atom - interned string identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    // predefined font property atoms
    pub const UNDERLINE_POSITION: Atom = Atom(51);
    pub const UNDERLINE_THICKNESS: Atom = Atom(52);
    pub const X_HEIGHT: Atom = Atom(56);
    pub const QUAD_WIDTH: Atom = Atom(57);
    pub const POINT_SIZE: Atom = Atom(59);
    pub const CAP_HEIGHT: Atom = Atom(66);

    pub fn new(id: u32) -> Self {
        Atom(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

/// Byte order for multi-byte values on one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ByteOrder {
    LSBFirst = 0,
    MSBFirst = 1,
}

impl ByteOrder {
    /// Decode the byte-order byte that opens the connection preamble
    pub fn from_preamble(byte: u8) -> Option<Self> {
        match byte {
            b'l' => Some(ByteOrder::LSBFirst),
            b'B' => Some(ByteOrder::MSBFirst),
            _ => None,
        }
    }
}

/// Font drawing direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DrawDirection {
    #[default]
    LeftToRight = 0,
    RightToLeft = 1,
}
