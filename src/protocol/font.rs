//! Font metric records
//!
//! `CharInfo` and the font header fields are fixed-layout protocol structures;
//! `Font` groups them with the font's name and property list.

use super::types::*;
use super::wire::{LengthError, PacketReader, PacketWriter};
use crate::error::ConfigError;
use std::collections::BTreeMap;

/// Highest character code within one row
const MAX_ROW_CHAR: usize = 0xff;

/// Metrics of one character (CHARINFO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharInfo {
    pub left_side_bearing: i16,
    pub right_side_bearing: i16,
    pub character_width: i16,
    pub ascent: i16,
    pub descent: i16,
    pub attributes: u16,
}

impl CharInfo {
    /// Encoded size in bytes
    pub const SIZE: usize = 12;

    pub fn encode(&self, writer: &mut PacketWriter) {
        writer.write_i16(self.left_side_bearing);
        writer.write_i16(self.right_side_bearing);
        writer.write_i16(self.character_width);
        writer.write_i16(self.ascent);
        writer.write_i16(self.descent);
        writer.write_u16(self.attributes);
    }

    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, LengthError> {
        Ok(CharInfo {
            left_side_bearing: reader.read_i16()?,
            right_side_bearing: reader.read_i16()?,
            character_width: reader.read_i16()?,
            ascent: reader.read_i16()?,
            descent: reader.read_i16()?,
            attributes: reader.read_u16()?,
        })
    }

    /// A character with all-zero metrics does not exist in the font
    pub fn is_nonexistent(&self) -> bool {
        self.left_side_bearing == 0
            && self.right_side_bearing == 0
            && self.character_width == 0
            && self.ascent == 0
            && self.descent == 0
    }
}

/// Measured extents of a string, relative to the origin of its first character
///
/// `top` is negative above the baseline; `bottom` is positive below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtents {
    pub width: i32,
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

/// An opened or openable font
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    pub name: String,
    pub min_bounds: CharInfo,
    pub max_bounds: CharInfo,
    pub min_char_or_byte2: u16,
    pub max_char_or_byte2: u16,
    pub default_char: u16,
    pub draw_direction: DrawDirection,
    pub min_byte1: u8,
    pub max_byte1: u8,
    pub all_chars_exist: bool,
    pub font_ascent: i16,
    pub font_descent: i16,
    /// Property name atom to value, ordered by atom
    pub properties: BTreeMap<Atom, u32>,
    /// Row-major over byte1 then byte2
    pub char_infos: Vec<CharInfo>,
}

impl Font {
    /// Build a single-row font from its character table
    ///
    /// Bounds, the all-characters-exist flag and the table layout are derived
    /// from `char_infos`, which covers `first..=first + len - 1`. The table
    /// must be non-empty and end at or below 255.
    pub fn from_chars(
        name: &str,
        first: u16,
        font_ascent: i16,
        font_descent: i16,
        char_infos: Vec<CharInfo>,
    ) -> Result<Self, ConfigError> {
        let last = (first as usize)
            .checked_add(char_infos.len())
            .and_then(|end| end.checked_sub(1))
            .filter(|last| !char_infos.is_empty() && *last <= MAX_ROW_CHAR)
            .ok_or_else(|| ConfigError::CharRange {
                font: name.to_string(),
                first,
                count: char_infos.len(),
            })? as u16;
        let mut min_bounds: Option<CharInfo> = None;
        let mut max_bounds: Option<CharInfo> = None;
        for info in char_infos.iter().filter(|info| !info.is_nonexistent()) {
            let lo = min_bounds.get_or_insert(*info);
            lo.left_side_bearing = lo.left_side_bearing.min(info.left_side_bearing);
            lo.right_side_bearing = lo.right_side_bearing.min(info.right_side_bearing);
            lo.character_width = lo.character_width.min(info.character_width);
            lo.ascent = lo.ascent.min(info.ascent);
            lo.descent = lo.descent.min(info.descent);
            lo.attributes = lo.attributes.min(info.attributes);

            let hi = max_bounds.get_or_insert(*info);
            hi.left_side_bearing = hi.left_side_bearing.max(info.left_side_bearing);
            hi.right_side_bearing = hi.right_side_bearing.max(info.right_side_bearing);
            hi.character_width = hi.character_width.max(info.character_width);
            hi.ascent = hi.ascent.max(info.ascent);
            hi.descent = hi.descent.max(info.descent);
            hi.attributes = hi.attributes.max(info.attributes);
        }
        let all_chars_exist =
            !char_infos.is_empty() && char_infos.iter().all(|info| !info.is_nonexistent());

        Ok(Font {
            name: name.to_string(),
            min_bounds: min_bounds.unwrap_or_default(),
            max_bounds: max_bounds.unwrap_or_default(),
            min_char_or_byte2: first,
            max_char_or_byte2: last,
            default_char: first,
            draw_direction: DrawDirection::LeftToRight,
            min_byte1: 0,
            max_byte1: 0,
            all_chars_exist,
            font_ascent,
            font_descent,
            properties: BTreeMap::new(),
            char_infos,
        })
    }

    /// Number of entries in the character table
    pub fn defined_chars(&self) -> usize {
        self.char_infos.len()
    }

    /// Metrics for a character, if it lies inside the defined range
    pub fn char_info(&self, code: u16) -> Option<&CharInfo> {
        let byte1 = (code >> 8) as u8;
        let byte2 = code & 0xff;
        if byte1 < self.min_byte1
            || byte1 > self.max_byte1
            || byte2 < self.min_char_or_byte2
            || byte2 > self.max_char_or_byte2
        {
            return None;
        }
        let columns = (self.max_char_or_byte2 - self.min_char_or_byte2) as usize + 1;
        let row = (byte1 - self.min_byte1) as usize;
        let column = (byte2 - self.min_char_or_byte2) as usize;
        self.char_infos
            .get(row * columns + column)
            .filter(|info| !info.is_nonexistent())
    }

    /// Metrics for a character, falling back to the default character
    pub fn char_info_or_default(&self, code: u16) -> Option<&CharInfo> {
        self.char_info(code)
            .or_else(|| self.char_info(self.default_char))
    }
}
