//! X11 reply encoder
//!
//! This module encodes replies for the font and extension requests. Every
//! function appends one complete reply to the writer; `finish_reply` takes
//! care of the 32-byte minimum, the 4-byte alignment and the length field.

use super::*;

/// Bytes of a QueryFont reply with no properties and no characters
pub const EMPTY_FONT_REPLY_LEN: usize = 60;

/// Write the font header shared by QueryFont and ListFontsWithInfo
///
/// `trailer` is the last CARD32 of the header: the character count for
/// QueryFont, the replies hint for ListFontsWithInfo.
fn encode_font_info(writer: &mut PacketWriter, font: &Font, trailer: u32) {
    font.min_bounds.encode(writer);
    writer.write_pad(4);
    font.max_bounds.encode(writer);
    writer.write_pad(4);
    writer.write_u16(font.min_char_or_byte2);
    writer.write_u16(font.max_char_or_byte2);
    writer.write_u16(font.default_char);
    writer.write_u16(font.properties.len() as u16);
    writer.write_u8(font.draw_direction as u8);
    writer.write_u8(font.min_byte1);
    writer.write_u8(font.max_byte1);
    writer.write_bool(font.all_chars_exist);
    writer.write_i16(font.font_ascent);
    writer.write_i16(font.font_descent);
    writer.write_u32(trailer);
}

fn encode_properties(writer: &mut PacketWriter, font: &Font) {
    for (atom, value) in &font.properties {
        writer.write_u32(atom.get());
        writer.write_u32(*value);
    }
}

/// Encode QueryFont reply: font header, properties, then the character table
pub fn encode_query_font_reply(writer: &mut PacketWriter, sequence: u16, font: &Font) {
    writer.begin_reply(0, sequence);
    encode_font_info(writer, font, font.char_infos.len() as u32);
    encode_properties(writer, font);
    for info in &font.char_infos {
        info.encode(writer);
    }
    writer.finish_reply();
}

/// Encode the placeholder QueryFont reply sent for an unknown font
///
/// Same size as a QueryFont reply without properties or characters; every
/// field after the header word is zero.
pub fn encode_empty_query_font_reply(writer: &mut PacketWriter, sequence: u16) {
    writer.begin_reply(0, sequence);
    writer.write_pad(24);
    writer.write_pad(28);
    writer.finish_reply();
}

/// Encode ListFonts reply
pub fn encode_list_fonts_reply(writer: &mut PacketWriter, sequence: u16, names: &[String]) {
    writer.begin_reply(0, sequence);
    writer.write_u16(names.len() as u16);
    writer.write_pad(22);
    for name in names {
        writer.write_str8(name);
    }
    writer.finish_reply();
}

/// Encode one ListFontsWithInfo reply
///
/// `remaining` counts this reply and those still to come, so the client sees
/// M, M-1, ..., 1.
pub fn encode_list_fonts_with_info_reply(
    writer: &mut PacketWriter,
    sequence: u16,
    font: &Font,
    remaining: u32,
) {
    let name = &font.name.as_bytes()[..font.name.len().min(u8::MAX as usize)];
    writer.begin_reply(name.len() as u8, sequence);
    encode_font_info(writer, font, remaining);
    encode_properties(writer, font);
    writer.write_padded_bytes(name);
    writer.finish_reply();
}

/// Encode the reply that ends a ListFontsWithInfo sequence
pub fn encode_list_fonts_with_info_end(writer: &mut PacketWriter, sequence: u16) {
    writer.begin_reply(0, sequence);
    writer.write_pad(EMPTY_FONT_REPLY_LEN - 8);
    writer.finish_reply();
}

/// Encode QueryTextExtents reply
pub fn encode_query_text_extents_reply(
    writer: &mut PacketWriter,
    sequence: u16,
    font: &Font,
    extents: &TextExtents,
) {
    writer.begin_reply(font.draw_direction as u8, sequence);
    writer.write_i16(font.font_ascent);
    writer.write_i16(font.font_descent);
    writer.write_i16(clamp_i16(-extents.top));
    writer.write_i16(clamp_i16(extents.bottom));
    writer.write_i32(extents.width);
    writer.write_i32(extents.left);
    writer.write_i32(extents.right);
    writer.finish_reply();
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Encode GetFontPath reply
pub fn encode_get_font_path_reply(writer: &mut PacketWriter, sequence: u16, paths: &[String]) {
    writer.begin_reply(0, sequence);
    writer.write_u16(paths.len() as u16);
    writer.write_pad(22);
    for path in paths {
        writer.write_str8(path);
    }
    writer.finish_reply();
}

/// Encode QueryExtension reply
pub fn encode_query_extension_reply(
    writer: &mut PacketWriter,
    sequence: u16,
    present: bool,
    major_opcode: u8,
    first_event: u8,
    first_error: u8,
) {
    writer.begin_reply(0, sequence);
    writer.write_bool(present);
    writer.write_u8(major_opcode);
    writer.write_u8(first_event);
    writer.write_u8(first_error);
    writer.finish_reply();
}

/// Encode ListExtensions reply
pub fn encode_list_extensions_reply(writer: &mut PacketWriter, sequence: u16, names: &[&str]) {
    writer.begin_reply(names.len() as u8, sequence);
    writer.write_pad(24);
    for name in names {
        writer.write_str8(name);
    }
    writer.finish_reply();
}

/// Encode BigReqEnable reply carrying the maximum request length in 4-byte units
pub fn encode_big_requests_enable_reply(
    writer: &mut PacketWriter,
    sequence: u16,
    maximum_request_length: u32,
) {
    writer.begin_reply(0, sequence);
    writer.write_u32(maximum_request_length);
    writer.finish_reply();
}
