//! Font requests
//!
//! OpenFont, CloseFont, QueryFont, QueryTextExtents, ListFonts,
//! ListFontsWithInfo and GetFontPath. Fonts come from the server's
//! `FontCatalog`; the open-font table maps client-chosen ids to them.

use super::dispatcher::{RequestContext, RequestHandler};
use crate::protocol::*;
use std::sync::Arc;

const FONT_OPCODES: [u8; 7] = [
    RequestOpcode::OpenFont as u8,
    RequestOpcode::CloseFont as u8,
    RequestOpcode::QueryFont as u8,
    RequestOpcode::QueryTextExtents as u8,
    RequestOpcode::ListFonts as u8,
    RequestOpcode::ListFontsWithInfo as u8,
    RequestOpcode::GetFontPath as u8,
];

/// Handler for the font request family
#[derive(Debug, Default)]
pub struct FontHandler;

impl FontHandler {
    fn open_font(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
    ) -> Result<(), RequestError> {
        let request = OpenFontRequest::read(body)?;
        log::debug!("OpenFont: id={}, name={:?}", request.fid, request.name);

        let font = ctx
            .state
            .catalog
            .lookup(&request.name)
            .ok_or_else(RequestError::bad_name)?;
        ctx.state
            .fonts
            .open(request.fid, font, ctx.client.client_id)
    }

    fn close_font(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
    ) -> Result<(), RequestError> {
        let request = CloseFontRequest::read(body)?;
        log::debug!("CloseFont: id={}", request.font);

        ctx.state
            .fonts
            .close(request.font)
            .map(|_| ())
            .ok_or_else(|| RequestError::bad_font(request.font))
    }

    fn query_font(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        let request = QueryFontRequest::read(body)?;
        match ctx.state.fonts.get(request.font) {
            Some(font) => {
                log::debug!("QueryFont: id={} -> {}", request.font, font.name);
                encode_query_font_reply(out, ctx.sequence(), &font);
            }
            None => {
                log::debug!("QueryFont: id={} not open, sending empty reply", request.font);
                encode_empty_query_font_reply(out, ctx.sequence());
            }
        }
        Ok(())
    }

    /// Resolve a fontable: an open font, or a GC whose font is open
    fn resolve_fontable(ctx: &RequestContext<'_>, fontable: XID) -> Result<Arc<Font>, RequestError> {
        let fid = FontId(fontable);
        if let Some(font) = ctx.state.fonts.get(fid) {
            return Ok(font);
        }
        let gc = GContext(fontable);
        let bound = ctx
            .state
            .gcs
            .font_of(gc)
            .ok_or_else(|| RequestError::bad_gc(gc))?;
        ctx.state
            .fonts
            .get(bound)
            .ok_or_else(|| RequestError::bad_font(bound))
    }

    fn query_text_extents(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        let request = QueryTextExtentsRequest::read(body, ctx.header.data != 0)?;
        let font = Self::resolve_fontable(ctx, request.fontable)?;
        let extents = ctx.state.measurer.measure(&font, &request.text);
        log::debug!(
            "QueryTextExtents: fontable={}, {} chars, width {}",
            request.fontable,
            request.text.len(),
            extents.width
        );
        encode_query_text_extents_reply(out, ctx.sequence(), &font, &extents);
        Ok(())
    }

    fn list_fonts(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        let request = ListFontsRequest::read(body)?;
        let names = ctx
            .state
            .catalog
            .list(&request.pattern, request.max_names as usize);
        log::debug!(
            "ListFonts: pattern={:?}, max={} -> {} names",
            request.pattern,
            request.max_names,
            names.len()
        );
        encode_list_fonts_reply(out, ctx.sequence(), &names);
        Ok(())
    }

    /// One reply per match, then the terminator, all into `out` so the
    /// connection sends the whole series in a single write.
    fn list_fonts_with_info(
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        let request = ListFontsRequest::read(body)?;
        let catalog = &ctx.state.catalog;
        let fonts: Vec<Arc<Font>> = catalog
            .list(&request.pattern, request.max_names as usize)
            .iter()
            .filter_map(|name| catalog.lookup(name))
            .collect();
        log::debug!(
            "ListFontsWithInfo: pattern={:?}, max={} -> {} fonts",
            request.pattern,
            request.max_names,
            fonts.len()
        );

        let total = fonts.len() as u32;
        for (index, font) in fonts.iter().enumerate() {
            encode_list_fonts_with_info_reply(out, ctx.sequence(), font, total - index as u32);
        }
        encode_list_fonts_with_info_end(out, ctx.sequence());
        Ok(())
    }
}

impl RequestHandler for FontHandler {
    fn name(&self) -> &'static str {
        "fonts"
    }

    fn owned_opcodes(&self) -> &[u8] {
        &FONT_OPCODES
    }

    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        match RequestOpcode::from_u8(ctx.header.major_opcode) {
            Some(RequestOpcode::OpenFont) => Self::open_font(ctx, body),
            Some(RequestOpcode::CloseFont) => Self::close_font(ctx, body),
            Some(RequestOpcode::QueryFont) => Self::query_font(ctx, body, out),
            Some(RequestOpcode::QueryTextExtents) => Self::query_text_extents(ctx, body, out),
            Some(RequestOpcode::ListFonts) => Self::list_fonts(ctx, body, out),
            Some(RequestOpcode::ListFontsWithInfo) => Self::list_fonts_with_info(ctx, body, out),
            Some(RequestOpcode::GetFontPath) => {
                // No font path; the catalog is not directory based
                encode_get_font_path_reply(out, ctx.sequence(), &[]);
                Ok(())
            }
            _ => Err(RequestError::Implementation(format!(
                "opcode {} routed to {}",
                ctx.header.major_opcode,
                self.name()
            ))),
        }
    }
}
