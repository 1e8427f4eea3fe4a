//! Shared server resources
//!
//! Process-wide tables consulted by request handlers: the open-font table
//! keyed by client-chosen font IDs, and the graphics-context table that
//! records which font each GC draws with. Both are shared by every client
//! worker; their locks cover a single lookup or mutation and are never held
//! while a reply is encoded.

pub mod catalog;
pub mod measure;

pub use catalog::{glob_match, BuiltinCatalog, FontCatalog};
pub use measure::{CellMeasurer, TextMeasurer};

use crate::protocol::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct OpenFont {
    font: Arc<Font>,
    owner: u32,
}

/// Fonts opened by clients, by font ID
#[derive(Debug, Default)]
pub struct FontTable {
    fonts: Mutex<HashMap<FontId, OpenFont>>,
}

impl FontTable {
    pub fn new() -> Self {
        FontTable::default()
    }

    /// Register `font` under `fid` on behalf of client `owner`
    pub fn open(&self, fid: FontId, font: Arc<Font>, owner: u32) -> Result<(), RequestError> {
        let mut fonts = self.fonts.lock();
        if fonts.contains_key(&fid) {
            return Err(RequestError::bad_id_choice(fid.id()));
        }
        fonts.insert(fid, OpenFont { font, owner });
        Ok(())
    }

    pub fn get(&self, fid: FontId) -> Option<Arc<Font>> {
        self.fonts.lock().get(&fid).map(|open| Arc::clone(&open.font))
    }

    pub fn close(&self, fid: FontId) -> Option<Arc<Font>> {
        self.fonts.lock().remove(&fid).map(|open| open.font)
    }

    /// Close every font a client left open, returning how many were closed
    pub fn close_client(&self, owner: u32) -> usize {
        let mut fonts = self.fonts.lock();
        let before = fonts.len();
        fonts.retain(|_, open| open.owner != owner);
        before - fonts.len()
    }

    pub fn len(&self) -> usize {
        self.fonts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Font bound to each graphics context
///
/// GC creation and teardown belong to the drawing layer, which keeps this
/// table current; the font handlers only read it.
#[derive(Debug, Default)]
pub struct GcTable {
    fonts: Mutex<HashMap<GContext, FontId>>,
}

impl GcTable {
    pub fn new() -> Self {
        GcTable::default()
    }

    /// Set the font of `gc`, returning the previous one
    pub fn bind_font(&self, gc: GContext, font: FontId) -> Option<FontId> {
        self.fonts.lock().insert(gc, font)
    }

    pub fn font_of(&self, gc: GContext) -> Option<FontId> {
        self.fonts.lock().get(&gc).copied()
    }

    pub fn remove(&self, gc: GContext) -> Option<FontId> {
        self.fonts.lock().remove(&gc)
    }
}
