//! Text measurement
//!
//! QueryTextExtents delegates the actual measuring to a `TextMeasurer`.

use crate::protocol::{CharInfo, Font, TextExtents};

/// Width and ink bounds of a string drawn in a font
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, font: &Font, text: &[u16]) -> TextExtents;
}

/// Measures from the font's own character table
///
/// Characters outside the font fall back to its default character; if that
/// is missing too they contribute nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct CellMeasurer;

impl TextMeasurer for CellMeasurer {
    fn measure(&self, font: &Font, text: &[u16]) -> TextExtents {
        let mut extents: Option<TextExtents> = None;
        let mut origin = 0i32;

        for info in text.iter().filter_map(|code| font.char_info_or_default(*code)) {
            let CharInfo {
                left_side_bearing,
                right_side_bearing,
                character_width,
                ascent,
                descent,
                ..
            } = *info;
            let left = origin + left_side_bearing as i32;
            let right = origin + right_side_bearing as i32;
            let top = -(ascent as i32);
            let bottom = descent as i32;

            let e = extents.get_or_insert(TextExtents {
                width: 0,
                left,
                right,
                top,
                bottom,
            });
            e.left = e.left.min(left);
            e.right = e.right.max(right);
            e.top = e.top.min(top);
            e.bottom = e.bottom.max(bottom);

            origin += character_width as i32;
        }

        let mut extents = extents.unwrap_or_default();
        extents.width = origin;
        extents
    }
}
