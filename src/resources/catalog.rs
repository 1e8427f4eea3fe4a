//! Font catalog
//!
//! The catalog resolves font names and patterns to font descriptions. The
//! server only consumes the `FontCatalog` trait; `BuiltinCatalog` is a small
//! set of character-cell fonts so the server works without a font backend.

use crate::error::ConfigError;
use crate::protocol::*;
use std::sync::Arc;

/// Name lookup and pattern matching over available fonts
pub trait FontCatalog: Send + Sync {
    /// Resolve a font name, case-insensitively
    fn lookup(&self, name: &str) -> Option<Arc<Font>>;

    /// Names matching `pattern`, at most `max_names` of them, in catalog order
    fn list(&self, pattern: &str, max_names: usize) -> Vec<String>;
}

/// Match an X font pattern: `*` is any run of characters, `?` any one
/// character, comparison ignores ASCII case.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len()
            && (pattern[p] == b'?' || pattern[p].eq_ignore_ascii_case(&name[n]))
        {
            p += 1;
            n += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, n));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == b'*')
}

/// Cell geometry of a built-in font
struct Cell {
    name: &'static str,
    width: i16,
    height: i16,
    ascent: i16,
}

const BUILTIN_CELLS: &[Cell] = &[
    Cell { name: "fixed", width: 6, height: 13, ascent: 11 },
    Cell { name: "6x10", width: 6, height: 10, ascent: 8 },
    Cell { name: "6x12", width: 6, height: 12, ascent: 10 },
    Cell { name: "6x13", width: 6, height: 13, ascent: 11 },
    Cell { name: "7x13", width: 7, height: 13, ascent: 11 },
    Cell { name: "7x14", width: 7, height: 14, ascent: 11 },
    Cell { name: "8x13", width: 8, height: 13, ascent: 11 },
    Cell { name: "8x16", width: 8, height: 16, ascent: 12 },
    Cell { name: "9x15", width: 9, height: 15, ascent: 12 },
    Cell { name: "9x18", width: 9, height: 18, ascent: 14 },
    Cell { name: "10x20", width: 10, height: 20, ascent: 16 },
    Cell { name: "cursor", width: 16, height: 16, ascent: 15 },
    Cell { name: "-misc-fixed-medium-r-normal--13-120-75-75-c-80-iso8859-1", width: 8, height: 13, ascent: 11 },
    Cell { name: "-misc-fixed-medium-r-normal--15-140-75-75-c-90-iso8859-1", width: 9, height: 15, ascent: 12 },
    Cell { name: "-misc-fixed-bold-r-normal--13-120-75-75-c-80-iso8859-1", width: 8, height: 13, ascent: 11 },
    Cell { name: "-misc-fixed-bold-r-normal--15-140-75-75-c-90-iso8859-1", width: 9, height: 15, ascent: 12 },
];

impl Cell {
    fn build(&self) -> Result<Font, ConfigError> {
        let descent = self.height - self.ascent;
        let glyph = CharInfo {
            left_side_bearing: 0,
            right_side_bearing: self.width,
            character_width: self.width,
            ascent: self.ascent,
            descent,
            attributes: 0,
        };
        let mut font = Font::from_chars(self.name, 0, self.ascent, descent, vec![glyph; 256])?;
        font.default_char = b' ' as u16;
        font.properties.insert(Atom::QUAD_WIDTH, self.width as u32);
        font.properties.insert(Atom::POINT_SIZE, self.height as u32 * 10);
        font.properties.insert(Atom::UNDERLINE_POSITION, (descent / 2).max(1) as u32);
        font.properties.insert(Atom::UNDERLINE_THICKNESS, 1);
        font.properties.insert(Atom::X_HEIGHT, (self.ascent * 2 / 3) as u32);
        font.properties.insert(Atom::CAP_HEIGHT, (self.ascent - 2).max(1) as u32);
        Ok(font)
    }
}

/// Character-cell fonts compiled into the server
pub struct BuiltinCatalog {
    fonts: Vec<Arc<Font>>,
}

impl BuiltinCatalog {
    pub fn new() -> Result<Self, ConfigError> {
        let fonts = BUILTIN_CELLS
            .iter()
            .map(|cell| cell.build().map(Arc::new))
            .collect::<Result<_, _>>()?;
        Ok(BuiltinCatalog { fonts })
    }
}

impl FontCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str) -> Option<Arc<Font>> {
        self.fonts
            .iter()
            .find(|font| font.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn list(&self, pattern: &str, max_names: usize) -> Vec<String> {
        self.fonts
            .iter()
            .filter(|font| glob_match(pattern, &font.name))
            .take(max_names)
            .map(|font| font.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob() {
        assert!(glob_match("*", "fixed"));
        assert!(glob_match("fixed", "FIXED"));
        assert!(glob_match("6x1?", "6x13"));
        assert!(!glob_match("6x1?", "6x1"));
        assert!(glob_match("*-bold-*", "-misc-fixed-bold-r-normal--13-120-75-75-c-80-iso8859-1"));
        assert!(glob_match("*x*3", "8x13"));
        assert!(!glob_match("fix", "fixed"));
        assert!(glob_match("f**d", "fixed"));
        assert!(glob_match("", ""));
        assert!(!glob_match("", "a"));
    }

    #[test]
    fn test_lookup_fixed() {
        let catalog = BuiltinCatalog::new().unwrap();
        let font = catalog.lookup("Fixed").unwrap();
        assert_eq!(font.font_ascent, 11);
        assert_eq!(font.font_descent, 2);
        assert_eq!(font.defined_chars(), 256);
        assert!(font.all_chars_exist);
        assert!(catalog.lookup("no-such-font").is_none());
    }

    #[test]
    fn test_list_truncates() {
        let catalog = BuiltinCatalog::new().unwrap();
        let all = catalog.list("*", usize::MAX);
        assert_eq!(all.len(), BUILTIN_CELLS.len());
        assert_eq!(catalog.list("6x*", 2), vec!["6x10".to_string(), "6x12".to_string()]);
        assert!(catalog.list("*", 0).is_empty());
    }
}
