//! Deterministic fonts that live entirely in memory
//!
//! Mock font data starts with `MOCK`, followed by an advance ratio, coverage
//! flags and the family name. Anything after that is padding, which makes it
//! easy to fake large fonts.
//!
//! ```ignore
//! let bytes = MockFont::new("Arial").advance_percent(60).build();
//! let id = store.load(&bytes, "");
//! ```

use std::sync::Arc;

use charlay_core::{
    error::FontLoadError,
    traits::{FontFace, FontLoader, GlyphAdvance, SizeMetrics},
    types::{F26Dot6, GlyphId},
};

const MAGIC: &[u8; 4] = b"MOCK";
const FLAG_CJK: u8 = 0b01;
const FLAG_LETTERS_ONLY: u8 = 0b10;

/// Builder for mock font bytes
#[derive(Debug, Clone)]
pub struct MockFont {
    family: String,
    advance_percent: u8,
    flags: u8,
    padded_len: usize,
}

impl MockFont {
    /// ASCII coverage, advances of half the pixel size
    pub fn new(family: &str) -> Self {
        Self {
            family: family.to_string(),
            advance_percent: 50,
            flags: 0,
            padded_len: 0,
        }
    }

    /// Advance of every non-CJK glyph as a percentage of the pixel size
    pub fn advance_percent(mut self, percent: u8) -> Self {
        self.advance_percent = percent;
        self
    }

    /// Also cover CJK Unified Ideographs at full-width advance
    pub fn with_cjk(mut self) -> Self {
        self.flags |= FLAG_CJK;
        self
    }

    /// Cover only ASCII letters; no digits, space or punctuation
    pub fn letters_only(mut self) -> Self {
        self.flags |= FLAG_LETTERS_ONLY;
        self
    }

    /// Pad the data to at least `len` bytes
    pub fn padded_to(mut self, len: usize) -> Self {
        self.padded_len = len;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let name = self.family.as_bytes();
        let name_len = name.len().min(u8::MAX as usize);
        let mut data = Vec::with_capacity(self.padded_len.max(7 + name_len));
        data.extend_from_slice(MAGIC);
        data.push(self.advance_percent);
        data.push(self.flags);
        data.push(name_len as u8);
        data.extend_from_slice(&name[..name_len]);
        if data.len() < self.padded_len {
            data.resize(self.padded_len, 0);
        }
        data
    }
}

/// Opens [`MockFont`] data
#[derive(Debug, Default, Clone, Copy)]
pub struct MockFontLoader;

impl FontLoader for MockFontLoader {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open_face(&self, data: Arc<[u8]>) -> Result<Box<dyn FontFace>, FontLoadError> {
        if data.is_empty() {
            return Err(FontLoadError::EmptyData);
        }
        if data.len() < 7 || &data[..4] != MAGIC {
            return Err(FontLoadError::InvalidData("missing MOCK header".into()));
        }
        let name_len = data[6] as usize;
        let name = data
            .get(7..7 + name_len)
            .ok_or_else(|| FontLoadError::InvalidData("truncated family name".into()))?;

        Ok(Box::new(MockFace {
            family: String::from_utf8_lossy(name).into_owned(),
            advance_percent: data[4] as i64,
            flags: data[5],
        }))
    }
}

struct MockFace {
    family: String,
    advance_percent: i64,
    flags: u8,
}

fn is_cjk_ideograph(codepoint: u32) -> bool {
    (0x4E00..=0x9FFF).contains(&codepoint)
}

impl FontFace for MockFace {
    fn family_name(&self) -> Option<String> {
        (!self.family.is_empty()).then(|| self.family.clone())
    }

    fn glyph_index(&self, codepoint: u32) -> Option<GlyphId> {
        let covered = if self.flags & FLAG_LETTERS_ONLY != 0 {
            char::from_u32(codepoint).is_some_and(|c| c.is_ascii_alphabetic())
        } else {
            (0x20..=0x7E).contains(&codepoint)
                || (self.flags & FLAG_CJK != 0 && is_cjk_ideograph(codepoint))
        };
        covered.then_some(codepoint)
    }

    fn glyph_advance(&self, glyph: GlyphId, px: u32) -> Option<GlyphAdvance> {
        let px = px as i64;
        let advance: F26Dot6 = if is_cjk_ideograph(glyph) {
            px << 6
        } else {
            ((px * self.advance_percent) << 6) / 100
        };
        Some(GlyphAdvance {
            hori_advance: advance,
            advance_x: advance,
        })
    }

    fn size_metrics(&self, px: u32) -> Option<SizeMetrics> {
        let px = px as i64;
        Some(SizeMetrics {
            ascender: ((px * 8) << 6) / 10,
            descender: -(((px * 2) << 6) / 10),
            height: ((px * 12) << 6) / 10,
        })
    }

    fn glyph_top(&self, _glyph: GlyphId, px: u32) -> Option<F26Dot6> {
        Some((px as i64) << 5)
    }
}
