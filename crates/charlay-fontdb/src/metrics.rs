//! How wide is this character, really?
//!
//! A cache miss lands here. The requested face is asked for the glyph; if it
//! has none, the codepoint's class decides the stand-in:
//!
//! - CJK ideographs borrow `中`, then `0`, then space, which keeps the
//!   full-width box roughly right
//! - CJK and ASCII punctuation skip the face entirely: half the pixel size
//! - everything else tries `0`, then space
//!
//! When nothing resolves, half the pixel size it is.

use charlay_core::{
    types::{FontId, GlyphId, NO_FONT},
    utf8,
};

use crate::{resolver::parse_font_family, Font, FontStore};

const CJK_STAND_INS: [u32; 3] = [0x4E2D, '0' as u32, ' ' as u32];
const OTHER_STAND_INS: [u32; 2] = ['0' as u32, ' ' as u32];

/// What to do when a face lacks a codepoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackClass {
    CjkIdeograph,
    Punctuation,
    Other,
}

impl FallbackClass {
    pub fn of(codepoint: u32) -> Self {
        match codepoint {
            0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0x20000..=0x2A6DF => FallbackClass::CjkIdeograph,
            0x3000..=0x303F
            | 0xFF00..=0xFFEF
            | 0x20..=0x2F
            | 0x3A..=0x40
            | 0x5B..=0x60
            | 0x7B..=0x7E => FallbackClass::Punctuation,
            _ => FallbackClass::Other,
        }
    }
}

/// A resolved advance and the font that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphWidth {
    pub width: i32,
    pub font_id: FontId,
}

/// Whole-pixel vertical metrics of a font at one size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalMetrics {
    pub ascent: i32,
    /// Distance below the baseline, positive
    pub descent: i32,
    pub height: i32,
    pub x_height: i32,
    /// Advance of `0`
    pub ch_width: i32,
}

impl VerticalMetrics {
    /// Estimates used when the face can't tell
    pub fn estimate(px: i32) -> Self {
        Self {
            ascent: px,
            descent: px / 4,
            height: px + px / 4,
            x_height: px * 2 / 3,
            ch_width: px / 2,
        }
    }
}

fn pixel_size(px: i32) -> u32 {
    px.max(0) as u32
}

impl FontStore {
    /// Vertical metrics from the face, `None` when the font isn't loaded
    ///
    /// Fields the face can't provide keep their [`VerticalMetrics::estimate`].
    pub fn font_metrics(&self, id: FontId, px: i32) -> Option<VerticalMetrics> {
        let font = self.fonts.get(&id)?;
        let size = pixel_size(px);
        font.set_size(size);
        let face = font.face();
        let mut metrics = VerticalMetrics::estimate(px);

        if let Some(sm) = face.size_metrics(size).filter(|sm| sm.height != 0) {
            metrics.ascent = (sm.ascender >> 6) as i32;
            metrics.descent = ((sm.descender >> 6) as i32).abs();
            metrics.height = (sm.height >> 6) as i32;
        }
        if let Some(top) = face
            .glyph_index('x' as u32)
            .and_then(|gid| face.glyph_top(gid, size))
        {
            metrics.x_height = (top >> 6) as i32;
        }
        if let Some(adv) = face
            .glyph_index('0' as u32)
            .and_then(|gid| face.glyph_advance(gid, size))
        {
            metrics.ch_width = adv.to_px();
        }
        Some(metrics)
    }

    /// [`FontStore::font_metrics`], or the estimate when the font is gone
    pub fn font_metrics_or_estimate(&self, id: FontId, px: i32) -> VerticalMetrics {
        self.font_metrics(id, px)
            .unwrap_or_else(|| VerticalMetrics::estimate(px))
    }

    /// Advance of `codepoint` in font `id`, through the cache
    pub fn char_width(&mut self, id: FontId, codepoint: u32, px: i32) -> i32 {
        self.glyph_width(id, codepoint, px).width
    }

    /// Advance of `codepoint` in font `id`, reporting the font used
    pub fn glyph_width(&mut self, id: FontId, codepoint: u32, px: i32) -> GlyphWidth {
        let size = pixel_size(px);
        let half = GlyphWidth {
            width: px / 2,
            font_id: id,
        };

        if let Some(width) = self.cache.get(id, size, codepoint) {
            return GlyphWidth { width, font_id: id };
        }
        let Some(font) = self.fonts.get(&id) else {
            return half;
        };
        font.set_size(size);

        let glyph = match font.face().glyph_index(codepoint) {
            Some(gid) => gid,
            None => {
                log::warn!(
                    "Character U+{:04X} not found in font {} ({})",
                    codepoint,
                    id,
                    font.name()
                );
                match FallbackClass::of(codepoint) {
                    FallbackClass::Punctuation => {
                        log::debug!("Half-width fallback {}px for punctuation", half.width);
                        self.cache.put(id, size, codepoint, half.width);
                        return half;
                    },
                    FallbackClass::CjkIdeograph => match stand_in(font, &CJK_STAND_INS) {
                        Some(gid) => gid,
                        None => return half,
                    },
                    FallbackClass::Other => match stand_in(font, &OTHER_STAND_INS) {
                        Some(gid) => gid,
                        None => return half,
                    },
                }
            },
        };

        let Some(advance) = font.face().glyph_advance(glyph, size) else {
            return half;
        };
        let width = advance.to_px();
        self.cache.put(id, size, codepoint, width);
        GlyphWidth { width, font_id: id }
    }

    /// Advance of `codepoint` using a `font-family` fallback chain
    ///
    /// Each family member that has the glyph is tried in order, then the
    /// default font, then the first family member that is loaded at all.
    pub fn char_width_for_family(&mut self, css: &str, codepoint: u32, px: i32) -> GlyphWidth {
        let names = parse_font_family(css);

        let covering = names.iter().map(|name| self.find_by_name(name)).find(|&id| {
            self.fonts
                .get(&id)
                .is_some_and(|font| font.face().glyph_index(codepoint).is_some())
        });
        if let Some(id) = covering {
            return self.glyph_width(id, codepoint, px);
        }

        if self.default_font != NO_FONT {
            log::debug!(
                "U+{:04X} not in any of {:?}, using default font {}",
                codepoint,
                names,
                self.default_font
            );
            return self.glyph_width(self.default_font, codepoint, px);
        }

        let first = names.first().map_or(NO_FONT, |name| self.find_by_name(name));
        if first != NO_FONT {
            return self.glyph_width(first, codepoint, px);
        }

        GlyphWidth {
            width: px / 2,
            font_id: NO_FONT,
        }
    }

    /// Sum of advances over UTF-8 `text`; NUL codepoints count for nothing
    pub fn text_width(&mut self, id: FontId, text: &[u8], px: i32) -> i32 {
        utf8::codepoints(text)
            .filter(|decoded| decoded.codepoint != 0)
            .map(|decoded| self.char_width(id, decoded.codepoint, px))
            .sum()
    }
}

fn stand_in(font: &Font, candidates: &[u32]) -> Option<GlyphId> {
    candidates.iter().find_map(|&cp| {
        let gid = font.face().glyph_index(cp)?;
        log::debug!("Using stand-in U+{:04X}", cp);
        Some(gid)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_unicode_blocks() {
        assert_eq!(FallbackClass::of(0x4E2D), FallbackClass::CjkIdeograph);
        assert_eq!(FallbackClass::of(0x3400), FallbackClass::CjkIdeograph);
        assert_eq!(FallbackClass::of(0x20000), FallbackClass::CjkIdeograph);
        assert_eq!(FallbackClass::of(0x3002), FallbackClass::Punctuation);
        assert_eq!(FallbackClass::of(0xFF0C), FallbackClass::Punctuation);
        assert_eq!(FallbackClass::of(',' as u32), FallbackClass::Punctuation);
        assert_eq!(FallbackClass::of(' ' as u32), FallbackClass::Punctuation);
        assert_eq!(FallbackClass::of('~' as u32), FallbackClass::Punctuation);
        assert_eq!(FallbackClass::of('A' as u32), FallbackClass::Other);
        assert_eq!(FallbackClass::of('5' as u32), FallbackClass::Other);
        assert_eq!(FallbackClass::of(0x00E9), FallbackClass::Other);
    }

    #[test]
    fn estimate_matches_proportions() {
        let m = VerticalMetrics::estimate(16);
        assert_eq!(m.ascent, 16);
        assert_eq!(m.descent, 4);
        assert_eq!(m.height, 20);
        assert_eq!(m.x_height, 10);
        assert_eq!(m.ch_width, 8);
    }
}
