//! Real font faces, parsed with skrifa
//!
//! A face keeps its bytes and builds a `FontRef` on demand for every query,
//! so no borrowed view outlives the data it points into.

use std::sync::Arc;

use charlay_core::{
    error::FontLoadError,
    traits::{FontFace, FontLoader, GlyphAdvance, SizeMetrics},
    types::{F26Dot6, GlyphId},
};
use read_fonts::{FileRef, TableProvider};
use skrifa::instance::{LocationRef, Size};
use skrifa::string::StringId;
use skrifa::{FontRef, MetadataProvider};

/// Opens TrueType/OpenType data with skrifa
#[derive(Debug, Default, Clone, Copy)]
pub struct SkrifaLoader;

impl FontLoader for SkrifaLoader {
    fn name(&self) -> &'static str {
        "skrifa"
    }

    fn open_face(&self, data: Arc<[u8]>) -> Result<Box<dyn FontFace>, FontLoadError> {
        if data.is_empty() {
            return Err(FontLoadError::EmptyData);
        }

        match FileRef::new(&data) {
            Ok(FileRef::Collection(collection)) => {
                log::debug!(
                    "Font collection with {} faces, using face 0",
                    collection.len()
                );
            },
            Ok(FileRef::Font(_)) => {},
            Err(e) => return Err(FontLoadError::InvalidData(e.to_string())),
        }

        // A face without a charmap can't map a single codepoint
        let font = read_fonts::FontRef::from_index(&data, 0)
            .map_err(|e| FontLoadError::InvalidData(e.to_string()))?;
        font.cmap()
            .map_err(|e| FontLoadError::InvalidData(format!("no usable cmap: {}", e)))?;
        let units_per_em = font.head().map(|head| head.units_per_em()).unwrap_or(1000);

        Ok(Box::new(SkrifaFace { data, units_per_em }))
    }
}

/// One face backed by skrifa
pub struct SkrifaFace {
    data: Arc<[u8]>,
    units_per_em: u16,
}

impl SkrifaFace {
    fn font_ref(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, 0).ok()
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }
}

fn to_f26dot6(value: f32) -> F26Dot6 {
    (value * 64.0).round() as F26Dot6
}

impl FontFace for SkrifaFace {
    fn family_name(&self) -> Option<String> {
        let font = self.font_ref()?;
        let name = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()?
            .to_string();
        (!name.trim().is_empty()).then_some(name)
    }

    fn glyph_index(&self, codepoint: u32) -> Option<GlyphId> {
        let font = self.font_ref()?;
        font.charmap()
            .map(codepoint)
            .map(|gid| gid.to_u32())
            .filter(|&gid| gid != 0)
    }

    fn glyph_advance(&self, glyph: GlyphId, px: u32) -> Option<GlyphAdvance> {
        let font = self.font_ref()?;
        let gid = skrifa::GlyphId::new(glyph);
        let scaled = font
            .glyph_metrics(Size::new(px as f32), LocationRef::default())
            .advance_width(gid);

        // Unscaled hmtx advance, for faces whose scaled metrics come back empty
        let raw = font
            .hmtx()
            .ok()
            .and_then(|hmtx| hmtx.advance(read_fonts::types::GlyphId::new(glyph)))
            .map(|units| units as f32 * px as f32 / self.units_per_em.max(1) as f32);

        if scaled.is_none() && raw.is_none() {
            return None;
        }
        Some(GlyphAdvance {
            hori_advance: scaled.map(to_f26dot6).unwrap_or(0),
            advance_x: raw.map(to_f26dot6).unwrap_or(0),
        })
    }

    fn size_metrics(&self, px: u32) -> Option<SizeMetrics> {
        let font = self.font_ref()?;
        let metrics = font.metrics(Size::new(px as f32), LocationRef::default());
        let height = metrics.ascent - metrics.descent + metrics.leading;
        if height <= 0.0 {
            return None;
        }
        Some(SizeMetrics {
            ascender: to_f26dot6(metrics.ascent),
            descender: to_f26dot6(metrics.descent),
            height: to_f26dot6(height),
        })
    }

    fn glyph_top(&self, glyph: GlyphId, px: u32) -> Option<F26Dot6> {
        let font = self.font_ref()?;
        font.glyph_metrics(Size::new(px as f32), LocationRef::default())
            .bounds(skrifa::GlyphId::new(glyph))
            .map(|bounds| to_f26dot6(bounds.y_max))
    }
}
