//! The contracts charlay shares with its collaborators
//!
//! Two outside libraries do the heavy lifting. A font-shaping library opens
//! font files and answers glyph questions; a layout engine turns HTML into
//! boxes and calls back whenever it needs a font or wants text drawn.
//!
//! ## The Players
//!
//! - [`FontLoader`] - Turns raw bytes into a [`FontFace`]
//! - [`FontFace`] - Glyph lookup and metrics for one opened font
//! - [`LayoutEngine`] - Lays out a document against a container
//! - [`DocumentContainer`] - The callbacks a layout engine drives

use crate::error::{EngineError, FontLoadError};
use crate::types::*;
use std::sync::Arc;

/// Advance of one glyph in 26.6 fixed point
///
/// Some faces leave the primary field zero and only fill the secondary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphAdvance {
    /// Horizontal advance from the glyph's metrics
    pub hori_advance: F26Dot6,
    /// Advance of the loaded glyph slot
    pub advance_x: F26Dot6,
}

impl GlyphAdvance {
    /// Whole-pixel width, preferring the primary advance
    pub fn to_px(self) -> i32 {
        if self.hori_advance != 0 {
            f26dot6_to_px(self.hori_advance)
        } else {
            f26dot6_to_px(self.advance_x)
        }
    }
}

/// Vertical metrics of a face at one pixel size, in 26.6 fixed point
///
/// `descender` is negative below the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeMetrics {
    pub ascender: F26Dot6,
    pub descender: F26Dot6,
    pub height: F26Dot6,
}

/// One opened font face
///
/// ```ignore
/// struct MyFace;
///
/// impl FontFace for MyFace {
///     fn family_name(&self) -> Option<String> {
///         Some("My Sans".into())
///     }
///
///     fn glyph_index(&self, codepoint: u32) -> Option<GlyphId> {
///         (codepoint < 128).then_some(codepoint)
///     }
///
///     fn glyph_advance(&self, _glyph: GlyphId, px: u32) -> Option<GlyphAdvance> {
///         Some(GlyphAdvance { hori_advance: (px as i64 / 2) << 6, advance_x: 0 })
///     }
///
///     fn size_metrics(&self, _px: u32) -> Option<SizeMetrics> {
///         None
///     }
/// }
/// ```
pub trait FontFace: Send {
    /// Family name stored in the font, if any
    fn family_name(&self) -> Option<String>;

    /// Glyph for a Unicode codepoint, `None` when the face lacks it
    ///
    /// Glyph 0 (`.notdef`) is reported as `None`.
    fn glyph_index(&self, codepoint: u32) -> Option<GlyphId>;

    /// Advance of `glyph` rendered at `px` pixels per em
    fn glyph_advance(&self, glyph: GlyphId, px: u32) -> Option<GlyphAdvance>;

    /// Ascender, descender and line height at `px`
    fn size_metrics(&self, px: u32) -> Option<SizeMetrics>;

    /// Top of the glyph's outline above the baseline at `px`
    fn glyph_top(&self, _glyph: GlyphId, _px: u32) -> Option<F26Dot6> {
        None
    }
}

/// Opens font faces from raw bytes
pub trait FontLoader: Send {
    /// Who are you? Used for logging
    fn name(&self) -> &'static str;

    /// Open the first face in `data`
    ///
    /// The face may keep `data` alive for as long as it lives.
    fn open_face(&self, data: Arc<[u8]>) -> Result<Box<dyn FontFace>, FontLoadError>;
}

/// Callbacks an external layout engine makes while laying out a document
///
/// Only fonts, measuring and text drawing matter here. Everything else has
/// an inert default so implementors can ignore it.
pub trait DocumentContainer {
    /// Create a font instance for a description and report its metrics
    ///
    /// Returns [`FontHandle::INVALID`] when no font can serve the request.
    fn create_font(&mut self, desc: &FontDescription) -> (FontHandle, FontMetrics);

    fn delete_font(&mut self, handle: FontHandle);

    /// Width in pixels of UTF-8 `text` drawn with `handle`
    fn text_width(&mut self, text: &[u8], handle: FontHandle) -> i32;

    /// Draw UTF-8 `text` starting at `pos`
    fn draw_text(&mut self, text: &[u8], handle: FontHandle, color: Rgba, pos: Position);

    fn pt_to_px(&self, pt: f32) -> f32;

    fn default_font_size(&self) -> f32;

    fn default_font_name(&self) -> String;

    /// Client area the document is laid out in
    fn viewport(&self) -> Position;

    fn media_features(&self) -> MediaFeatures;

    /// `(language, culture)`, e.g. `("en", "US")`
    fn language(&self) -> (String, String);

    fn draw_list_marker(&mut self, _pos: Position, _color: Rgba) {}

    fn load_image(&mut self, _src: &str, _base_url: &str, _redraw_on_ready: bool) {}

    fn image_size(&self, _src: &str, _base_url: &str) -> Size {
        Size::default()
    }

    fn draw_image(&mut self, _src: &str, _pos: Position) {}

    fn draw_solid_fill(&mut self, _pos: Position, _color: Rgba) {}

    fn draw_linear_gradient(&mut self, _pos: Position) {}

    fn draw_radial_gradient(&mut self, _pos: Position) {}

    fn draw_conic_gradient(&mut self, _pos: Position) {}

    fn draw_borders(&mut self, _pos: Position, _root: bool) {}

    fn set_caption(&mut self, _caption: &str) {}

    fn set_base_url(&mut self, _base_url: &str) {}

    fn on_anchor_click(&mut self, _url: &str) {}

    fn set_cursor(&mut self, _cursor: &str) {}

    /// Apply `text-transform`; the default leaves text untouched
    fn transform_text(&self, _text: &mut String, _transform: &str) {}

    /// Resolve an `@import`; `None` means nothing to import
    fn import_css(&mut self, _url: &str, _base_url: &str) -> Option<String> {
        None
    }

    fn set_clip(&mut self, _pos: Position) {}

    fn del_clip(&mut self) {}

    /// Whether the container builds a custom element for `tag`
    fn create_element(&mut self, _tag: &str) -> bool {
        false
    }
}

/// An HTML/CSS layout engine
///
/// `render` parses `html`, lays it out at `width` pixels and draws it through
/// the container before returning.
pub trait LayoutEngine {
    /// Who are you? Used for logging
    fn name(&self) -> &'static str;

    fn render(
        &self,
        html: &str,
        width: i32,
        container: &mut dyn DocumentContainer,
    ) -> Result<(), EngineError>;
}
