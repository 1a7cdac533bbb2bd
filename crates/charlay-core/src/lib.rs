//! Charlay Core: from layout callbacks to per-character records
//!
//! An external HTML/CSS layout engine decides where every line of text goes.
//! Charlay listens to its font and text callbacks, resolves each character
//! against the fonts the host loaded, and records one [`types::CharRecord`]
//! per rendered character. Those records later become Canvas-ready JSON.
//!
//! ## The Pieces
//!
//! - [`traits::FontFace`] / [`traits::FontLoader`] - the font-shaping collaborator
//! - [`traits::DocumentContainer`] - the callback contract a layout engine drives
//! - [`traits::LayoutEngine`] - the external engine itself
//! - [`cache::GlyphMetricsCache`] - memoized advance widths per font
//! - [`config::ParserConfig`] - thresholds and limits
//!
//! Data flows through the types in [`types`].

pub mod cache;
pub mod config;
pub mod error;
pub mod traits;
pub mod utf8;

pub use cache::{CacheStats, GlyphMetricsCache};
pub use config::ParserConfig;
pub use error::{Diagnostic, EngineError, ErrorCode, FontLoadError, LayoutError, Result, Severity};
pub use traits::{DocumentContainer, FontFace, FontLoader, LayoutEngine};

/// The data structures shared by every stage
pub mod types {
    use serde::{Deserialize, Serialize};

    /// Identifier of a loaded font. `0` means "no font".
    pub type FontId = u32;

    /// The id that never names a loaded font
    pub const NO_FONT: FontId = 0;

    /// Glyph index inside one font face
    pub type GlyphId = u32;

    /// 26.6 fixed point value as reported by the font-shaping library
    pub type F26Dot6 = i64;

    /// Whole pixels from a 26.6 value
    pub const fn f26dot6_to_px(value: F26Dot6) -> i32 {
        (value >> 6) as i32
    }

    /// Opaque handle the layout engine holds for one created font instance
    ///
    /// `0` is never handed out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
    pub struct FontHandle(u64);

    impl FontHandle {
        pub const INVALID: FontHandle = FontHandle(0);

        pub const fn from_raw(raw: u64) -> Self {
            Self(raw)
        }

        pub const fn raw(self) -> u64 {
            self.0
        }

        pub const fn is_valid(self) -> bool {
            self.0 != 0
        }
    }

    /// Straight RGBA color as the layout engine reports it
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Rgba {
        pub r: u8,
        pub g: u8,
        pub b: u8,
        pub a: u8,
    }

    impl Rgba {
        pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

        pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
            Self { r, g, b, a }
        }

        pub const fn black() -> Self {
            Self::new(0, 0, 0, 255)
        }

        /// `#RRGGBBAA`, upper case
        pub fn to_hex(self) -> String {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum FontStyle {
        #[default]
        Normal,
        Italic,
        Oblique,
    }

    impl FontStyle {
        pub const fn as_str(self) -> &'static str {
            match self {
                FontStyle::Normal => "normal",
                FontStyle::Italic => "italic",
                FontStyle::Oblique => "oblique",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DecorationStyle {
        #[default]
        Solid,
        Double,
        Dotted,
        Dashed,
        Wavy,
    }

    impl DecorationStyle {
        pub const fn as_str(self) -> &'static str {
            match self {
                DecorationStyle::Solid => "solid",
                DecorationStyle::Double => "double",
                DecorationStyle::Dotted => "dotted",
                DecorationStyle::Dashed => "dashed",
                DecorationStyle::Wavy => "wavy",
            }
        }
    }

    /// Which decoration lines are switched on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DecorationLine {
        pub underline: bool,
        pub overline: bool,
        pub line_through: bool,
    }

    impl DecorationLine {
        pub const NONE: DecorationLine = DecorationLine {
            underline: false,
            overline: false,
            line_through: false,
        };
    }

    /// Everything the layout engine says about a font it wants
    #[derive(Debug, Clone, PartialEq)]
    pub struct FontDescription {
        /// Raw CSS `font-family` value
        pub family: String,
        /// Size in CSS pixels
        pub size: f32,
        /// CSS weight, nominally 100..=900
        pub weight: i32,
        pub style: FontStyle,
        pub decoration_line: DecorationLine,
        pub decoration_style: DecorationStyle,
        /// Thickness in pixels; non-positive means "use the default"
        pub decoration_thickness: f32,
        /// Fully transparent means "use the text color"
        pub decoration_color: Rgba,
    }

    impl Default for FontDescription {
        fn default() -> Self {
            Self {
                family: String::new(),
                size: 16.0,
                weight: 400,
                style: FontStyle::Normal,
                decoration_line: DecorationLine::NONE,
                decoration_style: DecorationStyle::Solid,
                decoration_thickness: 0.0,
                decoration_color: Rgba::TRANSPARENT,
            }
        }
    }

    /// Vertical metrics handed back to the layout engine on font creation
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct FontMetrics {
        pub font_size: f32,
        pub height: f32,
        pub ascent: f32,
        pub descent: f32,
        pub x_height: f32,
        pub ch_width: f32,
        pub draw_spaces: bool,
    }

    /// Rectangle in layout pixels
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Position {
        pub x: f32,
        pub y: f32,
        pub width: f32,
        pub height: f32,
    }

    impl Position {
        pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
            Self {
                x,
                y,
                width,
                height,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Size {
        pub width: i32,
        pub height: i32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum MediaType {
        #[default]
        Screen,
        Print,
        All,
    }

    /// Media query inputs reported to the layout engine
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct MediaFeatures {
        pub media_type: MediaType,
        pub width: f32,
        pub height: f32,
        pub device_width: f32,
        pub device_height: f32,
        pub color: i32,
        pub color_index: i32,
        pub monochrome: i32,
        pub resolution: i32,
    }

    /// Viewport the document was laid out in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Viewport {
        pub width: i32,
        pub height: i32,
    }

    impl Viewport {
        pub const fn new(width: i32, height: i32) -> Self {
            Self { width, height }
        }
    }

    /// Decoration attached to one rendered character
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TextDecoration {
        pub underline: bool,
        pub overline: bool,
        pub line_through: bool,
        /// `#RRGGBBAA`
        pub color: String,
        pub style: String,
        pub thickness: f32,
    }

    impl Default for TextDecoration {
        fn default() -> Self {
            Self {
                underline: false,
                overline: false,
                line_through: false,
                color: String::new(),
                style: DecorationStyle::Solid.as_str().to_string(),
                thickness: 1.0,
            }
        }
    }

    impl TextDecoration {
        /// Same lines, color and style (thickness is not part of a run's identity)
        pub fn same_style(&self, other: &TextDecoration) -> bool {
            self.underline == other.underline
                && self.overline == other.overline
                && self.line_through == other.line_through
                && self.color == other.color
                && self.style == other.style
        }
    }

    /// CSS transform snapshot; always the identity at this boundary
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Transform {
        pub scale_x: f32,
        pub scale_y: f32,
        pub skew_x: f32,
        pub skew_y: f32,
        pub rotate: f32,
    }

    impl Default for Transform {
        fn default() -> Self {
            Self {
                scale_x: 1.0,
                scale_y: 1.0,
                skew_x: 0.0,
                skew_y: 0.0,
                rotate: 0.0,
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Direction {
        #[default]
        Ltr,
        Rtl,
    }

    /// One rendered character with its full geometry and style
    ///
    /// Positions are whole pixels. Colors are `#RRGGBBAA`.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CharRecord {
        /// UTF-8 text of this one character
        pub character: String,
        pub x: i32,
        pub y: i32,
        pub width: i32,
        pub height: i32,

        pub font_family: String,
        pub font_size: i32,
        pub font_weight: i32,
        pub font_style: String,

        pub color: String,
        pub background_color: String,
        pub opacity: f32,

        pub text_decoration: TextDecoration,

        pub letter_spacing: f32,
        pub word_spacing: f32,

        pub transform: Transform,

        pub baseline: i32,
        pub direction: Direction,

        pub font_id: FontId,
    }

    impl Default for CharRecord {
        fn default() -> Self {
            Self {
                character: String::new(),
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                font_family: String::new(),
                font_size: 16,
                font_weight: 400,
                font_style: FontStyle::Normal.as_str().to_string(),
                color: Rgba::black().to_hex(),
                background_color: Rgba::TRANSPARENT.to_hex(),
                opacity: 1.0,
                text_decoration: TextDecoration::default(),
                letter_spacing: 0.0,
                word_spacing: 0.0,
                transform: Transform::default(),
                baseline: 0,
                direction: Direction::Ltr,
                font_id: NO_FONT,
            }
        }
    }

    impl CharRecord {
        /// Right edge in pixels
        pub fn right(&self) -> i32 {
            self.x + self.width
        }

        /// Whether two characters belong to the same styled run
        pub fn same_style(&self, other: &CharRecord) -> bool {
            self.font_family == other.font_family
                && self.font_size == other.font_size
                && self.font_weight == other.font_weight
                && self.font_style == other.font_style
                && self.color == other.color
                && self.background_color == other.background_color
                && self.text_decoration.same_style(&other.text_decoration)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;

    #[test]
    fn hex_colors_are_rgba_upper_case() {
        assert_eq!(Rgba::new(255, 0, 16, 128).to_hex(), "#FF001080");
        assert_eq!(Rgba::TRANSPARENT.to_hex(), "#00000000");
    }

    #[test]
    fn fixed_point_shifts_six_bits() {
        assert_eq!(f26dot6_to_px(64 * 9), 9);
        assert_eq!(f26dot6_to_px(64 * 9 + 63), 9);
    }

    #[test]
    fn thickness_does_not_split_runs() {
        let a = CharRecord::default();
        let mut b = a.clone();
        b.text_decoration.thickness = 3.0;
        assert!(a.same_style(&b));
        b.text_decoration.underline = true;
        assert!(!a.same_style(&b));
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_value(CharRecord::default()).unwrap();
        assert!(json.get("fontFamily").is_some());
        assert!(json.get("backgroundColor").is_some());
        assert_eq!(json["textDecoration"]["lineThrough"], false);
        assert_eq!(json["transform"]["scaleX"], 1.0);
        assert_eq!(json["direction"], "ltr");
    }
}
