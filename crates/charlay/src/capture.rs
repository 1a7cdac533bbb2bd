//! Listening in on the layout engine, one character at a time
//!
//! A [`LayoutCapture`] owns the record buffer between passes. During a pass
//! the engine talks to a [`CaptureSession`], which borrows the buffer and the
//! font store, answers font and measuring callbacks, and turns every
//! `draw_text` into [`CharRecord`]s.
//!
//! ```text
//! Idle --session()--> Capturing --drop--> Captured --clear()--> Idle
//! ```
//!
//! A new session is refused until the previous buffer has been cleared.

use std::collections::HashMap;

use charlay_core::{
    config::ParserConfig,
    error::{LayoutError, Result},
    traits::DocumentContainer,
    types::{
        CharRecord, DecorationLine, DecorationStyle, FontDescription, FontHandle, FontId,
        FontMetrics, FontStyle, MediaFeatures, MediaType, Position, Rgba, TextDecoration,
        Viewport,
    },
    utf8,
};
use charlay_fontdb::FontStore;

/// Where a [`LayoutCapture`] is in its pass cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    /// The pass finished; records are waiting to be read and cleared
    Captured,
}

/// Record buffer that outlives a single pass
#[derive(Debug, Default)]
pub struct LayoutCapture {
    records: Vec<CharRecord>,
    state: CaptureState,
    passes: u64,
}

impl LayoutCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Records of the current or last pass, in emission order
    pub fn records(&self) -> &[CharRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Completed passes since creation
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Drop every record and give the memory back
    ///
    /// Safe to call at any time and any number of times.
    pub fn clear(&mut self) {
        self.records.clear();
        self.records.shrink_to_fit();
        self.state = CaptureState::Idle;
    }

    /// Start a pass against `fonts`
    ///
    /// Fails with [`LayoutError::PassInProgress`] unless the capture is idle.
    pub fn session<'a>(
        &'a mut self,
        fonts: &'a mut FontStore,
        config: &'a ParserConfig,
        viewport: Viewport,
    ) -> Result<CaptureSession<'a>> {
        if self.state != CaptureState::Idle {
            return Err(LayoutError::PassInProgress);
        }
        self.state = CaptureState::Capturing;
        log::debug!("Capture pass {} started", self.passes + 1);
        Ok(CaptureSession {
            capture: self,
            fonts,
            config,
            viewport,
            styles: HashMap::new(),
        })
    }
}

/// What a font handle stands for, kept until the engine deletes it
#[derive(Debug, Clone)]
struct HandleStyle {
    font_id: FontId,
    family: String,
    px: i32,
    weight: i32,
    italic: bool,
    decoration: DecorationLine,
    decoration_style: DecorationStyle,
    decoration_thickness: f32,
    /// `None` follows the text color
    decoration_color: Option<Rgba>,
}

impl HandleStyle {
    fn text_decoration(&self, color: Rgba) -> TextDecoration {
        TextDecoration {
            underline: self.decoration.underline,
            overline: self.decoration.overline,
            line_through: self.decoration.line_through,
            color: self.decoration_color.unwrap_or(color).to_hex(),
            style: self.decoration_style.as_str().to_string(),
            thickness: self.decoration_thickness,
        }
    }
}

/// The container the layout engine drives during one pass
///
/// Every font handle created through the session is released when it is
/// dropped, whether the pass finished or not.
pub struct CaptureSession<'a> {
    capture: &'a mut LayoutCapture,
    fonts: &'a mut FontStore,
    config: &'a ParserConfig,
    viewport: Viewport,
    styles: HashMap<FontHandle, HandleStyle>,
}

/// Weights outside the CSS range mean "normal"
fn normalize_weight(weight: i32) -> i32 {
    if (100..=900).contains(&weight) {
        weight
    } else {
        400
    }
}

/// Metrics for the engine when no face can provide them
fn proportional_metrics(px: i32) -> FontMetrics {
    let size = px as f32;
    FontMetrics {
        font_size: size,
        height: size,
        ascent: size * 0.75,
        descent: size * 0.25,
        x_height: size * 0.5,
        ch_width: size * 0.5,
        draw_spaces: true,
    }
}

impl CaptureSession<'_> {
    /// Records emitted so far in this pass
    pub fn records(&self) -> &[CharRecord] {
        &self.capture.records
    }

    /// Handles the engine still holds
    pub fn live_handles(&self) -> usize {
        self.styles.len()
    }
}

impl DocumentContainer for CaptureSession<'_> {
    fn create_font(&mut self, desc: &FontDescription) -> (FontHandle, FontMetrics) {
        let px = desc.size.max(0.0) as i32;
        let weight = normalize_weight(desc.weight);
        let italic = desc.style == FontStyle::Italic;

        let requested = self.fonts.resolve_family(&desc.family);
        let handle = self.fonts.create_instance(requested, px, weight >= 700, italic);
        let Some(font_id) = self.fonts.instance(handle).map(|instance| instance.font_id) else {
            log::debug!("No font can serve {:?} at {}px", desc.family, px);
            return (FontHandle::INVALID, proportional_metrics(px));
        };

        let metrics = match self.fonts.font_metrics(font_id, px) {
            Some(vm) => FontMetrics {
                font_size: px as f32,
                height: vm.height as f32,
                ascent: vm.ascent as f32,
                descent: vm.descent as f32,
                x_height: vm.x_height as f32,
                ch_width: vm.ch_width as f32,
                draw_spaces: true,
            },
            None => proportional_metrics(px),
        };

        let style = HandleStyle {
            font_id,
            family: self.fonts.font_name(font_id).unwrap_or_default().to_string(),
            px,
            weight,
            italic,
            decoration: desc.decoration_line,
            decoration_style: desc.decoration_style,
            decoration_thickness: if desc.decoration_thickness > 0.0 {
                desc.decoration_thickness
            } else {
                1.0
            },
            decoration_color: (desc.decoration_color.a != 0).then_some(desc.decoration_color),
        };
        log::debug!(
            "Font {:?} {}px weight {} -> font {} ({}), handle {:#x}",
            desc.family,
            px,
            weight,
            font_id,
            style.family,
            handle.raw()
        );
        self.styles.insert(handle, style);
        (handle, metrics)
    }

    fn delete_font(&mut self, handle: FontHandle) {
        self.styles.remove(&handle);
        self.fonts.delete_instance(handle);
    }

    fn text_width(&mut self, text: &[u8], handle: FontHandle) -> i32 {
        match self.styles.get(&handle) {
            Some(style) => {
                let (font_id, px) = (style.font_id, style.px);
                self.fonts.text_width(font_id, text, px)
            },
            None => 0,
        }
    }

    fn draw_text(&mut self, text: &[u8], handle: FontHandle, color: Rgba, pos: Position) {
        let Some(style) = self.styles.get(&handle) else {
            log::debug!("Ignoring text drawn with unknown handle {:#x}", handle.raw());
            return;
        };

        let vm = self.fonts.font_metrics_or_estimate(style.font_id, style.px);
        let y = pos.y as i32;
        let baseline = y + vm.ascent;
        let color_hex = color.to_hex();
        let decoration = style.text_decoration(color);
        let font_style = if style.italic {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        };

        let mut x = pos.x as i32;
        let before = self.capture.records.len();
        for decoded in utf8::codepoints(text) {
            if decoded.codepoint == 0 {
                continue;
            }
            let width = self.fonts.char_width(style.font_id, decoded.codepoint, style.px);
            self.capture.records.push(CharRecord {
                character: decoded.text().into_owned(),
                x,
                y,
                width,
                height: vm.height,
                font_family: style.family.clone(),
                font_size: style.px,
                font_weight: style.weight,
                font_style: font_style.as_str().to_string(),
                color: color_hex.clone(),
                text_decoration: decoration.clone(),
                baseline,
                font_id: style.font_id,
                ..CharRecord::default()
            });
            x += width;
        }
        log::trace!(
            "Captured {} characters at ({}, {})",
            self.capture.records.len() - before,
            pos.x,
            pos.y
        );
    }

    fn pt_to_px(&self, pt: f32) -> f32 {
        self.config.pt_to_px(pt)
    }

    fn default_font_size(&self) -> f32 {
        self.config.default_font_size as f32
    }

    fn default_font_name(&self) -> String {
        self.fonts
            .font_name(self.fonts.default_font_id())
            .unwrap_or("sans-serif")
            .to_string()
    }

    fn viewport(&self) -> Position {
        Position::new(
            0.0,
            0.0,
            self.viewport.width as f32,
            self.viewport.height as f32,
        )
    }

    fn media_features(&self) -> MediaFeatures {
        let width = self.viewport.width as f32;
        let height = self.viewport.height as f32;
        MediaFeatures {
            media_type: MediaType::Screen,
            width,
            height,
            device_width: width,
            device_height: height,
            color: 8,
            color_index: 0,
            monochrome: 0,
            resolution: self.config.dpi,
        }
    }

    fn language(&self) -> (String, String) {
        ("en".to_string(), "US".to_string())
    }
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        let handles = self.styles.len();
        for (handle, _) in self.styles.drain() {
            self.fonts.delete_instance(handle);
        }
        self.capture.state = CaptureState::Captured;
        self.capture.passes += 1;
        log::debug!(
            "Capture pass {} finished: {} characters, {} handles released",
            self.capture.passes,
            self.capture.records.len(),
            handles
        );
    }
}
