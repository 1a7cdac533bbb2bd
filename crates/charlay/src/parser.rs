//! The host-facing parser: fonts in, HTML in, JSON out
//!
//! One [`HtmlLayoutParser`] owns everything a pass needs: the font store
//! with its glyph cache, the capture buffer and the serializer. Hosts that
//! want independent font sets simply create more parsers.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use log::Level;
use serde::Serialize;

use charlay_core::{
    cache::CacheStats,
    config::ParserConfig,
    error::{Diagnostic, ErrorCode, LayoutError, Result},
    traits::{FontLoader, LayoutEngine},
    types::{FontId, Viewport},
};
use charlay_fontdb::{FontStore, MemoryMetrics, SkrifaLoader};
use charlay_render_json::{LayoutSerializer, OutputMode};

use crate::capture::LayoutCapture;
use crate::diagnostics::{ParseMetrics, ParseOutcome};

/// How the most recent pass went
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub success: bool,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    pub metrics: ParseMetrics,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsSummary<'a> {
    font_count: usize,
    default_font_id: FontId,
    total_memory_usage: usize,
    cache: &'a CacheStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedMetrics<'a> {
    version: &'a str,
    font_backend: &'static str,
    debug_mode: bool,
    memory: MemoryMetrics,
    cache: CacheStats,
    passes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_pass: Option<&'a PassReport>,
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "layout engine panicked".to_string()
    }
}

fn to_json_or<T: Serialize>(value: &T, fallback: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| fallback.to_string())
}

/// Lays out HTML with an external engine and returns per-character JSON
///
/// ```ignore
/// let mut parser = HtmlLayoutParser::new(MyEngine::default());
/// let arial = parser.load_font(&std::fs::read("Arial.ttf")?, "Arial");
/// let json = parser.parse("<p>Hello</p>", None, 800, OutputMode::Full)?;
/// ```
pub struct HtmlLayoutParser<E: LayoutEngine> {
    engine: E,
    fonts: FontStore,
    capture: LayoutCapture,
    serializer: LayoutSerializer,
    config: ParserConfig,
    debug: bool,
    last_pass: Option<PassReport>,
}

impl<E: LayoutEngine> HtmlLayoutParser<E> {
    /// A parser with default settings and skrifa-backed fonts
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, ParserConfig::default())
    }

    pub fn with_config(engine: E, config: ParserConfig) -> Self {
        Self::with_font_loader(engine, Box::new(SkrifaLoader), config)
    }

    /// A parser that opens fonts through `loader`
    pub fn with_font_loader(engine: E, loader: Box<dyn FontLoader>, config: ParserConfig) -> Self {
        let fonts = FontStore::with_config(loader, &config);
        let serializer = LayoutSerializer::new(config.parser_version.clone());
        log::debug!(
            "Created parser with engine {} and font backend {}",
            engine.name(),
            fonts.loader_name()
        );
        Self {
            engine,
            fonts,
            capture: LayoutCapture::new(),
            serializer,
            debug: config.debug,
            config,
            last_pass: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontStore {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontStore {
        &mut self.fonts
    }

    /// Progress messages go to `info` in debug mode, `debug` otherwise
    fn progress_level(&self) -> Level {
        if self.debug {
            Level::Info
        } else {
            Level::Debug
        }
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
        log::info!("Debug mode {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn debug_mode(&self) -> bool {
        self.debug
    }

    pub fn version(&self) -> &str {
        &self.config.parser_version
    }

    // Fonts

    /// Load a font; 0 means it could not be loaded
    pub fn load_font(&mut self, data: &[u8], name: &str) -> FontId {
        let id = self.fonts.load(data, name);
        log::log!(
            self.progress_level(),
            "Font {:?} -> id {}, font memory now {} bytes",
            name,
            id,
            self.fonts.total_memory_usage()
        );
        id
    }

    /// Unload a font; false if `id` was not loaded
    pub fn unload_font(&mut self, id: FontId) -> bool {
        self.try_unload_font(id).is_ok()
    }

    /// Unload a font, failing with [`LayoutError::FontIdNotFound`] for unknown ids
    pub fn try_unload_font(&mut self, id: FontId) -> Result<()> {
        let unloaded = self.fonts.unload(id);
        log::log!(
            self.progress_level(),
            "Unload font {}: {}, font memory now {} bytes",
            id,
            unloaded,
            self.fonts.total_memory_usage()
        );
        if unloaded {
            Ok(())
        } else {
            Err(LayoutError::FontIdNotFound(id))
        }
    }

    pub fn set_default_font(&mut self, id: FontId) -> bool {
        self.fonts.set_default_font(id)
    }

    /// Like [`HtmlLayoutParser::set_default_font`], with the unknown id as an error
    pub fn try_set_default_font(&mut self, id: FontId) -> Result<()> {
        if self.fonts.set_default_font(id) {
            Ok(())
        } else {
            Err(LayoutError::FontIdNotFound(id))
        }
    }

    /// Unload every font; ids keep counting from where they were
    pub fn clear_all_fonts(&mut self) {
        self.fonts.clear_all();
    }

    pub fn default_font_id(&self) -> FontId {
        self.fonts.default_font_id()
    }

    pub fn loaded_fonts_json(&self) -> String {
        self.fonts.loaded_fonts_json()
    }

    /// Per-font and total memory as JSON
    pub fn memory_metrics_json(&self) -> String {
        self.fonts.memory_metrics_json()
    }

    pub fn total_memory_usage(&self) -> usize {
        self.fonts.total_memory_usage()
    }

    pub fn check_memory_threshold(&self) -> bool {
        self.fonts.check_memory_threshold()
    }

    // Parsing

    /// Lay out `html` at `width` pixels and serialize it in `mode`
    ///
    /// `css`, when given, is applied as a leading `<style>` block.
    pub fn parse(
        &mut self,
        html: &str,
        css: Option<&str>,
        width: i32,
        mode: OutputMode,
    ) -> Result<String> {
        self.run_pass(html, css, width, mode)
            .map(|(json, _)| json)
    }

    /// Like [`HtmlLayoutParser::parse`], reporting failures and warnings as values
    pub fn parse_with_diagnostics(
        &mut self,
        html: &str,
        css: Option<&str>,
        width: i32,
        mode: OutputMode,
    ) -> ParseOutcome {
        let (json, metrics) = match self.run_pass(html, css, width, mode) {
            Ok(done) => done,
            Err(e) => return ParseOutcome::failed(self.failure_diagnostic(&e)),
        };

        let mut outcome = ParseOutcome::succeeded(json, metrics);
        if metrics.character_count == 0 {
            outcome.warn(
                ErrorCode::InvalidInput,
                "No characters extracted from HTML; check that fonts are loaded and the HTML has text",
            );
        }
        if self.fonts.check_memory_threshold() {
            outcome.warn(
                ErrorCode::FontMemoryExceeded,
                format!(
                    "Font memory {} bytes exceeds threshold {} bytes",
                    self.fonts.total_memory_usage(),
                    self.fonts.memory_threshold()
                ),
            );
        }
        outcome
    }

    /// Engine failures name the engine that produced them
    fn failure_diagnostic(&self, error: &LayoutError) -> Diagnostic {
        let diagnostic = error.to_diagnostic();
        match error {
            LayoutError::Engine(_) | LayoutError::Internal(_) => {
                diagnostic.with_context(format!("layout engine {}", self.engine.name()))
            },
            _ => diagnostic,
        }
    }

    fn validate(&self, html: &str, width: i32) -> Result<()> {
        if html.is_empty() {
            return Err(LayoutError::EmptyHtml);
        }
        if width <= 0 {
            return Err(LayoutError::InvalidViewportWidth(width));
        }
        if html.len() > self.config.max_html_bytes {
            return Err(LayoutError::HtmlTooLarge {
                size: html.len(),
                max: self.config.max_html_bytes,
            });
        }
        Ok(())
    }

    fn run_pass(
        &mut self,
        html: &str,
        css: Option<&str>,
        width: i32,
        mode: OutputMode,
    ) -> Result<(String, ParseMetrics)> {
        let result = self.layout_and_serialize(html, css, width, mode);
        self.last_pass = Some(match &result {
            Ok((_, metrics)) => PassReport {
                success: true,
                mode: mode.as_str(),
                error: None,
                metrics: *metrics,
            },
            Err(e) => {
                log::warn!("Parse failed: {} ({})", e, e.code());
                PassReport {
                    success: false,
                    mode: mode.as_str(),
                    error: Some(e.code()),
                    metrics: ParseMetrics {
                        input_size: html.len(),
                        ..ParseMetrics::default()
                    },
                }
            },
        });
        result
    }

    fn layout_and_serialize(
        &mut self,
        html: &str,
        css: Option<&str>,
        width: i32,
        mode: OutputMode,
    ) -> Result<(String, ParseMetrics)> {
        let started = Instant::now();
        let level = self.progress_level();
        log::log!(level, "Parse started: {} bytes of HTML, width {}", html.len(), width);

        self.validate(html, width)?;
        let document = match css.filter(|css| !css.is_empty()) {
            Some(css) => format!("<style>{}</style>{}", css, html),
            None => html.to_string(),
        };
        let viewport = Viewport::new(width, self.config.viewport_height);
        let parse_time = millis_since(started);

        let layout_started = Instant::now();
        log::log!(level, "Layout started with {}", self.engine.name());
        let engine = &self.engine;
        let rendered = {
            let mut session = self.capture.session(&mut self.fonts, &self.config, viewport)?;
            panic::catch_unwind(AssertUnwindSafe(|| {
                engine.render(&document, width, &mut session)
            }))
        };
        let failure = match rendered {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(LayoutError::Engine(e)),
            Err(payload) => Some(LayoutError::Internal(format!(
                "layout engine panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        if let Some(e) = failure {
            self.capture.clear();
            return Err(e);
        }
        let layout_time = millis_since(layout_started);
        let character_count = self.capture.len();
        log::log!(
            level,
            "Layout finished in {:.2}ms, {} characters extracted",
            layout_time,
            character_count
        );

        let serialize_started = Instant::now();
        let json = self
            .serializer
            .serialize(self.capture.records(), viewport, mode);
        self.capture.clear();
        let json = json?;
        let serialize_time = millis_since(serialize_started);
        log::log!(
            level,
            "Serialized {} mode in {:.2}ms, {} bytes",
            mode.as_str(),
            serialize_time,
            json.len()
        );

        let metrics = ParseMetrics {
            parse_time,
            layout_time,
            serialize_time,
            total_time: millis_since(started),
            character_count,
            input_size: html.len(),
            chars_per_second: 0.0,
            memory_used: self.fonts.total_memory_usage() + self.fonts.cache().memory_usage(),
        }
        .with_throughput();
        Ok((json, metrics))
    }

    // Introspection

    /// Fonts and glyph cache at a glance
    pub fn metrics_json(&self) -> String {
        let cache = self.fonts.cache().stats();
        to_json_or(
            &MetricsSummary {
                font_count: self.fonts.font_count(),
                default_font_id: self.fonts.default_font_id(),
                total_memory_usage: self.fonts.total_memory_usage(),
                cache: &cache,
            },
            "{}",
        )
    }

    /// Memory, cache and the most recent pass
    pub fn detailed_metrics_json(&self) -> String {
        to_json_or(
            &DetailedMetrics {
                version: self.version(),
                font_backend: self.fonts.loader_name(),
                debug_mode: self.debug,
                memory: self.fonts.memory_metrics(),
                cache: self.fonts.cache().stats(),
                passes: self.capture.passes(),
                last_pass: self.last_pass.as_ref(),
            },
            "{}",
        )
    }

    pub fn last_pass(&self) -> Option<&PassReport> {
        self.last_pass.as_ref()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.fonts.cache().stats()
    }

    pub fn cache_stats_json(&self) -> String {
        to_json_or(&self.cache_stats(), "{}")
    }

    pub fn reset_cache_stats(&mut self) {
        self.fonts.cache_mut().reset_stats();
    }

    /// Forget every cached width; counters are kept
    pub fn clear_cache(&mut self) {
        self.fonts.cache_mut().clear_all();
    }

    /// Release fonts, caches and pass state
    ///
    /// The parser stays usable; calling this again does nothing more.
    pub fn destroy(&mut self) {
        self.fonts.clear_all();
        self.fonts.cache_mut().clear_all();
        self.fonts.cache_mut().reset_stats();
        self.capture.clear();
        self.last_pass = None;
        self.debug = false;
        log::debug!("Parser destroyed");
    }
}

impl<E: LayoutEngine + Default> Default for HtmlLayoutParser<E> {
    fn default() -> Self {
        Self::with_config(E::default(), ParserConfig::from_env())
    }
}

impl<E: LayoutEngine> std::fmt::Debug for HtmlLayoutParser<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlLayoutParser")
            .field("engine", &self.engine.name())
            .field("fonts", &self.fonts)
            .field("capture", &self.capture.state())
            .field("debug", &self.debug)
            .finish()
    }
}
