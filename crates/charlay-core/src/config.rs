//! Knobs for a parser instance
//!
//! Defaults cover the usual embedding. Two environment variables can adjust
//! a config at startup:
//!
//! ```bash
//! CHARLAY_DEBUG=1 CHARLAY_MEMORY_THRESHOLD=104857600 ./my_app
//! ```

use serde::{Deserialize, Serialize};

/// Font memory above which a warning is raised: 50 MiB
pub const DEFAULT_MEMORY_THRESHOLD: usize = 50 * 1024 * 1024;

/// Largest accepted HTML input: 10 MiB
pub const DEFAULT_MAX_HTML_BYTES: usize = 10 * 1024 * 1024;

/// Canvas height reported to the layout engine so it never paginates
pub const DEFAULT_VIEWPORT_HEIGHT: i32 = 10_000;

pub const DEFAULT_FONT_SIZE: i32 = 16;

pub const DEFAULT_DPI: i32 = 96;

const ENV_DEBUG: &str = "CHARLAY_DEBUG";
const ENV_MEMORY_THRESHOLD: &str = "CHARLAY_MEMORY_THRESHOLD";

/// Settings shared by the font store, capture and parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserConfig {
    /// Bytes of loaded font data that trigger a warning
    pub memory_threshold: usize,
    pub max_html_bytes: usize,
    pub viewport_height: i32,
    pub default_font_size: i32,
    pub dpi: i32,
    /// Most advance widths kept in the glyph cache
    pub glyph_cache_capacity: usize,
    pub debug: bool,
    pub parser_version: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            max_html_bytes: DEFAULT_MAX_HTML_BYTES,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            default_font_size: DEFAULT_FONT_SIZE,
            dpi: DEFAULT_DPI,
            glyph_cache_capacity: crate::cache::DEFAULT_CAPACITY,
            debug: false,
            parser_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ParserConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key/value source
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup(ENV_DEBUG) {
            match parse_flag(&val) {
                Some(enabled) => {
                    self.debug = enabled;
                    if enabled {
                        log::info!("Charlay debug mode enabled via {} env var", ENV_DEBUG);
                    }
                },
                None => log::warn!("Ignoring {}={:?}: not a boolean", ENV_DEBUG, val),
            }
        }

        if let Some(val) = lookup(ENV_MEMORY_THRESHOLD) {
            match val.trim().parse::<usize>() {
                Ok(bytes) => {
                    self.memory_threshold = bytes;
                    log::info!("Charlay memory threshold set to {} bytes", bytes);
                },
                Err(_) => log::warn!(
                    "Ignoring {}={:?}: not a byte count",
                    ENV_MEMORY_THRESHOLD,
                    val
                ),
            }
        }

        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_memory_threshold(mut self, bytes: usize) -> Self {
        self.memory_threshold = bytes;
        self
    }

    pub fn with_max_html_bytes(mut self, bytes: usize) -> Self {
        self.max_html_bytes = bytes;
        self
    }

    /// Points to pixels at the configured DPI
    pub fn pt_to_px(&self, pt: f32) -> f32 {
        pt * self.dpi as f32 / 72.0
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
