//! Where fonts come to live: the multi-font store for charlay
//!
//! Hosts hand over raw font bytes and get back a small integer id. The store
//! copies the bytes, opens a face through a [`FontLoader`], and keeps the
//! glyph-width cache for every font it owns. Unloading a font drops its
//! face, its bytes, its cached widths and every instance handle that points
//! at it, all in one call.
//!
//! ## Ids
//!
//! Ids start at 1 and only ever grow, even across [`FontStore::clear_all`].
//! An unloaded id is never handed out again. The first font loaded becomes
//! the default; when the default goes away, the lowest remaining id takes
//! over.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use charlay_core::{
    cache::GlyphMetricsCache,
    config::ParserConfig,
    error::FontLoadError,
    traits::{FontFace, FontLoader},
    types::{FontHandle, FontId, NO_FONT},
};

pub mod instances;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod resolver;
pub mod skrifa_face;

pub use instances::{FontInstance, InstanceTable};
pub use metrics::{FallbackClass, GlyphWidth, VerticalMetrics};
pub use resolver::{normalize_font_name, parse_font_family};
pub use skrifa_face::{SkrifaFace, SkrifaLoader};

/// One loaded font: its bytes, its face and its bookkeeping
pub struct Font {
    id: FontId,
    name: String,
    face: Box<dyn FontFace>,
    memory_usage: usize,
    current_px: Cell<u32>,
}

impl Font {
    pub fn id(&self) -> FontId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn face(&self) -> &dyn FontFace {
        self.face.as_ref()
    }

    /// Bytes this font accounts for
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Last pixel size the font was queried at, 0 before the first query
    pub fn current_size(&self) -> u32 {
        self.current_px.get()
    }

    fn set_size(&self, px: u32) {
        if self.current_px.get() != px {
            self.current_px.set(px);
        }
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("memory_usage", &self.memory_usage)
            .finish_non_exhaustive()
    }
}

/// Entry of [`FontStore::loaded_fonts`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedFontInfo {
    pub id: FontId,
    pub name: String,
    pub memory_usage: usize,
    pub is_default: bool,
}

/// Per-font line of [`MemoryMetrics`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontMemory {
    pub id: FontId,
    pub name: String,
    pub memory_usage: usize,
}

/// Where the font memory went
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub total_memory_usage: usize,
    pub font_count: usize,
    pub font_handle_count: usize,
    pub memory_threshold: usize,
    pub exceeds_threshold: bool,
    pub fonts: Vec<FontMemory>,
}

/// Every loaded font, plus the caches that depend on them
pub struct FontStore {
    loader: Box<dyn FontLoader>,
    fonts: BTreeMap<FontId, Font>,
    next_id: FontId,
    default_font: FontId,
    cache: GlyphMetricsCache,
    instances: InstanceTable,
    memory_threshold: usize,
    threshold_warned: Cell<bool>,
}

impl FontStore {
    /// An empty store that opens faces with `loader`
    pub fn new(loader: Box<dyn FontLoader>) -> Self {
        Self::with_config(loader, &ParserConfig::default())
    }

    pub fn with_config(loader: Box<dyn FontLoader>, config: &ParserConfig) -> Self {
        Self {
            loader,
            fonts: BTreeMap::new(),
            next_id: 1,
            default_font: NO_FONT,
            cache: GlyphMetricsCache::with_capacity(config.glyph_cache_capacity),
            instances: InstanceTable::new(),
            memory_threshold: config.memory_threshold,
            threshold_warned: Cell::new(false),
        }
    }

    /// Name of the font backend in use
    pub fn loader_name(&self) -> &'static str {
        self.loader.name()
    }

    /// Load a font, returning its id or 0 on any failure
    pub fn load(&mut self, data: &[u8], name: &str) -> FontId {
        match self.try_load(data, name) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Failed to load font {:?}: {}", name, e);
                NO_FONT
            },
        }
    }

    /// Load a font, reporting why it failed
    ///
    /// The bytes are copied; the caller may drop its buffer right away. An
    /// empty `name` falls back to the face's family name.
    pub fn try_load(&mut self, data: &[u8], name: &str) -> Result<FontId, FontLoadError> {
        if data.is_empty() {
            return Err(FontLoadError::EmptyData);
        }

        let mut owned = Vec::new();
        owned
            .try_reserve_exact(data.len())
            .map_err(|_| FontLoadError::OutOfMemory(data.len()))?;
        owned.extend_from_slice(data);
        let data: Arc<[u8]> = Arc::from(owned);

        let memory_usage = data.len();
        let face = self.loader.open_face(data)?;

        let name = match name.trim() {
            "" => face
                .family_name()
                .filter(|family| !family.trim().is_empty())
                .ok_or(FontLoadError::NameEmpty)?,
            given => given.to_string(),
        };

        let id = self.next_id;
        self.next_id += 1;
        self.fonts.insert(
            id,
            Font {
                id,
                name,
                face,
                memory_usage,
                current_px: Cell::new(0),
            },
        );

        if self.default_font == NO_FONT {
            self.default_font = id;
        }

        log::info!(
            "Loaded font {} ({} bytes), total font memory {} bytes",
            id,
            memory_usage,
            self.total_memory_usage()
        );
        self.check_memory_threshold();

        Ok(id)
    }

    /// Drop a font and everything derived from it; false if it wasn't loaded
    pub fn unload(&mut self, id: FontId) -> bool {
        let Some(font) = self.fonts.remove(&id) else {
            return false;
        };

        let widths = self.cache.clear_font(id);
        let handles = self.instances.remove_font(id);

        if self.default_font == id {
            self.default_font = self.fonts.keys().next().copied().unwrap_or(NO_FONT);
            log::debug!("Default font is now {}", self.default_font);
        }
        self.threshold_warned.set(false);

        log::info!(
            "Unloaded font {} ({}): {} bytes, {} cached widths, {} handles released",
            id,
            font.name,
            font.memory_usage,
            widths,
            handles
        );
        true
    }

    /// Unload every font; ids keep counting from where they were
    pub fn clear_all(&mut self) {
        let count = self.fonts.len();
        self.fonts.clear();
        self.cache.clear_all();
        self.instances.clear();
        self.default_font = NO_FONT;
        self.threshold_warned.set(false);
        log::info!("Cleared {} fonts", count);
    }

    /// Make `id` the default; unknown ids are ignored
    pub fn set_default_font(&mut self, id: FontId) -> bool {
        if self.fonts.contains_key(&id) {
            self.default_font = id;
            true
        } else {
            log::debug!("Ignoring default font {}: not loaded", id);
            false
        }
    }

    /// Current default font, 0 when nothing is loaded
    pub fn default_font_id(&self) -> FontId {
        self.default_font
    }

    pub fn is_font_loaded(&self, id: FontId) -> bool {
        self.fonts.contains_key(&id)
    }

    pub fn font(&self, id: FontId) -> Option<&Font> {
        self.fonts.get(&id)
    }

    pub fn font_name(&self, id: FontId) -> Option<&str> {
        self.fonts.get(&id).map(Font::name)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Loaded fonts in id order
    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.fonts.values()
    }

    /// Sum of tracked font bytes (not process memory)
    pub fn total_memory_usage(&self) -> usize {
        self.fonts.values().map(|font| font.memory_usage).sum()
    }

    /// Tracked bytes of one font, 0 if not loaded
    pub fn font_memory_usage(&self, id: FontId) -> usize {
        self.fonts.get(&id).map_or(0, |font| font.memory_usage)
    }

    pub fn memory_threshold(&self) -> usize {
        self.memory_threshold
    }

    pub fn set_memory_threshold(&mut self, bytes: usize) {
        self.memory_threshold = bytes;
        self.threshold_warned.set(false);
    }

    /// Whether font memory exceeds the threshold
    ///
    /// The first crossing logs a warning; it stays quiet until a font is
    /// unloaded.
    pub fn check_memory_threshold(&self) -> bool {
        let total = self.total_memory_usage();
        let exceeds = total > self.memory_threshold;
        if exceeds && !self.threshold_warned.replace(true) {
            log::warn!(
                "Font memory {:.2}MB exceeds threshold {:.2}MB",
                total as f64 / 1024.0 / 1024.0,
                self.memory_threshold as f64 / 1024.0 / 1024.0
            );
        }
        exceeds
    }

    pub fn loaded_fonts(&self) -> Vec<LoadedFontInfo> {
        self.fonts
            .values()
            .map(|font| LoadedFontInfo {
                id: font.id,
                name: font.name.clone(),
                memory_usage: font.memory_usage,
                is_default: font.id == self.default_font,
            })
            .collect()
    }

    /// `[{id, name, memoryUsage, isDefault}]`
    pub fn loaded_fonts_json(&self) -> String {
        serde_json::to_string(&self.loaded_fonts()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn memory_metrics(&self) -> MemoryMetrics {
        MemoryMetrics {
            total_memory_usage: self.total_memory_usage(),
            font_count: self.fonts.len(),
            font_handle_count: self.instances.len(),
            memory_threshold: self.memory_threshold,
            exceeds_threshold: self.check_memory_threshold(),
            fonts: self
                .fonts
                .values()
                .map(|font| FontMemory {
                    id: font.id,
                    name: font.name.clone(),
                    memory_usage: font.memory_usage,
                })
                .collect(),
        }
    }

    pub fn memory_metrics_json(&self) -> String {
        serde_json::to_string(&self.memory_metrics()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn cache(&self) -> &GlyphMetricsCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut GlyphMetricsCache {
        &mut self.cache
    }

    /// Register an instance of `id` at `px`
    ///
    /// Falls back to the default font when `id` isn't loaded; returns
    /// [`FontHandle::INVALID`] when there is no default either.
    pub fn create_instance(&mut self, id: FontId, px: i32, bold: bool, italic: bool) -> FontHandle {
        let font_id = if self.is_font_loaded(id) {
            id
        } else if self.is_font_loaded(self.default_font) {
            self.default_font
        } else {
            return FontHandle::INVALID;
        };
        self.instances.insert(FontInstance {
            font_id,
            px: px.max(0) as u32,
            bold,
            italic,
        })
    }

    pub fn instance(&self, handle: FontHandle) -> Option<&FontInstance> {
        self.instances.get(handle)
    }

    pub fn delete_instance(&mut self, handle: FontHandle) -> bool {
        self.instances.remove(handle)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new(Box::new(SkrifaLoader))
    }
}

impl std::fmt::Debug for FontStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontStore")
            .field("loader", &self.loader.name())
            .field("fonts", &self.fonts)
            .field("default_font", &self.default_font)
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockFont, MockFontLoader};

    fn store() -> FontStore {
        FontStore::new(Box::new(MockFontLoader))
    }

    #[test]
    fn first_font_becomes_default() {
        let mut store = store();
        assert_eq!(store.default_font_id(), NO_FONT);
        let a = store.load(&MockFont::new("Arial").build(), "Arial");
        let b = store.load(&MockFont::new("Times").build(), "Times");
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(store.default_font_id(), a);
    }

    #[test]
    fn bad_data_yields_zero() {
        let mut store = store();
        assert_eq!(store.load(b"", "Empty"), NO_FONT);
        assert_eq!(store.load(b"not a font", "Junk"), NO_FONT);
        assert_eq!(store.font_count(), 0);
        assert_eq!(store.default_font_id(), NO_FONT);
    }

    #[test]
    fn empty_name_uses_family_name() {
        let mut store = store();
        let id = store.load(&MockFont::new("Noto Sans").build(), "  ");
        assert_eq!(store.font_name(id), Some("Noto Sans"));
    }

    #[test]
    fn nameless_font_without_family_is_rejected() {
        let mut store = store();
        let err = store.try_load(&MockFont::new("").build(), "").unwrap_err();
        assert!(matches!(err, FontLoadError::NameEmpty));
    }

    #[test]
    fn ids_are_never_reused() {
        let mut store = store();
        let a = store.load(&MockFont::new("A").build(), "A");
        assert!(store.unload(a));
        store.clear_all();
        let b = store.load(&MockFont::new("B").build(), "B");
        assert!(b > a);
    }

    #[test]
    fn unloading_default_promotes_lowest_remaining() {
        let mut store = store();
        let a = store.load(&MockFont::new("A").build(), "A");
        let b = store.load(&MockFont::new("B").build(), "B");
        let c = store.load(&MockFont::new("C").build(), "C");
        store.set_default_font(b);

        assert!(store.unload(b));
        assert_eq!(store.default_font_id(), a);
        assert!(store.unload(a));
        assert_eq!(store.default_font_id(), c);
        assert!(store.unload(c));
        assert_eq!(store.default_font_id(), NO_FONT);
        assert!(!store.unload(c));
    }

    #[test]
    fn unknown_default_is_ignored() {
        let mut store = store();
        let a = store.load(&MockFont::new("A").build(), "A");
        assert!(!store.set_default_font(99));
        assert_eq!(store.default_font_id(), a);
    }

    #[test]
    fn unload_releases_instances_and_widths() {
        let mut store = store();
        let a = store.load(&MockFont::new("A").build(), "A");
        let b = store.load(&MockFont::new("B").build(), "B");
        let ha = store.create_instance(a, 16, false, false);
        let hb = store.create_instance(b, 16, true, false);
        store.char_width(a, 'x' as u32, 16);
        store.char_width(b, 'x' as u32, 16);

        store.unload(a);
        assert!(store.instance(ha).is_none());
        assert!(store.instance(hb).is_some());
        assert!(!store.cache().contains(a, 16, 'x' as u32));
        assert!(store.cache().contains(b, 16, 'x' as u32));
    }

    #[test]
    fn instance_falls_back_to_default_font() {
        let mut store = store();
        assert_eq!(store.create_instance(5, 16, false, false), FontHandle::INVALID);
        let a = store.load(&MockFont::new("A").build(), "A");
        let handle = store.create_instance(5, 16, false, true);
        let inst = store.instance(handle).copied().unwrap();
        assert_eq!(inst.font_id, a);
        assert!(inst.italic);
    }

    #[test]
    fn memory_is_tracked_per_font() {
        let mut store = store();
        let a = store.load(&MockFont::new("A").padded_to(1000).build(), "A");
        let b = store.load(&MockFont::new("B").padded_to(500).build(), "B");
        assert_eq!(store.font_memory_usage(a), 1000);
        assert_eq!(store.total_memory_usage(), 1500);
        assert_eq!(store.font_memory_usage(42), 0);
        store.unload(b);
        assert_eq!(store.total_memory_usage(), 1000);
    }

    #[test]
    fn threshold_is_a_strict_comparison() {
        let config = ParserConfig::default().with_memory_threshold(1000);
        let mut store = FontStore::with_config(Box::new(MockFontLoader), &config);
        store.load(&MockFont::new("A").padded_to(1000).build(), "A");
        assert!(!store.check_memory_threshold());
        let b = store.load(&MockFont::new("B").padded_to(10).build(), "B");
        assert!(store.check_memory_threshold());
        assert!(store.check_memory_threshold());
        store.unload(b);
        assert!(!store.check_memory_threshold());
    }

    #[test]
    fn json_listings_use_camel_case() {
        let mut store = store();
        store.load(&MockFont::new("A").padded_to(64).build(), "A");
        let fonts: serde_json::Value = serde_json::from_str(&store.loaded_fonts_json()).unwrap();
        assert_eq!(fonts[0]["id"], 1);
        assert_eq!(fonts[0]["memoryUsage"], 64);
        assert_eq!(fonts[0]["isDefault"], true);

        let metrics: serde_json::Value =
            serde_json::from_str(&store.memory_metrics_json()).unwrap();
        assert_eq!(metrics["totalMemoryUsage"], 64);
        assert_eq!(metrics["fontHandleCount"], 0);
        assert_eq!(metrics["exceedsThreshold"], false);
        assert_eq!(metrics["fonts"][0]["name"], "A");
    }
}
