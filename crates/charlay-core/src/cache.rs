//! Remember every advance width we measure
//!
//! Measuring a glyph means a charmap lookup plus a metrics query. Layout asks
//! for the same characters over and over, so widths are kept per font in a
//! two-level map: font id to a map keyed by `(pixel size << 32) | codepoint`.
//! Dropping a font's sub-map is all it takes to forget it.

use crate::types::FontId;
use serde::Serialize;
use std::collections::HashMap;
use std::mem::size_of;

/// Default upper bound on stored widths
pub const DEFAULT_CAPACITY: usize = 1_000_000;

/// Bytes per cached width: key, value and map node overhead
const ENTRY_OVERHEAD: usize = 8 + 4 + 32;

/// Bytes per font sub-map in the outer map
const FONT_OVERHEAD: usize = size_of::<FontId>() + size_of::<usize>() + 32;

/// Pack a pixel size and codepoint into one lookup key
#[inline]
pub const fn pack_key(px: u32, codepoint: u32) -> u64 {
    ((px as u64) << 32) | codepoint as u64
}

/// Snapshot of the cache's counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    /// `None` until the first lookup
    pub hit_rate: Option<f64>,
    pub memory_usage: usize,
}

/// Advance widths keyed by font, pixel size and codepoint
#[derive(Debug)]
pub struct GlyphMetricsCache {
    fonts: HashMap<FontId, HashMap<u64, i32>>,
    entries: usize,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl GlyphMetricsCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A cache that stores at most `capacity` widths
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fonts: HashMap::new(),
            entries: 0,
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a width, counting the hit or miss
    pub fn get(&mut self, font: FontId, px: u32, codepoint: u32) -> Option<i32> {
        let found = self
            .fonts
            .get(&font)
            .and_then(|widths| widths.get(&pack_key(px, codepoint)))
            .copied();
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    /// Whether a width is stored, without touching the counters
    pub fn contains(&self, font: FontId, px: u32, codepoint: u32) -> bool {
        self.fonts
            .get(&font)
            .is_some_and(|widths| widths.contains_key(&pack_key(px, codepoint)))
    }

    /// Store a width; returns false when the cache is full
    ///
    /// Overwriting an existing key always succeeds.
    pub fn put(&mut self, font: FontId, px: u32, codepoint: u32, width: i32) -> bool {
        let key = pack_key(px, codepoint);
        let full = self.entries >= self.capacity;
        let widths = self.fonts.entry(font).or_default();
        if let Some(slot) = widths.get_mut(&key) {
            *slot = width;
            return true;
        }
        if full {
            if widths.is_empty() {
                self.fonts.remove(&font);
            }
            return false;
        }
        widths.insert(key, width);
        self.entries += 1;
        true
    }

    /// Forget everything measured with `font`; returns how many widths went
    pub fn clear_font(&mut self, font: FontId) -> usize {
        let removed = self.fonts.remove(&font).map_or(0, |widths| widths.len());
        self.entries -= removed;
        if removed > 0 {
            log::debug!("Dropped {} cached widths for font {}", removed, font);
        }
        removed
    }

    /// Forget every width; counters are kept
    pub fn clear_all(&mut self) {
        self.fonts.clear();
        self.entries = 0;
    }

    pub fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    /// Number of stored widths
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of fonts with at least one stored width
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Share of lookups that hit, `None` before the first lookup
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }

    /// Rough bytes held by the cache
    pub fn memory_usage(&self) -> usize {
        size_of::<Self>()
            + self.fonts.len() * (size_of::<HashMap<u64, i32>>() + FONT_OVERHEAD)
            + self.entries * ENTRY_OVERHEAD
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries,
            hit_rate: self.hit_rate(),
            memory_usage: self.memory_usage(),
        }
    }
}

impl Default for GlyphMetricsCache {
    fn default() -> Self {
        Self::new()
    }
}
