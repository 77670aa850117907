/*
 *  text/glyph.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Glyph bitmaps, rasterizer seam and the bounded glyph cache
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::sync::Arc;

use log::trace;
use mini_moka::sync::Cache;
use thiserror::Error;

const CODEPOINT_BITS: u32 = 21;
const CODEPOINT_MASK: u32 = (1 << CODEPOINT_BITS) - 1;

/// Default glyph cache budget in alpha-bitmap bytes
pub const DEFAULT_CACHE_BYTES: u64 = 4 * 1024 * 1024;

/// Cache key: pixel size in the high 43 bits, codepoint in the low 21.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlyphKey(u64);

impl GlyphKey {
    pub fn new(size_px: u64, codepoint: u32) -> Self {
        GlyphKey((size_px << CODEPOINT_BITS) | (codepoint & CODEPOINT_MASK) as u64)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn size_px(&self) -> u64 {
        self.0 >> CODEPOINT_BITS
    }

    pub fn codepoint(&self) -> u32 {
        (self.0 as u32) & CODEPOINT_MASK
    }
}

/// One rasterized codepoint at one pixel size.
///
/// `left` and `top` are the bearing from the pen (on the baseline) to the
/// bitmap's top-left corner; `top` grows upward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// Bytes per bitmap row, at least `width`
    pub pitch: usize,
    pub left: i32,
    pub top: i32,
    pub advance: i32,
    pub alpha: Vec<u8>,
}

impl Glyph {
    /// Bitmap-less glyph that only moves the pen.
    pub fn blank(advance: i32) -> Self {
        Glyph {
            advance,
            ..Default::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Coverage values of bitmap row `y`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        &self.alpha[start..start + self.width as usize]
    }
}

/// Vertical font metrics at one pixel size, in whole pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineMetrics {
    pub ascent: i32,
    /// Distance below the baseline, positive
    pub descent: i32,
    /// Baseline-to-baseline distance; 0 when the font does not say
    pub line_height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GlyphError {
    #[error("U+{0:04X} is not a valid codepoint")]
    InvalidCodepoint(u32),
    #[error("font has no glyph for U+{0:04X}")]
    Missing(u32),
}

/// The glyph rasterization service behind [`TextRenderer`].
///
/// [`TextRenderer`]: crate::text::TextRenderer
pub trait GlyphRasterizer {
    fn rasterize(&mut self, codepoint: u32, size_px: u32) -> Result<Glyph, GlyphError>;
    fn line_metrics(&self, size_px: u32) -> LineMetrics;
}

impl<R: GlyphRasterizer + ?Sized> GlyphRasterizer for Box<R> {
    fn rasterize(&mut self, codepoint: u32, size_px: u32) -> Result<Glyph, GlyphError> {
        (**self).rasterize(codepoint, size_px)
    }

    fn line_metrics(&self, size_px: u32) -> LineMetrics {
        (**self).line_metrics(size_px)
    }
}

/// Hit and miss counters plus approximate occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub weighted_bytes: u64,
}

/// Glyph raster cache bounded by total bitmap bytes.
///
/// Entries for every pixel size share one budget; the least useful are
/// evicted once it is exceeded, so switching font sizes back and forth
/// cannot grow memory without limit.
pub struct GlyphCache {
    cache: Cache<GlyphKey, Arc<Glyph>>,
    capacity_bytes: u64,
    hits: u64,
    misses: u64,
}

impl GlyphCache {
    pub fn new(capacity_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_key: &GlyphKey, glyph: &Arc<Glyph>| -> u32 {
                let bytes = glyph.alpha.len() + std::mem::size_of::<Glyph>();
                u32::try_from(bytes).unwrap_or(u32::MAX)
            })
            .max_capacity(capacity_bytes)
            .build();
        Self {
            cache,
            capacity_bytes,
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn get(&mut self, key: &GlyphKey) -> Option<Arc<Glyph>> {
        let found = self.cache.get(key);
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn insert(&mut self, key: GlyphKey, glyph: Arc<Glyph>) {
        trace!("caching glyph U+{:04X} @ {}px", key.codepoint(), key.size_px());
        self.cache.insert(key, glyph);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.cache.entry_count(),
            weighted_bytes: self.cache.weighted_size(),
        }
    }
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_BYTES)
    }
}
