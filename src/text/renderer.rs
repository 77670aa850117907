/*
 *  text/renderer.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Alpha-composited text on top of a panel driver
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

use std::path::{Path, PathBuf};
use std::sync::Arc;

use embedded_graphics::pixelcolor::Rgb565;
use log::{debug, trace};
use thiserror::Error;

use crate::display::color::{blend, BLACK, WHITE};
use crate::display::{DisplayDriver, DisplayError};
use crate::text::font::FontdueRasterizer;
use crate::text::glyph::{CacheStats, Glyph, GlyphCache, GlyphKey, GlyphRasterizer};
use crate::text::utf8::{decode_utf8, REPLACEMENT};

pub const DEFAULT_FONT_SIZE_PX: u32 = 32;
pub const MIN_FONT_SIZE_PX: u32 = 6;
pub const DEFAULT_LINE_GAP_PX: i32 = 4;

/// Left margin used by non-centred labels
const LABEL_MARGIN_PX: i32 = 4;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("failed to load font {}: {reason}", path.display())]
    FontLoad { path: PathBuf, reason: String },
    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Extent of a text run: widest line, total height, and ascent above the
/// first baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextMetrics {
    pub width: i32,
    pub height: i32,
    pub baseline: i32,
}

/// Line breaking state shared by drawing and measuring.
struct LineCursor {
    origin_x: i32,
    pen_x: i32,
    pen_y: i32,
    cur_w: i32,
    max_w: i32,
    total_h: i32,
    step: i32,
}

impl LineCursor {
    fn new(x: i32, y: i32, line_h: i32, gap: i32) -> Self {
        LineCursor {
            origin_x: x,
            pen_x: x,
            pen_y: y,
            cur_w: 0,
            max_w: 0,
            total_h: line_h,
            step: line_h + gap,
        }
    }

    fn newline(&mut self) {
        self.max_w = self.max_w.max(self.cur_w);
        self.pen_x = self.origin_x;
        self.pen_y += self.step;
        self.total_h += self.step;
        self.cur_w = 0;
    }

    /// Break first if `advance` would overflow a non-zero wrap width.
    fn wrap_for(&mut self, advance: i32, wrap_width: i32) {
        if wrap_width > 0 && self.pen_x - self.origin_x + advance > wrap_width {
            self.newline();
        }
    }

    fn advance(&mut self, advance: i32) {
        self.pen_x += advance;
        self.cur_w += advance;
    }

    fn finish(mut self, ascent: i32) -> TextMetrics {
        self.max_w = self.max_w.max(self.cur_w);
        TextMetrics {
            width: self.max_w,
            height: self.total_h,
            baseline: ascent,
        }
    }
}

/// Draws UTF-8 text onto a [`DisplayDriver`] one glyph row at a time.
///
/// Glyphs are rasterized on first use at the current pixel size and kept in
/// a byte-bounded cache. Colour, size, gap and wrap settings apply to
/// subsequent draws only.
pub struct TextRenderer<D, R> {
    display: D,
    rasterizer: R,
    cache: GlyphCache,
    font_size_px: u32,
    fg: Rgb565,
    bg: Rgb565,
    line_gap_px: i32,
    wrap_width_px: i32,
    line: Vec<Rgb565>,
}

impl<D: DisplayDriver> TextRenderer<D, FontdueRasterizer> {
    /// Renderer over a font file; a missing or unparseable font is fatal.
    pub fn from_font_file(display: D, path: &Path) -> Result<Self, TextError> {
        Ok(Self::new(display, FontdueRasterizer::from_file(path)?))
    }
}

impl<D: DisplayDriver, R: GlyphRasterizer> TextRenderer<D, R> {
    pub fn new(display: D, rasterizer: R) -> Self {
        TextRenderer {
            display,
            rasterizer,
            cache: GlyphCache::default(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            fg: BLACK,
            bg: WHITE,
            line_gap_px: DEFAULT_LINE_GAP_PX,
            wrap_width_px: 0,
            line: Vec::new(),
        }
    }

    /// Replace the glyph cache with an empty one of the given byte budget.
    pub fn with_glyph_cache_bytes(mut self, bytes: u64) -> Self {
        self.cache = GlyphCache::new(bytes);
        self
    }

    pub fn set_font_size_px(&mut self, px: u32) {
        self.font_size_px = px.max(MIN_FONT_SIZE_PX);
    }

    pub fn font_size_px(&self) -> u32 {
        self.font_size_px
    }

    pub fn set_colors(&mut self, fg: Rgb565, bg: Rgb565) {
        self.fg = fg;
        self.bg = bg;
    }

    pub fn colors(&self) -> (Rgb565, Rgb565) {
        (self.fg, self.bg)
    }

    pub fn set_line_gap_px(&mut self, px: i32) {
        self.line_gap_px = px.max(0);
    }

    pub fn line_gap_px(&self) -> i32 {
        self.line_gap_px
    }

    /// Zero disables wrapping.
    pub fn set_wrap_width_px(&mut self, px: i32) {
        self.wrap_width_px = px.max(0);
    }

    pub fn wrap_width_px(&self) -> i32 {
        self.wrap_width_px
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_inner(self) -> (D, R) {
        (self.display, self.rasterizer)
    }

    /// Draw `utf8` with its first baseline at `(x, y)`.
    ///
    /// Decoding stops at the first malformed sequence; whatever was drawn
    /// before it stays on the panel.
    pub fn draw_text(&mut self, x: i32, y: i32, utf8: impl AsRef<[u8]>) -> Result<TextMetrics, TextError> {
        let bytes = utf8.as_ref();
        let metrics = self.rasterizer.line_metrics(self.font_size_px);
        let mut line_h = metrics.line_height;
        if line_h <= 0 {
            line_h = metrics.ascent + metrics.descent + self.line_gap_px;
        }

        let mut cursor = LineCursor::new(x, y, line_h, self.line_gap_px);
        let mut i = 0;
        while i < bytes.len() {
            let cp = match decode_utf8(bytes, &mut i) {
                Ok(cp) => cp,
                Err(e) => {
                    trace!("text run stopped at byte {}: {}", i, e);
                    break;
                }
            };
            if cp == '\n' as u32 {
                cursor.newline();
                continue;
            }

            let glyph = self.glyph(cp);
            cursor.wrap_for(glyph.advance, self.wrap_width_px);
            blit_glyph(&mut self.display, &mut self.line, &glyph, cursor.pen_x, cursor.pen_y, self.fg, self.bg)?;
            cursor.advance(glyph.advance);
        }
        Ok(cursor.finish(metrics.ascent))
    }

    /// Approximate extent of `utf8` without drawing.
    ///
    /// Every character is assumed to advance `0.6 * font size`; real glyph
    /// widths are not consulted.
    pub fn measure_text(&self, utf8: impl AsRef<[u8]>) -> TextMetrics {
        let bytes = utf8.as_ref();
        let metrics = self.rasterizer.line_metrics(self.font_size_px);
        let mut line_h = metrics.line_height;
        if line_h <= 0 {
            line_h = self.font_size_px as i32 + self.line_gap_px;
        }
        let advance = (self.font_size_px as f32 * 0.6) as i32;

        let mut cursor = LineCursor::new(0, 0, line_h, self.line_gap_px);
        let mut i = 0;
        while let Ok(cp) = decode_utf8(bytes, &mut i) {
            if cp == '\n' as u32 {
                cursor.newline();
                continue;
            }
            cursor.wrap_for(advance, self.wrap_width_px);
            cursor.advance(advance);
        }
        cursor.finish(metrics.ascent)
    }

    /// Draw `utf8` inside a panel rectangle, centred or with a small left
    /// margin.
    pub fn draw_label(
        &mut self,
        panel_x: i32,
        panel_y: i32,
        panel_w: i32,
        panel_h: i32,
        utf8: impl AsRef<[u8]>,
        center: bool,
    ) -> Result<TextMetrics, TextError> {
        let utf8 = utf8.as_ref();
        if center {
            let m = self.measure_text(utf8);
            let x = panel_x + ((panel_w - m.width) / 2).max(0);
            let y = panel_y + ((panel_h + m.baseline) / 2).max(0);
            self.draw_text(x, y, utf8)
        } else {
            let x = panel_x + LABEL_MARGIN_PX;
            let y = panel_y + self.font_size_px as i32 + LABEL_MARGIN_PX;
            self.draw_text(x, y, utf8)
        }
    }

    /// Cached glyph for `cp` at the current size, rasterizing on a miss.
    ///
    /// Codepoints the font cannot render fall back to `'?'`, then to a
    /// blank half-em advance.
    fn glyph(&mut self, cp: u32) -> Arc<Glyph> {
        let key = GlyphKey::new(self.font_size_px as u64, cp);
        if let Some(glyph) = self.cache.get(&key) {
            return glyph;
        }

        let size = self.font_size_px;
        let glyph = match self.rasterizer.rasterize(cp, size) {
            Ok(g) => g,
            Err(e) => {
                debug!("U+{:04X} @ {}px: {}", cp, size, e);
                self.rasterizer
                    .rasterize(REPLACEMENT as u32, size)
                    .unwrap_or_else(|_| Glyph::blank(size as i32 / 2))
            }
        };
        let glyph = Arc::new(glyph);
        self.cache.insert(key, Arc::clone(&glyph));
        glyph
    }
}

/// Composite one glyph over the background colour and send it row by row.
fn blit_glyph<D: DisplayDriver>(
    display: &mut D,
    line: &mut Vec<Rgb565>,
    glyph: &Glyph,
    pen_x: i32,
    pen_y: i32,
    fg: Rgb565,
    bg: Rgb565,
) -> Result<(), DisplayError> {
    if glyph.is_blank() {
        return Ok(());
    }
    let x0 = pen_x + glyph.left;
    let y0 = pen_y - glyph.top;
    for row in 0..glyph.height {
        line.clear();
        line.extend(glyph.row(row).iter().map(|&a| blend(bg, fg, a)));
        display.draw_scanline(x0, y0 + row as i32, line)?;
    }
    Ok(())
}
