/*
 *  text/font.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  TrueType/OpenType rasterizer backed by fontdue
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

use std::path::Path;

use fontdue::{Font, FontSettings};
use log::info;

use crate::text::glyph::{Glyph, GlyphError, GlyphRasterizer, LineMetrics};
use crate::text::TextError;

/// Rasterizes glyphs from a single font face.
pub struct FontdueRasterizer {
    font: Font,
}

impl FontdueRasterizer {
    pub fn from_file(path: &Path) -> Result<Self, TextError> {
        let bytes = std::fs::read(path).map_err(|e| TextError::FontLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let rasterizer = Self::from_bytes(bytes).map_err(|reason| TextError::FontLoad {
            path: path.to_path_buf(),
            reason,
        })?;
        info!("Loaded font {} ({} glyphs)", path.display(), rasterizer.font.glyph_count());
        Ok(rasterizer)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, String> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| e.to_string())?;
        Ok(Self { font })
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn rasterize(&mut self, codepoint: u32, size_px: u32) -> Result<Glyph, GlyphError> {
        let ch = char::from_u32(codepoint).ok_or(GlyphError::InvalidCodepoint(codepoint))?;
        // index 0 is .notdef
        if self.font.lookup_glyph_index(ch) == 0 {
            return Err(GlyphError::Missing(codepoint));
        }

        let (metrics, alpha) = self.font.rasterize(ch, size_px as f32);
        Ok(Glyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            pitch: metrics.width,
            left: metrics.xmin,
            top: metrics.ymin + metrics.height as i32,
            advance: metrics.advance_width.round() as i32,
            alpha,
        })
    }

    fn line_metrics(&self, size_px: u32) -> LineMetrics {
        match self.font.horizontal_line_metrics(size_px as f32) {
            Some(m) => LineMetrics {
                ascent: m.ascent.round() as i32,
                descent: (-m.descent).round() as i32,
                line_height: m.new_line_size.round() as i32,
            },
            None => LineMetrics::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_file() {
        let err = FontdueRasterizer::from_file(Path::new("/nonexistent/font.ttf")).err();
        assert!(matches!(err, Some(TextError::FontLoad { .. })));
    }

    #[test]
    fn test_garbage_font_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let err = FontdueRasterizer::from_file(&path).err();
        assert!(matches!(err, Some(TextError::FontLoad { .. })));
    }
}
