/*
 *  text/mod.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Text rendering - UTF-8 decode, glyph cache and compositing
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

pub mod font;
pub mod glyph;
pub mod renderer;
pub mod utf8;

pub use font::FontdueRasterizer;
pub use glyph::{CacheStats, Glyph, GlyphCache, GlyphError, GlyphKey, GlyphRasterizer, LineMetrics};
pub use renderer::{TextError, TextMetrics, TextRenderer};
pub use utf8::{decode_utf8, DecodeError};
