/*
 *  display/traits.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for panel driver abstraction
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

use embedded_graphics::pixelcolor::Rgb565;

use crate::display::error::DisplayError;

/// Panel geometry and pixel format
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Bytes per pixel on the wire (2 for RGB565)
    pub bytes_per_pixel: u32,

    /// Largest single bus transaction the transport accepts
    pub max_transfer: usize,
}

impl DisplayCapabilities {
    /// Byte length of one full frame
    pub fn frame_len(&self) -> usize {
        (self.width * self.height * self.bytes_per_pixel) as usize
    }
}

/// Drawing operations every panel driver supports.
///
/// All coordinates are clipped against the panel; out-of-range requests
/// degrade to partial or empty transfers instead of failing.
pub trait DisplayDriver {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Fill the whole panel with one color
    fn clear(&mut self, color: Rgb565) -> Result<(), DisplayError>;

    /// Fill the inclusive rectangle `(x0,y0)..=(x1,y1)`; corners may be in
    /// any order
    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb565) -> Result<(), DisplayError>;

    /// Write one horizontal run of pixels starting at `(x, y)`
    fn draw_scanline(&mut self, x: i32, y: i32, pixels: &[Rgb565]) -> Result<(), DisplayError>;

    /// Stream a full frame of big-endian RGB565 bytes
    fn blit(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// Aspect-fill the panel with a still image.
    ///
    /// Returns `Ok(false)` when the file is missing or cannot be decoded;
    /// falling back to a plain fill is the caller's decision.
    fn load_background_image(&mut self, path: &Path) -> Result<bool, DisplayError>;
}

impl<D: DisplayDriver + ?Sized> DisplayDriver for &mut D {
    fn capabilities(&self) -> &DisplayCapabilities {
        (**self).capabilities()
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        (**self).clear(color)
    }

    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb565) -> Result<(), DisplayError> {
        (**self).fill_rect(x0, y0, x1, y1, color)
    }

    fn draw_scanline(&mut self, x: i32, y: i32, pixels: &[Rgb565]) -> Result<(), DisplayError> {
        (**self).draw_scanline(x, y, pixels)
    }

    fn blit(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        (**self).blit(buffer)
    }

    fn load_background_image(&mut self, path: &Path) -> Result<bool, DisplayError> {
        (**self).load_background_image(path)
    }
}
