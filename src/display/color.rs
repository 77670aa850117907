/*
 *  display/color.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  RGB565 packing, conversion and alpha compositing
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

use embedded_graphics::pixelcolor::raw::RawU16;
use embedded_graphics::pixelcolor::{Rgb565, RgbColor};
use embedded_graphics::prelude::IntoStorage;

const ALPHA_MAX: u16 = 255;

/// Common color presets
pub const BLACK: Rgb565 = Rgb565::BLACK;
pub const WHITE: Rgb565 = Rgb565::WHITE;
/// Mid gray, 0x7BEF on the wire
pub const GRAY: Rgb565 = Rgb565::new(0x0F, 0x1F, 0x0F);

/// Interpret a packed 16-bit value as RGB565 (red in the high bits).
pub fn from_raw(value: u16) -> Rgb565 {
    Rgb565::from(RawU16::new(value))
}

pub fn to_raw(color: Rgb565) -> u16 {
    color.into_storage()
}

/// Wire order for the panel: high byte first.
#[inline]
pub fn to_be_bytes(color: Rgb565) -> [u8; 2] {
    color.into_storage().to_be_bytes()
}

/// Truncating 8-8-8 to 5-6-5 conversion, matching what the panel shows
/// for a 24-bit source pixel.
#[inline]
pub fn rgb565_from_rgb888(r: u8, g: u8, b: u8) -> Rgb565 {
    Rgb565::new(r >> 3, g >> 2, b >> 3)
}

/// Composite `foreground` over `background` with 8-bit coverage `alpha`.
///
/// Each channel is blended in its native width:
/// `(fg * alpha + bg * (255 - alpha)) / 255`.
#[inline]
pub fn blend(background: Rgb565, foreground: Rgb565, alpha: u8) -> Rgb565 {
    let a = alpha as u16;
    let inv = ALPHA_MAX - a;
    let mix = |fg: u8, bg: u8| ((fg as u16 * a + bg as u16 * inv) / ALPHA_MAX) as u8;

    Rgb565::new(
        mix(foreground.r(), background.r()),
        mix(foreground.g(), background.g()),
        mix(foreground.b(), background.b()),
    )
}
