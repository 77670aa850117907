/*
 *  display/drivers/st7796.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  ST7796 320x480 RGB565 TFT driver over SPI with a D/C line
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

use display_interface::{DataFormat, WriteOnlyDataCommand};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::display::color::{rgb565_from_rgb888, to_be_bytes};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

pub const WIDTH: u32 = 320;
pub const HEIGHT: u32 = 480;

/// Default largest single write handed to spidev (its default bufsiz)
pub const CHUNK_SIZE: usize = 4096;

/// ST7796 command opcodes
pub struct Cmd;
impl Cmd {
    pub const SLPOUT: u8 = 0x11;
    pub const INVON: u8 = 0x21;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
    pub const DIC: u8 = 0xB4;
    pub const EM: u8 = 0xB7;
    pub const PWR1: u8 = 0xC0;
    pub const PWR2: u8 = 0xC1;
    pub const PWR3: u8 = 0xC2;
    pub const VCMPCTL: u8 = 0xC5;
    pub const PGC: u8 = 0xE0;
    pub const NGC: u8 = 0xE1;
    pub const DOCA: u8 = 0xE8;
    pub const CSCON: u8 = 0xF0;
}

/// Steps of a panel init sequence.
#[derive(Clone, Copy, Debug)]
pub enum InitStep {
    /// Send a bare command byte
    Cmd(u8),
    /// Send a command with a static data slice
    CmdData(u8, &'static [u8]),
    /// Wait before the next step
    DelayMs(u32),
}

/// Vendor power-on sequence for the 3.5" ST7796 module
pub const INIT_SEQUENCE: &[InitStep] = &[
    InitStep::Cmd(Cmd::SLPOUT),
    InitStep::DelayMs(120),
    // portrait, BGR order
    InitStep::CmdData(Cmd::MADCTL, &[0x48]),
    // 16 bits per pixel
    InitStep::CmdData(Cmd::COLMOD, &[0x55]),
    // unlock extended command set
    InitStep::CmdData(Cmd::CSCON, &[0xC3]),
    InitStep::CmdData(Cmd::CSCON, &[0x96]),
    InitStep::CmdData(Cmd::DIC, &[0x01]),
    InitStep::CmdData(Cmd::EM, &[0xC6]),
    InitStep::CmdData(Cmd::PWR1, &[0x80, 0x45]),
    InitStep::CmdData(Cmd::PWR2, &[0x13]),
    InitStep::CmdData(Cmd::PWR3, &[0xA7]),
    InitStep::CmdData(Cmd::VCMPCTL, &[0x0A]),
    InitStep::CmdData(Cmd::DOCA, &[0x40, 0x8A, 0x00, 0x00, 0x29, 0x19, 0xA5, 0x33]),
    InitStep::CmdData(
        Cmd::PGC,
        &[0xD0, 0x08, 0x0F, 0x06, 0x06, 0x33, 0x30, 0x33, 0x47, 0x17, 0x13, 0x13, 0x2B, 0x31],
    ),
    InitStep::CmdData(
        Cmd::NGC,
        &[0xD0, 0x0A, 0x11, 0x0B, 0x09, 0x07, 0x2F, 0x33, 0x47, 0x38, 0x15, 0x16, 0x2C, 0x32],
    ),
    // lock extended command set again
    InitStep::CmdData(Cmd::CSCON, &[0x3C]),
    InitStep::CmdData(Cmd::CSCON, &[0x69]),
    InitStep::Cmd(Cmd::INVON),
    InitStep::Cmd(Cmd::SLPOUT),
    InitStep::DelayMs(100),
    InitStep::Cmd(Cmd::DISPON),
];

/// ST7796 panel driver.
///
/// Owns the command/data interface plus the reset and backlight lines.
/// Construction runs the full reset and init sequence, so a value of this
/// type always refers to a panel that is awake and lit.
pub struct St7796<DI, RST, BL> {
    interface: DI,
    rst: RST,
    bl: BL,
    capabilities: DisplayCapabilities,
}

impl<DI, RST, BL> St7796<DI, RST, BL>
where
    DI: WriteOnlyDataCommand,
    RST: OutputPin,
    BL: OutputPin,
{
    /// Reset, initialize and light the panel.
    ///
    /// Any bus or GPIO failure aborts construction.
    pub fn new(interface: DI, rst: RST, bl: BL, delay: &mut impl DelayNs) -> Result<Self, DisplayError> {
        info!("Initializing ST7796 {}x{}", WIDTH, HEIGHT);

        let mut panel = Self {
            interface,
            rst,
            bl,
            capabilities: DisplayCapabilities {
                width: WIDTH,
                height: HEIGHT,
                bytes_per_pixel: 2,
                max_transfer: CHUNK_SIZE,
            },
        };

        panel.hard_reset(delay)
            .map_err(|e| DisplayError::InitializationFailed(format!("reset: {}", e)))?;
        panel.run_init_sequence(INIT_SEQUENCE, delay)
            .map_err(|e| DisplayError::InitializationFailed(format!("init sequence: {}", e)))?;
        panel.set_backlight(true)
            .map_err(|e| DisplayError::InitializationFailed(format!("backlight: {}", e)))?;

        info!("ST7796 ready");
        Ok(panel)
    }

    /// Give the bus handles back, e.g. to re-run construction.
    pub fn release(self) -> (DI, RST, BL) {
        (self.interface, self.rst, self.bl)
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        let res = if on { self.bl.set_high() } else { self.bl.set_low() };
        res.map_err(|e| DisplayError::GpioError(format!("backlight: {:?}", e)))
    }

    fn hard_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        debug!("ST7796 hard reset");
        for high in [true, false, true] {
            let res = if high { self.rst.set_high() } else { self.rst.set_low() };
            res.map_err(|e| DisplayError::GpioError(format!("reset: {:?}", e)))?;
            delay.delay_ms(10);
        }
        Ok(())
    }

    fn run_init_sequence(&mut self, steps: &[InitStep], delay: &mut impl DelayNs) -> Result<(), DisplayError> {
        for step in steps {
            match *step {
                InitStep::Cmd(c) => self.command(c, &[])?,
                InitStep::CmdData(c, data) => self.command(c, data)?,
                InitStep::DelayMs(ms) => delay.delay_ms(ms),
            }
        }
        Ok(())
    }

    fn command(&mut self, cmd: u8, params: &[u8]) -> Result<(), DisplayError> {
        self.interface.send_commands(DataFormat::U8(&[cmd]))?;
        if !params.is_empty() {
            self.interface.send_data(DataFormat::U8(params))?;
        }
        Ok(())
    }

    /// Select the inclusive window that receives the next pixel burst.
    fn set_address_window(&mut self, xs: u16, ys: u16, xe: u16, ye: u16) -> Result<(), DisplayError> {
        let [xs_hi, xs_lo] = xs.to_be_bytes();
        let [xe_hi, xe_lo] = xe.to_be_bytes();
        let [ys_hi, ys_lo] = ys.to_be_bytes();
        let [ye_hi, ye_lo] = ye.to_be_bytes();

        self.command(Cmd::CASET, &[xs_hi, xs_lo, xe_hi, xe_lo])?;
        self.command(Cmd::RASET, &[ys_hi, ys_lo, ye_hi, ye_lo])?;
        self.command(Cmd::RAMWR, &[])
    }

    /// Cap each pixel burst at `bytes`, e.g. for a spidev built with a
    /// larger `bufsiz`. Must hold at least one pixel.
    pub fn set_max_transfer(&mut self, bytes: usize) -> Result<(), DisplayError> {
        let min = self.capabilities.bytes_per_pixel as usize;
        if bytes < min {
            return Err(DisplayError::InvalidConfiguration(format!(
                "max transfer {} bytes is below one pixel ({} bytes)",
                bytes, min
            )));
        }
        self.capabilities.max_transfer = bytes;
        Ok(())
    }

    fn send_chunked(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        for chunk in data.chunks(self.capabilities.max_transfer) {
            self.interface.send_data(DataFormat::U8(chunk))?;
        }
        Ok(())
    }

    pub fn clear(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.set_address_window(0, 0, (WIDTH - 1) as u16, (HEIGHT - 1) as u16)?;
        let line = solid_row(WIDTH as usize, color);
        for _ in 0..HEIGHT {
            self.send_chunked(&line)?;
        }
        Ok(())
    }

    pub fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb565) -> Result<(), DisplayError> {
        let Some((xs, ys, xe, ye)) = clip_rect(x0, y0, x1, y1) else {
            return Ok(());
        };

        self.set_address_window(xs, ys, xe, ye)?;
        let line = solid_row((xe - xs + 1) as usize, color);
        for _ in ys..=ye {
            self.send_chunked(&line)?;
        }
        Ok(())
    }

    pub fn draw_scanline(&mut self, x: i32, y: i32, pixels: &[Rgb565]) -> Result<(), DisplayError> {
        if pixels.is_empty() || y < 0 || y >= HEIGHT as i32 {
            return Ok(());
        }

        // visible part of [x, x + len) on this row
        let start = x.max(0) as i64;
        let end = (x as i64 + pixels.len() as i64).min(WIDTH as i64);
        if start >= end {
            return Ok(());
        }
        let skip = (start - x as i64) as usize;
        let visible = &pixels[skip..skip + (end - start) as usize];

        self.set_address_window(start as u16, y as u16, (end - 1) as u16, y as u16)?;
        let bytes: Vec<u8> = visible.iter().flat_map(|&c| to_be_bytes(c)).collect();
        self.send_chunked(&bytes)
    }

    pub fn blit(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.capabilities.frame_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        self.set_address_window(0, 0, (WIDTH - 1) as u16, (HEIGHT - 1) as u16)?;
        self.send_chunked(buffer)
    }

    pub fn load_background_image(&mut self, path: &Path) -> Result<bool, DisplayError> {
        let img = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("Failed to load background {}: {}", path.display(), e);
                return Ok(false);
            }
        };
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            warn!("Background {} has no pixels", path.display());
            return Ok(false);
        }
        debug!("Background {} is {}x{}", path.display(), w, h);

        let sampler = AspectFill::new(w, h);
        let mut line = vec![Rgb565::BLACK; WIDTH as usize];
        for y in 0..HEIGHT {
            let sy = sampler.source_y(y);
            for (x, px) in line.iter_mut().enumerate() {
                let [r, g, b] = img.get_pixel(sampler.source_x(x as u32), sy).0;
                *px = rgb565_from_rgb888(r, g, b);
            }
            self.draw_scanline(0, y as i32, &line)?;
        }
        Ok(true)
    }
}

/// Nearest-neighbour mapping from panel pixels to a centred, aspect-filled
/// source image.
struct AspectFill {
    scale: f64,
    x0: f64,
    y0: f64,
    src_w: u32,
    src_h: u32,
}

impl AspectFill {
    fn new(src_w: u32, src_h: u32) -> Self {
        let (pw, ph) = (WIDTH as f64, HEIGHT as f64);
        let scale = (pw / src_w as f64).max(ph / src_h as f64);
        Self {
            scale,
            x0: (src_w as f64 - pw / scale) * 0.5,
            y0: (src_h as f64 - ph / scale) * 0.5,
            src_w,
            src_h,
        }
    }

    fn source_x(&self, x: u32) -> u32 {
        sample(self.x0, x, self.scale, self.src_w)
    }

    fn source_y(&self, y: u32) -> u32 {
        sample(self.y0, y, self.scale, self.src_h)
    }
}

fn sample(origin: f64, dst: u32, scale: f64, len: u32) -> u32 {
    let f = origin + (dst as f64 + 0.5) / scale;
    (f.floor() as i64).clamp(0, len as i64 - 1) as u32
}

fn solid_row(width: usize, color: Rgb565) -> Vec<u8> {
    let px = to_be_bytes(color);
    px.iter().copied().cycle().take(width * 2).collect()
}

/// Normalize and clip an inclusive rectangle to the panel.
/// `None` when nothing of it is on screen.
fn clip_rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Option<(u16, u16, u16, u16)> {
    let (xa, xb) = (x0.min(x1), x0.max(x1));
    let (ya, yb) = (y0.min(y1), y0.max(y1));

    let xs = xa.max(0);
    let ys = ya.max(0);
    let xe = xb.min(WIDTH as i32 - 1);
    let ye = yb.min(HEIGHT as i32 - 1);
    if xs > xe || ys > ye {
        return None;
    }
    Some((xs as u16, ys as u16, xe as u16, ye as u16))
}

impl<DI, RST, BL> DisplayDriver for St7796<DI, RST, BL>
where
    DI: WriteOnlyDataCommand,
    RST: OutputPin,
    BL: OutputPin,
{
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        St7796::clear(self, color)
    }

    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb565) -> Result<(), DisplayError> {
        St7796::fill_rect(self, x0, y0, x1, y1, color)
    }

    fn draw_scanline(&mut self, x: i32, y: i32, pixels: &[Rgb565]) -> Result<(), DisplayError> {
        St7796::draw_scanline(self, x, y, pixels)
    }

    fn blit(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        St7796::blit(self, buffer)
    }

    fn load_background_image(&mut self, path: &Path) -> Result<bool, DisplayError> {
        St7796::load_background_image(self, path)
    }
}

// Provide direct DrawTarget access on the driver itself
impl<DI, RST, BL> DrawTarget for St7796<DI, RST, BL>
where
    DI: WriteOnlyDataCommand,
    RST: OutputPin,
    BL: OutputPin,
{
    type Color = Rgb565;
    type Error = DisplayError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            St7796::draw_scanline(self, point.x, point.y, &[color])?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };
        St7796::fill_rect(self, area.top_left.x, area.top_left.y, bottom_right.x, bottom_right.y, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        St7796::clear(self, color)
    }
}

impl<DI, RST, BL> OriginDimensions for St7796<DI, RST, BL> {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}
