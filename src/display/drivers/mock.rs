/*
 *  display/drivers/mock.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock panel, bus and pins for testing
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
use std::sync::{Arc, Mutex};

use display_interface::{DataFormat, WriteOnlyDataCommand};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType, OutputPin};

use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

/// One transfer seen by [`MockInterface`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Command(Vec<u8>),
    Data(Vec<u8>),
}

impl BusOp {
    /// Concatenate the payload of every data transfer in `ops`.
    pub fn data_bytes(ops: &[BusOp]) -> Vec<u8> {
        ops.iter()
            .filter_map(|op| match op {
                BusOp::Data(d) => Some(d.as_slice()),
                BusOp::Command(_) => None,
            })
            .flatten()
            .copied()
            .collect()
    }
}

#[derive(Debug, Default)]
struct InterfaceState {
    ops: Vec<BusOp>,
    /// Remaining transfers before every write fails
    fail_after: Option<usize>,
}

/// Recording command/data interface. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MockInterface {
    state: Arc<Mutex<InterfaceState>>,
}

impl MockInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything recorded so far.
    pub fn take_ops(&self) -> Vec<BusOp> {
        std::mem::take(&mut self.state.lock().unwrap().ops)
    }

    /// Let `n` more transfers through, then fail all of them.
    pub fn fail_after(&self, n: usize) {
        self.state.lock().unwrap().fail_after = Some(n);
    }

    fn record(&mut self, make: fn(Vec<u8>) -> BusOp, fmt: DataFormat<'_>) -> Result<(), display_interface::DisplayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(n) = state.fail_after.as_mut() {
            if *n == 0 {
                return Err(display_interface::DisplayError::BusWriteError);
            }
            *n -= 1;
        }
        let bytes = match fmt {
            DataFormat::U8(b) => b.to_vec(),
            DataFormat::U16BE(words) => words.iter().flat_map(|w| w.to_be_bytes()).collect(),
            _ => return Err(display_interface::DisplayError::DataFormatNotImplemented),
        };
        state.ops.push(make(bytes));
        Ok(())
    }
}

impl WriteOnlyDataCommand for MockInterface {
    fn send_commands(&mut self, cmd: DataFormat<'_>) -> Result<(), display_interface::DisplayError> {
        self.record(BusOp::Command, cmd)
    }

    fn send_data(&mut self, buf: DataFormat<'_>) -> Result<(), display_interface::DisplayError> {
        self.record(BusOp::Data, buf)
    }
}

#[derive(Debug, Default)]
struct PinState {
    levels: Vec<bool>,
    failing: bool,
}

/// Output pin that records every level it is driven to.
#[derive(Debug, Clone, Default)]
pub struct MockPin {
    state: Arc<Mutex<PinState>>,
}

#[derive(Debug)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl MockPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<bool> {
        self.state.lock().unwrap().levels.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    fn drive(&mut self, high: bool) -> Result<(), PinFault> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(PinFault);
        }
        state.levels.push(high);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = PinFault;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

/// Delay that returns immediately and keeps a running total.
#[derive(Debug, Clone, Default)]
pub struct NoopDelay {
    total_ns: Arc<Mutex<u64>>,
}

impl NoopDelay {
    pub fn total_ms(&self) -> u64 {
        *self.total_ns.lock().unwrap() / 1_000_000
    }
}

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.lock().unwrap() += ns as u64;
    }
}

/// Internal state for the mock panel (shared for inspection in tests)
#[derive(Debug)]
pub struct MockDriverState {
    pub pixels: Vec<Rgb565>,
    pub clear_count: usize,
    pub scanline_count: usize,
    pub blit_count: usize,
    /// Result handed back by `load_background_image`
    pub background_available: bool,
    pub simulate_failure: bool,
}

/// In-memory panel that applies every draw call to a pixel buffer.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockDriverState>>,
}

impl MockDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                bytes_per_pixel: 2,
                max_transfer: 4096,
            },
            state: Arc::new(Mutex::new(MockDriverState {
                pixels: vec![Rgb565::new(0, 0, 0); (width * height) as usize],
                clear_count: 0,
                scanline_count: 0,
                blit_count: 0,
                background_available: false,
                simulate_failure: false,
            })),
        }
    }

    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb565> {
        if x >= self.capabilities.width || y >= self.capabilities.height {
            return None;
        }
        let state = self.state.lock().unwrap();
        Some(state.pixels[(y * self.capabilities.width + x) as usize])
    }

    pub fn scanline_count(&self) -> usize {
        self.state.lock().unwrap().scanline_count
    }

    fn check(&self) -> Result<(), DisplayError> {
        if self.state.lock().unwrap().simulate_failure {
            return Err(DisplayError::InterfaceError(display_interface::DisplayError::BusWriteError));
        }
        Ok(())
    }

    fn put(&self, x: i32, y: i32, color: Rgb565) {
        let (w, h) = (self.capabilities.width as i32, self.capabilities.height as i32);
        if x >= 0 && x < w && y >= 0 && y < h {
            self.state.lock().unwrap().pixels[(y * w + x) as usize] = color;
        }
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn clear(&mut self, color: Rgb565) -> Result<(), DisplayError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.pixels.fill(color);
        state.clear_count += 1;
        Ok(())
    }

    fn fill_rect(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb565) -> Result<(), DisplayError> {
        self.check()?;
        for y in y0.min(y1)..=y0.max(y1) {
            for x in x0.min(x1)..=x0.max(x1) {
                self.put(x, y, color);
            }
        }
        Ok(())
    }

    fn draw_scanline(&mut self, x: i32, y: i32, pixels: &[Rgb565]) -> Result<(), DisplayError> {
        self.check()?;
        for (i, &c) in pixels.iter().enumerate() {
            self.put(x + i as i32, y, c);
        }
        self.state.lock().unwrap().scanline_count += 1;
        Ok(())
    }

    fn blit(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        self.check()?;
        let expected = self.capabilities.frame_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: buffer.len() });
        }
        let mut state = self.state.lock().unwrap();
        for (px, bytes) in state.pixels.iter_mut().zip(buffer.chunks_exact(2)) {
            *px = crate::display::color::from_raw(u16::from_be_bytes([bytes[0], bytes[1]]));
        }
        state.blit_count += 1;
        Ok(())
    }

    fn load_background_image(&mut self, _path: &Path) -> Result<bool, DisplayError> {
        self.check()?;
        Ok(self.state.lock().unwrap().background_available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::color::{from_raw, to_raw};

    #[test]
    fn test_mock_scanline_clips() {
        let mut d = MockDriver::new(4, 2);
        d.draw_scanline(-1, 1, &[from_raw(1), from_raw(2), from_raw(3)]).unwrap();
        assert_eq!(d.pixel(0, 1).map(to_raw), Some(2));
        assert_eq!(d.pixel(1, 1).map(to_raw), Some(3));
        assert_eq!(d.scanline_count(), 1);
    }

    #[test]
    fn test_mock_simulated_failure() {
        let mut d = MockDriver::new(4, 2);
        d.state().lock().unwrap().simulate_failure = true;
        assert!(d.clear(Rgb565::new(0, 0, 0)).unwrap_err().is_bus_error());
    }

    #[test]
    fn test_mock_pin_and_delay() {
        let mut pin = MockPin::new();
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert_eq!(pin.levels(), vec![true, false]);

        let mut delay = NoopDelay::default();
        delay.delay_ms(15);
        assert_eq!(delay.total_ms(), 15);
    }
}
