/*
 *  touch/gt911.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Goodix GT911 capacitive touch controller register protocol
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

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, info, trace, warn};

use crate::hal::{Edge, EdgeLine, RegisterBus};
use crate::touch::point::TouchPoint;
use crate::touch::TouchError;

/// GT911 register map (16-bit, big-endian addresses)
pub mod reg {
    pub const COMMAND: u16 = 0x8040;
    pub const CONFIG_VERSION: u16 = 0x8047;
    pub const X_MAX_LOW: u16 = 0x8048;
    pub const X_MAX_HIGH: u16 = 0x8049;
    pub const Y_MAX_LOW: u16 = 0x804A;
    pub const Y_MAX_HIGH: u16 = 0x804B;
    pub const TOUCH_NUMBER: u16 = 0x804C;
    pub const COORD_STATUS: u16 = 0x814E;
    pub const POINT1_X_LOW: u16 = 0x8150;
}

/// Address selected by holding INT high during reset
pub const ADDR_PRIMARY: u8 = 0x5D;
/// Address selected by holding INT low during reset
pub const ADDR_SECONDARY: u8 = 0x14;

/// Resolution registers keep 4 bits of the high byte
const MAX_RESOLUTION: u16 = 0x0FFF;

const CMD_RUN: u8 = 0x00;
const CMD_STOP: u8 = 0x02;

#[derive(Debug, Clone)]
pub struct Gt911Config {
    pub address: u8,
    /// Output resolution programmed into the controller
    pub x_max: u16,
    pub y_max: u16,
    /// Sleep between samples when not woken by an edge
    pub poll_interval: Duration,
    /// Longest single wait for an interrupt edge
    pub event_timeout: Duration,
}

impl Default for Gt911Config {
    fn default() -> Self {
        Gt911Config {
            address: ADDR_PRIMARY,
            x_max: 320,
            y_max: 480,
            poll_interval: Duration::from_millis(20),
            event_timeout: Duration::from_millis(200),
        }
    }
}

/// How the sampling loop learns about new contacts. Decided once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchMode {
    Interrupt(Edge),
    Polling,
}

/// A configured GT911.
///
/// Owns the register bus, reset line and interrupt line. Sampling is
/// synchronous; [`TouchDriver`] runs it on a worker thread.
///
/// [`TouchDriver`]: crate::touch::TouchDriver
pub struct Gt911<B, RST, INT> {
    bus: B,
    rst: RST,
    int: INT,
    config: Gt911Config,
    mode: TouchMode,
}

impl<B, RST, INT> Gt911<B, RST, INT>
where
    B: RegisterBus,
    RST: OutputPin,
    INT: EdgeLine,
{
    /// Reset the controller, program its resolution and start it.
    ///
    /// Register writes during setup are fatal. A refused edge request is
    /// not: the controller is then sampled on a fixed interval for good.
    pub fn new(bus: B, rst: RST, int: INT, config: Gt911Config, delay: &mut impl DelayNs) -> Result<Self, TouchError> {
        for (axis, max) in [("x", config.x_max), ("y", config.y_max)] {
            if !(1..=MAX_RESOLUTION).contains(&max) {
                return Err(TouchError::Config(format!(
                    "{} resolution {} outside 1..={}",
                    axis, max, MAX_RESOLUTION
                )));
            }
        }

        let mut gt = Gt911 {
            bus,
            rst,
            int,
            config,
            mode: TouchMode::Polling,
        };

        gt.reset(delay)?;
        gt.write(reg::COMMAND, &[CMD_STOP])?;
        delay.delay_ms(10);
        gt.configure_resolution()?;
        gt.write(reg::COMMAND, &[CMD_RUN])?;
        delay.delay_ms(50);

        gt.mode = gt.request_interrupt();
        info!(
            "GT911 at {:#04x}: {}x{}, {:?}",
            gt.config.address, gt.config.x_max, gt.config.y_max, gt.mode
        );
        Ok(gt)
    }

    pub fn mode(&self) -> TouchMode {
        self.mode
    }

    pub fn config(&self) -> &Gt911Config {
        &self.config
    }

    pub fn release(self) -> (B, RST, INT) {
        (self.bus, self.rst, self.int)
    }

    /// INT level during reset latches the I2C address.
    fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), TouchError> {
        let int_high = self.config.address == ADDR_PRIMARY;
        if let Err(e) = self.int.set_level(int_high) {
            debug!("INT not drivable during reset: {:?}", e);
        }

        self.rst.set_low().map_err(|e| TouchError::Gpio(format!("reset low: {:?}", e)))?;
        delay.delay_ms(10);
        self.rst.set_high().map_err(|e| TouchError::Gpio(format!("reset high: {:?}", e)))?;
        delay.delay_ms(50);
        Ok(())
    }

    fn configure_resolution(&mut self) -> Result<(), TouchError> {
        let [x_lo, x_hi] = self.config.x_max.to_le_bytes();
        let [y_lo, y_hi] = self.config.y_max.to_le_bytes();
        self.write(reg::X_MAX_LOW, &[x_lo])?;
        self.write(reg::X_MAX_HIGH, &[x_hi & 0x0F])?;
        self.write(reg::Y_MAX_LOW, &[y_lo])?;
        self.write(reg::Y_MAX_HIGH, &[y_hi & 0x0F])
    }

    fn request_interrupt(&mut self) -> TouchMode {
        for edge in [Edge::Falling, Edge::Rising] {
            match self.int.request_edge_event(edge) {
                Ok(()) => return TouchMode::Interrupt(edge),
                Err(e) => debug!("{:?} edge request refused: {:?}", edge, e),
            }
        }
        warn!("GT911 interrupt unavailable, polling every {:?}", self.config.poll_interval);
        TouchMode::Polling
    }

    fn write(&mut self, reg: u16, data: &[u8]) -> Result<(), TouchError> {
        self.bus
            .write_reg16(reg, data)
            .map_err(|e| TouchError::Bus(format!("write {:#06x}: {:?}", reg, e)))
    }

    fn read(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), TouchError> {
        self.bus
            .read_reg16(reg, buf)
            .map_err(|e| TouchError::Bus(format!("read {:#06x}: {:?}", reg, e)))
    }

    pub fn config_version(&mut self) -> Result<u8, TouchError> {
        let mut buf = [0u8; 1];
        self.read(reg::CONFIG_VERSION, &mut buf)?;
        Ok(buf[0])
    }

    /// Number of touch points the controller is configured to report.
    pub fn max_touch_points(&mut self) -> Result<u8, TouchError> {
        let mut buf = [0u8; 1];
        self.read(reg::TOUCH_NUMBER, &mut buf)?;
        Ok(buf[0] & 0x0F)
    }

    /// Block for at most the configured event timeout.
    pub fn wait_for_event(&mut self) -> Result<bool, INT::Error> {
        self.int.wait_for_event(self.config.event_timeout)
    }

    /// One status read: the first contact in panel orientation, or
    /// untouched when the controller reports no points.
    ///
    /// The status register stays set until [`acknowledge`](Self::acknowledge).
    pub fn read_point(&mut self) -> Result<TouchPoint, TouchError> {
        let mut status = [0u8; 1];
        self.read(reg::COORD_STATUS, &mut status)?;

        let points = status[0] & 0x0F;
        if points == 0 {
            return Ok(TouchPoint::untouched());
        }
        let mut raw = [0u8; 4];
        self.read(reg::POINT1_X_LOW, &mut raw)?;
        let x = u16::from_le_bytes([raw[0], raw[1]]) as i32;
        let y = u16::from_le_bytes([raw[2], raw[3]]) as i32;
        Ok(self.to_panel(x, y))
    }

    /// Clear the status register so the controller reports the next frame.
    pub fn acknowledge(&mut self) -> Result<(), TouchError> {
        self.write(reg::COORD_STATUS, &[0])
    }

    /// Mirror X to panel orientation and clamp both axes.
    fn to_panel(&self, x: i32, y: i32) -> TouchPoint {
        let x_max = self.config.x_max as i32;
        let y_max = self.config.y_max as i32;
        TouchPoint::new((x_max - 1 - x).clamp(0, x_max - 1), y.clamp(0, y_max - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::{MockPin, NoopDelay};
    use crate::touch::mock::{ScriptedBus, ScriptedLine};

    fn gt911(bus: &ScriptedBus, line: &ScriptedLine, address: u8) -> Gt911<ScriptedBus, MockPin, ScriptedLine> {
        let config = Gt911Config { address, ..Default::default() };
        Gt911::new(bus.clone(), MockPin::new(), line.clone(), config, &mut NoopDelay::default()).unwrap()
    }

    #[test]
    fn test_setup_writes() {
        let bus = ScriptedBus::new();
        let line = ScriptedLine::new();
        let rst = MockPin::new();
        let mut delay = NoopDelay::default();
        let gt = Gt911::new(bus.clone(), rst.clone(), line.clone(), Gt911Config::default(), &mut delay).unwrap();

        assert_eq!(
            bus.writes(),
            vec![
                (0x8040, vec![0x02]),
                (0x8048, vec![0x40]),
                (0x8049, vec![0x01]),
                (0x804A, vec![0xE0]),
                (0x804B, vec![0x01]),
                (0x8040, vec![0x00]),
            ]
        );
        assert_eq!(rst.levels(), vec![false, true]);
        assert_eq!(delay.total_ms(), 10 + 50 + 10 + 50);
        assert_eq!(gt.mode(), TouchMode::Interrupt(Edge::Falling));
    }

    #[test]
    fn test_address_selects_int_level() {
        let bus = ScriptedBus::new();
        let line = ScriptedLine::new();
        gt911(&bus, &line, ADDR_PRIMARY);
        assert_eq!(line.state().lock().unwrap().levels, vec![true]);

        let line = ScriptedLine::new();
        gt911(&bus, &line, ADDR_SECONDARY);
        assert_eq!(line.state().lock().unwrap().levels, vec![false]);
    }

    #[test]
    fn test_undrivable_int_is_ignored() {
        let line = ScriptedLine::new();
        line.state().lock().unwrap().refuse_output = true;
        let gt = gt911(&ScriptedBus::new(), &line, ADDR_PRIMARY);
        assert_eq!(gt.mode(), TouchMode::Interrupt(Edge::Falling));
    }

    #[test]
    fn test_rising_edge_fallback() {
        let line = ScriptedLine::new();
        line.state().lock().unwrap().refuse_falling = true;
        let gt = gt911(&ScriptedBus::new(), &line, ADDR_PRIMARY);
        assert_eq!(gt.mode(), TouchMode::Interrupt(Edge::Rising));
    }

    #[test]
    fn test_polling_fallback() {
        let line = ScriptedLine::new();
        {
            let state = line.state();
            let mut s = state.lock().unwrap();
            s.refuse_falling = true;
            s.refuse_rising = true;
        }
        let gt = gt911(&ScriptedBus::new(), &line, ADDR_PRIMARY);
        assert_eq!(gt.mode(), TouchMode::Polling);
    }

    #[test]
    fn test_setup_write_failure_is_fatal() {
        let bus = ScriptedBus::new();
        bus.set_fail_writes(true);
        let res = Gt911::new(bus, MockPin::new(), ScriptedLine::new(), Gt911Config::default(), &mut NoopDelay::default());
        assert!(matches!(res, Err(TouchError::Bus(_))));
    }

    #[test]
    fn test_reset_line_failure_is_fatal() {
        let rst = MockPin::new();
        rst.set_failing(true);
        let res = Gt911::new(ScriptedBus::new(), rst, ScriptedLine::new(), Gt911Config::default(), &mut NoopDelay::default());
        assert!(matches!(res, Err(TouchError::Gpio(_))));
    }

    #[test]
    fn test_read_point_mirrors_x() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.clear_writes();
        bus.queue(reg::COORD_STATUS, &[0x81]);
        bus.queue(reg::POINT1_X_LOW, &[0x64, 0x00, 0xC8, 0x00]);

        assert_eq!(gt.read_point().unwrap(), TouchPoint::new(219, 200));
        assert!(bus.writes().is_empty());
        gt.acknowledge().unwrap();
        assert_eq!(bus.writes(), vec![(0x814E, vec![0x00])]);
    }

    #[test]
    fn test_read_point_clamps() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.queue(reg::COORD_STATUS, &[0x01]);
        // x = 1000 mirrors below zero, y = 0x0300 exceeds 479
        bus.queue(reg::POINT1_X_LOW, &[0xE8, 0x03, 0x00, 0x03]);
        assert_eq!(gt.read_point().unwrap(), TouchPoint::new(0, 479));
    }

    #[test]
    fn test_zero_points_is_untouched() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.clear_writes();
        bus.queue(reg::COORD_STATUS, &[0x80]);
        assert_eq!(gt.read_point().unwrap(), TouchPoint::untouched());
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_failed_ack_is_reported() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.queue(reg::COORD_STATUS, &[0x01]);
        bus.queue(reg::POINT1_X_LOW, &[0x00, 0x00, 0x10, 0x00]);
        bus.set_fail_writes(true);
        assert_eq!(gt.read_point().unwrap(), TouchPoint::new(319, 16));
        assert!(matches!(gt.acknowledge(), Err(TouchError::Bus(_))));
    }

    #[test]
    fn test_zero_or_oversized_resolution_rejected() {
        for (x_max, y_max) in [(0, 480), (320, 0), (0x1000, 480)] {
            let bus = ScriptedBus::new();
            let config = Gt911Config { x_max, y_max, ..Default::default() };
            let res = Gt911::new(bus.clone(), MockPin::new(), ScriptedLine::new(), config, &mut NoopDelay::default());
            assert!(matches!(res, Err(TouchError::Config(_))));
            assert!(bus.writes().is_empty());
        }
    }

    #[test]
    fn test_read_failure_is_reported() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.set_fail_reads(true);
        assert!(matches!(gt.read_point(), Err(TouchError::Bus(_))));
        assert!(gt.config_version().is_err());
    }

    #[test]
    fn test_info_registers() {
        let bus = ScriptedBus::new();
        let mut gt = gt911(&bus, &ScriptedLine::new(), ADDR_PRIMARY);
        bus.queue(reg::CONFIG_VERSION, &[0x41]);
        bus.queue(reg::TOUCH_NUMBER, &[0xF5]);
        assert_eq!(gt.config_version().unwrap(), 0x41);
        assert_eq!(gt.max_touch_points().unwrap(), 5);
    }
}
