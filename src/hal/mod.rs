/*
 *  hal/mod.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Narrow bus capabilities consumed by the panel and touch drivers
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

//! Bus capabilities.
//!
//! The byte-stream SPI write, digital outputs and delays come straight from
//! `display-interface` and `embedded-hal`. The two capabilities those crates
//! do not cover are defined here: register-addressed access over I2C and a
//! digital line that can wait for edge events.

use std::fmt::Debug;
use std::time::Duration;

use embedded_hal::i2c::I2c;

pub mod linux;

pub use linux::{CdevEdgeLine, HalError};

/// Register-addressed peripheral bus, bound to one device.
///
/// 16-bit register addresses are sent big-endian (high byte first).
pub trait RegisterBus {
    type Error: Debug;

    fn read_reg8(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error>;
    fn write_reg8(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error>;
    fn read_reg16(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), Self::Error>;
    fn write_reg16(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error>;
}

/// [`RegisterBus`] over any `embedded-hal` I2C bus at a fixed 7-bit address.
#[derive(Debug)]
pub struct I2cRegisters<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> I2cRegisters<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn write_framed(&mut self, reg: &[u8], data: &[u8]) -> Result<(), I2C::Error> {
        // Register address and payload must go out in one write, no restart
        let mut frame = Vec::with_capacity(reg.len() + data.len());
        frame.extend_from_slice(reg);
        frame.extend_from_slice(data);
        self.i2c.write(self.address, &frame)
    }
}

impl<I2C: I2c> RegisterBus for I2cRegisters<I2C> {
    type Error = I2C::Error;

    fn read_reg8(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &[reg], buf)
    }

    fn write_reg8(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.write_framed(&[reg], data)
    }

    fn read_reg16(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.write_read(self.address, &reg.to_be_bytes(), buf)
    }

    fn write_reg16(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error> {
        self.write_framed(&reg.to_be_bytes(), data)
    }
}

/// Edge selection for [`EdgeLine::request_edge_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Falling,
    Rising,
}

/// Digital line that can be driven, read, and waited on for edges.
///
/// Requesting edge events reconfigures the line as an input; driving it
/// again reconfigures it as an output.
pub trait EdgeLine {
    type Error: Debug;

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error>;
    fn level(&mut self) -> Result<bool, Self::Error>;
    fn request_edge_event(&mut self, edge: Edge) -> Result<(), Self::Error>;

    /// Block until an edge arrives or `timeout` elapses.
    /// Returns `Ok(true)` for an event and `Ok(false)` for a timeout.
    fn wait_for_event(&mut self, timeout: Duration) -> Result<bool, Self::Error>;
}
