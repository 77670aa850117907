/*
 *  hal/linux.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Linux production variants: spidev, i2c-dev and GPIO character device
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

use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use linux_embedded_hal::gpio_cdev::{
    Chip, EventRequestFlags, Line, LineEventHandle, LineHandle, LineRequestFlags,
};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, I2cdev, SpidevDevice};
use log::{debug, info};
use thiserror::Error;

use super::{Edge, EdgeLine};

const CONSUMER: &str = "velodash";

/// Errors raised while opening or driving Linux bus devices.
#[derive(Debug, Error)]
pub enum HalError {
    #[error("SPI error: {0}")]
    Spi(String),
    #[error("I2C error: {0}")]
    I2c(String),
    #[error("GPIO error: {0}")]
    Gpio(#[from] linux_embedded_hal::gpio_cdev::errors::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("line {0} is not requested for edge events")]
    NotEventLine(u32),
}

/// Open `/dev/spidevX.Y` as an 8-bit, mode 0 device at `speed_hz`.
pub fn open_spi(path: &str, speed_hz: u32) -> Result<SpidevDevice, HalError> {
    info!("Opening SPI {} at {} Hz", path, speed_hz);
    let mut spi = SpidevDevice::open(path)
        .map_err(|e| HalError::Spi(format!("Failed to open {}: {:?}", path, e)))?;

    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(speed_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)
        .map_err(|e| HalError::Spi(format!("Failed to configure {}: {}", path, e)))?;
    Ok(spi)
}

/// Open an I2C adapter such as `/dev/i2c-1`.
pub fn open_i2c(path: &str) -> Result<I2cdev, HalError> {
    info!("Opening I2C {}", path);
    I2cdev::new(path).map_err(|e| HalError::I2c(format!("Failed to open {}: {}", path, e)))
}

/// Request `offset` on `chip` as an output driven to `initial`.
pub fn open_output(chip: &str, offset: u32, initial: bool) -> Result<CdevPin, HalError> {
    debug!("Requesting {} line {} as output ({})", chip, offset, initial as u8);
    let handle = Chip::new(chip)?
        .get_line(offset)?
        .request(LineRequestFlags::OUTPUT, initial as u8, CONSUMER)?;
    Ok(CdevPin::new(handle)?)
}

/// Open `offset` on `chip` as an [`EdgeLine`]; the line is left unrequested.
pub fn open_edge_line(chip: &str, offset: u32) -> Result<CdevEdgeLine, HalError> {
    let line = Chip::new(chip)?.get_line(offset)?;
    Ok(CdevEdgeLine {
        line,
        offset,
        state: LineState::Released,
    })
}

enum LineState {
    Released,
    Output(LineHandle),
    Events(LineEventHandle),
}

/// [`EdgeLine`] over the GPIO character device.
///
/// The line is released and re-requested whenever it switches between
/// output and edge-event mode; the kernel refuses a second request on a
/// line that is still held.
pub struct CdevEdgeLine {
    line: Line,
    offset: u32,
    state: LineState,
}

impl CdevEdgeLine {
    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl EdgeLine for CdevEdgeLine {
    type Error = HalError;

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error> {
        if let LineState::Output(handle) = &self.state {
            handle.set_value(high as u8)?;
            return Ok(());
        }
        self.state = LineState::Released;
        let handle = self.line.request(LineRequestFlags::OUTPUT, high as u8, CONSUMER)?;
        self.state = LineState::Output(handle);
        Ok(())
    }

    fn level(&mut self) -> Result<bool, Self::Error> {
        let value = match &self.state {
            LineState::Output(handle) => handle.get_value()?,
            LineState::Events(events) => events.get_value()?,
            LineState::Released => self
                .line
                .request(LineRequestFlags::INPUT, 0, CONSUMER)?
                .get_value()?,
        };
        Ok(value != 0)
    }

    fn request_edge_event(&mut self, edge: Edge) -> Result<(), Self::Error> {
        self.state = LineState::Released;
        let flags = match edge {
            Edge::Falling => EventRequestFlags::FALLING_EDGE,
            Edge::Rising => EventRequestFlags::RISING_EDGE,
        };
        let events = self.line.events(LineRequestFlags::INPUT, flags, CONSUMER)?;
        self.state = LineState::Events(events);
        Ok(())
    }

    fn wait_for_event(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
        let LineState::Events(events) = &mut self.state else {
            return Err(HalError::NotEventLine(self.offset));
        };

        let mut pfd = libc::pollfd {
            fd: events.as_raw_fd(),
            events: libc::POLLIN | libc::POLLPRI,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: pfd is a valid pollfd for the duration of the call, count is 1
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err.into());
        }
        if rc == 0 {
            return Ok(false);
        }

        // drain the event record so the next poll blocks again
        events.get_event()?;
        Ok(true)
    }
}
