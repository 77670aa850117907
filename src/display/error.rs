/*
 *  display/error.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Error type for panel operations
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

use std::error::Error;
use std::fmt;

/// Unified error type for all panel operations
#[derive(Debug)]
pub enum DisplayError {
    /// Reset or init sequence failed; the driver was never handed out
    InitializationFailed(String),

    /// Command/data transfer over the panel interface failed
    InterfaceError(display_interface::DisplayError),

    /// Reset or backlight line could not be driven
    GpioError(String),

    /// Full-frame transfer with the wrong byte count
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Driver setting out of range
    InvalidConfiguration(String),
}

impl DisplayError {
    /// True for transport failures, false for protocol or setup problems.
    pub fn is_bus_error(&self) -> bool {
        matches!(self, DisplayError::InterfaceError(_) | DisplayError::GpioError(_))
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::InitializationFailed(msg) =>
                write!(f, "Display initialization failed: {}", msg),
            DisplayError::InterfaceError(err) =>
                write!(f, "Display interface error: {:?}", err),
            DisplayError::GpioError(msg) =>
                write!(f, "GPIO error: {}", msg),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {} bytes, got {}", expected, actual),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for DisplayError {
    // display_interface::DisplayError doesn't implement std::error::Error
    // so we can't provide it as a source
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::InterfaceError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = DisplayError::BufferSizeMismatch { expected: 307_200, actual: 10 };
        assert_eq!(err.to_string(), "Buffer size mismatch: expected 307200 bytes, got 10");
        assert!(!err.is_bus_error());
    }

    #[test]
    fn test_interface_error_is_bus_error() {
        let err: DisplayError = display_interface::DisplayError::BusWriteError.into();
        assert!(err.is_bus_error());
        assert!(err.to_string().contains("BusWriteError"));
    }
}
