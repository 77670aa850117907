/*
 *  lib.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root: panel driver, text rendering and touch sampling
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

//! Core of the velodash cycle computer: an ST7796 SPI panel, a GT911 I2C
//! touch controller and a glyph-caching text renderer on top of the panel.
//!
//! Data flows one way at render time:
//! caller -> [`text::TextRenderer`] -> [`display::DisplayDriver`] -> bus.
//! The [`touch::TouchDriver`] samples on its own worker thread and publishes
//! the most recent coordinate for any thread to read.

pub mod config;
pub mod display;
pub mod hal;
pub mod text;
pub mod touch;
pub mod worker;

pub use display::{DisplayDriver, DisplayError, St7796};
pub use text::{TextMetrics, TextRenderer};
pub use touch::{Gt911, TouchDriver, TouchPoint};
pub use worker::{CancelToken, Worker};
