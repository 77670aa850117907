/*
 *  touch/mod.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Touch input - GT911 controller and sampling thread
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

use thiserror::Error;

pub mod driver;
pub mod gt911;
pub mod point;

#[cfg(test)]
pub mod mock;

pub use driver::TouchDriver;
pub use gt911::{Gt911, Gt911Config, TouchMode};
pub use point::{SharedTouch, TouchPoint};

#[derive(Debug, Error)]
pub enum TouchError {
    #[error("touch bus error: {0}")]
    Bus(String),
    #[error("touch GPIO error: {0}")]
    Gpio(String),
    #[error("invalid touch configuration: {0}")]
    Config(String),
    #[error("failed to spawn touch worker: {0}")]
    Spawn(#[from] io::Error),
}
