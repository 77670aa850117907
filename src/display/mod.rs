/*
 *  display/mod.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - panel driver and pixel helpers
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod color;

// Panel drivers
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplayCapabilities, DisplayDriver};
pub use error::DisplayError;
pub use drivers::st7796::{St7796, HEIGHT as PANEL_HEIGHT, WIDTH as PANEL_WIDTH};
