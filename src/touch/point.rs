/*
 *  touch/point.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Most recent touch coordinate, shared across threads
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

use std::sync::atomic::{AtomicI32, Ordering};

/// One sampled contact in panel coordinates; `(-1, -1)` when untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchPoint {
    pub x: i32,
    pub y: i32,
    pub touched: bool,
}

impl TouchPoint {
    pub fn new(x: i32, y: i32) -> Self {
        TouchPoint {
            x,
            y,
            touched: x >= 0 && y >= 0,
        }
    }

    pub fn untouched() -> Self {
        TouchPoint::new(-1, -1)
    }
}

impl Default for TouchPoint {
    fn default() -> Self {
        TouchPoint::untouched()
    }
}

/// Latest coordinate written by the sampling thread.
///
/// X and Y are separate atomics: a reader racing a write may pair an X
/// from one sample with a Y from the next.
#[derive(Debug)]
pub struct SharedTouch {
    x: AtomicI32,
    y: AtomicI32,
}

impl SharedTouch {
    pub fn new() -> Self {
        SharedTouch {
            x: AtomicI32::new(-1),
            y: AtomicI32::new(-1),
        }
    }

    pub fn store(&self, point: TouchPoint) {
        self.x.store(point.x, Ordering::Release);
        self.y.store(point.y, Ordering::Release);
    }

    pub fn invalidate(&self) {
        self.store(TouchPoint::untouched());
    }

    pub fn load(&self) -> TouchPoint {
        TouchPoint::new(self.x.load(Ordering::Acquire), self.y.load(Ordering::Acquire))
    }

    pub fn is_touched(&self) -> bool {
        self.load().touched
    }
}

impl Default for SharedTouch {
    fn default() -> Self {
        Self::new()
    }
}
