/*
 *  touch/driver.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Background sampling of the touch controller
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

use std::sync::Arc;
use std::thread;

use embedded_hal::digital::OutputPin;
use log::{info, trace};

use crate::hal::{EdgeLine, RegisterBus};
use crate::touch::gt911::{Gt911, TouchMode};
use crate::touch::point::{SharedTouch, TouchPoint};
use crate::touch::TouchError;
use crate::worker::{CancelToken, Worker};

/// Samples a [`Gt911`] on its own thread and publishes the latest point.
///
/// Dropping or stopping the driver joins the thread; the controller and its
/// bus handles are released only after that.
pub struct TouchDriver {
    shared: Arc<SharedTouch>,
    mode: TouchMode,
    worker: Worker,
}

impl TouchDriver {
    pub fn start<B, RST, INT>(mut gt911: Gt911<B, RST, INT>, token: CancelToken) -> Result<Self, TouchError>
    where
        B: RegisterBus + Send + 'static,
        RST: OutputPin + Send + 'static,
        INT: EdgeLine + Send + 'static,
    {
        let shared = Arc::new(SharedTouch::new());
        let mode = gt911.mode();
        let published = Arc::clone(&shared);

        let worker = Worker::start("touch", token, move || tick(&mut gt911, &published))?;
        info!("Touch sampling started ({:?})", mode);

        Ok(TouchDriver { shared, mode, worker })
    }

    pub fn last_point(&self) -> TouchPoint {
        self.shared.load()
    }

    pub fn is_touched(&self) -> bool {
        self.shared.is_touched()
    }

    pub fn mode(&self) -> TouchMode {
        self.mode
    }

    /// Handle for readers on other threads.
    pub fn shared(&self) -> Arc<SharedTouch> {
        Arc::clone(&self.shared)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

/// One loop iteration: wait for an edge (interrupt mode) or sleep (polling
/// and timed-out waits), then sample, publish and acknowledge. Read errors
/// skip the tick; a failed acknowledge keeps the published point.
fn tick<B, RST, INT>(gt: &mut Gt911<B, RST, INT>, shared: &SharedTouch)
where
    B: RegisterBus,
    RST: OutputPin,
    INT: EdgeLine,
{
    let woken = match gt.mode() {
        TouchMode::Interrupt(_) => match gt.wait_for_event() {
            Ok(event) => event,
            Err(e) => {
                trace!("edge wait failed: {:?}", e);
                false
            }
        },
        TouchMode::Polling => false,
    };

    // publish before acknowledging; the ack lets the controller overwrite
    // the point registers
    match gt.read_point() {
        Ok(point) => {
            shared.store(point);
            if let Err(e) = gt.acknowledge() {
                trace!("status ack failed: {}", e);
            }
        }
        Err(e) => trace!("touch sample skipped: {}", e),
    }

    if !woken {
        thread::sleep(gt.config().poll_interval);
    }
}
