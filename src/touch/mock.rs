/*
 *  touch/mock.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Scripted register bus and interrupt line for testing
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

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::hal::{Edge, EdgeLine, RegisterBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

#[derive(Debug, Default)]
pub struct BusState {
    /// Queued responses per 16-bit register; the last one repeats
    pub reads: HashMap<u16, VecDeque<Vec<u8>>>,
    pub writes: Vec<(u16, Vec<u8>)>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

/// [`RegisterBus`] answering from per-register scripts. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBus {
    state: Arc<Mutex<BusState>>,
}

impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, reg: u16, data: &[u8]) {
        self.state.lock().unwrap().reads.entry(reg).or_default().push_back(data.to_vec());
    }

    pub fn writes(&self) -> Vec<(u16, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }
}

impl RegisterBus for ScriptedBus {
    type Error = BusFault;

    fn read_reg8(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.read_reg16(reg as u16, buf)
    }

    fn write_reg8(&mut self, reg: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.write_reg16(reg as u16, data)
    }

    fn read_reg16(&mut self, reg: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(BusFault);
        }
        buf.fill(0);
        if let Some(queue) = state.reads.get_mut(&reg) {
            let data = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
            if let Some(data) = data {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
            }
        }
        Ok(())
    }

    fn write_reg16(&mut self, reg: u16, data: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(BusFault);
        }
        state.writes.push((reg, data.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct LineState {
    pub levels: Vec<bool>,
    pub requested: Option<Edge>,
    pub refuse_falling: bool,
    pub refuse_rising: bool,
    pub refuse_output: bool,
    /// Outcomes for successive waits; empty means timeout
    pub events: VecDeque<Result<bool, LineFault>>,
    pub waits: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFault;

/// [`EdgeLine`] with scripted edge requests and wait outcomes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLine {
    state: Arc<Mutex<LineState>>,
}

impl ScriptedLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<Mutex<LineState>> {
        Arc::clone(&self.state)
    }
}

impl EdgeLine for ScriptedLine {
    type Error = LineFault;

    fn set_level(&mut self, high: bool) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        if state.refuse_output {
            return Err(LineFault);
        }
        state.levels.push(high);
        Ok(())
    }

    fn level(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.lock().unwrap().levels.last().copied().unwrap_or(false))
    }

    fn request_edge_event(&mut self, edge: Edge) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        let refused = match edge {
            Edge::Falling => state.refuse_falling,
            Edge::Rising => state.refuse_rising,
        };
        if refused {
            return Err(LineFault);
        }
        state.requested = Some(edge);
        Ok(())
    }

    fn wait_for_event(&mut self, timeout: Duration) -> Result<bool, Self::Error> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.waits += 1;
            state.events.pop_front()
        };
        match next {
            Some(outcome) => outcome,
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Ok(false)
            }
        }
    }
}
