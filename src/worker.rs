/*
 *  worker.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Background worker thread with explicit cancellation
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
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

/// Shutdown request shared by every thread-owning component.
///
/// Clone it into each component at composition time; cancelling any clone
/// cancels all of them.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A named OS thread that runs a loop body until stopped.
///
/// The body is called repeatedly while the worker's own running flag is set
/// and the shared [`CancelToken`] has not fired. There is no forced
/// cancellation: shutdown waits for the current body call to return, so the
/// body should block for a bounded time only.
#[derive(Debug)]
pub struct Worker {
    name: String,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn start<F>(name: &str, token: CancelToken, mut body: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!("{} started", thread_name);
                while flag.load(Ordering::Acquire) && !token.is_cancelled() {
                    body();
                }
                flag.store(false, Ordering::Release);
                debug!("{} loop exited", thread_name);
            })?;

        Ok(Self {
            name: name.to_string(),
            running,
            handle: Some(handle),
        })
    }

    /// False once the loop has exited, whether through `stop()` or the
    /// token.
    pub fn is_running(&self) -> bool {
        self.handle.is_some() && self.running.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the loop to exit and join the thread. Safe to call twice.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} panicked before shutdown", self.name);
            } else {
                debug!("{} joined", self.name);
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_worker_runs_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut worker = Worker::start("test-worker", CancelToken::new(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
        })
        .unwrap();

        while ticks.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(worker.is_running());

        worker.stop();
        assert!(!worker.is_running());

        let after = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(ticks.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_cancel_token_stops_every_worker() {
        let token = CancelToken::new();
        let mut a = Worker::start("a", token.clone(), || thread::sleep(Duration::from_millis(1))).unwrap();
        let mut b = Worker::start("b", token.clone(), || thread::sleep(Duration::from_millis(1))).unwrap();

        token.cancel();
        assert!(token.is_cancelled());

        // Both loops observe the token, so joining returns promptly
        a.stop();
        b.stop();
        assert!(!a.is_running());
        assert!(!b.is_running());
    }

    #[test]
    fn test_cancel_clears_running_without_stop() {
        let token = CancelToken::new();
        let mut worker = Worker::start("cancelled", token.clone(), || thread::sleep(Duration::from_millis(1))).unwrap();
        assert!(worker.is_running());

        token.cancel();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while worker.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!worker.is_running());
        worker.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut worker = Worker::start("idle", CancelToken::new(), || thread::sleep(Duration::from_millis(1))).unwrap();
        worker.stop();
        worker.stop();
        assert_eq!(worker.name(), "idle");
    }

    #[test]
    fn test_cancelled_token_skips_body() {
        let token = CancelToken::new();
        token.cancel();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let mut worker = Worker::start("never", token, move || flag.store(true, Ordering::SeqCst)).unwrap();
        worker.stop();
        assert!(!ran.load(Ordering::SeqCst));
    }
}
