//! Blocking periodic loops driving the live views of the client.
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

/// Granularity at which a sleeping poller notices the stop flag
const STOP_CHECK: Duration = Duration::from_millis(50);

/// Calls a task at a fixed interval until it asks to stop or the stop flag is raised.
pub struct Poller {
    interval: Duration,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Poller { interval }
    }

    /// Run `tick` right away, then once per interval.
    ///
    /// `tick` returns false to end the loop. A slow tick delays the next one rather than
    /// stacking calls. Returns the number of ticks run.
    pub fn run<F>(&self, stop: &AtomicBool, mut tick: F) -> usize
    where
        F: FnMut() -> bool,
    {
        let mut count = 0;
        while !stop.load(Ordering::Relaxed) {
            let started = Instant::now();
            count += 1;
            if !tick() {
                break;
            }
            let deadline = started + self.interval;
            while !stop.load(Ordering::Relaxed) {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                thread::sleep(STOP_CHECK.min(deadline - now));
            }
        }
        debug!("Poller stopped after {} ticks", count);
        count
    }
}
