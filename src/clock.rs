// Copyright 2024, F. Stan
//
// Licensed under the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>,
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::thread;
use std::time::{Duration, Instant};

/// Millisecond time source used for bus gating and settling delays.
///
/// Timestamps wrap at `u32::MAX`; callers compare them with
/// [`reached`] rather than `>=`.
pub trait Clock {
    /// Current value of a monotonic millisecond counter.
    fn now_ms(&mut self) -> u32;

    /// Blocks for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// True once `now` is at or past `deadline`, modulo counter wrap.
pub fn reached(now: u32, deadline: u32) -> bool {
    deadline.wrapping_sub(now) as i32 <= 0
}

/// Wall clock based on [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&mut self) -> u32 {
        // truncation is the wrap
        self.start.elapsed().as_millis() as u32
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
