// Licensed under the Apache-2.0 license

use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

/// `DelayNs` backed by `std::thread::sleep`.
#[derive(Copy, Clone, Debug, Default)]
pub struct SleepDelay;

impl DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
