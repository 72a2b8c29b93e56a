// Licensed under the Apache-2.0 license

//! Interrupt-safe teardown of the slave session.
//!
//! The interrupt is handled on its own thread while the poll loop may be in
//! the middle of a transfer. Shutting the peripheral subsystem down under a
//! running transfer is not allowed, so the interrupt side only raises a
//! cancellation flag and the loop performs the teardown at the top of its next
//! iteration. Two things are shared, both as atomics:
//!
//! * the cancellation flag with the signal number;
//! * a teardown claim, so that exactly one side issues the close transfer and
//!   the subsystem shutdown.
//!
//! If the loop does not finish the teardown within [`TEARDOWN_GRACE`] (it is
//! not running, or is stuck in the driver), the interrupt side claims it
//! itself.
//!
//! The teardown never looks at the loop's transfer record. It builds a fresh
//! one, so it is correct whatever state the interrupted iteration left behind.

use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::SevenBitAddress;
use fugit::MillisDurationU32;
use log::{info, warn};

use super::session::SessionState;
use crate::bsc::BscTransfer;

const TEARDOWN_IDLE: u8 = 0;
const TEARDOWN_IN_PROGRESS: u8 = 1;
const TEARDOWN_DONE: u8 = 2;

/// How long the interrupt side waits for the poll loop to tear down.
pub const TEARDOWN_GRACE: MillisDurationU32 = MillisDurationU32::millis(500);

/// Cancellation flag and teardown claim shared with the interrupt callback.
pub struct ShutdownSignal {
    raised: AtomicBool,
    signal: AtomicI32,
    teardown: AtomicU8,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
            signal: AtomicI32::new(0),
            teardown: AtomicU8::new(TEARDOWN_IDLE),
        }
    }

    /// Request shutdown on behalf of signal `signum`.
    pub fn raise(&self, signum: i32) {
        self.signal.store(signum, Ordering::Release);
        self.raised.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Signal number of a raised shutdown request.
    #[must_use]
    pub fn signal(&self) -> Option<i32> {
        if self.is_raised() {
            Some(self.signal.load(Ordering::Acquire))
        } else {
            None
        }
    }

    /// Take ownership of the teardown. Only the first caller gets `true`.
    #[must_use]
    pub fn claim_teardown(&self) -> bool {
        self.teardown
            .compare_exchange(
                TEARDOWN_IDLE,
                TEARDOWN_IN_PROGRESS,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn complete_teardown(&self) {
        self.teardown.store(TEARDOWN_DONE, Ordering::Release);
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.teardown.load(Ordering::Acquire) == TEARDOWN_DONE
    }
}

/// Close the slave at `address` and shut the peripheral subsystem down.
///
/// Issues one close transfer on a fresh record (its result is ignored) and
/// then one `shutdown` call.
pub fn teardown<D: BscTransfer>(driver: &mut D, address: SevenBitAddress) {
    let mut session = SessionState::new();
    session.begin_close();
    session.reconfigure(address, false);
    session.clear_transmit();
    if let Err(err) = driver.transfer(session.record_mut()) {
        warn!("Close transfer rejected: {err:?}");
    }
    info!("Closed slave.");

    driver.shutdown();
    session.terminate();
    info!("Terminated peripheral subsystem.");
}

/// Run [`teardown`] unless the other side already claimed it.
///
/// Returns `true` if this call performed the teardown.
pub fn teardown_once<D: BscTransfer>(
    signal: &ShutdownSignal,
    driver: &mut D,
    address: SevenBitAddress,
) -> bool {
    if !signal.claim_teardown() {
        return false;
    }
    teardown(driver, address);
    signal.complete_teardown();
    true
}

/// Block until the teardown claimed by either side has completed.
pub fn wait_torn_down<T: DelayNs>(signal: &ShutdownSignal, delay: &mut T) {
    while !signal.is_torn_down() {
        delay.delay_ms(1);
    }
}

/// Body of the interrupt handler thread.
///
/// Raises the cancellation flag and waits up to `grace` for the poll loop to
/// tear the session down, then does it itself if nobody has claimed it.
/// Returns once the teardown is complete, with the exit status the process
/// must terminate with.
pub fn handle_interrupt<D: BscTransfer, T: DelayNs>(
    signal: &ShutdownSignal,
    driver: &mut D,
    address: SevenBitAddress,
    signum: i32,
    delay: &mut T,
    grace: MillisDurationU32,
) -> i32 {
    info!("Interrupt signal ({signum}) received.");
    signal.raise(signum);

    let mut waited = 0;
    while !signal.is_torn_down() && waited < grace.to_millis() {
        delay.delay_ms(1);
        waited += 1;
    }
    if !signal.is_torn_down() {
        warn!("Poll loop did not close the slave in time.");
        if !teardown_once(signal, driver, address) {
            wait_torn_down(signal, delay);
        }
    }
    signum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsc::mock::MockBsc;
    use crate::bsc::ControlWord;
    use crate::delay::SleepDelay;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_clear() {
        let signal = ShutdownSignal::new();

        assert!(!signal.is_raised());
        assert_eq!(signal.signal(), None);
        assert!(!signal.is_torn_down());
    }

    #[test]
    fn test_raise_records_signal_number() {
        let signal = ShutdownSignal::new();
        signal.raise(2);

        assert!(signal.is_raised());
        assert_eq!(signal.signal(), Some(2));
    }

    #[test]
    fn test_teardown_claim_is_exclusive() {
        let signal = ShutdownSignal::new();

        assert!(signal.claim_teardown());
        assert!(!signal.claim_teardown());
        assert!(!signal.is_torn_down());

        signal.complete_teardown();
        assert!(signal.is_torn_down());
        assert!(!signal.claim_teardown());
    }

    #[test]
    fn test_teardown_issues_one_close_and_shutdown() {
        let mut driver = MockBsc::new();

        teardown(&mut driver, 0x0f);

        let submissions = driver.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].control, ControlWord::close(0x0f));
        assert!(submissions[0].tx.is_empty());
        assert!(submissions[0].tail_zeroed);
        assert_eq!(driver.shutdowns(), 1);
    }

    #[test]
    fn test_teardown_shuts_down_even_if_close_rejected() {
        let mut driver = MockBsc::new().reject_close(-1);

        teardown(&mut driver, 0x0f);

        assert_eq!(driver.submissions().len(), 1);
        assert_eq!(driver.shutdowns(), 1);
    }

    #[test]
    fn test_interrupt_falls_back_when_loop_is_absent() {
        let signal = ShutdownSignal::new();
        let mut driver = MockBsc::new();
        let grace = MillisDurationU32::millis(5);

        assert_eq!(handle_interrupt(&signal, &mut driver, 0x0f, 2, &mut SleepDelay, grace), 2);
        assert_eq!(handle_interrupt(&signal, &mut driver, 0x0f, 2, &mut SleepDelay, grace), 2);

        assert_eq!(driver.submissions().len(), 1);
        assert_eq!(driver.shutdowns(), 1);
        assert_eq!(signal.signal(), Some(2));
        assert!(signal.is_torn_down());
    }

    #[test]
    fn test_interrupt_leaves_completed_teardown_alone() {
        let signal = ShutdownSignal::new();
        assert!(signal.claim_teardown());
        signal.complete_teardown();
        let mut driver = MockBsc::new();

        let code = handle_interrupt(&signal, &mut driver, 0x0f, 15, &mut SleepDelay, TEARDOWN_GRACE);

        assert_eq!(code, 15);
        assert!(driver.submissions().is_empty());
        assert_eq!(driver.shutdowns(), 0);
    }

    #[test]
    fn test_interrupt_waits_for_teardown_in_progress() {
        static SIGNAL: ShutdownSignal = ShutdownSignal::new();
        assert!(SIGNAL.claim_teardown());
        let finisher = thread::spawn(|| {
            thread::sleep(Duration::from_millis(20));
            SIGNAL.complete_teardown();
        });
        let mut driver = MockBsc::new();

        handle_interrupt(&SIGNAL, &mut driver, 0x0f, 2, &mut SleepDelay, MillisDurationU32::millis(1));

        assert!(SIGNAL.is_torn_down());
        assert!(driver.submissions().is_empty());
        finisher.join().unwrap();
    }
}
