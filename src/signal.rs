// Licensed under the Apache-2.0 license

//! Process signal listener.
//!
//! Signals are not handled inside an async-signal context. `signal-hook`
//! forwards them to a dedicated thread, which raises the shutdown flag, waits
//! for the poll loop to close the slave (falling back to its own driver handle
//! after [`TEARDOWN_GRACE`]) and then hands the exit status to the caller's
//! `on_exit` action (normally `std::process::exit`).
//!
//! Any handler the peripheral library installed for the same signals is still
//! called by `signal-hook`, so such handlers must be disabled at
//! initialization.

use std::io;
use std::thread::{self, JoinHandle};

use embedded_hal::i2c::SevenBitAddress;
use log::debug;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};

use crate::bsc::BscTransfer;
use crate::delay::SleepDelay;
use crate::slave::{handle_interrupt, ShutdownSignal, TEARDOWN_GRACE};

/// Signals that end the slave session.
pub const TERMINATION_SIGNALS: [i32; 2] = [SIGINT, SIGTERM];

/// Background thread waiting for a termination signal.
pub struct InterruptListener<D> {
    handle: Handle,
    thread: JoinHandle<D>,
}

impl<D: BscTransfer + Send + 'static> InterruptListener<D> {
    /// Listen for [`TERMINATION_SIGNALS`].
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be registered.
    pub fn spawn<F>(
        shutdown: &'static ShutdownSignal,
        driver: D,
        address: SevenBitAddress,
        on_exit: F,
    ) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        Self::spawn_for(&TERMINATION_SIGNALS, shutdown, driver, address, on_exit)
    }

    /// Listen for an explicit set of signals.
    ///
    /// Only the first delivered signal is acted upon; the thread then returns
    /// the driver handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the signal handlers cannot be registered.
    pub fn spawn_for<F>(
        signals: &[i32],
        shutdown: &'static ShutdownSignal,
        mut driver: D,
        address: SevenBitAddress,
        on_exit: F,
    ) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let mut signals = Signals::new(signals)?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("bsc-signal".into())
            .spawn(move || {
                if let Some(signum) = signals.forever().next() {
                    let code = handle_interrupt(
                        shutdown,
                        &mut driver,
                        address,
                        signum,
                        &mut SleepDelay,
                        TEARDOWN_GRACE,
                    );
                    on_exit(code);
                }
                debug!("Signal listener stopped.");
                driver
            })?;

        Ok(Self { handle, thread })
    }

    /// Stop listening and get the driver handle back.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the listener thread panicked.
    pub fn close(self) -> thread::Result<D> {
        self.handle.close();
        self.thread.join()
    }
}
