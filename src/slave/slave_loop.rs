// Licensed under the Apache-2.0 license

//! Poll loop of the echo slave.
//!
//! ```text
//! Resetting ──> Opening ──status >= 0──> Polling ──interrupt──> ClosingOnInterrupt
//!                  │                        │
//!              status < 0               close()
//!                  │                        │
//!                  v                        v
//!               (halt)               ClosingOnRequest
//! ```
//!
//! Each poll iteration submits one transfer, clears the transmit buffer
//! straight away, then decides what the received bytes are:
//!
//! * nothing received: idle cycle;
//! * only zero bytes: control bytes from the master's command phase, skipped;
//! * anything else: a message, answered with its ASCII-uppercased copy on the
//!   next transfer.
//!
//! A reply longer than the TX FIFO is reported but still queued whole.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use super::error::SlaveError;
use super::session::SessionState;
use super::shutdown::{teardown_once, wait_torn_down, ShutdownSignal};
use crate::bsc::{
    BscTransfer, SlaveConfig, TransferRecord, TransferStatus, FIFO_DEPTH, OVERFLOW_THRESHOLD,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Resetting,
    Opening,
    Polling,
    ClosingOnRequest,
    ClosingOnInterrupt,
}

/// What one poll iteration did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The session is not polling; no transfer was submitted
    Inactive,
    /// No bytes received
    Idle,
    /// Only zero-valued control bytes received
    Spurious,
    /// A message was received and its reply queued
    Echoed {
        len: usize,
        /// The reply does not fit in one TX FIFO load
        overflow: bool,
    },
}

/// How a session that got past opening ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// Closed through [`SlaveLoop::close`]
    Closed,
    /// Closed because of the interrupt signal carried
    Interrupted(i32),
}

impl SessionEnd {
    /// Process exit status for this ending.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Closed => 0,
            Self::Interrupted(signum) => signum,
        }
    }
}

pub struct SlaveLoop<'s, D: BscTransfer, T: DelayNs> {
    driver: D,
    delay: T,
    config: SlaveConfig,
    session: SessionState,
    state: LoopState,
    shutdown: &'s ShutdownSignal,
}

impl<'s, D: BscTransfer, T: DelayNs> SlaveLoop<'s, D, T> {
    pub fn new(driver: D, delay: T, config: SlaveConfig, shutdown: &'s ShutdownSignal) -> Self {
        Self {
            driver,
            delay,
            config,
            session: SessionState::new(),
            state: LoopState::Resetting,
            shutdown,
        }
    }

    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    #[must_use]
    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Bring up the peripheral subsystem.
    ///
    /// # Errors
    ///
    /// Returns [`SlaveError::InitFailed`] if the driver cannot initialize.
    pub fn initialize(&mut self) -> Result<(), SlaveError<D::Error>> {
        self.driver.initialize().map_err(|err| {
            error!("Peripheral initialization failed: {err:?}");
            SlaveError::InitFailed(err)
        })?;
        info!("Initialized peripheral subsystem.");
        Ok(())
    }

    /// Release any stale session, then open the slave address.
    ///
    /// On success the loop is in [`LoopState::Polling`] with an empty receive
    /// count and a cleared transmit buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SlaveError::OpenRejected`] if the driver rejects the open
    /// control word. No further transfer is submitted in that case.
    pub fn open(&mut self) -> Result<TransferStatus, SlaveError<D::Error>> {
        let address = self.config.address;
        self.state = LoopState::Resetting;
        self.session.begin_open();

        // A previous run may have died with the slave still open
        self.session.reconfigure(address, false);
        self.session.clear_transmit();
        let _ = self.driver.transfer(self.session.record_mut());

        self.state = LoopState::Opening;
        self.session.reconfigure(address, true);
        self.session.clear_transmit();
        match self.driver.transfer(self.session.record_mut()) {
            Ok(status) => {
                info!("Opened slave at address {address:#04x}.");
                self.session.mark_open();
                self.session.reset_receive();
                self.session.clear_transmit();
                self.state = LoopState::Polling;
                Ok(status)
            }
            Err(err) => {
                error!("Failed to open slave at address {address:#04x}: {err:?}");
                self.session.mark_open_failed();
                Err(SlaveError::OpenRejected(err))
            }
        }
    }

    /// Run one poll iteration, including the pacing delay.
    pub fn poll_once(&mut self) -> PollOutcome {
        if self.state != LoopState::Polling {
            return PollOutcome::Inactive;
        }

        // A rejected transfer counts as an empty one
        if self.driver.transfer(self.session.record_mut()).is_err() {
            self.session.reset_receive();
        }
        self.session.clear_transmit();

        let outcome = answer_received(self.session.record_mut());
        self.delay.delay_ms(self.config.poll_interval.to_millis());
        outcome
    }

    /// Open the slave and poll until the shutdown signal is raised.
    ///
    /// The flag is checked before every transfer, and the loop itself closes
    /// the slave and shuts the peripheral down once it sees it, so no transfer
    /// is ever submitted after the shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`SlaveError::OpenRejected`] if the slave could not be opened;
    /// polling never starts in that case.
    pub fn run(&mut self) -> Result<SessionEnd, SlaveError<D::Error>> {
        if self.shutdown.is_torn_down() {
            // The peripheral is already shut down; it must not be touched again
            self.state = LoopState::ClosingOnInterrupt;
            self.session.terminate();
            return Ok(self.shutdown.signal().map_or(SessionEnd::Closed, SessionEnd::Interrupted));
        }
        self.open()?;
        loop {
            if let Some(signum) = self.shutdown.signal() {
                self.close_with(LoopState::ClosingOnInterrupt);
                return Ok(SessionEnd::Interrupted(signum));
            }
            self.poll_once();
        }
    }

    /// Close the slave and shut the peripheral subsystem down.
    pub fn close(&mut self) -> SessionEnd {
        self.close_with(LoopState::ClosingOnRequest);
        SessionEnd::Closed
    }

    fn close_with(&mut self, state: LoopState) {
        self.state = state;
        self.session.begin_close();
        if !teardown_once(self.shutdown, &mut self.driver, self.config.address) {
            // The interrupt side owns the teardown; do not return before it is done
            wait_torn_down(self.shutdown, &mut self.delay);
        }
        self.session.terminate();
    }
}

/// Decide what the bytes of the last transfer are and queue the reply.
fn answer_received(record: &mut TransferRecord) -> PollOutcome {
    let count = record.rx_count();
    if count == 0 {
        return PollOutcome::Idle;
    }
    if record.received().iter().all(|&b| b == 0) {
        debug!("Skipping {count} control byte(s).");
        return PollOutcome::Spurious;
    }

    info!("Received {count} bytes: {}", record.received().escape_ascii());
    let overflow = count > OVERFLOW_THRESHOLD;
    if overflow {
        warn!(
            "Reply of {count} bytes exceeds the {FIFO_DEPTH}-byte TX FIFO; its tail will be corrupted."
        );
    }

    let len = record.queue_uppercase_echo();
    info!("Writing {len} bytes: {}", record.transmit().escape_ascii());
    PollOutcome::Echoed { len, overflow }
}
