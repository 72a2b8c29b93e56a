// Licensed under the Apache-2.0 license

//! Slave session state: the transfer record and its lifecycle.

use embedded_hal::i2c::SevenBitAddress;

use crate::bsc::{ControlWord, TransferRecord};

/// Lifecycle of the slave session on the peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum SessionLifecycle {
    /// No session on the peripheral
    #[default]
    Closed,
    /// Close-then-open sequence in progress
    Opening,
    /// The slave address is live
    Open,
    /// Close sequence in progress
    Closing,
    /// Closed and the peripheral subsystem shut down; final
    Terminated,
}

/// Owner of the single transfer record of a session.
///
/// Keeps the invariant that the transmit array is fully zeroed before each
/// submission, as long as callers go through [`SessionState::clear_transmit`]
/// before handing the record to the driver.
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    record: TransferRecord,
    lifecycle: SessionLifecycle,
}

impl SessionState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            record: TransferRecord::new(),
            lifecycle: SessionLifecycle::Closed,
        }
    }

    /// Zero the full transmit capacity and reset `tx_count`.
    pub fn clear_transmit(&mut self) {
        self.record.clear_transmit();
    }

    /// Point the record at the open or close configuration for `address`.
    pub fn reconfigure(&mut self, address: SevenBitAddress, open: bool) {
        self.record.set_control(ControlWord::build(address, open));
    }

    /// Forget whatever the previous transfer received.
    pub fn reset_receive(&mut self) {
        self.record.set_rx_count(0);
    }

    #[must_use]
    pub fn record(&self) -> &TransferRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut TransferRecord {
        &mut self.record
    }

    #[must_use]
    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    /// `Closed -> Opening`. Ignored once terminated.
    pub fn begin_open(&mut self) {
        if self.lifecycle == SessionLifecycle::Closed {
            self.lifecycle = SessionLifecycle::Opening;
        }
    }

    /// `Opening -> Open`, once the driver accepted the open word.
    pub fn mark_open(&mut self) {
        if self.lifecycle == SessionLifecycle::Opening {
            self.lifecycle = SessionLifecycle::Open;
        }
    }

    /// `Opening -> Closed`, when the driver rejected the open word.
    pub fn mark_open_failed(&mut self) {
        if self.lifecycle == SessionLifecycle::Opening {
            self.lifecycle = SessionLifecycle::Closed;
        }
    }

    /// Enter `Closing` from any non-final state.
    pub fn begin_close(&mut self) {
        if self.lifecycle != SessionLifecycle::Terminated {
            self.lifecycle = SessionLifecycle::Closing;
        }
    }

    pub fn terminate(&mut self) {
        self.lifecycle = SessionLifecycle::Terminated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsc::{ControlFlags, XFER_BUFFER_LEN};

    #[test]
    fn test_clear_transmit_regardless_of_prior_contents() {
        let mut session = SessionState::new();
        session.record_mut().queue_transmit(&[0x5a; XFER_BUFFER_LEN]);

        session.clear_transmit();

        assert_eq!(session.record().tx_count(), 0);
        assert!(session.record().tx_buffer().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reconfigure_sets_control_word() {
        let mut session = SessionState::new();

        session.reconfigure(0x0f, true);
        assert_eq!(session.record().control(), ControlWord::open(0x0f));

        session.reconfigure(0x0f, false);
        assert_eq!(session.record().control().flags(), ControlFlags::BREAK);
    }

    #[test]
    fn test_reconfigure_leaves_buffers_alone() {
        let mut session = SessionState::new();
        session.record_mut().fill_received(b"abc");
        session.record_mut().queue_transmit(b"XYZ");

        session.reconfigure(0x20, true);

        assert_eq!(session.record().received(), b"abc");
        assert_eq!(session.record().transmit(), b"XYZ");
    }

    #[test]
    fn test_lifecycle_open_then_close() {
        let mut session = SessionState::new();
        assert_eq!(session.lifecycle(), SessionLifecycle::Closed);

        session.begin_open();
        assert_eq!(session.lifecycle(), SessionLifecycle::Opening);
        session.mark_open();
        assert_eq!(session.lifecycle(), SessionLifecycle::Open);
        session.begin_close();
        assert_eq!(session.lifecycle(), SessionLifecycle::Closing);
        session.terminate();
        assert_eq!(session.lifecycle(), SessionLifecycle::Terminated);
    }

    #[test]
    fn test_failed_open_returns_to_closed() {
        let mut session = SessionState::new();
        session.begin_open();
        session.mark_open_failed();

        assert_eq!(session.lifecycle(), SessionLifecycle::Closed);
    }

    #[test]
    fn test_terminated_is_final() {
        let mut session = SessionState::new();
        session.terminate();

        session.begin_open();
        session.begin_close();
        session.mark_open();

        assert_eq!(session.lifecycle(), SessionLifecycle::Terminated);
    }
}
