// Licensed under the Apache-2.0 license

//! Scripted BSC driver for testing
//!
//! Records every submission and answers poll transfers from a pre-programmed
//! script. Clones share the same state, so a clone handed to an interrupt
//! handler thread shows up in the same log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use std::vec::Vec;

use embedded_hal::i2c::ErrorKind;

use super::{BscTransfer, ControlWord, TransferRecord, TransferStatus};
use crate::slave::shutdown::ShutdownSignal;

/// What the driver saw on one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub control: ControlWord,
    /// Queued transmit bytes (`tx_count` prefix)
    pub tx: Vec<u8>,
    /// Whether every byte past `tx_count` was zero
    pub tail_zeroed: bool,
}

impl Submission {
    fn capture(record: &TransferRecord) -> Self {
        let tail = record.tx_buffer().get(record.tx_count()..).unwrap_or_default();
        Self {
            control: record.control(),
            tx: record.transmit().to_vec(),
            tail_zeroed: tail.iter().all(|&b| b == 0),
        }
    }
}

/// Scripted answer to one poll transfer
#[derive(Debug, Clone)]
pub enum Reply {
    /// Nothing received
    Idle,
    /// The master wrote these bytes
    Receive(Vec<u8>),
    /// The driver rejects the transfer, leaving the record untouched
    Reject(i32),
    /// The cancellation flag is raised during the transfer
    Raise(i32),
    /// The transfer blocks until another thread raises the cancellation
    /// flag, then lingers before returning empty
    Stall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub i32);

impl embedded_hal::i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Default)]
struct MockState {
    submissions: Vec<Submission>,
    polls: VecDeque<Reply>,
    open_status: i32,
    close_status: i32,
    init_fails: bool,
    opened: bool,
    initializations: usize,
    shutdowns: usize,
    /// Submission count at the first shutdown
    submissions_at_shutdown: Option<usize>,
}

#[derive(Clone, Default)]
pub struct MockBsc {
    state: Arc<Mutex<MockState>>,
    signal: Option<&'static ShutdownSignal>,
}

impl MockBsc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned for the open attempt
    pub fn open_status(self, status: i32) -> Self {
        self.lock().open_status = status;
        self
    }

    pub fn reject_close(self, status: i32) -> Self {
        self.lock().close_status = status;
        self
    }

    pub fn fail_initialize(self) -> Self {
        self.lock().init_fails = true;
        self
    }

    /// Answers for the poll transfers, in order; `Idle` once exhausted
    pub fn polls<I: IntoIterator<Item = Reply>>(self, replies: I) -> Self {
        self.lock().polls.extend(replies);
        self
    }

    /// Signal used by `Reply::Raise` and `Reply::Stall`
    pub fn with_signal(mut self, signal: &'static ShutdownSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    /// Number of close-word submissions
    pub fn close_submissions(&self) -> usize {
        self.lock()
            .submissions
            .iter()
            .filter(|s| s.control.is_close())
            .count()
    }

    pub fn initializations(&self) -> usize {
        self.lock().initializations
    }

    pub fn shutdowns(&self) -> usize {
        self.lock().shutdowns
    }

    /// Submissions recorded before the first `shutdown`, if there was one
    pub fn submissions_at_shutdown(&self) -> Option<usize> {
        self.lock().submissions_at_shutdown
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn signal(&self) -> &'static ShutdownSignal {
        self.signal.expect("scripted interrupt needs a shutdown signal")
    }
}

impl BscTransfer for MockBsc {
    type Error = MockError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.initializations += 1;
        if state.init_fails {
            Err(MockError(-1))
        } else {
            Ok(())
        }
    }

    fn transfer(&mut self, record: &mut TransferRecord) -> Result<TransferStatus, Self::Error> {
        let control = record.control();
        let reply = {
            let mut state = self.lock();
            state.submissions.push(Submission::capture(record));

            if !control.is_open() {
                record.set_rx_count(0);
                return if state.close_status < 0 {
                    Err(MockError(state.close_status))
                } else {
                    Ok(TransferStatus::default())
                };
            }
            if !state.opened {
                state.opened = true;
                record.set_rx_count(0);
                return if state.open_status < 0 {
                    Err(MockError(state.open_status))
                } else {
                    Ok(TransferStatus::default())
                };
            }
            state.polls.pop_front().unwrap_or(Reply::Idle)
        };

        match reply {
            Reply::Idle => {
                record.set_rx_count(0);
                Ok(TransferStatus::default())
            }
            Reply::Receive(bytes) => {
                record.fill_received(&bytes);
                Ok(TransferStatus::default())
            }
            Reply::Reject(code) => Err(MockError(code)),
            Reply::Raise(signum) => {
                record.set_rx_count(0);
                self.signal().raise(signum);
                Ok(TransferStatus::default())
            }
            Reply::Stall => {
                let signal = self.signal();
                while !signal.is_raised() {
                    thread::sleep(Duration::from_millis(1));
                }
                thread::sleep(Duration::from_millis(20));
                record.set_rx_count(0);
                Ok(TransferStatus::default())
            }
        }
    }

    fn shutdown(&mut self) {
        let mut state = self.lock();
        state.shutdowns += 1;
        if state.submissions_at_shutdown.is_none() {
            state.submissions_at_shutdown = Some(state.submissions.len());
        }
    }
}
