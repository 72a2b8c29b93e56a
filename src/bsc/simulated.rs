// Licensed under the Apache-2.0 license

//! Software model of the BSC slave peripheral.
//!
//! [`SimulatedBsc`] reproduces what the slave session can observe of the real
//! block: a 16-deep transmit FIFO, a 16-deep receive FIFO fed from the bus,
//! `BREAK` flushing both FIFOs, and the flag register returned with every
//! transfer. The master side of the bus is driven through [`SimulatedMaster`],
//! an `embedded_hal::i2c::I2c` implementation, so that complete master/slave
//! exchanges can be played without hardware.
//!
//! A transfer keeps draining the receive FIFO while the master still has
//! bytes on the bus, so one submission returns a whole message even when it
//! is longer than the FIFO. The transmit side is not refilled during the
//! transfer: bytes beyond the FIFO depth are lost and the master reads
//! underrun bytes (`0x00`) in their place.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation, SevenBitAddress};
use heapless::Deque;

use super::common::{StatusFlags, TransferStatus, FIFO_DEPTH, XFER_BUFFER_LEN};
use super::control::{ControlFlags, ControlWord};
use super::traits::BscTransfer;
use super::xfer::TransferRecord;

/// Byte clocked out by the slave when its transmit FIFO is empty.
pub const UNDERRUN_BYTE: u8 = 0x00;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimulatedError {
    /// A transfer was submitted before `initialize` or after `shutdown`
    NotInitialized,
    /// No slave answered the master at this address
    Nack,
}

impl core::fmt::Display for SimulatedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => f.write_str("peripheral subsystem not initialized"),
            Self::Nack => f.write_str("address not acknowledged"),
        }
    }
}

impl embedded_hal::i2c::Error for SimulatedError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotInitialized => ErrorKind::Other,
            Self::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
        }
    }
}

pub struct SimulatedBsc {
    initialized: bool,
    control: ControlWord,
    /// Bytes the master has clocked onto the bus but the FIFO has not taken yet
    bus: Deque<u8, XFER_BUFFER_LEN>,
    rx_fifo: Deque<u8, FIFO_DEPTH>,
    tx_fifo: Deque<u8, FIFO_DEPTH>,
    overrun: bool,
    underrun: bool,
    transfers: usize,
    shutdowns: usize,
}

impl Default for SimulatedBsc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBsc {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initialized: false,
            control: ControlWord::from_bits(0),
            bus: Deque::new(),
            rx_fifo: Deque::new(),
            tx_fifo: Deque::new(),
            overrun: false,
            underrun: false,
            transfers: 0,
            shutdowns: 0,
        }
    }

    /// Master-side handle on the simulated bus.
    pub fn master(&mut self) -> SimulatedMaster<'_> {
        SimulatedMaster { bsc: self }
    }

    /// Control word applied by the last transfer.
    #[must_use]
    pub fn control(&self) -> ControlWord {
        self.control
    }

    /// True while the slave acknowledges `address`.
    #[must_use]
    pub fn answers(&self, address: SevenBitAddress) -> bool {
        self.initialized && self.control.is_open() && self.control.address() == address
    }

    #[must_use]
    pub fn tx_fifo_level(&self) -> usize {
        self.tx_fifo.len()
    }

    /// Set when the master wrote more bytes than the bus could hold since the
    /// last transfer.
    #[must_use]
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Set when the master read from an empty transmit FIFO.
    #[must_use]
    pub fn underrun(&self) -> bool {
        self.underrun
    }

    #[must_use]
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    #[must_use]
    pub fn shutdowns(&self) -> usize {
        self.shutdowns
    }

    fn status_flags(&self) -> StatusFlags {
        let mut flags = StatusFlags::empty();
        flags.set(StatusFlags::TX_EMPTY, self.tx_fifo.is_empty());
        flags.set(StatusFlags::TX_FULL, self.tx_fifo.is_full());
        flags.set(StatusFlags::RX_EMPTY, self.rx_fifo.is_empty());
        flags.set(StatusFlags::RX_FULL, self.rx_fifo.is_full());
        flags.set(StatusFlags::RX_BUSY, !self.bus.is_empty());
        flags
    }

    fn fill_rx_fifo(&mut self) {
        while !self.rx_fifo.is_full() {
            match self.bus.pop_front() {
                Some(byte) => {
                    let _ = self.rx_fifo.push_back(byte);
                }
                None => break,
            }
        }
    }

    fn master_write(&mut self, address: SevenBitAddress, bytes: &[u8]) -> Result<(), SimulatedError> {
        if !self.answers(address) {
            return Err(SimulatedError::Nack);
        }
        for &byte in bytes {
            if self.bus.push_back(byte).is_err() {
                self.overrun = true;
                break;
            }
        }
        Ok(())
    }

    fn master_read(&mut self, address: SevenBitAddress, buffer: &mut [u8]) -> Result<(), SimulatedError> {
        if !self.answers(address) {
            return Err(SimulatedError::Nack);
        }
        for slot in buffer.iter_mut() {
            *slot = match self.tx_fifo.pop_front() {
                Some(byte) => byte,
                None => {
                    self.underrun = true;
                    UNDERRUN_BYTE
                }
            };
        }
        Ok(())
    }
}

impl BscTransfer for SimulatedBsc {
    type Error = SimulatedError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        self.initialized = true;
        Ok(())
    }

    fn transfer(&mut self, record: &mut TransferRecord) -> Result<TransferStatus, Self::Error> {
        if !self.initialized {
            return Err(SimulatedError::NotInitialized);
        }
        self.transfers += 1;

        let control = record.control();
        if control.flags().contains(ControlFlags::BREAK) {
            self.bus.clear();
            self.rx_fifo.clear();
            self.tx_fifo.clear();
        }
        self.control = control;
        self.overrun = false;
        self.underrun = false;

        let mut copied = 0;
        for &byte in record.transmit() {
            if self.tx_fifo.push_back(byte).is_err() {
                break;
            }
            copied += 1;
        }

        let mut received = 0;
        while received < XFER_BUFFER_LEN {
            self.fill_rx_fifo();
            let Some(byte) = self.rx_fifo.pop_front() else {
                break;
            };
            if let Some(slot) = record.rx_buffer_mut().get_mut(received) {
                *slot = byte;
            }
            received += 1;
        }
        record.set_rx_count(received);

        Ok(TransferStatus::new(
            self.status_flags(),
            self.tx_fifo.len(),
            self.rx_fifo.len(),
            copied,
        ))
    }

    fn shutdown(&mut self) {
        self.initialized = false;
        self.control = ControlWord::from_bits(0);
        self.bus.clear();
        self.rx_fifo.clear();
        self.tx_fifo.clear();
        self.shutdowns += 1;
    }
}

/// Master end of the simulated bus.
pub struct SimulatedMaster<'a> {
    bsc: &'a mut SimulatedBsc,
}

impl embedded_hal::i2c::ErrorType for SimulatedMaster<'_> {
    type Error = SimulatedError;
}

impl embedded_hal::i2c::I2c for SimulatedMaster<'_> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => self.bsc.master_write(address, bytes)?,
                Operation::Read(buffer) => self.bsc.master_read(address, buffer)?,
            }
        }
        Ok(())
    }
}
