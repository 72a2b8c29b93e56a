// Licensed under the Apache-2.0 license

//! Common types and constants for the BSC slave peripheral.
//!
//! This module provides the FIFO geometry, the decoded driver status and the
//! session configuration shared by the driver backends and the slave loop.

use bitflags::bitflags;
use embedded_hal::i2c::SevenBitAddress;
use fugit::MillisDurationU32;

/// Depth of the hardware transmit and receive FIFOs.
pub const FIFO_DEPTH: usize = 16;

/// A received message longer than this cannot be echoed in one TX FIFO load.
///
/// One byte of slack is allowed for the terminator the master appends.
pub const OVERFLOW_THRESHOLD: usize = FIFO_DEPTH + 1;

/// Capacity of the receive and transmit arrays of a transfer record.
///
/// Matches the buffers of the peripheral library's transfer structure, which
/// are larger than the FIFO so that a burst drained during one transfer call
/// is never lost.
pub const XFER_BUFFER_LEN: usize = 512;

/// Slave address the device answers on unless configured otherwise.
pub const DEFAULT_SLAVE_ADDRESS: SevenBitAddress = 0x0f;

const MAX_SEVEN_BIT_ADDRESS: SevenBitAddress = 0x7f;

const DEFAULT_POLL_INTERVAL: MillisDurationU32 = MillisDurationU32::millis(1);

bitflags! {
    /// Single-bit fields of the BSC flag register (FR).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u32 {
        /// Transmit operation in progress
        const TX_BUSY = 1 << 0;
        /// Receive FIFO empty
        const RX_EMPTY = 1 << 1;
        /// Transmit FIFO full
        const TX_FULL = 1 << 2;
        /// Receive FIFO full
        const RX_FULL = 1 << 3;
        /// Transmit FIFO empty
        const TX_EMPTY = 1 << 4;
        /// Receive operation in progress
        const RX_BUSY = 1 << 5;
    }
}

const TX_LEVEL_SHIFT: u32 = 6;
const RX_LEVEL_SHIFT: u32 = 11;
const LEVEL_MASK: u32 = 0x1f;
const REGISTER_MASK: u32 = 0xffff;
const COPIED_SHIFT: u32 = 16;

/// Non-negative status returned by a transfer submission.
///
/// The low half-word mirrors the BSC flag register sampled at the end of the
/// transfer; the upper bits carry the number of transmit bytes the driver
/// managed to copy into the TX FIFO.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct TransferStatus(u32);

impl TransferStatus {
    /// Decode a raw driver status. Negative values are rejections and yield `None`.
    #[must_use]
    pub fn from_raw(raw: i32) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Compose a status from its fields.
    #[must_use]
    pub fn new(flags: StatusFlags, tx_level: usize, rx_level: usize, tx_copied: usize) -> Self {
        let level = |n: usize| u32::try_from(n).unwrap_or(LEVEL_MASK).min(LEVEL_MASK);
        let copied = u32::try_from(tx_copied).unwrap_or(0) & REGISTER_MASK;
        Self(
            flags.bits()
                | (level(tx_level) << TX_LEVEL_SHIFT)
                | (level(rx_level) << RX_LEVEL_SHIFT)
                | (copied << COPIED_SHIFT),
        )
    }

    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn flags(self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.0 & REGISTER_MASK)
    }

    /// Bytes waiting in the TX FIFO after the transfer.
    #[must_use]
    pub fn tx_fifo_level(self) -> usize {
        ((self.0 >> TX_LEVEL_SHIFT) & LEVEL_MASK) as usize
    }

    /// Bytes waiting in the RX FIFO after the transfer.
    #[must_use]
    pub fn rx_fifo_level(self) -> usize {
        ((self.0 >> RX_LEVEL_SHIFT) & LEVEL_MASK) as usize
    }

    /// Transmit bytes copied into the FIFO by this transfer.
    #[must_use]
    pub fn tx_copied(self) -> usize {
        (self.0 >> COPIED_SHIFT) as usize
    }
}

/// Errors reported while building a [`SlaveConfig`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The address does not fit in seven bits
    InvalidAddress(u8),
}

impl core::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidAddress(address) => {
                write!(f, "slave address {address:#04x} is not a 7-bit address")
            }
        }
    }
}

/// Slave session configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlaveConfig {
    /// Address the slave answers on
    pub address: SevenBitAddress,
    /// Pause between two poll transfers
    pub poll_interval: MillisDurationU32,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_SLAVE_ADDRESS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

pub struct SlaveConfigBuilder {
    address: SevenBitAddress,
    poll_interval: MillisDurationU32,
}

impl Default for SlaveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: DEFAULT_SLAVE_ADDRESS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
    #[must_use]
    pub fn address(mut self, address: SevenBitAddress) -> Self {
        self.address = address;
        self
    }
    #[must_use]
    pub fn poll_interval(mut self, interval: MillisDurationU32) -> Self {
        self.poll_interval = interval;
        self
    }
    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidAddress`] if the address does not
    /// fit in the seven address bits of the control word.
    pub fn build(self) -> Result<SlaveConfig, ConfigurationError> {
        if self.address > MAX_SEVEN_BIT_ADDRESS {
            return Err(ConfigurationError::InvalidAddress(self.address));
        }
        Ok(SlaveConfig {
            address: self.address,
            poll_interval: self.poll_interval,
        })
    }
}
