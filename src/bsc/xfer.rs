// Licensed under the Apache-2.0 license

//! Transfer record exchanged with the BSC driver on every submission.

use super::common::XFER_BUFFER_LEN;
use super::control::ControlWord;

/// The unit passed to and from the peripheral driver.
///
/// Both buffers are fixed arrays with explicit counts. The driver writes the
/// received bytes and `rx_count`; the caller queues reply bytes and
/// `tx_count` before the next submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    control: ControlWord,
    rx_buf: [u8; XFER_BUFFER_LEN],
    rx_count: usize,
    tx_buf: [u8; XFER_BUFFER_LEN],
    tx_count: usize,
}

impl Default for TransferRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferRecord {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            control: ControlWord::from_bits(0),
            rx_buf: [0; XFER_BUFFER_LEN],
            rx_count: 0,
            tx_buf: [0; XFER_BUFFER_LEN],
            tx_count: 0,
        }
    }

    #[must_use]
    pub fn control(&self) -> ControlWord {
        self.control
    }

    pub fn set_control(&mut self, control: ControlWord) {
        self.control = control;
    }

    #[must_use]
    pub fn rx_count(&self) -> usize {
        self.rx_count
    }

    /// Set the number of valid received bytes, clamped to the buffer capacity.
    pub fn set_rx_count(&mut self, count: usize) {
        self.rx_count = count.min(XFER_BUFFER_LEN);
    }

    /// Bytes received by the last transfer.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        self.rx_buf.get(..self.rx_count).unwrap_or_default()
    }

    /// Whole receive array, for drivers filling it.
    pub fn rx_buffer_mut(&mut self) -> &mut [u8; XFER_BUFFER_LEN] {
        &mut self.rx_buf
    }

    /// Copy `data` into the receive buffer and set the count accordingly.
    ///
    /// Bytes beyond the buffer capacity are dropped.
    pub fn fill_received(&mut self, data: &[u8]) {
        let mut count = 0;
        for (dst, src) in self.rx_buf.iter_mut().zip(data) {
            *dst = *src;
            count += 1;
        }
        self.rx_count = count;
    }

    #[must_use]
    pub fn tx_count(&self) -> usize {
        self.tx_count
    }

    /// Bytes queued for the next transfer.
    #[must_use]
    pub fn transmit(&self) -> &[u8] {
        self.tx_buf.get(..self.tx_count).unwrap_or_default()
    }

    /// Whole transmit array, including the bytes beyond `tx_count`.
    #[must_use]
    pub fn tx_buffer(&self) -> &[u8; XFER_BUFFER_LEN] {
        &self.tx_buf
    }

    /// Reset `tx_count` and zero the entire transmit capacity.
    ///
    /// Only clearing the used prefix would leave stale bytes that a later,
    /// longer reply does not overwrite.
    pub fn clear_transmit(&mut self) {
        self.tx_count = 0;
        self.tx_buf.fill(0);
    }

    /// Queue the ASCII-uppercased copy of the received bytes as the reply.
    ///
    /// Returns the number of bytes queued, which always equals `rx_count`.
    pub fn queue_uppercase_echo(&mut self) -> usize {
        let count = self.rx_count;
        for (dst, src) in self.tx_buf.iter_mut().zip(self.rx_buf.iter()).take(count) {
            *dst = src.to_ascii_uppercase();
        }
        self.tx_count = count;
        count
    }

    /// Let the driver shrink the queued count to what it actually sent.
    pub fn set_tx_count(&mut self, count: usize) {
        self.tx_count = count.min(XFER_BUFFER_LEN);
    }

    /// Queue raw reply bytes, truncated to the buffer capacity.
    pub fn queue_transmit(&mut self, data: &[u8]) -> usize {
        let mut count = 0;
        for (dst, src) in self.tx_buf.iter_mut().zip(data) {
            *dst = *src;
            count += 1;
        }
        self.tx_count = count;
        count
    }
}
