// Licensed under the Apache-2.0 license

//! # BSC driver contract
//!
//! The slave session never touches peripheral registers itself. Every
//! interaction goes through [`BscTransfer`], which mirrors the three calls
//! the peripheral library exposes: bring the GPIO/peripheral subsystem up,
//! perform one register-level transfer, tear the subsystem down.
//!
//! ```text
//! initialize()                 once, at process start
//! transfer(&mut record) ...    once per poll iteration
//! shutdown()                   once, at final teardown
//! ```

use super::common::TransferStatus;
use super::xfer::TransferRecord;

/// Register-level transfer interface of a BSC slave peripheral.
///
/// # Examples
///
/// ```rust,no_run
/// use bsc_echo_slave::bsc::{BscTransfer, ControlWord, TransferRecord};
///
/// fn open<D: BscTransfer>(driver: &mut D) -> Result<(), D::Error> {
///     let mut record = TransferRecord::new();
///     record.set_control(ControlWord::open(0x0f));
///     record.clear_transmit();
///     driver.transfer(&mut record)?;
///     Ok(())
/// }
/// ```
pub trait BscTransfer {
    /// Driver error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Bring up the peripheral subsystem.
    ///
    /// # Errors
    ///
    /// Returns an error if the subsystem could not be initialized; no
    /// transfer may be submitted in that case.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Submit one transfer.
    ///
    /// Applies `record.control()` to the peripheral, copies up to
    /// `record.tx_count()` bytes into the transmit FIFO and drains the
    /// receive FIFO into the record, updating `rx_count`.
    ///
    /// # Errors
    ///
    /// Returns an error when the driver rejects the submission (a negative
    /// status). For an open control word this means the slave address did
    /// not go live.
    fn transfer(&mut self, record: &mut TransferRecord) -> Result<TransferStatus, Self::Error>;

    /// Shut the peripheral subsystem down. Called once, after the final close.
    fn shutdown(&mut self);
}
