// Licensed under the Apache-2.0 license

//! Broadcom Serial Controller (BSC) slave peripheral.
//!
//! This module provides the register-level vocabulary of the BSC slave block
//! (control word, status flags, transfer record) together with the driver
//! contract used by the slave session and the available driver backends.

pub mod common;
pub mod control;
#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "pigpio")]
pub mod pigpio;
pub mod simulated;
pub mod traits;
pub mod xfer;

pub use common::{
    ConfigurationError, SlaveConfig, SlaveConfigBuilder, StatusFlags, TransferStatus,
    DEFAULT_SLAVE_ADDRESS, FIFO_DEPTH, OVERFLOW_THRESHOLD, XFER_BUFFER_LEN,
};
pub use control::{ControlFlags, ControlWord};
pub use simulated::SimulatedBsc;
pub use traits::BscTransfer;
pub use xfer::TransferRecord;
