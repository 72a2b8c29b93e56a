// Licensed under the Apache-2.0 license

//! BSC slave backend on top of the pigpio C library.
//!
//! `bscXfer` takes a `bsc_xfer_t`:
//!
//! ```text
//! offset  field
//! 0       uint32_t control
//! 4       int      rxCnt
//! 8       char     rxBuf[512]
//! 520     int      txCnt
//! 524     char     txBuf[512]
//! ```
//!
//! The record is copied into that layout before the call and the receive half
//! is copied back afterwards.

use core::ffi::c_int;

use embedded_hal::i2c::ErrorKind;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use super::common::{TransferStatus, XFER_BUFFER_LEN};
use super::traits::BscTransfer;
use super::xfer::TransferRecord;

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout)]
struct RawXfer {
    control: u32,
    rx_cnt: c_int,
    rx_buf: [u8; XFER_BUFFER_LEN],
    tx_cnt: c_int,
    tx_buf: [u8; XFER_BUFFER_LEN],
}

const _: () = assert!(core::mem::size_of::<RawXfer>() == 8 + 2 * XFER_BUFFER_LEN + 4);

/// `gpioCfgSetInternals` bit that keeps the library from installing its own
/// signal handlers.
pub const PI_CFG_NOSIGHANDLER: u32 = 1 << 10;

#[link(name = "pigpio")]
extern "C" {
    fn gpioCfgGetInternals() -> u32;
    fn gpioCfgSetInternals(cfg: u32) -> c_int;
    fn gpioInitialise() -> c_int;
    fn gpioTerminate();
    fn bscXfer(xfer: *mut RawXfer) -> c_int;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PigpioError {
    /// `gpioInitialise` failed with this code
    Initialise(i32),
    /// `bscXfer` rejected the transfer with this code
    Transfer(i32),
}

impl core::fmt::Display for PigpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Initialise(code) => write!(f, "gpioInitialise failed ({code})"),
            Self::Transfer(code) => write!(f, "bscXfer failed ({code})"),
        }
    }
}

impl embedded_hal::i2c::Error for PigpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Handle on the process-wide pigpio BSC slave.
///
/// The library keeps all state itself, so handles are freely copied; the
/// interrupt listener gets its own.
#[derive(Copy, Clone, Debug, Default)]
pub struct PigpioBsc;

impl PigpioBsc {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn without_signal_handlers(internals: u32) -> u32 {
    internals | PI_CFG_NOSIGHANDLER
}

impl BscTransfer for PigpioBsc {
    type Error = PigpioError;

    /// Start the library with its signal handlers switched off.
    ///
    /// Left enabled, `gpioInitialise` installs handlers for SIGINT and SIGTERM
    /// that terminate the library and exit with status 255 from signal
    /// context, before the slave has been closed. Signals are handled by
    /// [`crate::signal::InterruptListener`] instead.
    fn initialize(&mut self) -> Result<(), Self::Error> {
        // SAFETY: plain calls into the C library; no pointers are passed
        let version = unsafe {
            gpioCfgSetInternals(without_signal_handlers(gpioCfgGetInternals()));
            gpioInitialise()
        };
        if version < 0 {
            return Err(PigpioError::Initialise(version));
        }
        Ok(())
    }

    fn transfer(&mut self, record: &mut TransferRecord) -> Result<TransferStatus, Self::Error> {
        let mut raw = RawXfer::new_zeroed();
        raw.control = record.control().bits();
        raw.tx_buf.copy_from_slice(record.tx_buffer());
        raw.tx_cnt = c_int::try_from(record.tx_count()).unwrap_or(c_int::MAX);

        // SAFETY: `raw` is a live, exclusively borrowed `bsc_xfer_t` for the
        // whole call and the library does not keep the pointer
        let status = unsafe { bscXfer(&mut raw) };

        let count = usize::try_from(raw.rx_cnt).unwrap_or(0);
        record.rx_buffer_mut().copy_from_slice(&raw.rx_buf);
        record.set_rx_count(count);

        TransferStatus::from_raw(status).ok_or(PigpioError::Transfer(status))
    }

    fn shutdown(&mut self) {
        // SAFETY: plain call into the C library
        unsafe { gpioTerminate() };
    }
}
