// Licensed under the Apache-2.0 license

//! BSC control word.
//!
//! The control word handed to the driver carries the slave address in bits
//! 16-22 and the BSC control register flags in bits 0-13; the flag bits are
//! copied unchanged into the peripheral's CR register.
//!
//! ```text
//! 22 21 20 19 18 17 16 15 14 13 12 11 10 09 08 07 06 05 04 03 02 01 00
//!  a  a  a  a  a  a  a  -  - IT HC TF IR RE TE BK EC ES PL PH I2 SP EN
//! ```

use bitflags::bitflags;
use embedded_hal::i2c::SevenBitAddress;

bitflags! {
    /// BSC control register flags (bits 0-13 of the control word).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u32 {
        /// Enable the BSC peripheral
        const ENABLE = 1 << 0;
        /// Enable SPI mode
        const SPI = 1 << 1;
        /// Enable I2C mode
        const I2C = 1 << 2;
        /// SPI clock phase high
        const SPI_PHASE = 1 << 3;
        /// SPI clock polarity high
        const SPI_POLARITY = 1 << 4;
        /// Send the status register as first I2C byte
        const SEND_STATUS = 1 << 5;
        /// Send the control register as first I2C byte
        const SEND_CONTROL = 1 << 6;
        /// Abort the current operation and clear both FIFOs
        const BREAK = 1 << 7;
        /// Enable transmit
        const TRANSMIT = 1 << 8;
        /// Enable receive
        const RECEIVE = 1 << 9;
        /// Invert receive status flags
        const INVERT_RX = 1 << 10;
        /// Enable test FIFO
        const TEST_FIFO = 1 << 11;
        /// Enable host control
        const HOST_CONTROL = 1 << 12;
        /// Invert transmit status flags
        const INVERT_TX = 1 << 13;
    }
}

const ADDRESS_SHIFT: u32 = 16;
const ADDRESS_MASK: u32 = 0x7f;

/// Value submitted with every transfer to configure the peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct ControlWord(u32);

impl ControlWord {
    /// Flags of a live I2C slave session.
    pub const OPEN_FLAGS: ControlFlags = ControlFlags::RECEIVE
        .union(ControlFlags::TRANSMIT)
        .union(ControlFlags::I2C)
        .union(ControlFlags::ENABLE);

    /// Flags that abort the session and flush the FIFOs.
    pub const CLOSE_FLAGS: ControlFlags = ControlFlags::BREAK;

    /// Build the control word for opening or closing the slave at `address`.
    ///
    /// `address` must be a 7-bit value. Wider values are not checked and spill
    /// into the unused bits above the address field.
    #[must_use]
    pub const fn build(address: SevenBitAddress, open: bool) -> Self {
        let flags = if open {
            Self::OPEN_FLAGS
        } else {
            Self::CLOSE_FLAGS
        };
        Self(((address as u32) << ADDRESS_SHIFT) | flags.bits())
    }

    #[must_use]
    pub const fn open(address: SevenBitAddress) -> Self {
        Self::build(address, true)
    }

    #[must_use]
    pub const fn close(address: SevenBitAddress) -> Self {
        Self::build(address, false)
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Slave address field (bits 16-22).
    #[must_use]
    pub const fn address(self) -> SevenBitAddress {
        ((self.0 >> ADDRESS_SHIFT) & ADDRESS_MASK) as SevenBitAddress
    }

    /// Control register flags (bits 0-13).
    #[must_use]
    pub const fn flags(self) -> ControlFlags {
        ControlFlags::from_bits_truncate(self.0)
    }

    /// True when the word keeps the peripheral enabled in I2C mode.
    #[must_use]
    pub const fn is_open(self) -> bool {
        self.flags().contains(ControlFlags::ENABLE.union(ControlFlags::I2C))
    }

    /// True when the word aborts the session.
    #[must_use]
    pub const fn is_close(self) -> bool {
        self.flags().contains(ControlFlags::BREAK) && !self.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_word_for_every_address() {
        for address in 0..=0x7f_u8 {
            let word = ControlWord::build(address, true);
            let flags = word.flags();

            assert!(flags.contains(ControlFlags::ENABLE));
            assert!(flags.contains(ControlFlags::I2C));
            assert!(flags.contains(ControlFlags::RECEIVE));
            assert!(flags.contains(ControlFlags::TRANSMIT));
            assert!(!flags.contains(ControlFlags::BREAK));
            assert_eq!(word.address(), address);
            assert!(word.is_open());
        }
    }

    #[test]
    fn test_close_word_for_every_address() {
        for address in 0..=0x7f_u8 {
            let word = ControlWord::build(address, false);
            let flags = word.flags();

            assert!(flags.contains(ControlFlags::BREAK));
            assert!(!flags.contains(ControlFlags::I2C));
            assert!(!flags.contains(ControlFlags::ENABLE));
            assert_eq!(word.address(), address);
            assert!(word.is_close());
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(ControlWord::open(0x0f).bits(), 0x000f_0305);
        assert_eq!(ControlWord::close(0x0f).bits(), 0x000f_0080);
    }

    #[test]
    fn test_address_and_flags_do_not_overlap() {
        let all_flags = ControlFlags::all().bits();
        let address_field = ADDRESS_MASK << ADDRESS_SHIFT;

        assert_eq!(all_flags & address_field, 0);
        assert_eq!(all_flags, 0x3fff);
    }

    #[test]
    fn test_unused_mode_flags_stay_clear() {
        let unused = ControlFlags::SPI
            | ControlFlags::SPI_PHASE
            | ControlFlags::SPI_POLARITY
            | ControlFlags::SEND_STATUS
            | ControlFlags::SEND_CONTROL
            | ControlFlags::INVERT_RX
            | ControlFlags::TEST_FIFO
            | ControlFlags::HOST_CONTROL
            | ControlFlags::INVERT_TX;

        assert!(!ControlWord::open(0x0f).flags().intersects(unused));
        assert!(!ControlWord::close(0x0f).flags().intersects(unused));
    }
}
