// Licensed under the Apache-2.0 license

/// Errors that end a slave session before polling starts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlaveError<E> {
    /// The peripheral subsystem could not be initialized
    InitFailed(E),
    /// The driver rejected the open control word; the address is not live
    OpenRejected(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for SlaveError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InitFailed(err) => write!(f, "peripheral initialization failed: {err:?}"),
            Self::OpenRejected(err) => write!(f, "failed to open slave: {err:?}"),
        }
    }
}

impl<E: embedded_hal::i2c::Error> SlaveError<E> {
    /// Underlying driver error kind
    pub fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        match self {
            Self::InitFailed(err) | Self::OpenRejected(err) => err.kind(),
        }
    }
}
