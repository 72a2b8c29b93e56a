// Licensed under the Apache-2.0 license

//! I2C echo slave session.
//!
//! The session opens the BSC slave at a fixed address, polls it continuously
//! and answers every data message with its ASCII-uppercased copy. Shutdown is
//! driven by an interrupt signal; see [`shutdown`] for how the interrupt
//! handler and the poll loop share the teardown.

pub mod error;
pub mod session;
pub mod shutdown;
pub mod slave_loop;

pub use error::SlaveError;
pub use session::{SessionLifecycle, SessionState};
pub use shutdown::{handle_interrupt, teardown, wait_torn_down, ShutdownSignal, TEARDOWN_GRACE};
pub use slave_loop::{LoopState, PollOutcome, SessionEnd, SlaveLoop};
