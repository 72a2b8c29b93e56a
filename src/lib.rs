// Licensed under the Apache-2.0 license

// Keep panic-prone patterns out of production code only
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::indexing_slicing))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(any(test, feature = "std")), no_std)]
pub mod bsc;
#[cfg(any(test, feature = "std"))]
pub mod delay;
#[cfg(feature = "std")]
pub mod signal;
pub mod slave;
