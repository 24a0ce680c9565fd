// src/utils/mod.rs
//! Utility modules for the bridge engine
//!
//! This module contains the time source and logging setup shared by all
//! bridge components.

mod clock;
mod logger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logger::{init_logger, init_test_logger};

/// Seconds in a UTC day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Day index of a unix timestamp
pub fn day_index(timestamp: u64) -> u64 {
    timestamp / SECONDS_PER_DAY
}
