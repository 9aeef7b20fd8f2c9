//! Utility functions for formatting and time.

pub mod formatting;
pub mod helpers;

pub use formatting::{truncate_id, without_0x_prefix};
pub use helpers::current_timestamp_ms;
