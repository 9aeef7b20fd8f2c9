//! Time helpers.
//!
//! Records and signer timestamps use milliseconds.

use chrono::Utc;

/// Current UNIX timestamp in milliseconds, 0 if the clock is before the epoch.
pub fn current_timestamp_ms() -> u64 {
	u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timestamp_is_milliseconds() {
		let millis = current_timestamp_ms();
		let secs = u64::try_from(Utc::now().timestamp()).unwrap();
		assert!(millis / 1000 <= secs);
		assert!(secs - millis / 1000 <= 1);
	}
}
