//! Exit codes for the `relic` binary. Scripts depend on these.
//!
//! Library errors map through `RelicError::exit_code`, which also yields 2
//! for signing failures and 6 for storage errors.

pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 1; // Unreadable file, bad JSON, malformed key
pub const REJECTED: i32 = 4; // Addon or transfer failed verification
