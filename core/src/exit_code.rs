//! Process exit codes (sysexits values).

/// The command completed successfully.
pub const OK: i32 = 0;

/// The user supplied invalid arguments or options.
pub const USAGE: i32 = 64;

/// Input data could not be converted or was malformed.
pub const DATA_ERROR: i32 = 65;

/// Internal software error; the default for unhandled execution faults.
pub const SOFTWARE: i32 = 70;
