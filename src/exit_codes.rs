//! Exit code constants for the slate CLI.
//!
//! The launcher contract is deliberately coarse: 0 for success, 1 for any
//! reported error, including usage errors. Wrapper scripts and the tracker
//! integration only distinguish "worked" from "did not work".

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Any reported failure, from usage errors to provisioning failures.
pub const FAILURE: i32 = 1;
