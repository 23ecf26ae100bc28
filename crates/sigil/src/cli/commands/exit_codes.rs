//! Exit codes shared by every command.

/// Successful operation.
pub const EXIT_SUCCESS: i32 = 0;

/// The signer declined, the caller cancelled, or a signature did not match
/// the expected identity.
pub const EXIT_REJECTED: i32 = 1;

/// General error (configuration, I/O, invalid input, etc.).
pub const EXIT_ERROR: i32 = 2;
