//! Wire constants shared by the server handlers and their tests.

/// First fragment of every greeting and of every client-stream aggregate.
pub const MARKER: &str = "Hello";

/// Last fragment of every greeting and of every client-stream aggregate.
pub const TERMINATOR: &str = "!";

/// A login starts with a letter, followed by 3 to 15 letters, digits, dots or
/// hyphens.
pub const LOGIN_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9.-]{3,15}$";
