//! Login validation shared by every server handler.

use crate::{ValidationError, proto::Envelope, types::LOGIN_PATTERN};
use regex::Regex;
use std::sync::LazyLock;

static LOGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOGIN_PATTERN).expect("LOGIN_PATTERN is a valid regex"));

/// Returns `true` if `login` matches [`LOGIN_PATTERN`].
pub fn is_valid_login(login: &str) -> bool {
    LOGIN.is_match(login)
}

/// Validates a single envelope and returns its login.
///
/// # Errors
///
/// - [`ValidationError::MissingPayload`] if the envelope has no login.
/// - [`ValidationError::PatternMismatch`] if the login does not match
///   [`LOGIN_PATTERN`].
pub fn validate(envelope: &Envelope) -> Result<&str, ValidationError> {
    let login = envelope
        .login
        .as_deref()
        .ok_or(ValidationError::MissingPayload)?;

    if is_valid_login(login) {
        Ok(login)
    } else {
        Err(ValidationError::PatternMismatch)
    }
}
