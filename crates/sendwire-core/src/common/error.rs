//! Error types for the `SendService` call shapes.
//!
//! This module defines the central `Error` enum shared by the server handlers
//! and the client adapters. It converts both ways with `tonic::Status`:
//! handlers turn an `Error` into a stream-level status for the in-flight call,
//! and client adapters classify the status they receive back into the same
//! taxonomy.
//!
//! ## Error Cases
//! - `Validation`: The login failed the validator (missing or malformed).
//! - `Remote`: Any other status reported by the remote side, kept as-is.
//! - `TimeoutExceeded`: A bounded wait elapsed before a response arrived.
//! - `IllegalAdapterUse`: A rendezvous or adapter contract was violated.
//! - `ChannelError`: An internal hand-off channel closed unexpectedly.
//! - `TooManyItems`: A client stream exceeded the configured item limit.
//! - `ServiceShutdown`: A call arrived while the service was shutting down.

use crate::types::LOGIN_PATTERN;
use core::time::Duration;
use tonic::{Code, Status};

/// Why a single request failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The envelope carried no login at all.
    #[error("Request payload is missing")]
    MissingPayload,

    /// The login is present but does not match [`LOGIN_PATTERN`].
    #[error("Login does not match pattern: {}", LOGIN_PATTERN)]
    PatternMismatch,
}

impl ValidationError {
    /// Stable, machine-readable name of the failure kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingPayload => "missing_payload",
            Self::PatternMismatch => "pattern_mismatch",
        }
    }
}

impl From<ValidationError> for Status {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::MissingPayload => Status::data_loss(err.to_string()),
            ValidationError::PatternMismatch => Status::invalid_argument(err.to_string()),
        }
    }
}

/// Unified error type for the `SendService` client adapters and handlers.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The request was rejected by the validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The remote side failed the call with a status we do not interpret.
    #[error("Remote error: {}", .0.message())]
    Remote(Status),

    /// A bounded wait elapsed without the slot being fired.
    #[error("Timed out after {waited:?} waiting for a response")]
    TimeoutExceeded { waited: Duration },

    /// A programming-contract violation, e.g. firing a rendezvous twice or
    /// cancelling a completion future.
    #[error("Illegal adapter use: {context}")]
    IllegalAdapterUse { context: String },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The client stream carried more items than the server accepts.
    #[error("Stream exceeded the limit of {limit} items")]
    TooManyItems { limit: usize },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// Shorthand for [`Error::IllegalAdapterUse`].
    pub fn illegal(context: impl Into<String>) -> Self {
        Self::IllegalAdapterUse {
            context: context.into(),
        }
    }

    /// Returns the validation failure if this error is one.
    pub const fn as_validation(&self) -> Option<ValidationError> {
        match self {
            Self::Validation(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(v) => v.into(),
            Error::Remote(status) => status,
            Error::TimeoutExceeded { .. } => Status::deadline_exceeded(err.to_string()),
            Error::IllegalAdapterUse { context } => {
                Status::internal(format!("Illegal adapter use: {context}"))
            }
            Error::ChannelError { context } => {
                Status::internal(format!("Channel error: {context}"))
            }
            Error::TooManyItems { .. } => Status::resource_exhausted(err.to_string()),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}

/// Classifies a status received from the remote side.
///
/// `INVALID_ARGUMENT` and `DATA_LOSS` are the two codes the handlers use for
/// validation failures; every other status is kept untouched.
impl From<Status> for Error {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::InvalidArgument => Self::Validation(ValidationError::PatternMismatch),
            Code::DataLoss => Self::Validation(ValidationError::MissingPayload),
            _ => Self::Remote(status),
        }
    }
}
