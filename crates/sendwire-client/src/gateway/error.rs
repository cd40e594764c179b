use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sendwire_core::Error;
use tokio::task::JoinError;

/// Failure of a gateway request.
///
/// Validation failures become `400` with the validator's description as the
/// body; everything else becomes `500` with the raw error message.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Rpc(#[from] Error),

    #[error("Blocking call panicked or was cancelled: {0}")]
    Join(#[from] JoinError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Rpc(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Call to the send service failed: {self}");
        } else {
            tracing::warn!("Rejected by the send service: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendwire_core::ValidationError;

    #[test]
    fn validation_failures_are_bad_requests() {
        for v in [ValidationError::MissingPayload, ValidationError::PatternMismatch] {
            let err = GatewayError::from(Error::from(v));
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.to_string(), v.to_string());
        }
    }

    #[test]
    fn everything_else_is_internal() {
        let err = GatewayError::from(Error::Remote(tonic::Status::unavailable("down")));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = GatewayError::from(Error::TimeoutExceeded {
            waited: core::time::Duration::from_secs(1),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
