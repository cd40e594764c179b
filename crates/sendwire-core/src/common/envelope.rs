//! Correlation envelope and aggregate response helpers.
//!
//! Every call site wraps its login in a fresh [`Envelope`]: a UUID v4 request
//! id and the creation time are stamped once in [`Envelope::wrap`] and never
//! touched again by the adapters that send it.

use crate::{
    proto::{AggregateResponse, Envelope},
    types::{MARKER, TERMINATOR},
};
use prost_types::Timestamp;
use std::time::SystemTime;
use uuid::Uuid;

impl Envelope {
    /// Wraps `login` with a unique request id and the current time.
    pub fn wrap(login: impl Into<String>) -> Self {
        Self {
            login: Some(login.into()),
            ..Self::without_payload()
        }
    }

    /// An envelope with id and timestamp but no login.
    ///
    /// Handlers reject it with
    /// [`ValidationError::MissingPayload`](crate::ValidationError::MissingPayload).
    pub fn without_payload() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            request_time: Some(Timestamp::from(SystemTime::now())),
            login: None,
        }
    }
}

impl AggregateResponse {
    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// `[MARKER, login, TERMINATOR]`, the reply to a unary call.
    pub fn greeting(login: &str) -> Self {
        Self::from_messages([MARKER, login, TERMINATOR])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn wrap_stamps_unique_ids() {
        let ids: HashSet<_> = (0..1024)
            .map(|_| Envelope::wrap("abcd").request_id)
            .collect();
        assert_eq!(ids.len(), 1024);
    }

    #[test]
    fn wrap_sets_timestamp_and_payload() {
        let before = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let envelope = Envelope::wrap("abcd");
        let ts = envelope.request_time.unwrap();
        assert!(ts.seconds >= before);
        assert_eq!(envelope.login.as_deref(), Some("abcd"));
        assert!(Uuid::parse_str(&envelope.request_id).is_ok());
    }

    #[test]
    fn without_payload_leaves_login_unset() {
        let envelope = Envelope::without_payload();
        assert!(envelope.login.is_none());
        assert!(envelope.request_time.is_some());
    }

    #[test]
    fn greeting_shape() {
        assert_eq!(
            AggregateResponse::greeting("test-log").messages,
            ["Hello", "test-log", "!"]
        );
    }
}
