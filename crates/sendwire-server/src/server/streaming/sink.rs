use super::Phase;
use sendwire_core::{
    Error,
    proto::{AggregateResponse, Envelope},
    types::{MARKER, TERMINATOR},
    validate::validate,
};

/// Server-side state for one `PutStream` call.
///
/// Validated logins are appended in arrival order. The first invalid item
/// moves the sink to [`Phase::Error`], drops everything accumulated so far
/// and is reported back to the caller; there is no partial success. When the
/// inbound stream completes cleanly the sink produces exactly one
/// [`AggregateResponse`] shaped `[MARKER, ..accumulated, TERMINATOR]`.
#[derive(Debug)]
pub struct ClientStreamSink {
    phase: Phase,
    accumulated: Vec<String>,
    max_items: usize,
}

impl ClientStreamSink {
    /// Creates an idle sink that accepts at most `max_items` items.
    pub const fn new(max_items: usize) -> Self {
        Self {
            phase: Phase::Idle,
            accumulated: Vec::new(),
            max_items,
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Logins accepted so far, in arrival order.
    pub fn accumulated(&self) -> &[String] {
        &self.accumulated
    }

    /// Marks the inbound stream as open.
    pub fn open(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Receiving;
        }
    }

    /// Processes one inbound item.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the item fails validation. The sink is
    ///   terminal afterwards.
    /// - [`Error::TooManyItems`] once `max_items` items were accepted.
    /// - [`Error::IllegalAdapterUse`] if the sink is already terminal.
    pub fn on_next(&mut self, envelope: &Envelope) -> Result<(), Error> {
        self.ensure_live("item")?;
        self.open();

        let login = match validate(envelope) {
            Ok(login) => login,
            Err(e) => return Err(self.fail(e.into())),
        };

        if self.accumulated.len() >= self.max_items {
            return Err(self.fail(Error::TooManyItems {
                limit: self.max_items,
            }));
        }

        self.accumulated.push(login.to_owned());
        self.phase = Phase::Accumulating;
        Ok(())
    }

    /// Finishes the call and returns the aggregate response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalAdapterUse`] if the sink is already terminal.
    pub fn on_completed(&mut self) -> Result<AggregateResponse, Error> {
        self.ensure_live("completion")?;
        self.phase = Phase::Completed;

        let accumulated = core::mem::take(&mut self.accumulated);
        let mut messages = Vec::with_capacity(accumulated.len() + 2);
        messages.push(MARKER.to_owned());
        messages.extend(accumulated);
        messages.push(TERMINATOR.to_owned());
        Ok(AggregateResponse { messages })
    }

    /// The inbound transport failed; abandon the call.
    pub fn on_error(&mut self) {
        self.accumulated.clear();
        self.phase = Phase::Error;
    }

    fn fail(&mut self, err: Error) -> Error {
        self.on_error();
        err
    }

    fn ensure_live(&self, event: &str) -> Result<(), Error> {
        if self.phase.is_terminal() {
            return Err(Error::illegal(format!(
                "client-stream sink received {event} in terminal phase {:?}",
                self.phase
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendwire_core::ValidationError;

    fn feed(sink: &mut ClientStreamSink, logins: &[&str]) -> Result<(), Error> {
        for login in logins {
            sink.on_next(&Envelope::wrap(*login))?;
        }
        Ok(())
    }

    #[test]
    fn aggregates_in_arrival_order() {
        let mut sink = ClientStreamSink::new(16);
        sink.open();
        feed(&mut sink, &["abcd", "efgh", "ijkl"]).unwrap();
        assert_eq!(sink.phase(), Phase::Accumulating);

        let response = sink.on_completed().unwrap();
        assert_eq!(response.messages, ["Hello", "abcd", "efgh", "ijkl", "!"]);
        assert_eq!(sink.phase(), Phase::Completed);
    }

    #[test]
    fn empty_stream_yields_marker_and_terminator() {
        let mut sink = ClientStreamSink::new(16);
        sink.open();
        assert_eq!(sink.on_completed().unwrap().messages, ["Hello", "!"]);
    }

    #[test]
    fn first_invalid_item_aborts_everything() {
        let mut sink = ClientStreamSink::new(16);
        let err = feed(&mut sink, &["sml", "normal1", "normal2", "normal3"]).unwrap_err();

        assert_eq!(err.as_validation(), Some(ValidationError::PatternMismatch));
        assert_eq!(sink.phase(), Phase::Error);
        assert!(sink.accumulated().is_empty());
    }

    #[test]
    fn late_invalid_item_discards_partial_accumulation() {
        let mut sink = ClientStreamSink::new(16);
        let err = feed(&mut sink, &["normal1", "sml", "normal2"]).unwrap_err();

        assert_eq!(err.as_validation(), Some(ValidationError::PatternMismatch));
        assert!(sink.accumulated().is_empty());
    }

    #[test]
    fn terminal_sink_refuses_further_events() {
        let mut sink = ClientStreamSink::new(16);
        let _ = sink.on_next(&Envelope::without_payload());
        assert!(matches!(
            sink.on_next(&Envelope::wrap("normal1")),
            Err(Error::IllegalAdapterUse { .. })
        ));
        assert!(matches!(
            sink.on_completed(),
            Err(Error::IllegalAdapterUse { .. })
        ));
    }

    #[test]
    fn missing_payload_is_reported_as_such() {
        let mut sink = ClientStreamSink::new(16);
        let err = sink.on_next(&Envelope::without_payload()).unwrap_err();
        assert_eq!(err.as_validation(), Some(ValidationError::MissingPayload));
    }

    #[test]
    fn item_limit_is_enforced() {
        let mut sink = ClientStreamSink::new(2);
        let err = feed(&mut sink, &["abcd", "efgh", "ijkl"]).unwrap_err();
        assert!(matches!(err, Error::TooManyItems { limit: 2 }));
        assert_eq!(sink.phase(), Phase::Error);
    }
}
