use super::Phase;
use sendwire_core::{
    Error,
    proto::{AggregateResponse, Envelope},
    validate::validate,
};

/// Server-side state for one `StreamCall` exchange.
///
/// Every valid item is answered immediately with `[sequence, login]`, where
/// `sequence` is the 1-based index of the response within this exchange.
/// An invalid item is answered with its validation error instead and does not
/// consume a sequence number.
///
/// Unlike [`ClientStreamSink`](super::sink::ClientStreamSink), a rejected item
/// does not end the exchange: the machine stays live and keeps answering
/// subsequent items. Only a failure of the inbound transport
/// ([`on_error`](Self::on_error)) or completion moves it to a terminal phase.
#[derive(Debug)]
pub struct TurnBasedEcho {
    phase: Phase,
    sequence: u64,
}

impl Default for TurnBasedEcho {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnBasedEcho {
    pub const fn new() -> Self {
        Self {
            phase: Phase::Idle,
            sequence: 0,
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of responses emitted so far.
    pub const fn emitted(&self) -> u64 {
        self.sequence
    }

    /// Marks the inbound stream as open.
    pub fn open(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Receiving;
        }
    }

    /// Answers one inbound item.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the item fails validation. The exchange
    ///   stays live.
    /// - [`Error::IllegalAdapterUse`] if the exchange is already terminal.
    pub fn on_next(&mut self, envelope: &Envelope) -> Result<AggregateResponse, Error> {
        self.ensure_live("item")?;
        self.open();

        let login = validate(envelope)?;
        self.sequence += 1;
        self.phase = Phase::Emitting;
        Ok(AggregateResponse::from_messages([
            self.sequence.to_string(),
            login.to_owned(),
        ]))
    }

    /// The inbound stream completed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IllegalAdapterUse`] if the exchange is already
    /// terminal.
    pub fn on_completed(&mut self) -> Result<(), Error> {
        self.ensure_live("completion")?;
        self.phase = Phase::Completed;
        Ok(())
    }

    /// The inbound transport failed; abandon the exchange.
    pub fn on_error(&mut self) {
        self.phase = Phase::Error;
    }

    fn ensure_live(&self, event: &str) -> Result<(), Error> {
        if self.phase.is_terminal() {
            return Err(Error::illegal(format!(
                "turn-based echo received {event} in terminal phase {:?}",
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

    #[test]
    fn sequence_matches_response_index() {
        let mut echo = TurnBasedEcho::new();
        echo.open();

        let logins = ["abcd", "efgh", "ijkl"];
        let mut flat = Vec::new();
        for login in logins {
            flat.extend(echo.on_next(&Envelope::wrap(login)).unwrap().messages);
        }

        assert_eq!(flat, ["1", "abcd", "2", "efgh", "3", "ijkl"]);
        assert_eq!(echo.emitted(), 3);
        assert_eq!(echo.phase(), Phase::Emitting);
    }

    #[test]
    fn rejected_item_does_not_end_the_exchange() {
        let mut echo = TurnBasedEcho::new();
        let outcomes: Vec<_> = ["normal1", "sml", "normal2", "normal3"]
            .into_iter()
            .map(|login| echo.on_next(&Envelope::wrap(login)))
            .collect();

        assert_eq!(outcomes[0].as_ref().unwrap().messages, ["1", "normal1"]);
        assert_eq!(
            outcomes[1].as_ref().unwrap_err().as_validation(),
            Some(ValidationError::PatternMismatch)
        );
        assert_eq!(outcomes[2].as_ref().unwrap().messages, ["2", "normal2"]);
        assert_eq!(outcomes[3].as_ref().unwrap().messages, ["3", "normal3"]);
    }

    #[test]
    fn completion_is_terminal() {
        let mut echo = TurnBasedEcho::new();
        echo.open();
        echo.on_completed().unwrap();

        assert_eq!(echo.phase(), Phase::Completed);
        assert!(matches!(
            echo.on_next(&Envelope::wrap("abcd")),
            Err(Error::IllegalAdapterUse { .. })
        ));
        assert!(echo.on_completed().is_err());
    }

    #[test]
    fn transport_error_is_terminal() {
        let mut echo = TurnBasedEcho::new();
        echo.on_error();
        assert!(echo.on_next(&Envelope::wrap("abcd")).is_err());
        assert_eq!(echo.emitted(), 0);
    }
}
