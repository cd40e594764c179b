//! Strict send-one/await-one adapter for bidirectional calls.
//!
//! Every step re-arms the shared [`Rendezvous`], sends one envelope and
//! blocks until the pump task fires the slot with the next inbound response.
//! Responses are matched to requests purely by order: a server that answered
//! out of order would have its replies attributed to the wrong step.

use super::rendezvous::Rendezvous;
use core::time::Duration;
use parking_lot::Mutex;
use sendwire_core::{
    Error,
    proto::{AggregateResponse, Envelope},
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport-side state shared with the pump task.
///
/// `ended` holds the error that finished the inbound stream. The pump takes
/// the lock before it inspects the slot, so a step that arms concurrently
/// either gets fired or sees `ended` afterwards.
#[derive(Debug, Default)]
pub(crate) struct Exchange {
    slot: Rendezvous<AggregateResponse>,
    ended: Mutex<Option<Error>>,
}

impl Exchange {
    /// Hands one inbound response to the step that is waiting for it.
    pub(crate) fn deliver(&self, response: AggregateResponse) {
        tracing::info!("Received <-\n{response:?}");
        if let Err(e) = self.slot.fire(response) {
            tracing::warn!("Dropping unsolicited response: {e}");
        }
    }

    /// Records why the inbound stream ended and wakes a pending step.
    pub(crate) fn end(&self, err: Error) {
        let mut ended = self.ended.lock();
        if self.slot.is_armed() {
            if let Err(e) = self.slot.fire_error(err.clone()) {
                tracing::error!("Failed to wake the pending step: {e}");
            }
        }
        *ended = Some(err);
    }

    fn ended(&self) -> Option<Error> {
        self.ended.lock().clone()
    }
}

/// Caller side of an open bidirectional call.
#[derive(Debug)]
pub struct RoundTrip {
    tx: Option<mpsc::Sender<Envelope>>,
    exchange: Arc<Exchange>,
    response_timeout: Option<Duration>,
}

impl RoundTrip {
    pub(crate) fn new(
        tx: mpsc::Sender<Envelope>,
        exchange: Arc<Exchange>,
        response_timeout: Option<Duration>,
    ) -> Self {
        Self {
            tx: Some(tx),
            exchange,
            response_timeout,
        }
    }

    /// Sends one envelope and blocks for its response.
    ///
    /// # Errors
    ///
    /// - The remote error for this step, classified into the shared
    ///   taxonomy. The caller should not send further items.
    /// - [`Error::TimeoutExceeded`] if `response_timeout` elapsed.
    /// - [`Error::ChannelError`] if the call ended before a response arrived.
    /// - [`Error::IllegalAdapterUse`] after [`finish`](Self::finish).
    pub fn step(&mut self, envelope: Envelope) -> Result<AggregateResponse, Error> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(Error::illegal("step after the exchange was finished"));
        };

        self.exchange.slot.arm()?;
        if let Some(err) = self.exchange.ended() {
            return Err(err);
        }

        tracing::info!("Sending ->\n{envelope:?}");
        if tx.blocking_send(envelope).is_err() {
            return Err(self.exchange.ended().unwrap_or_else(|| Error::ChannelError {
                context: "outbound stream closed".into(),
            }));
        }

        match self.response_timeout {
            Some(timeout) => self.exchange.slot.wait_timeout(timeout),
            None => self.exchange.slot.wait(),
        }
    }

    /// Completes the outbound stream.
    pub fn finish(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("Bidirectional stream completed");
        }
    }
}
