//! "Send everything, then wait once" adapter for client-streaming calls.

use super::rendezvous::Rendezvous;
use core::time::Duration;
use sendwire_core::{Error, proto::Envelope};
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tokio::sync::mpsc;

const PENDING: u8 = 0;
const DONE: u8 = 1;
const CANCELLED: u8 = 2;

/// How a client-streaming call ended, shared between the pump task that
/// observes the transport and the caller.
#[derive(Debug, Default)]
pub(crate) struct Outcome(AtomicU8);

impl Outcome {
    pub(crate) fn finish(&self, ok: bool) {
        self.0
            .store(if ok { DONE } else { CANCELLED }, Ordering::Release);
    }

    fn get(&self) -> u8 {
        self.0.load(Ordering::Acquire)
    }
}

/// Caller side of an open client-streaming call.
///
/// Envelopes are pushed with [`offer`](Self::offer); the single aggregate
/// result (or the remote error) is taken with [`get`](Self::get). Once the
/// remote side has ended the call, further offers are dropped.
#[derive(Debug)]
pub struct CompletionFuture {
    tx: Option<mpsc::Sender<Envelope>>,
    slot: Arc<Rendezvous<Vec<String>>>,
    outcome: Arc<Outcome>,
}

impl CompletionFuture {
    pub(crate) fn new(
        tx: mpsc::Sender<Envelope>,
        slot: Arc<Rendezvous<Vec<String>>>,
        outcome: Arc<Outcome>,
    ) -> Self {
        Self {
            tx: Some(tx),
            slot,
            outcome,
        }
    }

    /// Sends one envelope unless the call has already ended.
    ///
    /// Returns `false` if the envelope was not sent: the remote side already
    /// answered or failed, or [`complete`](Self::complete) was called.
    /// Blocks while the outbound buffer is full.
    pub fn offer(&mut self, envelope: Envelope) -> bool {
        if self.outcome.get() != PENDING {
            tracing::debug!(request_id = %envelope.request_id, "Call already ended, dropping item");
            return false;
        }
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };

        tracing::info!("Sending ->\n{envelope:?}");
        tx.blocking_send(envelope).is_ok()
    }

    /// Signals that no more envelopes follow.
    pub fn complete(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("Client stream completed");
        }
    }

    /// Completes the stream if needed and blocks for the aggregate result.
    ///
    /// # Errors
    ///
    /// The remote error, classified into the shared taxonomy.
    pub fn get(mut self) -> Result<Vec<String>, Error> {
        self.complete();
        tracing::info!("Waiting for the aggregate response");
        self.slot.wait()
    }

    /// Like [`get`](Self::get) but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// [`Error::TimeoutExceeded`] if no result arrived in time, otherwise the
    /// remote error.
    pub fn get_timeout(mut self, timeout: Duration) -> Result<Vec<String>, Error> {
        self.complete();
        self.slot.wait_timeout(timeout)
    }

    /// Always fails: an in-flight call cannot be taken back.
    ///
    /// # Errors
    ///
    /// Always [`Error::IllegalAdapterUse`].
    pub fn cancel(&self) -> Result<(), Error> {
        Err(Error::illegal("client-stream calls cannot be cancelled"))
    }

    /// `true` once the call completed with a result.
    pub fn is_done(&self) -> bool {
        self.outcome.get() == DONE
    }

    /// `true` once the remote side failed the call.
    pub fn is_cancelled(&self) -> bool {
        self.outcome.get() == CANCELLED
    }
}
