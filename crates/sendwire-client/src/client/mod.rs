//! Blocking facade over the four `SendService` call shapes.
//!
//! [`SendClient`] is meant for straight-line code running on a plain thread
//! (or a `spawn_blocking` thread). Each streaming call spawns one pump task on
//! the runtime [`Handle`] that plays the transport side; the calling thread
//! blocks on a [`Rendezvous`](rendezvous::Rendezvous) until the pump hands
//! over a result.
//!
//! - [`collector`] - unary and server-stream calls.
//! - [`completion`] - client stream: send everything, then await once.
//! - [`round_trip`] - bidirectional: send one, await one.
//! - [`rendezvous`] - the single-slot hand-off both streaming adapters use.
//! - [`interceptor`] - outbound call logging.
//!
//! None of the methods may be called from inside an async context.

pub mod collector;
pub mod completion;
pub mod interceptor;
pub mod rendezvous;
pub mod round_trip;

use completion::{CompletionFuture, Outcome};
use core::time::Duration;
use interceptor::LoggingInterceptor;
use rendezvous::Rendezvous;
use round_trip::{Exchange, RoundTrip};
use sendwire_core::{
    Error,
    proto::{Envelope, send_service_client::SendServiceClient},
};
use std::sync::Arc;
use tokio::{runtime::Handle, sync::mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{
    codec::CompressionEncoding,
    service::interceptor::InterceptedService,
    transport::Channel,
};

/// Generated stub with the logging interceptor in front of the channel.
pub type SendServiceStub = SendServiceClient<InterceptedService<Channel, LoggingInterceptor>>;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Upper bound for each bidirectional step. `None` waits indefinitely.
    pub response_timeout: Option<Duration>,
    /// Capacity of the outbound channel of a streaming call.
    pub stream_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            response_timeout: None,
            stream_buffer_size: 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendClient {
    stub: SendServiceStub,
    handle: Handle,
    config: ClientConfig,
}

impl SendClient {
    /// Wraps `channel`; pump tasks are spawned on `handle`.
    pub fn new(channel: Channel, handle: Handle, config: ClientConfig) -> Self {
        let stub = SendServiceClient::with_interceptor(channel, LoggingInterceptor::default())
            .send_compressed(CompressionEncoding::Zstd)
            .accept_compressed(CompressionEncoding::Zstd);
        Self {
            stub,
            handle,
            config,
        }
    }

    /// Unary call: `["Hello", login, "!"]` for a valid login.
    ///
    /// # Errors
    ///
    /// The remote error, classified into the shared taxonomy.
    pub fn call(&self, login: &str) -> Result<Vec<String>, Error> {
        self.call_with(Envelope::wrap(login))
    }

    /// Unary call with a caller-built envelope.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub fn call_with(&self, envelope: Envelope) -> Result<Vec<String>, Error> {
        self.handle
            .block_on(collector::unary(self.stub.clone(), envelope))
    }

    /// Server stream, flattened: `["Hello", login, "!"]` for a valid login.
    ///
    /// # Errors
    ///
    /// The first remote error; partial data is discarded.
    pub fn get_stream(&self, login: &str) -> Result<Vec<String>, Error> {
        self.get_stream_with(Envelope::wrap(login))
    }

    /// Server stream with a caller-built envelope.
    ///
    /// # Errors
    ///
    /// Same as [`get_stream`](Self::get_stream).
    pub fn get_stream_with(&self, envelope: Envelope) -> Result<Vec<String>, Error> {
        self.handle
            .block_on(collector::server_stream(self.stub.clone(), envelope))
    }

    /// Opens a client-streaming call.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalAdapterUse`] only if the fresh slot cannot be armed,
    /// which would be a bug.
    pub fn open_put_stream(&self) -> Result<CompletionFuture, Error> {
        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let slot = Arc::new(Rendezvous::new());
        slot.arm()?;
        let outcome = Arc::new(Outcome::default());

        let mut stub = self.stub.clone();
        let pump_slot = Arc::clone(&slot);
        let pump_outcome = Arc::clone(&outcome);
        self.handle.spawn(async move {
            let fired = match stub.put_stream(ReceiverStream::new(rx)).await {
                Ok(response) => {
                    let response = response.into_inner();
                    tracing::info!("Received <-\n{response:?}");
                    pump_outcome.finish(true);
                    pump_slot.fire(response.messages)
                }
                Err(status) => {
                    tracing::warn!("Client stream failed: {}", status.message());
                    pump_outcome.finish(false);
                    pump_slot.fire_error(status.into())
                }
            };
            if let Err(e) = fired {
                tracing::error!("Lost client-stream result: {e}");
            }
        });

        Ok(CompletionFuture::new(tx, slot, outcome))
    }

    /// Streams every login, then blocks for the aggregate
    /// `["Hello", ..logins, "!"]`.
    ///
    /// Logins left unsent when the remote side ends the call early are
    /// dropped silently; the remote error is returned instead.
    ///
    /// # Errors
    ///
    /// The remote error, classified into the shared taxonomy.
    pub fn put_stream<I, S>(&self, logins: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.put_stream_with(logins.into_iter().map(Envelope::wrap))
    }

    /// Client stream with caller-built envelopes.
    ///
    /// # Errors
    ///
    /// Same as [`put_stream`](Self::put_stream).
    pub fn put_stream_with<I>(&self, envelopes: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = Envelope>,
    {
        let mut future = self.open_put_stream()?;
        for envelope in envelopes {
            if !future.offer(envelope) {
                break;
            }
        }
        future.complete();
        future.get()
    }

    /// Opens a bidirectional call driven one step at a time.
    pub fn open_exchange(&self) -> RoundTrip {
        let (tx, rx) = mpsc::channel(self.config.stream_buffer_size);
        let exchange = Arc::new(Exchange::default());

        let mut stub = self.stub.clone();
        let pump = Arc::clone(&exchange);
        self.handle.spawn(async move {
            let mut inbound = match stub.stream_call(ReceiverStream::new(rx)).await {
                Ok(response) => response.into_inner(),
                Err(status) => return pump.end(status.into()),
            };

            loop {
                match inbound.message().await {
                    Ok(Some(response)) => pump.deliver(response),
                    Ok(None) => {
                        tracing::info!("Exchange complete");
                        return pump.end(Error::ChannelError {
                            context: "response stream ended".into(),
                        });
                    }
                    Err(status) => return pump.end(status.into()),
                }
            }
        });

        RoundTrip::new(tx, exchange, self.config.response_timeout)
    }

    /// Sends each login and waits for its `[seq, login]` reply before
    /// sending the next one; returns all replies flattened.
    ///
    /// # Errors
    ///
    /// The error of the first failing step. Later logins are never sent.
    pub fn stream_call<I, S>(&self, logins: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stream_call_with(logins.into_iter().map(Envelope::wrap))
    }

    /// Bidirectional call with caller-built envelopes.
    ///
    /// # Errors
    ///
    /// Same as [`stream_call`](Self::stream_call).
    pub fn stream_call_with<I>(&self, envelopes: I) -> Result<Vec<String>, Error>
    where
        I: IntoIterator<Item = Envelope>,
    {
        let mut exchange = self.open_exchange();
        let mut messages = Vec::new();
        for envelope in envelopes {
            messages.extend(exchange.step(envelope)?.messages);
        }
        exchange.finish();
        Ok(messages)
    }
}
