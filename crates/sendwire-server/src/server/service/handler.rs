//! gRPC service implementation for the four `SendService` call shapes.
//!
//! [`GreetingService`] validates every inbound login with the shared
//! validator, hands streaming calls to the per-call state machines in
//! [`streaming`](crate::server::streaming), and admits each call through the
//! [`Lifecycle`] so shutdown can drain or cancel it.

use crate::server::{
    config::ServerConfig,
    lifecycle::Lifecycle,
    streaming::{
        coordinator::{drain_client_stream, feed_greeting, pump_exchange},
        echo::TurnBasedEcho,
        sink::ClientStreamSink,
    },
    telemetry::{
        increment_calls, increment_validation_failures, record_call_duration,
        record_items_per_stream,
    },
};
use core::pin::Pin;
use futures::TryStreamExt;
use sendwire_core::{
    Error,
    proto::{AggregateResponse, Envelope, send_service_server::SendService},
    validate::validate,
};
use std::{sync::Arc, time::Instant};
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, Streaming};
use tracing::Instrument;

type ResponseStream = Pin<Box<dyn Stream<Item = Result<AggregateResponse, Status>> + Send>>;

/// Server side of `SendService`.
///
/// Cheap to clone; every clone shares the same [`Lifecycle`].
#[derive(Clone)]
pub struct GreetingService {
    config: ServerConfig,
    lifecycle: Arc<Lifecycle>,
}

impl GreetingService {
    pub fn new(config: ServerConfig) -> Self {
        let lifecycle = Arc::new(Lifecycle::new(config.shutdown_timeout));
        Self { config, lifecycle }
    }

    /// Number of calls currently admitted.
    pub fn inflight(&self) -> usize {
        self.lifecycle.inflight()
    }

    /// Refuses new calls, drains in-flight ones and cancels what is left.
    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await;
    }

    fn validated<'a>(&self, envelope: &'a Envelope) -> Result<&'a str, Status> {
        validate(envelope).map_err(|e| {
            increment_validation_failures(e.kind());
            tracing::warn!(request_id = %envelope.request_id, "Rejected request: {e}");
            Status::from(e)
        })
    }
}

/// Counts validation failures that leave through a response stream.
fn count_rejection(status: &Status) {
    if let Some(v) = Error::from(status.clone()).as_validation() {
        increment_validation_failures(v.kind());
    }
}

#[tonic::async_trait]
impl SendService for GreetingService {
    type GetStreamStream = ResponseStream;
    type StreamCallStream = ResponseStream;

    /// Replies `[MARKER, login, TERMINATOR]` in one response.
    #[tracing::instrument(skip_all, fields(request_id = %req.get_ref().request_id))]
    async fn call(&self, req: Request<Envelope>) -> Result<Response<AggregateResponse>, Status> {
        let start = Instant::now();
        let _guard = self.lifecycle.admit()?;
        increment_calls("Call");

        let login = self.validated(req.get_ref())?;
        let response = AggregateResponse::greeting(login);
        tracing::info!("Answering unary call with {:?}", response.messages);

        record_call_duration("Call", start.elapsed().as_secs_f64() * 1000.0);
        Ok(Response::new(response))
    }

    /// Streams `[MARKER]`, `[login]`, `[TERMINATOR]` as three responses.
    #[tracing::instrument(skip_all, fields(request_id = %req.get_ref().request_id))]
    async fn get_stream(
        &self,
        req: Request<Envelope>,
    ) -> Result<Response<Self::GetStreamStream>, Status> {
        let start = Instant::now();
        let guard = self.lifecycle.admit()?;
        increment_calls("GetStream");

        let login = self.validated(req.get_ref())?.to_owned();
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);

        let fut = async move {
            let _guard = guard;
            if let Err(e) = feed_greeting(&login, &resp_tx).await {
                tracing::warn!("Greeting stream aborted: {e}");
            }
            record_call_duration("GetStream", start.elapsed().as_secs_f64() * 1000.0);
        };
        tokio::spawn(fut.instrument(tracing::info_span!("greeting")));

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }

    /// Accumulates the whole client stream and answers once.
    #[tracing::instrument(skip_all)]
    async fn put_stream(
        &self,
        req: Request<Streaming<Envelope>>,
    ) -> Result<Response<AggregateResponse>, Status> {
        let start = Instant::now();
        let _guard = self.lifecycle.admit()?;
        increment_calls("PutStream");

        let sink = ClientStreamSink::new(self.config.max_stream_items);
        let result = drain_client_stream(req.into_inner(), sink, self.lifecycle.token()).await;
        record_call_duration("PutStream", start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(response) => {
                // Marker and terminator are not inbound items.
                record_items_per_stream(response.messages.len().saturating_sub(2) as f64);
                Ok(Response::new(response))
            }
            Err(e) => {
                if let Some(v) = e.as_validation() {
                    increment_validation_failures(v.kind());
                }
                Err(e.into())
            }
        }
    }

    /// Answers every inbound item before reading the next one.
    #[tracing::instrument(skip_all)]
    async fn stream_call(
        &self,
        req: Request<Streaming<Envelope>>,
    ) -> Result<Response<Self::StreamCallStream>, Status> {
        let start = Instant::now();
        let guard = self.lifecycle.admit()?;
        increment_calls("StreamCall");

        let inbound = req.into_inner();
        let (resp_tx, resp_rx) = mpsc::channel(self.config.stream_buffer_size);
        let shutdown = self.lifecycle.token();

        let fut = async move {
            let _guard = guard;
            match pump_exchange(inbound, TurnBasedEcho::new(), resp_tx, shutdown).await {
                Ok(emitted) => record_items_per_stream(emitted as f64),
                Err(e) => tracing::warn!("Exchange aborted: {e}"),
            }
            record_call_duration("StreamCall", start.elapsed().as_secs_f64() * 1000.0);
        };
        tokio::spawn(fut.instrument(tracing::info_span!("exchange")));

        let stream = ReceiverStream::new(resp_rx).inspect_err(count_rejection);
        Ok(Response::new(Box::pin(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use futures::StreamExt;
    use tonic::Code;

    fn service() -> GreetingService {
        GreetingService::new(ServerConfig {
            shutdown_timeout: Duration::from_millis(50),
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn call_greets_valid_login() {
        let response = service()
            .call(Request::new(Envelope::wrap("test-log")))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.messages, ["Hello", "test-log", "!"]);
    }

    #[tokio::test]
    async fn call_rejects_digit_first_login() {
        let status = service()
            .call(Request::new(Envelope::wrap("123Error")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn call_rejects_missing_payload() {
        let status = service()
            .call(Request::new(Envelope::without_payload()))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::DataLoss);
    }

    #[tokio::test]
    async fn get_stream_emits_three_fragments() {
        let stream = service()
            .get_stream(Request::new(Envelope::wrap("test-log")))
            .await
            .unwrap()
            .into_inner();
        let messages: Vec<_> = stream.map(|r| r.unwrap().messages).collect().await;
        assert_eq!(messages, [vec!["Hello"], vec!["test-log"], vec!["!"]]);
    }

    #[tokio::test]
    async fn guard_is_released_after_streaming() {
        let svc = service();
        let stream = svc
            .get_stream(Request::new(Envelope::wrap("test-log")))
            .await
            .unwrap()
            .into_inner();
        let _: Vec<_> = stream.collect().await;
        // The pump drops its guard right after the last send.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(svc.inflight(), 0);
    }

    #[tokio::test]
    async fn calls_are_refused_after_shutdown() {
        let svc = service();
        svc.shutdown().await;
        let status = svc
            .call(Request::new(Envelope::wrap("test-log")))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
    }
}
