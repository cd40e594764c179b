use super::{echo::TurnBasedEcho, sink::ClientStreamSink};
use futures::{Stream, StreamExt};
use sendwire_core::{
    Error,
    proto::{AggregateResponse, Envelope},
    types::{MARKER, TERMINATOR},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Sender half of an outbound response stream.
pub type ResponseTx = mpsc::Sender<Result<AggregateResponse, Status>>;

/// Streams a greeting as three single-fragment responses:
/// `[MARKER]`, `[login]`, `[TERMINATOR]`.
///
/// Returns early with [`Error::ChannelError`] if the client disconnects.
pub async fn feed_greeting(login: &str, resp_tx: &ResponseTx) -> Result<(), Error> {
    for fragment in [MARKER, login, TERMINATOR] {
        if let Err(e) = resp_tx
            .send(Ok(AggregateResponse::from_messages([fragment])))
            .await
        {
            return Err(Error::ChannelError {
                context: format!("Failed to forward greeting fragment: {e}"),
            });
        }
    }
    Ok(())
}

/// Drains a client stream into `sink` and returns its aggregate response.
///
/// Items are processed strictly in arrival order. The first item the sink
/// rejects ends the call with that error; nothing read afterwards is looked
/// at. A transport error on the inbound side is surfaced as
/// [`Error::Remote`], and cancelling `shutdown` ends the call with
/// [`Error::ServiceShutdown`].
pub async fn drain_client_stream<S>(
    inbound: S,
    mut sink: ClientStreamSink,
    shutdown: CancellationToken,
) -> Result<AggregateResponse, Error>
where
    S: Stream<Item = Result<Envelope, Status>>,
{
    let mut inbound = core::pin::pin!(inbound);
    sink.open();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                sink.on_error();
                return Err(Error::ServiceShutdown);
            }
            next = inbound.next() => next,
        };

        match next {
            Some(Ok(envelope)) => {
                if let Err(e) = sink.on_next(&envelope) {
                    tracing::warn!(
                        request_id = %envelope.request_id,
                        "Rejected client-stream item: {e}"
                    );
                    return Err(e);
                }
                tracing::debug!(request_id = %envelope.request_id, "Accumulated item");
            }
            Some(Err(status)) => {
                sink.on_error();
                return Err(Error::Remote(status));
            }
            None => {
                let response = sink.on_completed()?;
                tracing::info!(
                    "Client stream complete, sending {:?}",
                    response.messages
                );
                return Ok(response);
            }
        }
    }
}

/// Runs a turn-based exchange: every inbound item is answered on `resp_tx`
/// before the next one is read.
///
/// A rejected item is answered with its status and the exchange carries on.
/// Inbound completion returns the number of responses emitted; dropping
/// `resp_tx` then finishes the outbound stream without further payload.
///
/// # Errors
///
/// - [`Error::ChannelError`] if the client stopped listening.
/// - [`Error::Remote`] if the inbound transport failed.
/// - [`Error::ServiceShutdown`] if `shutdown` was cancelled mid-exchange.
pub async fn pump_exchange<S>(
    inbound: S,
    mut echo: TurnBasedEcho,
    resp_tx: ResponseTx,
    shutdown: CancellationToken,
) -> Result<u64, Error>
where
    S: Stream<Item = Result<Envelope, Status>>,
{
    let mut inbound = core::pin::pin!(inbound);
    echo.open();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                echo.on_error();
                // Best effort: the client may already be gone.
                let _ = resp_tx.send(Err(Error::ServiceShutdown.into())).await;
                return Err(Error::ServiceShutdown);
            }
            next = inbound.next() => next,
        };

        let envelope = match next {
            Some(Ok(envelope)) => envelope,
            Some(Err(status)) => {
                echo.on_error();
                return Err(Error::Remote(status));
            }
            None => {
                echo.on_completed()?;
                tracing::info!(emitted = echo.emitted(), "Exchange complete");
                return Ok(echo.emitted());
            }
        };

        let reply = match echo.on_next(&envelope) {
            Ok(response) => {
                tracing::debug!(request_id = %envelope.request_id, "Echoing item");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %envelope.request_id,
                    "Rejected exchange item: {e}"
                );
                Err(e.into())
            }
        };

        if let Err(e) = resp_tx.send(reply).await {
            echo.on_error();
            return Err(Error::ChannelError {
                context: format!("Failed to forward exchange reply: {e}"),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendwire_core::ValidationError;
    use tokio_stream::wrappers::ReceiverStream;

    fn envelopes(logins: &[&str]) -> Vec<Result<Envelope, Status>> {
        logins.iter().map(|l| Ok(Envelope::wrap(*l))).collect()
    }

    #[tokio::test]
    async fn greeting_is_three_fragments() {
        let (tx, rx) = mpsc::channel(4);
        feed_greeting("test-log", &tx).await.unwrap();
        drop(tx);

        let items: Vec<_> = ReceiverStream::new(rx)
            .map(|r| r.unwrap().messages)
            .collect()
            .await;
        assert_eq!(items, [vec!["Hello"], vec!["test-log"], vec!["!"]]);
    }

    #[tokio::test]
    async fn greeting_reports_disconnect() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        assert!(matches!(
            feed_greeting("test-log", &tx).await,
            Err(Error::ChannelError { .. })
        ));
    }

    #[tokio::test]
    async fn drain_aggregates_valid_stream() {
        let inbound = futures::stream::iter(envelopes(&["abcd", "efgh", "ijkl"]));
        let response =
            drain_client_stream(inbound, ClientStreamSink::new(16), CancellationToken::new())
                .await
                .unwrap();
        assert_eq!(response.messages, ["Hello", "abcd", "efgh", "ijkl", "!"]);
    }

    #[tokio::test]
    async fn drain_stops_at_first_invalid_item() {
        let inbound = futures::stream::iter(envelopes(&["sml", "normal1", "normal2", "normal3"]));
        let err = drain_client_stream(inbound, ClientStreamSink::new(16), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.as_validation(), Some(ValidationError::PatternMismatch));
    }

    #[tokio::test]
    async fn drain_surfaces_transport_error() {
        let inbound = futures::stream::iter(vec![
            Ok(Envelope::wrap("abcd")),
            Err(Status::aborted("reset")),
        ]);
        let err = drain_client_stream(inbound, ClientStreamSink::new(16), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(s) if s.code() == tonic::Code::Aborted));
    }

    #[tokio::test]
    async fn drain_honours_shutdown() {
        let token = CancellationToken::new();
        token.cancel();
        let inbound = futures::stream::pending::<Result<Envelope, Status>>();
        let err = drain_client_stream(inbound, ClientStreamSink::new(16), token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceShutdown));
    }

    #[tokio::test]
    async fn exchange_answers_each_item_and_continues_after_rejection() {
        let (tx, rx) = mpsc::channel(8);
        let inbound = futures::stream::iter(envelopes(&["normal1", "sml", "normal2", "normal3"]));
        let emitted = pump_exchange(inbound, TurnBasedEcho::new(), tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(emitted, 3);

        let replies: Vec<_> = ReceiverStream::new(rx).collect().await;
        assert_eq!(replies.len(), 4);
        assert_eq!(replies[0].as_ref().unwrap().messages, ["1", "normal1"]);
        assert_eq!(
            replies[1].as_ref().unwrap_err().code(),
            tonic::Code::InvalidArgument
        );
        assert_eq!(replies[2].as_ref().unwrap().messages, ["2", "normal2"]);
        assert_eq!(replies[3].as_ref().unwrap().messages, ["3", "normal3"]);
    }

    #[tokio::test]
    async fn exchange_stops_when_client_stops_listening() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let inbound = futures::stream::iter(envelopes(&["abcd"]));
        let err = pump_exchange(inbound, TurnBasedEcho::new(), tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelError { .. }));
    }

    #[tokio::test]
    async fn exchange_reports_shutdown_to_client() {
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        token.cancel();
        let inbound = futures::stream::pending::<Result<Envelope, Status>>();
        let err = pump_exchange(inbound, TurnBasedEcho::new(), tx, token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceShutdown));

        let replies: Vec<_> = ReceiverStream::new(rx).collect().await;
        assert_eq!(replies[0].as_ref().unwrap_err().code(), tonic::Code::Unavailable);
    }
}
