//! Unary and server-stream calls, collapsed into one flat message list.
//!
//! Neither shape needs a hand-off between contexts: the caller drives the
//! future to completion itself.

use super::SendServiceStub;
use futures::TryStreamExt;
use sendwire_core::{Error, proto::Envelope};

/// Sends one envelope and returns the messages of the single response.
///
/// # Errors
///
/// The remote error, classified into the shared taxonomy. No retry.
pub async fn unary(mut stub: SendServiceStub, envelope: Envelope) -> Result<Vec<String>, Error> {
    tracing::info!("Sending ->\n{envelope:?}");
    let response = stub.call(envelope).await?.into_inner();
    tracing::info!("Received <-\n{response:?}");
    Ok(response.messages)
}

/// Opens a server stream and concatenates the fragments of every item in
/// arrival order.
///
/// # Errors
///
/// The first remote error, including one on the first item. Fragments
/// collected before it are discarded.
pub async fn server_stream(
    mut stub: SendServiceStub,
    envelope: Envelope,
) -> Result<Vec<String>, Error> {
    tracing::info!("Sending ->\n{envelope:?}");
    let stream = stub.get_stream(envelope).await?.into_inner();

    let messages = stream
        .inspect_ok(|response| tracing::info!("Received <-\n{response:?}"))
        .try_fold(Vec::new(), |mut acc, response| async move {
            acc.extend(response.messages);
            Ok(acc)
        })
        .await?;

    Ok(messages)
}
