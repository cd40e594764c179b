use super::error::GatewayError;
use crate::client::SendClient;
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub txt: String,
}

type Reply = Result<Json<Vec<String>>, GatewayError>;

/// Runs a blocking adapter call off the async workers.
async fn blocking<F>(client: Arc<SendClient>, f: F) -> Reply
where
    F: FnOnce(&SendClient) -> Result<Vec<String>, sendwire_core::Error> + Send + 'static,
{
    let messages = tokio::task::spawn_blocking(move || f(&client)).await??;
    Ok(Json(messages))
}

/// GET /client/call?txt=<login>
pub async fn call(State(client): State<Arc<SendClient>>, Query(q): Query<LoginQuery>) -> Reply {
    blocking(client, move |c| c.call(&q.txt)).await
}

/// GET /client/getStream?txt=<login>
pub async fn get_stream(
    State(client): State<Arc<SendClient>>,
    Query(q): Query<LoginQuery>,
) -> Reply {
    blocking(client, move |c| c.get_stream(&q.txt)).await
}

/// POST /client/putStream
pub async fn put_stream(
    State(client): State<Arc<SendClient>>,
    Json(people): Json<Vec<String>>,
) -> Reply {
    tracing::info!("Streaming request {people:?}");
    blocking(client, move |c| c.put_stream(people)).await
}

/// POST /client/streamCall
pub async fn stream_call(
    State(client): State<Arc<SendClient>>,
    Json(people): Json<Vec<String>>,
) -> Reply {
    blocking(client, move |c| c.stream_call(people)).await
}
