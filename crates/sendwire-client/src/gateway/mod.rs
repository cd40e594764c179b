//! HTTP front end over [`SendClient`].
//!
//! | Route | Body | Adapter |
//! |---|---|---|
//! | `GET /client/call?txt=<login>` | | unary |
//! | `GET /client/getStream?txt=<login>` | | server-stream collector |
//! | `POST /client/putStream` | JSON `["a","b"]` | completion future |
//! | `POST /client/streamCall` | JSON `["a","b"]` | ordered round trip |
//!
//! Every adapter call blocks, so handlers run it on the blocking pool.

pub mod config;
pub mod error;
pub mod handlers;

use crate::client::SendClient;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn router(client: SendClient) -> Router {
    Router::new()
        .route("/client/call", get(handlers::call))
        .route("/client/getStream", get(handlers::get_stream))
        .route("/client/putStream", post(handlers::put_stream))
        .route("/client/streamCall", post(handlers::stream_call))
        .with_state(Arc::new(client))
}
