use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use sendwire_client::{ClientConfig, SendClient, gateway::router};
use sendwire_server::server::{config::ServerConfig, serve::serve_with_incoming};
use tokio::{net::TcpListener, runtime::Handle};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Endpoint;
use tower::ServiceExt;

async fn client() -> SendClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_with_incoming(
        ServerConfig::default(),
        TcpListenerStream::new(listener),
        std::future::pending(),
    ));

    let channel = Endpoint::from_shared(format!("http://{addr}"))
        .unwrap()
        .connect()
        .await
        .unwrap();
    SendClient::new(channel, Handle::current(), ClientConfig::default())
}

async fn send(request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(client().await).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, logins: &[&str]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(logins).unwrap()))
        .unwrap()
}

fn messages(body: &[u8]) -> Vec<String> {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn call_route_answers_json() {
    let (status, body) = send(get("/client/call?txt=test-log")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&body), ["Hello", "test-log", "!"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_stream_route_answers_json() {
    let (status, body) = send(get("/client/getStream?txt=test-log")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&body), ["Hello", "test-log", "!"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_login_is_bad_request_with_description() {
    let (status, body) = send(get("/client/call?txt=123Error")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("[A-Za-z][A-Za-z0-9.-]{3,15}"), "{text}");
}

#[tokio::test(flavor = "multi_thread")]
async fn put_stream_route_aggregates() {
    let (status, body) = send(post_json("/client/putStream", &["abcd", "efgh"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&body), ["Hello", "abcd", "efgh", "!"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_call_route_pairs_sequences() {
    let (status, body) = send(post_json("/client/streamCall", &["abcd", "efgh"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(messages(&body), ["1", "abcd", "2", "efgh"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_call_route_rejects_invalid_item() {
    let (status, _) = send(post_json("/client/streamCall", &["normal1", "sml", "normal2"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_server_is_internal_error() {
    let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
    let client = SendClient::new(channel, Handle::current(), ClientConfig::default());
    let response = router(client)
        .oneshot(get("/client/call?txt=test-log"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
