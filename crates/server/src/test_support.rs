use axum::{
    body::{Body, to_bytes},
    http::{Request, header},
    response::Response,
};
use serde_json::Value;

use crate::AppState;

pub async fn test_state() -> AppState {
    let db = db::DBService::connect("sqlite::memory:").await.unwrap();
    AppState::new(db)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_as(method: &str, uri: &str, body: Value, actor: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(crate::http::identity::ACTOR_HEADER, actor)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
