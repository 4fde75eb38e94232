use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::election::message::{Message, VOICE_HEADER, VOICE_YES};
use crate::election::ElectionNode;

pub fn router(node: Arc<ElectionNode>) -> Router {
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/mp", get(message_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn ping_handler() -> StatusCode {
    StatusCode::OK
}

async fn message_handler(
    State(node): State<Arc<ElectionNode>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let msg = Message::from_headers(&headers);
    let reply = node.handle_message(&msg).await;

    let mut response_headers = HeaderMap::new();
    if reply.vote_granted {
        response_headers.insert(VOICE_HEADER, HeaderValue::from_static(VOICE_YES));
    }
    (StatusCode::OK, response_headers)
}

async fn status_handler(State(node): State<Arc<ElectionNode>>) -> impl IntoResponse {
    Json(node.status().await)
}
