use crate::server::{websocket_listener, ProtocolRouter};
use axum::extract::WebSocketUpgrade;
use axum::{routing::get, Router};

pub const CALL_PATH: &str = "/call";

pub fn create_session_route(router: ProtocolRouter) -> Router {
    Router::new().route(
        CALL_PATH,
        get(move |ws: WebSocketUpgrade| websocket_listener::handle_websocket(ws, router.clone())),
    )
}
