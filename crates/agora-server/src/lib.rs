pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use agora_api::AppStateInner;
use agora_gateway::{Gateway, connection};

/// `/ws` for the chat protocol plus the `/api` HTTP routes.
pub fn build_app(gateway: Gateway) -> Router {
    let api = agora_api::routes(Arc::new(AppStateInner {
        gateway: gateway.clone(),
    }));

    let ws_route = Router::new()
        .route("/ws", get(ws_upgrade))
        .with_state(gateway);

    Router::new()
        .nest("/api", api)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(State(gateway): State<Gateway>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, gateway))
}
