use crate::ports::PushSender;
use crate::state;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};

mod auth;
mod maydays;
mod push;

pub fn app<S: PushSender>(state: state::AppState<S>) -> Router {
    Router::new()
        .route("/api/send-push", post(push::send_push::<S>))
        .route("/api/push/public-key", get(push::push_public_key::<S>))
        .route(
            "/api/push/subscription",
            put(push::register_subscription::<S>),
        )
        .route("/api/maydays", post(maydays::raise_mayday::<S>))
        .route("/api/maydays/events", get(maydays::mayday_events::<S>))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware::<S>,
        ))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
