use crate::error::{RegistrationError, error_response};
use crate::ports::{EndpointRegistry, PushSender};
use crate::session::Session;
use crate::state;
use crate::types::push::{EndpointDescriptor, PushMessage};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Deserialize)]
pub(crate) struct SendPushRequest {
    #[serde(default)]
    pub(crate) subscription: Option<EndpointDescriptor>,
    #[serde(default)]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) body: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct SendPushResponse {
    pub(crate) success: bool,
}

pub(crate) async fn send_push<S: PushSender>(
    State(state): State<state::AppState<S>>,
    request: Result<Json<SendPushRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let message = PushMessage {
        title: request.title,
        body: request.body,
    };

    match state
        .relay
        .send(request.subscription.as_ref(), &message)
        .await
    {
        Ok(()) => Json(SendPushResponse { success: true }).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "push relay failed");
            err.into_response()
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key<S: PushSender>(
    State(state): State<state::AppState<S>>,
) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.config.vapid.public_key.clone(),
    })
}

pub(crate) async fn register_subscription<S: PushSender>(
    State(state): State<state::AppState<S>>,
    Extension(session): Extension<Session>,
    Json(endpoint): Json<EndpointDescriptor>,
) -> Result<StatusCode, RegistrationError> {
    let user_id = session
        .user_id()
        .ok_or(RegistrationError::IdentityUnavailable)?;
    state.registry.upsert(user_id, &endpoint).await.map_err(|err| {
        tracing::error!(user = %user_id, error = %err, "failed to save push subscription");
        RegistrationError::Storage(err)
    })?;
    tracing::info!(user = %user_id, "push subscription saved");
    Ok(StatusCode::NO_CONTENT)
}
