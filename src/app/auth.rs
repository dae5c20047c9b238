use crate::error::error_response;
use crate::ports::PushSender;
use crate::session::Session;
use crate::state;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;

/// Resolves the caller's [`Session`] and stores it as a request extension.
///
/// With auth configured, `/api/` requests need a valid token. Without it
/// every request runs anonymously.
pub(crate) async fn auth_middleware<S: PushSender>(
    State(state): State<state::AppState<S>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = match &state.auth {
        Some(auth) => auth,
        None => {
            req.extensions_mut().insert(Session::anonymous());
            return next.run(req).await;
        }
    };

    let path = req.uri().path();
    let is_api = path.starts_with("/api/");
    if is_auth_bypass_path(path) {
        req.extensions_mut().insert(Session::anonymous());
        return next.run(req).await;
    }

    let verified = auth
        .token_from_headers(req.headers())
        .map(|token| auth.verify_token(token));
    match verified {
        Some(Ok(user_id)) => {
            req.extensions_mut().insert(Session::for_user(user_id));
            next.run(req).await
        }
        Some(Err(err)) if is_api => {
            tracing::debug!(error = %err, "rejected auth token");
            error_response(StatusCode::UNAUTHORIZED, "unauthorized")
        }
        None if is_api => error_response(StatusCode::UNAUTHORIZED, "unauthorized"),
        _ => {
            req.extensions_mut().insert(Session::anonymous());
            next.run(req).await
        }
    }
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/health" || path == "/api/push/public-key"
}
