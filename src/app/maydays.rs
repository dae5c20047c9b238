use crate::adapters::ReportedLocation;
use crate::error::DispatchError;
use crate::geo::Coordinate;
use crate::ports::{MaydayStore, PushSender};
use crate::session::Session;
use crate::state;
use crate::types::mayday::{ChangeEvent, DistressEvent};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{Extension, Json};
use futures::Stream;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RaiseMaydayRequest {
    #[serde(default)]
    pub(crate) latitude: Option<f64>,
    #[serde(default)]
    pub(crate) longitude: Option<f64>,
}

impl RaiseMaydayRequest {
    fn location(&self) -> ReportedLocation {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                ReportedLocation(Some(Coordinate::new(latitude, longitude)))
            }
            _ => ReportedLocation(None),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RaiseMaydayResponse {
    pub(crate) event: DistressEvent,
}

pub(crate) async fn raise_mayday<S: PushSender>(
    State(state): State<state::AppState<S>>,
    Extension(session): Extension<Session>,
    Json(request): Json<RaiseMaydayRequest>,
) -> Result<(StatusCode, Json<RaiseMaydayResponse>), DispatchError> {
    let event = state
        .broadcaster
        .raise(&session, &request.location())
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "mayday not sent"))?;

    let broadcaster = state.broadcaster.clone();
    let stored = event.clone();
    state
        .deliveries
        .spawn(async move { broadcaster.fan_out(stored).await })
        .await;

    Ok((StatusCode::CREATED, Json(RaiseMaydayResponse { event })))
}

/// Live INSERT feed of the `maydays` table as server-sent events.
pub(crate) async fn mayday_events<S: PushSender>(
    State(state): State<state::AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.feed.subscribe();
    let stream = futures::stream::unfold(subscription, |mut subscription| async move {
        let event = subscription.next().await?;
        let sse = Event::default()
            .event(ChangeEvent::INSERT)
            .json_data(ChangeEvent::insert(event));
        Some((sse, subscription))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
