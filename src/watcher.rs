//! In-app proximity alerts.
//!
//! The watcher holds one INSERT subscription on the `maydays` table and
//! compares every new row against the client's latest location fix. Rows
//! that arrive before any fix exists are dropped without an alert.
//! The originator of a mayday is not filtered out: their own row is 0 km
//! away and alerts like any other.

use crate::geo::{self, Coordinate};
use crate::ports::{MaydaySubscription, TimeProvider};
use crate::types::mayday::DistressEvent;

use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub observed_at: OffsetDateTime,
    pub version: u64,
}

impl LocationFix {
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.observed_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LocationState {
    #[default]
    Unknown,
    Known(LocationFix),
}

/// Single-slot cache of the client's position. Each update replaces the
/// previous fix and bumps its version.
#[derive(Clone)]
pub struct LocationCache<T> {
    time: T,
    tx: std::sync::Arc<watch::Sender<LocationState>>,
}

impl<T: TimeProvider> LocationCache<T> {
    pub fn new(time: T) -> Self {
        let (tx, _rx) = watch::channel(LocationState::Unknown);
        Self {
            time,
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn update(&self, coordinate: Coordinate) -> LocationFix {
        let observed_at = self.time.now();
        let mut fix = LocationFix {
            coordinate,
            observed_at,
            version: 0,
        };
        self.tx.send_modify(|state| {
            let previous = match state {
                LocationState::Unknown => 0,
                LocationState::Known(existing) => existing.version,
            };
            fix.version = previous + 1;
            *state = LocationState::Known(fix);
        });
        fix
    }

    pub fn current(&self) -> LocationState {
        *self.tx.borrow()
    }

    pub fn reader(&self) -> watch::Receiver<LocationState> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchConfig {
    pub radius_km: f64,
    /// Fixes older than this are treated as missing. `None` keeps every fix.
    pub max_location_age: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            radius_km: DEFAULT_RADIUS_KM,
            max_location_age: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub event: DistressEvent,
    /// Rounded to two decimals.
    pub distance_km: f64,
    pub radius_km: f64,
}

impl Alert {
    pub fn message(&self) -> String {
        format!(
            "Mayday within {}km! Distance: {:.2}km",
            self.radius_km, self.distance_km
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    NoLocation,
    OutOfRange { distance_km: f64 },
    Alert(Alert),
}

impl AlertDecision {
    pub fn from_distance(event: &DistressEvent, distance_km: f64, radius_km: f64) -> Self {
        if distance_km <= radius_km {
            AlertDecision::Alert(Alert {
                event: event.clone(),
                distance_km: geo::round_km(distance_km),
                radius_km,
            })
        } else {
            AlertDecision::OutOfRange { distance_km }
        }
    }
}

pub fn evaluate(
    location: &LocationState,
    event: &DistressEvent,
    config: &WatchConfig,
    now: OffsetDateTime,
) -> AlertDecision {
    let fix = match location {
        LocationState::Unknown => return AlertDecision::NoLocation,
        LocationState::Known(fix) => fix,
    };
    if let Some(max_age) = config.max_location_age
        && fix.age(now) > max_age
    {
        return AlertDecision::NoLocation;
    }
    let distance = geo::distance_km(fix.coordinate, event.coordinate());
    AlertDecision::from_distance(event, distance, config.radius_km)
}

/// Handle to a running watcher. Closing (or dropping) it releases the
/// event subscription.
pub struct WatchHandle {
    handle: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    pub async fn close(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

pub struct EventWatcher<T> {
    time: T,
    config: WatchConfig,
    location: watch::Receiver<LocationState>,
}

impl<T: TimeProvider> EventWatcher<T> {
    pub fn new(time: T, config: WatchConfig, location: watch::Receiver<LocationState>) -> Self {
        Self {
            time,
            config,
            location,
        }
    }

    pub fn spawn(
        self,
        subscription: MaydaySubscription,
        alerts: mpsc::Sender<Alert>,
    ) -> WatchHandle {
        let handle = tokio::spawn(self.run(subscription, alerts));
        WatchHandle {
            handle: Some(handle),
        }
    }

    async fn run(self, mut subscription: MaydaySubscription, alerts: mpsc::Sender<Alert>) {
        while let Some(event) = subscription.next().await {
            let location = *self.location.borrow();
            match evaluate(&location, &event, &self.config, self.time.now()) {
                AlertDecision::NoLocation => {
                    tracing::debug!(id = event.id, "mayday ignored: no location fix");
                }
                AlertDecision::OutOfRange { distance_km } => {
                    tracing::debug!(id = event.id, distance_km, "mayday out of range");
                }
                AlertDecision::Alert(alert) => {
                    tracing::info!(
                        id = event.id,
                        distance_km = alert.distance_km,
                        "mayday within radius"
                    );
                    if alerts.send(alert).await.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("event watcher stopped");
    }
}
