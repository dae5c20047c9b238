use crate::error::{DeliveryError, DispatchError, StorageError};
use crate::ports::{EndpointRegistry, LocationProvider, MaydayStore, PushRelay};
use crate::session::Session;
use crate::types::mayday::{DistressEvent, NewMayday, UserId};
use crate::types::push::PushMessage;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{self, JoinSet};

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub user_id: UserId,
    pub result: Result<(), DeliveryError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fanout {
    /// One outcome per registered endpoint, in completion order.
    Delivered(Vec<DeliveryOutcome>),
    /// The registry could not be read; nobody was notified by push.
    Abandoned(StorageError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReport {
    pub event: DistressEvent,
    pub fanout: Fanout,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        match &self.fanout {
            Fanout::Delivered(outcomes) => outcomes
                .iter()
                .filter(|outcome| outcome.result.is_ok())
                .count(),
            Fanout::Abandoned(_) => 0,
        }
    }

    pub fn failed(&self) -> usize {
        match &self.fanout {
            Fanout::Delivered(outcomes) => outcomes
                .iter()
                .filter(|outcome| outcome.result.is_err())
                .count(),
            Fanout::Abandoned(_) => 0,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self.fanout, Fanout::Abandoned(_))
    }
}

/// Stores a mayday and pushes it to every registered endpoint.
///
/// Push goes to all endpoints regardless of distance; only the in-app
/// watcher filters by radius.
#[derive(Clone)]
pub struct Broadcaster<S, R, P> {
    store: S,
    registry: R,
    relay: P,
    message: Arc<PushMessage>,
    delivery_timeout: Duration,
}

impl<S, R, P> Broadcaster<S, R, P>
where
    S: MaydayStore,
    R: EndpointRegistry,
    P: PushRelay,
{
    pub fn new(store: S, registry: R, relay: P, message: PushMessage) -> Self {
        Self {
            store,
            registry,
            relay,
            message: Arc::new(message),
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Stores the mayday and pushes it to every registered endpoint.
    pub async fn dispatch<L: LocationProvider>(
        &self,
        session: &Session,
        locator: &L,
    ) -> Result<DispatchReport, DispatchError> {
        let event = self.raise(session, locator).await?;
        Ok(self.fan_out(event).await)
    }

    /// Locates the caller and inserts the mayday. No push is sent.
    pub async fn raise<L: LocationProvider>(
        &self,
        session: &Session,
        locator: &L,
    ) -> Result<DistressEvent, DispatchError> {
        let coordinate = locator.locate().await?;
        let user_id = session
            .user_id()
            .ok_or(DispatchError::IdentityUnavailable)?;
        let event = self
            .store
            .insert(NewMayday::new(user_id.clone(), coordinate))
            .await?;
        tracing::info!(id = event.id, owner = %event.owner_id, "mayday stored");
        Ok(event)
    }

    /// Pushes a stored mayday to every registered endpoint and gathers one
    /// outcome per recipient. Individual failures are logged, never raised.
    pub async fn fan_out(&self, event: DistressEvent) -> DispatchReport {
        let fanout = match self.registry.list_all().await {
            Ok(records) => {
                let mut tasks = JoinSet::new();
                let mut recipients = HashMap::with_capacity(records.len());
                for record in records {
                    let relay = self.relay.clone();
                    let message = Arc::clone(&self.message);
                    let timeout = self.delivery_timeout;
                    let user_id = record.user_id.clone();
                    let handle = tasks.spawn(async move {
                        let result = match tokio::time::timeout(
                            timeout,
                            relay.relay(Some(&record.endpoint), &message),
                        )
                        .await
                        {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(err)) => Err(DeliveryError::Relay(err)),
                            Err(_) => Err(DeliveryError::TimedOut(timeout)),
                        };
                        DeliveryOutcome {
                            user_id: record.user_id,
                            result,
                        }
                    });
                    recipients.insert(handle.id(), user_id);
                }
                Fanout::Delivered(gather(tasks, recipients).await)
            }
            Err(err) => {
                tracing::error!(id = event.id, error = %err, "push fan-out abandoned");
                Fanout::Abandoned(err)
            }
        };

        let report = DispatchReport { event, fanout };
        tracing::info!(
            id = report.event.id,
            delivered = report.delivered(),
            failed = report.failed(),
            abandoned = report.is_abandoned(),
            "mayday dispatched"
        );
        report
    }
}

/// Fan-outs running behind already answered requests.
///
/// Finished tasks are reaped on the next `spawn`; `drain` waits for the rest.
#[derive(Clone, Default)]
pub struct DeliveryTasks {
    tasks: Arc<Mutex<JoinSet<DispatchReport>>>,
}

impl DeliveryTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn spawn<F>(&self, fanout: F)
    where
        F: Future<Output = DispatchReport> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.try_join_next() {
            if let Err(err) = joined {
                tracing::error!(error = %err, "mayday fan-out task failed");
            }
        }
        tasks.spawn(fanout);
    }

    pub async fn in_flight(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Waits for every unreaped fan-out and returns their reports.
    pub async fn drain(&self) -> Vec<DispatchReport> {
        let mut tasks = std::mem::take(&mut *self.tasks.lock().await);
        let mut reports = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => tracing::error!(error = %err, "mayday fan-out task failed"),
            }
        }
        reports
    }
}

async fn gather(
    mut tasks: JoinSet<DeliveryOutcome>,
    mut recipients: HashMap<task::Id, UserId>,
) -> Vec<DeliveryOutcome> {
    let mut outcomes = Vec::with_capacity(recipients.len());
    while let Some(joined) = tasks.join_next_with_id().await {
        let outcome = match joined {
            Ok((id, outcome)) => {
                recipients.remove(&id);
                outcome
            }
            Err(err) => {
                let Some(user_id) = recipients.remove(&err.id()) else {
                    tracing::error!(error = %err, "push delivery task failed");
                    continue;
                };
                DeliveryOutcome {
                    user_id,
                    result: Err(DeliveryError::Panicked(err.to_string())),
                }
            }
        };
        if let Err(err) = &outcome.result {
            tracing::warn!(
                user = %outcome.user_id,
                endpoint_gone = err.is_endpoint_gone(),
                error = %err,
                "push delivery failed"
            );
        }
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::ReportedLocation;
    use crate::error::{LocationError, RelayError};
    use crate::feed::MaydayFeed;
    use crate::feed::tests::FixedTime;
    use crate::geo::Coordinate;
    use crate::push::relay::RelayService;
    use crate::push::relay::tests::{TestSender, descriptor};
    use crate::registry::MemoryRegistry;
    use crate::types::push::{EndpointDescriptor, EndpointRecord};
    use std::future::Future;
    use std::pin::Pin;

    const HERE: Coordinate = Coordinate {
        latitude: 35.6812,
        longitude: 139.7671,
    };

    fn feed() -> MaydayFeed<FixedTime> {
        MaydayFeed::new(FixedTime::at("2025-06-01T12:00:00Z"), 8)
    }

    async fn registry_with(endpoints: &[(&str, &str)]) -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        for (user, endpoint) in endpoints {
            registry
                .upsert(&UserId::new(*user), &descriptor(endpoint))
                .await
                .expect("upsert");
        }
        registry
    }

    #[derive(Clone)]
    struct FailingRegistry;

    impl EndpointRegistry for FailingRegistry {
        type UpsertFut<'a>
            = std::future::Ready<Result<(), StorageError>>
        where
            Self: 'a;
        type ListFut<'a>
            = std::future::Ready<Result<Vec<EndpointRecord>, StorageError>>
        where
            Self: 'a;

        fn upsert<'a>(
            &'a self,
            _user_id: &'a UserId,
            _endpoint: &'a EndpointDescriptor,
        ) -> Self::UpsertFut<'a> {
            std::future::ready(Err(StorageError::Unavailable("down".to_string())))
        }

        fn list_all<'a>(&'a self) -> Self::ListFut<'a> {
            std::future::ready(Err(StorageError::Unavailable("down".to_string())))
        }
    }

    #[derive(Clone)]
    struct HangingRelay;

    impl PushRelay for HangingRelay {
        type Fut<'a>
            = Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + 'a>>
        where
            Self: 'a;

        fn relay<'a>(
            &'a self,
            _subscription: Option<&'a EndpointDescriptor>,
            _message: &'a PushMessage,
        ) -> Self::Fut<'a> {
            Box::pin(std::future::pending())
        }
    }

    #[derive(Clone)]
    struct PanickingRelay {
        panics_for: &'static str,
    }

    impl PushRelay for PanickingRelay {
        type Fut<'a>
            = std::future::Ready<Result<(), RelayError>>
        where
            Self: 'a;

        fn relay<'a>(
            &'a self,
            subscription: Option<&'a EndpointDescriptor>,
            _message: &'a PushMessage,
        ) -> Self::Fut<'a> {
            let endpoint = subscription
                .and_then(|descriptor| descriptor.as_value()["endpoint"].as_str())
                .unwrap_or_default();
            if endpoint == self.panics_for {
                panic!("relay blew up for {endpoint}");
            }
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn dispatch__should_deliver_to_remaining_endpoints_when_one_fails() {
        // Given
        let registry = registry_with(&[
            ("user-1", "https://push.example/1"),
            ("user-2", "https://push.example/2"),
            ("user-3", "https://push.example/3"),
        ])
        .await;
        let sender = TestSender::failing_for(&["https://push.example/2"]);
        let broadcaster = Broadcaster::new(
            feed(),
            registry,
            RelayService::new(sender.clone()),
            PushMessage::new("Mayday", "Help"),
        );

        // When
        let report = broadcaster
            .dispatch(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("dispatch should not fail");

        // Then
        let mut endpoints: Vec<String> = sender
            .sent()
            .into_iter()
            .map(|(endpoint, _)| endpoint)
            .collect();
        endpoints.sort();
        assert_eq!(
            endpoints,
            vec!["https://push.example/1", "https://push.example/3"]
        );
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 1);
        let Fanout::Delivered(outcomes) = &report.fanout else {
            panic!("expected delivered fan-out");
        };
        let failed = outcomes
            .iter()
            .find(|outcome| outcome.result.is_err())
            .expect("failed outcome");
        assert_eq!(failed.user_id, UserId::new("user-2"));
        assert!(failed.result.as_ref().unwrap_err().is_endpoint_gone());
    }

    #[tokio::test]
    async fn dispatch__should_store_event_with_session_user() {
        // Given
        let store = feed();
        let broadcaster = Broadcaster::new(
            store.clone(),
            MemoryRegistry::new(),
            RelayService::new(TestSender::default()),
            PushMessage::default(),
        );

        // When
        let report = broadcaster
            .dispatch(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("dispatch");

        // Then
        assert_eq!(report.event.owner_id, UserId::new("sender"));
        assert_eq!(report.event.coordinate(), HERE);
        assert_eq!(store.events().expect("events"), vec![report.event.clone()]);
        assert_eq!(report.fanout, Fanout::Delivered(Vec::new()));
    }

    #[tokio::test]
    async fn dispatch__should_abort_without_location() {
        // Given
        let store = feed();
        let broadcaster = Broadcaster::new(
            store.clone(),
            MemoryRegistry::new(),
            RelayService::new(TestSender::default()),
            PushMessage::default(),
        );

        // When
        let result = broadcaster
            .dispatch(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(None),
            )
            .await;

        // Then
        assert_eq!(
            result,
            Err(DispatchError::LocationUnavailable(LocationError::Unsupported))
        );
        assert!(store.events().expect("events").is_empty());
    }

    #[tokio::test]
    async fn dispatch__should_abort_without_identity() {
        // Given
        let store = feed();
        let sender = TestSender::default();
        let broadcaster = Broadcaster::new(
            store.clone(),
            registry_with(&[("user-1", "https://push.example/1")]).await,
            RelayService::new(sender.clone()),
            PushMessage::default(),
        );

        // When
        let result = broadcaster
            .dispatch(&Session::anonymous(), &ReportedLocation(Some(HERE)))
            .await;

        // Then
        assert_eq!(result, Err(DispatchError::IdentityUnavailable));
        assert!(store.events().expect("events").is_empty());
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch__should_abandon_fanout_when_registry_unreadable() {
        // Given
        let store = feed();
        let broadcaster = Broadcaster::new(
            store.clone(),
            FailingRegistry,
            RelayService::new(TestSender::default()),
            PushMessage::default(),
        );

        // When
        let report = broadcaster
            .dispatch(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("dispatch");

        // Then
        assert!(report.is_abandoned());
        assert_eq!(store.events().expect("events").len(), 1);
    }

    #[tokio::test]
    async fn dispatch__should_time_out_hung_deliveries() {
        // Given
        let broadcaster = Broadcaster::new(
            feed(),
            registry_with(&[("user-1", "https://push.example/1")]).await,
            HangingRelay,
            PushMessage::default(),
        )
        .with_delivery_timeout(Duration::from_millis(10));

        // When
        let report = broadcaster
            .dispatch(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("dispatch");

        // Then
        assert_eq!(
            report.fanout,
            Fanout::Delivered(vec![DeliveryOutcome {
                user_id: UserId::new("user-1"),
                result: Err(DeliveryError::TimedOut(Duration::from_millis(10))),
            }])
        );
    }

    #[tokio::test]
    async fn fan_out__should_attribute_panicked_delivery_to_its_recipient() {
        // Given
        let registry = registry_with(&[
            ("user-1", "https://push.example/1"),
            ("user-2", "https://push.example/2"),
            ("user-3", "https://push.example/3"),
        ])
        .await;
        let broadcaster = Broadcaster::new(
            feed(),
            registry,
            PanickingRelay {
                panics_for: "https://push.example/2",
            },
            PushMessage::default(),
        );
        let event = broadcaster
            .raise(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("raise");

        // When
        let report = broadcaster.fan_out(event).await;

        // Then
        let Fanout::Delivered(outcomes) = &report.fanout else {
            panic!("expected delivered fan-out");
        };
        assert_eq!(outcomes.len(), 3);
        let failed: Vec<&DeliveryOutcome> = outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].user_id, UserId::new("user-2"));
        assert!(matches!(
            failed[0].result,
            Err(DeliveryError::Panicked(_))
        ));
        assert_eq!(report.delivered(), 2);
    }

    #[tokio::test]
    async fn raise__should_store_event_without_pushing() {
        // Given
        let store = feed();
        let sender = TestSender::default();
        let broadcaster = Broadcaster::new(
            store.clone(),
            registry_with(&[("user-1", "https://push.example/1")]).await,
            RelayService::new(sender.clone()),
            PushMessage::default(),
        );

        // When
        let event = broadcaster
            .raise(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("raise");

        // Then
        assert_eq!(store.events().expect("events"), vec![event]);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn delivery_tasks__should_return_reports_on_drain() {
        // Given
        let sender = TestSender::default();
        let broadcaster = Broadcaster::new(
            feed(),
            registry_with(&[("user-1", "https://push.example/1")]).await,
            RelayService::new(sender.clone()),
            PushMessage::default(),
        );
        let event = broadcaster
            .raise(
                &Session::for_user(UserId::new("sender")),
                &ReportedLocation(Some(HERE)),
            )
            .await
            .expect("raise");
        let deliveries = DeliveryTasks::new();

        // When
        let background = broadcaster.clone();
        deliveries
            .spawn(async move { background.fan_out(event).await })
            .await;
        let reports = deliveries.drain().await;

        // Then
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].delivered(), 1);
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(deliveries.in_flight().await, 0);
    }
}
