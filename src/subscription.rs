//! Per-client push registration and live watch lifecycle.

use crate::error::{PlatformError, RegistrationError, StorageError};
use crate::geo::Coordinate;
use crate::ports::{EndpointRegistry, MaydayStore, Permission, PushPlatform, TimeProvider};
use crate::session::Session;
use crate::types::push::EndpointDescriptor;
use crate::watcher::{
    Alert, EventWatcher, LocationCache, LocationFix, LocationState, WatchConfig, WatchHandle,
};

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationState {
    Unregistered,
    PermissionRequested,
    Subscribed(EndpointDescriptor),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    /// The endpoint was written to the registry for the session user.
    Registered(EndpointDescriptor),
    /// Permission was refused; no further prompts in this session.
    Declined,
    /// No user id yet. Nothing was stored; retried on the next load.
    IdentityPending,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        LoadError::Registration(RegistrationError::Storage(err))
    }
}

pub struct SubscriptionManager<P, R, T> {
    platform: P,
    registry: R,
    time: T,
    state: RegistrationState,
    declined: bool,
    location: LocationCache<T>,
    watch: Option<WatchHandle>,
}

impl<P, R, T> SubscriptionManager<P, R, T>
where
    P: PushPlatform,
    R: EndpointRegistry,
    T: TimeProvider,
{
    pub fn new(platform: P, registry: R, time: T) -> Self {
        Self {
            platform,
            registry,
            location: LocationCache::new(time.clone()),
            time,
            state: RegistrationState::Unregistered,
            declined: false,
            watch: None,
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn location(&self) -> LocationState {
        self.location.current()
    }

    pub fn update_location(&mut self, coordinate: Coordinate) -> LocationFix {
        self.location.update(coordinate)
    }

    /// Runs the registration flow for one page load.
    ///
    /// An existing platform subscription is re-registered every time. Without
    /// one the user is prompted, unless they already declined in this session.
    /// The registry write needs a user id: without one the local state still
    /// advances but nothing is stored, and no prompt is shown.
    pub async fn on_load(&mut self, session: &Session) -> Result<RegistrationOutcome, LoadError> {
        let endpoint = match self.platform.existing_subscription().await {
            Some(endpoint) => endpoint,
            None => {
                if self.declined {
                    return Ok(RegistrationOutcome::Declined);
                }
                if session.user_id().is_none() {
                    tracing::debug!("push prompt deferred: no user id");
                    return Ok(RegistrationOutcome::IdentityPending);
                }
                self.state = RegistrationState::PermissionRequested;
                match self.platform.request_permission().await {
                    Permission::Granted => {}
                    Permission::Denied => {
                        self.state = RegistrationState::Unregistered;
                        self.declined = true;
                        tracing::info!("push permission declined");
                        return Ok(RegistrationOutcome::Declined);
                    }
                }
                match self.platform.subscribe().await {
                    Ok(endpoint) => endpoint,
                    Err(err) => {
                        self.state = RegistrationState::Unregistered;
                        return Err(err.into());
                    }
                }
            }
        };
        self.state = RegistrationState::Subscribed(endpoint.clone());

        let Some(user_id) = session.user_id() else {
            tracing::debug!("push registration deferred: no user id");
            return Ok(RegistrationOutcome::IdentityPending);
        };
        self.registry.upsert(user_id, &endpoint).await?;
        tracing::info!(user = %user_id, "push endpoint registered");
        Ok(RegistrationOutcome::Registered(endpoint))
    }

    /// Opens the live INSERT subscription. A watch that is already running
    /// is replaced.
    pub fn start_watching<S: MaydayStore>(
        &mut self,
        store: &S,
        config: WatchConfig,
        alerts: mpsc::Sender<Alert>,
    ) {
        let watcher = EventWatcher::new(self.time.clone(), config, self.location.reader());
        self.watch = Some(watcher.spawn(store.subscribe(), alerts));
    }

    pub fn is_watching(&self) -> bool {
        self.watch
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.watch.take() {
            handle.close().await;
        }
    }
}
