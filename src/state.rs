use crate::adapters::UtcTimeProvider;
use crate::auth::{AuthError, AuthState};
use crate::config::AppConfig;
use crate::feed::MaydayFeed;
use crate::ports::PushSender;
use crate::push::{Broadcaster, DeliveryTasks, RelayService};
use crate::registry::{FileRegistry, MemoryRegistry, Registry};

pub type Feed = MaydayFeed<UtcTimeProvider>;

#[derive(Clone)]
pub struct AppState<S> {
    pub config: AppConfig,
    pub auth: Option<AuthState>,
    pub registry: Registry,
    pub feed: Feed,
    pub relay: RelayService<S>,
    pub broadcaster: Broadcaster<Feed, Registry, RelayService<S>>,
    pub deliveries: DeliveryTasks,
}

impl<S: PushSender> AppState<S> {
    pub fn new(config: AppConfig, sender: S) -> Result<Self, AuthError> {
        let auth = AuthState::from_config(&config)?;
        let registry = match &config.registry_path {
            Some(path) => Registry::File(FileRegistry::new(path.clone())),
            None => Registry::Memory(MemoryRegistry::new()),
        };
        let feed = MaydayFeed::new(UtcTimeProvider, config.feed_capacity);
        let relay = RelayService::new(sender);
        let broadcaster = Broadcaster::new(
            feed.clone(),
            registry.clone(),
            relay.clone(),
            config.push_message(),
        )
        .with_delivery_timeout(config.delivery_timeout);

        Ok(Self {
            config,
            auth,
            registry,
            feed,
            relay,
            broadcaster,
            deliveries: DeliveryTasks::new(),
        })
    }
}
