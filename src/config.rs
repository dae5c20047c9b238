use crate::types::push::{PushMessage, VapidConfig};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PUSH_TITLE: &str = "Mayday";
pub const DEFAULT_PUSH_BODY: &str = "A mayday was raised nearby.";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub app_name: String,
    pub vapid: VapidConfig,
    pub auth: Option<AuthConfig>,
    /// TOML file backing the endpoint registry. `None` keeps it in memory.
    pub registry_path: Option<PathBuf>,
    pub delivery_timeout: Duration,
    pub push_title: String,
    pub push_body: String,
    pub feed_capacity: usize,
}

impl AppConfig {
    pub fn push_message(&self) -> PushMessage {
        PushMessage::new(self.push_title.clone(), self.push_body.clone())
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: time::Duration,
    pub cookie_name: String,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            app_name: "Mayday".to_string(),
            vapid: VapidConfig {
                contact: "mailto:ops@example.com".to_string(),
                public_key: "test-public-key".to_string(),
                private_key: "test-private-key".to_string(),
            },
            auth: None,
            registry_path: None,
            delivery_timeout: Duration::from_secs(30),
            push_title: DEFAULT_PUSH_TITLE.to_string(),
            push_body: DEFAULT_PUSH_BODY.to_string(),
            feed_capacity: crate::feed::DEFAULT_FEED_CAPACITY,
        }
    }
}
