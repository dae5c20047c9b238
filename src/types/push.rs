use crate::types::mayday::UserId;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub contact: String,
    pub public_key: String,
    pub private_key: String,
}

/// Transport-specific data identifying one device. Stored and passed around
/// untouched; only the relay looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointDescriptor(serde_json::Value);

impl EndpointDescriptor {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }
}

impl From<Subscription> for EndpointDescriptor {
    fn from(subscription: Subscription) -> Self {
        // Serializing a struct of strings cannot fail.
        Self(serde_json::to_value(subscription).unwrap_or(serde_json::Value::Null))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub user_id: UserId,
    pub endpoint: EndpointDescriptor,
}

/// Browser `PushSubscription` JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

impl TryFrom<&EndpointDescriptor> for Subscription {
    type Error = String;

    fn try_from(descriptor: &EndpointDescriptor) -> Result<Self, Self::Error> {
        let subscription: Subscription = serde_json::from_value(descriptor.as_value().clone())
            .map_err(|err| format!("invalid subscription: {err}"))?;
        if subscription.endpoint.trim().is_empty()
            || subscription.keys.p256dh.trim().is_empty()
            || subscription.keys.auth.trim().is_empty()
        {
            return Err("invalid subscription: endpoint, p256dh, and auth are required".to_string());
        }
        Ok(subscription)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
        }
    }

    pub fn payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
