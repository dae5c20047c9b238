use std::pin::Pin;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::error::LocationError;
use crate::geo::Coordinate;
use crate::ports;
use crate::types::push::{Subscription, VapidConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct UtcTimeProvider;

impl ports::TimeProvider for UtcTimeProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Coordinate handed over by the caller (request body, device callback).
#[derive(Debug, Clone, Copy)]
pub struct ReportedLocation(pub Option<Coordinate>);

impl ports::LocationProvider for ReportedLocation {
    type Fut<'a>
        = std::future::Ready<Result<Coordinate, LocationError>>
    where
        Self: 'a;

    fn locate<'a>(&'a self) -> Self::Fut<'a> {
        let result = match self.0 {
            None => Err(LocationError::Unsupported),
            Some(coordinate) => coordinate
                .validate()
                .map(|()| coordinate)
                .map_err(|err| LocationError::Failed(err.to_string())),
        };
        std::future::ready(result)
    }
}

impl ports::TransportFailure for web_push::WebPushError {
    fn is_endpoint_gone(&self) -> bool {
        matches!(
            self,
            web_push::WebPushError::EndpointNotValid | web_push::WebPushError::EndpointNotFound
        )
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.keys.p256dh.clone(),
                subscription.keys.auth.clone(),
            );
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload.as_bytes());
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.contact.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}
