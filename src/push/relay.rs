use crate::error::RelayError;
use crate::ports::{PushRelay, PushSender, TransportFailure};
use crate::types::push::{EndpointDescriptor, PushMessage, Subscription};

use std::future::Future;
use std::pin::Pin;

/// Forwards one message to one endpoint. Holds no per-request state, so a
/// single instance serves concurrent requests.
#[derive(Clone)]
pub struct RelayService<S> {
    sender: S,
}

impl<S: PushSender> RelayService<S> {
    pub fn new(sender: S) -> Self {
        Self { sender }
    }

    pub async fn send(
        &self,
        subscription: Option<&EndpointDescriptor>,
        message: &PushMessage,
    ) -> Result<(), RelayError> {
        let descriptor =
            subscription.ok_or_else(|| RelayError::BadRequest("No subscription".to_string()))?;
        let subscription = Subscription::try_from(descriptor).map_err(RelayError::BadRequest)?;
        let payload = message.payload();

        self.sender
            .send(&subscription, &payload)
            .await
            .map_err(|err| RelayError::Transport {
                message: err.to_string(),
                endpoint_gone: err.is_endpoint_gone(),
            })
    }
}

impl<S: PushSender> PushRelay for RelayService<S> {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send + 'a>>
    where
        Self: 'a;

    fn relay<'a>(
        &'a self,
        subscription: Option<&'a EndpointDescriptor>,
        message: &'a PushMessage,
    ) -> Self::Fut<'a> {
        Box::pin(self.send(subscription, message))
    }
}
