use crate::types::push::Subscription;

/// Transport errors say whether the endpoint itself is gone (expired or
/// unsubscribed) as opposed to a transient failure.
pub trait TransportFailure: std::fmt::Display + Send + Sync + 'static {
    fn is_endpoint_gone(&self) -> bool {
        false
    }
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: TransportFailure;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a str) -> Self::Fut<'a>;
}
