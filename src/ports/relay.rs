use crate::error::RelayError;
use crate::types::push::{EndpointDescriptor, PushMessage};

pub trait PushRelay: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<(), RelayError>> + Send + 'a
    where
        Self: 'a;

    fn relay<'a>(
        &'a self,
        subscription: Option<&'a EndpointDescriptor>,
        message: &'a PushMessage,
    ) -> Self::Fut<'a>;
}
