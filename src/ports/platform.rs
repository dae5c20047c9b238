use crate::error::PlatformError;
use crate::types::push::EndpointDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// The device side of push: existing subscription lookup, the permission
/// prompt, and creating a new subscription.
pub trait PushPlatform: Send + Sync {
    type ExistingFut<'a>: Future<Output = Option<EndpointDescriptor>> + Send + 'a
    where
        Self: 'a;
    type PermissionFut<'a>: Future<Output = Permission> + Send + 'a
    where
        Self: 'a;
    type SubscribeFut<'a>: Future<Output = Result<EndpointDescriptor, PlatformError>> + Send + 'a
    where
        Self: 'a;

    fn existing_subscription<'a>(&'a self) -> Self::ExistingFut<'a>;
    fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a>;
    fn subscribe<'a>(&'a self) -> Self::SubscribeFut<'a>;
}
