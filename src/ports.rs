pub mod location;
pub mod platform;
pub mod push;
pub mod registry;
pub mod relay;
pub mod store;
pub mod time;

pub use location::LocationProvider;
pub use platform::{Permission, PushPlatform};
pub use push::{PushSender, TransportFailure};
pub use registry::EndpointRegistry;
pub use relay::PushRelay;
pub use store::{MaydayStore, MaydaySubscription};
pub use time::TimeProvider;
