pub mod broadcast;
pub mod relay;
pub mod vapid;

pub use broadcast::{Broadcaster, DeliveryOutcome, DeliveryTasks, DispatchReport, Fanout};
pub use relay::RelayService;
