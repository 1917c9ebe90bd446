//! Application layer: the producer loop and the server lifecycle.

pub mod event_feed;
pub mod lifecycle;

pub use event_feed::{EventFeed, FeedReport};
pub use lifecycle::{LifecycleConfig, LifecycleController, LifecycleState, ShutdownSwitch};
