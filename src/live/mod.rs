//! Live update channel.
//!
//! [`subscribe`] starts a supervisor task that keeps one channel connected
//! and feeds inbound frames to the [`Dispatcher`]. The caller holds a
//! [`SubscriptionHandle`] for status and cancellation.
//!
//! ```ignore
//! use feedwire::config::ChannelConfig;
//! use feedwire::live::{subscribe_default, EventHandlers};
//!
//! let handlers = EventHandlers::new().on_new_item(|article| {
//!     println!("{}", article.title);
//!     Ok(())
//! });
//! let handle = subscribe_default(ChannelConfig::from_env()?, handlers);
//! // ...
//! handle.cancel();
//! ```

pub mod backoff;
pub mod dispatcher;
pub mod handle;
pub mod messages;
pub mod supervisor;

pub use backoff::{linear_delay, BackoffPolicy, RetryDecision};
pub use dispatcher::{DispatchOutcome, DispatchSnapshot, DispatchStats, Dispatcher, EventHandlers};
pub use handle::SubscriptionHandle;
pub use messages::{EventKind, LiveEvent, NewItem, RawFrame};
pub use supervisor::{subscribe, subscribe_default};
