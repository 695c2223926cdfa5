//! # In-process notification fan-out.
//!
//! Two entry points with different ownership contracts:
//!
//! | Entry point                | Scope            | Deadline                 | Caller waits for          |
//! |----------------------------|------------------|--------------------------|---------------------------|
//! | [`MessagePublisher`]       | caller's (borrowed) | caller's token only   | every handler             |
//! | [`MessageDispatcher`]      | fresh, owned     | explicit or configured   | every handler or deadline |
//!
//! Both resolve handlers late (per call), run them sequentially, log and swallow
//! handler failures, and open the notification's log scope when it has one.

mod dispatcher;
mod fan_out;
mod notification;
mod publisher;

pub use dispatcher::MessageDispatcher;
pub use notification::{LogScopeProvider, Notification, NotificationHandler};
pub use publisher::MessagePublisher;

pub(crate) use fan_out::panic_message;
