//! Notifications emitted while fonts are registered and downloaded.
//!
//! Emitters hold a [`DispatcherHandle`] and call [`Dispatcher::emit`];
//! observers subscribe per [`Channel`]. Whether observers run inline or on
//! their own threads is decided once, when the dispatcher is created.

mod dispatch;
mod event;

pub use crate::dispatch::{Delivery, Dispatcher, Observer, SubscriptionId};
pub use crate::event::{Channel, Event, Progress, Total};
use std::sync::Arc;

pub type DispatcherHandle = Arc<Dispatcher>;
