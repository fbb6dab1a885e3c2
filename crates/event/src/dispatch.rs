use crate::event::{Channel, Event};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub type Observer = Arc<dyn Fn(&Event) + Send + Sync>;

/// Returned by [`Dispatcher::subscribe`], used to unsubscribe again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// How observers are called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Delivery {
    /// On the emitting thread, in subscription order, before `emit` returns.
    #[default]
    Sync,
    /// Each observer on its own detached thread. No ordering between
    /// observers or between events.
    Thread,
}

/// Observer registry for named channels.
///
/// Observers are best-effort: one that panics is logged and skipped, and
/// never fails the operation that emitted the event.
pub struct Dispatcher {
    delivery: Delivery,
    observers: RwLock<BTreeMap<Channel, Vec<(SubscriptionId, Observer)>>>,
    next_id: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Delivery::default())
    }
}

impl Dispatcher {
    pub fn new(delivery: Delivery) -> Self {
        Self { delivery, observers: RwLock::default(), next_id: AtomicU64::new(0) }
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub fn subscribe(&self, channel: Channel, observer: impl Fn(&Event) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        observers.entry(channel).or_default().push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let mut found = false;
        for list in observers.values_mut() {
            let before = list.len();
            list.retain(|(sub, _)| *sub != id);
            found |= list.len() != before;
        }
        found
    }

    /// Deliver `event` to the observers of its channel.
    pub fn emit(&self, event: Event) {
        let channel = event.channel();
        // Observers are called without holding the lock, so they may
        // subscribe or emit themselves.
        let observers: Vec<Observer> = {
            let map = self.observers.read().unwrap_or_else(PoisonError::into_inner);
            map.get(&channel).map(|list| list.iter().map(|(_, o)| Arc::clone(o)).collect()).unwrap_or_default()
        };
        if observers.is_empty() {
            return;
        }
        match self.delivery {
            Delivery::Sync => {
                for observer in observers {
                    call(channel, &observer, &event);
                }
            },
            Delivery::Thread => {
                let event = Arc::new(event);
                for observer in observers {
                    let event = Arc::clone(&event);
                    let spawned = std::thread::Builder::new()
                        .name(format!("event-{channel}"))
                        .spawn(move || call(channel, &observer, &event));
                    if let Err(error) = spawned {
                        tracing::warn!(%channel, %error, "could not spawn observer thread");
                    }
                }
            },
        }
    }
}

fn call(channel: Channel, observer: &Observer, event: &Event) {
    if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
        tracing::warn!(%channel, "observer panicked, skipping");
    }
}
