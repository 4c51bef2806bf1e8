//! In-process subscriptions (typed events).
//!
//! Scope:
//! - Local pub/sub used on both sides of the history subsystem: the host
//!   publishes lifecycle events (loaded/subtree/typechanged), the controller
//!   publishes history events (store changes, toggles, restores).
//! - Subscribe to one event kind or to all of them.
//! - Drop of SubscriptionHandle unsubscribes.
//!
//! Notes:
//! - Callbacks run synchronously on the publishing thread, outside the
//!   registry lock: a callback may publish again or (un)subscribe.
//! - The bus is owned by whoever raises the events (one per host instance /
//!   one per controller).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Event routed by kind.
pub trait Topic {
    type Kind: Copy + Eq + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;
}

pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

struct BusInner<E: Topic> {
    next_id: u64,
    // id -> (kind filter, cb); BTreeMap: порядок доставки = порядок подписки
    subs: BTreeMap<u64, (Option<E::Kind>, Callback<E>)>,
}

/// Subscription registry.
pub struct EventBus<E: Topic> {
    inner: Mutex<BusInner<E>>,
}

trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

impl<E: Topic + 'static> EventBus<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(BusInner {
                next_id: 0,
                subs: BTreeMap::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BusInner<E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe for events of `kind` (None = every event).
    /// Returns a handle; dropping it unsubscribes.
    pub fn subscribe(self: &Arc<Self>, kind: Option<E::Kind>, cb: Callback<E>) -> SubscriptionHandle {
        let mut g = self.lock();
        let id = g.next_id;
        g.next_id = g.next_id.wrapping_add(1);
        g.subs.insert(id, (kind, cb));
        drop(g);
        let reg: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        SubscriptionHandle { id, reg }
    }

    /// Publish an event to all matching subscribers. Returns the number of
    /// callbacks invoked.
    pub fn publish(&self, ev: &E) -> usize {
        let kind = ev.kind();
        let callbacks: Vec<Callback<E>> = {
            let g = self.lock();
            g.subs
                .values()
                .filter_map(|(filter, cb)| match filter {
                    Some(k) if *k != kind => None,
                    _ => Some(cb.clone()),
                })
                .collect()
        };
        // Execute outside the lock
        for cb in &callbacks {
            cb(ev);
        }
        callbacks.len()
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lock().subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Topic + 'static> Unsubscribe for EventBus<E>
where
    E::Kind: Send + Sync,
{
    fn unsubscribe(&self, id: u64) {
        self.lock().subs.remove(&id);
    }
}

/// RAII handle: unsubscribes on drop.
pub struct SubscriptionHandle {
    id: u64,
    reg: Weak<dyn Unsubscribe>,
}

impl SubscriptionHandle {
    /// Explicit unsubscribe (same as drop).
    pub fn cancel(self) {}
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("live", &(self.reg.strong_count() > 0))
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(reg) = self.reg.upgrade() {
            reg.unsubscribe(self.id);
        }
    }
}

/// Public helper for building callbacks.
pub fn callback<E, F>(f: F) -> Callback<E>
where
    F: Fn(&E) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ping {
        A,
        B,
    }

    impl Topic for Ping {
        type Kind = Ping;
        fn kind(&self) -> Ping {
            *self
        }
    }

    #[test]
    fn filter_by_kind() {
        let bus = EventBus::<Ping>::new();
        let a = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let a2 = a.clone();
        let _h1 = bus.subscribe(Some(Ping::A), callback(move |_| {
            a2.fetch_add(1, Ordering::SeqCst);
        }));
        let all2 = all.clone();
        let _h2 = bus.subscribe(None, callback(move |_| {
            all2.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(bus.publish(&Ping::A), 2);
        assert_eq!(bus.publish(&Ping::B), 1);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = EventBus::<Ping>::new();
        let h = bus.subscribe(None, callback(|_| {}));
        assert_eq!(bus.len(), 1);
        drop(h);
        assert!(bus.is_empty());
        assert_eq!(bus.publish(&Ping::A), 0);
    }

    #[test]
    fn handle_outliving_bus_is_harmless() {
        let bus = EventBus::<Ping>::new();
        let h = bus.subscribe(None, callback(|_| {}));
        drop(bus);
        h.cancel();
    }

    #[test]
    fn callback_may_subscribe_reentrantly() {
        let bus = EventBus::<Ping>::new();
        let bus2 = bus.clone();
        let held = Arc::new(Mutex::new(Vec::new()));
        let held2 = held.clone();
        let _h = bus.subscribe(Some(Ping::A), callback(move |_| {
            let h = bus2.subscribe(Some(Ping::B), callback(|_| {}));
            held2.lock().unwrap().push(h);
        }));
        bus.publish(&Ping::A);
        assert_eq!(bus.len(), 2);
        // held -> bus2 -> bus: разорвём цикл вручную
        held.lock().unwrap().clear();
        assert_eq!(bus.len(), 1);
    }
}
