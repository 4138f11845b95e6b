//! Process-wide typed publish/subscribe registry.
//!
//! One channel per concrete message kind, keyed by `TypeId`. Dispatch is
//! synchronous on the calling thread, ordered by [`Priority`] and then by
//! registration order.

use std::any::{Any, TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use voxel_common::EntityId;

/// Marker for values that travel over the bus.
///
/// Messages are handed to subscribers by shared reference and are never
/// mutated after construction.
pub trait Message: Any + fmt::Debug {}

/// Dispatch order within one message kind. Lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(pub i16);

impl Priority {
    pub const FIRST: Self = Self(i16::MIN);
    pub const EARLY: Self = Self(-100);
    pub const NORMAL: Self = Self(0);
    pub const LATE: Self = Self(100);
    pub const LAST: Self = Self(i16::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Revocable handle returned by [`MessageBus::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
    kind: TypeId,
    kind_name: &'static str,
    owner: EntityId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Type name of the message kind this subscription listens to.
    pub fn kind_name(&self) -> &'static str {
        self.kind_name
    }
}

type Callback<M> = Rc<RefCell<dyn FnMut(&M)>>;

struct Slot<M> {
    id: SubscriptionId,
    owner: EntityId,
    priority: Priority,
    alive: Rc<Cell<bool>>,
    callback: Callback<M>,
}

struct Channel<M> {
    slots: Vec<Slot<M>>,
}

impl<M: Message> Channel<M> {
    fn snapshot(&self) -> Vec<(Rc<Cell<bool>>, Callback<M>)> {
        self.slots
            .iter()
            .map(|s| (s.alive.clone(), s.callback.clone()))
            .collect()
    }
}

/// Type-erased view of a channel so ownership sweeps can cross kinds.
///
/// Removal hands the revoked callbacks back so the caller can drop them after
/// releasing the registry; a callback may own the last handle to an entity
/// whose own teardown touches the bus.
trait AnyChannel {
    fn remove(&mut self, id: SubscriptionId) -> Option<Box<dyn Any>>;
    fn remove_owner(&mut self, owner: EntityId) -> Vec<Box<dyn Any>>;
    fn count_owner(&self, owner: EntityId) -> usize;
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<M: Message> AnyChannel for Channel<M> {
    fn remove(&mut self, id: SubscriptionId) -> Option<Box<dyn Any>> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        let slot = self.slots.remove(pos);
        slot.alive.set(false);
        Some(Box::new(slot.callback))
    }

    fn remove_owner(&mut self, owner: EntityId) -> Vec<Box<dyn Any>> {
        let (revoked, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.slots)
            .into_iter()
            .partition(|s| s.owner == owner);
        self.slots = kept;
        revoked
            .into_iter()
            .map(|s| {
                s.alive.set(false);
                Box::new(s.callback) as Box<dyn Any>
            })
            .collect()
    }

    fn count_owner(&self, owner: EntityId) -> usize {
        self.slots.iter().filter(|s| s.owner == owner).count()
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct Registry {
    channels: HashMap<TypeId, Box<dyn AnyChannel>>,
    dispatching: HashSet<TypeId>,
    next_id: u64,
}

/// Shared handle to the message bus. Clones refer to the same registry.
#[derive(Clone, Default)]
pub struct MessageBus {
    inner: Rc<RefCell<Registry>>,
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBus")
            .field("subscriptions", &self.total_subscriptions())
            .finish()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every published `M`, at [`Priority::NORMAL`].
    pub fn subscribe<M: Message>(
        &self,
        owner: EntityId,
        callback: impl FnMut(&M) + 'static,
    ) -> Subscription {
        self.subscribe_with_priority(owner, Priority::NORMAL, callback)
    }

    /// Register `callback` for every published `M`.
    ///
    /// A subscription added while `M` is being dispatched first sees the next
    /// publish of `M`.
    pub fn subscribe_with_priority<M: Message>(
        &self,
        owner: EntityId,
        priority: Priority,
        callback: impl FnMut(&M) + 'static,
    ) -> Subscription {
        let mut reg = self.inner.borrow_mut();
        reg.next_id += 1;
        let id = SubscriptionId(reg.next_id);
        let channel = reg
            .channels
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Box::new(Channel::<M> { slots: Vec::new() }));
        let Some(channel) = channel.as_any_mut().downcast_mut::<Channel<M>>() else {
            unreachable!("channel registered under a foreign TypeId");
        };
        let pos = channel.slots.partition_point(|s| s.priority <= priority);
        channel.slots.insert(
            pos,
            Slot {
                id,
                owner,
                priority,
                alive: Rc::new(Cell::new(true)),
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        tracing::debug!(
            kind = type_name::<M>(),
            owner = %owner,
            priority = priority.0,
            "subscribed"
        );
        Subscription {
            id,
            kind: TypeId::of::<M>(),
            kind_name: type_name::<M>(),
            owner,
        }
    }

    /// Revoke one subscription. Returns false if it was already gone.
    ///
    /// Revoking during a dispatch of the same kind skips the callback if it
    /// has not run yet.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let revoked = self
            .inner
            .borrow_mut()
            .channels
            .get_mut(&subscription.kind)
            .and_then(|c| c.remove(subscription.id));
        let removed = revoked.is_some();
        drop(revoked);
        if removed {
            tracing::debug!(
                kind = subscription.kind_name,
                owner = %subscription.owner,
                "unsubscribed"
            );
        }
        removed
    }

    /// Revoke every subscription held by `owner`, across all message kinds.
    pub fn unsubscribe_owner(&self, owner: EntityId) -> usize {
        let revoked: Vec<Box<dyn Any>> = self
            .inner
            .borrow_mut()
            .channels
            .values_mut()
            .flat_map(|c| c.remove_owner(owner))
            .collect();
        let removed = revoked.len();
        drop(revoked);
        if removed > 0 {
            tracing::debug!(owner = %owner, removed, "dropped owner subscriptions");
        }
        removed
    }

    /// Deliver `message` to every subscriber of `M`. Returns how many
    /// callbacks ran.
    ///
    /// # Panics
    /// Publishing `M` from inside a callback that is handling `M`.
    pub fn publish<M: Message>(&self, message: &M) -> usize {
        let kind = TypeId::of::<M>();
        let snapshot = {
            let mut reg = self.inner.borrow_mut();
            if !reg.dispatching.insert(kind) {
                drop(reg);
                panic!(
                    "re-entrant publish of {} while it is being dispatched",
                    type_name::<M>()
                );
            }
            reg.channels
                .get(&kind)
                .and_then(|c| c.as_any().downcast_ref::<Channel<M>>())
                .map(Channel::snapshot)
                .unwrap_or_default()
        };
        let _guard = DispatchGuard { bus: self, kind };

        tracing::trace!(kind = type_name::<M>(), subscribers = snapshot.len(), "publish");
        let mut delivered = 0;
        for (alive, callback) in &snapshot {
            if !alive.get() {
                continue;
            }
            let mut callback = callback.borrow_mut();
            (&mut *callback)(message);
            delivered += 1;
        }
        delivered
    }

    /// Number of live subscriptions for `M`.
    pub fn subscriber_count<M: Message>(&self) -> usize {
        self.inner
            .borrow()
            .channels
            .get(&TypeId::of::<M>())
            .map_or(0, |c| c.len())
    }

    /// Number of live subscriptions held by `owner`.
    pub fn owner_subscription_count(&self, owner: EntityId) -> usize {
        self.inner
            .borrow()
            .channels
            .values()
            .map(|c| c.count_owner(owner))
            .sum()
    }

    pub fn total_subscriptions(&self) -> usize {
        self.inner.borrow().channels.values().map(|c| c.len()).sum()
    }
}

/// Clears the in-dispatch mark for a kind, also when a callback panics.
struct DispatchGuard<'a> {
    bus: &'a MessageBus,
    kind: TypeId,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut reg) = self.bus.inner.try_borrow_mut() {
            reg.dispatching.remove(&self.kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);
    impl Message for Ping {}

    #[derive(Debug)]
    struct Pong;
    impl Message for Pong {}

    type Log = Rc<RefCell<Vec<(u32, u32)>>>;

    fn recorder(bus: &MessageBus, tag: u32, log: &Log) -> Subscription {
        let log = log.clone();
        bus.subscribe::<Ping>(EntityId::new(), move |m| log.borrow_mut().push((tag, m.0)))
    }

    #[test]
    fn fan_out_in_registration_order() {
        let bus = MessageBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            recorder(&bus, tag, &log);
        }
        for value in 10..14 {
            assert_eq!(bus.publish(&Ping(value)), 3);
        }

        let log = log.borrow();
        assert_eq!(log.len(), 12);
        for (i, value) in (10..14).enumerate() {
            assert_eq!(&log[i * 3..i * 3 + 3], &[(0, value), (1, value), (2, value)]);
        }
    }

    #[test]
    fn kinds_are_isolated() {
        let bus = MessageBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        recorder(&bus, 0, &log);
        assert_eq!(bus.publish(&Pong), 0);
        assert!(log.borrow().is_empty());
        assert_eq!(bus.subscriber_count::<Ping>(), 1);
        assert_eq!(bus.subscriber_count::<Pong>(), 0);
    }

    #[test]
    fn priority_orders_before_registration() {
        let bus = MessageBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let subscribers = [
            ("normal", Priority::NORMAL),
            ("late", Priority::LATE),
            ("early", Priority::EARLY),
            ("normal2", Priority::NORMAL),
        ];
        for (name, priority) in subscribers {
            let order = order.clone();
            bus.subscribe_with_priority::<Pong>(EntityId::new(), priority, move |_| {
                order.borrow_mut().push(name)
            });
        }
        bus.publish(&Pong);
        assert_eq!(*order.borrow(), vec!["early", "normal", "normal2", "late"]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = MessageBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sub = recorder(&bus, 0, &log);
        bus.publish(&Ping(1));
        assert!(bus.unsubscribe(&sub));
        assert!(!bus.unsubscribe(&sub));
        bus.publish(&Ping(2));
        assert_eq!(*log.borrow(), vec![(0, 1)]);
    }

    #[test]
    fn unsubscribe_owner_crosses_kinds() {
        let bus = MessageBus::new();
        let owner = EntityId::new();
        bus.subscribe::<Ping>(owner, |_| {});
        bus.subscribe::<Pong>(owner, |_| {});
        bus.subscribe::<Pong>(EntityId::new(), |_| {});
        assert_eq!(bus.owner_subscription_count(owner), 2);
        assert_eq!(bus.unsubscribe_owner(owner), 2);
        assert_eq!(bus.owner_subscription_count(owner), 0);
        assert_eq!(bus.total_subscriptions(), 1);
    }

    #[test]
    fn revoked_mid_dispatch_is_skipped() {
        let bus = MessageBus::new();
        let hits = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let (b, v) = (bus.clone(), victim.clone());
        bus.subscribe::<Pong>(EntityId::new(), move |_| {
            if let Some(sub) = v.borrow_mut().take() {
                b.unsubscribe(&sub);
            }
        });
        let h = hits.clone();
        let sub = bus.subscribe::<Pong>(EntityId::new(), move |_| h.set(h.get() + 1));
        *victim.borrow_mut() = Some(sub);

        assert_eq!(bus.publish(&Pong), 1);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn added_mid_dispatch_waits_for_next_publish() {
        let bus = MessageBus::new();
        let hits = Rc::new(Cell::new(0));
        let (b, h) = (bus.clone(), hits.clone());
        let added = Rc::new(Cell::new(false));
        bus.subscribe::<Pong>(EntityId::new(), move |_| {
            if !added.replace(true) {
                let h = h.clone();
                b.subscribe::<Pong>(EntityId::new(), move |_| h.set(h.get() + 1));
            }
        });
        bus.publish(&Pong);
        assert_eq!(hits.get(), 0);
        bus.publish(&Pong);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn nested_publish_of_other_kind_is_allowed() {
        let bus = MessageBus::new();
        let pongs = Rc::new(Cell::new(0));
        let p = pongs.clone();
        bus.subscribe::<Pong>(EntityId::new(), move |_| p.set(p.get() + 1));
        let b = bus.clone();
        bus.subscribe::<Ping>(EntityId::new(), move |_| {
            b.publish(&Pong);
        });
        bus.publish(&Ping(0));
        bus.publish(&Ping(1));
        assert_eq!(pongs.get(), 2);
    }

    #[test]
    #[should_panic(expected = "re-entrant publish")]
    fn nested_publish_of_same_kind_panics() {
        let bus = MessageBus::new();
        let b = bus.clone();
        bus.subscribe::<Ping>(EntityId::new(), move |m| {
            b.publish(&Ping(m.0 + 1));
        });
        bus.publish(&Ping(0));
    }

    /// Sweeps its owner from the bus when dropped.
    struct Unsubscribes {
        bus: MessageBus,
        owner: EntityId,
        dropped: Rc<Cell<bool>>,
    }

    impl Drop for Unsubscribes {
        fn drop(&mut self) {
            self.bus.unsubscribe_owner(self.owner);
            self.dropped.set(true);
        }
    }

    #[test]
    fn revoked_callbacks_drop_outside_the_registry() {
        let bus = MessageBus::new();
        let (outer, inner) = (EntityId::new(), EntityId::new());
        bus.subscribe::<Ping>(inner, |_| {});
        let dropped = Rc::new(Cell::new(false));
        let held = Unsubscribes {
            bus: bus.clone(),
            owner: inner,
            dropped: dropped.clone(),
        };
        bus.subscribe::<Pong>(outer, move |_| {
            let _ = &held;
        });

        // dropping the callback re-enters the bus to sweep `inner`
        assert_eq!(bus.unsubscribe_owner(outer), 1);
        assert!(dropped.get());
        assert_eq!(bus.total_subscriptions(), 0);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = MessageBus::new();
        assert_eq!(bus.publish(&Ping(3)), 0);
        // the kind is released again after an empty dispatch
        assert_eq!(bus.publish(&Ping(4)), 0);
    }
}
