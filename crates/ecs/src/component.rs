use voxel_kernel::{DestroyMessage, MessageBus, Priority, Subscription};

use crate::entity::{Owner, destroy};

/// A behaviour unit owned by exactly one entity.
pub trait Component: 'static {
    /// Called once with the owning entity, before `init`.
    fn setup(&mut self, owner: &Owner);

    fn init(&mut self) {}

    /// Called once when the owning entity is destroyed.
    fn destroy(&mut self);

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Subscribes its owner to [`DestroyMessage`] so the owner tears itself down
/// at shutdown without bespoke code.
#[derive(Debug, Default)]
pub struct GlobalSubscriber {
    priority: Priority,
    bus: Option<MessageBus>,
    subscription: Option<Subscription>,
}

impl GlobalSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order this owner's teardown relative to other destroy subscribers.
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Component for GlobalSubscriber {
    fn setup(&mut self, owner: &Owner) {
        let handle = owner.handle();
        let subscription = owner.bus().subscribe_with_priority::<DestroyMessage>(
            owner.id(),
            self.priority,
            move |_| {
                if let Some(entity) = handle.upgrade() {
                    destroy(&*entity);
                }
            },
        );
        self.bus = Some(owner.bus().clone());
        self.subscription = Some(subscription);
    }

    fn destroy(&mut self) {
        if let (Some(bus), Some(subscription)) = (&self.bus, self.subscription.take()) {
            bus.unsubscribe(&subscription);
        }
    }

    fn name(&self) -> &'static str {
        "GlobalSubscriber"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityBehavior, Shared, attach, spawn};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Resource {
        entity: Entity,
        frees: Rc<Cell<u32>>,
        order: Rc<RefCell<Vec<&'static str>>>,
        label: &'static str,
    }

    impl EntityBehavior for Resource {
        fn entity(&self) -> &Entity {
            &self.entity
        }

        fn entity_mut(&mut self) -> &mut Entity {
            &mut self.entity
        }

        fn on_destroy(&mut self) {
            self.frees.set(self.frees.get() + 1);
            self.order.borrow_mut().push(self.label);
        }
    }

    fn resource(
        bus: &MessageBus,
        label: &'static str,
        order: &Rc<RefCell<Vec<&'static str>>>,
        subscriber: GlobalSubscriber,
    ) -> (Shared<Resource>, Rc<Cell<u32>>) {
        let frees = Rc::new(Cell::new(0));
        let this = spawn(Resource {
            entity: Entity::new(label, bus),
            frees: frees.clone(),
            order: order.clone(),
            label,
        });
        attach(&this, subscriber);
        (this, frees)
    }

    #[test]
    fn destroy_broadcast_tears_down_every_subscriber() {
        let bus = MessageBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let resources: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|label| resource(&bus, label, &order, GlobalSubscriber::new()))
            .collect();

        assert_eq!(bus.publish(&DestroyMessage), 3);
        for (this, frees) in &resources {
            assert!(this.borrow().entity().is_destroyed());
            assert_eq!(frees.get(), 1);
        }

        // second broadcast reaches nobody and frees nothing twice
        assert_eq!(bus.publish(&DestroyMessage), 0);
        for (_, frees) in &resources {
            assert_eq!(frees.get(), 1);
        }
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn explicit_destroy_before_broadcast() {
        let bus = MessageBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (first, first_frees) = resource(&bus, "first", &order, GlobalSubscriber::new());
        let (_second, second_frees) = resource(&bus, "second", &order, GlobalSubscriber::new());

        crate::destroy(&*first);
        assert_eq!(bus.subscriber_count::<DestroyMessage>(), 1);
        bus.publish(&DestroyMessage);
        assert_eq!(first_frees.get(), 1);
        assert_eq!(second_frees.get(), 1);
    }

    #[test]
    fn priority_orders_teardown() {
        let bus = MessageBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let late = GlobalSubscriber::with_priority(Priority::LATE);
        let _shader = resource(&bus, "shader", &order, late);
        let _env = resource(&bus, "environment", &order, GlobalSubscriber::new());
        bus.publish(&DestroyMessage);
        assert_eq!(*order.borrow(), vec!["environment", "shader"]);
    }
}
