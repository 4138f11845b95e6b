use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use voxel_common::EntityId;
use voxel_kernel::{Message, MessageBus, Priority, Subscription};

use crate::component::Component;

/// Single-threaded shared ownership used for every live entity.
pub type Shared<T> = Rc<RefCell<T>>;

/// Identity and lifecycle state embedded in every concrete entity.
pub struct Entity {
    id: EntityId,
    name: String,
    bus: MessageBus,
    components: Vec<Box<dyn Component>>,
    subscriptions: Vec<Subscription>,
    destroyed: bool,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("components", &self.components.len())
            .field("subscriptions", &self.subscriptions.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Entity {
    pub fn new(name: impl Into<String>, bus: &MessageBus) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            bus: bus.clone(),
            components: Vec::new(),
            subscriptions: Vec::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Subscriptions made directly through [`subscribe`].
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Destroy components in attachment order and drop every bus
    /// subscription owned by this entity. Returns false if already torn down.
    fn teardown(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        for mut component in std::mem::take(&mut self.components) {
            component.destroy();
        }
        self.subscriptions.clear();
        let dropped = self.bus.unsubscribe_owner(self.id);
        tracing::debug!(entity = %self.id, name = %self.name, dropped, "entity destroyed");
        true
    }
}

/// An entity dropped without [`destroy`] still releases its components and bus
/// slots. Its `on_destroy` cannot run from here; entities that own outside
/// resources call [`destroy_in_place`] from their own `Drop`.
impl Drop for Entity {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        tracing::debug!(entity = %self.id, name = %self.name, "entity dropped undestroyed");
        self.teardown();
    }
}

/// Implemented by every concrete entity.
pub trait EntityBehavior: 'static {
    fn entity(&self) -> &Entity;
    fn entity_mut(&mut self) -> &mut Entity;

    /// Attach components and subscribe to messages. Runs once, from [`spawn`].
    fn register_components(_this: &Shared<Self>)
    where
        Self: Sized,
    {
    }

    /// Release owned resources. Runs once, after components are destroyed and
    /// subscriptions dropped. Dropping an entity alone does not call it.
    fn on_destroy(&mut self) {}
}

/// Wrap a freshly built entity and run its registration hook.
pub fn spawn<T: EntityBehavior>(value: T) -> Shared<T> {
    let this = Rc::new(RefCell::new(value));
    T::register_components(&this);
    {
        let me = this.borrow();
        let entity = me.entity();
        tracing::debug!(
            entity = %entity.id(),
            name = %entity.name(),
            components = entity.component_count(),
            subscriptions = entity.bus().owner_subscription_count(entity.id()),
            "entity spawned"
        );
    }
    this
}

/// Attach a component: `setup(owner)`, then `init()`, then append.
pub fn attach<T: EntityBehavior>(this: &Shared<T>, mut component: impl Component) {
    let owner = Owner::of(this);
    if owner.is_destroyed() {
        tracing::warn!(
            entity = %owner.id(),
            component = component.name(),
            "attach to destroyed entity ignored"
        );
        return;
    }
    component.setup(&owner);
    component.init();
    tracing::debug!(entity = %owner.id(), component = component.name(), "component attached");
    this.borrow_mut()
        .entity_mut()
        .components
        .push(Box::new(component));
}

/// Subscribe `this` to `M` at [`Priority::NORMAL`].
pub fn subscribe<T, M>(
    this: &Shared<T>,
    callback: impl FnMut(&mut T, &M) + 'static,
) -> Subscription
where
    T: EntityBehavior,
    M: Message,
{
    subscribe_with_priority(this, Priority::NORMAL, callback)
}

/// Subscribe `this` to `M`. The callback gets the entity mutably borrowed.
///
/// # Panics
/// The callback panics if the entity is already borrowed when `M` arrives,
/// i.e. the entity published `M` from inside its own handler.
pub fn subscribe_with_priority<T, M>(
    this: &Shared<T>,
    priority: Priority,
    mut callback: impl FnMut(&mut T, &M) + 'static,
) -> Subscription
where
    T: EntityBehavior,
    M: Message,
{
    let weak = Rc::downgrade(this);
    let (id, bus) = {
        let me = this.borrow();
        (me.entity().id(), me.entity().bus().clone())
    };
    let subscription = bus.subscribe_with_priority::<M>(id, priority, move |msg| {
        let Some(strong) = weak.upgrade() else {
            return;
        };
        let Ok(mut me) = strong.try_borrow_mut() else {
            panic!(
                "{} re-entered while handling {}",
                type_name::<T>(),
                type_name::<M>()
            );
        };
        if me.entity().is_destroyed() {
            return;
        }
        callback(&mut *me, msg);
    });
    this.borrow_mut()
        .entity_mut()
        .subscriptions
        .push(subscription.clone());
    subscription
}

/// Destroy an entity held in a cell. Returns false if it was already destroyed.
///
/// # Panics
/// If the entity is currently borrowed; use [`destroy_in_place`] from inside
/// the entity's own handlers.
pub fn destroy<T: EntityBehavior + ?Sized>(cell: &RefCell<T>) -> bool {
    let Ok(mut me) = cell.try_borrow_mut() else {
        panic!("entity destroyed while it is borrowed");
    };
    destroy_in_place(&mut *me)
}

/// Destroy an entity the caller already holds mutably.
pub fn destroy_in_place<T: EntityBehavior + ?Sized>(me: &mut T) -> bool {
    if !me.entity_mut().teardown() {
        return false;
    }
    me.on_destroy();
    true
}

/// What a component sees of the entity it is attached to.
#[derive(Clone)]
pub struct Owner {
    id: EntityId,
    name: String,
    bus: MessageBus,
    handle: Weak<RefCell<dyn EntityBehavior>>,
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl Owner {
    fn of<T: EntityBehavior>(this: &Shared<T>) -> Self {
        let strong: Rc<RefCell<dyn EntityBehavior>> = this.clone();
        let me = this.borrow();
        Self {
            id: me.entity().id(),
            name: me.entity().name().to_string(),
            bus: me.entity().bus().clone(),
            handle: Rc::downgrade(&strong),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Weak handle to the owning entity, for capture in bus callbacks.
    pub fn handle(&self) -> Weak<RefCell<dyn EntityBehavior>> {
        self.handle.clone()
    }

    /// True once the owner is destroyed or dropped. An owner that is
    /// currently borrowed counts as alive.
    pub fn is_destroyed(&self) -> bool {
        match self.handle.upgrade() {
            Some(entity) => {
                let destroyed = entity
                    .try_borrow()
                    .map(|e| e.entity().is_destroyed())
                    .unwrap_or(false);
                destroyed
            }
            None => true,
        }
    }

    /// Destroy the owner. Returns false if it was already gone.
    pub fn destroy(&self) -> bool {
        self.handle.upgrade().is_some_and(|entity| destroy(&*entity))
    }
}
