//! Entity/component lifecycle on top of the message bus.
//!
//! Concrete entities live in [`Shared`] cells. Their bus callbacks hold only
//! weak references, so a subscription never keeps an entity alive, and
//! [`destroy`] revokes every subscription the entity or its components made.
//!
//! # Invariants
//! - Components receive `setup` then `init` at attach time, and `destroy` in
//!   attachment order.
//! - Destroying an entity twice is a no-op.
//! - No callback of a destroyed entity ever runs again.

mod component;
mod entity;

pub use component::{Component, GlobalSubscriber};
pub use entity::{
    Entity, EntityBehavior, Owner, Shared, attach, destroy, destroy_in_place, spawn, subscribe,
    subscribe_with_priority,
};
