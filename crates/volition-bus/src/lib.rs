//! Synchronous in-process event bus.
//!
//! Everything in this workspace runs on one thread, driven by ticks, so the
//! bus dispatches by direct call: [`EventBus::publish`] invokes every live
//! handler before it returns. There are no queues and no delivery delay.
//!
//! # Handler contract
//!
//! Handlers run in the middle of whatever published the event. They must
//! only record state (set a flag, push into a buffer) and return; they must
//! not publish, subscribe, or drop subscriptions. The bus is borrowed for
//! the whole dispatch, so a re-entrant call would abort the process.
//!
//! Subscriptions are scoped: dropping the [`Subscription`] returned by
//! [`EventBus::subscribe`] removes the handler.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;
use volition_types::Event;

/// One registered handler.
struct HandlerSlot {
    id: u64,
    handler: Box<dyn FnMut(&Event)>,
}

#[derive(Default)]
struct BusInner {
    handlers: Vec<HandlerSlot>,
    next_id: u64,
}

/// Handle to a shared synchronous event bus.
///
/// Cloning is cheap and every clone reaches the same subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// dropped.
    #[must_use = "dropping the Subscription unsubscribes the handler"]
    pub fn subscribe(&self, handler: impl FnMut(&Event) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id = inner.next_id.wrapping_add(1);
        inner.handlers.push(HandlerSlot {
            id,
            handler: Box::new(handler),
        });
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every live handler, in subscription order.
    pub fn publish(&self, event: &Event) {
        let mut inner = self.inner.borrow_mut();
        trace!(
            kind = event.kind(),
            subscribers = inner.handlers.len(),
            "publishing event"
        );
        for slot in &mut inner.handlers {
            (slot.handler)(event);
        }
    }

    /// How many handlers are currently registered.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().handlers.len()
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Scope token for one registered handler.
///
/// Dropping it removes the handler from the bus. If the bus itself is gone
/// the drop is a no-op.
#[derive(Debug)]
#[must_use = "dropping the Subscription unsubscribes the handler"]
pub struct Subscription {
    id: u64,
    bus: Weak<RefCell<BusInner>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cell) = self.bus.upgrade() {
            // try_borrow_mut: unsubscribing from inside a dispatch is a
            // contract violation, but drop must never abort.
            if let Ok(mut inner) = cell.try_borrow_mut() {
                inner.handlers.retain(|slot| slot.id != self.id);
            }
        }
    }
}
