//! Pub/Sub event bus connecting the annotator core to its views.
//!
//! - `subscribe::<E>()` registers a callback invoked synchronously on every emit of `E`
//! - every emitted event is also queued; `poll()` drains the queue for batch handling
//! - `EventEmitter` is a cheap clonable handle that can only emit
//!
//! Callback order is FIFO within one event type. Ordering across types is not defined.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use log::warn;

/// Queue length at which the oldest half is dropped.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Marker trait for events. Blanket-implemented for every `Send + Sync + 'static` type.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

pub type BoxedEvent = Box<dyn Event>;

/// State shared by the bus and all of its emitters.
struct Channels {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<VecDeque<BoxedEvent>>,
    capacity: usize,
}

impl Channels {
    fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            queue: Mutex::new(VecDeque::new()),
            capacity: capacity.max(2),
        }
    }

    fn publish(&self, event: BoxedEvent) {
        // Deref to `dyn Event` so the TypeId is the concrete event's, not the Box's.
        let type_id = (*event).as_any().type_id();

        // Clone the callback list so subscribers may emit re-entrantly.
        let callbacks: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&type_id)
            .cloned()
            .unwrap_or_default();
        for cb in &callbacks {
            cb((*event).as_any());
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.capacity {
            let evict = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict);
            queue.drain(..evict);
        }
        queue.push_back(event);
    }
}

/// Pub/Sub event bus with deferred polling.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<Channels>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue_len", &self.queue_len())
            .field("capacity", &self.channels.capacity)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Channels::new(capacity)),
        }
    }

    /// Subscribe to events of type `E`. The callback runs inside `emit()`.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.channels
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    pub fn emit<E: Event>(&self, event: E) {
        self.channels.publish(Box::new(event));
    }

    pub fn emit_boxed(&self, event: BoxedEvent) {
        self.channels.publish(event);
    }

    /// Drain every queued event.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        self.channels
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect()
    }

    /// Drain the queue, keeping clones of events of type `E` only.
    pub fn poll_of<E: Event + Clone>(&self) -> Vec<E> {
        self.poll()
            .iter()
            .filter_map(|ev| downcast_event::<E>(ev).cloned())
            .collect()
    }

    /// Emit-only handle for components.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            channels: Arc::clone(&self.channels),
        }
    }

    pub fn unsubscribe_all<E: Event>(&self) {
        self.channels
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<E>());
    }

    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.channels
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
            .is_some_and(|v| !v.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.channels.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop all subscribers and queued events.
    pub fn clear(&self) {
        self.channels.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.channels.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Lightweight emit-only handle.
#[derive(Clone)]
pub struct EventEmitter {
    channels: Arc<Channels>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field(
                "subscriber_types",
                &self.channels.subscribers.read().map(|s| s.len()).unwrap_or(0),
            )
            .finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        self.channels.publish(Box::new(event));
    }

    pub fn emit_boxed(&self, event: BoxedEvent) {
        self.channels.publish(event);
    }
}

/// Downcast a queued event to its concrete type.
///
/// Derefs to `dyn Event` first: calling `as_any()` on the `Box` itself would hit the
/// blanket impl for `Box<dyn Event>` and the downcast would always fail.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone, Debug)]
    struct Moved {
        dx: i32,
    }

    #[derive(Clone, Debug)]
    struct Renamed(String);

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicI32::new(0));
        let t = Arc::clone(&total);
        bus.subscribe::<Moved, _>(move |e| {
            t.fetch_add(e.dx, Ordering::SeqCst);
        });

        bus.emit(Moved { dx: 10 });
        bus.emit(Moved { dx: -3 });
        assert_eq!(total.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(Moved { dx: 1 });
        bus.emit(Renamed("a".into()));
        bus.emit(Moved { dx: 2 });

        let moved = bus.poll_of::<Moved>();
        assert_eq!(moved.iter().map(|m| m.dx).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(bus.queue_len(), 0);
    }

    #[test]
    fn test_emitter_handle_shares_channels() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicI32::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<Renamed, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        bus.emitter().emit(Renamed("x".into()));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.poll().len(), 1);
    }

    #[test]
    fn test_boxed_emit_reaches_typed_subscriber() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicI32::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<Moved, _>(move |e| {
            h.fetch_add(e.dx, Ordering::SeqCst);
        });
        bus.emit_boxed(Box::new(Moved { dx: 5 }));
        assert_eq!(hits.load(Ordering::SeqCst), 5);

        let queued = bus.poll();
        assert_eq!(downcast_event::<Moved>(&queued[0]).map(|m| m.dx), Some(5));
    }

    #[test]
    fn test_unsubscribe_keeps_queueing() {
        let bus = EventBus::new();
        bus.subscribe::<Moved, _>(|_| {});
        assert!(bus.has_subscribers::<Moved>());
        bus.unsubscribe_all::<Moved>();
        assert!(!bus.has_subscribers::<Moved>());
        bus.emit(Moved { dx: 1 });
        assert_eq!(bus.queue_len(), 1);
    }

    #[test]
    fn test_queue_eviction() {
        let bus = EventBus::with_capacity(4);
        for dx in 0..5 {
            bus.emit(Moved { dx });
        }
        // Full at 4: oldest 2 dropped before pushing the 5th.
        let left: Vec<i32> = bus.poll_of::<Moved>().iter().map(|m| m.dx).collect();
        assert_eq!(left, [2, 3, 4]);
    }
}
