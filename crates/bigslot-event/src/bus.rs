//! EventBus — synchronous in-process observers

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::event::{EventEnvelope, GameEvent};

/// Observer callback
pub type Listener = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe hub for [`GameEvent`]s
///
/// Dispatch iterates a snapshot of the listener list, so a listener may
/// subscribe or unsubscribe while being called.
pub struct EventBus {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
    emitted: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            emitted: AtomicU64::new(0),
        }
    }

    /// Register a listener
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sid, _)| *sid != id);
        listeners.len() != before
    }

    /// Stamp and deliver an event to every current listener
    pub fn emit(&self, event: GameEvent) {
        let envelope = EventEnvelope::new(event);
        self.emitted.fetch_add(1, Ordering::Relaxed);
        log::trace!("emit {}", envelope.name());

        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(&envelope);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Events emitted since creation
    pub fn emitted_count(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that keeps every envelope it receives
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<EventEnvelope>>>,
}

impl EventLog {
    /// Create a log and subscribe it to `bus`
    pub fn attach(bus: &EventBus) -> (Self, SubscriptionId) {
        let log = Self::default();
        let sink = Arc::clone(&log.entries);
        let id = bus.subscribe(move |envelope| sink.lock().push(envelope.clone()));
        (log, id)
    }

    /// Copy of everything received so far
    pub fn entries(&self) -> Vec<EventEnvelope> {
        self.entries.lock().clone()
    }

    /// Events only, without timestamps
    pub fn events(&self) -> Vec<GameEvent> {
        self.entries.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// Names of received events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.lock().iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drain everything received so far
    pub fn take(&self) -> Vec<EventEnvelope> {
        std::mem::take(&mut *self.entries.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_emit_unsubscribe() {
        let bus = EventBus::new();
        let (log, id) = EventLog::attach(&bus);

        bus.emit(GameEvent::StageChanged { stage: 2 });
        assert_eq!(log.names(), vec!["state:stage"]);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GameEvent::StageChanged { stage: 3 });
        assert_eq!(log.len(), 1);
        assert_eq!(bus.emitted_count(), 2);
    }

    #[test]
    fn test_delivery_order_across_listeners() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            bus.subscribe(move |_| order.lock().push(tag));
        }
        bus.emit(GameEvent::SpinsChanged { remaining: 1 });
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn test_reentrant_unsubscribe() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let bus_ref = Arc::downgrade(&bus);
        let slot_ref = Arc::clone(&slot);
        let id = bus.subscribe(move |_| {
            if let (Some(bus), Some(id)) = (bus_ref.upgrade(), slot_ref.lock().take()) {
                bus.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        bus.emit(GameEvent::RunStarted { run: 1 });
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_event_log_take() {
        let bus = EventBus::new();
        let (log, _) = EventLog::attach(&bus);
        bus.emit(GameEvent::GemsChanged { delta: 1, total: 1 });
        assert_eq!(log.take().len(), 1);
        assert!(log.is_empty());
    }
}
