//! Synchronous listener table with wildcard subscriptions.

use super::event::{Event, WILDCARD};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Callback invoked for each matching event.
pub type Listener<C> = Arc<dyn Fn(&Event<'_, C>) + Send + Sync>;

/// Identifies one registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerTable<C> {
    next_id: u64,
    by_event: HashMap<String, Vec<(ListenerId, Listener<C>)>>,
}

impl<C> ListenerTable<C> {
    fn remove(&mut self, event_name: Option<&str>, id: Option<ListenerId>) {
        match (event_name, id) {
            (None, _) => self.by_event.clear(),
            (Some(name), None) => {
                self.by_event.remove(name);
            }
            (Some(name), Some(id)) => {
                if let Some(listeners) = self.by_event.get_mut(name) {
                    listeners.retain(|(existing, _)| *existing != id);
                }
            }
        }
    }
}

fn lock<C>(table: &Mutex<ListenerTable<C>>) -> MutexGuard<'_, ListenerTable<C>> {
    // Listeners never run under the lock.
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-instance event emitter.
///
/// Listeners run synchronously in subscription order: wildcard (`"*"`)
/// listeners first, then listeners for the exact event name. The listener
/// list is snapshotted before dispatch, so callbacks may subscribe or
/// unsubscribe freely. A panicking listener is logged and skipped.
///
/// # Example
///
/// ```rust
/// use statewise::events::{Emitter, Event};
/// use std::sync::{Arc, Mutex};
///
/// let emitter: Emitter<String> = Emitter::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let sub = emitter.on("*", move |event| sink.lock().unwrap().push(event.name().to_string()));
///
/// emitter.emit(&Event::Custom { name: "ping".into(), payload: serde_json::json!(1) });
/// sub.off();
/// emitter.emit(&Event::Custom { name: "ping".into(), payload: serde_json::json!(2) });
///
/// assert_eq!(*seen.lock().unwrap(), ["ping"]);
/// ```
pub struct Emitter<C> {
    table: Arc<Mutex<ListenerTable<C>>>,
}

impl<C> Emitter<C> {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ListenerTable {
                next_id: 0,
                by_event: HashMap::new(),
            })),
        }
    }

    /// Subscribe to `event_name` (or `"*"` for everything).
    pub fn on<F>(&self, event_name: impl Into<String>, f: F) -> Subscription<C>
    where
        F: Fn(&Event<'_, C>) + Send + Sync + 'static,
    {
        self.subscribe(event_name, Arc::new(f))
    }

    /// Subscribe an already shared listener.
    pub fn subscribe(&self, event_name: impl Into<String>, listener: Listener<C>) -> Subscription<C> {
        let event_name = event_name.into();
        let mut table = lock(&self.table);
        let id = ListenerId(table.next_id);
        table.next_id += 1;
        table
            .by_event
            .entry(event_name.clone())
            .or_default()
            .push((id, listener));
        Subscription {
            event_name,
            id,
            table: Arc::downgrade(&self.table),
        }
    }

    /// Remove listeners: everything when `event_name` is `None`, every
    /// listener for the name when `id` is `None`, otherwise just one.
    pub fn off(&self, event_name: Option<&str>, id: Option<ListenerId>) {
        lock(&self.table).remove(event_name, id);
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        lock(&self.table)
            .by_event
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to wildcard listeners, then to listeners of its name.
    pub fn emit(&self, event: &Event<'_, C>) {
        let name = event.name();
        let snapshot: Vec<Listener<C>> = {
            let table = lock(&self.table);
            let wildcard = table.by_event.get(WILDCARD).into_iter().flatten();
            let exact = if name == WILDCARD {
                None
            } else {
                table.by_event.get(name)
            };
            wildcard
                .chain(exact.into_iter().flatten())
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if let Err(cause) = outcome {
                let message = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(event = %name, error = %message, "Event listener panicked");
            }
        }
    }
}

impl<C> Default for Emitter<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`Emitter::on`].
pub struct Subscription<C> {
    event_name: String,
    id: ListenerId,
    table: Weak<Mutex<ListenerTable<C>>>,
}

impl<C> Subscription<C> {
    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe. Calling this more than once, or after the emitter is
    /// gone, does nothing.
    pub fn off(&self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).remove(Some(&self.event_name), Some(self.id));
        }
    }
}
