//! Event sink used to publish pool changes.

use candlepin_types::Event;
use std::sync::{Mutex, PoisonError};

/// Receives domain events raised during a bind.
pub trait EventSink: Send + Sync {
    fn queue(&self, event: Event);
}

/// Buffers events until the caller drains them after commit.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<Vec<Event>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every queued event in arrival order.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for EventQueue {
    fn queue(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
