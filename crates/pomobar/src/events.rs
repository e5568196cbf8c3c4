//! Timer events and their fan-out to presentation layers
//!
//! The timer emits through the `EventSink` trait. `EventBus` is the usual
//! sink: a tokio broadcast channel that any number of views subscribe to.

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::session::SessionType;

/// Something presentation layers may want to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Any visible state changed; re-read the timer
    Updated,
    /// A session ran out or was skipped, carrying the type that finished
    SessionCompleted(SessionType),
    /// Today's completed work count just reached the daily goal
    DailyGoalReached,
}

/// Receiver of timer events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TimerEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: TimerEvent) {
        (**self).emit(event)
    }
}

/// Broadcast channel of timer events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TimerEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: TimerEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(?event, receivers, "event published"),
            // No subscribers yet
            Err(_) => tracing::trace!(?event, "event dropped"),
        }
    }
}

/// Sink that keeps every event, for inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TimerEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far
    pub fn take(&self) -> Vec<TimerEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: TimerEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
