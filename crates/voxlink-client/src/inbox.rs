use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use voxlink_wire::InboundMessage;

/// Latest connectivity change, as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

impl ConnectionEvent {
    pub fn is_connected(self) -> bool {
        self == ConnectionEvent::Connected
    }
}

/// Bounded FIFO of inbound messages that sheds its oldest entry when full.
#[derive(Debug)]
pub struct ResponseQueue {
    inner: Mutex<VecDeque<InboundMessage>>,
    capacity: usize,
}

impl ResponseQueue {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<InboundMessage>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a message; returns the entry evicted to make room, if any.
    pub fn push(&self, message: InboundMessage) -> Option<InboundMessage> {
        let mut queue = self.lock();
        let evicted = if queue.len() >= self.capacity {
            queue.pop_front()
        } else {
            None
        };
        queue.push_back(message);
        evicted
    }

    pub fn pop(&self) -> Option<InboundMessage> {
        self.lock().pop_front()
    }

    /// Take everything queued, oldest first.
    pub fn drain(&self) -> Vec<InboundMessage> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Single-slot, latest-wins connection event cell.
#[derive(Debug, Default)]
pub struct EventCell {
    slot: Mutex<Option<ConnectionEvent>>,
}

impl EventCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, event: ConnectionEvent) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
    }

    pub fn take(&self) -> Option<ConnectionEvent> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
