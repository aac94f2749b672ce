//! One-shot notification delivery
//!
//! Failures and confirmations surface as messages consumed exactly once: the
//! presentation layer drains the queue after each intent, so a re-render never
//! re-displays an already-shown message.

use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A user-visible message delivered at most once
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Bounded queue of pending notifications
///
/// When full, the oldest undelivered message is evicted.
#[derive(Debug)]
pub struct NotificationQueue {
    pending: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl NotificationQueue {
    /// Create a queue holding at most `capacity` undelivered messages
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Enqueue a message for one-shot delivery
    pub fn push(&self, message: impl Into<String>) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending.len() == self.capacity {
                pending.pop_front();
            }
            pending.push_back(Notification {
                message: message.into(),
                raised_at: current_timestamp(),
            });
        }
    }

    /// Take every pending message, leaving the queue empty
    pub fn drain(&self) -> Vec<Notification> {
        self.pending
            .lock()
            .map(|mut pending| pending.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of undelivered messages
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(64)
    }
}
