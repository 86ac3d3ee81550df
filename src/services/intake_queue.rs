//! Unbounded FIFO between request handlers and the verification worker
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

use crate::models::email::QueuedPayload;

#[derive(Debug)]
pub enum QueueItem {
    Job(QueuedPayload),
    /// Tells the worker to leave its loop.
    Shutdown,
}

/// Multi-producer, single-consumer queue.
///
/// `push` never blocks and never drops. `pop` waits until an item is
/// available. Only one task may call `pop`: a wake-up stored by `Notify`
/// is consumed by a single waiter.
#[derive(Debug, Default)]
pub struct IntakeQueue {
    items: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: QueueItem) {
        self.lock().push_back(item);
        self.notify.notify_one();
    }

    /// Puts a shutdown marker at the head of the queue so the worker stops
    /// after the payload it is currently handling, ahead of any backlog.
    pub fn push_shutdown(&self) {
        self.lock().push_front(QueueItem::Shutdown);
        self.notify.notify_one();
    }

    pub async fn pop(&self) -> QueueItem {
        loop {
            let next = self.lock().pop_front();
            if let Some(item) = next {
                return item;
            }
            // A push between the check above and this await leaves a stored
            // permit, so the wake-up is not lost.
            self.notify.notified().await;
        }
    }

    /// Removes shutdown markers sitting at the head of the queue and returns
    /// how many were dropped. Jobs behind them are kept.
    pub fn drain_shutdown_markers(&self) -> usize {
        let mut items = self.lock();
        let mut dropped = 0;
        while matches!(items.front(), Some(QueueItem::Shutdown)) {
            items.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
