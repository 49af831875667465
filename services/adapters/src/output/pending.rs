//! Bounded queue of relay requests awaiting a connection
//!
//! Full queue policy: the oldest pending request is dropped to admit the
//! newest.

use super::rpc::EncodedRequest;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

#[derive(Debug)]
pub struct PendingQueue {
    items: Mutex<VecDeque<EncodedRequest>>,
    capacity: usize,
    ready: Notify,
    dropped: AtomicU64,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ready: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append a request; returns the request evicted to make room, if any
    pub fn push_back(&self, request: EncodedRequest) -> Option<EncodedRequest> {
        let evicted = {
            let mut items = self.items.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(request);
            evicted
        };
        if evicted.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        evicted
    }

    /// Return a request whose send failed to the head of the queue
    ///
    /// If the queue filled up meanwhile the request is the oldest one and is
    /// dropped; returns `false` in that case.
    pub fn push_front(&self, request: EncodedRequest) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            drop(items);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        items.push_front(request);
        true
    }

    pub fn pop_front(&self) -> Option<EncodedRequest> {
        self.items.lock().pop_front()
    }

    /// Resolves after the next `push_back` (or immediately if one happened
    /// since the last wakeup)
    pub fn notified(&self) -> Notified<'_> {
        self.ready.notified()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests discarded by the overflow policy so far
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
