//! Dynamic set of live delivery endpoints, each a bounded queue of
//! [`LogRecord`]. A slow or dead subscriber must never stall the drain
//! worker or the other subscribers — broadcast uses non-blocking sends and
//! evicts on failure.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::log_record::LogRecord;

/// Bounded queue capacity per subscriber, matching [`crate::ring_buffer::RingBuffer`]'s
/// default capacity so a full-buffer replay is guaranteed to fit.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 1000;

/// Opaque identity for a live subscriber. Equality is by identity, not by
/// any property of the delivered records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Dynamic set of live subscribers sharing one [`crate::supervisor::ProcessSupervisor`].
#[derive(Default)]
pub struct SubscriberSet {
    next_id: u64,
    senders: HashMap<SubscriberId, mpsc::Sender<LogRecord>>,
}

impl SubscriberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new subscriber and return its id and receiving half.
    /// Replay (if any) must be sent on the returned sender by the caller
    /// *before* releasing the lock that guards this set, per spec §4.3.
    pub fn add(&mut self) -> (SubscriberId, mpsc::Sender<LogRecord>, mpsc::Receiver<LogRecord>) {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.senders.insert(id, tx.clone());
        (id, tx, rx)
    }

    /// Remove a subscriber. Idempotent: removing an already-removed or
    /// unknown id is not an error. Dropping the sender closes the receiver
    /// so an active consumer observes end-of-stream.
    pub fn remove(&mut self, id: SubscriberId) {
        self.senders.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Attempt a non-blocking enqueue to every subscriber. Subscribers whose
    /// queue is full or whose receiver has been dropped are evicted; this
    /// never blocks on a slow consumer.
    pub fn broadcast(&mut self, record: &LogRecord) {
        self.senders.retain(|_, tx| match tx.try_send(record.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("subscriber queue full, evicting slow subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Remove all subscribers, closing their channels so consumers observe
    /// end-of-stream. Used when the supervisor stops, per the Open Question
    /// in spec §9 resolved in favor of terminating subscribers across
    /// restart boundaries.
    pub fn clear(&mut self) {
        self.senders.clear();
    }
}
