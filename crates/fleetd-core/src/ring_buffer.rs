use std::collections::VecDeque;

use crate::log_record::{LogRecord, StreamKind};

/// Bounded FIFO of [`LogRecord`], capacity fixed at construction.
///
/// Append drops the oldest record once full. The one exception to
/// "logically immutable while buffered" is [`Self::merge_into_newest`],
/// which extends the newest record in place to implement the
/// trailing-continuation rule in `LineAssembler`.
pub struct RingBuffer {
    records: VecDeque<LogRecord>,
    capacity: usize,
}

/// `tail`/`tail_stream` was asked for a negative count.
#[derive(Debug, thiserror::Error)]
#[error("n must be non-negative")]
pub struct NegativeTail;

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recently appended record, if any.
    pub fn newest(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    /// Append `record`, evicting the oldest entry if at capacity.
    pub fn append(&mut self, record: LogRecord) {
        if self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// The newest record, if any is still "open" (no trailing newline) and of
    /// the given `kind`. Returns `None` otherwise, signaling that a fresh
    /// record should be appended rather than merged.
    pub fn mergeable_tail(&self, kind: StreamKind) -> bool {
        matches!(self.records.back(), Some(r) if r.kind == kind && r.is_open())
    }

    /// Extend the newest record's text in place and bump its timestamp.
    ///
    /// Panics if the buffer is empty; callers must check
    /// [`Self::mergeable_tail`] first.
    pub fn merge_into_newest(&mut self, extra: &str, now: chrono::DateTime<chrono::Utc>) {
        let newest = self.records.back_mut().expect("merge_into_newest called on empty buffer");
        newest.text.push_str(extra);
        newest.timestamp = now;
    }

    /// Up to `n` most-recent records, chronological order, optionally
    /// filtering out stderr. `n` is clamped to the number of accepted
    /// records available.
    pub fn tail(&self, n: i64, include_stderr: bool) -> Result<Vec<LogRecord>, NegativeTail> {
        if n < 0 {
            return Err(NegativeTail);
        }
        let n = n as usize;
        let mut out: Vec<LogRecord> = Vec::with_capacity(n.min(self.records.len()));
        for record in self.records.iter().rev() {
            if out.len() >= n {
                break;
            }
            if !include_stderr && record.kind == StreamKind::Stderr {
                continue;
            }
            out.push(record.clone());
        }
        out.reverse();
        Ok(out)
    }
}
