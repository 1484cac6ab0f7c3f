//! Folds raw decoded chunks from one child stream into [`LogRecord`]s,
//! honoring newline boundaries and extending an open trailing record.
//!
//! Grounded on the per-line reassembly `original_source/app/service.py`
//! performs inline in `_append_log_line`, generalized to the trailing-merge
//! rule this workspace adds: a chunk that doesn't end in `\n` extends the
//! ring buffer's newest same-kind open record instead of starting a new one.

use chrono::Utc;

use crate::log_record::{LogRecord, StreamKind};
use crate::ring_buffer::RingBuffer;
use crate::subscriber::SubscriberSet;

/// Split `chunk` at every newline, keeping the newline as part of the
/// preceding piece, then fold the pieces into `buffer` under the rule in
/// spec §4.2: the first piece merges into the newest open same-kind record
/// if one exists; every other piece becomes a fresh record.
///
/// `append` (or merge) and `broadcast` happen together as one critical
/// section per spec §4.3, so `subscribers` is folded in here rather than
/// broadcasting from a separate call site. A merge is broadcast too: per
/// the "Mutable tail record" design note, a merge is externally
/// indistinguishable from popping and re-appending the extended record.
///
/// Must be called with the owning supervisor's lock held.
pub fn assemble(buffer: &mut RingBuffer, subscribers: &mut SubscriberSet, kind: StreamKind, chunk: &str) {
    if chunk.is_empty() {
        return;
    }
    let mut pieces = split_keep_newline(chunk).into_iter();

    if let Some(first) = pieces.next() {
        if buffer.mergeable_tail(kind) {
            buffer.merge_into_newest(&first, Utc::now());
        } else {
            buffer.append(LogRecord::new(kind, Utc::now(), first));
        }
        subscribers.broadcast(buffer.newest().expect("just inserted a record"));
    }

    for piece in pieces {
        buffer.append(LogRecord::new(kind, Utc::now(), piece));
        subscribers.broadcast(buffer.newest().expect("just inserted a record"));
    }
}

/// Split `s` at every `\n`, keeping the newline as part of the preceding
/// piece. A trailing piece with no newline (an unterminated final line) is
/// kept as-is. Empty trailing pieces (the chunk ended exactly on a newline)
/// are dropped.
fn split_keep_newline(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            out.push(s[start..=i].to_string());
            start = i + 1;
        }
    }
    if start < s.len() {
        out.push(s[start..].to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_then_rest_merges_into_one_record() {
        let mut buf = RingBuffer::new(1000);
        let mut subs = SubscriberSet::new();
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "Partial ");
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "rest\n");
        assert_eq!(buf.len(), 1);
        let tail = buf.tail(1, true).unwrap();
        assert_eq!(tail[0].text, "Partial rest\n");
    }

    #[test]
    fn no_cross_kind_merge() {
        let mut buf = RingBuffer::new(1000);
        let mut subs = SubscriberSet::new();
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "x");
        assemble(&mut buf, &mut subs, StreamKind::Stderr, "y\n");
        let tail = buf.tail(2, true).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].kind, StreamKind::Stdout);
        assert_eq!(tail[0].text, "x");
        assert_eq!(tail[1].kind, StreamKind::Stderr);
        assert_eq!(tail[1].text, "y\n");
    }

    #[test]
    fn multiple_lines_in_one_chunk_become_separate_records() {
        let mut buf = RingBuffer::new(1000);
        let mut subs = SubscriberSet::new();
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "a\nb\nc");
        assert_eq!(buf.len(), 3);
        let tail = buf.tail(3, true).unwrap();
        assert_eq!(tail[0].text, "a\n");
        assert_eq!(tail[1].text, "b\n");
        assert_eq!(tail[2].text, "c");
    }

    #[test]
    fn follow_up_write_after_newline_starts_a_new_record() {
        let mut buf = RingBuffer::new(1000);
        let mut subs = SubscriberSet::new();
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "Partial Line: ");
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "Continuation");
        assert_eq!(buf.len(), 1);
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "\n");
        assert_eq!(buf.len(), 1);
        let tail = buf.tail(1, true).unwrap();
        assert_eq!(tail[0].text, "Partial Line: Continuation\n");

        assemble(&mut buf, &mut subs, StreamKind::Stdout, "Another Line\n");
        assert_eq!(buf.len(), 2);
        let tail = buf.tail(2, true).unwrap();
        assert_eq!(tail[1].text, "Another Line\n");
    }

    #[tokio::test]
    async fn merge_rebroadcasts_the_extended_record() {
        let mut buf = RingBuffer::new(1000);
        let mut subs = SubscriberSet::new();
        let (_id, _tx, mut rx) = subs.add();

        assemble(&mut buf, &mut subs, StreamKind::Stdout, "Partial ");
        assemble(&mut buf, &mut subs, StreamKind::Stdout, "rest\n");

        assert_eq!(rx.recv().await.unwrap().text, "Partial ");
        assert_eq!(rx.recv().await.unwrap().text, "Partial rest\n");
    }
}
