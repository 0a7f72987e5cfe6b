//! The priority-ordered, TTL-aware queue that feeds a published track's
//! objects into the transport.
//!
//! One [`Egress`] per published track (see §4.8/§5: "each publish track
//! has one egress priority queue"). The transport engine drains it as the
//! underlying QUIC stream/datagram becomes writable; this type only
//! decides *order*, never blocks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::ObjectHeaders;

pub struct QueuedObject {
    pub headers: ObjectHeaders,
    pub payload: Vec<u8>,
    enqueued_at_ms: u64,
}

/// Sort key: lower `priority` drains first; within equal priority, lower
/// `seq` (older) drains first.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy)]
struct Key {
    priority: u8,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<Key, QueuedObject>,
}

pub struct Egress {
    inner: Mutex<Inner>,
    next_seq: AtomicU64,
}

impl Default for Egress {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl Egress {
    pub fn push(&self, now_ms: u64, priority: u8, headers: ObjectHeaders, payload: Vec<u8>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let key = Key { priority, seq };
        let entry = QueuedObject {
            headers,
            payload,
            enqueued_at_ms: now_ms,
        };
        self.inner.lock().unwrap().entries.insert(key, entry);
    }

    /// Pop the highest-priority, oldest-of-equal-priority entry, silently
    /// dropping (and reporting) any whose TTL elapsed before being sent.
    /// Returns `(object, expired_count)`.
    pub fn pop(&self, now_ms: u64) -> (Option<QueuedObject>, u64) {
        let mut inner = self.inner.lock().unwrap();
        let mut expired = 0;
        loop {
            let key = match inner.entries.keys().next().copied() {
                Some(k) => k,
                None => return (None, expired),
            };
            let entry = inner.entries.remove(&key).unwrap();
            let ttl_ms = entry.headers.ttl_ms;
            if ttl_ms != 0 && now_ms.saturating_sub(entry.enqueued_at_ms) >= ttl_ms {
                expired += 1;
                continue;
            }
            return (Some(entry), expired);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry still queued for this group, e.g. when the
    /// publisher rolls the stream over to a new group.
    pub fn drop_group(&self, group_id: u64) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.entries.len();
        inner.entries.retain(|_, v| v.headers.group_id != group_id);
        before - inner.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ObjectHeaders;

    fn headers(group: u64, object: u64, ttl_ms: u64) -> ObjectHeaders {
        ObjectHeaders {
            group_id: group,
            object_id: object,
            subgroup_id: None,
            priority: 0,
            ttl_ms,
            payload_length: 1,
            extensions: Default::default(),
            immutable_extensions: None,
            status: None,
        }
    }

    #[test]
    fn drains_highest_priority_first() {
        let egress = Egress::default();
        egress.push(0, 5, headers(0, 0, 0), vec![1]);
        egress.push(0, 1, headers(0, 1, 0), vec![2]);
        let (first, _) = egress.pop(0);
        assert_eq!(first.unwrap().headers.object_id, 1);
    }

    #[test]
    fn drops_expired_entries() {
        let egress = Egress::default();
        egress.push(0, 0, headers(0, 0, 100), vec![1]);
        egress.push(0, 0, headers(0, 1, 100), vec![2]);
        let (obj, expired) = egress.pop(200);
        assert_eq!(expired, 2);
        assert!(obj.is_none());
    }

    #[test]
    fn fifo_within_same_priority() {
        let egress = Egress::default();
        egress.push(0, 3, headers(0, 0, 0), vec![1]);
        egress.push(0, 3, headers(0, 1, 0), vec![2]);
        let (first, _) = egress.pop(0);
        assert_eq!(first.unwrap().headers.object_id, 0);
    }
}
