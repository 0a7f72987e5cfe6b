//! The publish-side track handler (§4.6).

use std::sync::Mutex;

use crate::cache::Cache;
use crate::coding::{Extensions, TrackNamespace, GROUP_GAP_EXTENSION_TAG};
use crate::data::ObjectStatus;

use super::egress::{Egress, QueuedObject};
use super::status::{PublishObjectStatus, PublishStatus, TrackMetrics, TrackMode};

/// Everything about one object that isn't the payload itself.
#[derive(Debug, Clone)]
pub struct ObjectHeaders {
    pub group_id: u64,
    pub object_id: u64,
    pub subgroup_id: Option<u64>,
    pub priority: u8,
    pub ttl_ms: u64,
    pub payload_length: usize,
    pub extensions: Extensions,
    pub immutable_extensions: Option<Extensions>,
    pub status: Option<ObjectStatus>,
}

struct PartialObject {
    headers: ObjectHeaders,
    buffer: Vec<u8>,
}

#[derive(Clone)]
pub(crate) struct CachedObject {
    pub headers: ObjectHeaders,
    pub payload: Vec<u8>,
}

struct Inner {
    status: PublishStatus,
    track_alias: Option<u64>,
    subscriber_count: usize,
    /// (group_id, object_id) of the last fully-published object.
    previous: Option<(u64, u64)>,
    /// group_id of the last object that ended its group, for the
    /// "previous end-of-group object" bookkeeping used by EOG extensions.
    previous_end_of_group: Option<u64>,
    partial: Option<PartialObject>,
    metrics: TrackMetrics,
}

/// Per-track state for a track this side publishes.
///
/// One handler is created per announced track and bound to the transport
/// when the application calls `PublishTrack`; it outlives individual
/// subscribers, fanning a single `publish_object` call out to however many
/// are currently attached.
pub struct PublishTrackHandler {
    pub namespace: TrackNamespace,
    pub name: String,
    pub default_priority: u8,
    pub default_ttl_ms: u64,
    pub mode: TrackMode,

    inner: Mutex<Inner>,
    cache: Mutex<Option<Cache<(u64, u64), CachedObject>>>,
    egress: Egress,
    on_status_changed: Mutex<Option<Box<dyn FnMut(PublishStatus) + Send>>>,
    on_new_group_requested: Mutex<Option<Box<dyn FnMut() + Send>>>,
}

impl PublishTrackHandler {
    pub fn new(namespace: TrackNamespace, name: String, mode: TrackMode) -> Self {
        Self {
            namespace,
            name,
            default_priority: 128,
            default_ttl_ms: 0,
            mode,
            inner: Mutex::new(Inner {
                status: PublishStatus::PendingAnnounce,
                track_alias: None,
                subscriber_count: 0,
                previous: None,
                previous_end_of_group: None,
                partial: None,
                metrics: TrackMetrics::default(),
            }),
            cache: Mutex::new(None),
            egress: Egress::default(),
            on_status_changed: Mutex::new(None),
            on_new_group_requested: Mutex::new(None),
        }
    }

    /// Enable the retained-object cache used to serve late subscribers and
    /// fetches, covering `duration_ms` of history in buckets of
    /// `interval_ms`.
    pub fn with_cache(self, duration_ms: u64, interval_ms: u64) -> Self {
        *self.cache.lock().unwrap() =
            Some(Cache::new(duration_ms, interval_ms).expect("valid cache retention window"));
        self
    }

    pub fn on_status_changed<F: FnMut(PublishStatus) + Send + 'static>(&self, f: F) {
        *self.on_status_changed.lock().unwrap() = Some(Box::new(f));
    }

    /// Register a callback for when a subscriber sends `NEW_GROUP_REQUEST`
    /// on this track (§4.6). The application decides what rolling over
    /// means for its content -- typically, starting the next published
    /// object on a new `group_id` rather than continuing the current one.
    /// Requires `SUPPORTS_NEW_GROUP_PARAM` to have been advertised in this
    /// track's `SUBSCRIBE_OK`, which is the application's responsibility,
    /// not this handler's.
    pub fn on_new_group_requested<F: FnMut() + Send + 'static>(&self, f: F) {
        *self.on_new_group_requested.lock().unwrap() = Some(Box::new(f));
    }

    /// Called by the transport when `NEW_GROUP_REQUEST` arrives for this
    /// track. No-op if the application never registered a callback.
    pub(crate) fn new_group_requested(&self) {
        if let Some(cb) = self.on_new_group_requested.lock().unwrap().as_mut() {
            cb();
        }
    }

    pub fn status(&self) -> PublishStatus {
        self.inner.lock().unwrap().status
    }

    pub fn metrics(&self) -> TrackMetrics {
        self.inner.lock().unwrap().metrics
    }

    pub fn track_alias(&self) -> Option<u64> {
        self.inner.lock().unwrap().track_alias
    }

    fn set_status(&self, status: PublishStatus) {
        let changed = {
            let mut inner = self.inner.lock().unwrap();
            if inner.status == status {
                false
            } else {
                inner.status = status;
                true
            }
        };
        if changed {
            if let Some(cb) = self.on_status_changed.lock().unwrap().as_mut() {
                cb(status);
            }
        }
    }

    /// Called by the transport once the remote has accepted the
    /// announce/subscribe pairing and assigned this track an alias.
    pub fn mark_ok(&self, track_alias: u64) {
        self.inner.lock().unwrap().track_alias = Some(track_alias);
        self.set_status(PublishStatus::Ok);
    }

    pub fn mark_unannounced(&self) {
        self.set_status(PublishStatus::NotAnnounced);
    }

    pub fn mark_error(&self) {
        self.set_status(PublishStatus::Error);
    }

    pub fn add_subscriber(&self) {
        let was_zero = {
            let mut inner = self.inner.lock().unwrap();
            inner.subscriber_count += 1;
            inner.subscriber_count == 1
        };
        if was_zero && self.status() == PublishStatus::NoSubscribers {
            self.set_status(PublishStatus::Ok);
        }
    }

    /// Called on `UNSUBSCRIBE` from a subscriber. Transitions to
    /// `NoSubscribers` once the last one is gone.
    pub fn remove_subscriber(&self) {
        let now_zero = {
            let mut inner = self.inner.lock().unwrap();
            inner.subscriber_count = inner.subscriber_count.saturating_sub(1);
            inner.subscriber_count == 0
        };
        if now_zero {
            self.set_status(PublishStatus::NoSubscribers);
        }
    }

    /// Publish one object. See [`PublishObjectStatus`] for the outcomes;
    /// `payload.len() < headers.payload_length` stashes a partial object
    /// and returns `ObjectContinuationDataNeeded` -- call
    /// [`PublishTrackHandler::publish_partial_object`] with the rest.
    pub fn publish_object(&self, now_ms: u64, headers: ObjectHeaders, payload: &[u8]) -> PublishObjectStatus {
        if payload.len() > headers.payload_length {
            self.inner.lock().unwrap().metrics.flow_errors += 1;
            return PublishObjectStatus::ObjectPayloadLengthExceeded;
        }

        let mut headers = headers;
        let mut inner = self.inner.lock().unwrap();

        if self.mode == TrackMode::Stream {
            if let Some(partial) = &inner.partial {
                if partial.headers.group_id == headers.group_id {
                    return PublishObjectStatus::PreviousObjectNotCompleteMustStartNewGroup;
                }
                // A new group implicitly abandons whatever was left incomplete.
                inner.partial = None;
            }
        }

        if let Some((prev_group, _)) = inner.previous {
            if headers.group_id > prev_group + 1 {
                let gap = headers.group_id - prev_group - 1;
                headers.extensions.set_int(GROUP_GAP_EXTENSION_TAG, gap);
            }
        }

        if payload.len() < headers.payload_length {
            inner.partial = Some(PartialObject {
                headers,
                buffer: payload.to_vec(),
            });
            return PublishObjectStatus::ObjectContinuationDataNeeded;
        }

        inner.previous = Some((headers.group_id, headers.object_id));
        if matches!(headers.status, Some(ObjectStatus::EndOfGroup)) {
            inner.previous_end_of_group = Some(headers.group_id);
        }
        inner.metrics.objects_sent += 1;
        inner.metrics.bytes_sent += payload.len() as u64;
        let no_subscribers = inner.subscriber_count == 0;
        drop(inner);

        if let Some(cache) = self.cache.lock().unwrap().as_mut() {
            let _ = cache.insert(
                now_ms,
                (headers.group_id, headers.object_id),
                CachedObject {
                    headers: headers.clone(),
                    payload: payload.to_vec(),
                },
                headers.ttl_ms.max(1),
            );
        }

        if no_subscribers {
            return PublishObjectStatus::NoSubscribers;
        }

        let priority = headers.priority;
        let ttl_ms = if headers.ttl_ms == 0 {
            self.default_ttl_ms
        } else {
            headers.ttl_ms
        };
        let mut queued_headers = headers;
        queued_headers.ttl_ms = ttl_ms;
        self.egress.push(now_ms, priority, queued_headers, payload.to_vec());

        PublishObjectStatus::Ok
    }

    /// Append `slice` to the object started or continued by `headers`,
    /// flushing once the declared payload length is reached.
    pub fn publish_partial_object(&self, now_ms: u64, headers: ObjectHeaders, slice: &[u8]) -> PublishObjectStatus {
        let completed = {
            let mut inner = self.inner.lock().unwrap();
            match &mut inner.partial {
                Some(p) if p.headers.group_id == headers.group_id && p.headers.object_id == headers.object_id => {
                    p.buffer.extend_from_slice(slice);
                }
                _ => {
                    inner.partial = Some(PartialObject {
                        headers: headers.clone(),
                        buffer: slice.to_vec(),
                    });
                }
            }
            let partial = inner.partial.as_ref().unwrap();
            if partial.buffer.len() >= partial.headers.payload_length {
                inner.partial.take()
            } else {
                None
            }
        };

        match completed {
            Some(partial) => self.publish_object(now_ms, partial.headers, &partial.buffer),
            None => PublishObjectStatus::ObjectContinuationDataNeeded,
        }
    }

    /// Drain whatever objects are ready to go out, in priority order,
    /// dropping (and counting) any that expired while queued. Called by
    /// the transport engine, never by the application.
    pub fn drain_ready(&self, now_ms: u64) -> Vec<QueuedObject> {
        let mut out = Vec::new();
        loop {
            let (next, expired) = self.egress.pop(now_ms);
            if expired > 0 {
                self.inner.lock().unwrap().metrics.objects_expired += expired;
            }
            match next {
                Some(obj) => out.push(obj),
                None => break,
            }
        }
        out
    }

    pub fn cached_object(&self, now_ms: u64, group_id: u64, object_id: u64) -> Option<(ObjectHeaders, Vec<u8>)> {
        self.cache
            .lock()
            .unwrap()
            .as_mut()
            .and_then(|c| c.get(now_ms, &(group_id, object_id)))
            .map(|c| (c.headers.clone(), c.payload.clone()))
    }

    /// Every cached object in `[start, end]` (group, object) order, for
    /// serving `FETCH`. Gaps (objects never published, or already
    /// expired out of the retention window) are simply absent.
    pub fn cache_range(&self, now_ms: u64, start: (u64, u64), end: (u64, u64)) -> Vec<(ObjectHeaders, Vec<u8>)> {
        self.cache
            .lock()
            .unwrap()
            .as_mut()
            .map(|c| {
                c.range(now_ms, start, end)
                    .into_iter()
                    .map(|(_, v)| (v.headers.clone(), v.payload.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn largest(&self, now_ms: u64) -> Option<(u64, u64)> {
        self.cache.lock().unwrap().as_mut().and_then(|c| c.last(now_ms).map(|(k, _)| *k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(group: u64, object: u64, len: usize) -> ObjectHeaders {
        ObjectHeaders {
            group_id: group,
            object_id: object,
            subgroup_id: None,
            priority: 4,
            ttl_ms: 0,
            payload_length: len,
            extensions: Default::default(),
            immutable_extensions: None,
            status: None,
        }
    }

    #[test]
    fn no_subscribers_still_counts_ok() {
        let h = PublishTrackHandler::new(TrackNamespace::default(), "t".into(), TrackMode::Datagram);
        h.mark_ok(1);
        let status = h.publish_object(0, headers(0, 0, 3), &[1, 2, 3]);
        assert_eq!(status, PublishObjectStatus::NoSubscribers);
    }

    #[test]
    fn payload_length_exceeded() {
        let h = PublishTrackHandler::new(TrackNamespace::default(), "t".into(), TrackMode::Datagram);
        let status = h.publish_object(0, headers(0, 0, 1), &[1, 2, 3]);
        assert_eq!(status, PublishObjectStatus::ObjectPayloadLengthExceeded);
    }

    #[test]
    fn partial_object_then_completion() {
        let h = PublishTrackHandler::new(TrackNamespace::default(), "t".into(), TrackMode::Datagram);
        h.add_subscriber();
        let status = h.publish_object(0, headers(0, 0, 3), &[1]);
        assert_eq!(status, PublishObjectStatus::ObjectContinuationDataNeeded);
        let status = h.publish_partial_object(0, headers(0, 0, 3), &[2, 3]);
        assert_eq!(status, PublishObjectStatus::Ok);
        assert_eq!(h.metrics().objects_sent, 1);
    }

    #[test]
    fn incomplete_object_blocks_new_object_same_group_in_stream_mode() {
        let h = PublishTrackHandler::new(TrackNamespace::default(), "t".into(), TrackMode::Stream);
        h.add_subscriber();
        let status = h.publish_object(0, headers(0, 0, 3), &[1]);
        assert_eq!(status, PublishObjectStatus::ObjectContinuationDataNeeded);
        let status = h.publish_object(0, headers(0, 1, 1), &[9]);
        assert_eq!(status, PublishObjectStatus::PreviousObjectNotCompleteMustStartNewGroup);
        // Starting a new group, though, is allowed.
        let status = h.publish_object(0, headers(1, 0, 1), &[9]);
        assert_eq!(status, PublishObjectStatus::Ok);
    }

    #[test]
    fn group_gap_extension_set_on_discontinuity() {
        let h = PublishTrackHandler::new(TrackNamespace::default(), "t".into(), TrackMode::Datagram);
        h.add_subscriber();
        h.publish_object(0, headers(0, 0, 1), &[1]);
        h.publish_object(0, headers(5, 0, 1), &[1]);
        let drained = h.drain_ready(0);
        let gapped = drained.iter().find(|o| o.headers.group_id == 5).unwrap();
        assert_eq!(gapped.headers.extensions.group_gap(), Some(4));
    }
}
