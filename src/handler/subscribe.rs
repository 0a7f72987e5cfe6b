//! The subscribe-side track handler (§4.6).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::coding::{Parameter, TrackNamespace};
use crate::data::ObjectStatus;
use crate::message::{FilterType, GroupOrder, SubscribeUpdate};

use super::publish::ObjectHeaders;
use super::status::{SubscribeStatus, TrackMetrics};

/// Non-standard parameter this crate uses to carry the paused/resumed
/// flag on `SUBSCRIBE_UPDATE`. Unknown to other implementations, who will
/// (per §6) ignore it on receipt -- pausing then degrades to "no visible
/// effect" rather than a protocol error. See DESIGN.md for why this wasn't
/// pinned to a draft-specified bit: the source drafts in the corpus don't
/// agree on one.
pub const PAUSE_PARAM: u64 = 0x3f3f;

/// Non-standard parameter a publisher sets on `SUBSCRIBE_OK` to advertise
/// that it honors `NEW_GROUP_REQUEST` for this track. Like [`PAUSE_PARAM`],
/// unknown implementations just ignore it.
pub const SUPPORTS_NEW_GROUP_PARAM: u64 = 0x3f41;

/// Per-stream parse progress: running sum of object-id deltas, reset on a
/// group/subgroup change (§4.6, "Handler tie-break for out-of-order delivery").
#[derive(Default, Clone, Copy)]
pub struct StreamProgress {
    pub group_id: u64,
    pub subgroup_id: u64,
    pub next_object_id: u64,
}

struct Inner {
    status: SubscribeStatus,
    track_alias: Option<u64>,
    streams: HashMap<u64, StreamProgress>,
    metrics: TrackMetrics,
    supports_new_group_request: bool,
    paused: bool,
}

pub struct SubscribeTrackHandler {
    pub namespace: TrackNamespace,
    pub name: String,
    pub request_id: u64,
    pub priority: u8,
    pub filter: FilterType,
    pub group_order: GroupOrder,
    pub delivery_timeout_ms: u64,
    /// Only meaningful for `FilterType::AbsoluteStart`/`AbsoluteRange`; see
    /// [`Self::with_range`].
    pub start_location: Option<crate::coding::Location>,
    /// Only meaningful for `FilterType::AbsoluteRange`.
    pub end_group_id: Option<u64>,

    inner: Mutex<Inner>,
    on_status_changed: Mutex<Option<Box<dyn FnMut(SubscribeStatus) + Send>>>,
    on_object_received: Mutex<Option<Box<dyn FnMut(&ObjectHeaders, &[u8]) + Send>>>,
    on_object_status_received: Mutex<Option<Box<dyn FnMut(u64, u64, ObjectStatus) + Send>>>,
}

impl SubscribeTrackHandler {
    pub fn new(
        request_id: u64,
        namespace: TrackNamespace,
        name: String,
        priority: u8,
        filter: FilterType,
        group_order: GroupOrder,
    ) -> Self {
        Self {
            namespace,
            name,
            request_id,
            priority,
            filter,
            group_order,
            delivery_timeout_ms: 0,
            start_location: None,
            end_group_id: None,
            inner: Mutex::new(Inner {
                status: SubscribeStatus::PendingResponse,
                track_alias: None,
                streams: HashMap::new(),
                metrics: TrackMetrics::default(),
                supports_new_group_request: false,
                paused: false,
            }),
            on_status_changed: Mutex::new(None),
            on_object_received: Mutex::new(None),
            on_object_status_received: Mutex::new(None),
        }
    }

    /// Set the absolute range fields `SUBSCRIBE` needs for
    /// `FilterType::AbsoluteStart`/`AbsoluteRange`; a no-op for the other
    /// filter types, which never encode them (§6).
    pub fn with_range(mut self, start_location: crate::coding::Location, end_group_id: Option<u64>) -> Self {
        self.start_location = Some(start_location);
        self.end_group_id = end_group_id;
        self
    }

    pub fn on_status_changed<F: FnMut(SubscribeStatus) + Send + 'static>(&self, f: F) {
        *self.on_status_changed.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_object_received<F: FnMut(&ObjectHeaders, &[u8]) + Send + 'static>(&self, f: F) {
        *self.on_object_received.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_object_status_received<F: FnMut(u64, u64, ObjectStatus) + Send + 'static>(&self, f: F) {
        *self.on_object_status_received.lock().unwrap() = Some(Box::new(f));
    }

    pub fn status(&self) -> SubscribeStatus {
        self.inner.lock().unwrap().status
    }

    pub fn metrics(&self) -> TrackMetrics {
        self.inner.lock().unwrap().metrics
    }

    pub fn track_alias(&self) -> Option<u64> {
        self.inner.lock().unwrap().track_alias
    }

    fn set_status(&self, status: SubscribeStatus) {
        let changed = {
            let mut inner = self.inner.lock().unwrap();
            // Terminal errors are sticky (§3).
            if inner.status == SubscribeStatus::Error {
                return;
            }
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

    /// Record the track alias this side chose when sending `SUBSCRIBE`,
    /// before the matching `SUBSCRIBE_OK` arrives (the alias is the
    /// requester's choice in this draft, not the publisher's -- see
    /// DESIGN.md). Data arriving tagged with this alias can be routed here
    /// immediately; `SUBSCRIBE_OK` only flips the status.
    pub fn set_track_alias(&self, track_alias: u64) {
        self.inner.lock().unwrap().track_alias = Some(track_alias);
    }

    pub fn mark_ok(&self, track_alias: u64, supports_new_group_request: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.track_alias = Some(track_alias);
        inner.supports_new_group_request = supports_new_group_request;
        drop(inner);
        self.set_status(SubscribeStatus::Ok);
    }

    pub fn mark_error(&self) {
        self.set_status(SubscribeStatus::Error);
    }

    pub fn mark_not_subscribed(&self) {
        self.set_status(SubscribeStatus::NotSubscribed);
    }

    /// Record delivery of a full object, dispatching to the application
    /// callback and updating the per-stream delta tracking.
    ///
    /// A protocol violation is returned if the implied object id would
    /// move backwards on the same subgroup.
    pub fn on_object(&self, stream_id: u64, group_id: u64, subgroup_id: u64, object_delta: u64, headers: ObjectHeaders, payload: &[u8]) -> Result<(), ()> {
        {
            let mut inner = self.inner.lock().unwrap();
            let progress = inner.streams.entry(stream_id).or_insert(StreamProgress {
                group_id,
                subgroup_id,
                next_object_id: 0,
            });

            if progress.group_id != group_id || progress.subgroup_id != subgroup_id {
                progress.group_id = group_id;
                progress.subgroup_id = subgroup_id;
                progress.next_object_id = 0;
            }

            let expected = progress.next_object_id;
            if object_delta != 0 && headers.object_id < expected {
                return Err(());
            }
            progress.next_object_id = headers.object_id + 1;

            inner.metrics.objects_received += 1;
            inner.metrics.bytes_received += payload.len() as u64;
        }

        if let Some(cb) = self.on_object_received.lock().unwrap().as_mut() {
            cb(&headers, payload);
        }
        Ok(())
    }

    pub fn on_object_status(&self, group_id: u64, object_id: u64, status: ObjectStatus) {
        if let Some(cb) = self.on_object_status_received.lock().unwrap().as_mut() {
            cb(group_id, object_id, status);
        }
    }

    pub fn drop_stream(&self, stream_id: u64) {
        self.inner.lock().unwrap().streams.remove(&stream_id);
    }

    /// Build the `SUBSCRIBE_UPDATE` that requests a pause. The caller
    /// (transport engine) is responsible for actually sending it.
    pub fn pause(&self) -> SubscribeUpdate {
        self.inner.lock().unwrap().paused = true;
        self.set_status(SubscribeStatus::Paused);
        self.update_message(true)
    }

    pub fn resume(&self) -> SubscribeUpdate {
        self.inner.lock().unwrap().paused = false;
        self.set_status(SubscribeStatus::Ok);
        self.update_message(false)
    }

    fn update_message(&self, paused: bool) -> SubscribeUpdate {
        let mut params = crate::coding::Parameters::new();
        params.push(Parameter::int(PAUSE_PARAM, paused as u64).expect("bool fits a varint"));
        SubscribeUpdate {
            id: self.request_id,
            start_location: crate::coding::Location::default(),
            end_group_id: 0,
            subscriber_priority: self.priority,
            params,
        }
    }

    /// Whether the publisher advertised support for [`SubscribeTrackHandler::request_new_group`].
    pub fn supports_new_group_request(&self) -> bool {
        self.inner.lock().unwrap().supports_new_group_request
    }

    /// Ask the publisher to roll over to a new group, if it advertised
    /// support for dynamic-group requests. Returns the `track_alias` to
    /// address the `NEW_GROUP_REQUEST` to, or `None` if unsupported.
    pub fn request_new_group(&self) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        if inner.supports_new_group_request {
            inner.track_alias
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> SubscribeTrackHandler {
        SubscribeTrackHandler::new(
            1,
            TrackNamespace::default(),
            "t".into(),
            3,
            FilterType::LargestObject,
            GroupOrder::Ascending,
        )
    }

    fn headers(object_id: u64) -> ObjectHeaders {
        ObjectHeaders {
            group_id: 0,
            object_id,
            subgroup_id: None,
            priority: 0,
            ttl_ms: 0,
            payload_length: 1,
            extensions: Default::default(),
            immutable_extensions: None,
            status: None,
        }
    }

    #[test]
    fn out_of_order_delta_is_rejected() {
        let h = handler();
        h.on_object(1, 0, 0, 0, headers(5), &[1]).unwrap();
        let err = h.on_object(1, 0, 0, 1, headers(2), &[1]);
        assert!(err.is_err());
    }

    #[test]
    fn group_change_resets_progress() {
        let h = handler();
        h.on_object(1, 0, 0, 0, headers(5), &[1]).unwrap();
        // new group -> delta tracking resets, so object 0 is fine again.
        h.on_object(1, 1, 0, 0, headers(0), &[1]).unwrap();
    }

    #[test]
    fn error_status_is_sticky() {
        let h = handler();
        h.mark_error();
        h.mark_ok(7, false);
        assert_eq!(h.status(), SubscribeStatus::Error);
    }
}
