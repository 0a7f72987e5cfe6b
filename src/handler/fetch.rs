//! The fetch-side track handler (§4.6): a finite, historical object range
//! request. Shaped like [`super::SubscribeTrackHandler`] but bounded by an
//! absolute `(start_group, start_object, end_group, end_object)` range
//! rather than an open-ended filter, and with no pause/resume concept.

use std::sync::Mutex;

use crate::coding::TrackNamespace;
use crate::data::ObjectStatus;

use super::publish::ObjectHeaders;
use super::status::{FetchStatus, TrackMetrics};

/// Reason a fetch stopped delivering objects.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FetchEndReason {
    EndOfTrack,
    Cancelled,
    Error,
}

struct Inner {
    status: FetchStatus,
    metrics: TrackMetrics,
    next_expected: Option<(u64, u64, u64)>,
}

pub struct FetchTrackHandler {
    pub namespace: TrackNamespace,
    pub name: String,
    pub request_id: u64,
    pub priority: u8,

    pub start_group: u64,
    pub start_object: u64,
    pub end_group: u64,
    pub end_object: u64,

    inner: Mutex<Inner>,
    on_status_changed: Mutex<Option<Box<dyn FnMut(FetchStatus) + Send>>>,
    on_object_received: Mutex<Option<Box<dyn FnMut(&ObjectHeaders, &[u8]) + Send>>>,
    on_end_of_fetch: Mutex<Option<Box<dyn FnMut(FetchEndReason) + Send>>>,
}

impl FetchTrackHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: u64,
        namespace: TrackNamespace,
        name: String,
        priority: u8,
        start_group: u64,
        start_object: u64,
        end_group: u64,
        end_object: u64,
    ) -> Self {
        Self {
            namespace,
            name,
            request_id,
            priority,
            start_group,
            start_object,
            end_group,
            end_object,
            inner: Mutex::new(Inner {
                status: FetchStatus::PendingResponse,
                metrics: TrackMetrics::default(),
                next_expected: None,
            }),
            on_status_changed: Mutex::new(None),
            on_object_received: Mutex::new(None),
            on_end_of_fetch: Mutex::new(None),
        }
    }

    pub fn on_status_changed<F: FnMut(FetchStatus) + Send + 'static>(&self, f: F) {
        *self.on_status_changed.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_object_received<F: FnMut(&ObjectHeaders, &[u8]) + Send + 'static>(&self, f: F) {
        *self.on_object_received.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_end_of_fetch<F: FnMut(FetchEndReason) + Send + 'static>(&self, f: F) {
        *self.on_end_of_fetch.lock().unwrap() = Some(Box::new(f));
    }

    pub fn status(&self) -> FetchStatus {
        self.inner.lock().unwrap().status
    }

    pub fn metrics(&self) -> TrackMetrics {
        self.inner.lock().unwrap().metrics
    }

    fn set_status(&self, status: FetchStatus) {
        let changed = {
            let mut inner = self.inner.lock().unwrap();
            let terminal = matches!(
                inner.status,
                FetchStatus::CompletedByEndOfTrack | FetchStatus::Cancelled | FetchStatus::Error
            );
            if terminal || inner.status == status {
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

    pub fn mark_ok(&self) {
        self.set_status(FetchStatus::Ok);
    }

    pub fn mark_error(&self) {
        self.set_status(FetchStatus::Error);
        self.finish(FetchEndReason::Error);
    }

    pub fn mark_cancelled(&self) {
        self.set_status(FetchStatus::Cancelled);
        self.finish(FetchEndReason::Cancelled);
    }

    /// A `FETCH` stream record was fully received and is in range.
    pub fn on_object(&self, group_id: u64, subgroup_id: u64, object_id: u64, headers: ObjectHeaders, payload: &[u8]) -> Result<(), ()> {
        {
            let mut inner = self.inner.lock().unwrap();
            if let Some((last_group, last_subgroup, last_object)) = inner.next_expected {
                if (group_id, subgroup_id, object_id) < (last_group, last_subgroup, last_object) {
                    return Err(());
                }
            }
            inner.next_expected = Some((group_id, subgroup_id, object_id));
            inner.metrics.objects_received += 1;
            inner.metrics.bytes_received += payload.len() as u64;
        }

        if let Some(cb) = self.on_object_received.lock().unwrap().as_mut() {
            cb(&headers, payload);
        }

        if group_id == self.end_group && object_id >= self.end_object {
            self.finish(FetchEndReason::EndOfTrack);
        }
        Ok(())
    }

    pub fn on_object_status(&self, _group_id: u64, _object_id: u64, _status: ObjectStatus) {}

    fn finish(&self, reason: FetchEndReason) {
        self.set_status(match reason {
            FetchEndReason::EndOfTrack => FetchStatus::CompletedByEndOfTrack,
            FetchEndReason::Cancelled => FetchStatus::Cancelled,
            FetchEndReason::Error => FetchStatus::Error,
        });
        if let Some(cb) = self.on_end_of_fetch.lock().unwrap().as_mut() {
            cb(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> FetchTrackHandler {
        FetchTrackHandler::new(1, TrackNamespace::default(), "t".into(), 5, 0, 0, 2, 3)
    }

    fn headers(group: u64, object: u64) -> ObjectHeaders {
        ObjectHeaders {
            group_id: group,
            object_id: object,
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
    fn completes_at_end_of_range() {
        let h = handler();
        h.mark_ok();
        h.on_object(2, 0, 3, headers(2, 3), &[1]).unwrap();
        assert_eq!(h.status(), FetchStatus::CompletedByEndOfTrack);
    }

    #[test]
    fn cancel_is_terminal() {
        let h = handler();
        h.mark_ok();
        h.mark_cancelled();
        h.mark_ok();
        assert_eq!(h.status(), FetchStatus::Cancelled);
    }
}
