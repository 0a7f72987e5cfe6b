//! Namespace-level handlers (§3, §4.6): factories/registries that sit one
//! level above individual track handlers, matching on a namespace or
//! namespace *prefix* rather than a single `(namespace, name)` pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::coding::TrackNamespace;

use super::publish::PublishTrackHandler;
use super::status::PublishStatus;

/// Status of a namespace this side has announced.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AnnounceStatus {
    PendingAnnounce,
    Ok,
    Error,
    Unannounced,
}

/// Registry for everything published under one announced namespace.
///
/// The transport calls [`PublishNamespaceHandler::track`] the first time a
/// `SUBSCRIBE` names a track under this namespace that the application
/// hasn't already created a handler for, giving the app a chance to lazily
/// produce one (e.g. opening a file or attaching to a live source) instead
/// of pre-registering every track up front.
pub struct PublishNamespaceHandler {
    pub namespace: TrackNamespace,
    request_id: Mutex<Option<u64>>,
    status: Mutex<AnnounceStatus>,
    tracks: Mutex<HashMap<String, Arc<PublishTrackHandler>>>,
    on_status_changed: Mutex<Option<Box<dyn FnMut(AnnounceStatus) + Send>>>,
    on_track_requested: Mutex<Option<Box<dyn FnMut(&str) -> Option<Arc<PublishTrackHandler>> + Send>>>,
}

impl PublishNamespaceHandler {
    pub fn new(namespace: TrackNamespace) -> Self {
        Self {
            namespace,
            request_id: Mutex::new(None),
            status: Mutex::new(AnnounceStatus::PendingAnnounce),
            tracks: Mutex::new(HashMap::new()),
            on_status_changed: Mutex::new(None),
            on_track_requested: Mutex::new(None),
        }
    }

    pub fn on_status_changed<F: FnMut(AnnounceStatus) + Send + 'static>(&self, f: F) {
        *self.on_status_changed.lock().unwrap() = Some(Box::new(f));
    }

    /// Called by the transport when a `SUBSCRIBE` names a track under this
    /// namespace with no handler registered yet via [`Self::add_track`].
    pub fn on_track_requested<F>(&self, f: F)
    where
        F: FnMut(&str) -> Option<Arc<PublishTrackHandler>> + Send + 'static,
    {
        *self.on_track_requested.lock().unwrap() = Some(Box::new(f));
    }

    pub fn status(&self) -> AnnounceStatus {
        *self.status.lock().unwrap()
    }

    pub fn request_id(&self) -> Option<u64> {
        *self.request_id.lock().unwrap()
    }

    fn set_status(&self, status: AnnounceStatus) {
        let changed = {
            let mut s = self.status.lock().unwrap();
            if *s == status {
                false
            } else {
                *s = status;
                true
            }
        };
        if changed {
            if let Some(cb) = self.on_status_changed.lock().unwrap().as_mut() {
                cb(status);
            }
        }
    }

    pub fn mark_pending(&self, request_id: u64) {
        *self.request_id.lock().unwrap() = Some(request_id);
        self.set_status(AnnounceStatus::PendingAnnounce);
    }

    pub fn mark_ok(&self) {
        self.set_status(AnnounceStatus::Ok);
    }

    pub fn mark_error(&self) {
        self.set_status(AnnounceStatus::Error);
    }

    pub fn mark_unannounced(&self) {
        self.set_status(AnnounceStatus::Unannounced);
        for track in self.tracks.lock().unwrap().values() {
            track.mark_unannounced();
        }
    }

    /// Pre-register a track, bypassing [`Self::on_track_requested`].
    pub fn add_track(&self, name: String, handler: Arc<PublishTrackHandler>) {
        self.tracks.lock().unwrap().insert(name, handler);
    }

    pub fn remove_track(&self, name: &str) -> Option<Arc<PublishTrackHandler>> {
        self.tracks.lock().unwrap().remove(name)
    }

    /// Resolve a track name to a handler, consulting the lazy factory
    /// callback if nothing is registered yet.
    pub fn track(&self, name: &str) -> Option<Arc<PublishTrackHandler>> {
        if let Some(existing) = self.tracks.lock().unwrap().get(name) {
            return Some(existing.clone());
        }
        let produced = self.on_track_requested.lock().unwrap().as_mut()?(name);
        if let Some(handler) = produced.clone() {
            self.tracks.lock().unwrap().insert(name.to_string(), handler);
        }
        produced
    }
}

/// Status of an outstanding `SUBSCRIBE_ANNOUNCES` (prefix-interest) request.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SubscribeNamespaceStatus {
    PendingResponse,
    Ok,
    Error,
}

/// Subscriber-side interest in every namespace matching a prefix.
///
/// Registered announced namespaces are reported through
/// [`Self::on_namespace_announced`]/[`Self::on_namespace_unannounced`] as
/// `ANNOUNCE`/`UNANNOUNCE` pairs referencing this prefix arrive.
pub struct SubscribeNamespaceHandler {
    pub prefix: TrackNamespace,
    pub request_id: u64,
    status: Mutex<SubscribeNamespaceStatus>,
    on_status_changed: Mutex<Option<Box<dyn FnMut(SubscribeNamespaceStatus) + Send>>>,
    on_namespace_announced: Mutex<Option<Box<dyn FnMut(&TrackNamespace) + Send>>>,
    on_namespace_unannounced: Mutex<Option<Box<dyn FnMut(&TrackNamespace) + Send>>>,
}

impl SubscribeNamespaceHandler {
    pub fn new(request_id: u64, prefix: TrackNamespace) -> Self {
        Self {
            prefix,
            request_id,
            status: Mutex::new(SubscribeNamespaceStatus::PendingResponse),
            on_status_changed: Mutex::new(None),
            on_namespace_announced: Mutex::new(None),
            on_namespace_unannounced: Mutex::new(None),
        }
    }

    pub fn on_status_changed<F: FnMut(SubscribeNamespaceStatus) + Send + 'static>(&self, f: F) {
        *self.on_status_changed.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_namespace_announced<F: FnMut(&TrackNamespace) + Send + 'static>(&self, f: F) {
        *self.on_namespace_announced.lock().unwrap() = Some(Box::new(f));
    }

    pub fn on_namespace_unannounced<F: FnMut(&TrackNamespace) + Send + 'static>(&self, f: F) {
        *self.on_namespace_unannounced.lock().unwrap() = Some(Box::new(f));
    }

    pub fn status(&self) -> SubscribeNamespaceStatus {
        *self.status.lock().unwrap()
    }

    fn set_status(&self, status: SubscribeNamespaceStatus) {
        *self.status.lock().unwrap() = status;
        if let Some(cb) = self.on_status_changed.lock().unwrap().as_mut() {
            cb(status);
        }
    }

    pub fn mark_ok(&self) {
        self.set_status(SubscribeNamespaceStatus::Ok);
    }

    pub fn mark_error(&self) {
        self.set_status(SubscribeNamespaceStatus::Error);
    }

    /// True if `namespace` falls under this handler's prefix (§3: "prefix
    /// relation defined on the tuple").
    pub fn matches(&self, namespace: &TrackNamespace) -> bool {
        namespace.fields.len() >= self.prefix.fields.len()
            && namespace.fields[..self.prefix.fields.len()] == self.prefix.fields[..]
    }

    pub fn namespace_announced(&self, namespace: &TrackNamespace) {
        if let Some(cb) = self.on_namespace_announced.lock().unwrap().as_mut() {
            cb(namespace);
        }
    }

    pub fn namespace_unannounced(&self, namespace: &TrackNamespace) {
        if let Some(cb) = self.on_namespace_unannounced.lock().unwrap().as_mut() {
            cb(namespace);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::status::TrackMode;

    #[test]
    fn lazy_track_factory_is_memoized() {
        let ns = PublishNamespaceHandler::new(TrackNamespace::from_utf8_path("live"));
        let calls = Arc::new(Mutex::new(0));
        let calls2 = calls.clone();
        ns.on_track_requested(move |name| {
            *calls2.lock().unwrap() += 1;
            Some(Arc::new(PublishTrackHandler::new(
                TrackNamespace::from_utf8_path("live"),
                name.to_string(),
                TrackMode::Datagram,
            )))
        });

        let a = ns.track("cam1").unwrap();
        let b = ns.track("cam1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn prefix_matching() {
        let handler = SubscribeNamespaceHandler::new(1, TrackNamespace::from_utf8_path("live"));
        assert!(handler.matches(&TrackNamespace::from_utf8_path("live/cam1")));
        assert!(!handler.matches(&TrackNamespace::from_utf8_path("vod/cam1")));
    }

    #[test]
    fn unannounce_propagates_to_tracks() {
        let ns = PublishNamespaceHandler::new(TrackNamespace::from_utf8_path("live"));
        let track = Arc::new(PublishTrackHandler::new(
            TrackNamespace::from_utf8_path("live"),
            "cam1".into(),
            TrackMode::Datagram,
        ));
        track.mark_ok(7);
        ns.add_track("cam1".into(), track.clone());
        ns.mark_unannounced();
        assert_eq!(track.status(), PublishStatus::NotAnnounced);
    }
}
