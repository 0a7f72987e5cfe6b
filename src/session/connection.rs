//! Per-connection state shared between the control-message dispatcher, the
//! data-plane stream/datagram readers, and whatever the application calls
//! on the [`Connection`] handle it's given.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::coding::TrackNamespace;
use crate::handler::{
    FetchTrackHandler, PublishNamespaceHandler, PublishTrackHandler, SubscribeNamespaceHandler, SubscribeTrackHandler,
};
use crate::message::{Publish, Subscribe};
use crate::message::Message;
use crate::mlog;
use crate::setup;
use crate::time::Clock;

use super::SessionError;

/// Decides whether an inbound SUBSCRIBE should be accepted. Defaults to
/// accepting everything; set with [`ConnectionContext::set_subscribe_policy`].
pub type SubscribePolicy = Box<dyn Fn(&Subscribe) -> Result<(), String> + Send + Sync>;

/// Decides whether an inbound PUBLISH (publisher-initiated subscribe)
/// should be accepted.
pub type PublishPolicy = Box<dyn Fn(&Publish) -> Result<(), String> + Send + Sync>;

/// Decides whether an inbound PUBLISH_NAMESPACE (announce) should be
/// accepted. Defaults to accepting every namespace.
pub type AnnouncePolicy = Box<dyn Fn(&TrackNamespace) -> Result<(), String> + Send + Sync>;

/// Notified when an inbound `PUBLISH` hands us an auto-created
/// [`SubscribeTrackHandler`] for a track the peer wants to push to us.
pub type TrackOfferedCallback = Box<dyn Fn(Arc<SubscribeTrackHandler>) + Send + Sync>;

/// Which side of the handshake this connection played. Both sides may
/// publish and subscribe; this only affects request ID allocation parity.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    Client,
    Server,
}

#[derive(Default)]
struct Registries {
    subscribes: HashMap<u64, Arc<SubscribeTrackHandler>>,
    subscribes_by_alias: HashMap<u64, Arc<SubscribeTrackHandler>>,
    fetches: HashMap<u64, Arc<FetchTrackHandler>>,
    fetch_cancelled: std::collections::HashSet<u64>,
    publish_by_alias: HashMap<u64, Arc<PublishTrackHandler>>,
    publish_by_request: HashMap<u64, Arc<PublishTrackHandler>>,
    publish_namespaces: HashMap<Vec<u8>, Arc<PublishNamespaceHandler>>,
    publish_namespace_by_request: HashMap<u64, Arc<PublishNamespaceHandler>>,
    subscribe_namespaces: HashMap<u64, Arc<SubscribeNamespaceHandler>>,
    track_status_waiters: HashMap<u64, tokio::sync::oneshot::Sender<TrackStatusReply>>,
    /// Namespaces the peer has announced to us via `PUBLISH_NAMESPACE`,
    /// keyed the same way as `publish_namespaces` but tracking the other
    /// direction: ours are namespaces we announce, this is what they do.
    remote_announced: HashMap<Vec<u8>, TrackNamespace>,
}

/// The reply to an outbound `TRACK_STATUS` request, delivered to whoever is
/// awaiting it via a one-shot channel registered at send time.
pub enum TrackStatusReply {
    Ok(crate::message::TrackStatusOk),
    Error(crate::message::TrackStatusError),
}

fn namespace_key(ns: &TrackNamespace) -> Vec<u8> {
    // TrackNamespace isn't Hash-friendly as a HashMap key type across module
    // boundaries without pulling in its Hash impl; the encoded path is a
    // stable, unambiguous stand-in.
    ns.to_utf8_path().into_bytes()
}

/// Shared, lock-protected state for one MoQT connection. Cloned cheaply
/// (it's just an `Arc`) and handed to the control loop, the data-plane
/// loops, and the application.
pub struct ConnectionContext {
    pub role: Role,
    pub version: setup::Version,
    pub clock: Clock,

    next_request_id: AtomicU64,
    next_track_alias: AtomicU64,
    peer_max_request_id: AtomicU64,
    peer_last_request_id: Mutex<Option<u64>>,

    registries: Mutex<Registries>,
    outgoing: mpsc::UnboundedSender<Message>,

    subscribe_policy: Mutex<Option<SubscribePolicy>>,
    publish_policy: Mutex<Option<PublishPolicy>>,
    announce_policy: Mutex<Option<AnnouncePolicy>>,
    on_track_offered: Mutex<Option<TrackOfferedCallback>>,
    goaway_received: Mutex<Option<String>>,
    mlog: Mutex<Option<Arc<Mutex<mlog::MlogWriter>>>>,
}

impl ConnectionContext {
    pub fn new(role: Role, version: setup::Version, clock: Clock, outgoing: mpsc::UnboundedSender<Message>) -> Self {
        // Draft convention: client-initiated requests use even IDs, server-initiated use odd,
        // so the two sides never collide while allocating independently.
        let first_id = match role {
            Role::Client => 0,
            Role::Server => 1,
        };
        Self {
            role,
            version,
            clock,
            next_request_id: AtomicU64::new(first_id),
            next_track_alias: AtomicU64::new(0),
            peer_max_request_id: AtomicU64::new(u64::MAX),
            peer_last_request_id: Mutex::new(None),
            registries: Mutex::new(Registries::default()),
            outgoing,
            subscribe_policy: Mutex::new(None),
            publish_policy: Mutex::new(None),
            announce_policy: Mutex::new(None),
            on_track_offered: Mutex::new(None),
            goaway_received: Mutex::new(None),
            mlog: Mutex::new(None),
        }
    }

    /// Attach a qlog-style event log to this connection. Once set, every
    /// control message sent or dispatched, and every data-plane header and
    /// object the stream/datagram loops see, is recorded as an `mlog`
    /// event -- the same events the teacher's `Publisher`/`Subscriber`
    /// emit from inside their own stream-parsing code. Install it the same
    /// way as the policy callbacks, right after `connect`/`accept` returns.
    pub fn set_mlog_writer(&self, writer: Arc<Mutex<mlog::MlogWriter>>) {
        *self.mlog.lock().unwrap() = Some(writer);
    }

    /// Record an `mlog` event, if a writer is attached. `build` only runs
    /// once the elapsed-time clock is available, and can decline to emit
    /// anything (e.g. a control message type `events` has no builder for
    /// yet) by returning `None`.
    pub(super) fn mlog_emit(&self, build: impl FnOnce(f64) -> Option<mlog::Event>) {
        let Some(writer) = self.mlog.lock().unwrap().clone() else {
            return;
        };
        let mut guard = writer.lock().unwrap();
        let time = guard.elapsed_ms();
        let Some(event) = build(time) else {
            return;
        };
        if let Err(err) = guard.add_event(event) {
            log::warn!("mlog write failed: {}", err);
        }
    }

    /// Enforce §4.7: request IDs observed from the peer must strictly
    /// increase. Called once per inbound request-opening message
    /// (SUBSCRIBE, FETCH, PUBLISH_NAMESPACE, SUBSCRIBE_NAMESPACE).
    pub fn observe_peer_request_id(&self, id: u64) -> Result<(), SessionError> {
        let mut last = self.peer_last_request_id.lock().unwrap();
        if let Some(prev) = *last {
            if id <= prev {
                return Err(SessionError::ProtocolViolation(format!(
                    "request id {id} did not increase past previously seen {prev}"
                )));
            }
        }
        *last = Some(id);
        Ok(())
    }

    pub fn alloc_request_id(&self) -> Result<u64, SessionError> {
        let id = self.next_request_id.fetch_add(2, Ordering::Relaxed);
        if id > self.peer_max_request_id.load(Ordering::Relaxed) {
            return Err(SessionError::RequestsBlocked);
        }
        Ok(id)
    }

    pub fn alloc_track_alias(&self) -> u64 {
        self.next_track_alias.fetch_add(1, Ordering::Relaxed)
    }

    pub fn set_peer_max_request_id(&self, max: u64) {
        self.peer_max_request_id.store(max, Ordering::Relaxed);
    }

    pub fn send(&self, msg: impl Into<Message>) -> Result<(), SessionError> {
        let msg = msg.into();
        // Control stream id is always 0 here, same placeholder `events.rs`
        // uses everywhere -- `web_transport` doesn't expose QUIC stream ids.
        self.mlog_emit(|time| mlog::control_created(time, 0, &msg));
        self.outgoing.send(msg).map_err(|_| SessionError::Internal)
    }

    pub fn insert_subscribe(&self, id: u64, handler: Arc<SubscribeTrackHandler>) {
        self.registries.lock().unwrap().subscribes.insert(id, handler);
    }

    pub fn subscribe(&self, id: u64) -> Option<Arc<SubscribeTrackHandler>> {
        self.registries.lock().unwrap().subscribes.get(&id).cloned()
    }

    pub fn remove_subscribe(&self, id: u64) -> Option<Arc<SubscribeTrackHandler>> {
        let mut reg = self.registries.lock().unwrap();
        let removed = reg.subscribes.remove(&id);
        if let Some(alias) = removed.as_ref().and_then(|h| h.track_alias()) {
            reg.subscribes_by_alias.remove(&alias);
        }
        removed
    }

    /// Bind the `track_alias` the publisher assigned in `SUBSCRIBE_OK` so
    /// incoming subgroup streams and datagrams can be routed by alias.
    pub fn bind_subscribe_alias(&self, track_alias: u64, handler: Arc<SubscribeTrackHandler>) {
        self.registries.lock().unwrap().subscribes_by_alias.insert(track_alias, handler);
    }

    pub fn subscribe_by_alias(&self, track_alias: u64) -> Option<Arc<SubscribeTrackHandler>> {
        self.registries.lock().unwrap().subscribes_by_alias.get(&track_alias).cloned()
    }

    pub fn insert_fetch(&self, id: u64, handler: Arc<FetchTrackHandler>) {
        self.registries.lock().unwrap().fetches.insert(id, handler);
    }

    pub fn fetch(&self, id: u64) -> Option<Arc<FetchTrackHandler>> {
        self.registries.lock().unwrap().fetches.get(&id).cloned()
    }

    pub fn remove_fetch(&self, id: u64) -> Option<Arc<FetchTrackHandler>> {
        self.registries.lock().unwrap().fetches.remove(&id)
    }

    pub fn insert_publish(&self, request_id: u64, track_alias: u64, handler: Arc<PublishTrackHandler>) {
        let mut reg = self.registries.lock().unwrap();
        reg.publish_by_alias.insert(track_alias, handler.clone());
        reg.publish_by_request.insert(request_id, handler);
    }

    pub fn publish_by_alias(&self, track_alias: u64) -> Option<Arc<PublishTrackHandler>> {
        self.registries.lock().unwrap().publish_by_alias.get(&track_alias).cloned()
    }

    pub fn publish_by_request(&self, request_id: u64) -> Option<Arc<PublishTrackHandler>> {
        self.registries.lock().unwrap().publish_by_request.get(&request_id).cloned()
    }

    pub fn remove_publish_by_alias(&self, track_alias: u64) -> Option<Arc<PublishTrackHandler>> {
        self.registries.lock().unwrap().publish_by_alias.remove(&track_alias)
    }

    pub fn all_published(&self) -> Vec<Arc<PublishTrackHandler>> {
        self.registries.lock().unwrap().publish_by_alias.values().cloned().collect()
    }

    pub fn insert_publish_namespace(&self, request_id: u64, handler: Arc<PublishNamespaceHandler>) {
        let mut reg = self.registries.lock().unwrap();
        reg.publish_namespaces.insert(namespace_key(&handler.namespace), handler.clone());
        reg.publish_namespace_by_request.insert(request_id, handler);
    }

    pub fn publish_namespace_by_request(&self, request_id: u64) -> Option<Arc<PublishNamespaceHandler>> {
        self.registries.lock().unwrap().publish_namespace_by_request.get(&request_id).cloned()
    }

    pub fn publish_namespace(&self, ns: &TrackNamespace) -> Option<Arc<PublishNamespaceHandler>> {
        self.registries.lock().unwrap().publish_namespaces.get(&namespace_key(ns)).cloned()
    }

    pub fn remove_publish_namespace(&self, ns: &TrackNamespace) -> Option<Arc<PublishNamespaceHandler>> {
        self.registries.lock().unwrap().publish_namespaces.remove(&namespace_key(ns))
    }

    pub fn insert_subscribe_namespace(&self, id: u64, handler: Arc<SubscribeNamespaceHandler>) {
        self.registries.lock().unwrap().subscribe_namespaces.insert(id, handler);
    }

    pub fn subscribe_namespace(&self, id: u64) -> Option<Arc<SubscribeNamespaceHandler>> {
        self.registries.lock().unwrap().subscribe_namespaces.get(&id).cloned()
    }

    pub fn all_subscribe_namespaces(&self) -> Vec<Arc<SubscribeNamespaceHandler>> {
        self.registries.lock().unwrap().subscribe_namespaces.values().cloned().collect()
    }

    pub fn remove_subscribe_namespace(&self, id: u64) -> Option<Arc<SubscribeNamespaceHandler>> {
        self.registries.lock().unwrap().subscribe_namespaces.remove(&id)
    }

    pub fn all_publish_namespaces(&self) -> Vec<Arc<PublishNamespaceHandler>> {
        self.registries.lock().unwrap().publish_namespaces.values().cloned().collect()
    }

    pub fn insert_track_status_waiter(&self, id: u64, tx: tokio::sync::oneshot::Sender<TrackStatusReply>) {
        self.registries.lock().unwrap().track_status_waiters.insert(id, tx);
    }

    pub fn take_track_status_waiter(&self, id: u64) -> Option<tokio::sync::oneshot::Sender<TrackStatusReply>> {
        self.registries.lock().unwrap().track_status_waiters.remove(&id)
    }

    /// Install the callback that decides whether an inbound `SUBSCRIBE`
    /// should be accepted. Defaults to accepting everything.
    pub fn set_subscribe_policy(&self, f: impl Fn(&Subscribe) -> Result<(), String> + Send + Sync + 'static) {
        *self.subscribe_policy.lock().unwrap() = Some(Box::new(f));
    }

    pub fn check_subscribe_policy(&self, msg: &Subscribe) -> Result<(), String> {
        match self.subscribe_policy.lock().unwrap().as_ref() {
            Some(f) => f(msg),
            None => Ok(()),
        }
    }

    /// Install the callback that decides whether an inbound `PUBLISH`
    /// (publisher-initiated subscribe) should be accepted.
    pub fn set_publish_policy(&self, f: impl Fn(&Publish) -> Result<(), String> + Send + Sync + 'static) {
        *self.publish_policy.lock().unwrap() = Some(Box::new(f));
    }

    pub fn check_publish_policy(&self, msg: &Publish) -> Result<(), String> {
        match self.publish_policy.lock().unwrap().as_ref() {
            Some(f) => f(msg),
            None => Ok(()),
        }
    }

    /// Install the callback that decides whether an inbound
    /// `PUBLISH_NAMESPACE` (announce) should be accepted. Defaults to
    /// accepting every namespace.
    pub fn set_announce_policy(&self, f: impl Fn(&TrackNamespace) -> Result<(), String> + Send + Sync + 'static) {
        *self.announce_policy.lock().unwrap() = Some(Box::new(f));
    }

    pub fn check_announce_policy(&self, ns: &TrackNamespace) -> Result<(), String> {
        match self.announce_policy.lock().unwrap().as_ref() {
            Some(f) => f(ns),
            None => Ok(()),
        }
    }

    /// Record a namespace the peer announced to us, so a later
    /// `PUBLISH_NAMESPACE_DONE`/`PUBLISH_NAMESPACE_CANCEL` can be matched
    /// back to it and `namespace_unannounced` fired on the right
    /// [`SubscribeNamespaceHandler`]s.
    pub fn insert_remote_announced(&self, ns: TrackNamespace) {
        self.registries.lock().unwrap().remote_announced.insert(namespace_key(&ns), ns);
    }

    pub fn remote_announced(&self, ns: &TrackNamespace) -> Option<TrackNamespace> {
        self.registries.lock().unwrap().remote_announced.get(&namespace_key(ns)).cloned()
    }

    pub fn remove_remote_announced(&self, ns: &TrackNamespace) -> Option<TrackNamespace> {
        self.registries.lock().unwrap().remote_announced.remove(&namespace_key(ns))
    }

    /// Mark a fetch request as cancelled so the task serving it from cache
    /// can stop pushing further objects. Cheap flag rather than a full
    /// abort handle since the serving task already polls in a loop.
    pub fn cancel_fetch(&self, request_id: u64) {
        self.registries.lock().unwrap().fetch_cancelled.insert(request_id);
    }

    pub fn is_fetch_cancelled(&self, request_id: u64) -> bool {
        self.registries.lock().unwrap().fetch_cancelled.contains(&request_id)
    }

    pub fn clear_fetch_cancelled(&self, request_id: u64) {
        self.registries.lock().unwrap().fetch_cancelled.remove(&request_id);
    }

    /// Install the callback fired when an inbound `PUBLISH` is accepted and
    /// auto-creates a [`SubscribeTrackHandler`] for the application.
    pub fn on_track_offered(&self, f: impl Fn(Arc<SubscribeTrackHandler>) + Send + Sync + 'static) {
        *self.on_track_offered.lock().unwrap() = Some(Box::new(f));
    }

    pub fn notify_track_offered(&self, handler: Arc<SubscribeTrackHandler>) {
        if let Some(f) = self.on_track_offered.lock().unwrap().as_ref() {
            f(handler);
        }
    }

    /// Bind `handler` as the publisher for an inbound `SUBSCRIBE` that the
    /// application held onto rather than resolving immediately through a
    /// [`crate::handler::PublishNamespaceHandler`] (§4.9: `BindPublisherTrack`).
    /// A relay takes this path when it needs to open the matching upstream
    /// subscription before it can answer the downstream one. From this
    /// point on, objects the handler publishes flow to this subscriber.
    pub fn bind_publisher_track(&self, m: &crate::message::Subscribe, handler: std::sync::Arc<PublishTrackHandler>) -> Result<(), SessionError> {
        handler.add_subscriber();
        self.insert_publish(m.id, m.track_alias, handler.clone());
        handler.mark_ok(m.track_alias);

        let now_ms = self.clock.now_ms();
        let largest = handler.largest(now_ms);
        self.send(crate::message::SubscribeOk {
            id: m.id,
            expires: 0,
            group_order: crate::message::GroupOrder::Ascending,
            content_exists: largest.is_some(),
            largest_location: largest.map(|(g, o)| crate::coding::Location::new(g, o)),
            params: crate::coding::Parameters::new(),
        })
    }

    pub fn set_goaway_received(&self, uri: String) {
        *self.goaway_received.lock().unwrap() = Some(uri);
    }

    pub fn goaway_received(&self) -> Option<String> {
        self.goaway_received.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (ConnectionContext, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Clock::spawn();
        (ConnectionContext::new(Role::Client, setup::Version::DRAFT_14, clock, tx), rx)
    }

    #[test]
    fn request_ids_follow_role_parity() {
        let (ctx, _rx) = ctx();
        assert_eq!(ctx.alloc_request_id().unwrap(), 0);
        assert_eq!(ctx.alloc_request_id().unwrap(), 2);

        let (tx, _rx) = mpsc::unbounded_channel();
        let clock = Clock::spawn();
        let server = ConnectionContext::new(Role::Server, setup::Version::DRAFT_14, clock, tx);
        assert_eq!(server.alloc_request_id().unwrap(), 1);
        assert_eq!(server.alloc_request_id().unwrap(), 3);
    }

    #[test]
    fn request_blocked_once_over_peer_max() {
        let (ctx, _rx) = ctx();
        ctx.set_peer_max_request_id(0);
        assert!(matches!(ctx.alloc_request_id(), Err(SessionError::RequestsBlocked)));
    }
}
