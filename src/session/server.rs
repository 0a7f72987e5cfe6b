//! The server role specialization (§4.9): accepts many independently
//! accepted WebTransport sessions, running the server side of the
//! handshake on each and installing this server's default policies on the
//! resulting [`ConnectionContext`].
//!
//! Accepting the underlying QUIC/WebTransport connection itself is outside
//! this crate's scope (§1): the application (or a `moq-native`-shaped
//! sibling crate) owns the listener and hands each accepted
//! `web_transport::Session` to [`Server::accept`] one at a time.

use std::sync::{Arc, Mutex};

use crate::handler::{PublishTrackHandler, SubscribeTrackHandler};
use crate::message::{Subscribe, SubscribeError};
use crate::message::{PublishNamespace, PublishNamespaceError};
use crate::message::Publish;
use crate::time::Clock;

use super::connection::{AnnouncePolicy, PublishPolicy, SubscribePolicy, TrackOfferedCallback};
use super::{ConnectionContext, Session, SessionError};

/// Default budget handed to a peer in `SERVER_SETUP`'s `MaxRequestId`
/// parameter when the application hasn't set one explicitly.
const DEFAULT_MAX_REQUEST_ID: u64 = 1_000_000;

/// A MoQT server: the policy and defaults shared across every connection
/// it accepts. Stateless with respect to any one connection -- all
/// per-connection state lives in the [`ConnectionContext`] that
/// [`Server::accept`] returns.
#[derive(Default)]
pub struct Server {
    max_request_id: Mutex<Option<u64>>,
    subscribe_policy: Mutex<Option<Arc<SubscribePolicy>>>,
    publish_policy: Mutex<Option<Arc<PublishPolicy>>>,
    announce_policy: Mutex<Option<Arc<AnnouncePolicy>>>,
    on_track_offered: Mutex<Option<Arc<TrackOfferedCallback>>>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the `MaxRequestId` advertised to every accepted connection
    /// (default 1,000,000).
    pub fn set_max_request_id(&self, max: u64) {
        *self.max_request_id.lock().unwrap() = Some(max);
    }

    /// Install the default `SUBSCRIBE` accept/reject policy applied to
    /// every connection this server accepts. Defaults to accepting
    /// everything, per §4.9.
    pub fn set_subscribe_policy(&self, f: impl Fn(&Subscribe) -> Result<(), String> + Send + Sync + 'static) {
        *self.subscribe_policy.lock().unwrap() = Some(Arc::new(Box::new(f) as SubscribePolicy));
    }

    /// Install the default `PUBLISH` (publisher-initiated subscribe)
    /// accept/reject policy.
    pub fn set_publish_policy(&self, f: impl Fn(&Publish) -> Result<(), String> + Send + Sync + 'static) {
        *self.publish_policy.lock().unwrap() = Some(Arc::new(Box::new(f) as PublishPolicy));
    }

    /// Install the default `PUBLISH_NAMESPACE` (announce) accept/reject
    /// policy. Defaults to accepting every namespace.
    pub fn set_announce_policy(&self, f: impl Fn(&crate::coding::TrackNamespace) -> Result<(), String> + Send + Sync + 'static) {
        *self.announce_policy.lock().unwrap() = Some(Arc::new(Box::new(f) as AnnouncePolicy));
    }

    /// Install the default callback notified when an inbound `PUBLISH`
    /// auto-creates a [`SubscribeTrackHandler`] for a track the peer wants
    /// to push to us.
    pub fn on_track_offered(&self, f: impl Fn(Arc<SubscribeTrackHandler>) + Send + Sync + 'static) {
        *self.on_track_offered.lock().unwrap() = Some(Arc::new(Box::new(f) as TrackOfferedCallback));
    }

    /// Run the server side of the handshake on one already-accepted
    /// WebTransport session, applying this server's default policies to
    /// the resulting connection. An empty `CLIENT_SETUP` version list (or
    /// one with no mutually supported version) fails the handshake with
    /// [`SessionError::Version`], closing with `PROTOCOL_VIOLATION` per §4.8.
    pub async fn accept(&self, webtransport: web_transport::Session, clock: Clock) -> Result<(Session, Arc<ConnectionContext>), SessionError> {
        let max_request_id = self.max_request_id.lock().unwrap().unwrap_or(DEFAULT_MAX_REQUEST_ID);
        let (session, ctx) = Session::accept(webtransport, clock, max_request_id).await?;

        if let Some(f) = self.subscribe_policy.lock().unwrap().clone() {
            ctx.set_subscribe_policy(move |m| f(m));
        }
        if let Some(f) = self.publish_policy.lock().unwrap().clone() {
            ctx.set_publish_policy(move |m| f(m));
        }
        if let Some(f) = self.announce_policy.lock().unwrap().clone() {
            ctx.set_announce_policy(move |ns| f(ns));
        }
        if let Some(f) = self.on_track_offered.lock().unwrap().clone() {
            ctx.on_track_offered(move |h| f(h));
        }

        Ok((session, ctx))
    }

    /// Bind `handler` as the publisher for an inbound `SUBSCRIBE` the
    /// application is answering out of band, rather than through a
    /// registered [`crate::handler::PublishNamespaceHandler`] -- the relay
    /// pattern from §4.9 where the downstream subscribe is only accepted
    /// once the matching upstream one succeeds. Sends `SUBSCRIBE_OK`.
    pub fn bind_publisher_track(
        &self,
        ctx: &ConnectionContext,
        m: &Subscribe,
        handler: Arc<PublishTrackHandler>,
    ) -> Result<(), SessionError> {
        ctx.bind_publisher_track(m, handler)
    }

    /// Reject an inbound `SUBSCRIBE` the default policy already let
    /// through but the application decided, on its own terms, to refuse.
    pub fn reject_subscribe(&self, ctx: &ConnectionContext, m: &Subscribe, error_code: u64, reason: String) -> Result<(), SessionError> {
        ctx.send(SubscribeError {
            id: m.id,
            error_code,
            reason: crate::coding::ReasonPhrase(reason),
            track_alias: m.track_alias,
        })
    }

    /// Reject an inbound `PUBLISH_NAMESPACE` the default policy already let
    /// through but the application decided to refuse.
    pub fn reject_announce(&self, ctx: &ConnectionContext, m: &PublishNamespace, error_code: u64, reason: String) -> Result<(), SessionError> {
        ctx.send(PublishNamespaceError {
            id: m.id,
            error_code,
            reason: crate::coding::ReasonPhrase(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_request_id_applies_when_unset() {
        let server = Server::new();
        assert_eq!(server.max_request_id.lock().unwrap().unwrap_or(DEFAULT_MAX_REQUEST_ID), DEFAULT_MAX_REQUEST_ID);
        server.set_max_request_id(42);
        assert_eq!(server.max_request_id.lock().unwrap().unwrap(), 42);
    }
}
