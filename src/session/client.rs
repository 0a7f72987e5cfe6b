//! The client role specialization (§4.9): a thin wrapper around one
//! [`Session`] that owns the single outbound connection a client makes,
//! plus the convenience calls an application uses to drive it.

use std::sync::Arc;

use crate::coding::{Location, Parameters, TrackNamespace};
use crate::handler::{FetchTrackHandler, PublishNamespaceHandler, SubscribeNamespaceHandler, SubscribeTrackHandler};
use crate::message::{
    Fetch, FetchCancel, FetchType, PublishNamespace, StandaloneFetch, Subscribe, SubscribeNamespace, Unsubscribe, UnsubscribeNamespace,
};
use crate::time::Clock;

use super::{ConnectionContext, Session, SessionError};

/// One client-initiated MoQT connection: exactly one QUIC connection, set
/// up via `CLIENT_SETUP`/`SERVER_SETUP` and then driven by [`Client::run`].
///
/// Everything else a client does -- announce, subscribe, fetch -- goes
/// through the methods here rather than touching [`ConnectionContext`]
/// directly, mirroring how the teacher's `Publisher`/`Subscriber` exposed a
/// handful of verbs over a connection handle instead of a raw message API.
#[must_use = "call run() to drive the connection, or it never does anything"]
pub struct Client {
    session: Session,
    ctx: Arc<ConnectionContext>,
}

impl Client {
    /// Perform the client side of the handshake and return the connected,
    /// not-yet-running client.
    pub async fn connect(webtransport: web_transport::Session, clock: Clock) -> Result<Self, SessionError> {
        let (session, ctx) = Session::connect(webtransport, clock).await?;
        Ok(Self { session, ctx })
    }

    /// The shared connection handle, for application code that wants to
    /// install policy callbacks or reach the lower-level registries.
    pub fn context(&self) -> &Arc<ConnectionContext> {
        &self.ctx
    }

    /// Drive the connection until it closes. Consumes `self`; every other
    /// method clones what it needs out of the shared [`ConnectionContext`]
    /// first, so callers typically `tokio::spawn` this after issuing their
    /// initial subscribes/announces.
    pub async fn run(self) -> Result<(), SessionError> {
        self.session.run().await
    }

    /// Announce a namespace: sends `PUBLISH_NAMESPACE` and registers
    /// `handler` so the matching `PUBLISH_NAMESPACE_OK`/`_ERROR` updates it.
    pub fn announce(&self, handler: Arc<PublishNamespaceHandler>) -> Result<(), SessionError> {
        let id = self.ctx.alloc_request_id()?;
        handler.mark_pending(id);
        self.ctx.insert_publish_namespace(id, handler.clone());
        self.ctx.send(PublishNamespace {
            id,
            track_namespace: handler.namespace.clone(),
            params: Parameters::new(),
        })
    }

    /// Subscribe to a track: allocates a track alias, sends `SUBSCRIBE`,
    /// and registers `handler` to receive the matching `SUBSCRIBE_OK`,
    /// objects, and status updates.
    pub fn subscribe(&self, handler: Arc<SubscribeTrackHandler>) -> Result<(), SessionError> {
        let track_alias = self.ctx.alloc_track_alias();
        handler.set_track_alias(track_alias);
        self.ctx.insert_subscribe(handler.request_id, handler.clone());
        self.ctx.bind_subscribe_alias(track_alias, handler.clone());

        let (start_location, end_group_id) = subscribe_range(&handler);
        self.ctx.send(Subscribe {
            id: handler.request_id,
            track_alias,
            track_namespace: handler.namespace.clone(),
            track_name: handler.name.clone(),
            subscriber_priority: handler.priority,
            group_order: handler.group_order,
            filter_type: handler.filter,
            start_location,
            end_group_id,
            params: Parameters::new(),
        })
    }

    /// Tear down a subscribe: sends `UNSUBSCRIBE`. The matching
    /// `SUBSCRIBE_DONE` moves the handler to `NotSubscribed`.
    pub fn unsubscribe(&self, request_id: u64) -> Result<(), SessionError> {
        self.ctx.send(Unsubscribe { id: request_id })
    }

    /// Issue a standalone `FETCH` over the absolute range `handler` names.
    pub fn fetch(&self, handler: Arc<FetchTrackHandler>) -> Result<(), SessionError> {
        self.ctx.insert_fetch(handler.request_id, handler.clone());
        self.ctx.send(Fetch {
            id: handler.request_id,
            subscriber_priority: handler.priority,
            group_order: crate::message::GroupOrder::Ascending,
            fetch_type: FetchType::Standalone,
            standalone_fetch: Some(StandaloneFetch {
                track_namespace: handler.namespace.clone(),
                track_name: handler.name.clone(),
                start_location: Location::new(handler.start_group, handler.start_object),
                end_location: Location::new(handler.end_group, handler.end_object),
            }),
            joining_fetch: None,
            params: Parameters::new(),
        })
    }

    /// Abort an in-flight fetch: sends `FETCH_CANCEL`.
    pub fn fetch_cancel(&self, request_id: u64) -> Result<(), SessionError> {
        self.ctx.send(FetchCancel { id: request_id })
    }

    /// Declare interest in every namespace matching `prefix`: sends
    /// `SUBSCRIBE_NAMESPACE` and registers `handler`.
    pub fn subscribe_namespace(&self, handler: Arc<SubscribeNamespaceHandler>) -> Result<(), SessionError> {
        self.ctx.insert_subscribe_namespace(handler.request_id, handler.clone());
        self.ctx.send(SubscribeNamespace {
            id: handler.request_id,
            track_namespace_prefix: handler.prefix.clone(),
            params: Parameters::new(),
        })
    }

    /// Withdraw a prior [`Client::subscribe_namespace`]: sends
    /// `UNSUBSCRIBE_NAMESPACE`.
    pub fn unsubscribe_namespace(&self, prefix: TrackNamespace) -> Result<(), SessionError> {
        self.ctx.send(UnsubscribeNamespace { track_namespace_prefix: prefix })
    }
}

/// `SUBSCRIBE`'s optional range fields, derived from the filter type the
/// handler was constructed with (§6: only present for `AbsoluteStart`/`AbsoluteRange`).
fn subscribe_range(handler: &SubscribeTrackHandler) -> (Option<Location>, Option<u64>) {
    use crate::message::FilterType;
    match handler.filter {
        FilterType::LatestObject | FilterType::LargestObject => (None, None),
        FilterType::AbsoluteStart => (handler.start_location, None),
        FilterType::AbsoluteRange => (handler.start_location, handler.end_group_id),
    }
}
