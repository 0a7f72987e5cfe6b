//! The transport engine (§4.8): turns one accepted WebTransport session
//! into a running MoQT connection.
//!
//! The handshake (`connect`/`accept`) negotiates [`setup::Version`] and
//! produces a shared [`ConnectionContext`]; [`Session::run`] then drives
//! five concurrent loops off it: control-message receive, control-message
//! send, accepted uni-directional streams, datagrams, and egress (draining
//! whatever the application queued on its [`crate::handler::PublishTrackHandler`]s).
//! Unlike the teacher this crate is grounded on, there's no `Publisher`/
//! `Subscriber` role split -- both directions share one [`ConnectionContext`]
//! since draft-14 sessions are symmetric.

mod client;
mod connection;
mod error;
mod parser;
mod reader;
mod server;
mod writer;

pub use client::*;
pub use connection::*;
pub use error::*;
pub use server::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::coding::{Decode, Encode, Parameters, ReasonPhrase, TrackNamespace};
use crate::data::{Datagram, DatagramType, StreamHeaderType, SubgroupHeader, SubgroupObject};
use crate::handler::{
    FetchTrackHandler, ObjectHeaders, PublishNamespaceHandler, PublishTrackHandler, SubscribeNamespaceHandler,
    SubscribeTrackHandler, TrackMode,
};
use crate::message::Message;
use crate::setup::{self, ParameterType};
use crate::time::Clock;

use reader::Reader;
use writer::Writer;

/// How long the egress loop sleeps after a pass that drained nothing,
/// before checking again. Real traffic never waits on this: a publish
/// only sees this latency if it raced the loop going idle between ticks.
const EGRESS_IDLE_TICK: Duration = Duration::from_millis(5);

#[must_use = "run() must be called"]
pub struct Session {
    webtransport: web_transport::Session,
    sender: Writer,
    recver: Reader,
    ctx: Arc<ConnectionContext>,
    outgoing: mpsc::UnboundedReceiver<Message>,
}

impl Session {
    /// Run the client side of the handshake: open the control stream, send
    /// `CLIENT_SETUP`, and wait for `SERVER_SETUP`. Returns the running
    /// session alongside the [`ConnectionContext`] handle the application
    /// uses to publish, subscribe, and fetch.
    pub async fn connect(mut webtransport: web_transport::Session, clock: Clock) -> Result<(Self, Arc<ConnectionContext>), SessionError> {
        let control = webtransport.open_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);

        let client = setup::Client {
            versions: [setup::Version::DRAFT_14].into(),
            params: Parameters::new(),
        };
        log::debug!("sending CLIENT_SETUP: {:?}", client);
        sender.encode(&client).await?;

        let server: setup::Server = recver.decode().await?;
        log::debug!("received SERVER_SETUP: {:?}", server);

        if server.version != setup::Version::DRAFT_14 {
            return Err(SessionError::Version(client.versions, [server.version].into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(ConnectionContext::new(Role::Client, server.version, clock, tx));
        if let Some(max) = server.params.get_intvalue(ParameterType::MaxRequestId.into()) {
            ctx.set_peer_max_request_id(max);
        }

        Ok((
            Self {
                webtransport,
                sender,
                recver,
                ctx: ctx.clone(),
                outgoing: rx,
            },
            ctx,
        ))
    }

    /// Run the server side of the handshake: accept the control stream,
    /// read `CLIENT_SETUP`, and reply with `SERVER_SETUP` advertising
    /// `max_request_id` as this side's initial request-id budget for the
    /// peer.
    pub async fn accept(mut webtransport: web_transport::Session, clock: Clock, max_request_id: u64) -> Result<(Self, Arc<ConnectionContext>), SessionError> {
        let control = webtransport.accept_bi().await?;
        let mut sender = Writer::new(control.0);
        let mut recver = Reader::new(control.1);

        let client: setup::Client = recver.decode().await?;
        log::debug!("received CLIENT_SETUP: {:?}", client);

        if !client.versions.contains(&setup::Version::DRAFT_14) {
            return Err(SessionError::Version(client.versions, [setup::Version::DRAFT_14].into()));
        }

        let mut params = Parameters::new();
        params.set_intvalue(ParameterType::MaxRequestId.into(), max_request_id);
        let server = setup::Server {
            version: setup::Version::DRAFT_14,
            params,
        };
        log::debug!("sending SERVER_SETUP: {:?}", server);
        sender.encode(&server).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let ctx = Arc::new(ConnectionContext::new(Role::Server, setup::Version::DRAFT_14, clock, tx));
        if let Some(max) = client.params.get_intvalue(ParameterType::MaxRequestId.into()) {
            ctx.set_peer_max_request_id(max);
        }

        Ok((
            Self {
                webtransport,
                sender,
                recver,
                ctx: ctx.clone(),
                outgoing: rx,
            },
            ctx,
        ))
    }

    /// Drive the connection until an error or a clean peer shutdown.
    /// Every loop races the others; the first to fail closes the whole
    /// connection since a MoQT session has no notion of partial failure.
    pub async fn run(self) -> Result<(), SessionError> {
        let Session {
            webtransport,
            sender,
            recver,
            ctx,
            outgoing,
        } = self;

        tokio::select! {
            res = Self::run_control_recv(ctx.clone(), recver, webtransport.clone()) => res,
            res = Self::run_control_send(sender, outgoing) => res,
            res = Self::run_streams(webtransport.clone(), ctx.clone()) => res,
            res = Self::run_datagrams(webtransport.clone(), ctx.clone()) => res,
            res = Self::run_egress(webtransport, ctx) => res,
        }
    }

    async fn run_control_send(mut sender: Writer, mut outgoing: mpsc::UnboundedReceiver<Message>) -> Result<(), SessionError> {
        while let Some(msg) = outgoing.recv().await {
            log::debug!("sending message: {:?}", msg);
            sender.encode(&msg).await?;
        }

        Ok(())
    }

    async fn run_control_recv(ctx: Arc<ConnectionContext>, mut recver: Reader, webtransport: web_transport::Session) -> Result<(), SessionError> {
        loop {
            let msg: Message = recver.decode().await?;
            log::debug!("received message: {:?}", msg);
            ctx.mlog_emit(|time| crate::mlog::control_parsed(time, 0, &msg));
            dispatch::control(&ctx, &webtransport, msg)?;
        }
    }

    async fn run_streams(mut webtransport: web_transport::Session, ctx: Arc<ConnectionContext>) -> Result<(), SessionError> {
        let mut tasks = FuturesUnordered::new();

        loop {
            tokio::select! {
                res = webtransport.accept_uni() => {
                    let stream = res?;
                    let ctx = ctx.clone();
                    tasks.push(async move {
                        if let Err(err) = parser::run_stream(ctx, Reader::new(stream)).await {
                            log::warn!("failed to serve stream: {}", err);
                        }
                    });
                },
                _ = tasks.next(), if !tasks.is_empty() => {},
            }
        }
    }

    async fn run_datagrams(mut webtransport: web_transport::Session, ctx: Arc<ConnectionContext>) -> Result<(), SessionError> {
        loop {
            let datagram = webtransport.recv_datagram().await?;
            let mut cursor = std::io::Cursor::new(datagram.as_ref());
            let datagram = Datagram::decode(&mut cursor)?;
            ctx.mlog_emit(|time| Some(crate::mlog::object_datagram_parsed(time, 0, &datagram)));

            let Some(handler) = ctx.subscribe_by_alias(datagram.track_alias) else {
                log::debug!("dropping datagram for unknown track_alias={}", datagram.track_alias);
                continue;
            };

            if let Some(status) = datagram.status {
                handler.on_object_status(datagram.group_id, datagram.object_id, status);
                continue;
            }

            let payload = datagram.payload.unwrap_or_default();
            let headers = ObjectHeaders {
                group_id: datagram.group_id,
                object_id: datagram.object_id,
                subgroup_id: None,
                priority: datagram.publisher_priority,
                ttl_ms: 0,
                payload_length: payload.len(),
                extensions: datagram.extensions.unwrap_or_default(),
                immutable_extensions: None,
                status: None,
            };
            // Datagrams carry no stream id; the track_alias itself stands
            // in for "this object's delta-tracking lineage" since object
            // ids on datagram-mode tracks are never delta-encoded anyway.
            let _ = handler.on_object(datagram.track_alias, datagram.group_id, 0, 0, headers, &payload);
        }
    }

    /// Drain every published track's egress queue and push objects onto
    /// the wire: datagrams go straight out, stream-mode objects reuse an
    /// open uni stream per `(track_alias, group_id, subgroup_id)` until
    /// that subgroup's last object is seen.
    async fn run_egress(mut webtransport: web_transport::Session, ctx: Arc<ConnectionContext>) -> Result<(), SessionError> {
        let mut streams: HashMap<(u64, u64, u64), SubgroupStream> = HashMap::new();
        // Which group is currently open per (track_alias, subgroup_id), so a
        // new group can FIN-close the previous one's stream per §4.8 rather
        // than leaving it open for the life of the connection.
        let mut active_groups: HashMap<(u64, u64), u64> = HashMap::new();

        loop {
            let now_ms = ctx.clock.now_ms();
            let mut drained_any = false;

            for handler in ctx.all_published() {
                let Some(track_alias) = handler.track_alias() else {
                    continue;
                };
                for obj in handler.drain_ready(now_ms) {
                    drained_any = true;
                    match handler.mode {
                        TrackMode::Datagram => {
                            Self::send_datagram_object(&mut webtransport, &ctx, track_alias, obj.headers, obj.payload).await?;
                        }
                        TrackMode::Stream => {
                            Self::send_subgroup_object(&mut webtransport, &ctx, &mut streams, &mut active_groups, track_alias, obj.headers, obj.payload)
                                .await?;
                        }
                    }
                }
            }

            // A subgroup stream is finished once its last object (marked
            // with `ObjectStatus::EndOfGroup`) has gone out, or once a new
            // group for the same subgroup FIN-closed it early (above).
            streams.retain(|_, s| !s.finished);

            if !drained_any {
                tokio::time::sleep(EGRESS_IDLE_TICK).await;
            }
        }
    }

    async fn send_datagram_object(
        webtransport: &mut web_transport::Session,
        ctx: &Arc<ConnectionContext>,
        track_alias: u64,
        headers: ObjectHeaders,
        payload: Vec<u8>,
    ) -> Result<(), SessionError> {
        let is_status = headers.status.is_some();
        let has_ext = headers.extensions.0.len() > 0;
        let is_eog = matches!(headers.status, Some(crate::data::ObjectStatus::EndOfGroup));

        let datagram_type = match (is_status, is_eog, has_ext) {
            (true, _, false) => DatagramType::StatusNoExtensions,
            (true, _, true) => DatagramType::StatusWithExtensions,
            (false, true, false) => DatagramType::EndOfGroupNoExtensions,
            (false, true, true) => DatagramType::EndOfGroupWithExtensions,
            (false, false, false) => DatagramType::NoEndOfGroupNoExtensions,
            (false, false, true) => DatagramType::NoEndOfGroupWithExtensions,
        };

        let datagram = Datagram {
            datagram_type,
            track_alias,
            group_id: headers.group_id,
            object_id: headers.object_id,
            publisher_priority: headers.priority,
            extensions: has_ext.then_some(headers.extensions),
            status: headers.status,
            payload: (!is_status).then_some(bytes::Bytes::from(payload)),
        };

        ctx.mlog_emit(|time| Some(crate::mlog::object_datagram_created(time, 0, &datagram)));

        let mut buf = Vec::new();
        datagram.encode(&mut buf)?;
        webtransport.send_datagram(buf.into()).await?;
        Ok(())
    }

    async fn send_subgroup_object(
        webtransport: &mut web_transport::Session,
        ctx: &Arc<ConnectionContext>,
        streams: &mut HashMap<(u64, u64, u64), SubgroupStream>,
        active_groups: &mut HashMap<(u64, u64), u64>,
        track_alias: u64,
        headers: ObjectHeaders,
        payload: Vec<u8>,
    ) -> Result<(), SessionError> {
        let group_id = headers.group_id;
        let subgroup_id = headers.subgroup_id.unwrap_or(0);
        let key = (track_alias, group_id, subgroup_id);

        // §4.8: opening a new group FIN-closes the previous group's stream
        // for this subgroup, rather than leaving it open indefinitely.
        let subgroup_key = (track_alias, subgroup_id);
        if let Some(&prev_group) = active_groups.get(&subgroup_key) {
            if prev_group != group_id {
                if let Some(mut old) = streams.remove(&(track_alias, prev_group, subgroup_id)) {
                    if !old.finished {
                        old.writer.finish().await?;
                        old.finished = true;
                    }
                }
            }
        }
        active_groups.insert(subgroup_key, group_id);

        if !streams.contains_key(&key) {
            let send = webtransport.open_uni().await?;
            let needs_ext = !headers.extensions.0.is_empty() || headers.immutable_extensions.is_some();
            let header_type = match (subgroup_id == 0, needs_ext) {
                (true, false) => StreamHeaderType::SubgroupZeroId,
                (true, true) => StreamHeaderType::SubgroupZeroIdExt,
                (false, false) => StreamHeaderType::SubgroupId,
                (false, true) => StreamHeaderType::SubgroupIdExt,
            };
            let mut writer = Writer::new(send);
            let stream_header = SubgroupHeader {
                header_type,
                track_alias,
                group_id,
                subgroup_id: header_type.has_subgroup_id().then_some(subgroup_id),
                publisher_priority: headers.priority,
            };
            // `SubgroupHeader::encode` writes the leading type tag itself.
            writer.encode(&stream_header).await?;
            ctx.mlog_emit(|time| Some(crate::mlog::subgroup_header_created(time, 0, &stream_header)));
            streams.insert(
                key,
                SubgroupStream {
                    writer,
                    header_type,
                    next_object_id: 0,
                    finished: false,
                },
            );
        }

        let stream = streams.get_mut(&key).unwrap();
        let object_id_delta = headers.object_id.saturating_sub(stream.next_object_id);
        stream.next_object_id = headers.object_id + 1;

        let is_eog = matches!(headers.status, Some(crate::data::ObjectStatus::EndOfGroup));
        let obj = SubgroupObject {
            object_id_delta,
            extensions: stream.header_type.has_extension_headers().then(|| headers.extensions.clone()),
            status: headers.status,
            payload: headers.status.is_none().then_some(bytes::Bytes::from(payload)),
        };
        // `SubgroupObject::encode` takes the header type out-of-band rather
        // than implementing `Encode` directly, so it's built into a scratch
        // buffer and pushed out as raw bytes.
        let mut buf = Vec::new();
        obj.encode(stream.header_type, &mut buf)?;
        stream.writer.write(&buf).await?;
        ctx.mlog_emit(|time| Some(crate::mlog::subgroup_object_created(time, 0, group_id, subgroup_id, headers.object_id, &obj)));

        if is_eog {
            stream.writer.finish().await?;
            stream.finished = true;
        }

        Ok(())
    }
}

/// One open outbound subgroup stream, reused across consecutive objects in
/// the same `(track_alias, group_id, subgroup_id)` until its end-of-group
/// marker is sent.
struct SubgroupStream {
    writer: Writer,
    header_type: StreamHeaderType,
    next_object_id: u64,
    finished: bool,
}

mod dispatch {
    //! Per-message-type control dispatch, split out of the recv loop for
    //! readability. Every arm either replies immediately (rejecting an
    //! inbound request the application's policy callback vetoed) or
    //! updates the matching handler/registry and lets the application's
    //! own callbacks take it from there.

    use super::*;
    use crate::message::*;

    pub(super) fn control(ctx: &Arc<ConnectionContext>, webtransport: &web_transport::Session, msg: Message) -> Result<(), SessionError> {
        match msg {
            Message::Subscribe(m) => on_subscribe(ctx, m),
            Message::SubscribeOk(m) => on_subscribe_ok(ctx, m),
            Message::SubscribeError(m) => on_subscribe_error(ctx, m),
            Message::SubscribeDone(m) => on_subscribe_done(ctx, m),
            Message::SubscribeUpdate(m) => on_subscribe_update(ctx, m),
            Message::Unsubscribe(m) => on_unsubscribe(ctx, m),

            Message::PublishNamespace(m) => on_publish_namespace(ctx, m),
            Message::PublishNamespaceOk(m) => on_publish_namespace_ok(ctx, m),
            Message::PublishNamespaceError(m) => on_publish_namespace_error(ctx, m),
            Message::PublishNamespaceDone(m) => on_publish_namespace_done(ctx, m),
            Message::PublishNamespaceCancel(m) => on_publish_namespace_cancel(ctx, m),

            Message::SubscribeNamespace(m) => on_subscribe_namespace(ctx, m),
            Message::SubscribeNamespaceOk(m) => on_subscribe_namespace_ok(ctx, m),
            Message::SubscribeNamespaceError(m) => on_subscribe_namespace_error(ctx, m),
            Message::UnsubscribeNamespace(m) => on_unsubscribe_namespace(ctx, m),

            Message::TrackStatus(m) => on_track_status(ctx, m),
            Message::TrackStatusOk(m) => on_track_status_ok(ctx, m),
            Message::TrackStatusError(m) => on_track_status_error(ctx, m),

            Message::Fetch(m) => on_fetch(ctx, webtransport, m),
            Message::FetchOk(m) => on_fetch_ok(ctx, m),
            Message::FetchError(m) => on_fetch_error(ctx, m),
            Message::FetchCancel(m) => on_fetch_cancel(ctx, m),

            Message::Publish(m) => on_publish(ctx, m),
            Message::PublishOk(m) => on_publish_ok(ctx, m),
            Message::PublishError(m) => on_publish_error(ctx, m),
            Message::PublishDone(m) => on_publish_done(ctx, m),

            Message::MaxRequestId(m) => {
                ctx.set_peer_max_request_id(m.request_id);
                Ok(())
            }
            Message::RequestsBlocked(_) => {
                // Informational: the peer is telling us it ran out of
                // request-id budget. Nothing to act on from this side.
                Ok(())
            }
            Message::NewGroupRequest(m) => on_new_group_request(ctx, m),
            Message::GoAway(m) => {
                ctx.set_goaway_received(m.uri.0);
                Ok(())
            }
        }
    }

    fn subscribe_namespace_matches(ctx: &Arc<ConnectionContext>, namespace: &TrackNamespace) -> Vec<Arc<SubscribeNamespaceHandler>> {
        ctx.all_subscribe_namespaces().into_iter().filter(|h| h.matches(namespace)).collect()
    }

    fn on_subscribe(ctx: &Arc<ConnectionContext>, m: Subscribe) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        if let Err(reason) = ctx.check_subscribe_policy(&m) {
            ctx.send(SubscribeError {
                id: m.id,
                error_code: 0x2,
                reason: ReasonPhrase(reason),
                track_alias: m.track_alias,
            })?;
            return Ok(());
        }

        let Some(namespace) = ctx.publish_namespace(&m.track_namespace) else {
            ctx.send(SubscribeError {
                id: m.id,
                error_code: 0x0,
                reason: ReasonPhrase("namespace not announced".into()),
                track_alias: m.track_alias,
            })?;
            return Ok(());
        };

        let Some(track) = namespace.track(&m.track_name) else {
            ctx.send(SubscribeError {
                id: m.id,
                error_code: 0x0,
                reason: ReasonPhrase("no such track".into()),
                track_alias: m.track_alias,
            })?;
            return Ok(());
        };

        track.add_subscriber();
        ctx.insert_publish(m.id, m.track_alias, track.clone());
        track.mark_ok(m.track_alias);

        let now_ms = ctx.clock.now_ms();
        let largest = track.largest(now_ms);
        ctx.send(SubscribeOk {
            id: m.id,
            expires: 0,
            group_order: GroupOrder::Ascending,
            content_exists: largest.is_some(),
            largest_location: largest.map(|(g, o)| crate::coding::Location::new(g, o)),
            params: Parameters::new(),
        })?;

        Ok(())
    }

    fn on_subscribe_ok(ctx: &Arc<ConnectionContext>, m: SubscribeOk) -> Result<(), SessionError> {
        let Some(handler) = ctx.subscribe(m.id) else {
            return Ok(());
        };
        let track_alias = handler.track_alias().unwrap_or(0);
        let supports_new_group = m.params.has(crate::handler::SUPPORTS_NEW_GROUP_PARAM);
        handler.mark_ok(track_alias, supports_new_group);
        ctx.bind_subscribe_alias(track_alias, handler);
        Ok(())
    }

    fn on_subscribe_error(ctx: &Arc<ConnectionContext>, m: SubscribeError) -> Result<(), SessionError> {
        if let Some(handler) = ctx.remove_subscribe(m.id) {
            handler.mark_error();
        }
        Ok(())
    }

    fn on_subscribe_done(ctx: &Arc<ConnectionContext>, m: SubscribeDone) -> Result<(), SessionError> {
        if let Some(handler) = ctx.remove_subscribe(m.id) {
            handler.mark_not_subscribed();
        }
        Ok(())
    }

    fn on_subscribe_update(ctx: &Arc<ConnectionContext>, m: SubscribeUpdate) -> Result<(), SessionError> {
        // We're the publisher here: a subscriber updated their filter or
        // paused/resumed. There's no per-subscriber handle on the publish
        // side beyond the subscriber count, so only the pause signal (via
        // the non-standard parameter, see handler::subscribe::PAUSE_PARAM)
        // is actionable without a richer per-subscriber registry.
        let Some(handler) = ctx.publish_by_request(m.id) else {
            return Ok(());
        };
        if m.params.get_intvalue(crate::handler::PAUSE_PARAM) == Some(0) {
            handler.add_subscriber();
        }
        Ok(())
    }

    fn on_unsubscribe(ctx: &Arc<ConnectionContext>, m: Unsubscribe) -> Result<(), SessionError> {
        if let Some(handler) = ctx.publish_by_request(m.id) {
            handler.remove_subscriber();
        }
        Ok(())
    }

    fn on_publish_namespace(ctx: &Arc<ConnectionContext>, m: PublishNamespace) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        if let Err(reason) = ctx.check_announce_policy(&m.track_namespace) {
            ctx.send(PublishNamespaceError {
                id: m.id,
                error_code: 0x2,
                reason: ReasonPhrase(reason),
            })?;
            return Ok(());
        }

        ctx.insert_remote_announced(m.track_namespace.clone());
        ctx.send(PublishNamespaceOk { id: m.id })?;

        for waiter in subscribe_namespace_matches(ctx, &m.track_namespace) {
            waiter.namespace_announced(&m.track_namespace);
        }

        Ok(())
    }

    fn on_publish_namespace_ok(ctx: &Arc<ConnectionContext>, m: PublishNamespaceOk) -> Result<(), SessionError> {
        if let Some(handler) = ctx.publish_namespace_by_request(m.id) {
            handler.mark_ok();
        }
        Ok(())
    }

    fn on_publish_namespace_error(ctx: &Arc<ConnectionContext>, m: PublishNamespaceError) -> Result<(), SessionError> {
        if let Some(handler) = ctx.publish_namespace_by_request(m.id) {
            handler.mark_error();
        }
        Ok(())
    }

    fn on_publish_namespace_done(ctx: &Arc<ConnectionContext>, m: PublishNamespaceDone) -> Result<(), SessionError> {
        ctx.remove_remote_announced(&m.track_namespace);
        for waiter in subscribe_namespace_matches(ctx, &m.track_namespace) {
            waiter.namespace_unannounced(&m.track_namespace);
        }
        Ok(())
    }

    fn on_publish_namespace_cancel(ctx: &Arc<ConnectionContext>, m: PublishNamespaceCancel) -> Result<(), SessionError> {
        ctx.remove_remote_announced(&m.track_namespace);
        for waiter in subscribe_namespace_matches(ctx, &m.track_namespace) {
            waiter.namespace_unannounced(&m.track_namespace);
        }
        Ok(())
    }

    fn on_subscribe_namespace(ctx: &Arc<ConnectionContext>, m: SubscribeNamespace) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        if let Err(reason) = ctx.check_announce_policy(&m.track_namespace_prefix) {
            ctx.send(SubscribeNamespaceError {
                id: m.id,
                namespace_prefix: m.track_namespace_prefix,
                code: 0x2,
                reason: ReasonPhrase(reason),
            })?;
            return Ok(());
        }

        ctx.send(SubscribeNamespaceOk {
            id: m.id,
            namespace_prefix: m.track_namespace_prefix.clone(),
        })?;

        for announced in ctx.all_publish_namespaces() {
            if m.track_namespace_prefix.fields.len() <= announced.namespace.fields.len()
                && announced.namespace.fields[..m.track_namespace_prefix.fields.len()] == m.track_namespace_prefix.fields[..]
            {
                ctx.send(PublishNamespace {
                    id: ctx.alloc_request_id()?,
                    track_namespace: announced.namespace.clone(),
                    params: Parameters::new(),
                })?;
            }
        }

        Ok(())
    }

    fn on_subscribe_namespace_ok(ctx: &Arc<ConnectionContext>, m: SubscribeNamespaceOk) -> Result<(), SessionError> {
        if let Some(handler) = ctx.subscribe_namespace(m.id) {
            handler.mark_ok();
        }
        Ok(())
    }

    fn on_subscribe_namespace_error(ctx: &Arc<ConnectionContext>, m: SubscribeNamespaceError) -> Result<(), SessionError> {
        if let Some(handler) = ctx.subscribe_namespace(m.id) {
            handler.mark_error();
        }
        Ok(())
    }

    fn on_unsubscribe_namespace(ctx: &Arc<ConnectionContext>, m: UnsubscribeNamespace) -> Result<(), SessionError> {
        let matching: Vec<u64> = ctx
            .all_subscribe_namespaces()
            .into_iter()
            .filter(|h| h.prefix == m.track_namespace_prefix)
            .map(|h| h.request_id)
            .collect();
        for id in matching {
            ctx.remove_subscribe_namespace(id);
        }
        Ok(())
    }

    fn on_track_status(ctx: &Arc<ConnectionContext>, m: TrackStatus) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        let Some(namespace) = ctx.publish_namespace(&m.track_namespace) else {
            ctx.send(TrackStatusError {
                id: m.id,
                error_code: 0x0,
                reason: ReasonPhrase("namespace not announced".into()),
            })?;
            return Ok(());
        };
        let Some(track) = namespace.track(&m.track_name) else {
            ctx.send(TrackStatusError {
                id: m.id,
                error_code: 0x0,
                reason: ReasonPhrase("no such track".into()),
            })?;
            return Ok(());
        };

        let now_ms = ctx.clock.now_ms();
        let largest = track.largest(now_ms);
        ctx.send(TrackStatusOk {
            id: m.id,
            group_order: GroupOrder::Ascending,
            content_exists: largest.is_some(),
            largest_location: largest.map(|(g, o)| crate::coding::Location::new(g, o)),
            params: Parameters::new(),
        })?;

        Ok(())
    }

    fn on_track_status_ok(ctx: &Arc<ConnectionContext>, m: TrackStatusOk) -> Result<(), SessionError> {
        if let Some(tx) = ctx.take_track_status_waiter(m.id) {
            let _ = tx.send(TrackStatusReply::Ok(m));
        }
        Ok(())
    }

    fn on_track_status_error(ctx: &Arc<ConnectionContext>, m: TrackStatusError) -> Result<(), SessionError> {
        if let Some(tx) = ctx.take_track_status_waiter(m.id) {
            let _ = tx.send(TrackStatusReply::Error(m));
        }
        Ok(())
    }

    fn on_fetch(ctx: &Arc<ConnectionContext>, webtransport: &web_transport::Session, m: Fetch) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        let Some(standalone) = m.standalone_fetch.as_ref() else {
            // Joining fetches need to resolve another request's track
            // first; not wired up without a richer request->track index
            // than this engine keeps today.
            ctx.send(FetchError {
                id: m.id,
                code: 0x0,
                reason: ReasonPhrase("joining fetch not supported".into()),
            })?;
            return Ok(());
        };

        let Some(namespace) = ctx.publish_namespace(&standalone.track_namespace) else {
            ctx.send(FetchError {
                id: m.id,
                code: 0x0,
                reason: ReasonPhrase("namespace not announced".into()),
            })?;
            return Ok(());
        };
        let Some(track) = namespace.track(&standalone.track_name) else {
            ctx.send(FetchError {
                id: m.id,
                code: 0x0,
                reason: ReasonPhrase("no such track".into()),
            })?;
            return Ok(());
        };

        ctx.send(FetchOk {
            id: m.id,
            group_order: GroupOrder::Ascending,
            end_of_track: true,
            end_location: standalone.end_location,
            params: Parameters::new(),
        })?;

        let start = (standalone.start_location.group_id, standalone.start_location.object_id);
        let end = (standalone.end_location.group_id, standalone.end_location.object_id);
        let now_ms = ctx.clock.now_ms();
        let objects = track.cache_range(now_ms, start, end);

        let request_id = m.id;
        let priority = m.subscriber_priority;
        let ctx = ctx.clone();
        let webtransport = webtransport.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_fetch(ctx.clone(), webtransport, request_id, priority, objects).await {
                log::warn!("failed to serve fetch request_id={}: {}", request_id, err);
            }
            ctx.clear_fetch_cancelled(request_id);
        });

        Ok(())
    }

    /// Stream the cached `objects` back on a dedicated fetch stream,
    /// checking [`ConnectionContext::is_fetch_cancelled`] between each one
    /// so a `FETCH_CANCEL` can stop the push promptly.
    async fn serve_fetch(
        ctx: Arc<ConnectionContext>,
        mut webtransport: web_transport::Session,
        request_id: u64,
        priority: u8,
        objects: Vec<(ObjectHeaders, Vec<u8>)>,
    ) -> Result<(), SessionError> {
        let send = webtransport.open_uni().await?;
        let mut writer = Writer::new(send);
        writer
            .encode(&crate::data::FetchHeader {
                header_type: StreamHeaderType::Fetch,
                request_id,
            })
            .await?;

        for (headers, payload) in objects {
            if ctx.is_fetch_cancelled(request_id) {
                break;
            }
            let obj = crate::data::FetchObject {
                group_id: headers.group_id,
                subgroup_id: headers.subgroup_id.unwrap_or(0),
                object_id: headers.object_id,
                publisher_priority: priority,
                extensions: headers.extensions,
                status: headers.status,
                payload: headers.status.is_none().then_some(bytes::Bytes::from(payload)),
            };
            writer.encode(&obj).await?;
        }

        writer.finish().await?;
        Ok(())
    }

    fn on_fetch_ok(ctx: &Arc<ConnectionContext>, m: FetchOk) -> Result<(), SessionError> {
        if let Some(handler) = ctx.fetch(m.id) {
            handler.mark_ok();
        }
        let _ = ctx;
        Ok(())
    }

    fn on_fetch_error(ctx: &Arc<ConnectionContext>, m: FetchError) -> Result<(), SessionError> {
        if let Some(handler) = ctx.remove_fetch(m.id) {
            handler.mark_error();
        }
        Ok(())
    }

    fn on_fetch_cancel(ctx: &Arc<ConnectionContext>, m: FetchCancel) -> Result<(), SessionError> {
        ctx.cancel_fetch(m.id);
        Ok(())
    }

    fn on_publish(ctx: &Arc<ConnectionContext>, m: Publish) -> Result<(), SessionError> {
        ctx.observe_peer_request_id(m.id)?;

        if let Err(reason) = ctx.check_publish_policy(&m) {
            ctx.send(PublishError {
                id: m.id,
                error_code: 0x2,
                reason_phrase: ReasonPhrase(reason),
            })?;
            return Ok(());
        }

        let handler = Arc::new(SubscribeTrackHandler::new(
            m.id,
            m.track_namespace.clone(),
            m.track_name.clone(),
            128,
            FilterType::LargestObject,
            GroupOrder::Ascending,
        ));
        handler.set_track_alias(m.track_alias);
        ctx.insert_subscribe(m.id, handler.clone());
        ctx.bind_subscribe_alias(m.track_alias, handler.clone());
        handler.mark_ok(m.track_alias, false);

        ctx.notify_track_offered(handler);

        ctx.send(PublishOk {
            id: m.id,
            forward: m.forward,
            subscriber_priority: 128,
            group_order: GroupOrder::Ascending,
            filter_type: FilterType::LargestObject,
            start_location: None,
            end_group_id: None,
            params: Parameters::new(),
        })?;

        Ok(())
    }

    fn on_publish_ok(ctx: &Arc<ConnectionContext>, m: PublishOk) -> Result<(), SessionError> {
        if let Some(handler) = ctx.publish_by_request(m.id) {
            let track_alias = handler.track_alias().unwrap_or_default();
            handler.mark_ok(track_alias);
        }
        Ok(())
    }

    fn on_publish_error(ctx: &Arc<ConnectionContext>, m: PublishError) -> Result<(), SessionError> {
        if let Some(handler) = ctx.remove_publish_by_alias(ctx.publish_by_request(m.id).and_then(|h| h.track_alias()).unwrap_or_default()) {
            handler.mark_error();
        }
        Ok(())
    }

    fn on_publish_done(ctx: &Arc<ConnectionContext>, m: PublishDone) -> Result<(), SessionError> {
        if let Some(handler) = ctx.remove_subscribe(m.id) {
            handler.mark_not_subscribed();
        }
        Ok(())
    }

    fn on_new_group_request(ctx: &Arc<ConnectionContext>, m: NewGroupRequest) -> Result<(), SessionError> {
        match ctx.publish_by_alias(m.track_alias) {
            Some(handler) => handler.new_group_requested(),
            None => log::debug!("NEW_GROUP_REQUEST for unknown track_alias={}", m.track_alias),
        }
        Ok(())
    }
}
