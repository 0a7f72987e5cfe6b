//! Parses one accepted unidirectional data stream to completion.
//!
//! Each call owns the stream for its lifetime: read the
//! [`StreamHeaderType`], branch into subgroup or fetch framing, then loop
//! reading objects until the peer resets or cleanly closes the stream.

use std::sync::Arc;

use crate::coding::Decode;
use crate::data::{FetchHeader, FetchObject, StreamHeaderType, SubgroupHeader, SubgroupObject};

use super::connection::ConnectionContext;
use super::reader::Reader;
use super::SessionError;

/// Read the [`StreamHeaderType`] off a freshly-accepted unidirectional
/// stream and dispatch to the matching object loop. This is the only entry
/// point the transport engine needs: it doesn't have to know ahead of time
/// whether a given stream carries subgroup or fetch framing.
pub async fn run_stream(ctx: Arc<ConnectionContext>, mut reader: Reader) -> Result<(), SessionError> {
    let header_type = reader.decode::<StreamHeaderType>().await?;
    if header_type.is_fetch() {
        run_fetch_stream(ctx, header_type, reader).await
    } else {
        run_subgroup_stream(ctx, header_type, reader).await
    }
}

/// Read and dispatch objects from one subgroup stream until it ends.
///
/// Unmatched aliases (the subscriber unsubscribed, or the publisher opened
/// a stream for a track we never asked about) are drained and discarded
/// rather than treated as an error: the sender has no way to know the
/// receiver already gave up.
async fn run_subgroup_stream(ctx: Arc<ConnectionContext>, header_type: StreamHeaderType, mut reader: Reader) -> Result<(), SessionError> {
    let header = reader
        .decode_with(|r| SubgroupHeader::decode(header_type, r))
        .await?;
    ctx.mlog_emit(|time| Some(crate::mlog::subgroup_header_parsed(time, 0, &header)));

    let handler = ctx.subscribe_by_alias(header.track_alias);
    let stream_key = header.track_alias ^ ((header.group_id) << 1) ^ header.subgroup_id.unwrap_or(0).wrapping_mul(0x9E3779B97F4A7C15);

    let mut next_object_id: Option<u64> = None;
    let mut subgroup_id = header.subgroup_id;

    loop {
        if reader.done().await? {
            break;
        }

        let obj = reader
            .decode_with(|r| SubgroupObject::decode(header_type, r))
            .await?;

        let object_id = match next_object_id {
            Some(prev) => prev + 1 + obj.object_id_delta,
            None => obj.object_id_delta,
        };
        next_object_id = Some(object_id);
        if subgroup_id.is_none() {
            // SubgroupFirstObjectId* variants: the subgroup id is the first
            // object's id, not carried separately in the header.
            subgroup_id = Some(object_id);
        }
        let subgroup_id = subgroup_id.unwrap_or(0);
        ctx.mlog_emit(|time| Some(crate::mlog::subgroup_object_parsed(time, 0, header.group_id, subgroup_id, object_id, &obj)));

        let Some(handler) = handler.as_ref() else {
            continue;
        };

        if let Some(status) = obj.status {
            handler.on_object_status(header.group_id, object_id, status);
            if matches!(status, crate::data::ObjectStatus::EndOfGroup) {
                handler.drop_stream(stream_key);
            }
            continue;
        }

        let payload = obj.payload.unwrap_or_default();
        let headers = crate::handler::ObjectHeaders {
            group_id: header.group_id,
            object_id,
            subgroup_id: Some(subgroup_id),
            priority: header.publisher_priority,
            ttl_ms: 0,
            payload_length: payload.len(),
            extensions: obj.extensions.unwrap_or_default(),
            immutable_extensions: None,
            status: None,
        };

        if handler
            .on_object(stream_key, header.group_id, subgroup_id, obj.object_id_delta, headers, &payload)
            .is_err()
        {
            return Err(SessionError::ProtocolViolation(format!(
                "object id moved backwards on track_alias={}",
                header.track_alias
            )));
        }
    }

    if let Some(handler) = handler.as_ref() {
        handler.drop_stream(stream_key);
    }

    Ok(())
}

/// Read and dispatch objects from one fetch-response stream until it ends.
async fn run_fetch_stream(ctx: Arc<ConnectionContext>, header_type: StreamHeaderType, mut reader: Reader) -> Result<(), SessionError> {
    let header = reader
        .decode_with(|r| FetchHeader::decode(header_type, r))
        .await?;

    let handler = ctx.fetch(header.request_id);

    loop {
        if reader.done().await? {
            break;
        }

        let obj = reader.decode::<FetchObject>().await?;

        let Some(handler) = handler.as_ref() else {
            continue;
        };

        if let Some(status) = obj.status {
            handler.on_object_status(obj.group_id, obj.object_id, status);
            continue;
        }

        let payload = obj.payload.unwrap_or_default();
        let headers = crate::handler::ObjectHeaders {
            group_id: obj.group_id,
            object_id: obj.object_id,
            subgroup_id: Some(obj.subgroup_id),
            priority: obj.publisher_priority,
            ttl_ms: 0,
            payload_length: payload.len(),
            extensions: obj.extensions,
            immutable_extensions: None,
            status: None,
        };
        let _ = handler.on_object(obj.group_id, obj.subgroup_id, obj.object_id, headers, &payload);
    }

    Ok(())
}
