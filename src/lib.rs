//! Media over QUIC Transport (MoQT): a wire-level publish/subscribe
//! runtime layered on top of a generic QUIC transport.
//!
//! Module layout, leaves first:
//!
//! - [`coding`]: the varint codec and every other byte-level primitive
//!   (tuples, parameters, extensions) shared by control and data messages.
//! - [`data`]: per-object framing carried on datagrams and unidirectional
//!   streams.
//! - [`message`]: the control-plane messages exchanged on the one
//!   bidirectional stream per connection.
//! - [`setup`]: the version-negotiating handshake that precedes everything
//!   else.
//! - [`time`]: a monotonic millisecond clock and the TTL bucket queue built
//!   on top of it.
//! - [`cache`]: a key -> value store used to hold recent objects for late
//!   subscribers and fetches.
//! - [`handler`]: the callback-based publish/subscribe/fetch track handler
//!   API the session dispatches into.
//! - [`session`]: the transport engine that drives [`message`] and
//!   [`data`] over a QUIC connection, dispatching into [`handler`].
//! - [`mlog`]: qlog-style structured event logging for the wire protocol.

pub mod cache;
pub mod coding;
pub mod data;
pub mod handler;
pub mod message;
pub mod mlog;
pub mod session;
pub mod setup;
pub mod time;
