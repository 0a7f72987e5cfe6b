//! Per-object framing carried on datagrams and unidirectional QUIC streams.
//!
//! Control messages (see [`crate::message`]) all share one bidirectional
//! stream; objects never do, so their framing lives in its own module and
//! is parsed directly off `web_transport::RecvStream`/datagram payloads.

mod datagram;
mod fetch;
mod header;
mod object_status;
mod subgroup;

pub use datagram::*;
pub use fetch::*;
pub use header::*;
pub use object_status::*;
pub use subgroup::*;
