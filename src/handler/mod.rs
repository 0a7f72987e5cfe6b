//! Application-facing track handlers (§4.6).
//!
//! Each handler is a plain struct with callback fields rather than a
//! trait object: the session engine owns an `Arc<PublishTrackHandler>` (or
//! `Subscribe`/`Fetch` equivalent) and drives it directly, while the
//! application registers closures for the events it cares about. This
//! replaces a virtual base class with a sum of concrete, independently
//! testable types.

mod egress;
mod fetch;
mod namespace;
mod publish;
mod status;
mod subscribe;

pub use egress::*;
pub use fetch::*;
pub use namespace::*;
pub use publish::*;
pub use status::*;
pub use subscribe::*;
